//! Symbolic size expressions.
//!
//! Sizes of memory blocks, array dimensions and index offsets are integer
//! expressions over variables that may only be known at run time. The
//! constructors simplify as they build so that common cases (offset 0,
//! stride 1, constant sizes) stay readable in generated code.

use super::VName;
use indexmap::IndexSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SizeExpr {
    Const(i64),
    Var(VName),
    Add(Box<SizeExpr>, Box<SizeExpr>),
    Mul(Box<SizeExpr>, Box<SizeExpr>),
}

impl SizeExpr {
    pub fn var(name: &VName) -> Self {
        SizeExpr::Var(name.clone())
    }

    /// `a + b`, folding constants and keeping a constant addend on the right.
    /// Constants whose sum does not fit in `i64` stay symbolic.
    pub fn add(a: SizeExpr, b: SizeExpr) -> SizeExpr {
        match (a, b) {
            (SizeExpr::Const(x), SizeExpr::Const(y)) => match x.checked_add(y) {
                Some(sum) => SizeExpr::Const(sum),
                None => SizeExpr::Add(Box::new(SizeExpr::Const(x)), Box::new(SizeExpr::Const(y))),
            },
            (SizeExpr::Const(0), e) | (e, SizeExpr::Const(0)) => e,
            (SizeExpr::Const(x), e) => SizeExpr::add(e, SizeExpr::Const(x)),
            (SizeExpr::Add(l, r), SizeExpr::Const(y)) => match *r {
                SizeExpr::Const(x) if x.checked_add(y).is_some() => SizeExpr::add(*l, SizeExpr::Const(x + y)),
                r => SizeExpr::Add(
                    Box::new(SizeExpr::Add(l, Box::new(r))),
                    Box::new(SizeExpr::Const(y)),
                ),
            },
            (a, b) => SizeExpr::Add(Box::new(a), Box::new(b)),
        }
    }

    /// `a * b`, folding constants and the identities `x*1` and `x*0`.
    /// Constants whose product does not fit in `i64` stay symbolic.
    pub fn mul(a: SizeExpr, b: SizeExpr) -> SizeExpr {
        match (a, b) {
            (SizeExpr::Const(x), SizeExpr::Const(y)) => match x.checked_mul(y) {
                Some(product) => SizeExpr::Const(product),
                None => SizeExpr::Mul(Box::new(SizeExpr::Const(x)), Box::new(SizeExpr::Const(y))),
            },
            (SizeExpr::Const(0), _) | (_, SizeExpr::Const(0)) => SizeExpr::Const(0),
            (SizeExpr::Const(1), e) | (e, SizeExpr::Const(1)) => e,
            (a, b) => SizeExpr::Mul(Box::new(a), Box::new(b)),
        }
    }

    /// Product of all factors; the empty product is 1.
    pub fn product<I: IntoIterator<Item = SizeExpr>>(factors: I) -> SizeExpr {
        factors.into_iter().fold(SizeExpr::Const(1), SizeExpr::mul)
    }

    /// Variables read by this expression, in first-occurrence order.
    pub fn free_vars(&self) -> IndexSet<VName> {
        let mut vars = IndexSet::new();
        self.collect_vars(&mut vars);
        vars
    }

    fn collect_vars(&self, vars: &mut IndexSet<VName>) {
        match self {
            SizeExpr::Const(_) => {}
            SizeExpr::Var(name) => {
                vars.insert(name.clone());
            }
            SizeExpr::Add(a, b) | SizeExpr::Mul(a, b) => {
                a.collect_vars(vars);
                b.collect_vars(vars);
            }
        }
    }

    /// Evaluate with `env` supplying variable values. Returns `None` if a
    /// variable is unbound or the result overflows.
    pub fn eval<F>(&self, env: &F) -> Option<i64>
    where
        F: Fn(&VName) -> Option<i64>,
    {
        match self {
            SizeExpr::Const(n) => Some(*n),
            SizeExpr::Var(name) => env(name),
            SizeExpr::Add(a, b) => a.eval(env)?.checked_add(b.eval(env)?),
            SizeExpr::Mul(a, b) => a.eval(env)?.checked_mul(b.eval(env)?),
        }
    }
}

impl From<i64> for SizeExpr {
    fn from(n: i64) -> Self {
        SizeExpr::Const(n)
    }
}

impl From<&VName> for SizeExpr {
    fn from(name: &VName) -> Self {
        SizeExpr::var(name)
    }
}

impl fmt::Display for SizeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeExpr::Const(n) => write!(f, "{}", n),
            SizeExpr::Var(name) => write!(f, "{}", name),
            SizeExpr::Add(a, b) => write!(f, "{} + {}", a, b),
            SizeExpr::Mul(a, b) => {
                for (i, factor) in [a, b].into_iter().enumerate() {
                    if i > 0 {
                        write!(f, " * ")?;
                    }
                    match factor.as_ref() {
                        SizeExpr::Add(..) => write!(f, "({})", factor)?,
                        _ => write!(f, "{}", factor)?,
                    }
                }
                Ok(())
            }
        }
    }
}
