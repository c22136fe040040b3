//! Input IR for kernel generation.
//!
//! This is a first-order, memory-annotated representation: every array value
//! carries a memory summary telling which block it lives in and how logical
//! indices map into that block.
//!
//! Assumptions:
//! - Type checking has already occurred; every binder carries its type
//! - Names are globally unique (`VName` tags come from a single `NameSource`)
//! - Memory has been introduced: arrays are annotated with a `MemSummary`,
//!   and blocks are created by `Alloc` statements

use crate::IdSource;
use std::fmt;

pub mod folder;
pub mod free_vars;
pub mod index_fun;
pub mod size;
pub mod types;


pub use index_fun::IndexFun;
pub use size::SizeExpr;
pub use types::{Type, TypeExt, TypeName};

// =============================================================================
// Names
// =============================================================================

/// A variable name made unique by its tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VName {
    pub base: String,
    pub tag: u32,
}

impl VName {
    pub fn new(base: impl Into<String>, tag: u32) -> Self {
        VName {
            base: base.into(),
            tag,
        }
    }
}

impl fmt::Display for VName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.base, self.tag)
    }
}

/// Source of fresh, unique names.
#[derive(Debug, Clone, Default)]
pub struct NameSource {
    tags: IdSource<u32>,
}

impl NameSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self, base: &str) -> VName {
        VName::new(base, self.tags.next())
    }
}

// =============================================================================
// Atoms
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrimValue {
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for PrimValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimValue::Int(n) => write!(f, "{}", n),
            PrimValue::Float(x) => write!(f, "{:?}", x),
            PrimValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// An atomic operand: a constant or a variable.
#[derive(Debug, Clone, PartialEq)]
pub enum SubExp {
    Const(PrimValue),
    Var(VName),
}

impl SubExp {
    pub fn var(name: &VName) -> Self {
        SubExp::Var(name.clone())
    }

    pub fn int(n: i64) -> Self {
        SubExp::Const(PrimValue::Int(n))
    }

    pub fn as_var(&self) -> Option<&VName> {
        match self {
            SubExp::Var(name) => Some(name),
            SubExp::Const(_) => None,
        }
    }

    /// View an integer operand as a size expression.
    pub fn to_size(&self) -> Option<SizeExpr> {
        match self {
            SubExp::Const(PrimValue::Int(n)) => Some(SizeExpr::Const(*n)),
            SubExp::Var(name) => Some(SizeExpr::var(name)),
            SubExp::Const(_) => None,
        }
    }
}

impl fmt::Display for SubExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubExp::Const(value) => write!(f, "{}", value),
            SubExp::Var(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Eq,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Lt => "<",
            BinOp::Eq => "==",
        };
        write!(f, "{}", op)
    }
}

// =============================================================================
// Memory
// =============================================================================

/// Address space of a memory block.
///
/// Only two spaces are distinguished: memory owned by the host program and
/// memory visible to every thread of a kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Space {
    #[default]
    Host,
    Global,
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Space::Host => write!(f, "host"),
            Space::Global => write!(f, "global"),
        }
    }
}

/// Where an array lives: the backing block and the layout inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemSummary {
    pub mem: VName,
    pub ixfun: IndexFun,
}

impl MemSummary {
    pub fn new(mem: &VName, ixfun: IndexFun) -> Self {
        MemSummary {
            mem: mem.clone(),
            ixfun,
        }
    }
}

// =============================================================================
// Bindings
// =============================================================================

/// A binder: pattern element, lambda parameter or loop merge parameter.
/// Arrays carry a memory summary; scalars and memory handles do not.
#[derive(Debug, Clone, PartialEq)]
pub struct PatElem {
    pub name: VName,
    pub ty: Type,
    pub summary: Option<MemSummary>,
}

pub type Param = PatElem;

impl PatElem {
    pub fn scalar(name: &VName, ty: Type) -> Self {
        PatElem {
            name: name.clone(),
            ty,
            summary: None,
        }
    }

    pub fn mem(name: &VName) -> Self {
        PatElem {
            name: name.clone(),
            ty: types::mem(),
            summary: None,
        }
    }

    pub fn array(name: &VName, ty: Type, summary: MemSummary) -> Self {
        PatElem {
            name: name.clone(),
            ty,
            summary: Some(summary),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub elems: Vec<PatElem>,
}

impl Pattern {
    pub fn new(elems: Vec<PatElem>) -> Self {
        Pattern { elems }
    }

    pub fn single(elem: PatElem) -> Self {
        Pattern { elems: vec![elem] }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Exp {
    SubExp(SubExp),
    BinOp {
        op: BinOp,
        lhs: SubExp,
        rhs: SubExp,
    },
    /// Read one scalar element.
    Index {
        array: VName,
        indices: Vec<SubExp>,
    },
    /// Write one scalar element in place. The result is the updated array,
    /// which shares the memory of `array`.
    Update {
        array: VName,
        indices: Vec<SubExp>,
        value: SubExp,
    },
    /// Allocate a fresh memory block of `size` elements.
    Alloc {
        size: SizeExpr,
        space: Space,
    },
    /// An array with unspecified contents, placed by its pattern's summary.
    Scratch {
        elem: Type,
        shape: Vec<SubExp>,
    },
    If {
        cond: SubExp,
        then_body: Body,
        else_body: Body,
    },
    /// Bounded loop. Merge parameters start from their initial values and are
    /// rebound to the body results after every iteration.
    Loop {
        merge: Vec<(Param, SubExp)>,
        counter: VName,
        bound: SubExp,
        body: Body,
    },
    /// Apply `lambda` element-wise across `inputs`.
    Map {
        lambda: Lambda,
        inputs: Vec<VName>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stm {
    pub pat: Pattern,
    pub exp: Exp,
}

impl Stm {
    pub fn new(pat: Pattern, exp: Exp) -> Self {
        Stm { pat, exp }
    }
}

/// Ordered statements followed by the body's result operands.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub stms: Vec<Stm>,
    pub result: Vec<SubExp>,
}

impl Body {
    pub fn new(stms: Vec<Stm>, result: Vec<SubExp>) -> Self {
        Body { stms, result }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    pub params: Vec<Param>,
    pub body: Body,
    pub ret: Vec<Type>,
}
