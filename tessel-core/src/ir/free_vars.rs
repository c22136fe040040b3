//! Free-variable analysis.
//!
//! Relies on names being unique: a name is free in a construct if it is used
//! there and not bound anywhere inside it. Memory blocks and size variables
//! mentioned by memory summaries count as uses.

use super::*;
use indexmap::IndexSet;
use std::collections::HashSet;

/// Names used but not bound in `body`, in order of first use.
pub fn free_in_body(body: &Body) -> IndexSet<VName> {
    let mut c = Collector::default();
    c.body(body);
    c.into_free()
}

/// Names used but not bound in `lambda`, in order of first use.
pub fn free_in_lambda(lambda: &Lambda) -> IndexSet<VName> {
    let mut c = Collector::default();
    c.lambda(lambda);
    c.into_free()
}

/// Every name bound by the lambda's parameters or anywhere in its body.
pub fn bound_in_lambda(lambda: &Lambda) -> IndexSet<VName> {
    let mut c = Collector::default();
    c.lambda(lambda);
    c.bound_order
}

#[derive(Default)]
struct Collector {
    uses: IndexSet<VName>,
    bound: HashSet<VName>,
    bound_order: IndexSet<VName>,
}

impl Collector {
    fn into_free(self) -> IndexSet<VName> {
        let bound = self.bound;
        self.uses.into_iter().filter(|name| !bound.contains(name)).collect()
    }

    fn bind(&mut self, name: &VName) {
        self.bound.insert(name.clone());
        self.bound_order.insert(name.clone());
    }

    fn use_name(&mut self, name: &VName) {
        self.uses.insert(name.clone());
    }

    fn subexp(&mut self, se: &SubExp) {
        if let SubExp::Var(name) = se {
            self.use_name(name);
        }
    }

    fn size(&mut self, size: &SizeExpr) {
        for name in size.free_vars() {
            self.uses.insert(name);
        }
    }

    fn summary(&mut self, summary: &MemSummary) {
        self.use_name(&summary.mem);
        let ixfun = &summary.ixfun;
        self.size(ixfun.offset());
        for dim in ixfun.shape().iter().chain(ixfun.strides()) {
            self.size(dim);
        }
    }

    fn binder(&mut self, pe: &PatElem) {
        self.bind(&pe.name);
        if let Some(summary) = &pe.summary {
            self.summary(summary);
        }
    }

    fn lambda(&mut self, lambda: &Lambda) {
        for param in &lambda.params {
            self.binder(param);
        }
        self.body(&lambda.body);
    }

    fn body(&mut self, body: &Body) {
        for stm in &body.stms {
            self.stm(stm);
        }
        for se in &body.result {
            self.subexp(se);
        }
    }

    fn stm(&mut self, stm: &Stm) {
        for pe in &stm.pat.elems {
            self.binder(pe);
        }
        self.exp(&stm.exp);
    }

    fn exp(&mut self, exp: &Exp) {
        match exp {
            Exp::SubExp(se) => self.subexp(se),
            Exp::BinOp { lhs, rhs, .. } => {
                self.subexp(lhs);
                self.subexp(rhs);
            }
            Exp::Index { array, indices } => {
                self.use_name(array);
                indices.iter().for_each(|se| self.subexp(se));
            }
            Exp::Update {
                array,
                indices,
                value,
            } => {
                self.use_name(array);
                indices.iter().for_each(|se| self.subexp(se));
                self.subexp(value);
            }
            Exp::Alloc { size, .. } => self.size(size),
            Exp::Scratch { shape, .. } => shape.iter().for_each(|se| self.subexp(se)),
            Exp::If {
                cond,
                then_body,
                else_body,
            } => {
                self.subexp(cond);
                self.body(then_body);
                self.body(else_body);
            }
            Exp::Loop {
                merge,
                counter,
                bound,
                body,
            } => {
                for (param, init) in merge {
                    self.binder(param);
                    self.subexp(init);
                }
                self.bind(counter);
                self.subexp(bound);
                self.body(body);
            }
            Exp::Map { lambda, inputs } => {
                inputs.iter().for_each(|name| self.use_name(name));
                self.lambda(lambda);
            }
        }
    }
}
