//! Folder pattern for traversing and transforming the IR.
//!
//! Each pass implements `IrFolder` and overrides only the hooks it needs,
//! while the `walk_*` functions handle the actual tree traversal. The folder
//! consumes and returns values; read-only passes return the input unchanged.
//!
//! Traversal is fully recursive: nested `if` branches, loop bodies and map
//! lambdas are visited at any depth.

use super::*;

/// Visitor trait for transforming the IR.
///
/// The `Error` associated type allows folders to propagate errors. Folders
/// that cannot fail use `std::convert::Infallible`.
pub trait IrFolder: Sized {
    type Error;

    fn visit_body(&mut self, body: Body) -> Result<Body, Self::Error> {
        walk_body(self, body)
    }

    fn visit_stm(&mut self, stm: Stm) -> Result<Stm, Self::Error> {
        walk_stm(self, stm)
    }

    fn visit_pattern(&mut self, pat: Pattern) -> Result<Pattern, Self::Error> {
        walk_pattern(self, pat)
    }

    fn visit_pat_elem(&mut self, pe: PatElem) -> Result<PatElem, Self::Error> {
        walk_pat_elem(self, pe)
    }

    fn visit_param(&mut self, param: Param) -> Result<Param, Self::Error> {
        walk_pat_elem(self, param)
    }

    /// Loop merge parameters carry their own memory summaries and are visited
    /// before the loop body.
    fn visit_merge_param(&mut self, param: Param, init: SubExp) -> Result<(Param, SubExp), Self::Error> {
        let param = self.visit_param(param)?;
        let init = self.visit_subexp(init)?;
        Ok((param, init))
    }

    fn visit_mem_summary(&mut self, summary: MemSummary) -> Result<MemSummary, Self::Error> {
        Ok(summary)
    }

    fn visit_subexp(&mut self, se: SubExp) -> Result<SubExp, Self::Error> {
        Ok(se)
    }

    fn visit_exp(&mut self, exp: Exp) -> Result<Exp, Self::Error> {
        walk_exp(self, exp)
    }

    fn visit_exp_loop(
        &mut self,
        merge: Vec<(Param, SubExp)>,
        counter: VName,
        bound: SubExp,
        body: Body,
    ) -> Result<Exp, Self::Error> {
        walk_exp_loop(self, merge, counter, bound, body)
    }

    fn visit_lambda(&mut self, lambda: Lambda) -> Result<Lambda, Self::Error> {
        walk_lambda(self, lambda)
    }
}

// =============================================================================
// Walk functions
// =============================================================================

pub fn walk_body<F: IrFolder>(f: &mut F, body: Body) -> Result<Body, F::Error> {
    let stms = body.stms.into_iter().map(|stm| f.visit_stm(stm)).collect::<Result<Vec<_>, _>>()?;
    let result = body.result.into_iter().map(|se| f.visit_subexp(se)).collect::<Result<Vec<_>, _>>()?;
    Ok(Body { stms, result })
}

pub fn walk_stm<F: IrFolder>(f: &mut F, stm: Stm) -> Result<Stm, F::Error> {
    let pat = f.visit_pattern(stm.pat)?;
    let exp = f.visit_exp(stm.exp)?;
    Ok(Stm { pat, exp })
}

pub fn walk_pattern<F: IrFolder>(f: &mut F, pat: Pattern) -> Result<Pattern, F::Error> {
    let elems = pat.elems.into_iter().map(|pe| f.visit_pat_elem(pe)).collect::<Result<Vec<_>, _>>()?;
    Ok(Pattern { elems })
}

pub fn walk_pat_elem<F: IrFolder>(f: &mut F, pe: PatElem) -> Result<PatElem, F::Error> {
    let summary = match pe.summary {
        Some(summary) => Some(f.visit_mem_summary(summary)?),
        None => None,
    };
    Ok(PatElem {
        name: pe.name,
        ty: pe.ty,
        summary,
    })
}

pub fn walk_exp<F: IrFolder>(f: &mut F, exp: Exp) -> Result<Exp, F::Error> {
    match exp {
        Exp::SubExp(se) => Ok(Exp::SubExp(f.visit_subexp(se)?)),
        Exp::BinOp { op, lhs, rhs } => Ok(Exp::BinOp {
            op,
            lhs: f.visit_subexp(lhs)?,
            rhs: f.visit_subexp(rhs)?,
        }),
        Exp::Index { array, indices } => Ok(Exp::Index {
            array,
            indices: walk_subexps(f, indices)?,
        }),
        Exp::Update {
            array,
            indices,
            value,
        } => Ok(Exp::Update {
            array,
            indices: walk_subexps(f, indices)?,
            value: f.visit_subexp(value)?,
        }),
        Exp::Alloc { size, space } => Ok(Exp::Alloc { size, space }),
        Exp::Scratch { elem, shape } => Ok(Exp::Scratch {
            elem,
            shape: walk_subexps(f, shape)?,
        }),
        Exp::If {
            cond,
            then_body,
            else_body,
        } => Ok(Exp::If {
            cond: f.visit_subexp(cond)?,
            then_body: f.visit_body(then_body)?,
            else_body: f.visit_body(else_body)?,
        }),
        Exp::Loop {
            merge,
            counter,
            bound,
            body,
        } => f.visit_exp_loop(merge, counter, bound, body),
        Exp::Map { lambda, inputs } => Ok(Exp::Map {
            lambda: f.visit_lambda(lambda)?,
            inputs,
        }),
    }
}

pub fn walk_exp_loop<F: IrFolder>(
    f: &mut F,
    merge: Vec<(Param, SubExp)>,
    counter: VName,
    bound: SubExp,
    body: Body,
) -> Result<Exp, F::Error> {
    let merge = merge
        .into_iter()
        .map(|(param, init)| f.visit_merge_param(param, init))
        .collect::<Result<Vec<_>, _>>()?;
    let bound = f.visit_subexp(bound)?;
    let body = f.visit_body(body)?;
    Ok(Exp::Loop {
        merge,
        counter,
        bound,
        body,
    })
}

pub fn walk_lambda<F: IrFolder>(f: &mut F, lambda: Lambda) -> Result<Lambda, F::Error> {
    let params = lambda.params.into_iter().map(|p| f.visit_param(p)).collect::<Result<Vec<_>, _>>()?;
    let body = f.visit_body(lambda.body)?;
    Ok(Lambda {
        params,
        body,
        ret: lambda.ret,
    })
}

fn walk_subexps<F: IrFolder>(f: &mut F, ses: Vec<SubExp>) -> Result<Vec<SubExp>, F::Error> {
    ses.into_iter().map(|se| f.visit_subexp(se)).collect()
}
