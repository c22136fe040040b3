//! Generic sequential statement compiler.
//!
//! Lowers every expression shape to plain imperative code, including `map`,
//! which becomes a counted loop. Nested bodies are compiled through the
//! caller-supplied `ExpCompiler`, so a wrapping compiler can intercept shapes
//! it handles itself at any depth.

use super::{CodegenCtx, ExpCompiler, ValueDestination, VarEntry};
use crate::error::{CompilerError, Result};
use crate::imp::{Code, ImpExp, Stmt};
use crate::ir::{Body, Exp, Lambda, Param, Pattern, SizeExpr, Space, Stm, SubExp, TypeExt, VName, types};
use crate::{bail_codegen, err_codegen};
use log::trace;

/// Compiles everything sequentially; maps become loops.
#[derive(Debug, Default)]
pub struct SequentialCompiler;

impl ExpCompiler for SequentialCompiler {
    fn compile_stm(&mut self, ctx: &mut CodegenCtx, stm: &Stm, code: &mut Code) -> Result<()> {
        compile_stm(self, ctx, stm, code)
    }
}

/// Compile one statement, handing nested bodies back to `c`.
pub fn compile_stm<C: ExpCompiler>(c: &mut C, ctx: &mut CodegenCtx, stm: &Stm, code: &mut Code) -> Result<()> {
    if let Exp::Alloc { size, space } = &stm.exp {
        return compile_alloc(ctx, &stm.pat, size, *space, code);
    }

    declare_pattern(ctx, &stm.pat, code)?;
    let dests: Vec<ValueDestination> = stm.pat.elems.iter().map(ValueDestination::for_pat_elem).collect();
    compile_exp(c, ctx, &dests, &stm.exp, code)
}

fn compile_alloc(ctx: &mut CodegenCtx, pat: &Pattern, size: &SizeExpr, space: Space, code: &mut Code) -> Result<()> {
    let mem = match pat.elems.as_slice() {
        [pe] if pe.ty.is_mem() => &pe.name,
        _ => bail_codegen!("allocation must bind exactly one memory block"),
    };
    if ctx.in_kernel() {
        return Err(CompilerError::UnimplementedInKernel(format!(
            "allocation of `{}` inside a nested kernel body",
            mem
        )));
    }
    trace!("allocating {} elements for {} in {} memory", size, mem, space);
    code.emit(Stmt::DeclareMem {
        name: mem.clone(),
        space,
    });
    code.emit(Stmt::Allocate {
        mem: mem.clone(),
        size: size.clone(),
        space,
    });
    ctx.bind_mem(mem, size.clone(), space);
    Ok(())
}

/// Declare scalar pattern elements and register every element in the context.
/// Arrays need no declaration: their memory already exists.
fn declare_pattern(ctx: &mut CodegenCtx, pat: &Pattern, code: &mut Code) -> Result<()> {
    for pe in &pat.elems {
        if pe.summary.is_none() {
            code.emit(Stmt::DeclareScalar {
                name: pe.name.clone(),
                ty: pe.ty.clone(),
            });
        }
        ctx.bind_pat_elem(pe)?;
    }
    Ok(())
}

fn single_dest(dests: &[ValueDestination]) -> Result<&ValueDestination> {
    match dests {
        [dest] => Ok(dest),
        _ => Err(err_codegen!("expected one destination, got {}", dests.len())),
    }
}

fn scalar_dest(dests: &[ValueDestination]) -> Result<&VName> {
    match single_dest(dests)? {
        ValueDestination::Scalar(name) => Ok(name),
        ValueDestination::Array { mem, .. } => Err(err_codegen!("scalar result stored into array in `{}`", mem)),
    }
}

fn size_of(se: &SubExp) -> Result<SizeExpr> {
    se.to_size().ok_or_else(|| err_codegen!("`{}` is not an integer index", se))
}

fn sizes_of(ses: &[SubExp]) -> Result<Vec<SizeExpr>> {
    ses.iter().map(size_of).collect()
}

fn compile_exp<C: ExpCompiler>(
    c: &mut C,
    ctx: &mut CodegenCtx,
    dests: &[ValueDestination],
    exp: &Exp,
    code: &mut Code,
) -> Result<()> {
    match exp {
        Exp::SubExp(se) => assign(ctx, single_dest(dests)?, se, code),
        Exp::BinOp { op, lhs, rhs } => {
            code.emit(Stmt::SetScalar {
                name: scalar_dest(dests)?.clone(),
                value: ImpExp::bin_op(*op, lhs.into(), rhs.into()),
            });
            Ok(())
        }
        Exp::Index { array, indices } => {
            let dest = scalar_dest(dests)?.clone();
            let (ty, summary) = ctx.lookup_array(array)?;
            if indices.len() != summary.ixfun.rank() {
                bail_codegen!("indexing `{}` with {} indices does not yield a scalar", array, indices.len());
            }
            let index = summary.ixfun.linear_index(&sizes_of(indices)?);
            let elem = ty.elem_type().clone();
            let mem = summary.mem.clone();
            let space = ctx.mem_space(&mem)?;
            code.emit(Stmt::Read {
                dest,
                mem,
                index,
                elem,
                space,
            });
            Ok(())
        }
        Exp::Update { indices, value, .. } => {
            let (mem, ixfun, elem) = match single_dest(dests)? {
                ValueDestination::Array { mem, ixfun, elem } => (mem, ixfun, elem),
                ValueDestination::Scalar(name) => bail_codegen!("in-place update bound to scalar `{}`", name),
            };
            code.emit(Stmt::Write {
                mem: mem.clone(),
                index: ixfun.linear_index(&sizes_of(indices)?),
                elem: elem.clone(),
                space: ctx.mem_space(mem)?,
                value: value.into(),
            });
            Ok(())
        }
        Exp::Alloc { .. } => bail_codegen!("allocation in expression position"),
        // The pattern's summary already places the array.
        Exp::Scratch { .. } => Ok(()),
        Exp::If {
            cond,
            then_body,
            else_body,
        } => {
            let then_code = compile_body_into(c, ctx, dests, then_body)?;
            let else_code = compile_body_into(c, ctx, dests, else_body)?;
            code.emit(Stmt::If {
                cond: cond.into(),
                then_code,
                else_code,
            });
            Ok(())
        }
        Exp::Loop {
            merge,
            counter,
            bound,
            body,
        } => compile_loop(
            c,
            ctx,
            dests,
            LoopParts {
                merge,
                counter,
                bound,
                body,
            },
            code,
        ),
        Exp::Map { lambda, inputs } => compile_map_loop(c, ctx, dests, lambda, inputs, code),
    }
}

/// Store `se` into `dest`. Arrays are never copied: an array result must
/// already live where the destination expects it.
fn assign(ctx: &CodegenCtx, dest: &ValueDestination, se: &SubExp, code: &mut Code) -> Result<()> {
    match dest {
        ValueDestination::Scalar(name) => {
            code.emit(Stmt::SetScalar {
                name: name.clone(),
                value: se.into(),
            });
            Ok(())
        }
        ValueDestination::Array { mem, ixfun, .. } => {
            let src = se.as_var().ok_or_else(|| err_codegen!("constant {} stored into array", se))?;
            match ctx.entry(src)? {
                VarEntry::Array { summary, .. } if &summary.mem == mem && &summary.ixfun == ixfun => Ok(()),
                VarEntry::Array { summary, .. } => Err(err_codegen!(
                    "array `{}` in `{}` would need a copy into `{}`",
                    src,
                    summary.mem,
                    mem
                )),
                _ => Err(err_codegen!("`{}` stored into array in `{}` is not an array", src, mem)),
            }
        }
    }
}

fn compile_body_into<C: ExpCompiler>(
    c: &mut C,
    ctx: &mut CodegenCtx,
    dests: &[ValueDestination],
    body: &Body,
) -> Result<Code> {
    if dests.len() != body.result.len() {
        bail_codegen!("body returns {} values for {} destinations", body.result.len(), dests.len());
    }
    let mut code = Code::new();
    c.compile_stms(ctx, &body.stms, &mut code)?;
    for (dest, se) in dests.iter().zip(&body.result) {
        assign(ctx, dest, se, &mut code)?;
    }
    Ok(code)
}

/// Borrowed fields of an `Exp::Loop`.
struct LoopParts<'a> {
    merge: &'a [(Param, SubExp)],
    counter: &'a VName,
    bound: &'a SubExp,
    body: &'a Body,
}

fn compile_loop<C: ExpCompiler>(
    c: &mut C,
    ctx: &mut CodegenCtx,
    dests: &[ValueDestination],
    parts: LoopParts<'_>,
    code: &mut Code,
) -> Result<()> {
    let LoopParts {
        merge,
        counter,
        bound,
        body,
    } = parts;
    if merge.len() != body.result.len() || merge.len() != dests.len() {
        bail_codegen!("loop with {} merge parameters returns {} values", merge.len(), body.result.len());
    }

    let mut merge_dests = Vec::with_capacity(merge.len());
    for (param, init) in merge {
        if param.summary.is_none() {
            code.emit(Stmt::DeclareScalar {
                name: param.name.clone(),
                ty: param.ty.clone(),
            });
        }
        ctx.bind_pat_elem(param)?;
        let dest = ValueDestination::for_pat_elem(param);
        assign(ctx, &dest, init, code)?;
        merge_dests.push(dest);
    }

    ctx.bind_scalar(counter, types::i64());
    let mut loop_code = Code::new();
    c.compile_stms(ctx, &body.stms, &mut loop_code)?;

    // Results may read merge parameters, so stage scalars through temporaries
    // before rebinding.
    let mut staged = Vec::new();
    for ((param, _), se) in merge.iter().zip(&body.result) {
        if param.summary.is_some() {
            staged.push(se.clone());
            continue;
        }
        let tmp = ctx.fresh(&format!("{}_next", param.name.base));
        loop_code.emit(Stmt::DeclareScalar {
            name: tmp.clone(),
            ty: param.ty.clone(),
        });
        loop_code.emit(Stmt::SetScalar {
            name: tmp.clone(),
            value: se.into(),
        });
        ctx.bind_scalar(&tmp, param.ty.clone());
        staged.push(SubExp::Var(tmp));
    }
    for (dest, se) in merge_dests.iter().zip(&staged) {
        assign(ctx, dest, se, &mut loop_code)?;
    }

    code.emit(Stmt::For {
        counter: counter.clone(),
        bound: bound.into(),
        body: loop_code,
    });

    for (dest, (param, _)) in dests.iter().zip(merge) {
        assign(ctx, dest, &SubExp::var(&param.name), code)?;
    }
    Ok(())
}

fn compile_map_loop<C: ExpCompiler>(
    c: &mut C,
    ctx: &mut CodegenCtx,
    dests: &[ValueDestination],
    lambda: &Lambda,
    inputs: &[VName],
    code: &mut Code,
) -> Result<()> {
    let first = inputs.first().ok_or_else(|| err_codegen!("map without input arrays"))?;
    let width = ctx
        .array_shape(first)?
        .first()
        .cloned()
        .ok_or_else(|| err_codegen!("map input `{}` is not an array", first))?;
    if lambda.params.len() != inputs.len() || lambda.body.result.len() != dests.len() {
        bail_codegen!("map lambda arity does not match its inputs and outputs");
    }

    let i = ctx.fresh("i");
    ctx.bind_scalar(&i, types::i64());
    let row = [SizeExpr::var(&i)];
    let mut loop_code = Code::new();

    for (param, input) in lambda.params.iter().zip(inputs) {
        let (ty, summary) = ctx.lookup_array(input)?;
        if summary.ixfun.rank() != 1 || !param.ty.is_scalar() {
            bail_codegen!("sequential map over `{}` requires rank-1 input", input);
        }
        let elem = ty.elem_type().clone();
        let mem = summary.mem.clone();
        let index = summary.ixfun.linear_index(&row);
        let space = ctx.mem_space(&mem)?;
        loop_code.emit(Stmt::DeclareScalar {
            name: param.name.clone(),
            ty: param.ty.clone(),
        });
        loop_code.emit(Stmt::Read {
            dest: param.name.clone(),
            mem,
            index,
            elem,
            space,
        });
        ctx.bind_scalar(&param.name, param.ty.clone());
    }

    c.compile_stms(ctx, &lambda.body.stms, &mut loop_code)?;

    for (dest, se) in dests.iter().zip(&lambda.body.result) {
        let (mem, ixfun, elem) = match dest {
            ValueDestination::Array { mem, ixfun, elem } => (mem, ixfun, elem),
            ValueDestination::Scalar(name) => bail_codegen!("map result bound to scalar `{}`", name),
        };
        loop_code.emit(Stmt::Write {
            mem: mem.clone(),
            index: ixfun.linear_index(&row),
            elem: elem.clone(),
            space: ctx.mem_space(mem)?,
            value: se.into(),
        });
    }

    code.emit(Stmt::For {
        counter: i,
        bound: (&width).into(),
        body: loop_code,
    });
    Ok(())
}
