//! Per-thread reads of kernel inputs and writes of kernel results.
//!
//! Thread `t` of a map kernel reads element `t` of every input array into the
//! matching lambda parameter and writes its results to element `t` of every
//! destination array.

use crate::codegen::{CodegenCtx, ValueDestination};
use crate::error::{CompilerError, Result};
use crate::imp::{Code, Stmt};
use crate::ir::{Param, SizeExpr, SubExp, TypeExt, VName};

/// Bind `param` to this thread's element of the rank-1 array `input`.
pub fn read_thread_param(
    ctx: &mut CodegenCtx,
    thread_index: &VName,
    param: &Param,
    input: &VName,
    code: &mut Code,
) -> Result<()> {
    let (ty, summary) = ctx.lookup_array(input)?;
    let rank = summary.ixfun.rank();
    if rank != 1 {
        return Err(CompilerError::UnsupportedKernelInputRank {
            array: input.clone(),
            rank,
        });
    }

    let elem = ty.elem_type().clone();
    let mem = summary.mem.clone();
    let index = summary.ixfun.linear_index(&[SizeExpr::var(thread_index)]);
    let space = ctx.mem_space(&mem)?;

    code.emit(Stmt::DeclareScalar {
        name: param.name.clone(),
        ty: param.ty.clone(),
    });
    code.emit(Stmt::Read {
        dest: param.name.clone(),
        mem,
        index,
        elem,
        space,
    });
    ctx.bind_scalar(&param.name, param.ty.clone());
    Ok(())
}

/// Store this thread's scalar `result` into its element of `dest`.
pub fn write_thread_result(
    ctx: &CodegenCtx,
    thread_index: &VName,
    dest: &ValueDestination,
    result: &SubExp,
    code: &mut Code,
) -> Result<()> {
    let (mem, ixfun, elem) = match dest {
        ValueDestination::Array { mem, ixfun, elem } => (mem, ixfun, elem),
        ValueDestination::Scalar(_) => return Err(CompilerError::UnsupportedKernelResultShape),
    };
    if let SubExp::Var(name) = result {
        if !ctx.lookup_type(name)?.is_scalar() {
            return Err(CompilerError::UnsupportedKernelResultType(name.clone()));
        }
    }

    code.emit(Stmt::Write {
        mem: mem.clone(),
        index: ixfun.linear_index(&[SizeExpr::var(thread_index)]),
        elem: elem.clone(),
        space: ctx.mem_space(mem)?,
        value: result.into(),
    });
    Ok(())
}
