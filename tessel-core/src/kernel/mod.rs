//! Kernel generation for map combinators.
//!
//! A `map` over arrays becomes one kernel with one thread per element:
//!
//! ```text
//! let ys = map (\x -> let tmp = alloc(k) in ... in x') xs
//! ```
//! Becomes:
//! ```text
//! tmp <- alloc@global(k * n)               // one block for all threads
//! kernel gtid < n {
//!   copy_in  xs_mem, <free scalars and blocks>
//!   copy_out ys_mem
//!   body {
//!     x <- xs_mem[gtid]
//!     ...                                   // tmp accesses offset by gtid * k
//!     ys_mem[gtid] <- x'
//!   }
//! }
//! ```
//!
//! Steps, in order: extract thread-local allocations, hoist them scaled by the
//! thread count, offset every access to them by the thread index, generate
//! the thread body with all memory treated as device-global, plan transfers,
//! and emit the kernel. Every other statement goes to the sequential compiler.

use crate::codegen::sequential::{self, SequentialCompiler};
use crate::codegen::{CodegenCtx, ExpCompiler, ValueDestination};
use crate::error::{CompilerError, Result};
use crate::imp::{Code, Kernel, Stmt};
use crate::ir::{Body, Exp, Lambda, Pattern, SizeExpr, Space, Stm, VName, types};
use crate::{bail_codegen, err_codegen};
use log::debug;

pub mod extract;
pub mod offset;
pub mod space;
pub mod thread_io;
pub mod transfer;


use extract::{BlockSizes, expand_allocations, extract_allocations};
use offset::{offset_body, thread_offsets};
use space::DeviceScope;
use thread_io::{read_thread_param, write_thread_result};

/// Compiles maps to kernels and everything else sequentially.
///
/// Maps nested in host-side branches and loops also become kernels; maps
/// inside a kernel body are compiled as sequential loops.
#[derive(Debug, Default)]
pub struct KernelCompiler;

impl ExpCompiler for KernelCompiler {
    fn compile_stm(&mut self, ctx: &mut CodegenCtx, stm: &Stm, code: &mut Code) -> Result<()> {
        match &stm.exp {
            Exp::Map { lambda, inputs } => compile_map_kernel(ctx, &stm.pat, lambda, inputs, code),
            _ => sequential::compile_stm(self, ctx, stm, code),
        }
    }
}

/// Lower `pat = map lambda inputs` to a kernel appended to `code`.
pub fn compile_map_kernel(
    ctx: &mut CodegenCtx,
    pat: &Pattern,
    lambda: &Lambda,
    inputs: &[VName],
    code: &mut Code,
) -> Result<()> {
    let thread_count = thread_count(ctx, inputs)?;

    let (pruned, blocks) = extract_allocations(lambda)?;
    hoist_thread_allocations(ctx, &blocks, &thread_count, code)?;

    let base = ctx.config().thread_index_name.clone();
    let thread_index = ctx.fresh(&base);
    let offsets = thread_offsets(&thread_index, &blocks);
    let body = offset_body(&offsets, pruned);

    let dests: Vec<ValueDestination> = pat.elems.iter().map(ValueDestination::for_pat_elem).collect();
    let kernel_body = {
        let mut scope = DeviceScope::enter(ctx);
        generate_thread_body(&mut scope, &thread_index, lambda, inputs, &body, &dests)?
    };

    let copy_in = transfer::plan_copy_in(ctx, lambda, inputs)?;
    let copy_out = transfer::plan_copy_out(ctx, &dests)?;

    let kernel = Kernel::new(thread_index, kernel_body, copy_in, copy_out, thread_count);
    debug!("generated kernel:\n{}", kernel);
    code.emit(Stmt::Kernel(kernel));

    for pe in &pat.elems {
        ctx.bind_pat_elem(pe)?;
    }
    Ok(())
}

/// Outer dimension of the first input. Inputs are assumed conformant.
fn thread_count(ctx: &CodegenCtx, inputs: &[VName]) -> Result<SizeExpr> {
    let first = inputs.first().ok_or_else(|| err_codegen!("map without input arrays"))?;
    ctx.array_shape(first)?
        .first()
        .cloned()
        .ok_or_else(|| err_codegen!("map input `{}` has rank 0", first))
}

/// Allocate each extracted block once, sized for every thread, in front of
/// the kernel.
fn hoist_thread_allocations(
    ctx: &mut CodegenCtx,
    blocks: &BlockSizes,
    thread_count: &SizeExpr,
    code: &mut Code,
) -> Result<()> {
    if let Some(block) = blocks.keys().next() {
        if !ctx.config().hoist_thread_allocations {
            return Err(CompilerError::UnsupportedThreadLocalAllocation(block.clone()));
        }
    }
    for (block, size) in expand_allocations(blocks, thread_count) {
        debug!("hoisting {} as a global allocation of {} elements", block, size);
        code.emit(Stmt::DeclareMem {
            name: block.clone(),
            space: Space::Global,
        });
        code.emit(Stmt::Allocate {
            mem: block.clone(),
            size: size.clone(),
            space: Space::Global,
        });
        ctx.bind_mem(&block, size, Space::Global);
    }
    Ok(())
}

/// Code run by one thread: read the parameters, run the body, write results.
fn generate_thread_body(
    ctx: &mut CodegenCtx,
    thread_index: &VName,
    lambda: &Lambda,
    inputs: &[VName],
    body: &Body,
    dests: &[ValueDestination],
) -> Result<Code> {
    if lambda.params.len() != inputs.len() {
        bail_codegen!("map lambda takes {} parameters but has {} inputs", lambda.params.len(), inputs.len());
    }
    if body.result.len() != dests.len() {
        bail_codegen!("map lambda returns {} values for {} destinations", body.result.len(), dests.len());
    }

    ctx.bind_scalar(thread_index, types::i64());
    let mut code = Code::new();
    for (param, input) in lambda.params.iter().zip(inputs) {
        read_thread_param(ctx, thread_index, param, input, &mut code)?;
    }
    SequentialCompiler.compile_stms(ctx, &body.stms, &mut code)?;
    for (dest, result) in dests.iter().zip(&body.result) {
        write_thread_result(ctx, thread_index, dest, result, &mut code)?;
    }
    Ok(code)
}
