//! Planning of host/device transfers around a kernel launch.
//!
//! Whole blocks are moved: an input array's entire backing block is copied
//! in, even if the kernel touches only part of it.

use crate::codegen::{CodegenCtx, ValueDestination, VarEntry};
use crate::error::{CompilerError, Result};
use crate::imp::MemoryTransfer;
use crate::ir::free_vars::free_in_lambda;
use crate::ir::{Lambda, VName};
use log::trace;

/// Transfers needed before launch: the blocks backing `inputs`, then every
/// variable the lambda reads from outside.
///
/// Each block is copied at most once. The map's own inputs are excluded from
/// the free variables since their blocks are already listed.
pub fn plan_copy_in(ctx: &CodegenCtx, lambda: &Lambda, inputs: &[VName]) -> Result<Vec<MemoryTransfer>> {
    let mut transfers = Vec::new();
    for input in inputs {
        let (_, summary) = ctx.lookup_array(input)?;
        push_memory(ctx, &mut transfers, &summary.mem)?;
    }

    for name in free_in_lambda(lambda) {
        if inputs.contains(&name) {
            continue;
        }
        match ctx.entry(&name)? {
            VarEntry::Array { .. } => return Err(CompilerError::UnsupportedFreeArrayVariable(name)),
            VarEntry::Mem { .. } => push_memory(ctx, &mut transfers, &name)?,
            VarEntry::Scalar { ty } => {
                trace!("copy in scalar {}", name);
                transfers.push(MemoryTransfer::CopyScalar { ty: ty.clone(), name });
            }
        }
    }
    Ok(transfers)
}

/// Transfers needed after the kernel: the block behind every array
/// destination. Other destinations produce nothing.
pub fn plan_copy_out(ctx: &CodegenCtx, dests: &[ValueDestination]) -> Result<Vec<MemoryTransfer>> {
    let mut transfers = Vec::new();
    for dest in dests {
        if let ValueDestination::Array { mem, .. } = dest {
            push_memory(ctx, &mut transfers, mem)?;
        }
    }
    Ok(transfers)
}

fn push_memory(ctx: &CodegenCtx, transfers: &mut Vec<MemoryTransfer>, mem: &VName) -> Result<()> {
    let already_listed = transfers
        .iter()
        .any(|t| matches!(t, MemoryTransfer::CopyMemory { mem: m, .. } if m == mem));
    if !already_listed {
        let size = ctx.mem_size(mem)?.clone();
        trace!("transfer block {} [{}]", mem, size);
        transfers.push(MemoryTransfer::CopyMemory { mem: mem.clone(), size });
    }
    Ok(())
}
