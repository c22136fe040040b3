//! Allocation extraction.
//!
//! Pulls the top-level allocations out of a kernel lambda's body. Each thread
//! would otherwise allocate its own block; instead one block sized for all
//! threads is allocated outside the kernel and partitioned by thread index.
//!
//! Only the top level of the body is scanned. Allocations inside nested
//! branches or loops stay where they are and are rejected later, when the
//! kernel body is compiled.

use crate::error::{CompilerError, Result};
use crate::ir::free_vars::bound_in_lambda;
use crate::ir::{Body, Exp, Lambda, SizeExpr, VName};
use indexmap::IndexMap;
use log::debug;

/// Per-thread block sizes, keyed by the extracted block.
pub type BlockSizes = IndexMap<VName, SizeExpr>;

/// Split `lambda`'s body into the body without its top-level allocations and
/// the sizes of the blocks those allocations created.
///
/// Fails if an allocation size reads a name bound by the lambda's parameters
/// or body: such a size differs per thread and cannot be hoisted.
pub fn extract_allocations(lambda: &Lambda) -> Result<(Body, BlockSizes)> {
    let bound = bound_in_lambda(lambda);
    let mut blocks = BlockSizes::new();
    let mut stms = Vec::with_capacity(lambda.body.stms.len());

    for stm in &lambda.body.stms {
        match (&stm.exp, stm.pat.elems.as_slice()) {
            (Exp::Alloc { size, .. }, [block]) => {
                if let Some(variable) = size.free_vars().into_iter().find(|v| bound.contains(v)) {
                    return Err(CompilerError::NonInvariantAllocationSize {
                        block: block.name.clone(),
                        variable,
                    });
                }
                blocks.insert(block.name.clone(), size.clone());
            }
            _ => stms.push(stm.clone()),
        }
    }

    if !blocks.is_empty() {
        debug!("extracted {} thread-local allocation(s) from kernel lambda", blocks.len());
    }
    Ok((Body::new(stms, lambda.body.result.clone()), blocks))
}

/// Scale every per-thread size by the number of threads.
pub fn expand_allocations(blocks: &BlockSizes, thread_count: &SizeExpr) -> BlockSizes {
    blocks
        .iter()
        .map(|(block, size)| (block.clone(), SizeExpr::mul(size.clone(), thread_count.clone())))
        .collect()
}
