//! Per-thread offset rewriting.
//!
//! After extraction, every thread shares one block per extracted allocation.
//! Thread `t` owns elements `[t * size, (t + 1) * size)` of each, so every
//! memory summary that refers to an extracted block gets `t * size` composed
//! into its index function. Summaries of other blocks are left untouched.

use super::extract::BlockSizes;
use crate::ir::folder::IrFolder;
use crate::ir::{Body, MemSummary, SizeExpr, VName};
use indexmap::IndexMap;
use log::trace;
use std::convert::Infallible;

/// Additive element offsets, keyed by memory block.
pub type BlockOffsets = IndexMap<VName, SizeExpr>;

/// `thread_index * size` for every extracted block.
pub fn thread_offsets(thread_index: &VName, blocks: &BlockSizes) -> BlockOffsets {
    blocks
        .iter()
        .map(|(block, size)| {
            let offset = SizeExpr::mul(SizeExpr::var(thread_index), size.clone());
            trace!("thread offset of {}: {}", block, offset);
            (block.clone(), offset)
        })
        .collect()
}

/// Compose the offsets into every matching summary in `body`, at any depth.
pub fn offset_body(offsets: &BlockOffsets, body: Body) -> Body {
    let mut rewriter = OffsetRewriter { offsets };
    match rewriter.visit_body(body) {
        Ok(body) => body,
        Err(never) => match never {},
    }
}

struct OffsetRewriter<'a> {
    offsets: &'a BlockOffsets,
}

impl IrFolder for OffsetRewriter<'_> {
    type Error = Infallible;

    fn visit_mem_summary(&mut self, summary: MemSummary) -> Result<MemSummary, Infallible> {
        Ok(match self.offsets.get(&summary.mem) {
            Some(offset) => MemSummary {
                ixfun: summary.ixfun.offset_underlying(offset.clone()),
                mem: summary.mem,
            },
            None => summary,
        })
    }
}
