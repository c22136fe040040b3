//! Memory-space normalization for kernel bodies.
//!
//! While a kernel body is generated, every memory block the context knows
//! about is treated as device-global. This over-approximates: no finer
//! address spaces are modelled.

use crate::codegen::CodegenCtx;
use crate::ir::{Space, VName};
use log::trace;
use std::ops::{Deref, DerefMut};

/// Exclusive access to the context with all memory retagged `Global`.
///
/// Dropping the scope restores the previous tags and forgets every binding
/// made inside it, on success, early return and unwinding alike.
pub struct DeviceScope<'a> {
    ctx: &'a mut CodegenCtx,
    saved_tags: Vec<(VName, Space)>,
    num_bindings: usize,
    was_in_kernel: bool,
}

impl<'a> DeviceScope<'a> {
    pub fn enter(ctx: &'a mut CodegenCtx) -> Self {
        let num_bindings = ctx.num_bindings();
        let saved_tags = ctx.retag_memory(Space::Global);
        let was_in_kernel = ctx.set_in_kernel(true);
        trace!("entering device scope: {} block(s) retagged global", saved_tags.len());
        DeviceScope {
            ctx,
            saved_tags,
            num_bindings,
            was_in_kernel,
        }
    }
}

impl Deref for DeviceScope<'_> {
    type Target = CodegenCtx;

    fn deref(&self) -> &CodegenCtx {
        &*self.ctx
    }
}

impl DerefMut for DeviceScope<'_> {
    fn deref_mut(&mut self) -> &mut CodegenCtx {
        &mut *self.ctx
    }
}

impl Drop for DeviceScope<'_> {
    fn drop(&mut self) {
        self.ctx.truncate_bindings(self.num_bindings);
        self.ctx.restore_memory_tags(std::mem::take(&mut self.saved_tags));
        self.ctx.set_in_kernel(self.was_in_kernel);
        trace!("left device scope");
    }
}
