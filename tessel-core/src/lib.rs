pub mod codegen;
pub mod config;
pub mod error;
pub mod imp;
pub mod ir;
pub mod kernel;

#[cfg(test)]
mod testing;

use std::marker::PhantomData;

use codegen::{CodegenCtx, ExpCompiler};
use error::Result;
use imp::Code;
use ir::Body;
use kernel::KernelCompiler;
use log::debug;

pub use codegen::sequential::SequentialCompiler;
pub use config::KernelConfig;
pub use error::{CompilerError, ErrorCategory};
pub use imp::{Kernel, MemoryTransfer};

// =============================================================================
// Generic ID allocation
// =============================================================================

/// Generic counter for generating unique IDs.
///
/// The ID type must implement `From<u32>` to convert the raw counter value.
#[derive(Debug, Clone)]
pub struct IdSource<Id> {
    next_id: u32,
    _phantom: PhantomData<Id>,
}

impl<Id: From<u32>> IdSource<Id> {
    pub fn new() -> Self {
        IdSource {
            next_id: 0,
            _phantom: PhantomData,
        }
    }

    pub fn next(&mut self) -> Id {
        let id = Id::from(self.next_id);
        self.next_id += 1;
        id
    }
}

impl<Id: From<u32>> Default for IdSource<Id> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Entry point
// =============================================================================

/// Compile the statements of `body` to imperative code.
///
/// Every `map` becomes a kernel; all other statements are compiled
/// sequentially. The variables `body` reads from outside must already be
/// bound in `ctx`. Errors are fatal: no partial code is returned.
pub fn compile_body(ctx: &mut CodegenCtx, body: &Body) -> Result<Code> {
    let mut code = Code::new();
    KernelCompiler.compile_stms(ctx, &body.stms, &mut code).inspect_err(|e| {
        debug!("code generation failed ({:?}): {}", e.category(), e);
    })?;
    debug!("compiled {} statement(s), {} kernel(s)", body.stms.len(), code.kernels().len());
    Ok(code)
}
