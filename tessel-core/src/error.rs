//! Errors raised while lowering a program to imperative code.
//!
//! Every error here is fatal to the compilation: kernel generation runs after
//! type checking, so a failure means either an input shape the kernel
//! generator does not support or a defect in an earlier pass.

use crate::ir::VName;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CompilerError>;

/// How the top-level driver should report an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The program uses a construct this stage cannot lower.
    Unsupported,
    /// An earlier pass produced IR this stage should never see.
    Internal,
}

#[derive(Debug, Error, PartialEq)]
pub enum CompilerError {
    #[error("size of allocation `{block}` reads `{variable}`, which is bound inside the kernel lambda")]
    NonInvariantAllocationSize { block: VName, variable: VName },

    #[error("free array variable `{0}` cannot be passed to a kernel")]
    UnsupportedFreeArrayVariable(VName),

    #[error("kernel must return an array")]
    UnsupportedKernelResultShape,

    #[error("cannot handle non-basic kernel thread result `{0}`")]
    UnsupportedKernelResultType(VName),

    #[error("kernel input `{array}` has rank {rank}, only rank-1 inputs are supported")]
    UnsupportedKernelInputRank { array: VName, rank: usize },

    #[error("thread-local allocation `{0}` cannot be hoisted out of the kernel")]
    UnsupportedThreadLocalAllocation(VName),

    #[error("not implemented inside a kernel body: {0}")]
    UnimplementedInKernel(String),

    #[error("unknown variable `{0}`")]
    UnknownVariable(VName),

    #[error("internal compiler error: {0}")]
    Internal(String),
}

impl CompilerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CompilerError::UnknownVariable(_) | CompilerError::Internal(_) => ErrorCategory::Internal,
            _ => ErrorCategory::Unsupported,
        }
    }
}

/// Build an internal code generation error from a format string.
#[macro_export]
macro_rules! err_codegen {
    ($($arg:tt)*) => {
        $crate::error::CompilerError::Internal(format!($($arg)*))
    };
}

/// Return early with an internal code generation error.
#[macro_export]
macro_rules! bail_codegen {
    ($($arg:tt)*) => {
        return Err($crate::err_codegen!($($arg)*))
    };
}
