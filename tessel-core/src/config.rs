//! Options controlling kernel generation.

/// Kernel generation settings, held by the code generation context.
#[derive(Debug, Clone)]
pub struct KernelConfig {
    /// Base name for the fresh per-kernel thread index variable.
    pub thread_index_name: String,
    /// Re-emit thread-local allocations extracted from a kernel body as one
    /// device allocation, sized for all threads, before the launch. When
    /// disabled such kernels are rejected.
    pub hoist_thread_allocations: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        KernelConfig {
            thread_index_name: "gtid".to_string(),
            hoist_thread_allocations: true,
        }
    }
}
