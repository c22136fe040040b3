//! Code generation context and the generic statement compiler interface.
//!
//! `CodegenCtx` is the symbol table consulted while lowering: for every
//! variable in scope it records whether it is a scalar, an array (with its
//! memory summary) or a memory block (with its size and address space). It is
//! passed explicitly to every function that needs it.

use crate::config::KernelConfig;
use crate::error::{CompilerError, Result};
use crate::imp::Code;
use crate::ir::free_vars::free_in_body;
use crate::ir::{
    Body, IndexFun, MemSummary, NameSource, PatElem, SizeExpr, Space, Stm, SubExp, Type, TypeExt, VName,
    types,
};
use crate::err_codegen;
use indexmap::{IndexMap, IndexSet};

pub mod sequential;

#[cfg(test)]
mod sequential_tests;

/// What the context knows about a variable.
#[derive(Debug, Clone, PartialEq)]
pub enum VarEntry {
    Scalar { ty: Type },
    Array { ty: Type, summary: MemSummary },
    Mem { size: SizeExpr, space: Space },
}

/// Where the result of an expression must be stored.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueDestination {
    /// A scalar variable.
    Scalar(VName),
    /// Elements of an array living in `mem` with layout `ixfun`.
    Array { mem: VName, ixfun: IndexFun, elem: Type },
}

impl ValueDestination {
    pub fn for_pat_elem(pe: &PatElem) -> Self {
        match &pe.summary {
            Some(summary) => ValueDestination::Array {
                mem: summary.mem.clone(),
                ixfun: summary.ixfun.clone(),
                elem: pe.ty.elem_type().clone(),
            },
            None => ValueDestination::Scalar(pe.name.clone()),
        }
    }
}

/// Compiles one statement into imperative code.
///
/// Implementations decide how each expression shape is lowered. Nested
/// bodies are compiled back through the same implementation, so a compiler
/// that recognizes a shape at the top level also sees it inside branches and
/// loops.
pub trait ExpCompiler {
    fn compile_stm(&mut self, ctx: &mut CodegenCtx, stm: &Stm, code: &mut Code) -> Result<()>;

    fn compile_stms(&mut self, ctx: &mut CodegenCtx, stms: &[Stm], code: &mut Code) -> Result<()> {
        for stm in stms {
            self.compile_stm(ctx, stm, code)?;
        }
        Ok(())
    }
}

pub struct CodegenCtx {
    vars: IndexMap<VName, VarEntry>,
    names: NameSource,
    config: KernelConfig,
    in_kernel: bool,
}

impl CodegenCtx {
    /// `names` must be the source that produced the names of the program
    /// being compiled, so that fresh names cannot collide with them.
    pub fn new(config: KernelConfig, names: NameSource) -> Self {
        CodegenCtx {
            vars: IndexMap::new(),
            names,
            config,
            in_kernel: false,
        }
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn fresh(&mut self, base: &str) -> VName {
        self.names.fresh(base)
    }

    /// True while generating the body of a kernel.
    pub fn in_kernel(&self) -> bool {
        self.in_kernel
    }

    // =========================================================================
    // Bindings
    // =========================================================================

    pub fn bind_scalar(&mut self, name: &VName, ty: Type) {
        self.vars.insert(name.clone(), VarEntry::Scalar { ty });
    }

    pub fn bind_array(&mut self, name: &VName, ty: Type, summary: MemSummary) {
        self.vars.insert(name.clone(), VarEntry::Array { ty, summary });
    }

    pub fn bind_mem(&mut self, name: &VName, size: SizeExpr, space: Space) {
        self.vars.insert(name.clone(), VarEntry::Mem { size, space });
    }

    /// Bind a scalar or array pattern element. Memory handles are only
    /// introduced by allocations, which know their size.
    pub fn bind_pat_elem(&mut self, pe: &PatElem) -> Result<()> {
        match &pe.summary {
            Some(summary) => self.bind_array(&pe.name, pe.ty.clone(), summary.clone()),
            None if pe.ty.is_scalar() => self.bind_scalar(&pe.name, pe.ty.clone()),
            None => {
                return Err(err_codegen!(
                    "`{}` of type {} has no memory summary",
                    pe.name,
                    types::format_type(&pe.ty)
                ));
            }
        }
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn entry(&self, name: &VName) -> Result<&VarEntry> {
        self.vars.get(name).ok_or_else(|| CompilerError::UnknownVariable(name.clone()))
    }

    pub fn lookup_type(&self, name: &VName) -> Result<Type> {
        Ok(match self.entry(name)? {
            VarEntry::Scalar { ty } | VarEntry::Array { ty, .. } => ty.clone(),
            VarEntry::Mem { .. } => types::mem(),
        })
    }

    /// Type and memory summary of an array variable.
    pub fn lookup_array(&self, name: &VName) -> Result<(&Type, &MemSummary)> {
        match self.entry(name)? {
            VarEntry::Array { ty, summary } => Ok((ty, summary)),
            _ => Err(err_codegen!("`{}` is not an array", name)),
        }
    }

    pub fn array_shape(&self, name: &VName) -> Result<&[SizeExpr]> {
        let (_, summary) = self.lookup_array(name)?;
        Ok(summary.ixfun.shape())
    }

    /// Size and address space of a memory block.
    pub fn lookup_mem(&self, name: &VName) -> Result<(&SizeExpr, Space)> {
        match self.entry(name)? {
            VarEntry::Mem { size, space } => Ok((size, *space)),
            _ => Err(err_codegen!("`{}` is not a memory block", name)),
        }
    }

    pub fn mem_size(&self, name: &VName) -> Result<&SizeExpr> {
        Ok(self.lookup_mem(name)?.0)
    }

    pub fn mem_space(&self, name: &VName) -> Result<Space> {
        Ok(self.lookup_mem(name)?.1)
    }

    pub fn free_vars(&self, body: &Body) -> IndexSet<VName> {
        free_in_body(body)
    }

    /// Number of elements of an array with the given dimensions.
    pub fn size_from_dims(&self, dims: &[SubExp]) -> Result<SizeExpr> {
        let factors = dims
            .iter()
            .map(|dim| dim.to_size().ok_or_else(|| err_codegen!("non-integer dimension {}", dim)))
            .collect::<Result<Vec<_>>>()?;
        Ok(SizeExpr::product(factors))
    }

    // =========================================================================
    // Scoped overrides, used by kernel::space::DeviceScope
    // =========================================================================

    pub(crate) fn num_bindings(&self) -> usize {
        self.vars.len()
    }

    /// Drop every binding made after the first `len`.
    pub(crate) fn truncate_bindings(&mut self, len: usize) {
        self.vars.truncate(len);
    }

    /// Tag every known memory block with `space`, returning the previous tags.
    pub(crate) fn retag_memory(&mut self, space: Space) -> Vec<(VName, Space)> {
        let mut previous = Vec::new();
        for (name, entry) in self.vars.iter_mut() {
            if let VarEntry::Mem { space: old, .. } = entry {
                previous.push((name.clone(), *old));
                *old = space;
            }
        }
        previous
    }

    pub(crate) fn restore_memory_tags(&mut self, tags: Vec<(VName, Space)>) {
        for (name, tag) in tags {
            if let Some(VarEntry::Mem { space, .. }) = self.vars.get_mut(&name) {
                *space = tag;
            }
        }
    }

    pub(crate) fn set_in_kernel(&mut self, in_kernel: bool) -> bool {
        std::mem::replace(&mut self.in_kernel, in_kernel)
    }
}
