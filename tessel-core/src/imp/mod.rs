//! Imperative target code.
//!
//! Code generation lowers the IR into a flat, ordered list of statements.
//! Kernels are statements too: a `Kernel` carries its own per-thread body and
//! the memory transfers to run around its launch.

use crate::ir::{BinOp, PrimValue, SizeExpr, Space, SubExp, Type, VName};

mod display;

/// A scalar expression in imperative code.
#[derive(Debug, Clone, PartialEq)]
pub enum ImpExp {
    Const(PrimValue),
    Var(VName),
    BinOp {
        op: BinOp,
        lhs: Box<ImpExp>,
        rhs: Box<ImpExp>,
    },
}

impl ImpExp {
    pub fn bin_op(op: BinOp, lhs: ImpExp, rhs: ImpExp) -> Self {
        ImpExp::BinOp {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }
}

impl From<&SubExp> for ImpExp {
    fn from(se: &SubExp) -> Self {
        match se {
            SubExp::Const(value) => ImpExp::Const(*value),
            SubExp::Var(name) => ImpExp::Var(name.clone()),
        }
    }
}

impl From<&SizeExpr> for ImpExp {
    fn from(size: &SizeExpr) -> Self {
        match size {
            SizeExpr::Const(n) => ImpExp::Const(PrimValue::Int(*n)),
            SizeExpr::Var(name) => ImpExp::Var(name.clone()),
            SizeExpr::Add(a, b) => ImpExp::bin_op(BinOp::Add, a.as_ref().into(), b.as_ref().into()),
            SizeExpr::Mul(a, b) => ImpExp::bin_op(BinOp::Mul, a.as_ref().into(), b.as_ref().into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    DeclareScalar {
        name: VName,
        ty: Type,
    },
    DeclareMem {
        name: VName,
        space: Space,
    },
    Allocate {
        mem: VName,
        size: SizeExpr,
        space: Space,
    },
    SetScalar {
        name: VName,
        value: ImpExp,
    },
    /// Load one element of type `elem` from `mem` at element offset `index`.
    Read {
        dest: VName,
        mem: VName,
        index: SizeExpr,
        elem: Type,
        space: Space,
    },
    /// Store one element of type `elem` into `mem` at element offset `index`.
    Write {
        mem: VName,
        index: SizeExpr,
        elem: Type,
        space: Space,
        value: ImpExp,
    },
    If {
        cond: ImpExp,
        then_code: Code,
        else_code: Code,
    },
    /// `for counter in 0..bound`
    For {
        counter: VName,
        bound: ImpExp,
        body: Code,
    },
    Kernel(Kernel),
}

/// An ordered instruction stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Code {
    stmts: Vec<Stmt>,
}

impl Code {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a statement at the end of the stream.
    pub fn emit(&mut self, stmt: Stmt) {
        self.stmts.push(stmt);
    }

    pub fn stmts(&self) -> &[Stmt] {
        &self.stmts
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stmt> {
        self.stmts.iter()
    }

    pub fn len(&self) -> usize {
        self.stmts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }

    /// All kernels in the stream, including those nested in branches and loops.
    pub fn kernels(&self) -> Vec<&Kernel> {
        let mut out = Vec::new();
        collect_kernels(self, &mut out);
        out
    }
}

fn collect_kernels<'a>(code: &'a Code, out: &mut Vec<&'a Kernel>) {
    for stmt in code.iter() {
        match stmt {
            Stmt::Kernel(kernel) => out.push(kernel),
            Stmt::If {
                then_code,
                else_code,
                ..
            } => {
                collect_kernels(then_code, out);
                collect_kernels(else_code, out);
            }
            Stmt::For { body, .. } => collect_kernels(body, out),
            _ => {}
        }
    }
}

impl FromIterator<Stmt> for Code {
    fn from_iter<T: IntoIterator<Item = Stmt>>(iter: T) -> Self {
        Code {
            stmts: iter.into_iter().collect(),
        }
    }
}

// =============================================================================
// Kernels
// =============================================================================

/// A data transfer between host and device around a kernel launch.
#[derive(Debug, Clone, PartialEq)]
pub enum MemoryTransfer {
    /// Move a whole memory block of `size` elements.
    CopyMemory { mem: VName, size: SizeExpr },
    /// Move a single scalar variable.
    CopyScalar { name: VName, ty: Type },
}

/// A program run once per logical thread, one thread per element of the
/// mapped input arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    thread_index: VName,
    body: Code,
    copy_in: Vec<MemoryTransfer>,
    copy_out: Vec<MemoryTransfer>,
    thread_count: SizeExpr,
}

impl Kernel {
    pub fn new(
        thread_index: VName,
        body: Code,
        copy_in: Vec<MemoryTransfer>,
        copy_out: Vec<MemoryTransfer>,
        thread_count: SizeExpr,
    ) -> Self {
        Kernel {
            thread_index,
            body,
            copy_in,
            copy_out,
            thread_count,
        }
    }

    /// Variable holding the index of the executing thread inside `body`.
    pub fn thread_index(&self) -> &VName {
        &self.thread_index
    }

    pub fn body(&self) -> &Code {
        &self.body
    }

    /// Transfers to perform before launch, in order.
    pub fn copy_in(&self) -> &[MemoryTransfer] {
        &self.copy_in
    }

    /// Transfers to perform after the kernel completes, in order.
    pub fn copy_out(&self) -> &[MemoryTransfer] {
        &self.copy_out
    }

    pub fn thread_count(&self) -> &SizeExpr {
        &self.thread_count
    }
}
