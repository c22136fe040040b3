//! Human-readable rendering of imperative code, used for debug logging.
//!
//! ```text
//! kernel gtid_7 < n_0 {
//!   copy_in mem mem_1 [n_0], scalar x_2: f32
//!   copy_out mem mem_3 [n_0]
//!   body {
//!     ...
//!   }
//! }
//! ```

use super::{Code, ImpExp, Kernel, MemoryTransfer, Stmt};
use crate::ir::types::format_type;
use std::fmt::{self, Write};

impl fmt::Display for ImpExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImpExp::Const(value) => write!(f, "{}", value),
            ImpExp::Var(name) => write!(f, "{}", name),
            ImpExp::BinOp { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op, rhs),
        }
    }
}

impl fmt::Display for MemoryTransfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryTransfer::CopyMemory { mem, size } => write!(f, "mem {} [{}]", mem, size),
            MemoryTransfer::CopyScalar { name, ty } => write!(f, "scalar {}: {}", name, format_type(ty)),
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut p = Printer::default();
        p.code(self)?;
        f.write_str(&p.out)
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut p = Printer::default();
        p.stmt(self)?;
        f.write_str(&p.out)
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut p = Printer::default();
        p.kernel(self)?;
        f.write_str(&p.out)
    }
}

#[derive(Default)]
struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    fn line(&mut self, args: fmt::Arguments<'_>) -> fmt::Result {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        self.out.write_fmt(args)?;
        self.out.push('\n');
        Ok(())
    }

    fn nested(&mut self, code: &Code) -> fmt::Result {
        self.indent += 1;
        let result = self.code(code);
        self.indent -= 1;
        result
    }

    fn code(&mut self, code: &Code) -> fmt::Result {
        for stmt in code.iter() {
            self.stmt(stmt)?;
        }
        Ok(())
    }

    fn stmt(&mut self, stmt: &Stmt) -> fmt::Result {
        match stmt {
            Stmt::DeclareScalar { name, ty } => self.line(format_args!("var {}: {}", name, format_type(ty))),
            Stmt::DeclareMem { name, space } => self.line(format_args!("var {}: mem@{}", name, space)),
            Stmt::Allocate { mem, size, space } => {
                self.line(format_args!("{} <- alloc@{}({})", mem, space, size))
            }
            Stmt::SetScalar { name, value } => self.line(format_args!("{} <- {}", name, value)),
            Stmt::Read {
                dest,
                mem,
                index,
                elem,
                space,
            } => self.line(format_args!(
                "{} <- {}@{}[{}]: {}",
                dest,
                mem,
                space,
                index,
                format_type(elem)
            )),
            Stmt::Write {
                mem,
                index,
                elem,
                space,
                value,
            } => self.line(format_args!(
                "{}@{}[{}]: {} <- {}",
                mem,
                space,
                index,
                format_type(elem),
                value
            )),
            Stmt::If {
                cond,
                then_code,
                else_code,
            } => {
                self.line(format_args!("if {} {{", cond))?;
                self.nested(then_code)?;
                self.line(format_args!("}} else {{"))?;
                self.nested(else_code)?;
                self.line(format_args!("}}"))
            }
            Stmt::For { counter, bound, body } => {
                self.line(format_args!("for {} < {} {{", counter, bound))?;
                self.nested(body)?;
                self.line(format_args!("}}"))
            }
            Stmt::Kernel(kernel) => self.kernel(kernel),
        }
    }

    fn kernel(&mut self, kernel: &Kernel) -> fmt::Result {
        self.line(format_args!("kernel {} < {} {{", kernel.thread_index(), kernel.thread_count()))?;
        self.indent += 1;
        self.line(format_args!("copy_in {}", join(kernel.copy_in())))?;
        self.line(format_args!("copy_out {}", join(kernel.copy_out())))?;
        self.line(format_args!("body {{"))?;
        self.nested(kernel.body())?;
        self.line(format_args!("}}"))?;
        self.indent -= 1;
        self.line(format_args!("}}"))
    }
}

fn join(transfers: &[MemoryTransfer]) -> String {
    transfers.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", ")
}
