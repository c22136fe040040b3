//! Types of IR values.
//!
//! Types are `polytype::Type<TypeName>`. Arrays wrap their element type, so a
//! rank-2 array of `f32` is `Array[Array[f32]]`. Array shapes are not part of
//! the type: they live in the index function of the array's memory summary.

pub type Type = polytype::Type<TypeName>;

/// Type name constructors for the IR.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeName {
    Bool,
    /// Signed integers: i8, i16, i32, i64
    Int(usize),
    /// Unsigned integers: u8, u16, u32, u64
    UInt(usize),
    /// Floating point: f16, f32, f64
    Float(usize),
    /// Array constructor, one argument: the element type
    Array,
    /// Bare memory block handle
    Mem,
    /// Function arrow, required by polytype but never produced by this stage
    Arrow,
}

impl std::fmt::Display for TypeName {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            TypeName::Bool => write!(f, "bool"),
            TypeName::Int(bits) => write!(f, "i{}", bits),
            TypeName::UInt(bits) => write!(f, "u{}", bits),
            TypeName::Float(bits) => write!(f, "f{}", bits),
            TypeName::Array => write!(f, "[]"),
            TypeName::Mem => write!(f, "mem"),
            TypeName::Arrow => write!(f, "->"),
        }
    }
}

impl polytype::Name for TypeName {
    fn arrow() -> Self {
        TypeName::Arrow
    }

    fn show(&self) -> String {
        self.to_string()
    }
}

pub fn bool() -> Type {
    Type::Constructed(TypeName::Bool, vec![])
}

pub fn i32() -> Type {
    Type::Constructed(TypeName::Int(32), vec![])
}

pub fn i64() -> Type {
    Type::Constructed(TypeName::Int(64), vec![])
}

pub fn f32() -> Type {
    Type::Constructed(TypeName::Float(32), vec![])
}

pub fn mem() -> Type {
    Type::Constructed(TypeName::Mem, vec![])
}

pub fn array(elem: Type) -> Type {
    Type::Constructed(TypeName::Array, vec![elem])
}

/// Array of `rank` dimensions over a scalar element type.
pub fn array_of_rank(elem: Type, rank: usize) -> Type {
    (0..rank).fold(elem, |ty, _| array(ty))
}

/// Render a type the way it is written in source: `[][]f32`, `mem`, `i64`.
pub fn format_type(ty: &Type) -> String {
    match ty {
        Type::Variable(id) => format!("?{}", id),
        Type::Constructed(TypeName::Array, args) if args.len() == 1 => {
            format!("[]{}", format_type(&args[0]))
        }
        Type::Constructed(name, _) => name.to_string(),
    }
}

// =============================================================================
// Type extension trait
// =============================================================================

/// Centralizes type queries so passes don't need to pattern-match on
/// `TypeName` variants directly.
pub trait TypeExt {
    /// Bool, integer or float.
    fn is_scalar(&self) -> bool;

    fn is_array(&self) -> bool;

    fn is_mem(&self) -> bool;

    /// Number of array dimensions; 0 for anything that is not an array.
    fn rank(&self) -> usize;

    /// Innermost non-array type.
    fn elem_type(&self) -> &Type;

    /// Type of one row: strips a single array dimension.
    fn row_type(&self) -> Option<&Type>;
}

impl TypeExt for Type {
    fn is_scalar(&self) -> bool {
        matches!(
            self,
            Type::Constructed(
                TypeName::Bool | TypeName::Int(_) | TypeName::UInt(_) | TypeName::Float(_),
                _
            )
        )
    }

    fn is_array(&self) -> bool {
        matches!(self, Type::Constructed(TypeName::Array, _))
    }

    fn is_mem(&self) -> bool {
        matches!(self, Type::Constructed(TypeName::Mem, _))
    }

    fn rank(&self) -> usize {
        match self.row_type() {
            Some(row) => 1 + row.rank(),
            None => 0,
        }
    }

    fn elem_type(&self) -> &Type {
        match self.row_type() {
            Some(row) => row.elem_type(),
            None => self,
        }
    }

    fn row_type(&self) -> Option<&Type> {
        match self {
            Type::Constructed(TypeName::Array, args) => args.first(),
            _ => None,
        }
    }
}
