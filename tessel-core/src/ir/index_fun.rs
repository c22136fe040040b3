//! Index functions: affine maps from logical array indices to a linear
//! element offset inside a memory block.
//!
//! ```text
//! ixfun(i_0, .., i_{r-1}) = offset + i_0 * stride_0 + .. + i_{r-1} * stride_{r-1}
//! ```

use super::size::SizeExpr;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexFun {
    offset: SizeExpr,
    shape: Vec<SizeExpr>,
    strides: Vec<SizeExpr>,
}

impl IndexFun {
    /// Row-major layout of `shape` starting at element 0.
    pub fn iota(shape: Vec<SizeExpr>) -> Self {
        let mut strides = vec![SizeExpr::Const(1); shape.len()];
        for k in (0..shape.len().saturating_sub(1)).rev() {
            strides[k] = SizeExpr::mul(strides[k + 1].clone(), shape[k + 1].clone());
        }
        IndexFun {
            offset: SizeExpr::Const(0),
            shape,
            strides,
        }
    }

    /// Shift the whole index space by `offset` elements within the block.
    ///
    /// Composition is additive: applying `o1` then `o2` gives the same index
    /// function as applying `o1 + o2` once.
    pub fn offset_underlying(&self, offset: SizeExpr) -> Self {
        IndexFun {
            offset: SizeExpr::add(self.offset.clone(), offset),
            shape: self.shape.clone(),
            strides: self.strides.clone(),
        }
    }

    /// Linear element position of `indices`. Missing trailing indices are
    /// treated as 0, which addresses the first element of a row.
    pub fn linear_index(&self, indices: &[SizeExpr]) -> SizeExpr {
        indices
            .iter()
            .zip(&self.strides)
            .fold(self.offset.clone(), |acc, (idx, stride)| {
                SizeExpr::add(acc, SizeExpr::mul(idx.clone(), stride.clone()))
            })
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn shape(&self) -> &[SizeExpr] {
        &self.shape
    }

    pub fn offset(&self) -> &SizeExpr {
        &self.offset
    }

    pub fn strides(&self) -> &[SizeExpr] {
        &self.strides
    }
}

impl fmt::Display for IndexFun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ixfun {{ offset: {}, shape: [", self.offset)?;
        for (i, (dim, stride)) in self.shape.iter().zip(&self.strides).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}:{}", dim, stride)?;
        }
        write!(f, "] }}")
    }
}
