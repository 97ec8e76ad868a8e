use crate::error::{OpsError, Result};
use std::fmt;

/// Dimension sizes of a dense row-major tensor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    pub fn new(dims: Vec<usize>) -> Self {
        Shape { dims }
    }

    pub fn from_slice(dims: &[usize]) -> Self {
        Shape {
            dims: dims.to_vec(),
        }
    }

    /// Number of dimensions (rank).
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements (product of all dimension sizes).
    pub fn numel(&self) -> usize {
        self.dims.iter().product()
    }

    /// Returns the size of dimension `i`.
    ///
    /// # Panics
    /// Panics if `i >= ndim()`.
    pub fn dim(&self, i: usize) -> usize {
        self.dims[i]
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Row-major strides. For [d0, d1, d2] this is [d1*d2, d2, 1].
    pub fn strides(&self) -> Vec<usize> {
        let mut strides = vec![1usize; self.dims.len()];
        for i in (0..self.dims.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * self.dims[i + 1];
        }
        strides
    }

    /// Flat offset of a multi-index, or `None` if it is out of bounds.
    pub fn offset(&self, index: &[usize]) -> Option<usize> {
        if index.len() != self.dims.len() {
            return None;
        }
        let mut offset = 0;
        for ((&i, &d), s) in index.iter().zip(&self.dims).zip(self.strides()) {
            if i >= d {
                return None;
            }
            offset += i * s;
        }
        Some(offset)
    }

    /// Fails unless this shape has exactly `expected` dimensions, none of them zero.
    pub fn require_rank(&self, what: &'static str, expected: usize) -> Result<()> {
        if self.ndim() != expected {
            return Err(OpsError::InvalidRank {
                what,
                expected,
                got: self.dims.clone(),
            });
        }
        if self.dims.contains(&0) {
            return Err(OpsError::EmptyDimension {
                what,
                dims: self.dims.clone(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_shape() {
        let s = Shape::new(vec![2, 3, 4]);
        assert_eq!(s.ndim(), 3);
        assert_eq!(s.numel(), 24);
        assert_eq!(s.dim(1), 3);
        assert_eq!(s.to_string(), "[2, 3, 4]");
    }

    #[test]
    fn test_strides() {
        assert_eq!(Shape::new(vec![2, 3, 4]).strides(), vec![12, 4, 1]);
        assert_eq!(Shape::new(vec![]).strides(), Vec::<usize>::new());
    }

    #[test]
    fn test_offset() {
        let s = Shape::new(vec![2, 3, 4]);
        assert_eq!(s.offset(&[0, 0, 0]), Some(0));
        assert_eq!(s.offset(&[1, 2, 3]), Some(23));
        assert_eq!(s.offset(&[2, 0, 0]), None);
        assert_eq!(s.offset(&[0, 0]), None);
    }

    #[test]
    fn test_require_rank() {
        let s = Shape::new(vec![1, 2, 3]);
        assert!(s.require_rank("x", 3).is_ok());
        assert!(matches!(
            s.require_rank("x", 4),
            Err(OpsError::InvalidRank { expected: 4, .. })
        ));
        assert!(matches!(
            Shape::new(vec![1, 0, 3]).require_rank("x", 3),
            Err(OpsError::EmptyDimension { .. })
        ));
    }
}
