use crate::config::EngineConfig;

/// Host-side operand storage for one block multiply.
///
/// A single contiguous `(m_size + 1) * v_size` f32 region. The first
/// `v_size` slots hold the vector; the remaining `m_size * v_size` slots hold
/// the matrix in row-major order, `v_size` per row. Every view below splits
/// at `v_size` and nowhere else.
#[derive(Debug, Clone)]
pub struct OperandBuffer {
    data: Vec<f32>,
    config: EngineConfig,
}

impl OperandBuffer {
    /// Create a zero-filled buffer sized for `config`.
    pub fn zeros(config: EngineConfig) -> Self {
        OperandBuffer {
            data: vec![0.0; config.operand_len()],
            config,
        }
    }

    /// Geometry this buffer was sized for.
    pub fn config(&self) -> EngineConfig {
        self.config
    }

    /// Total number of slots.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the buffer holds no slots.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The vector sub-region (`v_size` slots).
    pub fn vector(&self) -> &[f32] {
        &self.data[..self.config.v_size()]
    }

    /// The matrix sub-region (`m_size * v_size` slots, row-major).
    pub fn matrix(&self) -> &[f32] {
        &self.data[self.config.v_size()..]
    }

    pub fn vector_mut(&mut self) -> &mut [f32] {
        &mut self.data[..self.config.v_size()]
    }

    pub fn matrix_mut(&mut self) -> &mut [f32] {
        &mut self.data[self.config.v_size()..]
    }

    /// Both sub-regions at once, for computing from one while holding the other.
    pub fn split(&self) -> (&[f32], &[f32]) {
        self.data.split_at(self.config.v_size())
    }

    /// Zero every slot.
    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EngineConfig {
        EngineConfig::new(2, 3).unwrap()
    }

    #[test]
    fn test_zeros() {
        let b = OperandBuffer::zeros(config());
        assert_eq!(b.len(), 9);
        assert!(!b.is_empty());
        assert_eq!(b.vector(), &[0.0; 3]);
        assert_eq!(b.matrix(), &[0.0; 6]);
    }

    #[test]
    fn test_views_are_disjoint() {
        let mut b = OperandBuffer::zeros(config());
        b.vector_mut().copy_from_slice(&[1.0, 2.0, 3.0]);
        b.matrix_mut()[0] = 42.0;
        assert_eq!(b.vector(), &[1.0, 2.0, 3.0]);
        assert_eq!(b.matrix()[0], 42.0);

        let (v, m) = b.split();
        assert_eq!(v.len(), 3);
        assert_eq!(m.len(), 6);
        assert_eq!(m[0], 42.0);
    }

    #[test]
    fn test_clear() {
        let mut b = OperandBuffer::zeros(config());
        b.vector_mut()[1] = 5.0;
        b.matrix_mut()[5] = 7.0;
        b.clear();
        assert!(b.vector().iter().chain(b.matrix()).all(|&x| x == 0.0));
    }
}
