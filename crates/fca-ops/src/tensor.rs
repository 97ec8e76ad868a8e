use crate::error::{OpsError, Result};
use crate::shape::Shape;

/// Dense row-major f32 tensor.
///
/// Used to carry convolution weights `[conv_channel, input_channel, h, w]`,
/// activations `[input_channel, h, w]`, and the 2-D matrices produced by
/// lowering.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    data: Vec<f32>,
    shape: Shape,
}

impl Tensor {
    /// Create a tensor from f32 data and a shape.
    pub fn new(data: Vec<f32>, shape: Shape) -> Result<Self> {
        if data.len() != shape.numel() {
            return Err(OpsError::LengthMismatch {
                what: "tensor data",
                expected: shape.numel(),
                got: data.len(),
            });
        }
        Ok(Tensor { data, shape })
    }

    /// Create a zero-filled tensor with the given shape.
    pub fn zeros(shape: Shape) -> Self {
        Tensor {
            data: vec![0.0; shape.numel()],
            shape,
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Element at a multi-index, or `None` if out of bounds.
    pub fn get(&self, index: &[usize]) -> Option<f32> {
        self.shape.offset(index).map(|o| self.data[o])
    }

    /// Same data under a new shape with the same element count.
    pub fn reshape(self, new_shape: Shape) -> Result<Tensor> {
        if self.shape.numel() != new_shape.numel() {
            return Err(OpsError::ShapeMismatch {
                what: "reshape",
                expected: self.shape.dims().to_vec(),
                got: new_shape.dims().to_vec(),
            });
        }
        Ok(Tensor {
            data: self.data,
            shape: new_shape,
        })
    }

    /// Transpose of a 2-D tensor.
    pub fn transpose(&self) -> Result<Tensor> {
        if self.shape.ndim() != 2 {
            return Err(OpsError::InvalidRank {
                what: "transpose",
                expected: 2,
                got: self.shape.dims().to_vec(),
            });
        }
        let rows = self.shape.dim(0);
        let cols = self.shape.dim(1);
        let mut out = vec![0.0f32; self.data.len()];
        for r in 0..rows {
            for c in 0..cols {
                out[c * rows + r] = self.data[r * cols + c];
            }
        }
        Ok(Tensor {
            data: out,
            shape: Shape::new(vec![cols, rows]),
        })
    }
}
