use crate::error::{OpsError, Result};
use crate::shape::Shape;
use crate::tensor::Tensor;

/// Dimensions of a convolution lowering problem.
///
/// Weights are `[conv_channel, input_channel, conv_height, conv_width]` and
/// activations are `[input_channel, input_height, input_width]`, both
/// row-major. Only "valid" windows are produced (no padding, stride 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvGeometry {
    pub conv_channel: usize,
    pub input_channel: usize,
    pub conv_height: usize,
    pub conv_width: usize,
    pub input_height: usize,
    pub input_width: usize,
}

impl ConvGeometry {
    /// Derive and validate the geometry from the two tensor shapes.
    pub fn from_shapes(weights: &Shape, activations: &Shape) -> Result<Self> {
        weights.require_rank("weights", 4)?;
        activations.require_rank("activations", 3)?;

        let geometry = ConvGeometry {
            conv_channel: weights.dim(0),
            input_channel: weights.dim(1),
            conv_height: weights.dim(2),
            conv_width: weights.dim(3),
            input_height: activations.dim(1),
            input_width: activations.dim(2),
        };

        if activations.dim(0) != geometry.input_channel {
            return Err(OpsError::ChannelMismatch {
                weights: geometry.input_channel,
                activations: activations.dim(0),
            });
        }
        if geometry.conv_height > geometry.input_height
            || geometry.conv_width > geometry.input_width
        {
            return Err(OpsError::WindowTooLarge {
                conv_height: geometry.conv_height,
                conv_width: geometry.conv_width,
                input_height: geometry.input_height,
                input_width: geometry.input_width,
            });
        }
        if geometry.checked_extent().is_none() {
            return Err(OpsError::Overflow {
                what: "lowered convolution",
                dims: weights.dims().iter().chain(activations.dims()).copied().collect(),
            });
        }
        Ok(geometry)
    }

    /// `None` if the element count of any operand or lowered matrix does not
    /// fit in `usize`. Once this succeeds the plain products in the accessors
    /// below cannot overflow.
    fn checked_extent(&self) -> Option<()> {
        let patch_len = self
            .input_channel
            .checked_mul(self.conv_height)?
            .checked_mul(self.conv_width)?;
        let positions = self.distance_height().checked_mul(self.distance_width())?;
        self.conv_channel.checked_mul(patch_len)?;
        self.input_channel
            .checked_mul(self.input_height)?
            .checked_mul(self.input_width)?;
        patch_len.checked_mul(positions)?;
        Some(())
    }

    /// Valid window positions along the height axis.
    pub fn distance_height(&self) -> usize {
        self.input_height - self.conv_height + 1
    }

    /// Valid window positions along the width axis.
    pub fn distance_width(&self) -> usize {
        self.input_width - self.conv_width + 1
    }

    /// Length of one flattened receptive field across all input channels.
    pub fn patch_len(&self) -> usize {
        self.input_channel * self.conv_height * self.conv_width
    }

    /// Number of window positions.
    pub fn positions(&self) -> usize {
        self.distance_height() * self.distance_width()
    }

    /// `[conv_channel, input_channel * conv_height * conv_width]`
    pub fn weight_matrix_shape(&self) -> Shape {
        Shape::new(vec![self.conv_channel, self.patch_len()])
    }

    /// `[input_channel * conv_height * conv_width, distance_height * distance_width]`
    pub fn activation_matrix_shape(&self) -> Shape {
        Shape::new(vec![self.patch_len(), self.positions()])
    }

    fn weights_len(&self) -> usize {
        self.conv_channel * self.patch_len()
    }

    fn activations_len(&self) -> usize {
        self.input_channel * self.input_height * self.input_width
    }
}

/// Flatten each filter into one row of the weight matrix.
///
/// Row `c` holds `weights[c][ic][dy][dx]` in (channel, height, width) order,
/// the same order `lower_activations_into` uses for its rows.
pub fn lower_weights_into(geometry: &ConvGeometry, weights: &[f32], out: &mut [f32]) -> Result<()> {
    check_len("weights", geometry.weights_len(), weights.len())?;
    check_len("weight matrix", geometry.weights_len(), out.len())?;

    let ConvGeometry {
        conv_channel,
        input_channel,
        conv_height,
        conv_width,
        ..
    } = *geometry;
    let patch_len = geometry.patch_len();

    for c in 0..conv_channel {
        let mut col = 0;
        for ic in 0..input_channel {
            for dy in 0..conv_height {
                for dx in 0..conv_width {
                    let src = ((c * input_channel + ic) * conv_height + dy) * conv_width + dx;
                    out[c * patch_len + col] = weights[src];
                    col += 1;
                }
            }
        }
    }
    Ok(())
}

/// im2col: one column per window position, one row per receptive-field element.
///
/// Window `(fi, fj)` becomes column `fi * distance_width + fj`; its rows are
/// `activations[ic][fi + dy][fj + dx]` in (channel, height, width) order.
pub fn lower_activations_into(
    geometry: &ConvGeometry,
    activations: &[f32],
    out: &mut [f32],
) -> Result<()> {
    check_len("activations", geometry.activations_len(), activations.len())?;
    check_len(
        "activation matrix",
        geometry.patch_len() * geometry.positions(),
        out.len(),
    )?;

    let ConvGeometry {
        input_channel,
        conv_height,
        conv_width,
        input_height,
        input_width,
        ..
    } = *geometry;
    let distance_height = geometry.distance_height();
    let distance_width = geometry.distance_width();
    let positions = geometry.positions();

    for fi in 0..distance_height {
        for fj in 0..distance_width {
            let col = fi * distance_width + fj;
            let mut row = 0;
            for ic in 0..input_channel {
                for dy in 0..conv_height {
                    let src_row = (ic * input_height + fi + dy) * input_width + fj;
                    for dx in 0..conv_width {
                        out[row * positions + col] = activations[src_row + dx];
                        row += 1;
                    }
                }
            }
        }
    }
    Ok(())
}

/// Lower `weights` and `activations` into caller-allocated matrices.
///
/// `weight_matrix` must already have shape
/// [`ConvGeometry::weight_matrix_shape`] and `activation_matrix`
/// [`ConvGeometry::activation_matrix_shape`]. Every element of both is
/// overwritten, so `weight_matrix x activation_matrix` yields the
/// convolution output, one column per window position.
pub fn lower_convolution(
    weights: &Tensor,
    activations: &Tensor,
    weight_matrix: &mut Tensor,
    activation_matrix: &mut Tensor,
) -> Result<ConvGeometry> {
    let geometry = ConvGeometry::from_shapes(weights.shape(), activations.shape())?;

    check_shape("weight matrix", &geometry.weight_matrix_shape(), weight_matrix.shape())?;
    check_shape(
        "activation matrix",
        &geometry.activation_matrix_shape(),
        activation_matrix.shape(),
    )?;

    lower_weights_into(&geometry, weights.data(), weight_matrix.data_mut())?;
    lower_activations_into(&geometry, activations.data(), activation_matrix.data_mut())?;

    log::debug!(
        "lowered conv: weights {} -> {}, activations {} -> {}",
        weights.shape(),
        weight_matrix.shape(),
        activations.shape(),
        activation_matrix.shape()
    );
    Ok(geometry)
}

/// Allocating form of [`lower_convolution`]; returns `(weight_matrix, activation_matrix)`.
pub fn lower(weights: &Tensor, activations: &Tensor) -> Result<(Tensor, Tensor)> {
    let geometry = ConvGeometry::from_shapes(weights.shape(), activations.shape())?;
    let mut weight_matrix = Tensor::zeros(geometry.weight_matrix_shape());
    let mut activation_matrix = Tensor::zeros(geometry.activation_matrix_shape());
    lower_convolution(weights, activations, &mut weight_matrix, &mut activation_matrix)?;
    Ok((weight_matrix, activation_matrix))
}

fn check_len(what: &'static str, expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(OpsError::LengthMismatch {
            what,
            expected,
            got,
        });
    }
    Ok(())
}

fn check_shape(what: &'static str, expected: &Shape, got: &Shape) -> Result<()> {
    if expected != got {
        return Err(OpsError::ShapeMismatch {
            what,
            expected: expected.dims().to_vec(),
            got: got.dims().to_vec(),
        });
    }
    Ok(())
}
