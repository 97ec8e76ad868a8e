use fca_engine::BlockEngine;

use crate::error::{OpsError, Result};
use crate::lowering::{lower, ConvGeometry};
use crate::shape::Shape;
use crate::tensor::Tensor;
use crate::tiling::large_multiply;

/// Fully-connected layer: `weight [out, in] x input [in] -> [out]`.
pub fn linear<E: BlockEngine + ?Sized>(
    engine: &mut E,
    weight: &Tensor,
    input: &Tensor,
) -> Result<Tensor> {
    weight.shape().require_rank("linear weight", 2)?;
    let num_output = weight.shape().dim(0);
    let num_input = weight.shape().dim(1);
    if input.shape().numel() != num_input {
        return Err(OpsError::ShapeMismatch {
            what: "linear input",
            expected: vec![num_input],
            got: input.shape().dims().to_vec(),
        });
    }

    let mut output = Tensor::zeros(Shape::new(vec![num_output]));
    large_multiply(
        engine,
        weight.data(),
        input.data(),
        output.data_mut(),
        num_input,
        num_output,
    )?;
    Ok(output)
}

/// Valid, stride-1 convolution evaluated on the block engine.
///
/// Lowers both operands, then runs one tiled multiply per filter against the
/// transposed activation matrix (one row per window position), so each call
/// produces one output channel. Returns `[conv_channel, distance_height,
/// distance_width]`.
pub fn conv2d<E: BlockEngine + ?Sized>(
    engine: &mut E,
    weights: &Tensor,
    activations: &Tensor,
) -> Result<Tensor> {
    let geometry = ConvGeometry::from_shapes(weights.shape(), activations.shape())?;
    let (weight_matrix, activation_matrix) = lower(weights, activations)?;
    let windows = activation_matrix.transpose()?;

    let patch_len = geometry.patch_len();
    let positions = geometry.positions();
    let mut output = Tensor::zeros(Shape::new(vec![geometry.conv_channel, positions]));

    let filters = weight_matrix.data().chunks_exact(patch_len);
    let planes = output.data_mut().chunks_exact_mut(positions);
    for (filter, plane) in filters.zip(planes) {
        large_multiply(engine, windows.data(), filter, plane, patch_len, positions)?;
    }

    output.reshape(Shape::new(vec![
        geometry.conv_channel,
        geometry.distance_height(),
        geometry.distance_width(),
    ]))
}
