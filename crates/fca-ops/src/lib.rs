//! `fca-ops` - large matrix-vector multiply and convolution lowering for
//! fixed-size block engines.
//!
//! - [`tiling::large_multiply`] splits an arbitrary `num_output x num_input`
//!   product into engine-sized tiles and accumulates the partial sums.
//! - [`lowering::lower_convolution`] reshapes convolution weights and
//!   activations (im2col) so a convolution becomes one matrix product.
//! - [`layers`] composes the two into fully-connected and conv layers.

pub mod error;
pub mod layers;
pub mod lowering;
pub mod shape;
pub mod tensor;
pub mod tiling;

pub use error::{OpsError, Result};
pub use lowering::{lower, lower_convolution, ConvGeometry};
pub use shape::Shape;
pub use tensor::Tensor;
pub use tiling::{block_invocations, large_multiply, Tile, TileGrid};
