use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpsError {
    #[error("{what}: expected {expected} elements, got {got}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("shape mismatch for {what}: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    #[error("{what} must have {expected} dimensions, got shape {got:?}")]
    InvalidRank {
        what: &'static str,
        expected: usize,
        got: Vec<usize>,
    },
    #[error("{what} element count overflows usize: {dims:?}")]
    Overflow { what: &'static str, dims: Vec<usize> },
    #[error("{what} has an empty dimension: {dims:?}")]
    EmptyDimension { what: &'static str, dims: Vec<usize> },
    #[error("input channel mismatch: weights expect {weights}, activations have {activations}")]
    ChannelMismatch { weights: usize, activations: usize },
    #[error(
        "convolution window {conv_height}x{conv_width} does not fit input {input_height}x{input_width}"
    )]
    WindowTooLarge {
        conv_height: usize,
        conv_width: usize,
        input_height: usize,
        input_width: usize,
    },
}

pub type Result<T> = std::result::Result<T, OpsError>;
