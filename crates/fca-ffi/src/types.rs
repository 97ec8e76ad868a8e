use std::os::raw::c_char;

/// Status codes returned by all FFI functions.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FcaStatus {
    Ok = 0,
    ErrorInvalidArgument = 1,
    ErrorDevice = 2,
    ErrorShape = 3,
    ErrorInternal = 4,
}

/// Block engine backend selector.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FcaBackendType {
    Simulation = 0,
    Device = 1,
}

/// Addressing of a memory-mapped accelerator.
///
/// A null `device_path` means `/dev/mem`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FcaDeviceParams {
    pub device_path: *const c_char,
    pub data_addr: u64,
    pub status_addr: u64,
}

/// Tensor extents of a convolution lowering problem.
///
/// Weights are `[conv_channel, input_channel, conv_height, conv_width]`,
/// activations `[input_channel, input_height, input_width]`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FcaConvDims {
    pub conv_channel: u32,
    pub input_channel: u32,
    pub conv_height: u32,
    pub conv_width: u32,
    pub input_height: u32,
    pub input_width: u32,
}

/// Shapes of the two lowered matrices.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FcaLoweredDims {
    pub weight_rows: u32,
    pub weight_cols: u32,
    pub activation_rows: u32,
    pub activation_cols: u32,
}
