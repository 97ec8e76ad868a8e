mod context;
mod error;
mod types;

pub use context::*;
pub use error::*;
pub use types::*;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::AssertUnwindSafe;

use fca_engine::{BackendKind, DeviceConfig, EngineConfig};
use fca_ops::lowering::{lower_activations_into, lower_weights_into};
use fca_ops::{ConvGeometry, Shape};

/// Execute a closure that returns an `FcaStatus`, catching any panics
/// and converting them into `FcaStatus::ErrorInternal`.
fn catch_panic<F: FnOnce() -> FcaStatus>(f: F) -> FcaStatus {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(status) => status,
        Err(_) => fail(FcaStatus::ErrorInternal, "internal panic"),
    }
}

/// Borrow `len` floats at `ptr`. A null pointer is only accepted for `len == 0`.
unsafe fn input_slice<'a>(ptr: *const f32, len: usize) -> Option<&'a [f32]> {
    if len == 0 {
        Some(&[])
    } else if ptr.is_null() {
        None
    } else {
        Some(std::slice::from_raw_parts(ptr, len))
    }
}

unsafe fn output_slice<'a>(ptr: *mut f32, len: usize) -> Option<&'a mut [f32]> {
    if len == 0 {
        Some(&mut [])
    } else if ptr.is_null() {
        None
    } else {
        Some(std::slice::from_raw_parts_mut(ptr, len))
    }
}

unsafe fn device_config(params: *const FcaDeviceParams) -> Result<DeviceConfig, String> {
    if params.is_null() {
        return DeviceConfig::from_env().map_err(|e| e.to_string());
    }
    let params = &*params;
    let mut config = DeviceConfig {
        data_addr: params.data_addr,
        status_addr: params.status_addr,
        ..DeviceConfig::default()
    };
    if !params.device_path.is_null() {
        let path = CStr::from_ptr(params.device_path)
            .to_str()
            .map_err(|e| format!("invalid device path: {}", e))?;
        config.device_path = path.into();
    }
    Ok(config)
}

fn geometry(dims: &FcaConvDims) -> fca_ops::Result<ConvGeometry> {
    let weights = Shape::new(vec![
        dims.conv_channel as usize,
        dims.input_channel as usize,
        dims.conv_height as usize,
        dims.conv_width as usize,
    ]);
    let activations = Shape::new(vec![
        dims.input_channel as usize,
        dims.input_height as usize,
        dims.input_width as usize,
    ]);
    ConvGeometry::from_shapes(&weights, &activations)
}

/// Create a context owning one block engine of `m_size x v_size`.
///
/// For `FcaBackendType::Device`, `device` selects the device file and the
/// physical addresses; if it is null they are read from `FCA_DEVICE_PATH`,
/// `FCA_DATA_ADDR` and `FCA_STATUS_ADDR`. `device` is ignored for the
/// simulation backend. The caller must later call `fca_context_destroy`.
#[no_mangle]
pub unsafe extern "C" fn fca_context_create(
    backend: FcaBackendType,
    m_size: u32,
    v_size: u32,
    device: *const FcaDeviceParams,
    ctx_out: *mut *mut FcaContext,
) -> FcaStatus {
    catch_panic(|| {
        if ctx_out.is_null() {
            return fail(FcaStatus::ErrorInvalidArgument, "ctx_out is null");
        }
        let config = match EngineConfig::new(m_size as usize, v_size as usize) {
            Ok(c) => c,
            Err(e) => return fail(engine_status(&e), e),
        };
        let kind = match backend {
            FcaBackendType::Simulation => BackendKind::Simulation,
            FcaBackendType::Device => match unsafe { device_config(device) } {
                Ok(d) => BackendKind::Device(d),
                Err(e) => return fail(FcaStatus::ErrorInvalidArgument, e),
            },
        };
        match FcaContext::open(kind, config) {
            Ok(ctx) => {
                unsafe { *ctx_out = Box::into_raw(Box::new(ctx)) };
                FcaStatus::Ok
            }
            Err(e) => fail(engine_status(&e), format!("failed to open engine: {}", e)),
        }
    })
}

/// Destroy a context previously created by `fca_context_create`, releasing
/// its engine. Passing a null pointer is a no-op.
#[no_mangle]
pub unsafe extern "C" fn fca_context_destroy(ctx: *mut FcaContext) -> FcaStatus {
    if ctx.is_null() {
        return FcaStatus::Ok;
    }
    drop(Box::from_raw(ctx));
    FcaStatus::Ok
}

/// Multiply a `num_output x num_input` row-major matrix by `input` on the
/// context's engine, writing `num_output` floats to `output`.
#[no_mangle]
pub unsafe extern "C" fn fca_large_mv(
    ctx: *mut FcaContext,
    large_mat: *const f32,
    input: *const f32,
    output: *mut f32,
    num_input: u32,
    num_output: u32,
) -> FcaStatus {
    catch_panic(|| {
        if ctx.is_null() {
            return fail(FcaStatus::ErrorInvalidArgument, "ctx is null");
        }
        let ctx = unsafe { &mut *ctx };
        let (num_input, num_output) = (num_input as usize, num_output as usize);

        let buffers = unsafe {
            (
                input_slice(large_mat, num_input * num_output),
                input_slice(input, num_input),
                output_slice(output, num_output),
            )
        };
        let (Some(large_mat), Some(input), Some(output)) = buffers else {
            return fail(FcaStatus::ErrorInvalidArgument, "null buffer");
        };

        match fca_ops::large_multiply(
            ctx.engine.as_mut(),
            large_mat,
            input,
            output,
            num_input,
            num_output,
        ) {
            Ok(()) => FcaStatus::Ok,
            Err(e) => fail(ops_status(&e), e),
        }
    })
}

/// Compute the shapes `fca_conv_lowering` expects for its two outputs.
#[no_mangle]
pub unsafe extern "C" fn fca_conv_lowered_dims(
    dims: FcaConvDims,
    out: *mut FcaLoweredDims,
) -> FcaStatus {
    catch_panic(|| {
        if out.is_null() {
            return fail(FcaStatus::ErrorInvalidArgument, "out is null");
        }
        let g = match geometry(&dims) {
            Ok(g) => g,
            Err(e) => return fail(ops_status(&e), e),
        };
        let to_u32 = |what: &str, n: usize| {
            u32::try_from(n).map_err(|_| format!("{} {} does not fit in u32", what, n))
        };
        let lowered = to_u32("patch length", g.patch_len()).and_then(|patch| {
            Ok(FcaLoweredDims {
                weight_rows: to_u32("conv_channel", g.conv_channel)?,
                weight_cols: patch,
                activation_rows: patch,
                activation_cols: to_u32("window positions", g.positions())?,
            })
        });
        match lowered {
            Ok(lowered) => {
                unsafe { *out = lowered };
                FcaStatus::Ok
            }
            Err(msg) => fail(FcaStatus::ErrorShape, msg),
        }
    })
}

/// Lower convolution weights and activations into two row-major matrices.
///
/// `new_weights` must hold `conv_channel * patch` floats and `new_inputs`
/// `patch * positions` floats, as reported by `fca_conv_lowered_dims`.
#[no_mangle]
pub unsafe extern "C" fn fca_conv_lowering(
    dims: FcaConvDims,
    cnn_weights: *const f32,
    new_weights: *mut f32,
    inputs: *const f32,
    new_inputs: *mut f32,
) -> FcaStatus {
    catch_panic(|| {
        let g = match geometry(&dims) {
            Ok(g) => g,
            Err(e) => return fail(ops_status(&e), e),
        };
        let weights_len = g.conv_channel * g.patch_len();
        let inputs_len = g.input_channel * g.input_height * g.input_width;

        let buffers = unsafe {
            (
                input_slice(cnn_weights, weights_len),
                output_slice(new_weights, weights_len),
                input_slice(inputs, inputs_len),
                output_slice(new_inputs, g.patch_len() * g.positions()),
            )
        };
        let (Some(cnn_weights), Some(new_weights), Some(inputs), Some(new_inputs)) = buffers
        else {
            return fail(FcaStatus::ErrorInvalidArgument, "null buffer");
        };

        let lowered = lower_weights_into(&g, cnn_weights, new_weights)
            .and_then(|()| lower_activations_into(&g, inputs, new_inputs));
        match lowered {
            Ok(()) => FcaStatus::Ok,
            Err(e) => fail(ops_status(&e), e),
        }
    })
}

/// Number of block multiplies issued since creation or the last reset.
#[no_mangle]
pub unsafe extern "C" fn fca_num_block_call(ctx: *const FcaContext, out: *mut u64) -> FcaStatus {
    if ctx.is_null() || out.is_null() {
        return fail(FcaStatus::ErrorInvalidArgument, "null argument");
    }
    *out = (*ctx).engine.invocation_count();
    FcaStatus::Ok
}

/// Reset the block multiply counter.
#[no_mangle]
pub unsafe extern "C" fn fca_reset_counter(ctx: *mut FcaContext) -> FcaStatus {
    if ctx.is_null() {
        return fail(FcaStatus::ErrorInvalidArgument, "ctx is null");
    }
    (*ctx).engine.reset_counter();
    FcaStatus::Ok
}

/// Retrieve the last error message.
///
/// Returns a pointer to a C string describing the most recent error on this
/// thread, or null if there is none. The caller must free the returned
/// string with `fca_free_string`.
#[no_mangle]
pub extern "C" fn fca_last_error() -> *mut c_char {
    match error::take_last_error() {
        Some(e) => e.into_raw(),
        None => std::ptr::null_mut(),
    }
}

/// Free a string previously returned by `fca_last_error`.
#[no_mangle]
pub unsafe extern "C" fn fca_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::ptr;

    fn sim_context(m: u32, v: u32) -> *mut FcaContext {
        let mut ctx = ptr::null_mut();
        let status = unsafe {
            fca_context_create(FcaBackendType::Simulation, m, v, ptr::null(), &mut ctx)
        };
        assert_eq!(status, FcaStatus::Ok);
        assert!(!ctx.is_null());
        ctx
    }

    fn last_error() -> String {
        let raw = fca_last_error();
        assert!(!raw.is_null());
        let msg = unsafe { CStr::from_ptr(raw) }.to_string_lossy().into_owned();
        unsafe { fca_free_string(raw) };
        msg
    }

    #[test]
    fn test_large_mv_roundtrip() {
        let ctx = sim_context(2, 2);
        let matrix: Vec<f32> = (0..15).map(|x| x as f32).collect(); // 3x5
        let input = vec![1.0f32; 5];
        let mut output = vec![0.0f32; 3];

        let status = unsafe {
            fca_large_mv(ctx, matrix.as_ptr(), input.as_ptr(), output.as_mut_ptr(), 5, 3)
        };
        assert_eq!(status, FcaStatus::Ok);
        for (got, want) in output.iter().zip([10.0, 35.0, 60.0]) {
            assert_relative_eq!(*got, want);
        }

        let mut calls = 0u64;
        assert_eq!(unsafe { fca_num_block_call(ctx, &mut calls) }, FcaStatus::Ok);
        assert_eq!(calls, 6);
        assert_eq!(unsafe { fca_reset_counter(ctx) }, FcaStatus::Ok);
        assert_eq!(unsafe { fca_num_block_call(ctx, &mut calls) }, FcaStatus::Ok);
        assert_eq!(calls, 0);

        assert_eq!(unsafe { fca_context_destroy(ctx) }, FcaStatus::Ok);
    }

    #[test]
    fn test_invalid_sizes() {
        let mut ctx = ptr::null_mut();
        let status = unsafe {
            fca_context_create(FcaBackendType::Simulation, 0, 4, ptr::null(), &mut ctx)
        };
        assert_eq!(status, FcaStatus::ErrorInvalidArgument);
        assert!(ctx.is_null());
        assert!(last_error().contains("block sizes must be positive"));
    }

    #[test]
    fn test_missing_device() {
        let path = CString::new("/nonexistent/fca-mem").unwrap();
        let params = FcaDeviceParams {
            device_path: path.as_ptr(),
            data_addr: 0,
            status_addr: 4096,
        };
        let mut ctx = ptr::null_mut();
        let status =
            unsafe { fca_context_create(FcaBackendType::Device, 2, 2, &params, &mut ctx) };
        assert_eq!(status, FcaStatus::ErrorDevice);
        assert!(last_error().contains("/nonexistent/fca-mem"));
    }

    #[test]
    fn test_null_buffers() {
        let ctx = sim_context(2, 2);
        let mut output = vec![0.0f32; 2];
        let status = unsafe { fca_large_mv(ctx, ptr::null(), ptr::null(), output.as_mut_ptr(), 2, 2) };
        assert_eq!(status, FcaStatus::ErrorInvalidArgument);
        unsafe { fca_context_destroy(ctx) };
    }

    #[test]
    fn test_conv_lowering() {
        let dims = FcaConvDims {
            conv_channel: 1,
            input_channel: 1,
            conv_height: 2,
            conv_width: 2,
            input_height: 3,
            input_width: 3,
        };
        let mut lowered = FcaLoweredDims::default();
        assert_eq!(unsafe { fca_conv_lowered_dims(dims, &mut lowered) }, FcaStatus::Ok);
        assert_eq!(
            lowered,
            FcaLoweredDims {
                weight_rows: 1,
                weight_cols: 4,
                activation_rows: 4,
                activation_cols: 4,
            }
        );

        let weights = [1.0f32, 2.0, 3.0, 4.0];
        let inputs: Vec<f32> = (0..9).map(|x| x as f32).collect();
        let mut new_weights = [0.0f32; 4];
        let mut new_inputs = [0.0f32; 16];
        let status = unsafe {
            fca_conv_lowering(
                dims,
                weights.as_ptr(),
                new_weights.as_mut_ptr(),
                inputs.as_ptr(),
                new_inputs.as_mut_ptr(),
            )
        };
        assert_eq!(status, FcaStatus::Ok);
        assert_eq!(new_weights, weights);
        // Row-major [4 rows x 4 windows]; column 1 is the window at (0, 1).
        let column1: Vec<f32> = (0..4).map(|r| new_inputs[r * 4 + 1]).collect();
        assert_eq!(column1, vec![1.0, 2.0, 4.0, 5.0]);
    }

    #[test]
    fn test_conv_window_too_large() {
        let dims = FcaConvDims {
            conv_channel: 1,
            input_channel: 1,
            conv_height: 4,
            conv_width: 1,
            input_height: 3,
            input_width: 3,
        };
        let mut lowered = FcaLoweredDims::default();
        assert_eq!(
            unsafe { fca_conv_lowered_dims(dims, &mut lowered) },
            FcaStatus::ErrorShape
        );
        assert!(last_error().contains("does not fit"));
    }

    #[test]
    fn test_lowered_dims_exceed_u32() {
        // 65536 channels of a 256x256 kernel give a 2^32 patch length.
        let dims = FcaConvDims {
            conv_channel: 1,
            input_channel: 65536,
            conv_height: 256,
            conv_width: 256,
            input_height: 256,
            input_width: 256,
        };
        let mut lowered = FcaLoweredDims::default();
        assert_eq!(
            unsafe { fca_conv_lowered_dims(dims, &mut lowered) },
            FcaStatus::ErrorShape
        );
        assert!(last_error().contains("does not fit in u32"));
        assert_eq!(lowered, FcaLoweredDims::default());
    }

    #[test]
    fn test_reset_null_context() {
        assert_eq!(
            unsafe { fca_reset_counter(ptr::null_mut()) },
            FcaStatus::ErrorInvalidArgument
        );
        assert_eq!(last_error(), "ctx is null");
    }
}
