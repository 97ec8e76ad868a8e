use std::cell::RefCell;
use std::ffi::CString;
use std::fmt::Display;

use fca_engine::EngineError;
use fca_ops::OpsError;

use crate::types::FcaStatus;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Record `msg` for `fca_last_error` and return `status`.
pub fn fail(status: FcaStatus, msg: impl Display) -> FcaStatus {
    let msg = msg.to_string();
    log::debug!("ffi call failed ({:?}): {}", status, msg);
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
    status
}

/// Take the last error message, leaving `None` in its place.
pub fn take_last_error() -> Option<CString> {
    LAST_ERROR.with(|e| e.borrow_mut().take())
}

pub fn engine_status(err: &EngineError) -> FcaStatus {
    match err {
        EngineError::InvalidConfig(_) | EngineError::Misaligned { .. } => {
            FcaStatus::ErrorInvalidArgument
        }
        EngineError::DeviceOpen { .. } | EngineError::DeviceMap { .. } => FcaStatus::ErrorDevice,
        EngineError::Other(_) => FcaStatus::ErrorInternal,
    }
}

pub fn ops_status(err: &OpsError) -> FcaStatus {
    match err {
        OpsError::LengthMismatch { .. }
        | OpsError::ShapeMismatch { .. }
        | OpsError::InvalidRank { .. }
        | OpsError::Overflow { .. }
        | OpsError::EmptyDimension { .. }
        | OpsError::ChannelMismatch { .. }
        | OpsError::WindowTooLarge { .. } => FcaStatus::ErrorShape,
    }
}
