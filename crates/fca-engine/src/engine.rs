use std::fmt::Debug;

use crate::config::{DeviceConfig, EngineConfig};
use crate::error::Result;
use crate::sim::SimEngine;

/// Trait for interchangeable block-multiply backends.
///
/// An engine owns an operand buffer laid out as described by
/// [`OperandBuffer`](crate::OperandBuffer): a `v_size` vector followed by an
/// `m_size x v_size` row-major matrix. Callers fill both regions in place,
/// then call [`execute`](BlockEngine::execute), which always computes the full
/// `m_size x v_size` product. Unused rows and columns must therefore be zero.
///
/// An engine instance belongs to one thread at a time; it provides no locking.
/// Teardown is `Drop`.
pub trait BlockEngine: Send + Debug {
    /// Returns the name of this backend (e.g., "sim", "mmio").
    fn name(&self) -> &str;

    /// Block geometry, fixed for the engine's lifetime.
    fn config(&self) -> EngineConfig;

    /// Writable view of the vector sub-region (`v_size` slots).
    fn vector_mut(&mut self) -> &mut [f32];

    /// Writable view of the matrix sub-region (`m_size * v_size` slots).
    fn matrix_mut(&mut self) -> &mut [f32];

    /// Run one block multiply and return its `m_size` results.
    ///
    /// `out[r] = sum(vector[c] * matrix[r * v_size + c])` for `c` in `0..v_size`.
    /// The returned slice is only valid until the next call that mutates the
    /// engine. Increments the invocation counter.
    fn execute(&mut self) -> &[f32];

    /// Number of `execute` calls since construction or the last reset.
    fn invocation_count(&self) -> u64;

    /// Set the invocation counter back to zero. Buffer contents are untouched.
    fn reset_counter(&mut self);
}

/// Backend selector used by [`open_engine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendKind {
    /// In-process arithmetic.
    Simulation,
    /// Memory-mapped accelerator at the given addresses.
    Device(DeviceConfig),
}

/// Construct an engine of the requested kind behind a trait object.
pub fn open_engine(kind: BackendKind, config: EngineConfig) -> Result<Box<dyn BlockEngine>> {
    match kind {
        BackendKind::Simulation => Ok(Box::new(SimEngine::new(config))),
        #[cfg(feature = "mmio")]
        BackendKind::Device(device) => {
            Ok(Box::new(crate::mmio::MmioEngine::open(&device, config)?))
        }
        #[cfg(not(feature = "mmio"))]
        BackendKind::Device(_) => Err(crate::error::EngineError::Other(
            "fca-engine was built without the `mmio` feature".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_simulation() {
        let config = EngineConfig::new(2, 2).unwrap();
        let mut engine = open_engine(BackendKind::Simulation, config).unwrap();
        assert_eq!(engine.name(), "sim");
        assert_eq!(engine.config(), config);

        engine.vector_mut().copy_from_slice(&[1.0, 1.0]);
        engine.matrix_mut().copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(engine.execute(), &[3.0, 7.0]);
        assert_eq!(engine.invocation_count(), 1);
    }

    #[cfg(feature = "mmio")]
    #[test]
    fn test_open_device_missing_path() {
        let config = EngineConfig::new(2, 2).unwrap();
        let device = DeviceConfig::new("/nonexistent/fca-device", 0, 4096);
        let err = open_engine(BackendKind::Device(device), config).unwrap_err();
        assert!(matches!(
            err,
            crate::error::EngineError::DeviceOpen { .. }
        ));
    }
}
