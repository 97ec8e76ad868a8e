//! `fca-engine` - fixed-size block matrix-vector engines for fc-accel.
//!
//! This crate provides:
//! - An `EngineConfig` describing the block geometry (`m_size` x `v_size`)
//! - An `OperandBuffer` with the vector/matrix split of the on-chip buffer
//! - A `BlockEngine` trait for interchangeable block-multiply backends
//! - A reference `SimEngine` that does the arithmetic in-process
//! - A `MmioEngine` driving a memory-mapped accelerator (feature `mmio`)

pub mod buffer;
pub mod config;
pub mod engine;
pub mod error;
#[cfg(feature = "mmio")]
pub mod mmio;
pub mod sim;

// Re-export primary types at the crate root for convenience.
pub use buffer::OperandBuffer;
pub use config::{DeviceConfig, EngineConfig};
pub use engine::{open_engine, BackendKind, BlockEngine};
pub use error::{EngineError, Result};
#[cfg(feature = "mmio")]
pub use mmio::MmioEngine;
pub use sim::SimEngine;
