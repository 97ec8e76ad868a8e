use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),
    #[error("cannot open device {path}: {source}")]
    DeviceOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot map {len} bytes at {addr:#x} of {path}: {source}")]
    DeviceMap {
        path: PathBuf,
        addr: u64,
        len: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("{what} address {addr:#x} is not {align}-byte aligned")]
    Misaligned {
        what: &'static str,
        addr: u64,
        align: u64,
    },
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
