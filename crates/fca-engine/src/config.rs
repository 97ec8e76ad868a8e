use std::path::PathBuf;

use crate::error::{EngineError, Result};

/// Geometry of one block multiply.
///
/// `m_size` is the number of matrix rows (outputs) per block and `v_size`
/// the number of columns (inputs). Both are fixed for an engine's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EngineConfig {
    m_size: usize,
    v_size: usize,
}

impl EngineConfig {
    /// Create a validated configuration.
    ///
    /// Both sizes must be non-zero and the operand region,
    /// `(m_size + 1) * v_size` f32 slots, must be addressable.
    pub fn new(m_size: usize, v_size: usize) -> Result<Self> {
        if m_size == 0 || v_size == 0 {
            return Err(EngineError::InvalidConfig(format!(
                "block sizes must be positive, got m_size={} v_size={}",
                m_size, v_size
            )));
        }
        let bytes = m_size
            .checked_add(1)
            .and_then(|rows| rows.checked_mul(v_size))
            .and_then(|slots| slots.checked_mul(std::mem::size_of::<f32>()));
        if bytes.is_none() {
            return Err(EngineError::InvalidConfig(format!(
                "operand region overflows for m_size={} v_size={}",
                m_size, v_size
            )));
        }
        Ok(EngineConfig { m_size, v_size })
    }

    /// Maximum rows (outputs) per block.
    pub fn m_size(&self) -> usize {
        self.m_size
    }

    /// Maximum columns (inputs) per block.
    pub fn v_size(&self) -> usize {
        self.v_size
    }

    /// Number of f32 slots in the operand buffer: one vector row plus
    /// `m_size` matrix rows, each `v_size` wide.
    pub fn operand_len(&self) -> usize {
        (self.m_size + 1) * self.v_size
    }

    /// Number of f32 slots in the matrix sub-region.
    pub fn matrix_len(&self) -> usize {
        self.m_size * self.v_size
    }

    /// Size of the operand region in bytes.
    pub fn operand_bytes(&self) -> usize {
        self.operand_len() * std::mem::size_of::<f32>()
    }
}

/// Default device node used to reach physical memory.
pub const DEFAULT_DEVICE_PATH: &str = "/dev/mem";
/// Default physical base of the operand BRAM (Zynq-7000 GP0 window).
pub const DEFAULT_DATA_ADDR: u64 = 0x4000_0000;
/// Default physical address of the status register.
pub const DEFAULT_STATUS_ADDR: u64 = 0x43C0_0000;

/// Addressing of a memory-mapped accelerator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// File to map from, normally `/dev/mem`.
    pub device_path: PathBuf,
    /// Physical address of the operand region.
    pub data_addr: u64,
    /// Physical address of the 32-bit status register.
    pub status_addr: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            device_path: PathBuf::from(DEFAULT_DEVICE_PATH),
            data_addr: DEFAULT_DATA_ADDR,
            status_addr: DEFAULT_STATUS_ADDR,
        }
    }
}

impl DeviceConfig {
    /// Create a device configuration with explicit addresses.
    pub fn new(device_path: impl Into<PathBuf>, data_addr: u64, status_addr: u64) -> Self {
        DeviceConfig {
            device_path: device_path.into(),
            data_addr,
            status_addr,
        }
    }

    /// Build a configuration from the process environment.
    ///
    /// Reads the following variables, falling back to the defaults:
    /// - `FCA_DEVICE_PATH` -> device_path
    /// - `FCA_DATA_ADDR` -> data_addr (decimal or `0x` hex)
    /// - `FCA_STATUS_ADDR` -> status_addr (decimal or `0x` hex)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`DeviceConfig::from_env`] with a caller-supplied lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = DeviceConfig::default();
        if let Some(path) = lookup("FCA_DEVICE_PATH") {
            config.device_path = PathBuf::from(path);
        }
        if let Some(addr) = lookup("FCA_DATA_ADDR") {
            config.data_addr = parse_addr("FCA_DATA_ADDR", &addr)?;
        }
        if let Some(addr) = lookup("FCA_STATUS_ADDR") {
            config.status_addr = parse_addr("FCA_STATUS_ADDR", &addr)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Check that both addresses can hold 32-bit words.
    pub fn validate(&self) -> Result<()> {
        const ALIGN: u64 = 4;
        if self.data_addr % ALIGN != 0 {
            return Err(EngineError::Misaligned {
                what: "data",
                addr: self.data_addr,
                align: ALIGN,
            });
        }
        if self.status_addr % ALIGN != 0 {
            return Err(EngineError::Misaligned {
                what: "status",
                addr: self.status_addr,
                align: ALIGN,
            });
        }
        Ok(())
    }
}

fn parse_addr(key: &str, raw: &str) -> Result<u64> {
    let trimmed = raw.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => trimmed.replace('_', "").parse::<u64>(),
    };
    parsed.map_err(|e| EngineError::InvalidConfig(format!("{}={:?}: {}", key, raw, e)))
}
