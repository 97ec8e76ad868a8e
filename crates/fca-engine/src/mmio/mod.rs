// Memory-mapped accelerator backend.
//
// The device exposes two physical windows: an operand region of
// `(m_size + 1) * v_size` f32 slots and a single 32-bit status register.
// A block multiply is requested by writing `START_CODE` to the status
// register; the device overwrites the register when it is done and leaves
// its `m_size` results at the head of the operand region.

use std::fs::{File, OpenOptions};
use std::ptr;
use std::sync::atomic::{fence, Ordering};

use memmap2::{MmapMut, MmapOptions};

use crate::config::{DeviceConfig, EngineConfig};
use crate::engine::BlockEngine;
use crate::error::{EngineError, Result};

/// Value written to the status register to start a block multiply.
pub const START_CODE: u32 = 0x5555;

/// Bytes mapped for the status register.
const STATUS_BYTES: usize = std::mem::size_of::<u32>();

/// Block engine backed by a memory-mapped accelerator.
///
/// Construction opens the device file and maps both windows; dropping the
/// engine unmaps them and closes the file.
#[derive(Debug)]
pub struct MmioEngine {
    config: EngineConfig,
    data: MmapMut,
    status: MmapMut,
    num_block_call: u64,
    _file: File,
}

impl MmioEngine {
    /// Open `device.device_path` and map the operand and status windows.
    pub fn open(device: &DeviceConfig, config: EngineConfig) -> Result<Self> {
        device.validate()?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&device.device_path)
            .map_err(|source| EngineError::DeviceOpen {
                path: device.device_path.clone(),
                source,
            })?;

        let data = map_window(&file, device, device.data_addr, config.operand_bytes())?;
        let status = map_window(&file, device, device.status_addr, STATUS_BYTES)?;

        log::debug!(
            "mmio engine: mapped {} bytes at {:#x} and status at {:#x} of {}",
            config.operand_bytes(),
            device.data_addr,
            device.status_addr,
            device.device_path.display()
        );

        Ok(MmioEngine {
            config,
            data,
            status,
            num_block_call: 0,
            _file: file,
        })
    }

    fn operands_mut(&mut self) -> &mut [f32] {
        // SAFETY: the mapping is `operand_bytes()` long and starts at a
        // 4-byte aligned physical address, and memmap2 preserves the offset
        // within the page, so the pointer is valid and aligned for f32.
        unsafe {
            std::slice::from_raw_parts_mut(
                self.data.as_mut_ptr().cast::<f32>(),
                self.config.operand_len(),
            )
        }
    }

    /// Spin until the device overwrites `START_CODE`. No timeout.
    fn wait_for_completion(status: *const u32) {
        // SAFETY: `status` points into a live 4-byte mapping.
        while unsafe { ptr::read_volatile(status) } == START_CODE {
            std::hint::spin_loop();
        }
    }
}

fn map_window(file: &File, device: &DeviceConfig, addr: u64, len: usize) -> Result<MmapMut> {
    // SAFETY: the mapping is shared with the device; all accesses to the
    // status word go through volatile reads and writes.
    unsafe { MmapOptions::new().offset(addr).len(len).map_mut(file) }.map_err(|source| {
        EngineError::DeviceMap {
            path: device.device_path.clone(),
            addr,
            len,
            source,
        }
    })
}

impl BlockEngine for MmioEngine {
    fn name(&self) -> &str {
        "mmio"
    }

    fn config(&self) -> EngineConfig {
        self.config
    }

    fn vector_mut(&mut self) -> &mut [f32] {
        let v_size = self.config.v_size();
        &mut self.operands_mut()[..v_size]
    }

    fn matrix_mut(&mut self) -> &mut [f32] {
        let v_size = self.config.v_size();
        &mut self.operands_mut()[v_size..]
    }

    fn execute(&mut self) -> &[f32] {
        self.num_block_call += 1;

        let status = self.status.as_mut_ptr().cast::<u32>();
        // Operand stores must reach the device before the start command.
        fence(Ordering::SeqCst);
        // SAFETY: `status` points into a live, aligned 4-byte mapping.
        unsafe { ptr::write_volatile(status, START_CODE) };
        Self::wait_for_completion(status);
        fence(Ordering::SeqCst);

        let m_size = self.config.m_size();
        &self.operands_mut()[..m_size]
    }

    fn invocation_count(&self) -> u64 {
        self.num_block_call
    }

    fn reset_counter(&mut self) {
        self.num_block_call = 0;
    }
}

impl Drop for MmioEngine {
    fn drop(&mut self) {
        log::debug!(
            "mmio engine: unmapping after {} block calls",
            self.num_block_call
        );
    }
}
