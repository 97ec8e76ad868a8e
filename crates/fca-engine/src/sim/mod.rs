pub mod kernel;

use crate::buffer::OperandBuffer;
use crate::config::EngineConfig;
use crate::engine::BlockEngine;

/// Pure-Rust block engine.
///
/// Performs the block multiply with straightforward loops on host memory
/// laid out exactly like the device's operand region. Intended as the
/// reference the device backend is validated against, and as a fallback
/// where no accelerator is present.
#[derive(Debug, Clone)]
pub struct SimEngine {
    operands: OperandBuffer,
    output: Vec<f32>,
    num_block_call: u64,
}

impl SimEngine {
    pub fn new(config: EngineConfig) -> Self {
        log::debug!(
            "sim engine: m_size={} v_size={} ({} operand slots)",
            config.m_size(),
            config.v_size(),
            config.operand_len()
        );
        SimEngine {
            operands: OperandBuffer::zeros(config),
            output: vec![0.0; config.m_size()],
            num_block_call: 0,
        }
    }

    /// Read-only access to the operand buffer.
    pub fn operands(&self) -> &OperandBuffer {
        &self.operands
    }
}

impl BlockEngine for SimEngine {
    fn name(&self) -> &str {
        "sim"
    }

    fn config(&self) -> EngineConfig {
        self.operands.config()
    }

    fn vector_mut(&mut self) -> &mut [f32] {
        self.operands.vector_mut()
    }

    fn matrix_mut(&mut self) -> &mut [f32] {
        self.operands.matrix_mut()
    }

    fn execute(&mut self) -> &[f32] {
        self.num_block_call += 1;
        let (vector, matrix) = self.operands.split();
        kernel::block_mv(vector, matrix, &mut self.output);
        &self.output
    }

    fn invocation_count(&self) -> u64 {
        self.num_block_call
    }

    fn reset_counter(&mut self) {
        self.num_block_call = 0;
    }
}
