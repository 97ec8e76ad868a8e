use fca_engine::{BlockEngine, EngineConfig};

use crate::error::{OpsError, Result};

/// One engine-sized sub-rectangle of a large matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// First matrix row (output index) covered.
    pub row: usize,
    /// First matrix column (input index) covered.
    pub col: usize,
    /// Rows in this tile, at most `m_size`.
    pub rows: usize,
    /// Columns in this tile, at most `v_size`.
    pub cols: usize,
}

/// Iterator over the tiles of a `num_output x num_input` matrix.
///
/// Row blocks step by `m_size`; within each, column blocks step by `v_size`
/// left to right. The last block on each axis may be partial.
#[derive(Debug, Clone)]
pub struct TileGrid {
    config: EngineConfig,
    num_input: usize,
    num_output: usize,
    row: usize,
    col: usize,
}

impl TileGrid {
    pub fn new(config: EngineConfig, num_input: usize, num_output: usize) -> Self {
        TileGrid {
            config,
            num_input,
            num_output,
            row: 0,
            col: 0,
        }
    }
}

impl Iterator for TileGrid {
    type Item = Tile;

    fn next(&mut self) -> Option<Tile> {
        if self.num_input == 0 || self.row >= self.num_output {
            return None;
        }
        let tile = Tile {
            row: self.row,
            col: self.col,
            rows: self.config.m_size().min(self.num_output - self.row),
            cols: self.config.v_size().min(self.num_input - self.col),
        };
        self.col += self.config.v_size();
        if self.col >= self.num_input {
            self.col = 0;
            self.row += self.config.m_size();
        }
        Some(tile)
    }
}

/// Number of block multiplies `large_multiply` issues for this problem:
/// `ceil(num_output / m_size) * ceil(num_input / v_size)`.
pub fn block_invocations(config: EngineConfig, num_input: usize, num_output: usize) -> u64 {
    (num_output.div_ceil(config.m_size()) * num_input.div_ceil(config.v_size())) as u64
}

/// Multiply a `num_output x num_input` row-major `matrix` by `input`, writing
/// the `num_output` results into `output`.
///
/// The product is computed one tile at a time on `engine`. Each tile is
/// loaded left-aligned into the engine's zeroed buffers, so padding rows and
/// columns contribute nothing, and the first `tile.rows` results are added
/// into `output`. Partial sums for a row are accumulated over its column
/// blocks in increasing column order.
///
/// `output` is fully overwritten. Engine failures (a hung device) are not
/// detected here.
pub fn large_multiply<E: BlockEngine + ?Sized>(
    engine: &mut E,
    matrix: &[f32],
    input: &[f32],
    output: &mut [f32],
    num_input: usize,
    num_output: usize,
) -> Result<()> {
    let matrix_len = num_output
        .checked_mul(num_input)
        .ok_or_else(|| OpsError::Overflow {
            what: "matrix",
            dims: vec![num_output, num_input],
        })?;
    check_len("matrix", matrix_len, matrix.len())?;
    check_len("input", num_input, input.len())?;
    check_len("output", num_output, output.len())?;

    let config = engine.config();
    log::debug!(
        "large_multiply: {}x{} on {} ({}x{} blocks, {} calls)",
        num_output,
        num_input,
        engine.name(),
        config.m_size(),
        config.v_size(),
        block_invocations(config, num_input, num_output)
    );

    output.fill(0.0);

    for tile in TileGrid::new(config, num_input, num_output) {
        log::trace!("tile {:?}", tile);
        load_tile(engine, config, matrix, input, num_input, &tile);

        let partial = engine.execute();
        for (out, value) in output[tile.row..tile.row + tile.rows]
            .iter_mut()
            .zip(&partial[..tile.rows])
        {
            *out += value;
        }
    }

    Ok(())
}

fn load_tile<E: BlockEngine + ?Sized>(
    engine: &mut E,
    config: EngineConfig,
    matrix: &[f32],
    input: &[f32],
    num_input: usize,
    tile: &Tile,
) {
    let vector = engine.vector_mut();
    vector.fill(0.0);
    vector[..tile.cols].copy_from_slice(&input[tile.col..tile.col + tile.cols]);

    let v_size = config.v_size();
    let block = engine.matrix_mut();
    block.fill(0.0);
    for r in 0..tile.rows {
        let src = (tile.row + r) * num_input + tile.col;
        let dst = r * v_size;
        block[dst..dst + tile.cols].copy_from_slice(&matrix[src..src + tile.cols]);
    }
}

fn check_len(what: &'static str, expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(OpsError::LengthMismatch {
            what,
            expected,
            got,
        });
    }
    Ok(())
}
