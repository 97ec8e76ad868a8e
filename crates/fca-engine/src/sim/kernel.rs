// Block matrix-vector kernel shared by the simulation backend and the
// device emulator in the mmio tests.

/// `out[r] = sum_c vector[c] * matrix[r * v_size + c]` for every row of `out`.
///
/// Single-precision accumulation, left to right. NaN and Inf propagate.
pub fn block_mv(vector: &[f32], matrix: &[f32], out: &mut [f32]) {
    let v_size = vector.len();
    debug_assert_eq!(matrix.len(), out.len() * v_size);

    for (r, slot) in out.iter_mut().enumerate() {
        let row = &matrix[r * v_size..(r + 1) * v_size];
        let mut sum = 0.0f32;
        for (x, w) in vector.iter().zip(row) {
            sum += x * w;
        }
        *slot = sum;
    }
}
