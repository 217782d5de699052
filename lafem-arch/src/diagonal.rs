//! Extraction of the main diagonal.
//!
//! The diagonal entry of a row is located by a linear scan over the stored entries of that row, so
//! rows do not need sorted column indices. A structurally missing diagonal entry yields zero.
use crate::{for_each_entry, Backend, Real};

pub fn diagonal_csr<T: Real>(backend: Backend, r: &mut [T], row_ptr: &[usize], col_idx: &[usize], val: &[T]) {
    debug_assert_eq!(row_ptr.len(), r.len() + 1);
    for_each_entry(backend, r, |row, r_row| {
        *r_row = (row_ptr[row]..row_ptr[row + 1])
            .find(|&k| col_idx[k] == row)
            .map(|k| val[k])
            .unwrap_or_else(T::zero);
    });
}

/// Diagonal of a blocked CSR matrix with square blocks.
///
/// `r` holds `block_size` entries per block row: the main diagonal of the diagonal block.
pub fn diagonal_bcsr<T: Real>(
    backend: Backend,
    r: &mut [T],
    row_ptr: &[usize],
    col_idx: &[usize],
    val: &[T],
    block_size: usize,
) {
    let block_len = block_size * block_size;
    crate::for_each_block(backend, r, block_size, |block_row, r_block| {
        let diagonal_block = (row_ptr[block_row]..row_ptr[block_row + 1]).find(|&k| col_idx[k] == block_row);
        for (b, r_b) in r_block.iter_mut().enumerate() {
            *r_b = diagonal_block
                .map(|k| val[k * block_len + b * block_size + b])
                .unwrap_or_else(T::zero);
        }
    });
}

/// Diagonal of an ELL matrix, see [`crate::product_matvec::product_matvec_ell`] for the layout.
pub fn diagonal_ell<T: Real>(
    backend: Backend,
    r: &mut [T],
    val: &[T],
    col_idx: &[usize],
    row_len: &[usize],
    stride: usize,
) {
    for_each_entry(backend, r, |row, r_row| {
        *r_row = (0..row_len[row])
            .map(|n| row + n * stride)
            .find(|&k| col_idx[k] == row)
            .map(|k| val[k])
            .unwrap_or_else(T::zero);
    });
}
