//! Unit filters for Dirichlet-type constraints on (blocked) vectors.
//!
//! Constraints are given as a list of block indices and, for `filter_rhs`, the prescribed values
//! with `block_size` entries per index. The scalar filter is the case `block_size == 1`.
use crate::Real;

/// Overwrites the constrained blocks of `v` with the prescribed values.
pub fn filter_rhs<T: Real>(v: &mut [T], sv_elements: &[T], sv_indices: &[usize], block_size: usize) {
    debug_assert_eq!(sv_elements.len(), sv_indices.len() * block_size);
    for (i, &index) in sv_indices.iter().enumerate() {
        v[block_size * index..block_size * (index + 1)]
            .copy_from_slice(&sv_elements[block_size * i..block_size * (i + 1)]);
    }
}

/// Zeroes the constrained blocks of `v`.
pub fn filter_def<T: Real>(v: &mut [T], sv_indices: &[usize], block_size: usize) {
    for &index in sv_indices {
        v[block_size * index..block_size * (index + 1)].fill(T::zero());
    }
}

/// Replaces every constrained row of a CSR matrix by the corresponding unit row.
pub fn filter_unit_rows_csr<T: Real>(val: &mut [T], row_ptr: &[usize], col_idx: &[usize], sv_indices: &[usize]) {
    for &row in sv_indices {
        for k in row_ptr[row]..row_ptr[row + 1] {
            val[k] = if col_idx[k] == row { T::one() } else { T::zero() };
        }
    }
}
