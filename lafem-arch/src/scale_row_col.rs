//! Row and column scaling of stored matrix values.
//!
//! Column scaling uses the column index attached to each stored value.
use crate::{Backend, Real};
use rayon::prelude::*;

/// Computes `r[k] = a[k] * x[row(k)]` for every stored value of a CSR matrix.
///
/// `r` and `a` may be the same buffer, in which case `a` is passed as `None`.
pub fn scale_rows_csr<T: Real>(backend: Backend, r: &mut [T], a: Option<&[T]>, row_ptr: &[usize], x: &[T]) {
    debug_assert_eq!(row_ptr.len(), x.len() + 1);
    let scale_row = |row: usize, r_row: &mut [T]| {
        let begin = row_ptr[row];
        for (local, r_k) in r_row.iter_mut().enumerate() {
            let a_k = a.map(|a| a[begin + local]).unwrap_or(*r_k);
            *r_k = a_k * x[row];
        }
    };
    match backend {
        Backend::Generic => {
            for row in 0..x.len() {
                scale_row(row, &mut r[row_ptr[row]..row_ptr[row + 1]]);
            }
        }
        Backend::Parallel => {
            split_rows(r, row_ptr)
                .into_par_iter()
                .enumerate()
                .for_each(|(row, r_row)| scale_row(row, r_row));
        }
    }
}

/// Computes `r[k] = a[k] * x[col(k)]` for every stored value.
///
/// Works for any format that stores one column index per value (CSR, COO, ELL).
pub fn scale_cols<T: Real>(backend: Backend, r: &mut [T], a: Option<&[T]>, col_idx: &[usize], x: &[T]) {
    debug_assert_eq!(r.len(), col_idx.len());
    crate::for_each_entry(backend, r, |k, r_k| {
        let a_k = a.map(|a| a[k]).unwrap_or(*r_k);
        *r_k = a_k * x[col_idx[k]];
    });
}

/// Scales the rows of an ELL matrix. Padding entries are scaled as well, which is harmless.
pub fn scale_rows_ell<T: Real>(backend: Backend, r: &mut [T], a: Option<&[T]>, stride: usize, x: &[T]) {
    debug_assert!(stride >= x.len());
    crate::for_each_entry(backend, r, |k, r_k| {
        let row = k % stride;
        let a_k = a.map(|a| a[k]).unwrap_or(*r_k);
        *r_k = if row < x.len() { a_k * x[row] } else { a_k };
    });
}

/// Scales the scalar rows of a blocked CSR matrix by `x`, which holds `block_height` entries per
/// block row.
pub fn scale_rows_bcsr<T: Real>(
    r: &mut [T],
    row_ptr: &[usize],
    x: &[T],
    block_height: usize,
    block_width: usize,
) {
    let block_len = block_height * block_width;
    for block_row in 0..row_ptr.len() - 1 {
        for k in row_ptr[block_row]..row_ptr[block_row + 1] {
            for bi in 0..block_height {
                for bj in 0..block_width {
                    r[k * block_len + bi * block_width + bj] *= x[block_row * block_height + bi];
                }
            }
        }
    }
}

/// Scales the scalar columns of a blocked CSR matrix by `x`, which holds `block_width` entries per
/// block column.
pub fn scale_cols_bcsr<T: Real>(r: &mut [T], col_idx: &[usize], x: &[T], block_height: usize, block_width: usize) {
    let block_len = block_height * block_width;
    for (k, &block_col) in col_idx.iter().enumerate() {
        for bi in 0..block_height {
            for bj in 0..block_width {
                r[k * block_len + bi * block_width + bj] *= x[block_col * block_width + bj];
            }
        }
    }
}

/// Splits a value buffer into the mutable row slices described by `row_ptr`.
fn split_rows<'a, T>(mut values: &'a mut [T], row_ptr: &[usize]) -> Vec<&'a mut [T]> {
    let mut rows = Vec::with_capacity(row_ptr.len().saturating_sub(1));
    for window in row_ptr.windows(2) {
        let (row, rest) = std::mem::take(&mut values).split_at_mut(window[1] - window[0]);
        rows.push(row);
        values = rest;
    }
    rows
}
