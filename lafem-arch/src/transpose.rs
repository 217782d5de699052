//! Transposition of dense and CSR storage.
use crate::Real;

/// Writes the transpose of the row-major `rows x columns` matrix `x` into `r`.
pub fn transpose_dense<T: Real>(r: &mut [T], x: &[T], rows: usize, columns: usize) {
    debug_assert_eq!(r.len(), rows * columns);
    debug_assert_eq!(x.len(), rows * columns);
    for i in 0..rows {
        for j in 0..columns {
            r[j * rows + i] = x[i * columns + j];
        }
    }
}

/// CSR arrays produced by [`transpose_csr`].
#[derive(Debug, Clone, PartialEq)]
pub struct CsrParts<T> {
    pub row_ptr: Vec<usize>,
    pub col_idx: Vec<usize>,
    pub val: Vec<T>,
}

/// Transposes a CSR matrix with `columns` columns.
///
/// Rows of the result have ascending column indices regardless of the ordering in the input.
pub fn transpose_csr<T: Real>(columns: usize, row_ptr: &[usize], col_idx: &[usize], val: &[T]) -> CsrParts<T> {
    let nnz = col_idx.len();
    let mut counts = vec![0usize; columns + 1];
    for &j in col_idx {
        counts[j + 1] += 1;
    }
    for j in 0..columns {
        counts[j + 1] += counts[j];
    }
    let row_ptr_t = counts.clone();

    let mut next = counts;
    let mut col_idx_t = vec![0; nnz];
    let mut val_t = vec![T::zero(); nnz];
    for row in 0..row_ptr.len().saturating_sub(1) {
        for k in row_ptr[row]..row_ptr[row + 1] {
            let j = col_idx[k];
            let target = next[j];
            col_idx_t[target] = row;
            val_t[target] = val[k];
            next[j] += 1;
        }
    }

    CsrParts {
        row_ptr: row_ptr_t,
        col_idx: col_idx_t,
        val: val_t,
    }
}
