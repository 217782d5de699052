//! Matrix-vector products for every storage format.
//!
//! All kernels compute one row sum `s_i = (A x)_i` and hand it to an [`Accumulate`] rule, so the
//! same kernel serves `r = A x`, `r = alpha A x + y` and `r = rhs - A x`.
use crate::{for_each_block, for_each_entry, Backend, Real};

/// How a row sum `s` is combined into the output entry `r[i]`.
#[derive(Debug, Clone, Copy)]
pub enum Accumulate<'a, T> {
    /// `r[i] = s`
    Product,
    /// `r[i] = s * alpha + y[i]`
    Axpy { alpha: T, y: &'a [T] },
    /// `r[i] = s * alpha[i] + y[i]`
    AxpyVector { alpha: &'a [T], y: &'a [T] },
    /// `r[i] = s * alpha + r[i]`, the case where the output aliases `y`.
    AxpyInPlace { alpha: T },
    /// `r[i] = rhs[i] - s`
    Defect { rhs: &'a [T] },
}

impl<'a, T: Real> Accumulate<'a, T> {
    #[inline(always)]
    pub fn store(&self, index: usize, sum: T, r: &mut T) {
        *r = match *self {
            Accumulate::Product => sum,
            Accumulate::Axpy { alpha, y } => sum * alpha + y[index],
            Accumulate::AxpyVector { alpha, y } => sum * alpha[index] + y[index],
            Accumulate::AxpyInPlace { alpha } => sum * alpha + *r,
            Accumulate::Defect { rhs } => rhs[index] - sum,
        };
    }

    /// Length of the auxiliary vectors, if any.
    pub fn operand_len(&self) -> Option<usize> {
        match self {
            Accumulate::Product | Accumulate::AxpyInPlace { .. } => None,
            Accumulate::Axpy { y, .. } | Accumulate::AxpyVector { y, .. } => Some(y.len()),
            Accumulate::Defect { rhs } => Some(rhs.len()),
        }
    }
}

/// CSR product. `row_ptr` has `r.len() + 1` entries.
pub fn product_matvec_csr<T: Real>(
    backend: Backend,
    r: &mut [T],
    acc: Accumulate<T>,
    row_ptr: &[usize],
    col_idx: &[usize],
    val: &[T],
    x: &[T],
) {
    debug_assert_eq!(row_ptr.len(), r.len() + 1);
    debug_assert_eq!(col_idx.len(), val.len());
    for_each_entry(backend, r, |row, r_row| {
        let mut sum = T::zero();
        for k in row_ptr[row]..row_ptr[row + 1] {
            sum += val[k] * x[col_idx[k]];
        }
        acc.store(row, sum, r_row);
    });
}

/// Blocked CSR product.
///
/// `row_ptr` and `col_idx` address blocks. Each block stores `block_height * block_width` values
/// in row-major order. `r` holds `block_height` entries per block row.
pub fn product_matvec_bcsr<T: Real>(
    backend: Backend,
    r: &mut [T],
    acc: Accumulate<T>,
    row_ptr: &[usize],
    col_idx: &[usize],
    val: &[T],
    x: &[T],
    block_height: usize,
    block_width: usize,
) {
    let block_size = block_height * block_width;
    debug_assert_eq!(row_ptr.len() * block_height, r.len() + block_height);
    debug_assert_eq!(col_idx.len() * block_size, val.len());
    for_each_block(backend, r, block_height, |block_row, r_block| {
        for (bi, r_i) in r_block.iter_mut().enumerate() {
            let mut sum = T::zero();
            for k in row_ptr[block_row]..row_ptr[block_row + 1] {
                let block = &val[k * block_size..(k + 1) * block_size];
                let x_block = &x[col_idx[k] * block_width..(col_idx[k] + 1) * block_width];
                for bj in 0..block_width {
                    sum += block[bi * block_width + bj] * x_block[bj];
                }
            }
            acc.store(block_row * block_height + bi, sum, r_i);
        }
    });
}

/// COO product.
///
/// Entries must be grouped by row in ascending row order. Rows without entries yield a zero
/// row sum.
pub fn product_matvec_coo<T: Real>(
    _backend: Backend,
    r: &mut [T],
    acc: Accumulate<T>,
    row_idx: &[usize],
    col_idx: &[usize],
    val: &[T],
    x: &[T],
) {
    debug_assert_eq!(row_idx.len(), col_idx.len());
    debug_assert_eq!(row_idx.len(), val.len());
    debug_assert!(row_idx.windows(2).all(|w| w[0] <= w[1]));
    let mut iter = 0;
    for (row, r_row) in r.iter_mut().enumerate() {
        let mut sum = T::zero();
        while iter < row_idx.len() && row_idx[iter] == row {
            sum += val[iter] * x[col_idx[iter]];
            iter += 1;
        }
        acc.store(row, sum, r_row);
    }
}

/// ELL product.
///
/// Values and column indices are stored column-major with the given `stride` (`stride >= rows`):
/// the `n`-th stored entry of row `i` lives at `i + n * stride`. `row_len[i]` is the number of
/// stored entries of row `i`.
pub fn product_matvec_ell<T: Real>(
    backend: Backend,
    r: &mut [T],
    acc: Accumulate<T>,
    val: &[T],
    col_idx: &[usize],
    row_len: &[usize],
    stride: usize,
    x: &[T],
) {
    debug_assert_eq!(row_len.len(), r.len());
    debug_assert!(stride >= r.len());
    for_each_entry(backend, r, |row, r_row| {
        let mut sum = T::zero();
        for n in 0..row_len[row] {
            let k = row + n * stride;
            sum += val[k] * x[col_idx[k]];
        }
        acc.store(row, sum, r_row);
    });
}

/// Banded product.
///
/// Band `a` stores its entries in `val[a * rows .. (a + 1) * rows]`, indexed by row. Band offsets
/// are encoded as `offset + rows - 1` and sorted ascending, so that row `l` of band `a` holds the
/// entry in column `l + offsets[a] + 1 - rows`. Entries whose column falls outside the matrix are
/// padding and never read.
///
/// Rows are partitioned into ranges on which the set of active bands is a contiguous range
/// `i..j`: lower bands switch on at row `rows - offsets[a] - 1`, and every band switches off once
/// its column leaves the matrix at row `columns + rows - offsets[a] - 1`.
pub fn product_matvec_banded<T: Real>(
    _backend: Backend,
    r: &mut [T],
    acc: Accumulate<T>,
    val: &[T],
    offsets: &[usize],
    rows: usize,
    columns: usize,
    x: &[T],
) {
    debug_assert_eq!(r.len(), rows);
    debug_assert_eq!(val.len(), offsets.len() * rows);
    debug_assert!(offsets.windows(2).all(|w| w[0] < w[1]));
    debug_assert!(offsets.iter().all(|&o| o + 1 < rows + columns));

    let num_of_offsets = offsets.len();
    // First band on or above the main diagonal
    let k = offsets
        .iter()
        .position(|&offset| offset + 1 >= rows)
        .unwrap_or(num_of_offsets);

    // `None` stands for the band index -1
    let start_offset = |j: Option<usize>| match j {
        None => rows,
        Some(j) if j == k => 0,
        Some(j) => rows - offsets[j] - 1,
    };
    let end_offset = |j: Option<usize>| match j {
        None => rows,
        Some(j) if j == num_of_offsets => 0,
        Some(j) => columns + rows - offsets[j] - 1,
    };

    for i in (0..=k).rev() {
        for j in (0..=num_of_offsets).rev() {
            let start = start_offset(Some(i)).max(end_offset(Some(j)));
            let stop = start_offset(i.checked_sub(1)).min(end_offset(j.checked_sub(1)));
            for l in start..stop {
                let mut sum = T::zero();
                for a in i..j {
                    sum += val[a * rows + l] * x[l + offsets[a] + 1 - rows];
                }
                acc.store(l, sum, &mut r[l]);
            }
        }
    }
}

/// Dense row-major product.
pub fn product_matvec_dense<T: Real>(
    backend: Backend,
    r: &mut [T],
    acc: Accumulate<T>,
    val: &[T],
    rows: usize,
    columns: usize,
    x: &[T],
) {
    debug_assert_eq!(r.len(), rows);
    debug_assert_eq!(val.len(), rows * columns);
    debug_assert_eq!(x.len(), columns);
    for_each_entry(backend, r, |row, r_row| {
        let a_row = &val[row * columns..(row + 1) * columns];
        let sum = a_row
            .iter()
            .zip(x)
            .fold(T::zero(), |sum, (a_ij, x_j)| sum + *a_ij * *x_j);
        acc.store(row, sum, r_row);
    });
}
