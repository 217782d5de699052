//! Row sums ("lumped" diagonal approximations).
use crate::{for_each_block, for_each_entry, Backend, Real};

pub fn lumping_csr<T: Real>(backend: Backend, r: &mut [T], row_ptr: &[usize], val: &[T]) {
    debug_assert_eq!(row_ptr.len(), r.len() + 1);
    for_each_entry(backend, r, |row, r_row| {
        *r_row = val[row_ptr[row]..row_ptr[row + 1]]
            .iter()
            .fold(T::zero(), |sum, v| sum + *v);
    });
}

/// Row sums of a blocked CSR matrix. `r` holds `block_height` entries per block row.
pub fn lumping_bcsr<T: Real>(
    backend: Backend,
    r: &mut [T],
    row_ptr: &[usize],
    val: &[T],
    block_height: usize,
    block_width: usize,
) {
    let block_len = block_height * block_width;
    for_each_block(backend, r, block_height, |block_row, r_block| {
        for (bi, r_i) in r_block.iter_mut().enumerate() {
            let mut sum = T::zero();
            for k in row_ptr[block_row]..row_ptr[block_row + 1] {
                let row = &val[k * block_len + bi * block_width..k * block_len + (bi + 1) * block_width];
                for v in row {
                    sum += *v;
                }
            }
            *r_i = sum;
        }
    });
}

pub fn lumping_ell<T: Real>(backend: Backend, r: &mut [T], val: &[T], row_len: &[usize], stride: usize) {
    for_each_entry(backend, r, |row, r_row| {
        *r_row = (0..row_len[row]).fold(T::zero(), |sum, n| sum + val[row + n * stride]);
    });
}
