//! Gather and scatter of mirrored vector entries into exchange buffers.
use crate::Real;

/// Copies the blocks `x[indices[i]]` into consecutive blocks of `buffer`.
pub fn gather<T: Real>(buffer: &mut [T], x: &[T], indices: &[usize], block_size: usize) {
    debug_assert_eq!(buffer.len(), indices.len() * block_size);
    for (i, &index) in indices.iter().enumerate() {
        buffer[i * block_size..(i + 1) * block_size]
            .copy_from_slice(&x[index * block_size..(index + 1) * block_size]);
    }
}

/// Adds `alpha * buffer` onto the blocks `x[indices[i]]`.
pub fn scatter_axpy<T: Real>(x: &mut [T], buffer: &[T], indices: &[usize], alpha: T, block_size: usize) {
    debug_assert_eq!(buffer.len(), indices.len() * block_size);
    for (i, &index) in indices.iter().enumerate() {
        let source = &buffer[i * block_size..(i + 1) * block_size];
        for (x_j, b_j) in x[index * block_size..(index + 1) * block_size].iter_mut().zip(source) {
            *x_j += alpha * *b_j;
        }
    }
}
