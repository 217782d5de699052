//! Vector mirrors select the entries of a local vector that are shared with one neighbour.
use crate::container::LocalVector;
use crate::error::{check_dims, LafemError, Result};
use crate::vector::DenseVector;
use lafem_arch::mirror::{gather, scatter_axpy};
use lafem_arch::Real;

/// A list of (block) indices into local vectors of a fixed size.
///
/// The order of the indices defines the order of the exchange buffer, so the mirrors of two
/// neighbouring ranks must list their shared entries in the same order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VectorMirror {
    size: usize,
    indices: Vec<usize>,
}

impl VectorMirror {
    pub fn new(size: usize, indices: Vec<usize>) -> Result<Self> {
        if let Some(&index) = indices.iter().find(|&&i| i >= size) {
            return Err(LafemError::IndexOutOfBounds { index, size });
        }
        Ok(Self { size, indices })
    }

    /// A mirror selecting every entry.
    pub fn make_identity(size: usize) -> Self {
        Self {
            size,
            indices: (0..size).collect(),
        }
    }

    /// Size of the vectors this mirror applies to.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn num_indices(&self) -> usize {
        self.indices.len()
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// An exchange buffer for vectors with the given block size.
    pub fn create_buffer<T: Real>(&self, block_size: usize) -> DenseVector<T> {
        DenseVector::new(self.num_indices() * block_size)
    }

    /// Copies the mirrored entries of `x` into `buffer`.
    pub fn gather<T: Real, V: LocalVector<T>>(&self, buffer: &mut DenseVector<T>, x: &V) -> Result<()> {
        self.check(x, buffer)?;
        gather(buffer.as_mut_slice(), x.values(), &self.indices, x.block_size());
        Ok(())
    }

    /// Adds `alpha * buffer` onto the mirrored entries of `x`.
    pub fn scatter_axpy<T: Real, V: LocalVector<T>>(&self, x: &mut V, buffer: &DenseVector<T>, alpha: T) -> Result<()> {
        self.check(x, buffer)?;
        let block_size = x.block_size();
        scatter_axpy(x.values_mut(), buffer.as_slice(), &self.indices, alpha, block_size);
        Ok(())
    }

    fn check<T: Real, V: LocalVector<T>>(&self, x: &V, buffer: &DenseVector<T>) -> Result<()> {
        check_dims("VectorMirror", self.size, x.size())?;
        check_dims("VectorMirror", self.num_indices() * x.block_size(), buffer.size())
    }
}
