use crate::container::{CloneMode, LocalVector};
use crate::error::{LafemError, Result};
use crate::memory::{Buffer, MemoryArena};
use lafem_arch::Real;
use nalgebra::{DVector, DVectorSlice};
use std::ops::{Index, IndexMut};

/// A dense vector of scalars.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseVector<T> {
    values: Buffer<T>,
}

impl<T: Real> Default for DenseVector<T> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<T: Real> DenseVector<T> {
    /// A zero vector of the given size on a fresh generic arena.
    pub fn new(size: usize) -> Self {
        Self::new_in(&MemoryArena::default(), size)
    }

    pub fn new_in(arena: &MemoryArena, size: usize) -> Self {
        Self {
            values: arena.allocate(size),
        }
    }

    pub fn filled(size: usize, value: T) -> Self {
        Self::filled_in(&MemoryArena::default(), size, value)
    }

    pub fn filled_in(arena: &MemoryArena, size: usize, value: T) -> Self {
        Self {
            values: arena.allocate_filled(size, value),
        }
    }

    pub fn from_vec(values: Vec<T>) -> Self {
        Self::from_vec_in(&MemoryArena::default(), values)
    }

    pub fn from_vec_in(arena: &MemoryArena, values: Vec<T>) -> Self {
        Self {
            values: arena.adopt(values),
        }
    }

    pub fn from_slice(values: &[T]) -> Self {
        Self::from_vec(values.to_vec())
    }

    pub(crate) fn from_buffer(values: Buffer<T>) -> Self {
        Self { values }
    }

    pub fn as_slice(&self) -> &[T] {
        self.values.as_slice()
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.values.as_mut_slice()
    }

    pub fn buffer(&self) -> &Buffer<T> {
        &self.values
    }

    pub fn used_elements(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.as_slice().get(index).copied()
    }

    pub fn set(&mut self, index: usize, value: T) -> Result<()> {
        let size = self.size();
        let entry = self
            .as_mut_slice()
            .get_mut(index)
            .ok_or(LafemError::IndexOutOfBounds { index, size })?;
        *entry = value;
        Ok(())
    }

    /// Copies the vector into another arena.
    pub fn transfer_to(&self, arena: &MemoryArena) -> Self {
        Self {
            values: arena.transfer(&self.values),
        }
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.values.to_vec()
    }

    pub fn to_nalgebra(&self) -> DVector<T> {
        DVector::from_column_slice(self.as_slice())
    }
}

impl<T: Real> LocalVector<T> for DenseVector<T> {
    fn size(&self) -> usize {
        self.values.len()
    }

    fn block_size(&self) -> usize {
        1
    }

    fn values(&self) -> &[T] {
        self.values.as_slice()
    }

    fn values_mut(&mut self) -> &mut [T] {
        self.values.as_mut_slice()
    }

    fn arena(&self) -> MemoryArena {
        self.values.arena()
    }

    fn clone_with(&self, mode: CloneMode) -> Self {
        match mode {
            CloneMode::Weak => self.clone(),
            CloneMode::Shallow | CloneMode::Deep => Self {
                values: self.values.deep_clone(),
            },
        }
    }
}

impl<T> Index<usize> for DenseVector<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.values.as_slice()[index]
    }
}

impl<T: Clone> IndexMut<usize> for DenseVector<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.values.as_mut_slice()[index]
    }
}

impl<'a, T: Real> From<DVectorSlice<'a, T>> for DenseVector<T> {
    fn from(v: DVectorSlice<'a, T>) -> Self {
        Self::from_vec(v.iter().copied().collect())
    }
}

impl<'a, T: Real> From<&'a DVector<T>> for DenseVector<T> {
    fn from(v: &'a DVector<T>) -> Self {
        Self::from_slice(v.as_slice())
    }
}
