use crate::container::{CloneMode, LocalVector};
use crate::error::{LafemError, Result};
use crate::memory::{Buffer, MemoryArena};
use crate::vector::{DenseVector, DenseVectorBlocked};
use lafem_arch::{Backend, Real};
use log::trace;
use nalgebra::SVector;

/// Upper bound on the number of entries added per storage growth step.
const MAX_GROWTH: usize = 1000;

/// Index-sorted entry storage shared by the scalar and blocked sparse vectors.
///
/// Storage is allocated in chunks: `indices` and `values` have room for `capacity` entries, of
/// which the first `used` are set. Indices are strictly increasing.
#[derive(Debug, Clone)]
struct SortedEntries<T> {
    size: usize,
    block_size: usize,
    used: usize,
    indices: Buffer<usize>,
    values: Buffer<T>,
}

impl<T: Real> SortedEntries<T> {
    fn new_in(arena: &MemoryArena, size: usize, block_size: usize) -> Self {
        Self {
            size,
            block_size,
            used: 0,
            indices: arena.allocate(0),
            values: arena.allocate(0),
        }
    }

    /// Collects the blocks of `dense` with a non-zero component.
    fn from_dense_blocks(arena: &MemoryArena, block_size: usize, dense: &[T]) -> Self {
        let mut indices = Vec::new();
        let mut values = Vec::new();
        for (i, block) in dense.chunks_exact(block_size).enumerate() {
            if block.iter().any(|&x| x != T::zero()) {
                indices.push(i);
                values.extend_from_slice(block);
            }
        }
        Self {
            size: dense.len() / block_size,
            block_size,
            used: indices.len(),
            indices: arena.adopt(indices),
            values: arena.adopt(values),
        }
    }

    fn capacity(&self) -> usize {
        self.indices.len()
    }

    fn growth(&self) -> usize {
        self.size.min(MAX_GROWTH).max(1)
    }

    fn indices(&self) -> &[usize] {
        &self.indices.as_slice()[..self.used]
    }

    fn elements(&self) -> &[T] {
        &self.values.as_slice()[..self.used * self.block_size]
    }

    fn elements_mut(&mut self) -> &mut [T] {
        let len = self.used * self.block_size;
        &mut self.values.as_mut_slice()[..len]
    }

    fn position(&self, index: usize) -> std::result::Result<usize, usize> {
        self.indices().binary_search(&index)
    }

    fn get(&self, index: usize) -> Option<&[T]> {
        let bs = self.block_size;
        self.position(index)
            .ok()
            .map(|pos| &self.values.as_slice()[pos * bs..(pos + 1) * bs])
    }

    fn set(&mut self, index: usize, block: &[T]) -> Result<()> {
        if index >= self.size {
            return Err(LafemError::IndexOutOfBounds {
                index,
                size: self.size,
            });
        }
        debug_assert_eq!(block.len(), self.block_size);
        let bs = self.block_size;
        match self.position(index) {
            Ok(pos) => {
                self.values.as_mut_slice()[pos * bs..(pos + 1) * bs].copy_from_slice(block);
            }
            Err(pos) => {
                if self.used == self.capacity() {
                    self.grow();
                }
                let used = self.used;
                let indices = self.indices.as_mut_slice();
                indices.copy_within(pos..used, pos + 1);
                indices[pos] = index;
                let values = self.values.as_mut_slice();
                values.copy_within(pos * bs..used * bs, (pos + 1) * bs);
                values[pos * bs..(pos + 1) * bs].copy_from_slice(block);
                self.used += 1;
            }
        }
        Ok(())
    }

    fn grow(&mut self) {
        let arena = self.indices.arena();
        let capacity = self.capacity() + self.growth();
        trace!("Growing sparse vector storage from {} to {} entries", self.capacity(), capacity);
        let mut indices = arena.allocate(capacity);
        indices.as_mut_slice()[..self.used].copy_from_slice(self.indices());
        let mut values = arena.allocate(capacity * self.block_size);
        values.as_mut_slice()[..self.used * self.block_size].copy_from_slice(self.elements());
        self.indices = indices;
        self.values = values;
    }

    fn clone_with(&self, mode: CloneMode) -> Self {
        match mode {
            CloneMode::Weak => self.clone(),
            CloneMode::Shallow => Self {
                values: self.values.deep_clone(),
                ..self.clone()
            },
            CloneMode::Deep => Self {
                indices: self.indices.deep_clone(),
                values: self.values.deep_clone(),
                ..self.clone()
            },
        }
    }

    fn scatter_into(&self, dense: &mut [T]) {
        let bs = self.block_size;
        for (&index, block) in self.indices().iter().zip(self.elements().chunks_exact(bs)) {
            dense[index * bs..(index + 1) * bs].copy_from_slice(block);
        }
    }
}

impl<T: PartialEq> PartialEq for SortedEntries<T> {
    fn eq(&self, other: &Self) -> bool {
        let len = self.used * self.block_size;
        self.size == other.size
            && self.block_size == other.block_size
            && self.indices.as_slice()[..self.used] == other.indices.as_slice()[..other.used]
            && other.used * other.block_size == len
            && self.values.as_slice()[..len] == other.values.as_slice()[..len]
    }
}

/// A vector of logical length `size` that stores only explicitly set entries.
///
/// Writing an index for the first time inserts it; later writes update the stored value. Reads of
/// indices that were never written yield zero.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseVector<T> {
    entries: SortedEntries<T>,
}

impl<T: Real> Default for SparseVector<T> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<T: Real> SparseVector<T> {
    pub fn new(size: usize) -> Self {
        Self::new_in(&MemoryArena::default(), size)
    }

    pub fn new_in(arena: &MemoryArena, size: usize) -> Self {
        Self {
            entries: SortedEntries::new_in(arena, size, 1),
        }
    }

    /// Builds a sparse vector from unsorted `(index, value)` pairs. Later pairs override earlier
    /// pairs with the same index.
    pub fn from_entries(size: usize, indices: &[usize], values: &[T]) -> Result<Self> {
        crate::error::check_dims("SparseVector::from_entries", indices.len(), values.len())?;
        let mut v = Self::new(size);
        for (&i, &value) in indices.iter().zip(values) {
            v.set(i, value)?;
        }
        Ok(v)
    }

    /// Collects the non-zero entries of a dense vector.
    pub fn from_dense(dense: &DenseVector<T>) -> Self {
        Self {
            entries: SortedEntries::from_dense_blocks(&dense.arena(), 1, dense.as_slice()),
        }
    }

    pub fn size(&self) -> usize {
        self.entries.size
    }

    /// Number of stored entries.
    pub fn used_elements(&self) -> usize {
        self.entries.used
    }

    pub fn allocated_elements(&self) -> usize {
        self.entries.capacity()
    }

    pub fn arena(&self) -> MemoryArena {
        self.entries.values.arena()
    }

    pub fn backend(&self) -> Backend {
        self.arena().backend()
    }

    /// Returns `None` for out-of-range indices and zero for unset entries.
    pub fn get(&self, index: usize) -> Option<T> {
        if index >= self.size() {
            None
        } else {
            Some(self.entries.get(index).map_or(T::zero(), |v| v[0]))
        }
    }

    pub fn set(&mut self, index: usize, value: T) -> Result<()> {
        self.entries.set(index, &[value])
    }

    /// The stored indices in ascending order.
    pub fn indices(&self) -> &[usize] {
        self.entries.indices()
    }

    /// The stored values, ordered like [`indices`](Self::indices).
    pub fn elements(&self) -> &[T] {
        self.entries.elements()
    }

    pub fn elements_mut(&mut self) -> &mut [T] {
        self.entries.elements_mut()
    }

    pub fn iter(&self) -> impl '_ + Iterator<Item = (usize, T)> {
        self.indices().iter().copied().zip(self.elements().iter().copied())
    }

    /// Sets all stored values, keeping the sparsity pattern.
    pub fn format(&mut self, value: T) {
        self.elements_mut().fill(value);
    }

    pub fn clone_with(&self, mode: CloneMode) -> Self {
        Self {
            entries: self.entries.clone_with(mode),
        }
    }

    pub fn to_dense(&self) -> DenseVector<T> {
        let mut dense = DenseVector::new_in(&self.arena(), self.size());
        self.entries.scatter_into(dense.as_mut_slice());
        dense
    }
}

/// A sparse vector of blocks of `B` scalars.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseVectorBlocked<T, const B: usize> {
    entries: SortedEntries<T>,
}

impl<T: Real, const B: usize> Default for SparseVectorBlocked<T, B> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<T: Real, const B: usize> SparseVectorBlocked<T, B> {
    pub fn new(blocks: usize) -> Self {
        Self::new_in(&MemoryArena::default(), blocks)
    }

    pub fn new_in(arena: &MemoryArena, blocks: usize) -> Self {
        Self {
            entries: SortedEntries::new_in(arena, blocks, B),
        }
    }

    pub fn from_entries(blocks: usize, indices: &[usize], values: &[SVector<T, B>]) -> Result<Self> {
        crate::error::check_dims("SparseVectorBlocked::from_entries", indices.len(), values.len())?;
        let mut v = Self::new(blocks);
        for (&i, value) in indices.iter().zip(values) {
            v.set(i, value)?;
        }
        Ok(v)
    }

    /// Collects the blocks of a dense blocked vector that have a non-zero component.
    pub fn from_dense(dense: &DenseVectorBlocked<T, B>) -> Self {
        Self {
            entries: SortedEntries::from_dense_blocks(&dense.arena(), B, dense.values()),
        }
    }

    /// Number of logical blocks.
    pub fn size(&self) -> usize {
        self.entries.size
    }

    pub fn used_elements(&self) -> usize {
        self.entries.used
    }

    pub fn allocated_elements(&self) -> usize {
        self.entries.capacity()
    }

    pub fn arena(&self) -> MemoryArena {
        self.entries.values.arena()
    }

    pub fn backend(&self) -> Backend {
        self.arena().backend()
    }

    pub fn get(&self, index: usize) -> Option<SVector<T, B>> {
        if index >= self.size() {
            None
        } else {
            Some(
                self.entries
                    .get(index)
                    .map_or_else(SVector::zeros, SVector::from_column_slice),
            )
        }
    }

    pub fn set(&mut self, index: usize, value: &SVector<T, B>) -> Result<()> {
        self.entries.set(index, value.as_slice())
    }

    pub fn indices(&self) -> &[usize] {
        self.entries.indices()
    }

    /// The stored blocks flattened to scalars.
    pub fn elements(&self) -> &[T] {
        self.entries.elements()
    }

    pub fn elements_mut(&mut self) -> &mut [T] {
        self.entries.elements_mut()
    }

    pub fn iter(&self) -> impl '_ + Iterator<Item = (usize, SVector<T, B>)> {
        self.indices()
            .iter()
            .copied()
            .zip(self.elements().chunks_exact(B).map(SVector::from_column_slice))
    }

    pub fn format(&mut self, value: T) {
        self.elements_mut().fill(value);
    }

    pub fn clone_with(&self, mode: CloneMode) -> Self {
        Self {
            entries: self.entries.clone_with(mode),
        }
    }

    pub fn to_dense(&self) -> DenseVectorBlocked<T, B> {
        let mut dense = DenseVectorBlocked::new_in(&self.arena(), self.size());
        self.entries.scatter_into(dense.values_mut());
        dense
    }
}
