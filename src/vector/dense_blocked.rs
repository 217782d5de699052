use crate::container::{CloneMode, LocalVector};
use crate::error::{check_dims, LafemError, Result};
use crate::memory::{Buffer, MemoryArena};
use crate::vector::DenseVector;
use lafem_arch::Real;
use nalgebra::SVector;

/// A dense vector of fixed-size blocks of `B` scalars.
///
/// Blocks are stored contiguously, so the scalar view is the concatenation of all blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseVectorBlocked<T, const B: usize> {
    values: Buffer<T>,
}

impl<T: Real, const B: usize> Default for DenseVectorBlocked<T, B> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<T: Real, const B: usize> DenseVectorBlocked<T, B> {
    /// A zero vector of `blocks` blocks.
    pub fn new(blocks: usize) -> Self {
        Self::new_in(&MemoryArena::default(), blocks)
    }

    pub fn new_in(arena: &MemoryArena, blocks: usize) -> Self {
        assert!(B > 0, "Block size must be positive");
        Self {
            values: arena.allocate(blocks * B),
        }
    }

    pub fn filled(blocks: usize, value: T) -> Self {
        Self {
            values: MemoryArena::default().allocate_filled(blocks * B, value),
        }
    }

    /// Builds a blocked vector from its scalar entries.
    pub fn from_scalars(values: Vec<T>) -> Result<Self> {
        Self::from_scalars_in(&MemoryArena::default(), values)
    }

    pub fn from_scalars_in(arena: &MemoryArena, values: Vec<T>) -> Result<Self> {
        if values.len() % B != 0 {
            return Err(LafemError::dimension_mismatch(
                "DenseVectorBlocked::from_scalars",
                (values.len() / B + 1) * B,
                values.len(),
            ));
        }
        Ok(Self {
            values: arena.adopt(values),
        })
    }

    pub fn from_blocks(blocks: &[SVector<T, B>]) -> Self {
        let values = blocks.iter().flat_map(|block| block.iter().copied()).collect();
        Self {
            values: MemoryArena::default().adopt(values),
        }
    }

    /// Reinterprets a scalar vector as a blocked vector without copying.
    pub fn from_dense(v: DenseVector<T>) -> Result<Self> {
        check_dims("DenseVectorBlocked::from_dense", v.size() / B * B, v.size())?;
        Ok(Self {
            values: v.buffer().clone(),
        })
    }

    /// The scalar view of the vector, sharing storage copy-on-write.
    pub fn to_dense(&self) -> DenseVector<T> {
        DenseVector::from_buffer(self.values.clone())
    }

    pub fn buffer(&self) -> &Buffer<T> {
        &self.values
    }

    pub fn used_elements(&self) -> usize {
        self.size()
    }

    pub fn get(&self, block: usize) -> Option<SVector<T, B>> {
        let slice = self.values.as_slice().get(block * B..(block + 1) * B)?;
        Some(SVector::from_column_slice(slice))
    }

    pub fn set(&mut self, block: usize, value: &SVector<T, B>) -> Result<()> {
        let size = self.size();
        if block >= size {
            return Err(LafemError::IndexOutOfBounds { index: block, size });
        }
        self.values.as_mut_slice()[block * B..(block + 1) * B].copy_from_slice(value.as_slice());
        Ok(())
    }

    pub fn blocks(&self) -> impl '_ + Iterator<Item = SVector<T, B>> {
        self.values
            .as_slice()
            .chunks_exact(B)
            .map(SVector::from_column_slice)
    }
}

impl<T: Real, const B: usize> LocalVector<T> for DenseVectorBlocked<T, B> {
    fn size(&self) -> usize {
        self.values.len() / B
    }

    fn block_size(&self) -> usize {
        B
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
