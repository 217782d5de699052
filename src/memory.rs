//! Memory arenas and the buffers they hand out.
//!
//! A [`MemoryArena`] is an explicit allocation context tied to a kernel [`Backend`]. Containers
//! are constructed in an arena and every value buffer remembers the arena it came from. Data is
//! never moved between arenas implicitly: [`MemoryArena::upload`], [`MemoryArena::download`] and
//! [`MemoryArena::transfer`] are the only ways across.
//!
//! [`Buffer`] is copy-on-write: cloning a buffer shares the allocation, and the first mutable
//! access to a shared allocation copies it.
use crate::error::{LafemError, Result};
use bytemuck::Pod;
use lafem_arch::Backend;
use log::trace;
use std::fmt;
use std::mem::size_of;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct ArenaCounters {
    live_bytes: AtomicUsize,
    peak_bytes: AtomicUsize,
    allocations: AtomicUsize,
    releases: AtomicUsize,
}

#[derive(Debug)]
struct ArenaInner {
    backend: Backend,
    counters: ArenaCounters,
}

impl ArenaInner {
    fn register(&self, bytes: usize) {
        let live = self.counters.live_bytes.fetch_add(bytes, Ordering::Relaxed) + bytes;
        self.counters.peak_bytes.fetch_max(live, Ordering::Relaxed);
        self.counters.allocations.fetch_add(1, Ordering::Relaxed);
    }

    fn release(&self, bytes: usize) {
        self.counters.live_bytes.fetch_sub(bytes, Ordering::Relaxed);
        self.counters.releases.fetch_add(1, Ordering::Relaxed);
    }
}

/// Snapshot of the allocation counters of an arena.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct ArenaStatistics {
    pub live_bytes: usize,
    pub peak_bytes: usize,
    pub allocations: usize,
    pub releases: usize,
}

/// An allocation context for container storage.
///
/// Cloning the arena yields another handle to the same context.
#[derive(Clone)]
pub struct MemoryArena {
    inner: Arc<ArenaInner>,
}

impl fmt::Debug for MemoryArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryArena")
            .field("backend", &self.inner.backend)
            .field("stats", &self.stats())
            .finish()
    }
}

impl Default for MemoryArena {
    fn default() -> Self {
        Self::new(Backend::Generic)
    }
}

impl MemoryArena {
    pub fn new(backend: Backend) -> Self {
        Self {
            inner: Arc::new(ArenaInner {
                backend,
                counters: ArenaCounters::default(),
            }),
        }
    }

    pub fn backend(&self) -> Backend {
        self.inner.backend
    }

    /// Whether both handles refer to the same arena.
    pub fn same_arena(&self, other: &MemoryArena) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn stats(&self) -> ArenaStatistics {
        let counters = &self.inner.counters;
        ArenaStatistics {
            live_bytes: counters.live_bytes.load(Ordering::Relaxed),
            peak_bytes: counters.peak_bytes.load(Ordering::Relaxed),
            allocations: counters.allocations.load(Ordering::Relaxed),
            releases: counters.releases.load(Ordering::Relaxed),
        }
    }

    /// Allocates a zero-initialized buffer.
    pub fn allocate<T: Pod>(&self, len: usize) -> Buffer<T> {
        self.adopt(vec![T::zeroed(); len])
    }

    pub fn allocate_filled<T: Pod>(&self, len: usize, value: T) -> Buffer<T> {
        self.adopt(vec![value; len])
    }

    /// Copies host data into a new buffer in this arena.
    pub fn upload<T: Pod>(&self, host: &[T]) -> Buffer<T> {
        self.adopt(host.to_vec())
    }

    /// Takes ownership of host data without copying.
    pub fn adopt<T: Pod>(&self, data: Vec<T>) -> Buffer<T> {
        trace!(
            "{} arena: allocating {} elements of {} bytes",
            self.backend(),
            data.len(),
            size_of::<T>()
        );
        Buffer {
            allocation: Arc::new(Allocation::new(data, Arc::clone(&self.inner))),
        }
    }

    /// Copies the contents of `buffer` into host memory.
    pub fn download<T: Pod>(&self, buffer: &Buffer<T>, host: &mut [T]) -> Result<()> {
        self.check_owner(buffer)?;
        crate::error::check_dims("download", buffer.len(), host.len())?;
        host.copy_from_slice(buffer.as_slice());
        Ok(())
    }

    /// Copies `src` into `dst`. Both buffers must have the same length and live on this arena's
    /// backend.
    pub fn copy<T: Pod>(&self, dst: &mut Buffer<T>, src: &Buffer<T>) -> Result<()> {
        self.check_owner(dst)?;
        self.check_owner(src)?;
        crate::error::check_dims("copy", dst.len(), src.len())?;
        dst.as_mut_slice().copy_from_slice(src.as_slice());
        Ok(())
    }

    /// Sets every element of `buffer` to `value`.
    pub fn set<T: Pod>(&self, buffer: &mut Buffer<T>, value: T) {
        buffer.as_mut_slice().fill(value);
    }

    pub fn get_element<T: Pod>(&self, buffer: &Buffer<T>, index: usize) -> Result<T> {
        buffer
            .as_slice()
            .get(index)
            .copied()
            .ok_or(LafemError::IndexOutOfBounds {
                index,
                size: buffer.len(),
            })
    }

    pub fn set_element<T: Pod>(&self, buffer: &mut Buffer<T>, index: usize, value: T) -> Result<()> {
        let size = buffer.len();
        let element = buffer
            .as_mut_slice()
            .get_mut(index)
            .ok_or(LafemError::IndexOutOfBounds { index, size })?;
        *element = value;
        Ok(())
    }

    /// Explicitly copies a buffer, possibly owned by another arena, into this arena.
    pub fn transfer<T: Pod>(&self, buffer: &Buffer<T>) -> Buffer<T> {
        self.upload(buffer.as_slice())
    }

    fn check_owner<T>(&self, buffer: &Buffer<T>) -> Result<()> {
        let backend = buffer.backend();
        if backend == self.backend() {
            Ok(())
        } else {
            Err(LafemError::BackendMismatch {
                left: self.backend(),
                right: backend,
            })
        }
    }
}

struct Allocation<T> {
    data: Vec<T>,
    arena: Arc<ArenaInner>,
}

impl<T> Allocation<T> {
    fn new(data: Vec<T>, arena: Arc<ArenaInner>) -> Self {
        arena.register(data.len() * size_of::<T>());
        Self { data, arena }
    }
}

impl<T: Clone> Clone for Allocation<T> {
    fn clone(&self) -> Self {
        Self::new(self.data.clone(), Arc::clone(&self.arena))
    }
}

impl<T> Drop for Allocation<T> {
    fn drop(&mut self) {
        self.arena.release(self.data.len() * size_of::<T>());
    }
}

/// A fixed-length, copy-on-write value buffer owned by a [`MemoryArena`].
#[derive(Clone)]
pub struct Buffer<T> {
    allocation: Arc<Allocation<T>>,
}

impl<T: fmt::Debug> fmt::Debug for Buffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.allocation.data.iter()).finish()
    }
}

impl<T: PartialEq> PartialEq for Buffer<T> {
    fn eq(&self, other: &Self) -> bool {
        self.allocation.data == other.allocation.data
    }
}

impl<T> Buffer<T> {
    pub fn len(&self) -> usize {
        self.allocation.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_slice(&self) -> &[T] {
        &self.allocation.data
    }

    pub fn backend(&self) -> Backend {
        self.allocation.arena.backend
    }

    pub fn arena(&self) -> MemoryArena {
        MemoryArena {
            inner: Arc::clone(&self.allocation.arena),
        }
    }

    /// Whether another buffer currently shares this allocation.
    pub fn is_shared(&self) -> bool {
        Arc::strong_count(&self.allocation) > 1
    }

    pub fn shares_storage_with(&self, other: &Buffer<T>) -> bool {
        Arc::ptr_eq(&self.allocation, &other.allocation)
    }
}

impl<T: Clone> Buffer<T> {
    /// Mutable access. Copies the allocation first if it is shared.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut Arc::make_mut(&mut self.allocation).data
    }

    /// Duplicates the storage within the same arena.
    pub fn deep_clone(&self) -> Self {
        Self {
            allocation: Arc::new((*self.allocation).clone()),
        }
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.allocation.data.clone()
    }
}
