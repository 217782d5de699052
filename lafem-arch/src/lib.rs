//! Numerical kernels operating on raw buffers.
//!
//! Every kernel takes slices plus the extents it needs and has no knowledge of the containers
//! built on top of it. Extents are assumed to be validated by the caller; kernels only
//! `debug_assert!` them.
//!
//! Each kernel is dispatched on a [`Backend`]. The [`Backend::Generic`] path is the reference
//! implementation and is always available. [`Backend::Parallel`] runs on the rayon thread pool
//! where a data-parallel formulation exists and falls back to the generic path otherwise.
//! Elementwise kernels produce bit-identical results on both backends, reductions agree up to
//! rounding.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod blas1;
pub mod diagonal;
pub mod lumping;
pub mod mirror;
pub mod product_matvec;
pub mod reduce;
pub mod scale_row_col;
pub mod transpose;
pub mod unit_filter;

pub use lafem_traits::Real;

/// Minimum number of items handed to a single rayon task.
const PARALLEL_MIN_LEN: usize = 512;

/// The implementation a kernel call is dispatched to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Backend {
    /// Sequential reference implementation.
    #[default]
    Generic,
    /// Data-parallel implementation on the rayon thread pool.
    Parallel,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Backend::Generic => write!(f, "generic"),
            Backend::Parallel => write!(f, "parallel"),
        }
    }
}

/// Operands of a binary elementwise kernel `r = op(x, y)`.
///
/// A buffer cannot be borrowed mutably and immutably at the same time, so the cases where the
/// output coincides with an input are spelled out. Kernels evaluate each case with its own
/// operation order, which matters for rounding.
#[derive(Debug)]
pub enum BinaryOperands<'a, T> {
    /// `r` is distinct from both inputs.
    Disjoint { r: &'a mut [T], x: &'a [T], y: &'a [T] },
    /// `r` is `x`.
    AliasX { r: &'a mut [T], y: &'a [T] },
    /// `r` is `y`.
    AliasY { r: &'a mut [T], x: &'a [T] },
    /// `r`, `x` and `y` are the same buffer.
    AliasBoth { r: &'a mut [T] },
}

impl<'a, T> BinaryOperands<'a, T> {
    pub fn len(&self) -> usize {
        match self {
            Self::Disjoint { r, .. } | Self::AliasX { r, .. } | Self::AliasY { r, .. } | Self::AliasBoth { r } => {
                r.len()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Operands of a unary elementwise kernel `r = op(x)`.
#[derive(Debug)]
pub enum UnaryOperands<'a, T> {
    Disjoint { r: &'a mut [T], x: &'a [T] },
    InPlace { r: &'a mut [T] },
}

/// Runs `f(i, &mut r[i])` for every entry, sequentially or on the thread pool.
pub(crate) fn for_each_entry<T, F>(backend: Backend, r: &mut [T], f: F)
where
    T: Send,
    F: Fn(usize, &mut T) + Sync + Send,
{
    match backend {
        Backend::Generic => r.iter_mut().enumerate().for_each(|(i, r_i)| f(i, r_i)),
        Backend::Parallel => r
            .par_iter_mut()
            .with_min_len(PARALLEL_MIN_LEN)
            .enumerate()
            .for_each(|(i, r_i)| f(i, r_i)),
    }
}

/// Runs `f(block_index, block)` for every contiguous block of `block_size` entries.
pub(crate) fn for_each_block<T, F>(backend: Backend, r: &mut [T], block_size: usize, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync + Send,
{
    debug_assert!(block_size > 0);
    debug_assert_eq!(r.len() % block_size, 0);
    match backend {
        Backend::Generic => r
            .chunks_exact_mut(block_size)
            .enumerate()
            .for_each(|(i, block)| f(i, block)),
        Backend::Parallel => r
            .par_chunks_exact_mut(block_size)
            .with_min_len(PARALLEL_MIN_LEN / block_size.max(1) + 1)
            .enumerate()
            .for_each(|(i, block)| f(i, block)),
    }
}
