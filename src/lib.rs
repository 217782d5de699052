//! Sparse and dense linear algebra containers for finite element solvers.
//!
//! The crate is organized in layers:
//!
//! * [`memory`] and [`layout`]: explicit memory arenas and shared sparsity layouts,
//! * [`vector`] and [`matrix`]: containers built on top of the raw kernels in [`lafem_arch`],
//! * [`filter`], [`permutation`] and [`mirror`]: operations on containers,
//! * [`global`]: vectors distributed over several ranks, synchronized through gates,
//! * [`io`] and [`checkpoint`]: file formats and in-memory serialization.

pub mod checkpoint;
pub mod container;
pub mod error;
pub mod filter;
pub mod global;
pub mod io;
pub mod layout;
pub mod matrix;
pub mod memory;
pub mod mirror;
pub mod permutation;
pub mod vector;

#[cfg(feature = "proptest")]
pub mod proptest;

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;

pub use container::{CloneMode, LinearOperator, LocalVector, Operand};
pub use error::{LafemError, Result};
pub use lafem_arch::{Backend, Real};
pub use memory::MemoryArena;
