//! Vector containers.
mod dense;
mod dense_blocked;
mod sparse;

pub use dense::DenseVector;
pub use dense_blocked::DenseVectorBlocked;
pub use sparse::{SparseVector, SparseVectorBlocked};
