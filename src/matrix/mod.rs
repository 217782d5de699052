//! Dense and sparse matrix formats.
//!
//! CSR is the hub format: every sparse format converts to and from it. All formats implement
//! [`LinearOperator`](crate::container::LinearOperator).
mod banded;
mod bcsr;
mod coo;
mod csr;
mod dense;
mod ell;

pub use banded::SparseMatrixBanded;
pub use bcsr::SparseMatrixBcsr;
pub use coo::SparseMatrixCoo;
pub use csr::SparseMatrixCsr;
pub use dense::DenseMatrix;
pub use ell::SparseMatrixEll;
