//! Strategies for property-based testing of containers.
use crate::matrix::{SparseMatrixCoo, SparseMatrixCsr};
use crate::permutation::Permutation;
use crate::vector::DenseVector;
use ::proptest::collection::vec;
use ::proptest::prelude::*;
use std::ops::Range;

/// Scalars in a moderate range, so that sums over a few hundred entries stay well-conditioned.
pub fn scalar() -> impl Strategy<Value = f64> {
    -10.0..10.0
}

pub fn dense_vector(len: usize) -> impl Strategy<Value = DenseVector<f64>> {
    vec(scalar(), len).prop_map(DenseVector::from_vec)
}

/// CSR matrices of the given shape with up to `max_entries` random entries. Duplicate
/// coordinates are summed.
pub fn csr_matrix(rows: usize, columns: usize, max_entries: usize) -> impl Strategy<Value = SparseMatrixCsr<f64>> {
    // Empty matrices have no valid coordinates
    let entries = if rows == 0 || columns == 0 { 0 } else { max_entries };
    vec((0..rows.max(1), 0..columns.max(1), scalar()), 0..=entries).prop_map(move |triplets| {
        let row_idx: Vec<_> = triplets.iter().map(|t| t.0).collect();
        let col_idx: Vec<_> = triplets.iter().map(|t| t.1).collect();
        let values: Vec<_> = triplets.iter().map(|t| t.2).collect();
        SparseMatrixCoo::from_triplets(rows, columns, &row_idx, &col_idx, &values)
            .expect("Triplets are generated within bounds")
            .to_csr()
    })
}

/// Square CSR matrices with a dimension in `dims`.
pub fn square_csr_matrix(dims: Range<usize>, max_entries: usize) -> impl Strategy<Value = SparseMatrixCsr<f64>> {
    dims.prop_flat_map(move |n| csr_matrix(n, n, max_entries))
}

pub fn permutation(n: usize) -> impl Strategy<Value = Permutation> {
    Just((0..n).collect::<Vec<_>>())
        .prop_shuffle()
        .prop_map(|perm| Permutation::from_perm(perm).expect("A shuffled range is a valid permutation"))
}
