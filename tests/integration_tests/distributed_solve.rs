//! A 1D Poisson problem on nine nodes, split over two ranks that share the middle node.
use super::run_ranks;
use lafem::filter::UnitFilter;
use lafem::global::{Comm, Gate, GlobalVector};
use lafem::matrix::{SparseMatrixCoo, SparseMatrixCsr};
use lafem::mirror::VectorMirror;
use lafem::vector::DenseVector;
use lafem::{LinearOperator, LocalVector, Operand};
use matrixcompare::assert_scalar_eq;
use std::sync::Arc;
use util::assert_slices_approx_eq;

const LOCAL_NODES: usize = 5;

/// Assembles the stiffness matrix of the four linear elements of one subdomain. Entries of the
/// shared node only contain the local contribution.
fn local_laplacian() -> SparseMatrixCsr<f64> {
    let mut rows = Vec::new();
    let mut cols = Vec::new();
    let mut values = Vec::new();
    for e in 0..LOCAL_NODES - 1 {
        for (i, j, v) in [(e, e, 1.0), (e, e + 1, -1.0), (e + 1, e, -1.0), (e + 1, e + 1, 1.0)] {
            rows.push(i);
            cols.push(j);
            values.push(v);
        }
    }
    SparseMatrixCoo::from_triplets(LOCAL_NODES, LOCAL_NODES, &rows, &cols, &values)
        .unwrap()
        .to_csr()
}

fn subdomain_gate(comm: Arc<dyn Comm>) -> Gate<f64, DenseVector<f64>> {
    let rank = comm.rank();
    let mut gate = Gate::new(comm);
    let shared = if rank == 0 { LOCAL_NODES - 1 } else { 0 };
    gate.push(1 - rank, VectorMirror::new(LOCAL_NODES, vec![shared]).unwrap())
        .unwrap();
    gate.compile(&DenseVector::new(LOCAL_NODES)).unwrap();
    gate
}

/// Solves `-u'' = 0` with `u(0) = 0` and `u(1) = 1` by a Jacobi-preconditioned Richardson
/// iteration and returns the local solution together with the global norm of the final defect.
fn solve(comm: Arc<dyn Comm>, iterations: usize) -> (Vec<f64>, f64, f64) {
    let rank = comm.rank();
    let gate = subdomain_gate(comm);

    let mut filter = UnitFilter::new(LOCAL_NODES);
    if rank == 0 {
        filter.add(0, 0.0).unwrap();
    } else {
        filter.add(LOCAL_NODES - 1, 1.0).unwrap();
    }

    let mut matrix = local_laplacian();
    filter.filter_mat(&mut matrix).unwrap();

    let mut inv_diag = GlobalVector::new(Some(&gate), matrix.diagonal());
    inv_diag.sync_0().unwrap();
    inv_diag.component_invert(Operand::This, 1.0).unwrap();

    let mut rhs = DenseVector::new(LOCAL_NODES);
    filter.filter_rhs(&mut rhs).unwrap();
    let mut x = GlobalVector::new(Some(&gate), DenseVector::new(LOCAL_NODES));
    filter.filter_sol(x.local_mut()).unwrap();

    let mut defect = GlobalVector::new(Some(&gate), DenseVector::new(LOCAL_NODES));
    let mut correction = defect.clone();
    for _ in 0..iterations {
        matrix
            .apply_defect(defect.local_mut(), &rhs, x.local())
            .unwrap();
        defect.sync_0().unwrap();
        filter.filter_def(defect.local_mut()).unwrap();
        correction
            .component_product(Operand::Other(&defect), Operand::Other(&inv_diag))
            .unwrap();
        x.axpy(Operand::Other(&correction), Operand::This, 1.0)
            .unwrap();
    }

    matrix
        .apply_defect(defect.local_mut(), &rhs, x.local())
        .unwrap();
    defect.sync_0().unwrap();
    filter.filter_def(defect.local_mut()).unwrap();
    let defect_norm = defect.norm2().unwrap();
    let solution_norm = x.norm2().unwrap();
    (x.into_local().to_vec(), solution_norm, defect_norm)
}

#[test]
fn jacobi_richardson_converges_to_linear_solution() {
    let results = run_ranks(2, |comm| solve(comm, 500));

    for (rank, (local, _, defect_norm)) in results.iter().enumerate() {
        let expected: Vec<f64> = (0..LOCAL_NODES)
            .map(|i| (4 * rank + i) as f64 / 8.0)
            .collect();
        assert_slices_approx_eq!(local, expected, abstol = 1e-10);
        assert!(*defect_norm < 1e-10);
    }

    // The shared node holds the same value on both ranks
    assert_eq!(results[0].0[LOCAL_NODES - 1], results[1].0[0]);

    // sum of (i / 8)^2 for i = 0..=8
    let expected_norm = (204.0f64 / 64.0).sqrt();
    assert_scalar_eq!(results[0].1, expected_norm, comp = abs, tol = 1e-10);
    assert_eq!(results[0].1.to_bits(), results[1].1.to_bits());
}

#[test]
fn global_defect_of_initial_guess() {
    // With x = filtered zero vector, only the node next to u(1) = 1 sees a defect of 1
    let results = run_ranks(2, |comm| solve(comm, 0));
    for (_, _, defect_norm) in &results {
        assert_scalar_eq!(*defect_norm, 1.0, comp = abs, tol = 1e-14);
    }
}
