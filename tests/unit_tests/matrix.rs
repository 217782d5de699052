use lafem::matrix::{
    DenseMatrix, SparseMatrixBanded, SparseMatrixBcsr, SparseMatrixCoo, SparseMatrixCsr, SparseMatrixEll,
};
use lafem::proptest::{dense_vector, square_csr_matrix};
use lafem::{Backend, MemoryArena};
use lafem::vector::DenseVector;
use lafem::{LinearOperator, Operand};
use matrixcompare::assert_matrix_eq;
use nalgebra::{DMatrix, DVector, Matrix2};
use nalgebra_sparse::CsrMatrix;
use proptest::prelude::*;
use util::{assert_slices_approx_eq, tridiagonal};

fn tridiagonal_csr() -> SparseMatrixCsr<f64> {
    DenseMatrix::from_row_slice(3, 3, &tridiagonal(3, 2.0, -1.0))
        .unwrap()
        .to_csr()
}

fn product<A: LinearOperator<f64>>(a: &A, x: &[f64]) -> Vec<f64> {
    let x = DenseVector::from_slice(x);
    let mut r = DenseVector::new(a.rows());
    a.apply(&mut r, &x).unwrap();
    r.to_vec()
}

#[test]
fn tridiagonal_product_in_every_format() {
    let csr = tridiagonal_csr();
    let ones = [1.0; 3];
    let expected = vec![1.0, 0.0, 1.0];

    assert_eq!(product(&csr, &ones), expected);
    assert_eq!(product(&csr.to_coo(), &ones), expected);
    assert_eq!(product(&csr.to_ell(), &ones), expected);
    assert_eq!(product(&csr.to_banded(), &ones), expected);
    assert_eq!(product(&csr.to_dense(), &ones), expected);
    assert_eq!(product(&csr.transpose(), &ones), expected);
}

#[test]
fn csr_agrees_with_nalgebra_sparse() {
    let dense = DMatrix::from_row_slice(3, 4, &[1.0, 0.0, 2.0, 0.0, 0.0, 0.0, 0.0, 3.0, 4.0, 5.0, 0.0, 6.0]);
    let reference = CsrMatrix::from(&dense);
    let csr = SparseMatrixCsr::from(&reference);
    assert_eq!(csr.used_elements(), 6);

    let x = [1.0, -2.0, 0.5, 4.0];
    let expected = &reference * DVector::from_column_slice(&x);
    assert_eq!(product(&csr, &x), expected.as_slice());

    let back = csr.to_nalgebra().unwrap();
    assert_matrix_eq!(back, reference);
    assert_matrix_eq!(csr.to_dense().to_nalgebra(), dense);
    assert_matrix_eq!(csr.transpose().to_dense().to_nalgebra(), dense.transpose());
}

#[test]
fn apply_variants() {
    let csr = tridiagonal_csr();
    let x = DenseVector::from_vec(vec![1.0, 2.0, 3.0]);
    let y = DenseVector::from_vec(vec![10.0, 20.0, 30.0]);

    // A x = [0, 0, 4]
    let mut r = DenseVector::new(3);
    csr.apply_axpy(&mut r, &x, Operand::Other(&y), 2.0).unwrap();
    assert_eq!(r.as_slice(), &[10.0, 20.0, 38.0]);

    let mut r = y.clone();
    csr.apply_axpy(&mut r, &x, Operand::This, -1.0).unwrap();
    assert_eq!(r.as_slice(), &[10.0, 20.0, 26.0]);

    let alpha = DenseVector::from_vec(vec![1.0, 1.0, 0.5]);
    let mut r = DenseVector::new(3);
    csr.apply_axpy_vector(&mut r, &x, &y, &alpha).unwrap();
    assert_eq!(r.as_slice(), &[10.0, 20.0, 32.0]);

    let mut r = DenseVector::new(3);
    csr.apply_defect(&mut r, &y, &x).unwrap();
    assert_eq!(r.as_slice(), &[10.0, 20.0, 26.0]);

    let mut wrong = DenseVector::new(2);
    assert!(csr.apply(&mut wrong, &x).is_err());
}

#[test]
fn diagonal_lumping_and_scaling() {
    let mut csr = tridiagonal_csr();
    assert_eq!(csr.diagonal().as_slice(), &[2.0, 2.0, 2.0]);
    assert_eq!(csr.lumping().as_slice(), &[1.0, 0.0, 1.0]);

    let ell = csr.to_ell();
    assert_eq!(ell.diagonal(), csr.diagonal());
    assert_eq!(ell.lumping(), csr.lumping());

    csr.scale_rows(&DenseVector::from_vec(vec![1.0, 2.0, 3.0])).unwrap();
    assert_eq!(csr.get(1, 0), Some(-2.0));
    assert_eq!(csr.get(2, 2), Some(6.0));
    csr.scale_cols(&DenseVector::from_vec(vec![0.5, 1.0, 1.0])).unwrap();
    assert_eq!(csr.get(1, 0), Some(-1.0));
    assert_eq!(csr.get(0, 2), Some(0.0));
    assert_eq!(csr.get(3, 0), None);
}

#[test]
fn coo_triplets_are_sorted_and_summed() {
    let coo = SparseMatrixCoo::from_triplets(3, 3, &[2, 0, 2, 0], &[1, 2, 1, 0], &[1.0, 2.0, 3.0, 4.0]).unwrap();
    assert_eq!(coo.row_idx(), &[0, 0, 2]);
    assert_eq!(coo.col_idx(), &[0, 2, 1]);
    assert_eq!(coo.values(), &[4.0, 2.0, 4.0]);
    assert!(SparseMatrixCoo::from_triplets(2, 2, &[2], &[0], &[1.0]).is_err());

    let mut coo = coo;
    coo.set(1, 1, 5.0).unwrap();
    coo.set(0, 2, -2.0).unwrap();
    assert_eq!(coo.row_idx(), &[0, 0, 1, 2]);
    assert_eq!(coo.get(1, 1), Some(5.0));
    assert_eq!(coo.get(0, 2), Some(-2.0));
    assert_eq!(coo.get(1, 0), Some(0.0));

    let csr = coo.to_csr();
    assert_eq!(csr.row_ptr(), &[0, 2, 3, 4]);
    assert_eq!(csr.to_coo(), coo);
    let mut nalgebra_coo = coo.to_nalgebra().unwrap();
    assert_eq!(nalgebra_coo.nnz(), 4);
    assert_eq!(SparseMatrixCoo::from(&nalgebra_coo), coo);

    nalgebra_coo.push(1, 1, 1.0);
    let merged = SparseMatrixCoo::from(&nalgebra_coo);
    assert_eq!(merged.used_elements(), 4);
    assert_eq!(merged.get(1, 1), Some(6.0));
}

#[test]
fn ell_stores_rows_column_major_with_padding() {
    let csr = tridiagonal_csr();
    let ell = SparseMatrixEll::from_csr(&csr);
    assert_eq!(ell.stride(), 32);
    assert_eq!(ell.row_len(), &[2, 3, 2]);
    assert_eq!(ell.max_row_len(), 3);
    assert_eq!(ell.values().len(), 3 * 32);
    assert_eq!(ell.values()[32 + 1], 2.0);
    assert_eq!(ell.used_elements(), 7);
    assert_eq!(ell.get(2, 1), Some(-1.0));
    assert_eq!(ell.to_csr(), csr);
}

#[test]
fn banded_matrices_from_bands_and_back() {
    let banded = SparseMatrixBanded::from_bands(
        3,
        3,
        &[-1, 0, 1],
        vec![0.0, -1.0, -1.0, 2.0, 2.0, 2.0, -1.0, -1.0, 0.0],
    )
    .unwrap();
    assert_eq!(banded.diagonals(), vec![-1, 0, 1]);
    assert_eq!(banded.offsets(), &[1, 2, 3]);
    assert_eq!(banded.get(1, 0), Some(-1.0));
    assert_eq!(banded.get(0, 2), Some(0.0));
    assert_eq!(banded.to_csr().to_dense(), tridiagonal_csr().to_dense());
    assert_eq!(product(&banded, &[1.0; 3]), vec![1.0, 0.0, 1.0]);

    assert!(SparseMatrixBanded::from_bands(3, 3, &[3], vec![0.0; 3]).is_err());
    assert!(SparseMatrixBanded::<f64>::from_bands(3, 3, &[0], vec![0.0; 2]).is_err());
}

#[test]
fn layout_constructors_place_values_in_the_given_arena() {
    let arena = MemoryArena::new(Backend::Generic);
    let ell = SparseMatrixEll::from_csr(&tridiagonal_csr());
    let ell_in = SparseMatrixEll::from_layout_in(&arena, ell.layout().clone(), ell.values().to_vec()).unwrap();
    assert!(ell_in.arena().same_arena(&arena));
    assert!(ell_in.layout().shares_indices_with(ell.layout()));
    assert_eq!(product(&ell_in, &[1.0; 3]), vec![1.0, 0.0, 1.0]);

    let banded = tridiagonal_csr().to_banded();
    let banded_in =
        SparseMatrixBanded::from_layout_in(&arena, banded.layout().clone(), banded.values().to_vec()).unwrap();
    assert!(banded_in.arena().same_arena(&arena));
    assert!(!banded.arena().same_arena(&arena));
    assert!(SparseMatrixBanded::from_layout_in(&arena, ell.layout().clone(), vec![0.0; 96]).is_err());
}

#[test]
fn bcsr_groups_entries_into_blocks() {
    let dense = DenseMatrix::from_row_slice(4, 4, &tridiagonal(4, 2.0, -1.0)).unwrap();
    let csr = dense.to_csr();
    let bcsr: SparseMatrixBcsr<f64, 2, 2> = csr.to_bcsr().unwrap();
    assert_eq!(bcsr.block_rows(), 2);
    assert_eq!(bcsr.row_ptr(), &[0, 2, 4]);
    assert_eq!(bcsr.get_block(0, 1), Some(Matrix2::new(0.0, 0.0, -1.0, 0.0)));
    assert_eq!(bcsr.get_block(1, 1), Some(Matrix2::new(2.0, -1.0, -1.0, 2.0)));
    assert_eq!(bcsr.get(2, 1), Some(-1.0));
    assert_eq!(bcsr.diagonal().unwrap(), csr.diagonal());
    assert_eq!(bcsr.to_csr().to_dense(), dense);

    let x = [1.0, 2.0, 3.0, 4.0];
    assert_eq!(product(&bcsr, &x), product(&csr, &x));

    let odd = tridiagonal_csr();
    assert!(odd.to_bcsr::<2, 2>().is_err());
}

#[test]
fn dense_matrix_operations() {
    let a = DenseMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    assert_eq!(a.get(1, 2), Some(6.0));
    assert_eq!(a.transpose().to_nalgebra(), a.to_nalgebra().transpose());
    assert_eq!(a.lumping().as_slice(), &[6.0, 15.0]);
    assert_eq!(product(&a, &[1.0, 0.0, -1.0]), vec![-2.0, -2.0]);
    assert_eq!(DenseMatrix::from_nalgebra(&a.to_nalgebra()), a);

    let empty = DenseMatrix::<f64>::new(2, 0);
    assert_eq!(empty.lumping().as_slice(), &[0.0, 0.0]);
}

proptest! {
    #[test]
    fn matvec_agrees_across_formats(
        (csr, x) in square_csr_matrix(0..12, 40).prop_flat_map(|csr| {
            let n = csr.columns();
            (Just(csr), dense_vector(n))
        })
    ) {
        let expected = product(&csr, x.as_slice());
        let reference = csr.to_dense().to_nalgebra() * x.to_nalgebra();
        assert_slices_approx_eq!(expected, reference.as_slice(), abstol = 1e-10);

        assert_slices_approx_eq!(product(&csr.to_coo(), x.as_slice()), expected, abstol = 1e-10);
        assert_slices_approx_eq!(product(&csr.to_ell(), x.as_slice()), expected, abstol = 1e-10);
        assert_slices_approx_eq!(product(&csr.to_banded(), x.as_slice()), expected, abstol = 1e-10);
        assert_slices_approx_eq!(product(&csr.transpose().transpose(), x.as_slice()), expected, abstol = 1e-10);
    }
}
