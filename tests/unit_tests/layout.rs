use lafem::layout::{ell_stride, LayoutKind, SparseLayout};
use lafem::matrix::SparseMatrixCsr;
use lafem::{CloneMode, LafemError, LinearOperator};
use lafem::vector::DenseVector;

fn tridiagonal_layout() -> SparseLayout {
    SparseLayout::csr(3, 3, vec![0, 2, 5, 7], vec![0, 1, 0, 1, 2, 1, 2]).unwrap()
}

#[test]
fn matrices_share_one_layout() {
    let layout = tridiagonal_layout();
    let a = SparseMatrixCsr::from_layout(layout.clone(), vec![2.0, -1.0, -1.0, 2.0, -1.0, -1.0, 2.0]).unwrap();
    let mut b = a.clone_layout_with_values(vec![1.0; 7]).unwrap();
    assert!(a.layout().shares_indices_with(b.layout()));
    assert_eq!(layout.strong_count(), 3);

    b.values_mut()[0] = 100.0;
    assert_eq!(a.values()[0], 2.0);

    drop(b);
    drop(layout);
    assert_eq!(a.layout().strong_count(), 1);
    let x = DenseVector::filled(3, 1.0);
    let mut r = DenseVector::new(3);
    a.apply(&mut r, &x).unwrap();
    assert_eq!(r.as_slice(), &[1.0, 0.0, 1.0]);
}

#[test]
fn clone_modes_control_layout_sharing() {
    let a = SparseMatrixCsr::from_layout(tridiagonal_layout(), vec![1.0; 7]).unwrap();
    let shallow = a.clone_with(CloneMode::Shallow);
    let deep = a.clone_with(CloneMode::Deep);
    assert!(shallow.layout().shares_indices_with(a.layout()));
    assert!(!deep.layout().shares_indices_with(a.layout()));
    assert_eq!(deep.layout(), a.layout());
}

#[test]
fn invalid_csr_layouts_are_rejected() {
    let decreasing = SparseLayout::csr(2, 2, vec![0, 2, 1], vec![0, 1]);
    assert!(decreasing.is_err() || decreasing.unwrap().validate().is_err());

    let layout = SparseLayout::csr(2, 2, vec![0, 1, 2], vec![0, 5]);
    let err = layout.and_then(|l| l.validate()).unwrap_err();
    assert!(matches!(err, LafemError::InvalidLayout(_)));
}

#[test]
fn used_entries_per_kind() {
    let layout = tridiagonal_layout();
    assert_eq!(layout.kind(), LayoutKind::Csr);
    assert_eq!(layout.used_entries(), 7);

    let banded = SparseLayout::banded(3, 3, vec![1, 2, 3]).unwrap();
    assert_eq!(banded.used_entries(), 3);
}

#[test]
fn ell_stride_is_aligned() {
    assert_eq!(ell_stride(0), 0);
    assert_eq!(ell_stride(1), 32);
    assert_eq!(ell_stride(32), 32);
    assert_eq!(ell_stride(33), 64);
}
