use lafem::vector::{DenseVector, DenseVectorBlocked, SparseVector, SparseVectorBlocked};
use lafem::{LafemError, LocalVector, Operand};
use nalgebra::{DVector, Vector2};
use proptest::prelude::*;
use util::assert_slices_approx_eq;

#[test]
fn axpy_aliasing_configurations() {
    let x = DenseVector::from_vec(vec![1.0, 2.0, 3.0]);
    let y = DenseVector::from_vec(vec![10.0, 20.0, 30.0]);

    let mut r = DenseVector::new(3);
    r.axpy(Operand::Other(&x), Operand::Other(&y), 2.0).unwrap();
    assert_eq!(r.as_slice(), &[12.0, 24.0, 36.0]);

    let mut r = x.clone();
    r.axpy(Operand::This, Operand::Other(&y), 2.0).unwrap();
    assert_eq!(r.as_slice(), &[12.0, 24.0, 36.0]);

    let mut r = y.clone();
    r.axpy(Operand::Other(&x), Operand::This, 2.0).unwrap();
    assert_eq!(r.as_slice(), &[12.0, 24.0, 36.0]);

    let mut r = x.clone();
    r.axpy(Operand::This, Operand::This, 1.0).unwrap();
    assert_eq!(r.as_slice(), &[2.0, 4.0, 6.0]);
}

#[test]
fn mismatched_sizes_are_reported() {
    let x = DenseVector::<f64>::new(3);
    let mut r = DenseVector::<f64>::new(4);
    let err = r.axpy(Operand::Other(&x), Operand::This, 1.0).unwrap_err();
    assert!(matches!(
        err,
        LafemError::DimensionMismatch {
            expected: 4,
            actual: 3,
            ..
        }
    ));
    assert!(x.dot(&r).is_err());
}

#[test]
fn reductions_agree_with_nalgebra() {
    let values: Vec<f64> = vec![3.0, -4.0, 0.5, -0.25];
    let v = DenseVector::from_vec(values.clone());
    let reference = DVector::from_vec(values);

    assert_eq!(v.norm2sqr(), reference.norm_squared());
    assert!((v.norm2() - reference.norm()).abs() <= 1e-14);
    assert_eq!(v.max_element(), 3.0);
    assert_eq!(v.min_element(), -4.0);
    assert_eq!(v.max_abs_element(), 4.0);
    assert_eq!(v.min_abs_element(), 0.25);
    assert_eq!(v.max_abs_index(), Some(1));
    assert_eq!(v.min_index(), Some(1));
    assert_eq!(v.to_nalgebra(), reference);

    let empty = DenseVector::<f64>::new(0);
    assert_eq!(empty.max_index(), None);
    assert_eq!(empty.norm2(), 0.0);
}

#[test]
fn component_operations() {
    let x = DenseVector::from_vec(vec![1.0, 2.0, 4.0]);
    let y = DenseVector::from_vec(vec![3.0, 3.0, 3.0]);

    let mut r = DenseVector::new(3);
    r.component_product(Operand::Other(&x), Operand::Other(&y)).unwrap();
    assert_eq!(r.as_slice(), &[3.0, 6.0, 12.0]);

    r.component_invert(Operand::Other(&x), 2.0).unwrap();
    assert_eq!(r.as_slice(), &[2.0, 1.0, 0.5]);

    r.difference(Operand::This, Operand::Other(&y)).unwrap();
    assert_eq!(r.as_slice(), &[-1.0, -2.0, -2.5]);

    r.scale(Operand::This, -2.0).unwrap();
    assert_eq!(r.as_slice(), &[2.0, 4.0, 5.0]);
    assert_eq!(r.triple_dot(&x, &y).unwrap(), 3.0 * (2.0 + 8.0 + 20.0));
}

#[test]
fn blocked_vectors_expose_blocks_and_scalars() {
    let mut v = DenseVectorBlocked::<f64, 2>::from_scalars(vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    assert_eq!(v.size(), 2);
    assert_eq!(v.scalar_size(), 4);
    assert_eq!(v.get(1), Some(Vector2::new(3.0, 4.0)));
    assert_eq!(v.get(2), None);

    v.set(0, &Vector2::new(-1.0, -2.0)).unwrap();
    assert_eq!(v.to_dense().as_slice(), &[-1.0, -2.0, 3.0, 4.0]);
    assert!(v.set(2, &Vector2::zeros()).is_err());
    assert_eq!(v.norm2sqr(), 1.0 + 4.0 + 9.0 + 16.0);

    assert!(DenseVectorBlocked::<f64, 2>::from_scalars(vec![1.0; 3]).is_err());
}

#[test]
fn sparse_vector_insertion_keeps_indices_sorted() {
    let mut v = SparseVector::new(10);
    v.set(7, 1.0).unwrap();
    v.set(2, 2.0).unwrap();
    v.set(5, 3.0).unwrap();
    v.set(2, 4.0).unwrap();

    assert_eq!(v.indices(), &[2, 5, 7]);
    assert_eq!(v.elements(), &[4.0, 3.0, 1.0]);
    assert_eq!(v.used_elements(), 3);
    assert_eq!(v.get(3), Some(0.0));
    assert_eq!(v.get(10), None);
    assert!(matches!(
        v.set(10, 1.0),
        Err(LafemError::IndexOutOfBounds { index: 10, size: 10 })
    ));

    let dense = v.to_dense();
    assert_eq!(dense.as_slice(), &[0.0, 0.0, 4.0, 0.0, 0.0, 3.0, 0.0, 1.0, 0.0, 0.0]);
    assert_eq!(SparseVector::from_dense(&dense), v);
}

#[test]
fn sparse_vector_storage_grows_in_chunks() {
    let mut v = SparseVector::new(5000);
    for i in (0..1500).rev() {
        v.set(3 * i, i as f64).unwrap();
    }
    assert_eq!(v.used_elements(), 1500);
    assert_eq!(v.allocated_elements(), 2000);
    assert!(v.indices().windows(2).all(|w| w[0] < w[1]));
    assert_eq!(v.get(3 * 1499), Some(1499.0));

    let mut small = SparseVector::new(3);
    small.set(0, 1.0).unwrap();
    assert_eq!(small.allocated_elements(), 3);
}

#[test]
fn blocked_sparse_vectors() {
    let mut v = SparseVectorBlocked::<f64, 2>::new(4);
    v.set(3, &Vector2::new(1.0, 2.0)).unwrap();
    v.set(1, &Vector2::new(3.0, 4.0)).unwrap();
    assert_eq!(v.indices(), &[1, 3]);
    assert_eq!(v.elements(), &[3.0, 4.0, 1.0, 2.0]);
    assert_eq!(v.get(0), Some(Vector2::zeros()));

    let dense = v.to_dense();
    assert_eq!(dense.to_dense().as_slice(), &[0.0, 0.0, 3.0, 4.0, 0.0, 0.0, 1.0, 2.0]);
    assert_eq!(SparseVectorBlocked::from_dense(&dense), v);
}

fn vector_pair(len: usize) -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    (
        proptest::collection::vec(-10.0..10.0, len),
        proptest::collection::vec(-10.0..10.0, len),
    )
}

proptest! {
    #[test]
    fn axpy_aliasing_agrees_with_disjoint_evaluation(
        (x, y) in (0..50usize).prop_flat_map(vector_pair),
        alpha in -5.0..5.0f64
    ) {
        let x = DenseVector::from_vec(x);
        let y = DenseVector::from_vec(y);

        let mut disjoint = DenseVector::new(x.size());
        disjoint.axpy(Operand::Other(&x), Operand::Other(&y), alpha).unwrap();

        let mut alias_x = x.clone();
        alias_x.axpy(Operand::This, Operand::Other(&y), alpha).unwrap();

        let mut alias_y = y.clone();
        alias_y.axpy(Operand::Other(&x), Operand::This, alpha).unwrap();

        assert_slices_approx_eq!(disjoint.as_slice(), alias_x.as_slice(), abstol = 1e-12);
        assert_slices_approx_eq!(disjoint.as_slice(), alias_y.as_slice(), abstol = 1e-12);
    }
}
