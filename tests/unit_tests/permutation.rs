use lafem::matrix::{DenseMatrix, SparseMatrixCsr};
use lafem::permutation::{cuthill_mckee, reverse_cuthill_mckee, Permutation};
use lafem::proptest::permutation;
use lafem::LinearOperator;
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn csr_pattern(n: usize, entries: &[usize]) -> SparseMatrixCsr<f64> {
    let values: Vec<f64> = entries.iter().map(|&e| e as f64).collect();
    DenseMatrix::from_row_slice(n, n, &values).unwrap().to_csr()
}

#[test]
fn permutation_of_three_entries() {
    let p = Permutation::from_perm(vec![2, 0, 1]).unwrap();
    let x = [10, 20, 30];

    assert_eq!(p.apply_to_slice(&x).unwrap(), vec![30, 10, 20]);

    let mut y = [0; 3];
    p.apply(&mut y, &x, false).unwrap();
    assert_eq!(y, [30, 10, 20]);

    let mut z = x;
    p.apply_in_place(&mut z, false).unwrap();
    assert_eq!(z, [30, 10, 20]);

    p.apply_in_place(&mut z, true).unwrap();
    assert_eq!(z, x);

    let mut w = [0; 3];
    p.apply(&mut w, &y, true).unwrap();
    assert_eq!(w, x);
    assert_eq!(p.inverse().apply_to_slice(&y).unwrap(), x.to_vec());
}

#[test]
fn invalid_permutations_are_rejected() {
    assert!(Permutation::from_perm(vec![0, 0, 1]).is_err());
    assert!(Permutation::from_perm(vec![0, 3, 1]).is_err());
    assert!(Permutation::from_swap(vec![1, 0]).is_err());
    assert!(Permutation::from_swap(vec![0, 2]).is_err());
    assert!(Permutation::from_perm(vec![1, 0])
        .unwrap()
        .apply_in_place(&mut [1.0, 2.0, 3.0], false)
        .is_err());
}

#[test]
fn blocked_in_place_application_moves_whole_blocks() {
    let p = Permutation::from_perm(vec![1, 2, 0]).unwrap();
    let mut x = [0.0, 0.5, 1.0, 1.5, 2.0, 2.5];
    p.apply_in_place_blocked(&mut x, 2, false).unwrap();
    assert_eq!(x, [1.0, 1.5, 2.0, 2.5, 0.0, 0.5]);
    p.apply_in_place_blocked(&mut x, 2, true).unwrap();
    assert_eq!(x, [0.0, 0.5, 1.0, 1.5, 2.0, 2.5]);
}

#[test]
fn concatenation_applies_left_operand_first() {
    let a = Permutation::from_perm(vec![1, 2, 0]).unwrap();
    let b = Permutation::from_perm(vec![0, 2, 1]).unwrap();
    let x = ['a', 'b', 'c'];
    let expected = b.apply_to_slice(&a.apply_to_slice(&x).unwrap()).unwrap();
    assert_eq!(a.concat(&b).unwrap().apply_to_slice(&x).unwrap(), expected);
}

#[test]
fn random_permutations_are_valid_and_reproducible() {
    let p = Permutation::random(50, &mut ChaCha8Rng::seed_from_u64(42));
    let q = Permutation::random(50, &mut ChaCha8Rng::seed_from_u64(42));
    assert_eq!(p, q);
    assert_eq!(Permutation::from_perm(p.perm().to_vec()).unwrap(), p);
    assert!(p.swap().iter().enumerate().all(|(i, &s)| s >= i && s < 50));
}

#[test]
fn cuthill_mckee_basic_examples() {
    // Basic example
    {
        let matrix = csr_pattern(4, &[1, 0, 1, 1, 0, 1, 0, 1, 1, 0, 1, 0, 1, 1, 0, 1]);
        let perm = cuthill_mckee(matrix.layout()).unwrap();

        assert_eq!(perm.perm(), &[1, 3, 0, 2]);

        let mut rcm_expected_perm = perm.clone();
        rcm_expected_perm.reverse();
        assert_eq!(reverse_cuthill_mckee(matrix.layout()).unwrap(), rcm_expected_perm);
    }

    // Diagonal pattern
    {
        let matrix = csr_pattern(4, &[1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1]);
        let perm = cuthill_mckee(matrix.layout()).unwrap();
        assert_eq!(perm.perm(), &[0, 1, 2, 3]);
    }

    let rectangular = DenseMatrix::from_row_slice(1, 2, &[1.0, 1.0]).unwrap().to_csr();
    assert!(cuthill_mckee(rectangular.layout()).is_err());
}

#[test]
fn symmetric_permutation_of_a_matrix() {
    let matrix = csr_pattern(3, &[1, 2, 0, 3, 4, 5, 0, 6, 7]);
    let p = Permutation::from_perm(vec![2, 0, 1]).unwrap();
    let permuted = matrix.permuted(&p, &p).unwrap();
    // (P A P^T)[i][j] = A[perm[i]][perm[j]]
    for i in 0..3 {
        for j in 0..3 {
            assert_eq!(permuted.get(i, j), matrix.get(p.map(i), p.map(j)));
        }
    }
    assert_eq!(permuted.used_elements(), matrix.used_elements());
    assert!(permuted.to_nalgebra().is_ok());
}

proptest! {
    #[test]
    fn in_place_and_out_of_place_application_agree(
        (p, x) in (0..40usize).prop_flat_map(|n| (permutation(n), proptest::collection::vec(-5.0..5.0f64, n)))
    ) {
        let mut in_place = x.clone();
        p.apply_in_place(&mut in_place, false).unwrap();
        prop_assert_eq!(&in_place, &p.apply_to_slice(&x).unwrap());

        let mut out_of_place = vec![0.0; x.len()];
        p.apply(&mut out_of_place, &in_place, true).unwrap();
        prop_assert_eq!(&out_of_place, &x);

        p.apply_in_place(&mut in_place, true).unwrap();
        prop_assert_eq!(&in_place, &x);

        let swapped = Permutation::from_swap(p.swap().to_vec()).unwrap();
        prop_assert_eq!(swapped.perm(), p.perm());
    }
}
