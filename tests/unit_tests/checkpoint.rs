use lafem::checkpoint::Checkpointable;
use lafem::global::{GlobalVector, Gate};
use lafem::io::SerialConfig;
use lafem::matrix::{DenseMatrix, SparseMatrixCsr};
use lafem::vector::{DenseVector, DenseVectorBlocked, SparseVector, SparseVectorBlocked};
use lafem::LocalVector;
use nalgebra::Vector2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use util::tridiagonal;

fn random_vector(n: usize) -> DenseVector<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    DenseVector::from_vec((0..n).map(|_| rng.gen::<f64>() * 1e3 - 5e2).collect())
}

fn restore_dense(buffer: &[u8]) -> DenseVector<f64> {
    let mut restored = DenseVector::new(0);
    restored.restore_from_checkpoint_data(buffer).unwrap();
    restored
}

#[test]
fn dense_vector_checkpoint_is_bit_exact() {
    let v = random_vector(100);
    for config in [SerialConfig::default(), SerialConfig::default().with_zlib()] {
        let mut buffer = Vec::new();
        let written = v.set_checkpoint_data(&mut buffer, &config).unwrap();
        assert_eq!(written, v.get_checkpoint_size(&config));
        assert_eq!(written as usize, buffer.len());

        let restored = restore_dense(&buffer);
        let original_bits: Vec<u64> = v.as_slice().iter().map(|x| x.to_bits()).collect();
        let restored_bits: Vec<u64> = restored.as_slice().iter().map(|x| x.to_bits()).collect();
        assert_eq!(restored_bits, original_bits);
    }
}

#[test]
fn lossy_checkpoint_within_tolerance() {
    let v = random_vector(100);
    let config = SerialConfig::default().with_zlib().with_lossy(1e-4);
    let mut buffer = Vec::new();
    v.set_checkpoint_data(&mut buffer, &config).unwrap();
    let restored = restore_dense(&buffer);
    let mut diff = restored.clone();
    diff.difference(lafem::Operand::This, lafem::Operand::Other(&v)).unwrap();
    assert!(diff.max_abs_element() <= 1e-4 + 1e-9);
}

#[test]
fn lossy_checkpoint_with_tiny_tolerance_is_exact() {
    let v = DenseVector::from_vec(vec![1.0, -3.0, 0.25]);
    let config = SerialConfig::default().with_lossy(1e-20);
    let mut buffer = Vec::new();
    v.set_checkpoint_data(&mut buffer, &config).unwrap();
    assert_eq!(restore_dense(&buffer), v);
}

#[test]
fn checkpoint_appends_to_existing_data() {
    let v = random_vector(10);
    let mut buffer = vec![0xAB; 7];
    let written = v.set_checkpoint_data(&mut buffer, &SerialConfig::default()).unwrap();
    assert_eq!(buffer.len(), 7 + written as usize);
    assert_eq!(&buffer[..7], &[0xAB; 7]);
    assert_eq!(restore_dense(&buffer[7..]), v);
}

#[test]
fn csr_checkpoint_restores_layout_and_values() {
    let csr = DenseMatrix::from_row_slice(5, 5, &tridiagonal(5, 4.0, -1.0))
        .unwrap()
        .to_csr();
    let config = SerialConfig::default().with_zlib();
    let mut buffer = Vec::new();
    csr.set_checkpoint_data(&mut buffer, &config).unwrap();

    let mut restored = SparseMatrixCsr::<f64>::zeros(1, 1);
    restored.restore_from_checkpoint_data(&buffer).unwrap();
    assert_eq!(restored, csr);
    assert_eq!(restored.row_ptr(), &[0, 2, 5, 8, 11, 13]);
}

#[test]
fn blocked_vector_checkpoint() {
    let v = DenseVectorBlocked::from_blocks(&[Vector2::new(1.0, 2.0), Vector2::new(-3.0, 0.25)]);
    let mut buffer = Vec::new();
    v.set_checkpoint_data(&mut buffer, &SerialConfig::default()).unwrap();

    let mut restored = DenseVectorBlocked::<f64, 2>::new(0);
    restored.restore_from_checkpoint_data(&buffer).unwrap();
    assert_eq!(restored, v);

    // A blocked checkpoint does not restore into a vector of a different block size
    let mut wrong = DenseVectorBlocked::<f64, 3>::new(0);
    assert!(wrong.restore_from_checkpoint_data(&buffer).is_err());
}

#[test]
fn blocked_sparse_vector_checkpoint() {
    let v = SparseVectorBlocked::from_entries(
        20,
        &[11, 4],
        &[Vector2::new(1.5, 0.0), Vector2::new(-2.0, 8.0)],
    )
    .unwrap();
    for config in [SerialConfig::default(), SerialConfig::default().with_zlib()] {
        let mut buffer = Vec::new();
        v.set_checkpoint_data(&mut buffer, &config).unwrap();

        let mut restored = SparseVectorBlocked::<f64, 2>::new(0);
        restored.restore_from_checkpoint_data(&buffer).unwrap();
        assert_eq!(restored, v);
        assert_eq!(restored.indices(), &[4, 11]);

        let mut scalar = SparseVector::<f64>::new(0);
        assert!(scalar.restore_from_checkpoint_data(&buffer).is_err());
    }
}

#[test]
fn global_vector_checkpoints_its_local_part() {
    let gate = Gate::<f64, DenseVector<f64>>::local();
    let v = GlobalVector::new(Some(&gate), random_vector(16));
    let mut buffer = Vec::new();
    v.set_checkpoint_data(&mut buffer, &SerialConfig::default()).unwrap();

    let mut restored = GlobalVector::<f64, DenseVector<f64>>::new(None, DenseVector::new(0));
    restored.restore_from_checkpoint_data(&buffer).unwrap();
    assert_eq!(restored.local(), v.local());
    assert_eq!(restored.local().size(), 16);
}

#[test]
fn truncated_checkpoint_is_rejected() {
    let v = random_vector(10);
    let mut buffer = Vec::new();
    v.set_checkpoint_data(&mut buffer, &SerialConfig::default()).unwrap();
    let mut restored: DenseVector<f64> = DenseVector::new(0);
    assert!(restored
        .restore_from_checkpoint_data(&buffer[..buffer.len() / 2])
        .is_err());
}
