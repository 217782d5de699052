use lafem::io::{binary, mtx, read_file, FileIo, FileMode, SerialConfig};
use lafem::matrix::{DenseMatrix, SparseMatrixCoo, SparseMatrixCsr, SparseMatrixEll};
use lafem::vector::{DenseVector, DenseVectorBlocked, SparseVector, SparseVectorBlocked};
use nalgebra::Vector2;
use lafem::LafemError;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use util::tridiagonal;

/// Byte offset of the first dimension in an uncompressed envelope: the header followed by the
/// `u32` dimension count.
const FIRST_DIM_OFFSET: usize = 25 + 4;

fn tridiagonal_csr() -> SparseMatrixCsr<f64> {
    DenseMatrix::from_row_slice(4, 4, &tridiagonal(4, 2.0, -1.0))
        .unwrap()
        .to_csr()
}

fn random_values(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(-100.0..100.0)).collect()
}

#[test]
fn file_mode_from_extension() {
    assert_eq!(FileMode::from_path("a/b/matrix.mtx"), Some(FileMode::Mtx));
    assert_eq!(FileMode::from_path("vector.DV"), Some(FileMode::Dv));
    assert_eq!(FileMode::from_path("vector.svb"), Some(FileMode::Svb));
    assert_eq!(FileMode::from_path("values.exp"), Some(FileMode::Exp));
    assert_eq!(FileMode::from_path("matrix.txt"), None);
    assert_eq!(FileMode::from_path("matrix"), None);
}

#[test]
fn mtx_matrix_text_round_trip() {
    let csr = tridiagonal_csr();
    let mut text = Vec::new();
    csr.write_out(FileMode::Mtx, &mut text).unwrap();
    let text = String::from_utf8(text).unwrap();
    assert!(text.starts_with("%%MatrixMarket matrix coordinate real general\n4 4 10\n1 1 2e0\n"));

    let read = SparseMatrixCsr::<f64>::read_from(FileMode::Mtx, text.as_bytes()).unwrap();
    assert_eq!(read, csr);
}

#[test]
fn mtx_vectors_use_array_storage() {
    let v = DenseVector::from_vec(vec![1.5, -0.25, 1e-20]);
    let mut text = Vec::new();
    mtx::write_vector(&mut text, &v).unwrap();
    let text = String::from_utf8(text).unwrap();
    assert!(text.starts_with("%%MatrixMarket matrix array real general\n3 1\n"));
    assert_eq!(mtx::read_vector::<f64, _>(text.as_bytes()).unwrap(), v);

    let coordinate = "%%MatrixMarket matrix coordinate real general\n4 1 2\n2 1 3.0\n4 1 -1.0\n";
    let v = mtx::read_vector::<f64, _>(coordinate.as_bytes()).unwrap();
    assert_eq!(v.as_slice(), &[0.0, 3.0, 0.0, -1.0]);
}

#[test]
fn mtx_rejects_malformed_headers() {
    let text = "%%MatrixMarket matrix coordinate complex general\n1 1 1\n1 1 1.0 0.0\n";
    assert!(matches!(
        mtx::read_matrix::<f64, _>(text.as_bytes()),
        Err(LafemError::InvalidFormat(_))
    ));
    let truncated = "%%MatrixMarket matrix coordinate real general\n2 2 3\n1 1 1.0\n";
    assert!(mtx::read_matrix::<f64, _>(truncated.as_bytes()).is_err());
}

#[test]
fn exp_vectors_round_trip_exactly() {
    let v = DenseVector::from_vec(random_values(20, 3));
    let mut text = Vec::new();
    v.write_out(FileMode::Exp, &mut text).unwrap();
    assert_eq!(DenseVector::read_from(FileMode::Exp, text.as_slice()).unwrap(), v);
}

#[test]
fn binary_csr_round_trip_with_and_without_zlib() {
    let csr = tridiagonal_csr();
    for config in [SerialConfig::default(), SerialConfig::default().with_zlib()] {
        let mut bytes = Vec::new();
        binary::write_csr(&mut bytes, &csr, &config).unwrap();
        assert_eq!(&bytes[..4], b"LAFM");
        let read: SparseMatrixCsr<f64> = binary::read_csr(bytes.as_slice()).unwrap();
        assert_eq!(read, csr);
    }
}

#[test]
fn zlib_compresses_repetitive_data() {
    let v = DenseVector::filled(10_000, 1.0);
    let mut plain = Vec::new();
    binary::write_dv(&mut plain, &v, &SerialConfig::default()).unwrap();
    let mut compressed = Vec::new();
    binary::write_dv(&mut compressed, &v, &SerialConfig::default().with_zlib()).unwrap();
    assert!(compressed.len() * 10 < plain.len());
    assert_eq!(binary::read_dv::<f64, _>(compressed.as_slice()).unwrap(), v);
}

#[test]
fn lossy_compression_stays_within_tolerance() {
    let values = random_values(500, 7);
    let v = DenseVector::from_vec(values.clone());
    let tolerance = 1e-3;
    let config = SerialConfig::default().with_zlib().with_lossy(tolerance);

    let mut bytes = Vec::new();
    binary::write_dv(&mut bytes, &v, &config).unwrap();
    let read: DenseVector<f64> = binary::read_dv(bytes.as_slice()).unwrap();
    assert_eq!(read.as_slice().len(), values.len());
    for (a, b) in read.as_slice().iter().zip(&values) {
        assert!((a - b).abs() <= tolerance + 1e-9, "{} vs {}", a, b);
    }
}

#[test]
fn lossy_falls_back_to_exact_storage_for_tiny_tolerances() {
    let v = DenseVector::from_vec(vec![1.0, -3.0, 0.25]);
    for tolerance in [1e-20, 1e-300] {
        let mut bytes = Vec::new();
        binary::write_dv(&mut bytes, &v, &SerialConfig::default().with_lossy(tolerance)).unwrap();
        let read: DenseVector<f64> = binary::read_dv(bytes.as_slice()).unwrap();
        assert_eq!(read, v);
    }

    // Values too large for the quantization grid are stored exactly as well
    let large = DenseVector::from_vec(vec![1e300, f64::MAX, -2.0]);
    let mut bytes = Vec::new();
    binary::write_dv(&mut bytes, &large, &SerialConfig::default().with_lossy(1e-3)).unwrap();
    assert_eq!(binary::read_dv::<f64, _>(bytes.as_slice()).unwrap(), large);
}

#[test]
fn sparse_vectors_round_trip() {
    let v = SparseVector::from_entries(100, &[90, 3, 42], &[1.0, -2.0, 0.5]).unwrap();
    let mut bytes = Vec::new();
    v.write_out(FileMode::Svb, &mut bytes).unwrap();
    let read = SparseVector::<f64>::read_from(FileMode::Svb, bytes.as_slice()).unwrap();
    assert_eq!(read, v);
    assert_eq!(read.indices(), &[3, 42, 90]);
}

#[test]
fn blocked_sparse_vectors_round_trip() {
    let v = SparseVectorBlocked::from_entries(
        50,
        &[17, 2],
        &[Vector2::new(1.0, -1.0), Vector2::new(0.5, 4.0)],
    )
    .unwrap();
    for config in [SerialConfig::default(), SerialConfig::default().with_zlib()] {
        let mut bytes = Vec::new();
        binary::write_svb_blocked(&mut bytes, &v, &config).unwrap();
        let read: SparseVectorBlocked<f64, 2> = binary::read_svb_blocked(bytes.as_slice()).unwrap();
        assert_eq!(read, v);
        assert_eq!(read.get(2), Some(Vector2::new(0.5, 4.0)));

        // The block size is stored with the data
        assert!(binary::read_svb_blocked::<f64, _, 3>(bytes.as_slice()).is_err());
        assert!(binary::read_svb::<f64, _>(bytes.as_slice()).is_err());
    }

    let mut bytes = Vec::new();
    v.write_out(FileMode::Svb, &mut bytes).unwrap();
    assert_eq!(
        SparseVectorBlocked::<f64, 2>::read_from(FileMode::Svb, bytes.as_slice()).unwrap(),
        v
    );
}

#[test]
fn binary_coo_and_ell_round_trip() {
    let csr = tridiagonal_csr();
    let coo = csr.to_coo();
    let ell = SparseMatrixEll::from_csr(&csr);
    for config in [SerialConfig::default(), SerialConfig::default().with_zlib()] {
        let mut bytes = Vec::new();
        binary::write_coo(&mut bytes, &coo, &config).unwrap();
        assert_eq!(binary::read_coo::<f64, _>(bytes.as_slice()).unwrap(), coo);
        assert!(binary::read_ell::<f64, _>(bytes.as_slice()).is_err());

        let mut bytes = Vec::new();
        binary::write_ell(&mut bytes, &ell, &config).unwrap();
        let read: SparseMatrixEll<f64> = binary::read_ell(bytes.as_slice()).unwrap();
        assert_eq!(read.stride(), ell.stride());
        assert_eq!(read.to_csr(), csr);
    }

    let mut bytes = Vec::new();
    coo.write_out(FileMode::Coo, &mut bytes).unwrap();
    assert_eq!(SparseMatrixCsr::<f64>::read_from(FileMode::Coo, bytes.as_slice()).unwrap(), csr);
    let mut bytes = Vec::new();
    ell.write_out(FileMode::Ell, &mut bytes).unwrap();
    assert_eq!(
        SparseMatrixEll::<f64>::read_from(FileMode::Ell, bytes.as_slice())
            .unwrap()
            .to_csr(),
        csr
    );
}

#[test]
fn single_precision_payloads() {
    let v = DenseVector::from_vec(vec![1.5f32, -2.25, 3.0]);
    let mut bytes = Vec::new();
    binary::write_dv(&mut bytes, &v, &SerialConfig::default()).unwrap();
    assert_eq!(binary::read_dv::<f32, _>(bytes.as_slice()).unwrap(), v);
    // The scalar width is part of the header
    assert!(binary::read_dv::<f64, _>(bytes.as_slice()).is_err());
}

#[test]
fn corrupt_binary_data_is_rejected() {
    let v = DenseVector::from_vec(vec![1.0, 2.0, 3.0]);
    let mut bytes = Vec::new();
    binary::write_dv(&mut bytes, &v, &SerialConfig::default().with_zlib()).unwrap();

    let mut wrong_magic = bytes.clone();
    wrong_magic[0] = b'X';
    assert!(matches!(
        binary::read_dv::<f64, _>(wrong_magic.as_slice()),
        Err(LafemError::InvalidFormat(_))
    ));

    let mut wrong_version = bytes.clone();
    wrong_version[4] = 99;
    assert!(matches!(
        binary::read_dv::<f64, _>(wrong_version.as_slice()),
        Err(LafemError::InvalidFormat(_))
    ));

    let truncated = &bytes[..bytes.len() - 3];
    assert!(matches!(binary::read_dv::<f64, _>(truncated), Err(LafemError::InvalidFormat(_))));

    let mut corrupt = bytes.clone();
    let last = corrupt.len() - 5;
    corrupt[last] ^= 0xff;
    assert!(matches!(binary::read_dv::<f64, _>(corrupt.as_slice()), Err(LafemError::InvalidFormat(_))));

    assert!(matches!(
        binary::read_csr::<f64, _>(bytes.as_slice()),
        Err(LafemError::InvalidFormat(_))
    ));

    // Dimensions that overflow when converted to array lengths
    let mut csr_bytes = Vec::new();
    binary::write_csr(&mut csr_bytes, &SparseMatrixCsr::<f64>::identity(2), &SerialConfig::default()).unwrap();
    csr_bytes[FIRST_DIM_OFFSET..FIRST_DIM_OFFSET + 8].copy_from_slice(&u64::MAX.to_le_bytes());
    assert!(matches!(
        binary::read_csr::<f64, _>(csr_bytes.as_slice()),
        Err(LafemError::InvalidFormat(_))
    ));

    let blocked = DenseVectorBlocked::<f64, 2>::from_blocks(&[Vector2::new(1.0, 2.0)]);
    let mut dv_bytes = Vec::new();
    blocked.write_out(FileMode::Dv, &mut dv_bytes).unwrap();
    dv_bytes[FIRST_DIM_OFFSET..FIRST_DIM_OFFSET + 8].copy_from_slice(&u64::MAX.to_le_bytes());
    assert!(matches!(
        DenseVectorBlocked::<f64, 2>::read_from(FileMode::Dv, dv_bytes.as_slice()),
        Err(LafemError::InvalidFormat(_))
    ));
}

#[test]
fn unsupported_modes_are_errors() {
    let v = SparseVector::<f64>::new(3);
    assert!(v.write_out(FileMode::Mtx, Vec::new()).is_err());
    let coo = SparseMatrixCoo::<f64>::new(2, 2);
    assert!(coo.write_out(FileMode::Dv, Vec::new()).is_err());
}

#[test]
fn serial_config_is_serializable() {
    let config = SerialConfig::default().with_lossy(1e-6);
    let json = serde_json::to_string(&config).unwrap();
    let parsed: SerialConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, config);
    assert!(!parsed.use_zlib);
}

#[test]
fn files_are_written_and_read_by_extension() {
    let dir = super::data_output_path().join("io");
    std::fs::create_dir_all(&dir).unwrap();
    let csr = tridiagonal_csr();

    let mtx_path = dir.join("tridiagonal.mtx");
    csr.write_out_file(FileMode::Mtx, &mtx_path).unwrap();
    let read: SparseMatrixCsr<f64> = read_file(&mtx_path).unwrap();
    assert_eq!(read, csr);

    let csr_path = dir.join("tridiagonal.csr");
    csr.write_out_file(FileMode::Csr, &csr_path).unwrap();
    let read: SparseMatrixCoo<f64> = read_file(&csr_path).unwrap();
    assert_eq!(read, csr.to_coo());

    let err = read_file::<DenseVector<f64>, _>(dir.join("missing.dv")).unwrap_err();
    assert!(format!("{:#}", err).contains("failed to open file"));
    assert!(read_file::<DenseVector<f64>, _>(dir.join("vector.unknown")).is_err());
}
