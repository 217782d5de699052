use lafem::memory::MemoryArena;
use lafem::vector::DenseVector;
use lafem::{Backend, CloneMode, LafemError, LocalVector, Operand};

#[test]
fn arena_statistics_track_live_and_released_bytes() {
    let arena = MemoryArena::new(Backend::Generic);
    {
        let a = arena.allocate::<f64>(100);
        let _b = arena.allocate::<f32>(10);
        let stats = arena.stats();
        assert_eq!(stats.live_bytes, 840);
        assert_eq!(stats.allocations, 2);
        assert_eq!(a.len(), 100);
    }
    let stats = arena.stats();
    assert_eq!(stats.live_bytes, 0);
    assert_eq!(stats.peak_bytes, 840);
    assert_eq!(stats.releases, 2);
}

#[test]
fn buffers_are_copied_on_first_shared_write() {
    let arena = MemoryArena::default();
    let a = arena.upload(&[1.0, 2.0, 3.0]);
    let mut b = a.clone();
    assert!(b.shares_storage_with(&a));
    assert!(a.is_shared());

    b.as_mut_slice()[0] = 10.0;
    assert!(!b.shares_storage_with(&a));
    assert_eq!(a.as_slice(), &[1.0, 2.0, 3.0]);
    assert_eq!(b.as_slice(), &[10.0, 2.0, 3.0]);
    assert_eq!(arena.stats().allocations, 2);
}

#[test]
fn element_access_is_bounds_checked() {
    let arena = MemoryArena::default();
    let mut buffer = arena.allocate_filled(3, 1.5f64);
    arena.set_element(&mut buffer, 2, -1.0).unwrap();
    assert_eq!(arena.get_element(&buffer, 2).unwrap(), -1.0);
    assert!(matches!(
        arena.get_element(&buffer, 3),
        Err(LafemError::IndexOutOfBounds { index: 3, size: 3 })
    ));

    let mut host = [0.0; 3];
    arena.download(&buffer, &mut host).unwrap();
    assert_eq!(host, [1.5, 1.5, -1.0]);
}

#[test]
fn operands_on_different_backends_are_rejected() {
    let generic = MemoryArena::new(Backend::Generic);
    let parallel = MemoryArena::new(Backend::Parallel);
    let x = DenseVector::filled_in(&generic, 4, 1.0);
    let mut y = DenseVector::filled_in(&parallel, 4, 1.0);
    assert!(matches!(
        y.axpy(Operand::Other(&x), Operand::This, 2.0),
        Err(LafemError::BackendMismatch { .. })
    ));

    let moved = x.transfer_to(&parallel);
    y.axpy(Operand::Other(&moved), Operand::This, 2.0).unwrap();
    assert_eq!(y.as_slice(), &[3.0; 4]);
    assert_eq!(y.backend(), Backend::Parallel);
}

#[test]
fn clone_modes_of_dense_vectors() {
    let v = DenseVector::from_vec(vec![1.0, 2.0]);
    let weak = v.clone_with(CloneMode::Weak);
    let deep = v.clone_with(CloneMode::Deep);
    assert!(weak.buffer().shares_storage_with(v.buffer()));
    assert!(!deep.buffer().shares_storage_with(v.buffer()));
    assert_eq!(deep, v);
}
