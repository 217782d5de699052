//! Serialization of containers into in-memory checkpoint buffers.
//!
//! Checkpoint data uses the binary envelope of [`crate::io::binary`], so the same
//! [`SerialConfig`] options apply. Uncompressed and zlib checkpoints restore bit-exactly.
use crate::container::LocalVector;
use crate::error::Result;
use crate::global::GlobalVector;
use crate::io::binary::{
    csr_from_payload, csr_payload, decode, dense_from_payload, dense_payload, encode, sparse_blocked_from_payload,
    sparse_from_payload, sparse_payload,
};
use crate::io::{FileMode, SerialConfig};
use crate::matrix::SparseMatrixCsr;
use crate::vector::{DenseVector, DenseVectorBlocked, SparseVector, SparseVectorBlocked};
use lafem_arch::Real;
use log::warn;

pub trait Checkpointable {
    fn checkpoint_bytes(&self, config: &SerialConfig) -> Result<Vec<u8>>;

    /// Number of bytes [`set_checkpoint_data`](Checkpointable::set_checkpoint_data) appends with
    /// the same configuration.
    fn get_checkpoint_size(&self, config: &SerialConfig) -> u64 {
        match self.checkpoint_bytes(config) {
            Ok(bytes) => bytes.len() as u64,
            Err(err) => {
                warn!("Cannot serialize checkpoint: {}", err);
                0
            }
        }
    }

    /// Appends the checkpoint to `buffer` and returns the number of bytes written.
    fn set_checkpoint_data(&self, buffer: &mut Vec<u8>, config: &SerialConfig) -> Result<u64> {
        let bytes = self.checkpoint_bytes(config)?;
        buffer.extend_from_slice(&bytes);
        Ok(bytes.len() as u64)
    }

    /// Replaces the contents of `self` with a checkpoint at the start of `data`.
    fn restore_from_checkpoint_data(&mut self, data: &[u8]) -> Result<()>;
}

impl<T: Real> Checkpointable for DenseVector<T> {
    fn checkpoint_bytes(&self, config: &SerialConfig) -> Result<Vec<u8>> {
        encode(FileMode::Dv, &dense_payload(self.as_slice(), self.size(), 1), config)
    }

    fn restore_from_checkpoint_data(&mut self, data: &[u8]) -> Result<()> {
        let (payload, _) = decode(FileMode::Dv, data)?;
        *self = DenseVector::from_vec_in(&self.arena(), dense_from_payload(payload, 1)?);
        Ok(())
    }
}

impl<T: Real, const B: usize> Checkpointable for DenseVectorBlocked<T, B> {
    fn checkpoint_bytes(&self, config: &SerialConfig) -> Result<Vec<u8>> {
        encode(FileMode::Dv, &dense_payload(self.values(), self.size(), B), config)
    }

    fn restore_from_checkpoint_data(&mut self, data: &[u8]) -> Result<()> {
        let (payload, _) = decode(FileMode::Dv, data)?;
        *self = DenseVectorBlocked::from_scalars_in(&self.arena(), dense_from_payload(payload, B)?)?;
        Ok(())
    }
}

impl<T: Real> Checkpointable for SparseVector<T> {
    fn checkpoint_bytes(&self, config: &SerialConfig) -> Result<Vec<u8>> {
        let payload = sparse_payload(self.size(), 1, self.indices(), self.elements());
        encode(FileMode::Svb, &payload, config)
    }

    fn restore_from_checkpoint_data(&mut self, data: &[u8]) -> Result<()> {
        let (payload, _) = decode(FileMode::Svb, data)?;
        *self = sparse_from_payload(payload)?;
        Ok(())
    }
}

impl<T: Real, const B: usize> Checkpointable for SparseVectorBlocked<T, B> {
    fn checkpoint_bytes(&self, config: &SerialConfig) -> Result<Vec<u8>> {
        let payload = sparse_payload(self.size(), B, self.indices(), self.elements());
        encode(FileMode::Svb, &payload, config)
    }

    fn restore_from_checkpoint_data(&mut self, data: &[u8]) -> Result<()> {
        let (payload, _) = decode(FileMode::Svb, data)?;
        *self = sparse_blocked_from_payload(payload)?;
        Ok(())
    }
}

impl<T: Real> Checkpointable for SparseMatrixCsr<T> {
    fn checkpoint_bytes(&self, config: &SerialConfig) -> Result<Vec<u8>> {
        encode(FileMode::Csr, &csr_payload(self), config)
    }

    fn restore_from_checkpoint_data(&mut self, data: &[u8]) -> Result<()> {
        let (payload, _) = decode(FileMode::Csr, data)?;
        let (layout, values) = csr_from_payload(payload)?;
        self.restore(layout, values);
        Ok(())
    }
}

impl<'g, T, V> Checkpointable for GlobalVector<'g, T, V>
where
    T: Real,
    V: LocalVector<T> + Checkpointable,
{
    fn checkpoint_bytes(&self, config: &SerialConfig) -> Result<Vec<u8>> {
        self.local().checkpoint_bytes(config)
    }

    fn restore_from_checkpoint_data(&mut self, data: &[u8]) -> Result<()> {
        self.local_mut().restore_from_checkpoint_data(data)
    }
}
