//! Handles of pending asynchronous gate operations.
//!
//! A ticket is created after the local contribution has been posted. `wait()` receives the
//! remaining contributions and completes the operation. A ticket that is dropped without being
//! waited for completes the operation on drop, so the communication sequence of all ranks stays
//! in step.
use crate::container::LocalVector;
use crate::error::Result;
use crate::global::comm::{collect_scalar, Comm, ReduceOp};
use crate::global::Gate;
use lafem_arch::Real;
use log::{error, warn};

/// A pending scalar reduction.
#[derive(Debug)]
pub struct ScalarTicket<'a, T: Real> {
    comm: Option<&'a dyn Comm>,
    tag: u64,
    local: T,
    op: ReduceOp,
    sqrt: bool,
    finished: bool,
}

impl<'a, T: Real> ScalarTicket<'a, T> {
    /// A ticket whose contribution has already been posted under `tag`, or a ticket for a
    /// purely local result if `comm` is `None`.
    pub(crate) fn new(comm: Option<&'a dyn Comm>, tag: u64, local: T, op: ReduceOp, sqrt: bool) -> Self {
        Self {
            comm,
            tag,
            local,
            op,
            sqrt,
            finished: false,
        }
    }

    /// An already completed, rank-local result.
    pub(crate) fn local(local: T, sqrt: bool) -> Self {
        Self::new(None, 0, local, ReduceOp::Sum, sqrt)
    }

    /// Blocks until the reduction has completed and returns its result.
    pub fn wait(mut self) -> Result<T> {
        self.finish()
    }

    fn finish(&mut self) -> Result<T> {
        self.finished = true;
        let value = match self.comm {
            Some(comm) => collect_scalar(comm, self.tag, self.local, self.op)?,
            None => self.local,
        };
        Ok(if self.sqrt { value.sqrt() } else { value })
    }
}

impl<'a, T: Real> Drop for ScalarTicket<'a, T> {
    fn drop(&mut self) {
        if !self.finished && self.comm.is_some() {
            warn!("Scalar ticket dropped without wait(), completing reduction");
            if let Err(err) = self.finish() {
                error!("Reduction of dropped ticket failed: {}", err);
            }
        }
    }
}

/// A pending vector synchronization. The vector stays borrowed until the ticket completes.
#[derive(Debug)]
pub struct VectorTicket<'a, T: Real, V: LocalVector<T>> {
    gate: &'a Gate<T, V>,
    vector: &'a mut V,
    tag: Option<u64>,
    finished: bool,
}

impl<'a, T: Real, V: LocalVector<T>> VectorTicket<'a, T, V> {
    pub(crate) fn new(gate: &'a Gate<T, V>, vector: &'a mut V, tag: Option<u64>) -> Self {
        Self {
            gate,
            vector,
            tag,
            finished: false,
        }
    }

    /// Blocks until the vector has been synchronized.
    pub fn wait(mut self) -> Result<()> {
        self.finish()
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        match self.tag {
            Some(tag) => self.gate.complete_sync(self.vector, tag),
            None => Ok(()),
        }
    }
}

impl<'a, T: Real, V: LocalVector<T>> Drop for VectorTicket<'a, T, V> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("Vector ticket dropped without wait(), completing synchronization");
            if let Err(err) = self.finish() {
                error!("Synchronization of dropped ticket failed: {}", err);
            }
        }
    }
}
