//! Point-to-point transport between the ranks of a distributed run.
use bytemuck::Pod;
use crossbeam::channel::{unbounded, Receiver, Sender};
use lafem_arch::Real;
use parking_lot::Mutex;
use std::error::Error;
use std::fmt;
use std::mem::size_of;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CommError {
    /// The addressed rank does not exist.
    InvalidRank { rank: usize, size: usize },
    /// The peer went away before the message could be delivered.
    Disconnected { rank: usize },
    /// A received payload does not decode to the expected type.
    Malformed(String),
}

impl fmt::Display for CommError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRank { rank, size } => {
                write!(f, "Rank {} does not exist in a communicator of size {}", rank, size)
            }
            Self::Disconnected { rank } => write!(f, "Rank {} disconnected", rank),
            Self::Malformed(msg) => write!(f, "Malformed message: {}", msg),
        }
    }
}

impl Error for CommError {}

/// A communicator connecting `size()` ranks.
///
/// Sends are buffered and never block. Receives block until a message with the requested source
/// and tag arrives; messages with other tags are kept for later receives.
///
/// Collective operations draw their tag from [`Comm::next_tag`], so every rank must issue the
/// same collectives in the same order.
pub trait Comm: Send + Sync + fmt::Debug {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    fn send(&self, dest: usize, tag: u64, data: Vec<u8>) -> Result<(), CommError>;

    fn recv(&self, source: usize, tag: u64) -> Result<Vec<u8>, CommError>;

    /// The tag of the next collective operation.
    fn next_tag(&self) -> u64;
}

/// The communicator of a run with a single rank.
#[derive(Debug, Default)]
pub struct SerialComm {
    sequence: AtomicU64,
}

impl SerialComm {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Comm for SerialComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn send(&self, dest: usize, _tag: u64, _data: Vec<u8>) -> Result<(), CommError> {
        Err(CommError::InvalidRank { rank: dest, size: 1 })
    }

    fn recv(&self, source: usize, _tag: u64) -> Result<Vec<u8>, CommError> {
        Err(CommError::InvalidRank { rank: source, size: 1 })
    }

    fn next_tag(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }
}

#[derive(Debug)]
struct Message {
    source: usize,
    tag: u64,
    data: Vec<u8>,
}

/// A communicator for ranks running as threads of one process.
#[derive(Debug)]
pub struct InProcessComm {
    rank: usize,
    outboxes: Vec<Sender<Message>>,
    inbox: Receiver<Message>,
    unmatched: Mutex<Vec<Message>>,
    sequence: AtomicU64,
}

impl InProcessComm {
    /// Creates the communicators of all `size` ranks. Element `i` belongs to rank `i`.
    pub fn world(size: usize) -> Vec<InProcessComm> {
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..size).map(|_| unbounded()).unzip();
        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| InProcessComm {
                rank,
                outboxes: senders.clone(),
                inbox,
                unmatched: Mutex::new(Vec::new()),
                sequence: AtomicU64::new(0),
            })
            .collect()
    }

    fn check_rank(&self, rank: usize) -> Result<(), CommError> {
        if rank < self.size() {
            Ok(())
        } else {
            Err(CommError::InvalidRank {
                rank,
                size: self.size(),
            })
        }
    }
}

impl Comm for InProcessComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.outboxes.len()
    }

    fn send(&self, dest: usize, tag: u64, data: Vec<u8>) -> Result<(), CommError> {
        self.check_rank(dest)?;
        let message = Message {
            source: self.rank,
            tag,
            data,
        };
        self.outboxes[dest]
            .send(message)
            .map_err(|_| CommError::Disconnected { rank: dest })
    }

    fn recv(&self, source: usize, tag: u64) -> Result<Vec<u8>, CommError> {
        self.check_rank(source)?;
        let mut unmatched = self.unmatched.lock();
        if let Some(pos) = unmatched
            .iter()
            .position(|m| m.source == source && m.tag == tag)
        {
            return Ok(unmatched.swap_remove(pos).data);
        }
        loop {
            let message = self
                .inbox
                .recv()
                .map_err(|_| CommError::Disconnected { rank: source })?;
            if message.source == source && message.tag == tag {
                return Ok(message.data);
            }
            unmatched.push(message);
        }
    }

    fn next_tag(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }
}

/// Combination rule of a scalar reduction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReduceOp {
    Sum,
    Max,
    Min,
}

impl ReduceOp {
    pub fn combine<T: Real>(self, a: T, b: T) -> T {
        match self {
            ReduceOp::Sum => a + b,
            ReduceOp::Max => a.max(b),
            ReduceOp::Min => a.min(b),
        }
    }
}

pub(crate) fn encode_slice<T: Pod>(values: &[T]) -> Vec<u8> {
    bytemuck::cast_slice(values).to_vec()
}

pub(crate) fn decode_slice<T: Pod>(bytes: &[u8], expected_len: usize) -> Result<Vec<T>, CommError> {
    if bytes.len() != expected_len * size_of::<T>() {
        return Err(CommError::Malformed(format!(
            "expected {} bytes, got {}",
            expected_len * size_of::<T>(),
            bytes.len()
        )));
    }
    Ok(bytemuck::pod_collect_to_vec(bytes))
}

/// Sends the local contribution of a scalar reduction to every other rank.
pub(crate) fn post_scalar<T: Real>(comm: &dyn Comm, tag: u64, value: T) -> Result<(), CommError> {
    for rank in (0..comm.size()).filter(|&rank| rank != comm.rank()) {
        comm.send(rank, tag, encode_slice(&[value]))?;
    }
    Ok(())
}

/// Receives the contributions posted by [`post_scalar`] and combines all of them in rank order,
/// so every rank computes the same result.
pub(crate) fn collect_scalar<T: Real>(comm: &dyn Comm, tag: u64, own: T, op: ReduceOp) -> Result<T, CommError> {
    let mut result: Option<T> = None;
    for rank in 0..comm.size() {
        let value = if rank == comm.rank() {
            own
        } else {
            decode_slice::<T>(&comm.recv(rank, tag)?, 1)?[0]
        };
        result = Some(match result {
            None => value,
            Some(acc) => op.combine(acc, value),
        });
    }
    Ok(result.unwrap_or(own))
}

/// Reduces one scalar per rank. Blocks until every rank has contributed.
pub fn allreduce<T: Real>(comm: &dyn Comm, value: T, op: ReduceOp) -> Result<T, CommError> {
    let tag = comm.next_tag();
    post_scalar(comm, tag, value)?;
    collect_scalar(comm, tag, value, op)
}
