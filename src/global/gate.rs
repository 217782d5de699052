use crate::container::{LocalVector, Operand};
use crate::error::{check_dims, LafemError, Result};
use crate::global::comm::{decode_slice, encode_slice, post_scalar, Comm, ReduceOp};
use crate::global::{ScalarTicket, VectorTicket};
use crate::mirror::VectorMirror;
use lafem_arch::Real;
use log::debug;
use std::marker::PhantomData;
use std::sync::Arc;

/// The halo exchange of one rank.
///
/// A gate knows the neighbouring ranks of its subdomain and, per neighbour, a mirror selecting the
/// shared entries of the local vectors. After [`compile`](Gate::compile) it additionally holds
/// the frequency vector `freqs[i] = 1 / (1 + number of mirrors containing i)`, which weights
/// shared entries so that global reductions count them once.
///
/// Vectors come in two flavours with respect to the shared entries:
///
/// * *type-0*: each rank holds an additive partial contribution,
/// * *type-1*: each rank holds the full value.
///
/// All operations involving communication are collective: every rank of the communicator must
/// call them in the same order.
#[derive(Debug)]
pub struct Gate<T: Real, V: LocalVector<T>> {
    comm: Option<Arc<dyn Comm>>,
    ranks: Vec<usize>,
    mirrors: Vec<VectorMirror>,
    freqs: Option<V>,
    marker: PhantomData<T>,
}

impl<T: Real, V: LocalVector<T>> Gate<T, V> {
    pub fn new(comm: Arc<dyn Comm>) -> Self {
        Self {
            comm: Some(comm),
            ranks: Vec::new(),
            mirrors: Vec::new(),
            freqs: None,
            marker: PhantomData,
        }
    }

    /// A gate without communicator. All operations are local.
    pub fn local() -> Self {
        Self {
            comm: None,
            ranks: Vec::new(),
            mirrors: Vec::new(),
            freqs: None,
            marker: PhantomData,
        }
    }

    /// Adds a neighbour rank together with the mirror of the entries shared with it.
    pub fn push(&mut self, rank: usize, mirror: VectorMirror) -> Result<()> {
        let comm = self.comm.as_ref().ok_or_else(|| {
            LafemError::InvalidLayout("cannot add a neighbour to a gate without communicator".to_string())
        })?;
        if rank >= comm.size() || rank == comm.rank() {
            return Err(LafemError::IndexOutOfBounds {
                index: rank,
                size: comm.size(),
            });
        }
        if self.ranks.contains(&rank) {
            return Err(LafemError::InvalidLayout(format!("rank {} was added twice", rank)));
        }
        self.ranks.push(rank);
        self.mirrors.push(mirror);
        Ok(())
    }

    /// Computes the frequency vector for local vectors shaped like `template`.
    pub fn compile(&mut self, template: &V) -> Result<()> {
        for mirror in &self.mirrors {
            check_dims("Gate::compile", mirror.size(), template.size())?;
        }
        let mut freqs = template.create_like();
        freqs.format(T::one());
        for mirror in &self.mirrors {
            let mut ones = mirror.create_buffer::<T>(template.block_size());
            ones.format(T::one());
            mirror.scatter_axpy(&mut freqs, &ones, T::one())?;
        }
        freqs.component_invert(Operand::This, T::one())?;
        debug!(
            "Compiled gate of rank {} with {} neighbours over {} entries",
            self.rank(),
            self.ranks.len(),
            template.size()
        );
        self.freqs = Some(freqs);
        Ok(())
    }

    pub fn comm(&self) -> Option<&dyn Comm> {
        self.comm.as_deref()
    }

    pub fn rank(&self) -> usize {
        self.comm().map_or(0, |comm| comm.rank())
    }

    pub fn ranks(&self) -> &[usize] {
        &self.ranks
    }

    pub fn mirrors(&self) -> &[VectorMirror] {
        &self.mirrors
    }

    pub fn freqs(&self) -> Result<&V> {
        self.freqs
            .as_ref()
            .ok_or_else(|| LafemError::InvalidLayout("gate has not been compiled".to_string()))
    }

    /// Whether reductions need to involve other ranks.
    fn is_distributed(&self) -> bool {
        self.comm().map_or(false, |comm| comm.size() > 1)
    }

    /// Converts a type-1 vector into a type-0 vector by weighting shared entries.
    pub fn from_1_to_0(&self, v: &mut V) -> Result<()> {
        if self.ranks.is_empty() {
            return Ok(());
        }
        v.component_product(Operand::This, Operand::Other(self.freqs()?))
    }

    /// Converts a type-0 vector into a type-1 vector: every shared entry becomes the sum of all
    /// contributions.
    pub fn sync_0(&self, v: &mut V) -> Result<()> {
        match self.post_sync(v)? {
            Some(tag) => self.complete_sync(v, tag),
            None => Ok(()),
        }
    }

    /// Makes a type-1 vector consistent by averaging the values of shared entries.
    pub fn sync_1(&self, v: &mut V) -> Result<()> {
        self.from_1_to_0(v)?;
        self.sync_0(v)
    }

    pub fn sync_0_async<'a>(&'a self, v: &'a mut V) -> Result<VectorTicket<'a, T, V>> {
        let tag = self.post_sync(v)?;
        Ok(VectorTicket::new(self, v, tag))
    }

    pub fn sync_1_async<'a>(&'a self, v: &'a mut V) -> Result<VectorTicket<'a, T, V>> {
        self.from_1_to_0(v)?;
        self.sync_0_async(v)
    }

    /// Sends the mirrored entries of `v` to all neighbours. Returns the tag of the exchange, or
    /// `None` if there is nothing to exchange.
    ///
    /// Every rank of a distributed communicator draws a tag, including ranks without neighbours,
    /// so that the tag sequences of all ranks stay in step.
    fn post_sync(&self, v: &V) -> Result<Option<u64>> {
        let comm = match self.comm() {
            Some(comm) if self.is_distributed() => comm,
            _ => return Ok(None),
        };
        let tag = comm.next_tag();
        if self.ranks.is_empty() {
            return Ok(None);
        }
        for (&rank, mirror) in self.ranks.iter().zip(&self.mirrors) {
            let mut buffer = mirror.create_buffer(v.block_size());
            mirror.gather(&mut buffer, v)?;
            comm.send(rank, tag, encode_slice(buffer.as_slice()))?;
        }
        Ok(Some(tag))
    }

    /// Receives the neighbour contributions of the exchange `tag` and sums them into `v`.
    ///
    /// Contributions are added in ascending rank order, starting from zero, so that every rank
    /// computes bit-identical values for shared entries.
    pub(crate) fn complete_sync(&self, v: &mut V, tag: u64) -> Result<()> {
        let comm = match self.comm() {
            Some(comm) => comm,
            None => return Ok(()),
        };
        let mut received = Vec::with_capacity(self.ranks.len());
        for (&rank, mirror) in self.ranks.iter().zip(&self.mirrors) {
            let mut buffer = mirror.create_buffer::<T>(v.block_size());
            let bytes = comm.recv(rank, tag)?;
            let values = decode_slice::<T>(&bytes, buffer.size())?;
            buffer.as_mut_slice().copy_from_slice(&values);
            received.push((rank, mirror, buffer));
        }
        received.sort_by_key(|(rank, _, _)| *rank);

        let own_rank = comm.rank();
        let mut sum = v.create_like();
        for (_, mirror, buffer) in received.iter().filter(|(rank, _, _)| *rank < own_rank) {
            mirror.scatter_axpy(&mut sum, buffer, T::one())?;
        }
        sum.sum(Operand::This, Operand::Other(v))?;
        for (_, mirror, buffer) in received.iter().filter(|(rank, _, _)| *rank > own_rank) {
            mirror.scatter_axpy(&mut sum, buffer, T::one())?;
        }
        v.copy_from(&sum)
    }

    /// Global dot product of two type-1 vectors.
    pub fn dot(&self, x: &V, y: &V) -> Result<T> {
        self.dot_async(x, y)?.wait()
    }

    pub fn dot_async(&self, x: &V, y: &V) -> Result<ScalarTicket<'_, T>> {
        let local = if self.ranks.is_empty() {
            x.dot(y)?
        } else {
            x.triple_dot(y, self.freqs()?)?
        };
        self.reduce_async(local, ReduceOp::Sum, false)
    }

    pub fn norm2sqr(&self, x: &V) -> Result<T> {
        self.dot(x, x)
    }

    pub fn norm2(&self, x: &V) -> Result<T> {
        self.norm2_async(x)?.wait()
    }

    pub fn norm2sqr_async(&self, x: &V) -> Result<ScalarTicket<'_, T>> {
        self.dot_async(x, x)
    }

    pub fn norm2_async(&self, x: &V) -> Result<ScalarTicket<'_, T>> {
        let local = self.weighted_norm2sqr(x)?;
        self.reduce_async(local, ReduceOp::Sum, true)
    }

    fn weighted_norm2sqr(&self, x: &V) -> Result<T> {
        if self.ranks.is_empty() {
            Ok(x.norm2sqr())
        } else {
            x.triple_dot(x, self.freqs()?)
        }
    }

    /// Sum of one scalar per rank.
    pub fn sum(&self, value: T) -> Result<T> {
        self.sum_async(value)?.wait()
    }

    pub fn sum_async(&self, value: T) -> Result<ScalarTicket<'_, T>> {
        self.reduce_async(value, ReduceOp::Sum, false)
    }

    pub fn max(&self, value: T) -> Result<T> {
        self.max_async(value)?.wait()
    }

    pub fn max_async(&self, value: T) -> Result<ScalarTicket<'_, T>> {
        self.reduce_async(value, ReduceOp::Max, false)
    }

    pub fn min(&self, value: T) -> Result<T> {
        self.min_async(value)?.wait()
    }

    pub fn min_async(&self, value: T) -> Result<ScalarTicket<'_, T>> {
        self.reduce_async(value, ReduceOp::Min, false)
    }

    /// Global maximum of `|x_i|`. Shared entries are identical on all ranks for type-1 vectors,
    /// so no weighting is required.
    pub fn max_abs_element(&self, x: &V) -> Result<T> {
        self.max(x.max_abs_element())
    }

    pub fn max_abs_element_async(&self, x: &V) -> Result<ScalarTicket<'_, T>> {
        self.max_async(x.max_abs_element())
    }

    pub fn min_abs_element(&self, x: &V) -> Result<T> {
        let local = (x.size() > 0).then(|| x.min_abs_element());
        self.extremum(local, ReduceOp::Min)
    }

    pub fn max_element(&self, x: &V) -> Result<T> {
        let local = (x.size() > 0).then(|| x.max_element());
        self.extremum(local, ReduceOp::Max)
    }

    pub fn min_element(&self, x: &V) -> Result<T> {
        let local = (x.size() > 0).then(|| x.min_element());
        self.extremum(local, ReduceOp::Min)
    }

    /// Global extremum over the non-empty ranks. Empty ranks contribute the identity of `op`.
    /// The result is zero if the vector is empty on every rank.
    fn extremum(&self, local: Option<T>, op: ReduceOp) -> Result<T> {
        let identity = match op {
            ReduceOp::Max => T::from_f64_value(f64::NEG_INFINITY),
            ReduceOp::Min => T::from_f64_value(f64::INFINITY),
            ReduceOp::Sum => T::zero(),
        };
        let result = self
            .reduce_async(local.unwrap_or(identity), op, false)?
            .wait()?;
        if result == identity {
            // The result is identical on all ranks, so either all of them take this branch or none
            let contributors = self.sum(if local.is_some() { T::one() } else { T::zero() })?;
            if contributors == T::zero() {
                return Ok(T::zero());
            }
        }
        Ok(result)
    }

    /// Number of distinct global entries of vectors shaped like the compiled template.
    pub fn global_size(&self) -> Result<usize> {
        let freqs = self.freqs()?;
        let local = if self.ranks.is_empty() {
            T::from_f64_value(freqs.size() as f64)
        } else {
            freqs.sum_elements() / T::from_f64_value(freqs.block_size() as f64)
        };
        let total = self.sum(local)?;
        Ok(total.as_f64().round() as usize)
    }

    fn reduce_async(&self, local: T, op: ReduceOp, sqrt: bool) -> Result<ScalarTicket<'_, T>> {
        match self.comm() {
            Some(comm) if self.is_distributed() => {
                let tag = comm.next_tag();
                post_scalar(comm, tag, local)?;
                Ok(ScalarTicket::new(Some(comm), tag, local, op, sqrt))
            }
            _ => Ok(ScalarTicket::new(None, 0, local, op, sqrt)),
        }
    }
}
