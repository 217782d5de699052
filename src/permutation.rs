//! Index permutations with in-place and out-of-place application.
use crate::container::LinearOperator;
use crate::error::{check_dims, LafemError, Result};
use crate::layout::{LayoutKind, SparseLayout};
use crate::matrix::SparseMatrixCsr;
use core::fmt;
use lafem_arch::Real;
use rand::Rng;
use std::collections::VecDeque;
use std::error::Error;
use std::marker::PhantomData;

/// A permutation of `n` indices.
///
/// The permutation stores a position array `perm` such that for *target index* `i` in `0 .. n`
/// the corresponding *source index* is `perm[i]`:
///
/// ```ignore
/// target[i] = source[perm[i]]
/// ```
///
/// It also stores an equivalent swap sequence `swap` with `swap[i] >= i`, so that swapping
/// `x[i]` and `x[swap[i]]` for `i = 0, 1, ..., n - 1` permutes `x` in place.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Permutation {
    perm: Vec<usize>,
    swap: Vec<usize>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct InvalidPermutation {
    marker: PhantomData<()>,
}

impl InvalidPermutation {
    fn new() -> Self {
        Self { marker: PhantomData }
    }
}

impl fmt::Display for InvalidPermutation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Invalid permutation")
    }
}

impl Error for InvalidPermutation {}

impl Permutation {
    pub fn identity(n: usize) -> Self {
        Self {
            perm: (0..n).collect(),
            swap: (0..n).collect(),
        }
    }

    /// A uniformly distributed random permutation.
    pub fn random<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Self {
        let swap = (0..n).map(|i| rng.gen_range(i..n)).collect();
        Self::from_valid_swap(swap)
    }

    /// Builds a permutation from its position array.
    pub fn from_perm(perm: Vec<usize>) -> std::result::Result<Self, InvalidPermutation> {
        let mut visited = vec![false; perm.len()];
        for &index in &perm {
            if index >= perm.len() || visited[index] {
                return Err(InvalidPermutation::new());
            } else {
                visited[index] = true;
            }
        }
        let swap = calc_swap_from_perm(&perm);
        Ok(Self { perm, swap })
    }

    /// Builds a permutation from its swap sequence.
    pub fn from_swap(swap: Vec<usize>) -> std::result::Result<Self, InvalidPermutation> {
        let n = swap.len();
        if swap.iter().enumerate().any(|(i, &s)| s < i || s >= n) {
            return Err(InvalidPermutation::new());
        }
        Ok(Self::from_valid_swap(swap))
    }

    /// Builds the inverse of the permutation with position array `perm`.
    pub fn from_inverse_perm(perm: Vec<usize>) -> std::result::Result<Self, InvalidPermutation> {
        Ok(Self::from_perm(perm)?.inverse())
    }

    /// Builds the inverse of the permutation with swap sequence `swap`.
    pub fn from_inverse_swap(swap: Vec<usize>) -> std::result::Result<Self, InvalidPermutation> {
        Ok(Self::from_swap(swap)?.inverse())
    }

    fn from_valid_swap(swap: Vec<usize>) -> Self {
        let perm = calc_perm_from_swap(&swap);
        Self { perm, swap }
    }

    pub fn len(&self) -> usize {
        self.perm.len()
    }

    pub fn is_empty(&self) -> bool {
        self.perm.is_empty()
    }

    pub fn perm(&self) -> &[usize] {
        &self.perm
    }

    pub fn swap(&self) -> &[usize] {
        &self.swap
    }

    /// The source index of `target_index`.
    pub fn map(&self, target_index: usize) -> usize {
        self.perm[target_index]
    }

    pub fn inverse(&self) -> Permutation {
        let mut inverse_perm = vec![0; self.len()];
        for (target_idx, &source_idx) in self.perm().iter().enumerate() {
            inverse_perm[source_idx] = target_idx;
        }
        let swap = calc_swap_from_perm(&inverse_perm);
        Self {
            perm: inverse_perm,
            swap,
        }
    }

    /// The permutation that applies `self` first and `other` second.
    pub fn concat(&self, other: &Permutation) -> Result<Permutation> {
        check_dims("Permutation::concat", self.len(), other.len())?;
        let perm: Vec<_> = other.perm().iter().map(|&i| self.perm[i]).collect();
        let swap = calc_swap_from_perm(&perm);
        Ok(Self { perm, swap })
    }

    /// Permutes `x` in place, or applies the inverse permutation if `invert` is set.
    pub fn apply_in_place<T>(&self, x: &mut [T], invert: bool) -> Result<()> {
        self.apply_in_place_blocked(x, 1, invert)
    }

    /// Permutes blocks of `block_size` consecutive entries in place.
    pub fn apply_in_place_blocked<T>(&self, x: &mut [T], block_size: usize, invert: bool) -> Result<()> {
        check_dims("Permutation::apply_in_place", self.len() * block_size, x.len())?;
        let swap_blocks = |x: &mut [T], i: usize, j: usize| {
            for b in 0..block_size {
                x.swap(i * block_size + b, j * block_size + b);
            }
        };
        let n = self.len();
        if invert {
            for i in (1..n).rev() {
                let j = self.swap[i - 1];
                if j > i - 1 {
                    swap_blocks(x, i - 1, j);
                }
            }
        } else {
            for i in 0..n {
                let j = self.swap[i];
                if j > i {
                    swap_blocks(x, i, j);
                }
            }
        }
        Ok(())
    }

    /// Writes the permuted `x` into `y`: `y[i] = x[perm[i]]`, or `y[perm[i]] = x[i]` if `invert`
    /// is set.
    pub fn apply<T: Copy>(&self, y: &mut [T], x: &[T], invert: bool) -> Result<()> {
        check_dims("Permutation::apply", self.len(), x.len())?;
        check_dims("Permutation::apply", self.len(), y.len())?;
        if invert {
            for (&source, &x_i) in self.perm.iter().zip(x) {
                y[source] = x_i;
            }
        } else {
            for (y_i, &source) in y.iter_mut().zip(&self.perm) {
                *y_i = x[source];
            }
        }
        Ok(())
    }

    pub fn apply_to_slice<T: Clone>(&self, slice: &[T]) -> Result<Vec<T>> {
        check_dims("Permutation::apply_to_slice", self.len(), slice.len())?;
        Ok(self
            .perm()
            .iter()
            .map(|source_idx| slice[*source_idx].clone())
            .collect())
    }

    pub fn reverse(&mut self) {
        self.perm.reverse();
        self.swap = calc_swap_from_perm(&self.perm);
    }
}

/// Computes the swap sequence that realizes `perm` in place.
pub fn calc_swap_from_perm(perm: &[usize]) -> Vec<usize> {
    let n = perm.len();
    // position[k]: current position of the original entry k
    // entry[p]: original index of the entry currently at position p
    let mut position: Vec<usize> = (0..n).collect();
    let mut entry: Vec<usize> = (0..n).collect();
    let mut swap = vec![0; n];
    for i in 0..n {
        let j = position[perm[i]];
        swap[i] = j;
        let (e_i, e_j) = (entry[i], entry[j]);
        entry.swap(i, j);
        position[e_i] = j;
        position[e_j] = i;
    }
    swap
}

/// Computes the position array of the permutation with swap sequence `swap`.
pub fn calc_perm_from_swap(swap: &[usize]) -> Vec<usize> {
    let mut perm: Vec<usize> = (0..swap.len()).collect();
    for (i, &j) in swap.iter().enumerate() {
        perm.swap(i, j);
    }
    perm
}

/// Creates a vertex permutation for a square CSR layout using the Cuthill-McKee algorithm.
///
/// The layout is interpreted as the adjacency structure of a graph, which should be symmetric.
pub fn cuthill_mckee(layout: &SparseLayout) -> Result<Permutation> {
    if layout.kind() != LayoutKind::Csr {
        return Err(LafemError::InvalidLayout(format!(
            "Cuthill-McKee requires a CSR layout, got {:?}",
            layout.kind()
        )));
    }
    check_dims("cuthill_mckee", layout.rows(), layout.columns())?;
    let n = layout.rows();
    let row_ptr = layout.indices(0);
    let col_idx = layout.indices(1);

    let adjacent_vertices = |vertex_idx: usize| &col_idx[row_ptr[vertex_idx]..row_ptr[vertex_idx + 1]];
    let vertex_degree = |vertex_idx: usize| adjacent_vertices(vertex_idx).len();

    let mut queue = VecDeque::new();
    let mut permutation = Vec::with_capacity(n);
    let mut visited = vec![false; n];

    let mut adjacency_workspace = Vec::new();

    // Disconnected graphs are handled by restarting from an unvisited vertex of least degree
    while let Some(start_vertex) = (0..n)
        .filter(|&vertex_idx| !visited[vertex_idx])
        .min_by_key(|&vertex_idx| vertex_degree(vertex_idx))
    {
        queue.push_back(start_vertex);
        visited[start_vertex] = true;

        while let Some(vertex) = queue.pop_front() {
            adjacency_workspace.clear();
            adjacency_workspace.extend_from_slice(adjacent_vertices(vertex));
            adjacency_workspace.sort_by_key(|&idx| vertex_degree(idx));

            permutation.push(vertex);

            // Breadth-first search, neighbors in order of increasing degree
            for &adjacent_vertex in &adjacency_workspace {
                if !visited[adjacent_vertex] {
                    visited[adjacent_vertex] = true;
                    queue.push_back(adjacent_vertex);
                }
            }
        }
    }

    debug_assert_eq!(permutation.len(), n);
    let swap = calc_swap_from_perm(&permutation);
    Ok(Permutation {
        perm: permutation,
        swap,
    })
}

/// Creates a vertex permutation for a square CSR layout using the Reverse Cuthill-McKee (RCM)
/// algorithm.
pub fn reverse_cuthill_mckee(layout: &SparseLayout) -> Result<Permutation> {
    let mut perm = cuthill_mckee(layout)?;
    perm.reverse();
    Ok(perm)
}

impl<T: Real> SparseMatrixCsr<T> {
    /// The matrix `P_r A P_c^T`: row `i` of the result is row `rows.map(i)` of `self`, and column
    /// `j` of `self` moves to the column `k` with `columns.map(k) == j`.
    pub fn permuted(&self, rows: &Permutation, columns: &Permutation) -> Result<Self> {
        check_dims("SparseMatrixCsr::permuted", self.rows(), rows.len())?;
        check_dims("SparseMatrixCsr::permuted", self.columns(), columns.len())?;
        let column_target = columns.inverse();
        let mut row_ptr = Vec::with_capacity(self.rows() + 1);
        let mut col_idx = Vec::with_capacity(self.col_idx().len());
        let mut values = Vec::with_capacity(self.values().len());
        row_ptr.push(0);
        for &source_row in rows.perm() {
            let (cols, vals) = self.row(source_row);
            col_idx.extend(cols.iter().map(|&j| column_target.map(j)));
            values.extend_from_slice(vals);
            row_ptr.push(col_idx.len());
        }
        Ok(Self::from_sorted_parts(&self.arena(), self.rows(), self.columns(), row_ptr, col_idx, values).sorted())
    }
}
