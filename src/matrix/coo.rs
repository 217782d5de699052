use crate::container::{CloneMode, LinearOperator};
use crate::error::{check_dims, LafemError, Result};
use crate::layout::{LayoutKind, SparseLayout};
use crate::matrix::SparseMatrixCsr;
use crate::memory::{Buffer, MemoryArena};
use lafem_arch::product_matvec::{product_matvec_coo, Accumulate};
use lafem_arch::{Backend, Real};
use log::debug;
use nalgebra_sparse::CooMatrix;

/// A sparse matrix in coordinate format.
///
/// Entries are kept sorted by row and then by column, with at most one entry per coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrixCoo<T> {
    layout: SparseLayout,
    values: Buffer<T>,
}

impl<T: Real> Default for SparseMatrixCoo<T> {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl<T: Real> SparseMatrixCoo<T> {
    pub fn new(rows: usize, columns: usize) -> Self {
        Self::from_sorted_parts(&MemoryArena::default(), rows, columns, Vec::new(), Vec::new(), Vec::new())
    }

    /// Builds a matrix from unsorted triplets. Entries at the same coordinate are summed.
    pub fn from_triplets(
        rows: usize,
        columns: usize,
        row_idx: &[usize],
        col_idx: &[usize],
        values: &[T],
    ) -> Result<Self> {
        check_dims("SparseMatrixCoo::from_triplets", row_idx.len(), col_idx.len())?;
        check_dims("SparseMatrixCoo::from_triplets", row_idx.len(), values.len())?;
        if let Some(&i) = row_idx.iter().find(|&&i| i >= rows) {
            return Err(LafemError::IndexOutOfBounds { index: i, size: rows });
        }
        if let Some(&j) = col_idx.iter().find(|&&j| j >= columns) {
            return Err(LafemError::IndexOutOfBounds {
                index: j,
                size: columns,
            });
        }
        Ok(Self::from_valid_triplets(rows, columns, row_idx, col_idx, values))
    }

    /// Sorts and merges triplets whose coordinates are known to be in bounds.
    fn from_valid_triplets(rows: usize, columns: usize, row_idx: &[usize], col_idx: &[usize], values: &[T]) -> Self {
        let mut order: Vec<usize> = (0..values.len()).collect();
        order.sort_by_key(|&k| (row_idx[k], col_idx[k]));

        let mut rows_out: Vec<usize> = Vec::with_capacity(order.len());
        let mut cols_out: Vec<usize> = Vec::with_capacity(order.len());
        let mut values_out: Vec<T> = Vec::with_capacity(order.len());
        for k in order {
            let (i, j) = (row_idx[k], col_idx[k]);
            match (rows_out.last(), cols_out.last(), values_out.last_mut()) {
                (Some(&i_prev), Some(&j_prev), Some(v)) if i_prev == i && j_prev == j => *v += values[k],
                _ => {
                    rows_out.push(i);
                    cols_out.push(j);
                    values_out.push(values[k]);
                }
            }
        }
        Self::from_sorted_parts(&MemoryArena::default(), rows, columns, rows_out, cols_out, values_out)
    }

    fn from_sorted_parts(
        arena: &MemoryArena,
        rows: usize,
        columns: usize,
        row_idx: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<T>,
    ) -> Self {
        Self {
            layout: SparseLayout::from_trusted(LayoutKind::Coo, rows, columns, (1, 1), 0, vec![row_idx, col_idx]),
            values: arena.adopt(values),
        }
    }

    pub fn from_csr(csr: &SparseMatrixCsr<T>) -> Self {
        debug!("Converting CSR matrix to COO");
        let csr = csr.sorted();
        let row_idx = csr
            .row_ptr()
            .windows(2)
            .enumerate()
            .flat_map(|(i, w)| std::iter::repeat(i).take(w[1] - w[0]))
            .collect();
        Self::from_sorted_parts(
            &csr.arena(),
            csr.rows(),
            csr.columns(),
            row_idx,
            csr.col_idx().to_vec(),
            csr.values().to_vec(),
        )
    }

    pub fn to_csr(&self) -> SparseMatrixCsr<T> {
        debug!("Converting COO matrix to CSR");
        let rows = self.layout.rows();
        let mut row_ptr = vec![0; rows + 1];
        for &i in self.row_idx() {
            row_ptr[i + 1] += 1;
        }
        for i in 0..rows {
            row_ptr[i + 1] += row_ptr[i];
        }
        SparseMatrixCsr::from_sorted_parts(
            &self.values.arena(),
            rows,
            self.layout.columns(),
            row_ptr,
            self.col_idx().to_vec(),
            self.values().to_vec(),
        )
    }

    pub fn to_nalgebra(&self) -> Result<CooMatrix<T>> {
        CooMatrix::try_from_triplets(
            self.layout.rows(),
            self.layout.columns(),
            self.row_idx().to_vec(),
            self.col_idx().to_vec(),
            self.values().to_vec(),
        )
        .map_err(|err| LafemError::InvalidLayout(err.to_string()))
    }

    pub fn layout(&self) -> &SparseLayout {
        &self.layout
    }

    pub fn row_idx(&self) -> &[usize] {
        self.layout.indices(0)
    }

    pub fn col_idx(&self) -> &[usize] {
        self.layout.indices(1)
    }

    pub fn values(&self) -> &[T] {
        self.values.as_slice()
    }

    pub fn values_mut(&mut self) -> &mut [T] {
        self.values.as_mut_slice()
    }

    fn position(&self, row: usize, col: usize) -> std::result::Result<usize, usize> {
        let row_idx = self.row_idx();
        let col_idx = self.col_idx();
        let begin = row_idx.partition_point(|&i| i < row);
        let end = row_idx.partition_point(|&i| i <= row);
        col_idx[begin..end]
            .binary_search(&col)
            .map(|k| begin + k)
            .map_err(|k| begin + k)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        if row >= self.layout.rows() || col >= self.layout.columns() {
            return None;
        }
        Some(self.position(row, col).map_or(T::zero(), |k| self.values()[k]))
    }

    /// Writes an entry, inserting it if the coordinate is not stored yet.
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.layout.rows() {
            return Err(LafemError::IndexOutOfBounds {
                index: row,
                size: self.layout.rows(),
            });
        }
        if col >= self.layout.columns() {
            return Err(LafemError::IndexOutOfBounds {
                index: col,
                size: self.layout.columns(),
            });
        }
        match self.position(row, col) {
            Ok(k) => self.values_mut()[k] = value,
            Err(k) => {
                self.layout.indices_mut(0).insert(k, row);
                self.layout.indices_mut(1).insert(k, col);
                let mut values = self.values.to_vec();
                values.insert(k, value);
                self.values = self.values.arena().adopt(values);
            }
        }
        Ok(())
    }

    pub fn format(&mut self, value: T) {
        self.values_mut().fill(value);
    }

    pub fn clone_with(&self, mode: CloneMode) -> Self {
        match mode {
            CloneMode::Weak => self.clone(),
            CloneMode::Shallow => Self {
                layout: self.layout.clone(),
                values: self.values.deep_clone(),
            },
            CloneMode::Deep => Self {
                layout: self.layout.deep_clone(),
                values: self.values.deep_clone(),
            },
        }
    }
}

/// Duplicate triplets are summed.
impl<'a, T: Real> From<&'a CooMatrix<T>> for SparseMatrixCoo<T> {
    fn from(matrix: &'a CooMatrix<T>) -> Self {
        let (row_idx, col_idx, values) = matrix.triplet_iter().fold(
            (Vec::new(), Vec::new(), Vec::new()),
            |(mut rows, mut cols, mut values), (i, j, &v)| {
                rows.push(i);
                cols.push(j);
                values.push(v);
                (rows, cols, values)
            },
        );
        Self::from_valid_triplets(matrix.nrows(), matrix.ncols(), &row_idx, &col_idx, &values)
    }
}

impl<T: Real> LinearOperator<T> for SparseMatrixCoo<T> {
    fn rows(&self) -> usize {
        self.layout.rows()
    }

    fn columns(&self) -> usize {
        self.layout.columns()
    }

    fn used_elements(&self) -> usize {
        self.values.len()
    }

    fn backend(&self) -> Backend {
        self.values.backend()
    }

    fn apply_unchecked(&self, r: &mut [T], acc: Accumulate<T>, x: &[T]) {
        product_matvec_coo(self.backend(), r, acc, self.row_idx(), self.col_idx(), self.values(), x);
    }
}
