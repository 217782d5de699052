use crate::container::{check_backend, CloneMode, LinearOperator};
use crate::error::{check_dims, LafemError, Result};
use crate::layout::{LayoutKind, SparseLayout};
use crate::matrix::{DenseMatrix, SparseMatrixBanded, SparseMatrixBcsr, SparseMatrixCoo, SparseMatrixEll};
use crate::memory::{Buffer, MemoryArena};
use crate::vector::DenseVector;
use lafem_arch::product_matvec::{product_matvec_csr, Accumulate};
use lafem_arch::{diagonal, lumping, scale_row_col, transpose, Backend, Real};
use log::debug;
use nalgebra_sparse::CsrMatrix;
use std::collections::BTreeMap;

/// A sparse matrix in compressed sparse row format.
///
/// The index arrays live in a [`SparseLayout`], which may be shared with other matrices. Values
/// are stored separately, one per column index.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrixCsr<T> {
    layout: SparseLayout,
    values: Buffer<T>,
}

impl<T: Real> Default for SparseMatrixCsr<T> {
    fn default() -> Self {
        Self::zeros(0, 0)
    }
}

impl<T: Real> SparseMatrixCsr<T> {
    /// A matrix without stored entries.
    pub fn zeros(rows: usize, columns: usize) -> Self {
        Self::from_sorted_parts(
            &MemoryArena::default(),
            rows,
            columns,
            vec![0; rows + 1],
            Vec::new(),
            Vec::new(),
        )
    }

    pub fn identity(n: usize) -> Self {
        Self::from_diagonal(&DenseVector::filled(n, T::one()))
    }

    pub fn from_diagonal(diagonal: &DenseVector<T>) -> Self {
        let n = diagonal.as_slice().len();
        Self::from_sorted_parts(
            &diagonal.buffer().arena(),
            n,
            n,
            (0..=n).collect(),
            (0..n).collect(),
            diagonal.to_vec(),
        )
    }

    /// Builds a matrix from raw CSR arrays.
    ///
    /// Columns within a row need not be sorted. The arrays are validated in debug builds.
    pub fn from_csr_data(
        rows: usize,
        columns: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<T>,
    ) -> Result<Self> {
        let layout = SparseLayout::csr(rows, columns, row_ptr, col_idx)?;
        Self::from_layout(layout, values)
    }

    /// A matrix sharing an existing layout.
    pub fn from_layout(layout: SparseLayout, values: Vec<T>) -> Result<Self> {
        Self::from_layout_in(&MemoryArena::default(), layout, values)
    }

    pub fn from_layout_in(arena: &MemoryArena, layout: SparseLayout, values: Vec<T>) -> Result<Self> {
        if layout.kind() != LayoutKind::Csr {
            return Err(LafemError::InvalidLayout(format!(
                "expected a CSR layout, got {:?}",
                layout.kind()
            )));
        }
        check_dims("SparseMatrixCsr::from_layout", layout.indices(1).len(), values.len())?;
        Ok(Self {
            layout,
            values: arena.adopt(values),
        })
    }

    pub(crate) fn from_sorted_parts(
        arena: &MemoryArena,
        rows: usize,
        columns: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<T>,
    ) -> Self {
        Self {
            layout: SparseLayout::from_trusted(LayoutKind::Csr, rows, columns, (1, 1), 0, vec![row_ptr, col_idx]),
            values: arena.adopt(values),
        }
    }

    /// A matrix with the same layout and the given values.
    pub fn clone_layout_with_values(&self, values: Vec<T>) -> Result<Self> {
        Self::from_layout_in(&self.values.arena(), self.layout.clone(), values)
    }

    pub fn layout(&self) -> &SparseLayout {
        &self.layout
    }

    pub fn row_ptr(&self) -> &[usize] {
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

    pub fn arena(&self) -> MemoryArena {
        self.values.arena()
    }

    /// Column indices and values of a row.
    pub fn row(&self, row: usize) -> (&[usize], &[T]) {
        let range = self.row_ptr()[row]..self.row_ptr()[row + 1];
        (&self.col_idx()[range.clone()], &self.values()[range])
    }

    /// Returns `None` outside the matrix and zero for entries not in the layout.
    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        if row >= self.layout.rows() || col >= self.layout.columns() {
            return None;
        }
        let (cols, values) = self.row(row);
        Some(
            cols.iter()
                .position(|&j| j == col)
                .map_or(T::zero(), |k| values[k]),
        )
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

    pub(crate) fn layout_and_values_mut(&mut self) -> (&SparseLayout, &mut [T]) {
        (&self.layout, self.values.as_mut_slice())
    }

    pub(crate) fn restore(&mut self, layout: SparseLayout, values: Vec<T>) {
        self.values = self.values.arena().adopt(values);
        self.layout = layout;
    }

    /// The main diagonal, zero where the layout has no diagonal entry.
    pub fn diagonal(&self) -> DenseVector<T> {
        let mut r = DenseVector::new_in(&self.arena(), self.layout.rows());
        diagonal::diagonal_csr(
            self.backend(),
            r.as_mut_slice(),
            self.row_ptr(),
            self.col_idx(),
            self.values(),
        );
        r
    }

    /// Row sums.
    pub fn lumping(&self) -> DenseVector<T> {
        let mut r = DenseVector::new_in(&self.arena(), self.layout.rows());
        lumping::lumping_csr(self.backend(), r.as_mut_slice(), self.row_ptr(), self.values());
        r
    }

    /// Multiplies row `i` by `s[i]`.
    pub fn scale_rows(&mut self, s: &DenseVector<T>) -> Result<()> {
        check_dims("scale_rows", self.layout.rows(), s.as_slice().len())?;
        check_backend(self.backend(), s.buffer().backend())?;
        let backend = self.backend();
        let (layout, values) = self.layout_and_values_mut();
        scale_row_col::scale_rows_csr(backend, values, None, layout.indices(0), s.as_slice());
        Ok(())
    }

    /// Multiplies column `j` by `s[j]`.
    pub fn scale_cols(&mut self, s: &DenseVector<T>) -> Result<()> {
        check_dims("scale_cols", self.layout.columns(), s.as_slice().len())?;
        check_backend(self.backend(), s.buffer().backend())?;
        let backend = self.backend();
        let (layout, values) = self.layout_and_values_mut();
        scale_row_col::scale_cols(backend, values, None, layout.indices(1), s.as_slice());
        Ok(())
    }

    /// The transposed matrix, with ascending column indices in every row.
    pub fn transpose(&self) -> Self {
        let parts = transpose::transpose_csr(self.layout.columns(), self.row_ptr(), self.col_idx(), self.values());
        Self::from_sorted_parts(
            &self.arena(),
            self.layout.columns(),
            self.layout.rows(),
            parts.row_ptr,
            parts.col_idx,
            parts.val,
        )
    }

    /// A copy whose rows have ascending column indices.
    pub fn sorted(&self) -> Self {
        let rows = self.layout.rows();
        let mut col_idx = Vec::with_capacity(self.col_idx().len());
        let mut values = Vec::with_capacity(self.values().len());
        for i in 0..rows {
            let (cols, vals) = self.row(i);
            let mut entries: Vec<_> = cols.iter().copied().zip(vals.iter().copied()).collect();
            entries.sort_by_key(|&(j, _)| j);
            for (j, v) in entries {
                col_idx.push(j);
                values.push(v);
            }
        }
        Self::from_sorted_parts(
            &self.arena(),
            rows,
            self.layout.columns(),
            self.row_ptr().to_vec(),
            col_idx,
            values,
        )
    }

    pub fn to_dense(&self) -> DenseMatrix<T> {
        debug!("Converting CSR matrix to dense");
        let mut dense = DenseMatrix::new_in(&self.arena(), self.layout.rows(), self.layout.columns());
        let columns = self.layout.columns();
        let values = dense.values_mut();
        for i in 0..self.layout.rows() {
            let (cols, vals) = self.row(i);
            for (&j, &v) in cols.iter().zip(vals) {
                values[i * columns + j] += v;
            }
        }
        dense
    }

    pub fn to_coo(&self) -> SparseMatrixCoo<T> {
        SparseMatrixCoo::from_csr(self)
    }

    pub fn to_ell(&self) -> SparseMatrixEll<T> {
        SparseMatrixEll::from_csr(self)
    }

    pub fn to_banded(&self) -> SparseMatrixBanded<T> {
        SparseMatrixBanded::from_csr(self)
    }

    /// Groups the entries into `BH x BW` blocks. Both dimensions must be multiples of the block
    /// shape.
    pub fn to_bcsr<const BH: usize, const BW: usize>(&self) -> Result<SparseMatrixBcsr<T, BH, BW>> {
        SparseMatrixBcsr::from_csr(self)
    }

    /// Converts to an `nalgebra-sparse` matrix. Fails if a row has unsorted or duplicate column
    /// indices.
    pub fn to_nalgebra(&self) -> Result<CsrMatrix<T>> {
        CsrMatrix::try_from_csr_data(
            self.layout.rows(),
            self.layout.columns(),
            self.row_ptr().to_vec(),
            self.col_idx().to_vec(),
            self.values().to_vec(),
        )
        .map_err(|err| LafemError::InvalidLayout(err.to_string()))
    }

    /// Scalar entries of a CSR matrix grouped into blocks, keyed by block column per block row.
    pub(crate) fn blocks(&self, block_height: usize, block_width: usize) -> Vec<BTreeMap<usize, Vec<T>>> {
        let mut block_rows = vec![BTreeMap::new(); self.layout.rows() / block_height];
        for i in 0..self.layout.rows() {
            let (cols, vals) = self.row(i);
            for (&j, &v) in cols.iter().zip(vals) {
                let block = block_rows[i / block_height]
                    .entry(j / block_width)
                    .or_insert_with(|| vec![T::zero(); block_height * block_width]);
                block[(i % block_height) * block_width + j % block_width] += v;
            }
        }
        block_rows
    }
}

impl<'a, T: Real> From<&'a CsrMatrix<T>> for SparseMatrixCsr<T> {
    fn from(matrix: &'a CsrMatrix<T>) -> Self {
        Self::from_sorted_parts(
            &MemoryArena::default(),
            matrix.nrows(),
            matrix.ncols(),
            matrix.row_offsets().to_vec(),
            matrix.col_indices().to_vec(),
            matrix.values().to_vec(),
        )
    }
}

impl<T: Real> LinearOperator<T> for SparseMatrixCsr<T> {
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
        product_matvec_csr(self.backend(), r, acc, self.row_ptr(), self.col_idx(), self.values(), x);
    }
}
