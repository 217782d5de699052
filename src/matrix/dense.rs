use crate::container::{CloneMode, LinearOperator};
use crate::error::{check_dims, LafemError, Result};
use crate::matrix::SparseMatrixCsr;
use crate::memory::{Buffer, MemoryArena};
use crate::vector::DenseVector;
use lafem_arch::product_matvec::{product_matvec_dense, Accumulate};
use lafem_arch::transpose::transpose_dense;
use lafem_arch::{Backend, Real};
use log::debug;
use nalgebra::DMatrix;

/// A dense matrix stored in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix<T> {
    rows: usize,
    columns: usize,
    values: Buffer<T>,
}

impl<T: Real> Default for DenseMatrix<T> {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl<T: Real> DenseMatrix<T> {
    pub fn new(rows: usize, columns: usize) -> Self {
        Self::new_in(&MemoryArena::default(), rows, columns)
    }

    pub fn new_in(arena: &MemoryArena, rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            values: arena.allocate(rows * columns),
        }
    }

    pub fn from_row_slice(rows: usize, columns: usize, values: &[T]) -> Result<Self> {
        check_dims("DenseMatrix::from_row_slice", rows * columns, values.len())?;
        Ok(Self {
            rows,
            columns,
            values: MemoryArena::default().upload(values),
        })
    }

    pub fn from_nalgebra(matrix: &DMatrix<T>) -> Self {
        let row_major = matrix.transpose();
        Self {
            rows: matrix.nrows(),
            columns: matrix.ncols(),
            values: MemoryArena::default().upload(row_major.as_slice()),
        }
    }

    pub fn to_nalgebra(&self) -> DMatrix<T> {
        DMatrix::from_row_slice(self.rows, self.columns, self.values())
    }

    pub fn values(&self) -> &[T] {
        self.values.as_slice()
    }

    pub fn values_mut(&mut self) -> &mut [T] {
        self.values.as_mut_slice()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        (row < self.rows && col < self.columns).then(|| self.values()[row * self.columns + col])
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.rows {
            return Err(LafemError::IndexOutOfBounds {
                index: row,
                size: self.rows,
            });
        }
        if col >= self.columns {
            return Err(LafemError::IndexOutOfBounds {
                index: col,
                size: self.columns,
            });
        }
        let columns = self.columns;
        self.values_mut()[row * columns + col] = value;
        Ok(())
    }

    pub fn format(&mut self, value: T) {
        self.values_mut().fill(value);
    }

    pub fn clone_with(&self, mode: CloneMode) -> Self {
        match mode {
            CloneMode::Weak => self.clone(),
            CloneMode::Shallow | CloneMode::Deep => Self {
                values: self.values.deep_clone(),
                ..self.clone()
            },
        }
    }

    pub fn transpose(&self) -> Self {
        let mut result = Self::new_in(&self.values.arena(), self.columns, self.rows);
        transpose_dense(result.values_mut(), self.values(), self.rows, self.columns);
        result
    }

    /// Row sums.
    pub fn lumping(&self) -> DenseVector<T> {
        let columns = self.columns;
        let sums = (0..self.rows)
            .map(|i| self.values()[i * columns..(i + 1) * columns].iter().fold(T::zero(), |sum, v| sum + *v))
            .collect();
        DenseVector::from_vec_in(&self.values.arena(), sums)
    }

    /// Converts to CSR, storing only the non-zero entries.
    pub fn to_csr(&self) -> SparseMatrixCsr<T> {
        debug!("Converting {}x{} dense matrix to CSR", self.rows, self.columns);
        let mut row_ptr = Vec::with_capacity(self.rows + 1);
        let mut col_idx = Vec::new();
        let mut values = Vec::new();
        row_ptr.push(0);
        for i in 0..self.rows {
            for j in 0..self.columns {
                let v = self.values()[i * self.columns + j];
                if v != T::zero() {
                    col_idx.push(j);
                    values.push(v);
                }
            }
            row_ptr.push(col_idx.len());
        }
        SparseMatrixCsr::from_sorted_parts(&self.values.arena(), self.rows, self.columns, row_ptr, col_idx, values)
    }
}

impl<T: Real> LinearOperator<T> for DenseMatrix<T> {
    fn rows(&self) -> usize {
        self.rows
    }

    fn columns(&self) -> usize {
        self.columns
    }

    fn used_elements(&self) -> usize {
        self.rows * self.columns
    }

    fn backend(&self) -> Backend {
        self.values.backend()
    }

    fn apply_unchecked(&self, r: &mut [T], acc: Accumulate<T>, x: &[T]) {
        product_matvec_dense(self.backend(), r, acc, self.values(), self.rows, self.columns, x);
    }
}
