use crate::container::{check_backend, CloneMode, LinearOperator};
use crate::error::{check_dims, LafemError, Result};
use crate::layout::{LayoutKind, SparseLayout};
use crate::matrix::SparseMatrixCsr;
use crate::memory::{Buffer, MemoryArena};
use crate::vector::DenseVector;
use lafem_arch::product_matvec::{product_matvec_bcsr, Accumulate};
use lafem_arch::{diagonal, lumping, scale_row_col, Backend, Real};
use log::debug;
use nalgebra::SMatrix;

/// A CSR matrix of dense `BH x BW` blocks.
///
/// The layout addresses blocks; each block stores its `BH * BW` values in row-major order. Rows,
/// columns and vectors the matrix acts on are measured in scalars.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrixBcsr<T, const BH: usize, const BW: usize> {
    layout: SparseLayout,
    values: Buffer<T>,
}

impl<T: Real, const BH: usize, const BW: usize> SparseMatrixBcsr<T, BH, BW> {
    const BLOCK_LEN: usize = BH * BW;

    pub fn from_layout(layout: SparseLayout, values: Vec<T>) -> Result<Self> {
        if layout.kind() != LayoutKind::Bcsr || layout.block_shape() != (BH, BW) {
            return Err(LafemError::InvalidLayout(format!(
                "expected a BCSR layout with {}x{} blocks, got {:?} with {:?}",
                BH,
                BW,
                layout.kind(),
                layout.block_shape()
            )));
        }
        check_dims(
            "SparseMatrixBcsr::from_layout",
            layout.indices(1).len() * Self::BLOCK_LEN,
            values.len(),
        )?;
        Ok(Self {
            layout,
            values: MemoryArena::default().adopt(values),
        })
    }

    /// Groups the entries of a CSR matrix into blocks. Blocks touched by at least one stored
    /// entry become stored blocks; their remaining entries are zero.
    pub fn from_csr(csr: &SparseMatrixCsr<T>) -> Result<Self> {
        check_dims("SparseMatrixBcsr::from_csr", csr.rows() / BH * BH, csr.rows())?;
        check_dims("SparseMatrixBcsr::from_csr", csr.columns() / BW * BW, csr.columns())?;
        debug!("Converting CSR matrix to BCSR with {}x{} blocks", BH, BW);
        let mut row_ptr = vec![0];
        let mut col_idx = Vec::new();
        let mut values = Vec::new();
        for block_row in csr.blocks(BH, BW) {
            for (block_col, block) in block_row {
                col_idx.push(block_col);
                values.extend(block);
            }
            row_ptr.push(col_idx.len());
        }
        Ok(Self {
            layout: SparseLayout::from_trusted(
                LayoutKind::Bcsr,
                csr.rows() / BH,
                csr.columns() / BW,
                (BH, BW),
                0,
                vec![row_ptr, col_idx],
            ),
            values: csr.arena().adopt(values),
        })
    }

    /// Expands every stored block into scalar entries, zeros included.
    pub fn to_csr(&self) -> SparseMatrixCsr<T> {
        debug!("Converting BCSR matrix to CSR");
        let row_ptr_b = self.row_ptr();
        let mut row_ptr = vec![0];
        let mut col_idx = Vec::new();
        let mut values = Vec::new();
        for block_row in 0..self.block_rows() {
            for bi in 0..BH {
                for k in row_ptr_b[block_row]..row_ptr_b[block_row + 1] {
                    let block = &self.values()[k * Self::BLOCK_LEN..(k + 1) * Self::BLOCK_LEN];
                    for bj in 0..BW {
                        col_idx.push(self.col_idx()[k] * BW + bj);
                        values.push(block[bi * BW + bj]);
                    }
                }
                row_ptr.push(col_idx.len());
            }
        }
        SparseMatrixCsr::from_sorted_parts(
            &self.values.arena(),
            self.rows(),
            self.columns(),
            row_ptr,
            col_idx,
            values,
        )
        .sorted()
    }

    pub fn layout(&self) -> &SparseLayout {
        &self.layout
    }

    pub fn block_rows(&self) -> usize {
        self.layout.rows()
    }

    pub fn block_columns(&self) -> usize {
        self.layout.columns()
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

    pub fn get_block(&self, block_row: usize, block_col: usize) -> Option<SMatrix<T, BH, BW>> {
        if block_row >= self.block_rows() || block_col >= self.block_columns() {
            return None;
        }
        let row_ptr = self.row_ptr();
        let block = (row_ptr[block_row]..row_ptr[block_row + 1])
            .find(|&k| self.col_idx()[k] == block_col)
            .map_or_else(SMatrix::zeros, |k| {
                SMatrix::from_row_slice(&self.values()[k * Self::BLOCK_LEN..(k + 1) * Self::BLOCK_LEN])
            });
        Some(block)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        self.get_block(row / BH, col / BW)
            .map(|block| block[(row % BH, col % BW)])
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

    /// The main diagonal. Only defined for square blocks.
    pub fn diagonal(&self) -> Result<DenseVector<T>> {
        check_dims("diagonal", BH, BW)?;
        let mut r = DenseVector::new_in(&self.values.arena(), self.rows());
        diagonal::diagonal_bcsr(
            self.backend(),
            r.as_mut_slice(),
            self.row_ptr(),
            self.col_idx(),
            self.values(),
            BH,
        );
        Ok(r)
    }

    pub fn lumping(&self) -> DenseVector<T> {
        let mut r = DenseVector::new_in(&self.values.arena(), self.rows());
        lumping::lumping_bcsr(self.backend(), r.as_mut_slice(), self.row_ptr(), self.values(), BH, BW);
        r
    }

    pub fn scale_rows(&mut self, s: &DenseVector<T>) -> Result<()> {
        check_dims("scale_rows", self.rows(), s.as_slice().len())?;
        check_backend(self.backend(), s.buffer().backend())?;
        scale_row_col::scale_rows_bcsr(
            self.values.as_mut_slice(),
            self.layout.indices(0),
            s.as_slice(),
            BH,
            BW,
        );
        Ok(())
    }

    pub fn scale_cols(&mut self, s: &DenseVector<T>) -> Result<()> {
        check_dims("scale_cols", self.columns(), s.as_slice().len())?;
        check_backend(self.backend(), s.buffer().backend())?;
        scale_row_col::scale_cols_bcsr(
            self.values.as_mut_slice(),
            self.layout.indices(1),
            s.as_slice(),
            BH,
            BW,
        );
        Ok(())
    }
}

impl<T: Real, const BH: usize, const BW: usize> LinearOperator<T> for SparseMatrixBcsr<T, BH, BW> {
    fn rows(&self) -> usize {
        self.block_rows() * BH
    }

    fn columns(&self) -> usize {
        self.block_columns() * BW
    }

    fn used_elements(&self) -> usize {
        self.values.len()
    }

    fn backend(&self) -> Backend {
        self.values.backend()
    }

    fn apply_unchecked(&self, r: &mut [T], acc: Accumulate<T>, x: &[T]) {
        product_matvec_bcsr(
            self.backend(),
            r,
            acc,
            self.row_ptr(),
            self.col_idx(),
            self.values(),
            x,
            BH,
            BW,
        );
    }
}
