//! Unit filters for Dirichlet-type constraints.
//!
//! A unit filter holds the constrained indices of a vector together with their prescribed values.
//! Right-hand sides and solutions get the prescribed values, defects and corrections get zero,
//! and system matrices get unit rows at the constrained indices.
use crate::container::{LinearOperator, LocalVector};
use crate::error::{check_dims, Result};
use crate::matrix::SparseMatrixCsr;
use crate::vector::{DenseVector, DenseVectorBlocked, SparseVector, SparseVectorBlocked};
use lafem_arch::unit_filter::{filter_def, filter_rhs, filter_unit_rows_csr};
use lafem_arch::Real;
use nalgebra::SVector;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UnitFilter<T: Real> {
    values: SparseVector<T>,
}

impl<T: Real> UnitFilter<T> {
    /// A filter without constraints for vectors of the given size.
    pub fn new(size: usize) -> Self {
        Self {
            values: SparseVector::new(size),
        }
    }

    pub fn from_sparse(values: SparseVector<T>) -> Self {
        Self { values }
    }

    /// Constrains `index` to `value`.
    pub fn add(&mut self, index: usize, value: T) -> Result<()> {
        self.values.set(index, value)
    }

    pub fn filter_vector(&self) -> &SparseVector<T> {
        &self.values
    }

    pub fn size(&self) -> usize {
        self.values.size()
    }

    pub fn used_elements(&self) -> usize {
        self.values.used_elements()
    }

    /// Overwrites the constrained entries with the prescribed values.
    pub fn filter_rhs(&self, v: &mut DenseVector<T>) -> Result<()> {
        check_dims("filter_rhs", self.size(), v.size())?;
        filter_rhs(v.as_mut_slice(), self.values.elements(), self.values.indices(), 1);
        Ok(())
    }

    pub fn filter_sol(&self, v: &mut DenseVector<T>) -> Result<()> {
        self.filter_rhs(v)
    }

    /// Zeroes the constrained entries.
    pub fn filter_def(&self, v: &mut DenseVector<T>) -> Result<()> {
        check_dims("filter_def", self.size(), v.size())?;
        filter_def(v.as_mut_slice(), self.values.indices(), 1);
        Ok(())
    }

    pub fn filter_cor(&self, v: &mut DenseVector<T>) -> Result<()> {
        self.filter_def(v)
    }

    /// Replaces the constrained rows by unit rows.
    ///
    /// Rows without a stored diagonal entry become zero rows.
    pub fn filter_mat(&self, matrix: &mut SparseMatrixCsr<T>) -> Result<()> {
        check_dims("filter_mat", self.size(), matrix.rows())?;
        let indices = self.values.indices();
        let (layout, values) = matrix.layout_and_values_mut();
        filter_unit_rows_csr(values, layout.indices(0), layout.indices(1), indices);
        Ok(())
    }
}

/// Unit filter on blocked vectors. Whole blocks are constrained.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UnitFilterBlocked<T: Real, const B: usize> {
    values: SparseVectorBlocked<T, B>,
}

impl<T: Real, const B: usize> UnitFilterBlocked<T, B> {
    pub fn new(blocks: usize) -> Self {
        Self {
            values: SparseVectorBlocked::new(blocks),
        }
    }

    pub fn from_sparse(values: SparseVectorBlocked<T, B>) -> Self {
        Self { values }
    }

    pub fn add(&mut self, index: usize, value: &SVector<T, B>) -> Result<()> {
        self.values.set(index, value)
    }

    pub fn filter_vector(&self) -> &SparseVectorBlocked<T, B> {
        &self.values
    }

    pub fn size(&self) -> usize {
        self.values.size()
    }

    pub fn used_elements(&self) -> usize {
        self.values.used_elements()
    }

    pub fn filter_rhs(&self, v: &mut DenseVectorBlocked<T, B>) -> Result<()> {
        check_dims("filter_rhs", self.size(), v.size())?;
        filter_rhs(v.values_mut(), self.values.elements(), self.values.indices(), B);
        Ok(())
    }

    pub fn filter_sol(&self, v: &mut DenseVectorBlocked<T, B>) -> Result<()> {
        self.filter_rhs(v)
    }

    pub fn filter_def(&self, v: &mut DenseVectorBlocked<T, B>) -> Result<()> {
        check_dims("filter_def", self.size(), v.size())?;
        filter_def(v.values_mut(), self.values.indices(), B);
        Ok(())
    }

    pub fn filter_cor(&self, v: &mut DenseVectorBlocked<T, B>) -> Result<()> {
        self.filter_def(v)
    }
}
