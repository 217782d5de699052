use crate::container::{CloneMode, LinearOperator};
use crate::error::{check_dims, LafemError, Result};
use crate::layout::{LayoutKind, SparseLayout};
use crate::matrix::SparseMatrixCsr;
use crate::memory::{Buffer, MemoryArena};
use itertools::Itertools;
use lafem_arch::product_matvec::{product_matvec_banded, Accumulate};
use lafem_arch::{Backend, Real};
use log::debug;

/// A sparse matrix whose entries lie on a set of diagonals.
///
/// Diagonal `d = col - row` is stored as the encoded offset `d + rows - 1`, and offsets are kept
/// in ascending order. Band `a` stores one value per row in `values[a * rows..(a + 1) * rows]`;
/// positions whose column falls outside the matrix are padding.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrixBanded<T> {
    layout: SparseLayout,
    values: Buffer<T>,
}

impl<T: Real> Default for SparseMatrixBanded<T> {
    fn default() -> Self {
        Self::from_csr(&SparseMatrixCsr::zeros(0, 0))
    }
}

impl<T: Real> SparseMatrixBanded<T> {
    /// Builds a banded matrix from diagonal offsets `col - row` and band-major values.
    ///
    /// Offsets must be strictly increasing and every band must intersect the matrix.
    pub fn from_bands(rows: usize, columns: usize, diagonals: &[isize], values: Vec<T>) -> Result<Self> {
        check_dims("SparseMatrixBanded::from_bands", diagonals.len() * rows, values.len())?;
        let offsets = diagonals
            .iter()
            .map(|&d| {
                let encoded = d + rows as isize - 1;
                if encoded < 0 || d >= columns as isize {
                    Err(LafemError::InvalidLayout(format!(
                        "diagonal {} lies outside a {}x{} matrix",
                        d, rows, columns
                    )))
                } else {
                    Ok(encoded as usize)
                }
            })
            .collect::<Result<Vec<_>>>()?;
        let layout = SparseLayout::banded(rows, columns, offsets)?;
        Self::from_layout(layout, values)
    }

    pub fn from_layout(layout: SparseLayout, values: Vec<T>) -> Result<Self> {
        Self::from_layout_in(&MemoryArena::default(), layout, values)
    }

    /// Wraps `values` stored according to `layout`, placing them in `arena`.
    pub fn from_layout_in(arena: &MemoryArena, layout: SparseLayout, values: Vec<T>) -> Result<Self> {
        if layout.kind() != LayoutKind::Banded {
            return Err(LafemError::InvalidLayout(format!(
                "expected a banded layout, got {:?}",
                layout.kind()
            )));
        }
        check_dims(
            "SparseMatrixBanded::from_layout",
            layout.indices(0).len() * layout.rows(),
            values.len(),
        )?;
        Ok(Self {
            layout,
            values: arena.adopt(values),
        })
    }

    /// Stores every diagonal of `csr` that holds at least one entry.
    pub fn from_csr(csr: &SparseMatrixCsr<T>) -> Self {
        debug!("Converting CSR matrix to banded format");
        let rows = csr.rows();
        let offsets: Vec<usize> = (0..rows)
            .flat_map(|i| csr.row(i).0.iter().map(move |&j| j + rows - 1 - i))
            .sorted_unstable()
            .dedup()
            .collect();
        let mut values = vec![T::zero(); offsets.len() * rows];
        for i in 0..rows {
            let (cols, vals) = csr.row(i);
            for (&j, &v) in cols.iter().zip(vals) {
                // Every diagonal was collected above
                if let Ok(a) = offsets.binary_search(&(j + rows - 1 - i)) {
                    values[a * rows + i] += v;
                }
            }
        }
        Self {
            layout: SparseLayout::from_trusted(LayoutKind::Banded, rows, csr.columns(), (1, 1), 0, vec![offsets]),
            values: csr.arena().adopt(values),
        }
    }

    /// Converts to CSR, keeping every in-range band position as a stored entry.
    pub fn to_csr(&self) -> SparseMatrixCsr<T> {
        debug!("Converting banded matrix to CSR");
        let rows = self.layout.rows();
        let mut row_ptr = Vec::with_capacity(rows + 1);
        let mut col_idx = Vec::new();
        let mut values = Vec::new();
        row_ptr.push(0);
        for l in 0..rows {
            for (a, &offset) in self.offsets().iter().enumerate() {
                if let Some(j) = self.column_of(l, offset) {
                    col_idx.push(j);
                    values.push(self.values()[a * rows + l]);
                }
            }
            row_ptr.push(col_idx.len());
        }
        SparseMatrixCsr::from_sorted_parts(
            &self.values.arena(),
            rows,
            self.layout.columns(),
            row_ptr,
            col_idx,
            values,
        )
    }

    fn column_of(&self, row: usize, offset: usize) -> Option<usize> {
        let rows = self.layout.rows();
        (row + offset + 1)
            .checked_sub(rows)
            .filter(|&j| j < self.layout.columns())
    }

    pub fn layout(&self) -> &SparseLayout {
        &self.layout
    }

    /// Encoded band offsets, `col - row + rows - 1`.
    pub fn offsets(&self) -> &[usize] {
        self.layout.indices(0)
    }

    /// Band offsets as `col - row`.
    pub fn diagonals(&self) -> Vec<isize> {
        let rows = self.layout.rows() as isize;
        self.offsets().iter().map(|&o| o as isize - rows + 1).collect()
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

    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        let rows = self.layout.rows();
        if row >= rows || col >= self.layout.columns() {
            return None;
        }
        Some(
            self.offsets()
                .binary_search(&(col + rows - 1 - row))
                .map_or(T::zero(), |a| self.values()[a * rows + row]),
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
}

impl<T: Real> LinearOperator<T> for SparseMatrixBanded<T> {
    fn rows(&self) -> usize {
        self.layout.rows()
    }

    fn columns(&self) -> usize {
        self.layout.columns()
    }

    /// Number of stored values, including padding.
    fn used_elements(&self) -> usize {
        self.values.len()
    }

    fn backend(&self) -> Backend {
        self.values.backend()
    }

    fn apply_unchecked(&self, r: &mut [T], acc: Accumulate<T>, x: &[T]) {
        product_matvec_banded(
            self.backend(),
            r,
            acc,
            self.values(),
            self.offsets(),
            self.layout.rows(),
            self.layout.columns(),
            x,
        );
    }
}
