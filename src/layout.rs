//! Shared sparsity layouts.
//!
//! A [`SparseLayout`] holds the index arrays of a sparse matrix separately from its values. Any
//! number of matrices may share one layout: cloning the layout only bumps a reference count, and
//! the index arrays are released together with the last matrix referencing them.
use crate::error::{LafemError, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The storage format a layout describes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayoutKind {
    /// Index arrays: `[row_ptr, col_idx]`.
    Csr,
    /// Index arrays: `[row_idx, col_idx]`, grouped by ascending row.
    Coo,
    /// Index arrays: `[col_idx, row_len]`, column-major with stride.
    Ell,
    /// Index arrays: `[offsets]`, encoded as `offset + rows - 1`.
    Banded,
    /// Index arrays: `[row_ptr, col_idx]` over blocks.
    Bcsr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LayoutData {
    kind: LayoutKind,
    rows: usize,
    columns: usize,
    block_height: usize,
    block_width: usize,
    stride: usize,
    indices: Vec<Vec<usize>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseLayout {
    data: Arc<LayoutData>,
}

/// Rounds the row count of an ELL matrix up to the next multiple of this value.
pub const ELL_STRIDE_ALIGNMENT: usize = 32;

impl SparseLayout {
    /// CSR layout with `rows x columns` scalar dimensions.
    pub fn csr(rows: usize, columns: usize, row_ptr: Vec<usize>, col_idx: Vec<usize>) -> Result<Self> {
        Self::from_data(LayoutData {
            kind: LayoutKind::Csr,
            rows,
            columns,
            block_height: 1,
            block_width: 1,
            stride: 0,
            indices: vec![row_ptr, col_idx],
        })
    }

    /// CSR layout with zero-initialized index arrays of the right size, to be filled by a symbolic
    /// assembly step before use.
    pub fn csr_zeroed(rows: usize, columns: usize, nnz: usize) -> Self {
        Self::wrap(LayoutData {
            kind: LayoutKind::Csr,
            rows,
            columns,
            block_height: 1,
            block_width: 1,
            stride: 0,
            indices: vec![vec![0; rows + 1], vec![0; nnz]],
        })
    }

    pub fn coo(rows: usize, columns: usize, row_idx: Vec<usize>, col_idx: Vec<usize>) -> Result<Self> {
        Self::from_data(LayoutData {
            kind: LayoutKind::Coo,
            rows,
            columns,
            block_height: 1,
            block_width: 1,
            stride: 0,
            indices: vec![row_idx, col_idx],
        })
    }

    pub fn ell(rows: usize, columns: usize, stride: usize, col_idx: Vec<usize>, row_len: Vec<usize>) -> Result<Self> {
        Self::from_data(LayoutData {
            kind: LayoutKind::Ell,
            rows,
            columns,
            block_height: 1,
            block_width: 1,
            stride,
            indices: vec![col_idx, row_len],
        })
    }

    pub fn banded(rows: usize, columns: usize, offsets: Vec<usize>) -> Result<Self> {
        Self::from_data(LayoutData {
            kind: LayoutKind::Banded,
            rows,
            columns,
            block_height: 1,
            block_width: 1,
            stride: 0,
            indices: vec![offsets],
        })
    }

    /// Blocked CSR layout. `block_rows` and `block_columns` count blocks, not scalars.
    pub fn bcsr(
        block_rows: usize,
        block_columns: usize,
        block_height: usize,
        block_width: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
    ) -> Result<Self> {
        Self::from_data(LayoutData {
            kind: LayoutKind::Bcsr,
            rows: block_rows,
            columns: block_columns,
            block_height,
            block_width,
            stride: 0,
            indices: vec![row_ptr, col_idx],
        })
    }

    fn from_data(data: LayoutData) -> Result<Self> {
        let layout = Self::wrap(data);
        layout.check_array_count()?;
        if cfg!(debug_assertions) {
            layout.validate()?;
        }
        Ok(layout)
    }

    /// Wraps index arrays produced by an internal conversion. Validation only runs in debug
    /// builds, as an assertion.
    pub(crate) fn from_trusted(
        kind: LayoutKind,
        rows: usize,
        columns: usize,
        (block_height, block_width): (usize, usize),
        stride: usize,
        indices: Vec<Vec<usize>>,
    ) -> Self {
        let layout = Self::wrap(LayoutData {
            kind,
            rows,
            columns,
            block_height,
            block_width,
            stride,
            indices,
        });
        debug_assert!(layout.validate().is_ok(), "{:?}", layout.validate());
        layout
    }

    fn wrap(data: LayoutData) -> Self {
        Self { data: Arc::new(data) }
    }

    fn check_array_count(&self) -> Result<()> {
        let expected = match self.kind() {
            LayoutKind::Banded => 1,
            _ => 2,
        };
        if self.data.indices.len() == expected {
            Ok(())
        } else {
            Err(LafemError::InvalidLayout(format!(
                "{:?} layout requires {} index arrays, got {}",
                self.kind(),
                expected,
                self.data.indices.len()
            )))
        }
    }

    pub fn kind(&self) -> LayoutKind {
        self.data.kind
    }

    /// Number of rows (block rows for BCSR).
    pub fn rows(&self) -> usize {
        self.data.rows
    }

    /// Number of columns (block columns for BCSR).
    pub fn columns(&self) -> usize {
        self.data.columns
    }

    pub fn block_shape(&self) -> (usize, usize) {
        (self.data.block_height, self.data.block_width)
    }

    /// Column-major stride of ELL layouts, zero otherwise.
    pub fn stride(&self) -> usize {
        self.data.stride
    }

    /// The `i`-th index array, see [`LayoutKind`] for the ordering.
    pub fn indices(&self, i: usize) -> &[usize] {
        &self.data.indices[i]
    }

    pub fn num_index_arrays(&self) -> usize {
        self.data.indices.len()
    }

    /// Number of stored entries (blocks for BCSR, bands for banded layouts).
    pub fn used_entries(&self) -> usize {
        match self.kind() {
            LayoutKind::Csr | LayoutKind::Coo | LayoutKind::Bcsr => self.indices(1).len(),
            LayoutKind::Ell => self.indices(1).iter().sum(),
            LayoutKind::Banded => self.indices(0).len(),
        }
    }

    /// Number of other holders of the same index arrays, plus one.
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.data)
    }

    pub fn shares_indices_with(&self, other: &SparseLayout) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// A copy of the layout that does not share its index arrays.
    pub fn deep_clone(&self) -> Self {
        Self::wrap((*self.data).clone())
    }

    /// Mutable access to the index arrays, detaching from other holders first.
    pub(crate) fn indices_mut(&mut self, i: usize) -> &mut Vec<usize> {
        &mut Arc::make_mut(&mut self.data).indices[i]
    }

    /// Checks the structural invariants of the index arrays.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(LafemError::InvalidLayout(msg));
        let rows = self.rows();
        let columns = self.columns();
        match self.kind() {
            LayoutKind::Csr | LayoutKind::Bcsr => {
                let row_ptr = self.indices(0);
                let col_idx = self.indices(1);
                if row_ptr.len().checked_sub(1) != Some(rows) {
                    return invalid(format!("row_ptr has length {}, expected one more than {}", row_ptr.len(), rows));
                }
                if row_ptr[0] != 0 {
                    return invalid("row_ptr must start at zero".to_string());
                }
                if row_ptr.iter().tuple_windows().any(|(prev, next)| prev > next) {
                    return invalid("row_ptr must be non-decreasing".to_string());
                }
                if row_ptr[rows] != col_idx.len() {
                    return invalid(format!(
                        "row_ptr ends at {}, but there are {} column indices",
                        row_ptr[rows],
                        col_idx.len()
                    ));
                }
                if let Some(j) = col_idx.iter().find(|&&j| j >= columns) {
                    return invalid(format!("column index {} out of bounds for {} columns", j, columns));
                }
            }
            LayoutKind::Coo => {
                let row_idx = self.indices(0);
                let col_idx = self.indices(1);
                if row_idx.len() != col_idx.len() {
                    return invalid("row and column index arrays differ in length".to_string());
                }
                if row_idx.iter().any(|&i| i >= rows) || col_idx.iter().any(|&j| j >= columns) {
                    return invalid("coordinate out of bounds".to_string());
                }
                if row_idx.iter().tuple_windows().any(|(prev, next)| prev > next) {
                    return invalid("coordinates must be grouped by ascending row".to_string());
                }
            }
            LayoutKind::Ell => {
                let col_idx = self.indices(0);
                let row_len = self.indices(1);
                let stride = self.stride();
                if row_len.len() != rows {
                    return invalid(format!("row_len has length {}, expected {}", row_len.len(), rows));
                }
                if stride < rows {
                    return invalid(format!("stride {} smaller than row count {}", stride, rows));
                }
                let max_len = row_len.iter().copied().max().unwrap_or(0);
                if stride.checked_mul(max_len) != Some(col_idx.len()) {
                    return invalid(format!(
                        "col_idx has length {}, expected {} rows of stride {}",
                        col_idx.len(),
                        max_len,
                        stride
                    ));
                }
                for (row, &len) in row_len.iter().enumerate() {
                    if (0..len).any(|n| col_idx[row + n * stride] >= columns) {
                        return invalid(format!("row {} has a column index out of bounds", row));
                    }
                }
            }
            LayoutKind::Banded => {
                let offsets = self.indices(0);
                if offsets.iter().tuple_windows().any(|(prev, next)| prev >= next) {
                    return invalid("band offsets must be strictly increasing".to_string());
                }
                if offsets.iter().any(|&o| o >= rows.saturating_add(columns).saturating_sub(1)) {
                    return invalid("band offset outside of the matrix".to_string());
                }
            }
        }
        Ok(())
    }
}

/// Rounds `rows` up to the ELL stride alignment.
pub fn ell_stride(rows: usize) -> usize {
    (rows + ELL_STRIDE_ALIGNMENT - 1) / ELL_STRIDE_ALIGNMENT * ELL_STRIDE_ALIGNMENT
}
