use crate::container::{check_backend, CloneMode, LinearOperator};
use crate::error::{check_dims, Result};
use crate::layout::{ell_stride, LayoutKind, SparseLayout};
use crate::matrix::SparseMatrixCsr;
use crate::memory::{Buffer, MemoryArena};
use crate::vector::DenseVector;
use lafem_arch::product_matvec::{product_matvec_ell, Accumulate};
use lafem_arch::{diagonal, lumping, scale_row_col, Backend, Real};
use log::debug;

/// A sparse matrix in ELLPACK format.
///
/// Every row stores up to `max_row_len` entries. Values and column indices are stored
/// column-major with a stride padded to a multiple of
/// [`ELL_STRIDE_ALIGNMENT`](crate::layout::ELL_STRIDE_ALIGNMENT), so that the `n`-th entry of row
/// `i` lives at `i + n * stride`. Padding entries carry value zero and column zero.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrixEll<T> {
    layout: SparseLayout,
    values: Buffer<T>,
}

impl<T: Real> Default for SparseMatrixEll<T> {
    fn default() -> Self {
        Self::from_csr(&SparseMatrixCsr::zeros(0, 0))
    }
}

impl<T: Real> SparseMatrixEll<T> {
    pub fn from_csr(csr: &SparseMatrixCsr<T>) -> Self {
        debug!("Converting CSR matrix to ELL");
        let rows = csr.rows();
        let stride = ell_stride(rows);
        let row_len: Vec<usize> = csr.row_ptr().windows(2).map(|w| w[1] - w[0]).collect();
        let max_len = row_len.iter().copied().max().unwrap_or(0);
        let mut col_idx = vec![0; stride * max_len];
        let mut values = vec![T::zero(); stride * max_len];
        for i in 0..rows {
            let (cols, vals) = csr.row(i);
            for (n, (&j, &v)) in cols.iter().zip(vals).enumerate() {
                col_idx[i + n * stride] = j;
                values[i + n * stride] = v;
            }
        }
        Self {
            layout: SparseLayout::from_trusted(
                LayoutKind::Ell,
                rows,
                csr.columns(),
                (1, 1),
                stride,
                vec![col_idx, row_len],
            ),
            values: csr.arena().adopt(values),
        }
    }

    pub fn from_layout(layout: SparseLayout, values: Vec<T>) -> Result<Self> {
        Self::from_layout_in(&MemoryArena::default(), layout, values)
    }

    /// Wraps `values` stored according to `layout`, placing them in `arena`.
    pub fn from_layout_in(arena: &MemoryArena, layout: SparseLayout, values: Vec<T>) -> Result<Self> {
        if layout.kind() != LayoutKind::Ell {
            return Err(crate::error::LafemError::InvalidLayout(format!(
                "expected an ELL layout, got {:?}",
                layout.kind()
            )));
        }
        check_dims("SparseMatrixEll::from_layout", layout.indices(0).len(), values.len())?;
        Ok(Self {
            layout,
            values: arena.adopt(values),
        })
    }

    pub fn to_csr(&self) -> SparseMatrixCsr<T> {
        debug!("Converting ELL matrix to CSR");
        let rows = self.layout.rows();
        let stride = self.stride();
        let mut row_ptr = Vec::with_capacity(rows + 1);
        let mut col_idx = Vec::new();
        let mut values = Vec::new();
        row_ptr.push(0);
        for (i, &len) in self.row_len().iter().enumerate() {
            let mut entries: Vec<_> = (0..len)
                .map(|n| (self.col_idx()[i + n * stride], self.values()[i + n * stride]))
                .collect();
            entries.sort_by_key(|&(j, _)| j);
            for (j, v) in entries {
                col_idx.push(j);
                values.push(v);
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

    pub fn layout(&self) -> &SparseLayout {
        &self.layout
    }

    pub fn stride(&self) -> usize {
        self.layout.stride()
    }

    pub fn col_idx(&self) -> &[usize] {
        self.layout.indices(0)
    }

    pub fn row_len(&self) -> &[usize] {
        self.layout.indices(1)
    }

    pub fn max_row_len(&self) -> usize {
        self.row_len().iter().copied().max().unwrap_or(0)
    }

    /// Stored values including padding.
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
        if row >= self.layout.rows() || col >= self.layout.columns() {
            return None;
        }
        let stride = self.stride();
        Some(
            (0..self.row_len()[row])
                .map(|n| row + n * stride)
                .find(|&k| self.col_idx()[k] == col)
                .map_or(T::zero(), |k| self.values()[k]),
        )
    }

    pub fn format(&mut self, value: T) {
        let stride = self.stride();
        let row_len = self.layout.indices(1).to_vec();
        let values = self.values.as_mut_slice();
        for (i, len) in row_len.into_iter().enumerate() {
            for n in 0..len {
                values[i + n * stride] = value;
            }
        }
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

    pub fn diagonal(&self) -> DenseVector<T> {
        let mut r = DenseVector::new_in(&self.values.arena(), self.layout.rows());
        diagonal::diagonal_ell(
            self.backend(),
            r.as_mut_slice(),
            self.values(),
            self.col_idx(),
            self.row_len(),
            self.stride(),
        );
        r
    }

    pub fn lumping(&self) -> DenseVector<T> {
        let mut r = DenseVector::new_in(&self.values.arena(), self.layout.rows());
        lumping::lumping_ell(self.backend(), r.as_mut_slice(), self.values(), self.row_len(), self.stride());
        r
    }

    pub fn scale_rows(&mut self, s: &DenseVector<T>) -> Result<()> {
        check_dims("scale_rows", self.layout.rows(), s.as_slice().len())?;
        check_backend(self.backend(), s.buffer().backend())?;
        let backend = self.backend();
        let stride = self.stride();
        scale_row_col::scale_rows_ell(backend, self.values.as_mut_slice(), None, stride, s.as_slice());
        Ok(())
    }

    pub fn scale_cols(&mut self, s: &DenseVector<T>) -> Result<()> {
        check_dims("scale_cols", self.layout.columns(), s.as_slice().len())?;
        check_backend(self.backend(), s.buffer().backend())?;
        let backend = self.backend();
        scale_row_col::scale_cols(
            backend,
            self.values.as_mut_slice(),
            None,
            self.layout.indices(0),
            s.as_slice(),
        );
        Ok(())
    }
}

impl<T: Real> LinearOperator<T> for SparseMatrixEll<T> {
    fn rows(&self) -> usize {
        self.layout.rows()
    }

    fn columns(&self) -> usize {
        self.layout.columns()
    }

    /// Number of stored entries, excluding padding.
    fn used_elements(&self) -> usize {
        self.row_len().iter().sum()
    }

    fn backend(&self) -> Backend {
        self.values.backend()
    }

    fn apply_unchecked(&self, r: &mut [T], acc: Accumulate<T>, x: &[T]) {
        product_matvec_ell(
            self.backend(),
            r,
            acc,
            self.values(),
            self.col_idx(),
            self.row_len(),
            self.stride(),
            x,
        );
    }
}
