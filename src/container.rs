//! Functionality shared by all containers.
use crate::error::{check_dims, LafemError, Result};
use crate::memory::MemoryArena;
use crate::vector::DenseVector;
use lafem_arch::blas1;
use lafem_arch::product_matvec::Accumulate;
use lafem_arch::reduce;
use lafem_arch::{Backend, BinaryOperands, Real, UnaryOperands};
use serde::{Deserialize, Serialize};

/// How much storage a clone shares with its source.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CloneMode {
    /// Shares values and indices. Storage is copied on the first mutation of either side.
    Weak,
    /// Shares indices, duplicates values.
    Shallow,
    /// Duplicates values and indices.
    Deep,
}

/// An operand of a container operation: either the container the operation is invoked on, or
/// another container.
///
/// Borrowing rules prevent passing a container as an input to an operation that mutates it, so
/// "the output is also this input" is expressed with [`Operand::This`].
#[derive(Debug)]
pub enum Operand<'a, V> {
    This,
    Other(&'a V),
}

impl<'a, V> Clone for Operand<'a, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, V> Copy for Operand<'a, V> {}

impl<'a, V> From<&'a V> for Operand<'a, V> {
    fn from(v: &'a V) -> Self {
        Operand::Other(v)
    }
}

pub(crate) fn check_backend(left: Backend, right: Backend) -> Result<()> {
    if left == right {
        Ok(())
    } else {
        Err(LafemError::BackendMismatch { left, right })
    }
}

/// Resolves two operands to the aliasing configuration understood by the kernels.
pub(crate) fn binary_operands<'a, T>(r: &'a mut [T], x: Option<&'a [T]>, y: Option<&'a [T]>) -> BinaryOperands<'a, T> {
    match (x, y) {
        (Some(x), Some(y)) => BinaryOperands::Disjoint { r, x, y },
        (None, Some(y)) => BinaryOperands::AliasX { r, y },
        (Some(x), None) => BinaryOperands::AliasY { r, x },
        (None, None) => BinaryOperands::AliasBoth { r },
    }
}

/// A vector whose entries are stored contiguously in a single value buffer.
///
/// This is the interface the global layer builds on. Blocked vectors expose their scalar entries
/// block by block, so `values().len() == size() * block_size()`.
///
/// All arithmetic is provided on top of the required accessors. Operations validate extents and
/// backends before dispatching to the kernels of the vector's backend.
pub trait LocalVector<T: Real>: Clone + Send + Sync + Sized {
    /// Number of (block) entries.
    fn size(&self) -> usize;

    /// Number of scalars per entry.
    fn block_size(&self) -> usize;

    fn values(&self) -> &[T];

    fn values_mut(&mut self) -> &mut [T];

    fn arena(&self) -> MemoryArena;

    fn clone_with(&self, mode: CloneMode) -> Self;

    /// A zero vector of the same shape on the same arena.
    fn create_like(&self) -> Self {
        let mut v = self.clone_with(CloneMode::Deep);
        v.format(T::zero());
        v
    }

    fn backend(&self) -> Backend {
        self.arena().backend()
    }

    fn scalar_size(&self) -> usize {
        self.size() * self.block_size()
    }

    fn format(&mut self, value: T) {
        let backend = self.backend();
        blas1::fill(backend, self.values_mut(), value);
    }

    fn copy_from(&mut self, other: &Self) -> Result<()> {
        self.check_compatible("copy", other)?;
        self.values_mut().copy_from_slice(other.values());
        Ok(())
    }

    #[doc(hidden)]
    fn check_compatible(&self, operation: &'static str, other: &Self) -> Result<()> {
        check_dims(operation, self.scalar_size(), other.scalar_size())?;
        check_backend(self.backend(), other.backend())
    }

    #[doc(hidden)]
    fn check_operand(&self, operation: &'static str, operand: Operand<Self>) -> Result<()> {
        match operand {
            Operand::This => Ok(()),
            Operand::Other(other) => self.check_compatible(operation, other),
        }
    }

    /// Computes `this = alpha * x + y`.
    ///
    /// Passing [`Operand::This`] for `x` or `y` selects the in-place evaluation order for that
    /// aliasing configuration (see [`lafem_arch::blas1::axpy`]).
    fn axpy(&mut self, x: Operand<Self>, y: Operand<Self>, alpha: T) -> Result<()> {
        self.check_operand("axpy", x)?;
        self.check_operand("axpy", y)?;
        let backend = self.backend();
        let x = resolve(x);
        let y = resolve(y);
        let operands = binary_operands(self.values_mut(), x, y);
        blas1::axpy(backend, alpha, operands);
        Ok(())
    }

    /// Computes `this = alpha * x`.
    fn scale(&mut self, x: Operand<Self>, alpha: T) -> Result<()> {
        self.check_operand("scale", x)?;
        let backend = self.backend();
        let operands = match resolve(x) {
            Some(x) => UnaryOperands::Disjoint { r: self.values_mut(), x },
            None => UnaryOperands::InPlace { r: self.values_mut() },
        };
        blas1::scale(backend, alpha, operands);
        Ok(())
    }

    /// Computes `this = x .* y`.
    fn component_product(&mut self, x: Operand<Self>, y: Operand<Self>) -> Result<()> {
        self.check_operand("component_product", x)?;
        self.check_operand("component_product", y)?;
        let backend = self.backend();
        let (x, y) = (resolve(x), resolve(y));
        blas1::component_product(backend, binary_operands(self.values_mut(), x, y));
        Ok(())
    }

    /// Computes `this[i] = alpha / x[i]`.
    fn component_invert(&mut self, x: Operand<Self>, alpha: T) -> Result<()> {
        self.check_operand("component_invert", x)?;
        let backend = self.backend();
        let operands = match resolve(x) {
            Some(x) => UnaryOperands::Disjoint { r: self.values_mut(), x },
            None => UnaryOperands::InPlace { r: self.values_mut() },
        };
        blas1::component_invert(backend, alpha, operands);
        Ok(())
    }

    /// Computes `this = x + y`.
    fn sum(&mut self, x: Operand<Self>, y: Operand<Self>) -> Result<()> {
        self.check_operand("sum", x)?;
        self.check_operand("sum", y)?;
        let backend = self.backend();
        let (x, y) = (resolve(x), resolve(y));
        blas1::sum(backend, binary_operands(self.values_mut(), x, y));
        Ok(())
    }

    /// Computes `this = x - y`.
    fn difference(&mut self, x: Operand<Self>, y: Operand<Self>) -> Result<()> {
        self.check_operand("difference", x)?;
        self.check_operand("difference", y)?;
        let backend = self.backend();
        let (x, y) = (resolve(x), resolve(y));
        blas1::difference(backend, binary_operands(self.values_mut(), x, y));
        Ok(())
    }

    fn dot(&self, other: &Self) -> Result<T> {
        self.check_compatible("dot", other)?;
        Ok(blas1::dot(self.backend(), self.values(), other.values()))
    }

    /// Computes `sum_i this[i] * y[i] * z[i]`.
    fn triple_dot(&self, y: &Self, z: &Self) -> Result<T> {
        self.check_compatible("triple_dot", y)?;
        self.check_compatible("triple_dot", z)?;
        Ok(blas1::triple_dot(self.backend(), self.values(), y.values(), z.values()))
    }

    fn norm2sqr(&self) -> T {
        blas1::norm2sqr(self.backend(), self.values())
    }

    fn norm2(&self) -> T {
        blas1::norm2(self.backend(), self.values())
    }

    fn sum_elements(&self) -> T {
        blas1::sum_elements(self.backend(), self.values())
    }

    fn max_element(&self) -> T {
        reduce::max_element(self.backend(), self.values())
    }

    fn min_element(&self) -> T {
        reduce::min_element(self.backend(), self.values())
    }

    fn max_abs_element(&self) -> T {
        reduce::max_abs_element(self.backend(), self.values())
    }

    fn min_abs_element(&self) -> T {
        reduce::min_abs_element(self.backend(), self.values())
    }

    /// Scalar index of the largest entry, `None` if the vector is empty.
    fn max_index(&self) -> Option<usize> {
        reduce::max_index(self.backend(), self.values())
    }

    fn min_index(&self) -> Option<usize> {
        reduce::min_index(self.backend(), self.values())
    }

    fn max_abs_index(&self) -> Option<usize> {
        reduce::max_abs_index(self.backend(), self.values())
    }

    fn min_abs_index(&self) -> Option<usize> {
        reduce::min_abs_index(self.backend(), self.values())
    }
}

fn resolve<'a, T: Real, V: LocalVector<T>>(operand: Operand<'a, V>) -> Option<&'a [T]> {
    match operand {
        Operand::This => None,
        Operand::Other(v) => Some(v.values()),
    }
}

/// A matrix acting on dense vectors.
///
/// Extents are in scalar units for all formats, including blocked ones.
pub trait LinearOperator<T: Real> {
    fn rows(&self) -> usize;

    fn columns(&self) -> usize;

    /// Number of explicitly stored scalars.
    fn used_elements(&self) -> usize;

    fn backend(&self) -> Backend;

    /// Computes `r[i] = acc((A x)_i)` on raw buffers whose extents have been validated.
    fn apply_unchecked(&self, r: &mut [T], acc: Accumulate<T>, x: &[T]);

    #[doc(hidden)]
    fn check_apply(&self, operation: &'static str, r: &DenseVector<T>, x: &DenseVector<T>) -> Result<()> {
        check_dims(operation, self.rows(), r.size())?;
        check_dims(operation, self.columns(), x.size())?;
        check_backend(self.backend(), r.backend())?;
        check_backend(self.backend(), x.backend())
    }

    /// Computes `r = A x`.
    fn apply(&self, r: &mut DenseVector<T>, x: &DenseVector<T>) -> Result<()> {
        self.check_apply("apply", r, x)?;
        self.apply_unchecked(r.as_mut_slice(), Accumulate::Product, x.as_slice());
        Ok(())
    }

    /// Computes `r = alpha A x + y`, where `y` may be `r` itself.
    fn apply_axpy(&self, r: &mut DenseVector<T>, x: &DenseVector<T>, y: Operand<DenseVector<T>>, alpha: T) -> Result<()> {
        self.check_apply("apply_axpy", r, x)?;
        match y {
            Operand::This => {
                self.apply_unchecked(r.as_mut_slice(), Accumulate::AxpyInPlace { alpha }, x.as_slice());
            }
            Operand::Other(y) => {
                check_dims("apply_axpy", self.rows(), y.size())?;
                check_backend(self.backend(), y.backend())?;
                let acc = Accumulate::Axpy { alpha, y: y.as_slice() };
                self.apply_unchecked(r.as_mut_slice(), acc, x.as_slice());
            }
        }
        Ok(())
    }

    /// Computes `r = alpha .* (A x) + y` with a per-row scaling vector.
    fn apply_axpy_vector(
        &self,
        r: &mut DenseVector<T>,
        x: &DenseVector<T>,
        y: &DenseVector<T>,
        alpha: &DenseVector<T>,
    ) -> Result<()> {
        self.check_apply("apply_axpy_vector", r, x)?;
        check_dims("apply_axpy_vector", self.rows(), y.size())?;
        check_dims("apply_axpy_vector", self.rows(), alpha.size())?;
        let acc = Accumulate::AxpyVector {
            alpha: alpha.as_slice(),
            y: y.as_slice(),
        };
        self.apply_unchecked(r.as_mut_slice(), acc, x.as_slice());
        Ok(())
    }

    /// Computes the defect `r = rhs - A x`.
    fn apply_defect(&self, r: &mut DenseVector<T>, rhs: &DenseVector<T>, x: &DenseVector<T>) -> Result<()> {
        self.check_apply("apply_defect", r, x)?;
        check_dims("apply_defect", self.rows(), rhs.size())?;
        check_backend(self.backend(), rhs.backend())?;
        self.apply_unchecked(r.as_mut_slice(), Accumulate::Defect { rhs: rhs.as_slice() }, x.as_slice());
        Ok(())
    }
}
