//! Level-1 kernels: axpy, scaling, dot products, norms and componentwise operations.
use crate::{for_each_entry, Backend, BinaryOperands, Real, UnaryOperands, PARALLEL_MIN_LEN};
use itertools::izip;
use rayon::prelude::*;

/// Computes `r = a * x + y`.
///
/// The evaluation order depends on the aliasing configuration:
///
/// - `r` is `y`: `r[i] += a * x[i]`,
/// - `r` is `x`: `r[i] *= a; r[i] += y[i]`,
/// - disjoint: `r[i] = a * x[i] + y[i]`.
///
/// When all three coincide, the `r == y` rule applies.
pub fn axpy<T: Real>(backend: Backend, a: T, operands: BinaryOperands<T>) {
    match operands {
        BinaryOperands::Disjoint { r, x, y } => {
            debug_assert_eq!(r.len(), x.len());
            debug_assert_eq!(r.len(), y.len());
            for_each_entry(backend, r, |i, r_i| *r_i = a * x[i] + y[i]);
        }
        BinaryOperands::AliasY { r, x } => {
            debug_assert_eq!(r.len(), x.len());
            for_each_entry(backend, r, |i, r_i| *r_i += a * x[i]);
        }
        BinaryOperands::AliasX { r, y } => {
            debug_assert_eq!(r.len(), y.len());
            for_each_entry(backend, r, |i, r_i| {
                *r_i *= a;
                *r_i += y[i];
            });
        }
        BinaryOperands::AliasBoth { r } => {
            for_each_entry(backend, r, |_, r_i| {
                let r_old = *r_i;
                *r_i = r_old + a * r_old;
            });
        }
    }
}

/// Operands of `r = a .* x + y` with a per-entry scaling vector `a`.
#[derive(Debug)]
pub enum VectorAxpyOperands<'a, T> {
    Disjoint { r: &'a mut [T], a: &'a [T], x: &'a [T], y: &'a [T] },
    /// `r` is `a`.
    AliasA { r: &'a mut [T], x: &'a [T], y: &'a [T] },
    AliasX { r: &'a mut [T], a: &'a [T], y: &'a [T] },
    AliasY { r: &'a mut [T], a: &'a [T], x: &'a [T] },
}

/// Computes `r = a .* x + y`.
///
/// Follows the same aliasing rules as [`axpy`], with the additional case `r == a`
/// evaluated as `r[i] *= x[i]; r[i] += y[i]`.
pub fn axpy_vector<T: Real>(backend: Backend, operands: VectorAxpyOperands<T>) {
    match operands {
        VectorAxpyOperands::Disjoint { r, a, x, y } => {
            for_each_entry(backend, r, |i, r_i| *r_i = a[i] * x[i] + y[i]);
        }
        VectorAxpyOperands::AliasY { r, a, x } => {
            for_each_entry(backend, r, |i, r_i| *r_i += a[i] * x[i]);
        }
        VectorAxpyOperands::AliasX { r, a, y } => {
            for_each_entry(backend, r, |i, r_i| {
                *r_i *= a[i];
                *r_i += y[i];
            });
        }
        VectorAxpyOperands::AliasA { r, x, y } => {
            for_each_entry(backend, r, |i, r_i| {
                *r_i *= x[i];
                *r_i += y[i];
            });
        }
    }
}

/// Computes `r = a * x`.
pub fn scale<T: Real>(backend: Backend, a: T, operands: UnaryOperands<T>) {
    match operands {
        UnaryOperands::Disjoint { r, x } => {
            debug_assert_eq!(r.len(), x.len());
            for_each_entry(backend, r, |i, r_i| *r_i = x[i] * a);
        }
        UnaryOperands::InPlace { r } => for_each_entry(backend, r, |_, r_i| *r_i *= a),
    }
}

/// Computes `r = x .* y`.
pub fn component_product<T: Real>(backend: Backend, operands: BinaryOperands<T>) {
    match operands {
        BinaryOperands::Disjoint { r, x, y } => for_each_entry(backend, r, |i, r_i| *r_i = x[i] * y[i]),
        BinaryOperands::AliasX { r, y } => for_each_entry(backend, r, |i, r_i| *r_i *= y[i]),
        BinaryOperands::AliasY { r, x } => for_each_entry(backend, r, |i, r_i| *r_i *= x[i]),
        BinaryOperands::AliasBoth { r } => for_each_entry(backend, r, |_, r_i| *r_i = *r_i * *r_i),
    }
}

/// Computes `r[i] = alpha / x[i]`.
pub fn component_invert<T: Real>(backend: Backend, alpha: T, operands: UnaryOperands<T>) {
    match operands {
        UnaryOperands::Disjoint { r, x } => {
            debug_assert_eq!(r.len(), x.len());
            for_each_entry(backend, r, |i, r_i| *r_i = alpha / x[i]);
        }
        UnaryOperands::InPlace { r } => for_each_entry(backend, r, |_, r_i| *r_i = alpha / *r_i),
    }
}

/// Computes `r = x + y`.
pub fn sum<T: Real>(backend: Backend, operands: BinaryOperands<T>) {
    match operands {
        BinaryOperands::Disjoint { r, x, y } => for_each_entry(backend, r, |i, r_i| *r_i = x[i] + y[i]),
        BinaryOperands::AliasX { r, y } => for_each_entry(backend, r, |i, r_i| *r_i += y[i]),
        BinaryOperands::AliasY { r, x } => for_each_entry(backend, r, |i, r_i| *r_i += x[i]),
        BinaryOperands::AliasBoth { r } => for_each_entry(backend, r, |_, r_i| *r_i = *r_i + *r_i),
    }
}

/// Computes `r = x - y`.
pub fn difference<T: Real>(backend: Backend, operands: BinaryOperands<T>) {
    match operands {
        BinaryOperands::Disjoint { r, x, y } => for_each_entry(backend, r, |i, r_i| *r_i = x[i] - y[i]),
        BinaryOperands::AliasX { r, y } => for_each_entry(backend, r, |i, r_i| *r_i -= y[i]),
        BinaryOperands::AliasY { r, x } => for_each_entry(backend, r, |i, r_i| *r_i = x[i] - *r_i),
        BinaryOperands::AliasBoth { r } => for_each_entry(backend, r, |_, r_i| *r_i = *r_i - *r_i),
    }
}

/// Computes `x^T y`. Returns zero for empty input.
pub fn dot<T: Real>(backend: Backend, x: &[T], y: &[T]) -> T {
    debug_assert_eq!(x.len(), y.len());
    match backend {
        Backend::Generic => izip!(x, y).fold(T::zero(), |acc, (x_i, y_i)| acc + *x_i * *y_i),
        Backend::Parallel => x
            .par_iter()
            .zip(y.par_iter())
            .with_min_len(PARALLEL_MIN_LEN)
            .map(|(x_i, y_i)| *x_i * *y_i)
            .reduce(T::zero, |a, b| a + b),
    }
}

/// Computes `sum_i x[i] * y[i] * z[i]`.
pub fn triple_dot<T: Real>(backend: Backend, x: &[T], y: &[T], z: &[T]) -> T {
    debug_assert_eq!(x.len(), y.len());
    debug_assert_eq!(x.len(), z.len());
    match backend {
        Backend::Generic => izip!(x, y, z).fold(T::zero(), |acc, (x_i, y_i, z_i)| acc + *x_i * *y_i * *z_i),
        Backend::Parallel => x
            .par_iter()
            .zip(y.par_iter())
            .zip(z.par_iter())
            .with_min_len(PARALLEL_MIN_LEN)
            .map(|((x_i, y_i), z_i)| *x_i * *y_i * *z_i)
            .reduce(T::zero, |a, b| a + b),
    }
}

/// Computes the squared Euclidean norm.
pub fn norm2sqr<T: Real>(backend: Backend, x: &[T]) -> T {
    dot(backend, x, x)
}

pub fn norm2<T: Real>(backend: Backend, x: &[T]) -> T {
    norm2sqr(backend, x).sqrt()
}

/// Computes the sum of all entries.
pub fn sum_elements<T: Real>(backend: Backend, x: &[T]) -> T {
    match backend {
        Backend::Generic => x.iter().fold(T::zero(), |acc, x_i| acc + *x_i),
        Backend::Parallel => x
            .par_iter()
            .with_min_len(PARALLEL_MIN_LEN)
            .copied()
            .reduce(T::zero, |a, b| a + b),
    }
}

/// Sets every entry to `value`.
pub fn fill<T: Real>(backend: Backend, r: &mut [T], value: T) {
    for_each_entry(backend, r, |_, r_i| *r_i = value);
}
