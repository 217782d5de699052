//! Extremal reductions.
//!
//! Index-returning kernels return `None` for empty input. Value-returning kernels return zero for
//! empty input. Ties resolve to the smallest index on every backend.
use crate::{Backend, Real, PARALLEL_MIN_LEN};
use rayon::prelude::*;

fn select_index<T, K, B>(backend: Backend, x: &[T], key: K, better: B) -> Option<usize>
where
    T: Real,
    K: Fn(T) -> T + Sync + Send,
    B: Fn(T, T) -> bool + Sync + Send,
{
    match backend {
        Backend::Generic => {
            let (first, rest) = x.split_first()?;
            let mut best_index = 0;
            let mut best_value = key(*first);
            for (i, x_i) in rest.iter().enumerate() {
                let value = key(*x_i);
                if better(value, best_value) {
                    best_index = i + 1;
                    best_value = value;
                }
            }
            Some(best_index)
        }
        Backend::Parallel => x
            .par_iter()
            .with_min_len(PARALLEL_MIN_LEN)
            .enumerate()
            .map(|(i, x_i)| (i, key(*x_i)))
            .reduce_with(|(i, a), (j, b)| {
                // Preserve the sequential rule: the earlier index wins unless strictly beaten
                let (first, second) = if i < j { ((i, a), (j, b)) } else { ((j, b), (i, a)) };
                if better(second.1, first.1) {
                    second
                } else {
                    first
                }
            })
            .map(|(i, _)| i),
    }
}

pub fn max_index<T: Real>(backend: Backend, x: &[T]) -> Option<usize> {
    select_index(backend, x, |v| v, |a, b| a > b)
}

pub fn min_index<T: Real>(backend: Backend, x: &[T]) -> Option<usize> {
    select_index(backend, x, |v| v, |a, b| a < b)
}

pub fn max_abs_index<T: Real>(backend: Backend, x: &[T]) -> Option<usize> {
    select_index(backend, x, |v| v.abs(), |a, b| a > b)
}

pub fn min_abs_index<T: Real>(backend: Backend, x: &[T]) -> Option<usize> {
    select_index(backend, x, |v| v.abs(), |a, b| a < b)
}

pub fn max_element<T: Real>(backend: Backend, x: &[T]) -> T {
    max_index(backend, x).map(|i| x[i]).unwrap_or_else(T::zero)
}

pub fn min_element<T: Real>(backend: Backend, x: &[T]) -> T {
    min_index(backend, x).map(|i| x[i]).unwrap_or_else(T::zero)
}

/// Returns `max_i |x[i]|`.
pub fn max_abs_element<T: Real>(backend: Backend, x: &[T]) -> T {
    max_abs_index(backend, x)
        .map(|i| x[i].abs())
        .unwrap_or_else(T::zero)
}

/// Returns `min_i |x[i]|`.
pub fn min_abs_element<T: Real>(backend: Backend, x: &[T]) -> T {
    min_abs_index(backend, x)
        .map(|i| x[i].abs())
        .unwrap_or_else(T::zero)
}
