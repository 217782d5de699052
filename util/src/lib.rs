/// Poor man's approx assertion for matrices
#[macro_export]
macro_rules! assert_approx_matrix_eq {
    ($x:expr, $y:expr, abstol = $tol:expr) => {{
        let diff = $x - $y;

        let max_absdiff = diff.abs().max();
        let approx_eq = max_absdiff <= $tol;

        if !approx_eq {
            println!("abstol: {:e}", $tol);
            println!("left: {}", $x);
            println!("right: {}", $y);
            println!("diff: {:e}", diff);
        }
        assert!(approx_eq);
    }};
}

/// Elementwise approx assertion for slices of `f64`.
#[macro_export]
macro_rules! assert_slices_approx_eq {
    ($x:expr, $y:expr, abstol = $tol:expr) => {{
        let x: &[f64] = &$x;
        let y: &[f64] = &$y;
        assert_eq!(x.len(), y.len(), "slices differ in length");
        let max_absdiff = x
            .iter()
            .zip(y)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f64, f64::max);
        if max_absdiff > $tol {
            println!("abstol: {:e}", $tol);
            println!("left: {:?}", x);
            println!("right: {:?}", y);
            println!("max absdiff: {:e}", max_absdiff);
        }
        assert!(max_absdiff <= $tol);
    }};
}

#[macro_export]
macro_rules! assert_panics {
    ($e:expr) => {{
        use std::panic::catch_unwind;
        use std::stringify;
        let expr_string = stringify!($e);
        let result = catch_unwind(|| $e);
        if result.is_ok() {
            panic!("assert_panics!({}) failed.", expr_string);
        }
    }};
}

/// Dense `n x n` row-major tridiagonal matrix with `diagonal` on the main diagonal and
/// `off` on the first off-diagonals.
pub fn tridiagonal(n: usize, diagonal: f64, off: f64) -> Vec<f64> {
    let mut values = vec![0.0; n * n];
    for i in 0..n {
        values[i * n + i] = diagonal;
        if i + 1 < n {
            values[i * n + i + 1] = off;
            values[(i + 1) * n + i] = off;
        }
    }
    values
}
