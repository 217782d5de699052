use bytemuck::Pod;
use nalgebra::RealField;

pub use bytemuck;
pub use nalgebra;

/// Scalar type stored in containers and consumed by kernels.
///
/// Besides the usual field operations, scalars must be plain old data so that value buffers
/// can be reinterpreted as bytes for exchange buffers and serialization.
pub trait Real: RealField + Copy + Pod {
    /// Widens the scalar to `f64`. Lossless for `f32` and `f64`.
    fn as_f64(self) -> f64 {
        nalgebra::try_convert(self).unwrap_or(f64::NAN)
    }

    /// Narrows an `f64` to the scalar type.
    fn from_f64_value(value: f64) -> Self {
        nalgebra::convert(value)
    }
}

impl<T: RealField + Copy + Pod> Real for T {}
