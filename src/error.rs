//! Error types shared by containers, the global layer and serialization.
use crate::global::CommError;
use lafem_arch::Backend;
use std::error::Error;
use std::fmt;

#[derive(Debug)]
#[non_exhaustive]
pub enum LafemError {
    /// Operand extents are incompatible at a container boundary.
    DimensionMismatch {
        operation: &'static str,
        expected: usize,
        actual: usize,
    },
    /// Index arrays of a layout are malformed.
    InvalidLayout(String),
    /// Operands live in arenas with different backends.
    BackendMismatch { left: Backend, right: Backend },
    IndexOutOfBounds { index: usize, size: usize },
    /// A serialized payload is structurally invalid.
    InvalidFormat(String),
    Io(std::io::Error),
    Comm(CommError),
}

impl LafemError {
    pub(crate) fn dimension_mismatch(operation: &'static str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            operation,
            expected,
            actual,
        }
    }

    pub(crate) fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat(message.into())
    }
}

impl fmt::Display for LafemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DimensionMismatch {
                operation,
                expected,
                actual,
            } => write!(
                f,
                "Dimension mismatch in {}: expected {}, got {}",
                operation, expected, actual
            ),
            Self::InvalidLayout(msg) => write!(f, "Invalid layout: {}", msg),
            Self::BackendMismatch { left, right } => {
                write!(f, "Operands live on different backends ({} and {})", left, right)
            }
            Self::IndexOutOfBounds { index, size } => {
                write!(f, "Index {} out of bounds for size {}", index, size)
            }
            Self::InvalidFormat(msg) => write!(f, "Invalid serialized data: {}", msg),
            Self::Io(err) => {
                write!(f, "I/O error: ")?;
                err.fmt(f)
            }
            Self::Comm(err) => {
                write!(f, "Communication error: ")?;
                err.fmt(f)
            }
        }
    }
}

impl Error for LafemError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Comm(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LafemError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<CommError> for LafemError {
    fn from(err: CommError) -> Self {
        Self::Comm(err)
    }
}

pub type Result<T> = std::result::Result<T, LafemError>;

/// Returns a `DimensionMismatch` error unless `expected == actual`.
pub(crate) fn check_dims(operation: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(LafemError::dimension_mismatch(operation, expected, actual))
    }
}
