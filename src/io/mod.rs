//! Reading and writing containers.
//!
//! Text formats are MatrixMarket ([`FileMode::Mtx`]) and one exponential-notation value per line
//! ([`FileMode::Exp`]). The binary formats ([`FileMode::Csr`], [`FileMode::Coo`],
//! [`FileMode::Ell`], [`FileMode::Dv`], [`FileMode::Svb`]) share one little-endian envelope, see [`binary`], which can optionally be
//! zlib-compressed and lossily quantized according to a [`SerialConfig`].
use crate::error::{LafemError, Result};
use crate::matrix::{SparseMatrixCoo, SparseMatrixCsr, SparseMatrixEll};
use crate::vector::{DenseVector, DenseVectorBlocked, SparseVector, SparseVectorBlocked};
use eyre::{eyre, Context};
use lafem_arch::Real;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

pub mod binary;
pub mod exp;
pub mod mtx;

/// File formats understood by [`FileIo`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileMode {
    /// MatrixMarket text format.
    Mtx,
    /// Binary CSR matrix.
    Csr,
    /// Binary dense vector.
    Dv,
    /// Binary sparse vector, scalar or blocked.
    Svb,
    /// One value per line in exponential notation.
    Exp,
    /// Binary COO matrix.
    Coo,
    /// Binary ELL matrix.
    Ell,
}

impl FileMode {
    /// Guesses the mode from a file extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        let extension = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "mtx" => Some(FileMode::Mtx),
            "csr" => Some(FileMode::Csr),
            "dv" => Some(FileMode::Dv),
            "svb" => Some(FileMode::Svb),
            "exp" => Some(FileMode::Exp),
            "coo" => Some(FileMode::Coo),
            "ell" => Some(FileMode::Ell),
            _ => None,
        }
    }

    pub(crate) fn code(self) -> u8 {
        match self {
            FileMode::Mtx => 0,
            FileMode::Csr => 1,
            FileMode::Dv => 2,
            FileMode::Svb => 3,
            FileMode::Exp => 4,
            FileMode::Coo => 5,
            FileMode::Ell => 6,
        }
    }

    pub(crate) fn from_code(code: u8) -> Option<Self> {
        [
            FileMode::Mtx,
            FileMode::Csr,
            FileMode::Dv,
            FileMode::Svb,
            FileMode::Exp,
            FileMode::Coo,
            FileMode::Ell,
        ]
            .into_iter()
            .find(|mode| mode.code() == code)
    }
}

/// Compression settings of binary output.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialConfig {
    pub use_zlib: bool,
    pub use_lossy: bool,
    /// Maximum absolute error of lossily stored values.
    pub tolerance: f64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            use_zlib: false,
            use_lossy: false,
            tolerance: 0.0,
        }
    }
}

impl SerialConfig {
    pub fn with_zlib(mut self) -> Self {
        self.use_zlib = true;
        self
    }

    /// Stores values quantized to a grid, with an absolute error of at most `tolerance`.
    pub fn with_lossy(mut self, tolerance: f64) -> Self {
        self.use_lossy = true;
        self.tolerance = tolerance;
        self
    }
}

fn unsupported(mode: FileMode, container: &str) -> LafemError {
    LafemError::invalid_format(format!("{:?} files cannot hold a {}", mode, container))
}

/// Containers that can be read from and written to files.
pub trait FileIo: Sized {
    fn read_from<R: BufRead>(mode: FileMode, reader: R) -> Result<Self>;

    fn write_out<W: Write>(&self, mode: FileMode, writer: W) -> Result<()>;

    fn read_from_file<P: AsRef<Path>>(mode: FileMode, path: P) -> eyre::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).wrap_err_with(|| format!("failed to open file {}", path.display()))?;
        Self::read_from(mode, BufReader::new(file))
            .wrap_err_with(|| format!("failed to read {:?} data from {}", mode, path.display()))
    }

    fn write_out_file<P: AsRef<Path>>(&self, mode: FileMode, path: P) -> eyre::Result<()> {
        let path = path.as_ref();
        let file = File::create(path).wrap_err_with(|| format!("failed to create file {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        self.write_out(mode, &mut writer)
            .wrap_err_with(|| format!("failed to write {:?} data to {}", mode, path.display()))?;
        writer.flush().wrap_err("failed to flush file")?;
        info!("Wrote {:?} file {}", mode, path.display());
        Ok(())
    }
}

/// Reads a file, choosing the format from its extension.
pub fn read_file<C: FileIo, P: AsRef<Path>>(path: P) -> eyre::Result<C> {
    let mode = FileMode::from_path(&path).ok_or_else(|| eyre!("unknown file extension: {}", path.as_ref().display()))?;
    C::read_from_file(mode, path)
}

impl<T: Real> FileIo for SparseMatrixCsr<T> {
    fn read_from<R: BufRead>(mode: FileMode, reader: R) -> Result<Self> {
        match mode {
            FileMode::Mtx => Ok(mtx::read_matrix(reader)?.to_csr()),
            FileMode::Csr => binary::read_csr(reader),
            FileMode::Coo => Ok(binary::read_coo::<T, _>(reader)?.to_csr()),
            _ => Err(unsupported(mode, "CSR matrix")),
        }
    }

    fn write_out<W: Write>(&self, mode: FileMode, writer: W) -> Result<()> {
        match mode {
            FileMode::Mtx => mtx::write_matrix(writer, &self.to_coo()),
            FileMode::Csr => binary::write_csr(writer, self, &SerialConfig::default()),
            _ => Err(unsupported(mode, "CSR matrix")),
        }
    }
}

impl<T: Real> FileIo for SparseMatrixCoo<T> {
    fn read_from<R: BufRead>(mode: FileMode, reader: R) -> Result<Self> {
        match mode {
            FileMode::Mtx => mtx::read_matrix(reader),
            FileMode::Csr => Ok(binary::read_csr::<T, _>(reader)?.to_coo()),
            FileMode::Coo => binary::read_coo(reader),
            _ => Err(unsupported(mode, "COO matrix")),
        }
    }

    fn write_out<W: Write>(&self, mode: FileMode, writer: W) -> Result<()> {
        match mode {
            FileMode::Mtx => mtx::write_matrix(writer, self),
            FileMode::Csr => binary::write_csr(writer, &self.to_csr(), &SerialConfig::default()),
            FileMode::Coo => binary::write_coo(writer, self, &SerialConfig::default()),
            _ => Err(unsupported(mode, "COO matrix")),
        }
    }
}

impl<T: Real> FileIo for SparseMatrixEll<T> {
    fn read_from<R: BufRead>(mode: FileMode, reader: R) -> Result<Self> {
        match mode {
            FileMode::Mtx => Ok(SparseMatrixEll::from_csr(&mtx::read_matrix::<T, _>(reader)?.to_csr())),
            FileMode::Ell => binary::read_ell(reader),
            _ => Err(unsupported(mode, "ELL matrix")),
        }
    }

    fn write_out<W: Write>(&self, mode: FileMode, writer: W) -> Result<()> {
        match mode {
            FileMode::Mtx => mtx::write_matrix(writer, &self.to_csr().to_coo()),
            FileMode::Ell => binary::write_ell(writer, self, &SerialConfig::default()),
            _ => Err(unsupported(mode, "ELL matrix")),
        }
    }
}

impl<T: Real> FileIo for DenseVector<T> {
    fn read_from<R: BufRead>(mode: FileMode, reader: R) -> Result<Self> {
        match mode {
            FileMode::Mtx => mtx::read_vector(reader),
            FileMode::Exp => exp::read_vector(reader),
            FileMode::Dv => binary::read_dv(reader),
            _ => Err(unsupported(mode, "dense vector")),
        }
    }

    fn write_out<W: Write>(&self, mode: FileMode, writer: W) -> Result<()> {
        match mode {
            FileMode::Mtx => mtx::write_vector(writer, self),
            FileMode::Exp => exp::write_vector(writer, self),
            FileMode::Dv => binary::write_dv(writer, self, &SerialConfig::default()),
            _ => Err(unsupported(mode, "dense vector")),
        }
    }
}

impl<T: Real, const B: usize> FileIo for DenseVectorBlocked<T, B> {
    fn read_from<R: BufRead>(mode: FileMode, reader: R) -> Result<Self> {
        match mode {
            FileMode::Dv => binary::read_dv_blocked(reader),
            _ => Err(unsupported(mode, "blocked dense vector")),
        }
    }

    fn write_out<W: Write>(&self, mode: FileMode, writer: W) -> Result<()> {
        match mode {
            FileMode::Dv => binary::write_dv_blocked(writer, self, &SerialConfig::default()),
            _ => Err(unsupported(mode, "blocked dense vector")),
        }
    }
}

impl<T: Real> FileIo for SparseVector<T> {
    fn read_from<R: BufRead>(mode: FileMode, reader: R) -> Result<Self> {
        match mode {
            FileMode::Svb => binary::read_svb(reader),
            _ => Err(unsupported(mode, "sparse vector")),
        }
    }

    fn write_out<W: Write>(&self, mode: FileMode, writer: W) -> Result<()> {
        match mode {
            FileMode::Svb => binary::write_svb(writer, self, &SerialConfig::default()),
            _ => Err(unsupported(mode, "sparse vector")),
        }
    }
}

impl<T: Real, const B: usize> FileIo for SparseVectorBlocked<T, B> {
    fn read_from<R: BufRead>(mode: FileMode, reader: R) -> Result<Self> {
        match mode {
            FileMode::Svb => binary::read_svb_blocked(reader),
            _ => Err(unsupported(mode, "blocked sparse vector")),
        }
    }

    fn write_out<W: Write>(&self, mode: FileMode, writer: W) -> Result<()> {
        match mode {
            FileMode::Svb => binary::write_svb_blocked(writer, self, &SerialConfig::default()),
            _ => Err(unsupported(mode, "blocked sparse vector")),
        }
    }
}
