//! The binary envelope shared by CSR, dense vector and sparse vector files and by checkpoints.
//!
//! All numbers are little-endian. Layout:
//!
//! | field          | type                                   |
//! |----------------|----------------------------------------|
//! | magic          | `b"LAFM"`                              |
//! | version        | `u16`                                  |
//! | format         | `u8`, the [`FileMode`] code            |
//! | flags          | `u8`, bit 0 zlib, bit 1 lossy          |
//! | scalar width   | `u8`, 4 or 8                           |
//! | tolerance      | `f64`                                  |
//! | body length    | `u64`, bytes of the (compressed) body  |
//! | body           |                                        |
//!
//! The body holds the scalar dimensions (`u32` count, then `u64` each), the index arrays (`u32`
//! count, then per array a `u64` length and `u64` entries) and the values (`u64` count, then
//! scalars of the given width, or `i64` quanta of `2 * tolerance` if the lossy flag is set).
//! With the zlib flag the body is stored zlib-compressed.
//!
//! Values whose quanta exceed the exactly representable range of `f64` cannot be restored within
//! the tolerance. Such payloads are stored exactly and the lossy flag is left unset.
use crate::container::LocalVector;
use crate::error::{check_dims, LafemError, Result};
use crate::io::{FileMode, SerialConfig};
use crate::layout::SparseLayout;
use crate::matrix::{SparseMatrixCoo, SparseMatrixCsr, SparseMatrixEll};
use crate::vector::{DenseVector, DenseVectorBlocked, SparseVector, SparseVectorBlocked};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lafem_arch::Real;
use log::warn;
use nalgebra::SVector;
use std::io::{Read, Write};
use std::mem::size_of;

const MAGIC: &[u8; 4] = b"LAFM";
const VERSION: u16 = 1;
const FLAG_ZLIB: u8 = 1;
const FLAG_LOSSY: u8 = 2;
const HEADER_LEN: usize = 4 + 2 + 1 + 1 + 1 + 8 + 8;
/// Largest quantum magnitude that converts to `f64` without rounding.
const MAX_QUANTUM: f64 = (1u64 << 53) as f64;

/// The decoded contents of an envelope.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Payload<T> {
    pub dims: Vec<usize>,
    pub indices: Vec<Vec<usize>>,
    pub values: Vec<T>,
}

#[derive(Default)]
struct Encoder {
    bytes: Vec<u8>,
}

impl Encoder {
    fn u8(&mut self, v: u8) {
        self.bytes.push(v);
    }

    fn u16(&mut self, v: u16) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    fn u64(&mut self, v: u64) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    fn i64(&mut self, v: i64) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    fn f64(&mut self, v: f64) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    fn scalar<T: Real>(&mut self, v: T) {
        match size_of::<T>() {
            4 => self.bytes.extend_from_slice(&(v.as_f64() as f32).to_le_bytes()),
            _ => self.f64(v.as_f64()),
        }
    }
}

struct Decoder<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let chunk = self
            .bytes
            .get(self.pos..self.pos + N)
            .ok_or_else(|| LafemError::invalid_format("unexpected end of data"))?;
        self.pos += N;
        let mut array = [0; N];
        array.copy_from_slice(chunk);
        Ok(array)
    }

    fn slice(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| LafemError::invalid_format("unexpected end of data"))?;
        let chunk = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(chunk)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take::<1>()?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.take()?))
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take()?))
    }

    fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.take()?))
    }

    fn usize(&mut self) -> Result<usize> {
        usize::try_from(self.u64()?).map_err(|_| LafemError::invalid_format("length exceeds address space"))
    }

    /// A count of items of `item_len` bytes each, checked against the remaining data.
    fn count(&mut self, item_len: usize) -> Result<usize> {
        let count = self.usize()?;
        if count.saturating_mul(item_len) > self.bytes.len() - self.pos {
            return Err(LafemError::invalid_format("unexpected end of data"));
        }
        Ok(count)
    }

    fn i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.take()?))
    }

    fn f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.take()?))
    }

    fn scalar<T: Real>(&mut self, width: usize) -> Result<T> {
        let value = match width {
            4 => f32::from_le_bytes(self.take()?) as f64,
            _ => self.f64()?,
        };
        Ok(T::from_f64_value(value))
    }
}

/// Serializes a payload into an envelope.
pub(crate) fn encode<T: Real>(mode: FileMode, payload: &Payload<T>, config: &SerialConfig) -> Result<Vec<u8>> {
    let width = size_of::<T>();
    if width != 4 && width != 8 {
        return Err(LafemError::invalid_format(format!("unsupported scalar width {}", width)));
    }
    let valid_tolerance = config.tolerance > 0.0 && config.tolerance.is_finite();
    if config.use_lossy && !valid_tolerance {
        warn!(
            "Lossy serialization requested with tolerance {:e}, storing values exactly",
            config.tolerance
        );
    }
    let quanta = if config.use_lossy && valid_tolerance {
        let quanta = quantize(&payload.values, 2.0 * config.tolerance);
        if quanta.is_none() {
            warn!(
                "Values exceed the quantization range of tolerance {:e}, storing values exactly",
                config.tolerance
            );
        }
        quanta
    } else {
        None
    };
    let lossy = quanta.is_some();

    let mut body = Encoder::default();
    body.u32(payload.dims.len() as u32);
    for &dim in &payload.dims {
        body.u64(dim as u64);
    }
    body.u32(payload.indices.len() as u32);
    for array in &payload.indices {
        body.u64(array.len() as u64);
        for &index in array {
            body.u64(index as u64);
        }
    }
    body.u64(payload.values.len() as u64);
    if let Some(quanta) = quanta {
        warn!(
            "Storing {} values lossily with tolerance {:e}",
            payload.values.len(),
            config.tolerance
        );
        for q in quanta {
            body.i64(q);
        }
    } else {
        for &v in &payload.values {
            body.scalar(v);
        }
    }

    let body = if config.use_zlib {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&body.bytes)?;
        encoder.finish()?
    } else {
        body.bytes
    };

    let mut flags = 0;
    if config.use_zlib {
        flags |= FLAG_ZLIB;
    }
    if lossy {
        flags |= FLAG_LOSSY;
    }
    let mut envelope = Encoder {
        bytes: Vec::with_capacity(HEADER_LEN + body.len()),
    };
    envelope.bytes.extend_from_slice(MAGIC);
    envelope.u16(VERSION);
    envelope.u8(mode.code());
    envelope.u8(flags);
    envelope.u8(width as u8);
    envelope.f64(if lossy { config.tolerance } else { 0.0 });
    envelope.u64(body.len() as u64);
    envelope.bytes.extend_from_slice(&body);
    Ok(envelope.bytes)
}

/// Rounds every value to a multiple of `step`. Returns `None` if a multiple is not finite or too
/// large to be restored exactly.
fn quantize<T: Real>(values: &[T], step: f64) -> Option<Vec<i64>> {
    values
        .iter()
        .map(|v| {
            let q = (v.as_f64() / step).round();
            (q.is_finite() && q.abs() <= MAX_QUANTUM).then(|| q as i64)
        })
        .collect()
}

/// Deserializes an envelope of the given format. Returns the payload and the number of bytes
/// consumed.
pub(crate) fn decode<T: Real>(mode: FileMode, bytes: &[u8]) -> Result<(Payload<T>, usize)> {
    let mut header = Decoder::new(bytes);
    if header.take::<4>()? != *MAGIC {
        return Err(LafemError::invalid_format("missing magic number"));
    }
    let version = header.u16()?;
    if version != VERSION {
        return Err(LafemError::invalid_format(format!("unsupported version {}", version)));
    }
    let code = header.u8()?;
    let found = FileMode::from_code(code)
        .ok_or_else(|| LafemError::invalid_format(format!("unknown format code {}", code)))?;
    if found != mode {
        return Err(LafemError::invalid_format(format!("expected {:?} data, found {:?}", mode, found)));
    }
    let flags = header.u8()?;
    let width = header.u8()? as usize;
    if width != size_of::<T>() {
        return Err(LafemError::invalid_format(format!(
            "data has scalar width {}, expected {}",
            width,
            size_of::<T>()
        )));
    }
    let tolerance = header.f64()?;
    if flags & FLAG_LOSSY != 0 && !(tolerance > 0.0 && tolerance.is_finite()) {
        return Err(LafemError::invalid_format(format!("invalid lossy tolerance {:e}", tolerance)));
    }
    let body_len = header.usize()?;
    let body = header.slice(body_len)?;
    let consumed = header.pos;

    let inflated;
    let body = if flags & FLAG_ZLIB != 0 {
        let mut decoder = ZlibDecoder::new(body);
        let mut buffer = Vec::new();
        decoder
            .read_to_end(&mut buffer)
            .map_err(|err| LafemError::invalid_format(format!("corrupt zlib stream: {}", err)))?;
        inflated = buffer;
        &inflated[..]
    } else {
        body
    };

    let mut body = Decoder::new(body);
    let num_dims = body.u32()? as usize;
    let dims = (0..num_dims).map(|_| body.usize()).collect::<Result<_>>()?;
    let num_arrays = body.u32()? as usize;
    let mut indices = Vec::with_capacity(num_arrays.min(16));
    for _ in 0..num_arrays {
        let len = body.count(8)?;
        indices.push((0..len).map(|_| body.usize()).collect::<Result<_>>()?);
    }
    let num_values = body.count(if flags & FLAG_LOSSY != 0 { 8 } else { width })?;
    let values = if flags & FLAG_LOSSY != 0 {
        let step = 2.0 * tolerance;
        (0..num_values)
            .map(|_| Ok(T::from_f64_value(body.i64()? as f64 * step)))
            .collect::<Result<_>>()?
    } else {
        (0..num_values).map(|_| body.scalar(width)).collect::<Result<_>>()?
    };
    Ok((Payload { dims, indices, values }, consumed))
}

fn read_all<R: Read>(mut reader: R) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(bytes)
}

fn expect_shape<T>(payload: &Payload<T>, dims: usize, arrays: usize) -> Result<()> {
    if payload.dims.len() != dims || payload.indices.len() != arrays {
        return Err(LafemError::invalid_format(format!(
            "expected {} dimensions and {} index arrays, found {} and {}",
            dims,
            arrays,
            payload.dims.len(),
            payload.indices.len()
        )));
    }
    Ok(())
}

pub(crate) fn csr_payload<T: Real>(csr: &SparseMatrixCsr<T>) -> Payload<T> {
    let layout = csr.layout();
    Payload {
        dims: vec![layout.rows(), layout.columns()],
        indices: vec![csr.row_ptr().to_vec(), csr.col_idx().to_vec()],
        values: csr.values().to_vec(),
    }
}

pub(crate) fn csr_from_payload<T: Real>(payload: Payload<T>) -> Result<(SparseLayout, Vec<T>)> {
    expect_shape(&payload, 2, 2)?;
    let mut indices = payload.indices.into_iter();
    let (row_ptr, col_idx) = match (indices.next(), indices.next()) {
        (Some(row_ptr), Some(col_idx)) => (row_ptr, col_idx),
        _ => return Err(LafemError::invalid_format("missing CSR index arrays")),
    };
    let layout = SparseLayout::csr(payload.dims[0], payload.dims[1], row_ptr, col_idx)
        .and_then(|layout| layout.validate().map(|_| layout))
        .map_err(|err| LafemError::invalid_format(err.to_string()))?;
    check_dims("CSR payload", layout.indices(1).len(), payload.values.len())?;
    Ok((layout, payload.values))
}

pub(crate) fn dense_from_payload<T: Real>(payload: Payload<T>, block_size: usize) -> Result<Vec<T>> {
    expect_shape(&payload, 2, 0)?;
    check_dims("dense vector payload", block_size, payload.dims[1])?;
    let len = payload.dims[0]
        .checked_mul(block_size)
        .ok_or_else(|| LafemError::invalid_format("dense vector size overflows"))?;
    check_dims("dense vector payload", len, payload.values.len())?;
    Ok(payload.values)
}

pub(crate) fn dense_payload<T: Real>(values: &[T], size: usize, block_size: usize) -> Payload<T> {
    Payload {
        dims: vec![size, block_size],
        indices: Vec::new(),
        values: values.to_vec(),
    }
}

/// Sparse vectors store `[size, block_size]`, the block indices and the flattened blocks.
pub(crate) fn sparse_payload<T: Real>(size: usize, block_size: usize, indices: &[usize], elements: &[T]) -> Payload<T> {
    Payload {
        dims: vec![size, block_size],
        indices: vec![indices.to_vec()],
        values: elements.to_vec(),
    }
}

/// Returns the size, block indices and flattened blocks of a sparse vector payload.
fn sparse_parts<T>(payload: Payload<T>, block_size: usize) -> Result<(usize, Vec<usize>, Vec<T>)> {
    expect_shape(&payload, 2, 1)?;
    check_dims("sparse vector payload", block_size, payload.dims[1])?;
    let mut indices = payload.indices;
    let indices = indices.pop().unwrap_or_default();
    let len = indices
        .len()
        .checked_mul(block_size)
        .ok_or_else(|| LafemError::invalid_format("sparse vector size overflows"))?;
    check_dims("sparse vector payload", len, payload.values.len())?;
    Ok((payload.dims[0], indices, payload.values))
}

pub(crate) fn sparse_from_payload<T: Real>(payload: Payload<T>) -> Result<SparseVector<T>> {
    let (size, indices, values) = sparse_parts(payload, 1)?;
    SparseVector::from_entries(size, &indices, &values).map_err(|err| LafemError::invalid_format(err.to_string()))
}

pub(crate) fn sparse_blocked_from_payload<T: Real, const B: usize>(
    payload: Payload<T>,
) -> Result<SparseVectorBlocked<T, B>> {
    let (size, indices, values) = sparse_parts(payload, B)?;
    let blocks: Vec<_> = values
        .chunks_exact(B)
        .map(SVector::<T, B>::from_column_slice)
        .collect();
    SparseVectorBlocked::from_entries(size, &indices, &blocks).map_err(|err| LafemError::invalid_format(err.to_string()))
}

fn coo_payload<T: Real>(coo: &SparseMatrixCoo<T>) -> Payload<T> {
    let layout = coo.layout();
    Payload {
        dims: vec![layout.rows(), layout.columns()],
        indices: vec![coo.row_idx().to_vec(), coo.col_idx().to_vec()],
        values: coo.values().to_vec(),
    }
}

fn coo_from_payload<T: Real>(payload: Payload<T>) -> Result<SparseMatrixCoo<T>> {
    expect_shape(&payload, 2, 2)?;
    let (row_idx, col_idx) = (&payload.indices[0], &payload.indices[1]);
    SparseMatrixCoo::from_triplets(payload.dims[0], payload.dims[1], row_idx, col_idx, &payload.values)
        .map_err(|err| LafemError::invalid_format(err.to_string()))
}

/// ELL matrices store `[rows, columns, stride]` and the padded column-major arrays.
fn ell_payload<T: Real>(ell: &SparseMatrixEll<T>) -> Payload<T> {
    let layout = ell.layout();
    Payload {
        dims: vec![layout.rows(), layout.columns(), ell.stride()],
        indices: vec![ell.col_idx().to_vec(), ell.row_len().to_vec()],
        values: ell.values().to_vec(),
    }
}

fn ell_from_payload<T: Real>(payload: Payload<T>) -> Result<SparseMatrixEll<T>> {
    expect_shape(&payload, 3, 2)?;
    let mut indices = payload.indices.into_iter();
    let (col_idx, row_len) = match (indices.next(), indices.next()) {
        (Some(col_idx), Some(row_len)) => (col_idx, row_len),
        _ => return Err(LafemError::invalid_format("missing ELL index arrays")),
    };
    let layout = SparseLayout::ell(payload.dims[0], payload.dims[1], payload.dims[2], col_idx, row_len)
        .and_then(|layout| layout.validate().map(|_| layout))
        .map_err(|err| LafemError::invalid_format(err.to_string()))?;
    SparseMatrixEll::from_layout(layout, payload.values)
}

pub fn write_csr<T: Real, W: Write>(mut writer: W, csr: &SparseMatrixCsr<T>, config: &SerialConfig) -> Result<()> {
    writer.write_all(&encode(FileMode::Csr, &csr_payload(csr), config)?)?;
    Ok(())
}

pub fn read_csr<T: Real, R: Read>(reader: R) -> Result<SparseMatrixCsr<T>> {
    let (payload, _) = decode(FileMode::Csr, &read_all(reader)?)?;
    let (layout, values) = csr_from_payload(payload)?;
    SparseMatrixCsr::from_layout(layout, values)
}

pub fn write_dv<T: Real, W: Write>(mut writer: W, v: &DenseVector<T>, config: &SerialConfig) -> Result<()> {
    let payload = dense_payload(v.as_slice(), v.as_slice().len(), 1);
    writer.write_all(&encode(FileMode::Dv, &payload, config)?)?;
    Ok(())
}

pub fn read_dv<T: Real, R: Read>(reader: R) -> Result<DenseVector<T>> {
    let (payload, _) = decode(FileMode::Dv, &read_all(reader)?)?;
    Ok(DenseVector::from_vec(dense_from_payload(payload, 1)?))
}

pub fn write_dv_blocked<T: Real, W: Write, const B: usize>(
    mut writer: W,
    v: &DenseVectorBlocked<T, B>,
    config: &SerialConfig,
) -> Result<()> {
    let payload = dense_payload(v.values(), v.size(), B);
    writer.write_all(&encode(FileMode::Dv, &payload, config)?)?;
    Ok(())
}

/// Reads a blocked dense vector. Fails if the stored block size is not `B`.
pub fn read_dv_blocked<T: Real, R: Read, const B: usize>(reader: R) -> Result<DenseVectorBlocked<T, B>> {
    let (payload, _) = decode(FileMode::Dv, &read_all(reader)?)?;
    DenseVectorBlocked::from_scalars(dense_from_payload(payload, B)?)
}

pub fn write_svb<T: Real, W: Write>(mut writer: W, v: &SparseVector<T>, config: &SerialConfig) -> Result<()> {
    let payload = sparse_payload(v.size(), 1, v.indices(), v.elements());
    writer.write_all(&encode(FileMode::Svb, &payload, config)?)?;
    Ok(())
}

pub fn read_svb<T: Real, R: Read>(reader: R) -> Result<SparseVector<T>> {
    let (payload, _) = decode(FileMode::Svb, &read_all(reader)?)?;
    sparse_from_payload(payload)
}

pub fn write_svb_blocked<T: Real, W: Write, const B: usize>(
    mut writer: W,
    v: &SparseVectorBlocked<T, B>,
    config: &SerialConfig,
) -> Result<()> {
    let payload = sparse_payload(v.size(), B, v.indices(), v.elements());
    writer.write_all(&encode(FileMode::Svb, &payload, config)?)?;
    Ok(())
}

/// Reads a blocked sparse vector. Fails if the stored block size is not `B`.
pub fn read_svb_blocked<T: Real, R: Read, const B: usize>(reader: R) -> Result<SparseVectorBlocked<T, B>> {
    let (payload, _) = decode(FileMode::Svb, &read_all(reader)?)?;
    sparse_blocked_from_payload(payload)
}

pub fn write_coo<T: Real, W: Write>(mut writer: W, coo: &SparseMatrixCoo<T>, config: &SerialConfig) -> Result<()> {
    writer.write_all(&encode(FileMode::Coo, &coo_payload(coo), config)?)?;
    Ok(())
}

pub fn read_coo<T: Real, R: Read>(reader: R) -> Result<SparseMatrixCoo<T>> {
    let (payload, _) = decode(FileMode::Coo, &read_all(reader)?)?;
    coo_from_payload(payload)
}

pub fn write_ell<T: Real, W: Write>(mut writer: W, ell: &SparseMatrixEll<T>, config: &SerialConfig) -> Result<()> {
    writer.write_all(&encode(FileMode::Ell, &ell_payload(ell), config)?)?;
    Ok(())
}

pub fn read_ell<T: Real, R: Read>(reader: R) -> Result<SparseMatrixEll<T>> {
    let (payload, _) = decode(FileMode::Ell, &read_all(reader)?)?;
    ell_from_payload(payload)
}
