//! MatrixMarket text files.
//!
//! Matrices are read from and written to the `coordinate` format, with `real` or `integer` fields
//! and `general` or `symmetric` symmetry. Dense vectors use the `array` format with a single
//! column. Indices in the files are 1-based.
use crate::error::{LafemError, Result};
use crate::matrix::SparseMatrixCoo;
use crate::vector::DenseVector;
use lafem_arch::Real;
use std::io::{BufRead, Write};
use std::str::FromStr;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Storage {
    Coordinate,
    Array,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Symmetry {
    General,
    Symmetric,
}

#[derive(Debug)]
struct Header {
    storage: Storage,
    symmetry: Symmetry,
}

/// Numbered, non-empty, non-comment lines of a file.
struct Lines<R> {
    lines: std::io::Lines<R>,
    number: usize,
}

impl<R: BufRead> Lines<R> {
    fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            number: 0,
        }
    }

    fn raw(&mut self) -> Result<Option<String>> {
        match self.lines.next() {
            Some(line) => {
                self.number += 1;
                Ok(Some(line?))
            }
            None => Ok(None),
        }
    }

    fn next_data(&mut self) -> Result<Option<String>> {
        while let Some(line) = self.raw()? {
            let trimmed = line.trim();
            if !trimmed.is_empty() && !trimmed.starts_with('%') {
                return Ok(Some(trimmed.to_string()));
            }
        }
        Ok(None)
    }

    fn expect_data(&mut self) -> Result<String> {
        self.next_data()?
            .ok_or_else(|| LafemError::invalid_format(format!("unexpected end of file after line {}", self.number)))
    }

    fn error(&self, message: impl std::fmt::Display) -> LafemError {
        LafemError::invalid_format(format!("line {}: {}", self.number, message))
    }

    fn parse<F: FromStr>(&self, token: Option<&str>, what: &str) -> Result<F> {
        let token = token.ok_or_else(|| self.error(format!("missing {}", what)))?;
        token
            .parse()
            .map_err(|_| self.error(format!("cannot parse {} from '{}'", what, token)))
    }
}

fn read_header<R: BufRead>(lines: &mut Lines<R>) -> Result<Header> {
    let banner = lines
        .raw()?
        .ok_or_else(|| LafemError::invalid_format("empty MatrixMarket file"))?;
    let tokens: Vec<String> = banner.split_whitespace().map(str::to_ascii_lowercase).collect();
    if tokens.len() != 5 || tokens[0] != "%%matrixmarket" || tokens[1] != "matrix" {
        return Err(lines.error("expected '%%MatrixMarket matrix <storage> <field> <symmetry>'"));
    }
    let storage = match tokens[2].as_str() {
        "coordinate" => Storage::Coordinate,
        "array" => Storage::Array,
        other => return Err(lines.error(format!("unsupported storage '{}'", other))),
    };
    match tokens[3].as_str() {
        "real" | "integer" | "double" => {}
        other => return Err(lines.error(format!("unsupported field '{}'", other))),
    }
    let symmetry = match tokens[4].as_str() {
        "general" => Symmetry::General,
        "symmetric" => Symmetry::Symmetric,
        other => return Err(lines.error(format!("unsupported symmetry '{}'", other))),
    };
    Ok(Header { storage, symmetry })
}

/// Converts a 1-based file index into a 0-based one.
fn zero_based<R: BufRead>(lines: &Lines<R>, index: usize, extent: usize, what: &str) -> Result<usize> {
    if index == 0 || index > extent {
        Err(lines.error(format!("{} index {} outside of 1..={}", what, index, extent)))
    } else {
        Ok(index - 1)
    }
}

pub fn read_matrix<T: Real, R: BufRead>(reader: R) -> Result<SparseMatrixCoo<T>> {
    let mut lines = Lines::new(reader);
    let header = read_header(&mut lines)?;
    if header.storage != Storage::Coordinate {
        return Err(LafemError::invalid_format("sparse matrices must use coordinate storage"));
    }

    let size_line = lines.expect_data()?;
    let mut tokens = size_line.split_whitespace();
    let rows: usize = lines.parse(tokens.next(), "row count")?;
    let columns: usize = lines.parse(tokens.next(), "column count")?;
    let nnz: usize = lines.parse(tokens.next(), "entry count")?;
    if header.symmetry == Symmetry::Symmetric && rows != columns {
        return Err(lines.error("symmetric matrices must be square"));
    }

    let capacity = nnz.min(1 << 20);
    let mut row_idx = Vec::with_capacity(capacity);
    let mut col_idx = Vec::with_capacity(capacity);
    let mut values = Vec::with_capacity(capacity);
    for _ in 0..nnz {
        let line = lines.expect_data()?;
        let mut tokens = line.split_whitespace();
        let i = zero_based(&lines, lines.parse(tokens.next(), "row index")?, rows, "row")?;
        let j = zero_based(&lines, lines.parse(tokens.next(), "column index")?, columns, "column")?;
        let value: f64 = lines.parse(tokens.next(), "value")?;
        let value = T::from_f64_value(value);
        row_idx.push(i);
        col_idx.push(j);
        values.push(value);
        if header.symmetry == Symmetry::Symmetric && i != j {
            row_idx.push(j);
            col_idx.push(i);
            values.push(value);
        }
    }
    if lines.next_data()?.is_some() {
        return Err(lines.error(format!("more than the announced {} entries", nnz)));
    }
    SparseMatrixCoo::from_triplets(rows, columns, &row_idx, &col_idx, &values)
}

pub fn write_matrix<T: Real, W: Write>(mut writer: W, matrix: &SparseMatrixCoo<T>) -> Result<()> {
    let layout = matrix.layout();
    writeln!(writer, "%%MatrixMarket matrix coordinate real general")?;
    writeln!(writer, "{} {} {}", layout.rows(), layout.columns(), matrix.values().len())?;
    for ((&i, &j), &v) in matrix.row_idx().iter().zip(matrix.col_idx()).zip(matrix.values()) {
        writeln!(writer, "{} {} {:e}", i + 1, j + 1, v.as_f64())?;
    }
    Ok(())
}

pub fn read_vector<T: Real, R: BufRead>(reader: R) -> Result<DenseVector<T>> {
    let mut lines = Lines::new(reader);
    let header = read_header(&mut lines)?;
    let size_line = lines.expect_data()?;
    let mut tokens = size_line.split_whitespace();
    let rows: usize = lines.parse(tokens.next(), "row count")?;
    let columns: usize = lines.parse(tokens.next(), "column count")?;
    if columns != 1 {
        return Err(lines.error(format!("vectors must have a single column, found {}", columns)));
    }

    let mut values = vec![T::zero(); rows];
    match header.storage {
        Storage::Array => {
            for value in values.iter_mut() {
                let line = lines.expect_data()?;
                let parsed: f64 = lines.parse(line.split_whitespace().next(), "value")?;
                *value = T::from_f64_value(parsed);
            }
        }
        Storage::Coordinate => {
            let nnz: usize = lines.parse(tokens.next(), "entry count")?;
            for _ in 0..nnz {
                let line = lines.expect_data()?;
                let mut tokens = line.split_whitespace();
                let i = zero_based(&lines, lines.parse(tokens.next(), "row index")?, rows, "row")?;
                zero_based(&lines, lines.parse(tokens.next(), "column index")?, 1, "column")?;
                let parsed: f64 = lines.parse(tokens.next(), "value")?;
                values[i] = T::from_f64_value(parsed);
            }
        }
    }
    Ok(DenseVector::from_vec(values))
}

pub fn write_vector<T: Real, W: Write>(mut writer: W, v: &DenseVector<T>) -> Result<()> {
    writeln!(writer, "%%MatrixMarket matrix array real general")?;
    writeln!(writer, "{} 1", v.as_slice().len())?;
    for x in v.as_slice() {
        writeln!(writer, "{:e}", x.as_f64())?;
    }
    Ok(())
}
