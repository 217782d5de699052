//! Dense vectors as one exponential-notation value per line.
use crate::error::{LafemError, Result};
use crate::vector::DenseVector;
use lafem_arch::Real;
use std::io::{BufRead, Write};

pub fn read_vector<T: Real, R: BufRead>(reader: R) -> Result<DenseVector<T>> {
    let mut values = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let token = line.trim();
        if token.is_empty() {
            continue;
        }
        let value: f64 = token
            .parse()
            .map_err(|_| LafemError::invalid_format(format!("line {}: cannot parse '{}'", number + 1, token)))?;
        values.push(T::from_f64_value(value));
    }
    Ok(DenseVector::from_vec(values))
}

pub fn write_vector<T: Real, W: Write>(mut writer: W, v: &DenseVector<T>) -> Result<()> {
    for x in v.as_slice() {
        writeln!(writer, "{:.16e}", x.as_f64())?;
    }
    Ok(())
}
