use anyhow::{Context, Result, bail};
use bbq_core::gf2::{BitMatrix, BitRow};
use bitvec::prelude::*;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

/// Loads a `.b8` file as one flat bit stream.
pub fn load_b8_file<P: AsRef<Path>>(path: P) -> Result<BitVec<u8, Lsb0>> {
    let path = path.as_ref();
    let mut file =
        File::open(path).with_context(|| format!("Failed to open .b8 file {}", path.display()))?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;
    Ok(BitVec::<u8, Lsb0>::from_vec(buffer))
}

/// Splits a byte-padded bit stream into rows of `bits_per_row` bits.
pub fn slice_rows(raw_bits: &BitSlice<u8, Lsb0>, bits_per_row: usize) -> Vec<BitRow> {
    let stride_bits = bits_per_row.div_ceil(8) * 8;
    if stride_bits == 0 {
        return Vec::new();
    }
    raw_bits
        .chunks_exact(stride_bits)
        .map(|chunk| chunk[..bits_per_row].iter().by_vals().collect())
        .collect()
}

/// Loads a packed check matrix with `cols` columns.
pub fn load_b8_matrix<P: AsRef<Path>>(path: P, cols: usize) -> Result<BitMatrix> {
    let raw = load_b8_file(&path)?;
    let stride = cols.div_ceil(8) * 8;
    if stride > 0 && raw.len() % stride != 0 {
        bail!(
            "{} bytes do not hold a whole number of {cols}-bit rows",
            raw.len() / 8
        );
    }
    Ok(BitMatrix::from_rows(slice_rows(&raw, cols), cols))
}

/// Loads a dense matrix written one row per line as `0`/`1` characters.
pub fn load_dense_matrix<P: AsRef<Path>>(path: P) -> Result<BitMatrix> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read matrix {}", path.display()))?;
    let mut rows = Vec::new();
    let mut cols = None;
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let row: BitRow = line
            .chars()
            .map(|ch| match ch {
                '0' => Ok(false),
                '1' => Ok(true),
                other => Err(anyhow::anyhow!("line {}: unexpected character {other:?}", lineno + 1)),
            })
            .collect::<Result<_>>()?;
        match cols {
            None => cols = Some(row.len()),
            Some(c) if c != row.len() => {
                bail!("line {}: row has {} columns, expected {c}", lineno + 1, row.len())
            }
            Some(_) => {}
        }
        rows.push(row);
    }
    Ok(BitMatrix::from_rows(rows, cols.unwrap_or(0)))
}
