use anyhow::{Context, Result};
use bbq_core::circuit::Circuit;
use bbq_core::code::QubitPartition;
use bbq_core::gf2::BitMatrix;
use bitvec::prelude::*;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

/// Writes a circuit in Stim text form.
pub fn write_circuit<P: AsRef<Path>>(path: P, circuit: &Circuit) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, circuit.to_string())
        .with_context(|| format!("Failed to write circuit {}", path.display()))
}

/// Writes a matrix one row per line as `0`/`1` characters.
pub fn write_dense_matrix<P: AsRef<Path>>(path: P, matrix: &BitMatrix) -> Result<()> {
    let mut out = create(path.as_ref())?;
    for row in matrix.rows() {
        let line: String = row.iter().by_vals().map(|b| if b { '1' } else { '0' }).collect();
        writeln!(out, "{line}")?;
    }
    out.flush()?;
    Ok(())
}

/// Packs a matrix into `.b8` bytes.
///
/// Each row is padded with zeros to a whole number of bytes, bit 0 of a row
/// landing in the least significant bit of its first byte.
pub fn pack_b8(matrix: &BitMatrix) -> Vec<u8> {
    let stride = matrix.num_cols().div_ceil(8) * 8;
    let mut bits: BitVec<u8, Lsb0> = BitVec::with_capacity(stride * matrix.num_rows());
    for row in matrix.rows() {
        bits.extend(row.iter().by_vals());
        bits.resize(bits.len() + stride - row.len(), false);
    }
    bits.into_vec()
}

/// Writes a matrix as packed `.b8` rows; see [`pack_b8`].
pub fn write_b8_matrix<P: AsRef<Path>>(path: P, matrix: &BitMatrix) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, pack_b8(matrix))
        .with_context(|| format!("Failed to write .b8 file {}", path.display()))
}

/// Writes one support per line as space separated qubit labels.
pub fn write_supports<P: AsRef<Path>>(path: P, supports: &[Vec<usize>]) -> Result<()> {
    let mut out = create(path.as_ref())?;
    for support in supports {
        let line: Vec<String> = support.iter().map(usize::to_string).collect();
        writeln!(out, "{}", line.join(" "))?;
    }
    out.flush()?;
    Ok(())
}

/// Writes the data, X ancilla and Z ancilla labels, one role per line.
///
/// A `relay` line follows only when the partition has relay ancillas.
pub fn write_partition<P: AsRef<Path>>(path: P, partition: &QubitPartition) -> Result<()> {
    let mut out = create(path.as_ref())?;
    let roles = [
        ("data", partition.data()),
        ("x", partition.x_ancillas()),
        ("z", partition.z_ancillas()),
        ("relay", partition.relays()),
    ];
    for (role, labels) in roles {
        if role == "relay" && labels.is_empty() {
            continue;
        }
        let labels: Vec<String> = labels.iter().map(usize::to_string).collect();
        writeln!(out, "{role}: {}", labels.join(" "))?;
    }
    out.flush()?;
    Ok(())
}

/// Writes one `ancilla data` coupler per line.
pub fn write_connections<P: AsRef<Path>>(path: P, edges: &[(usize, usize)]) -> Result<()> {
    let path = path.as_ref();
    let mut out = create(path)?;
    for (ancilla, data) in edges {
        writeln!(out, "{ancilla} {data}")?;
    }
    out.flush()
        .with_context(|| format!("Failed to write connections {}", path.display()))
}
