//! Dense binary matrices over GF(2).
//!
//! Parity-check matrices and logical bases are stored row-major, one
//! `BitVec` per row. Elimination works on cloned rows so the input
//! matrices stay immutable once built.

use bitvec::prelude::*;
use std::fmt;

/// A single row (or column vector) over GF(2).
pub type BitRow = BitVec<u64, Lsb0>;

/// Returns an all-zero row of the given length.
pub fn zero_row(len: usize) -> BitRow {
    bitvec![u64, Lsb0; 0; len]
}

/// Parity of the overlap between two rows.
pub fn dot(a: &BitSlice<u64, Lsb0>, b: &BitSlice<u64, Lsb0>) -> bool {
    a.iter_ones().filter(|&i| b[i]).count() % 2 == 1
}

/// Dense binary matrix with a fixed column count.
#[derive(Clone, PartialEq, Eq)]
pub struct BitMatrix {
    rows: Vec<BitRow>,
    cols: usize,
}

impl BitMatrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows: (0..rows).map(|_| zero_row(cols)).collect(),
            cols,
        }
    }

    pub fn identity(n: usize) -> Self {
        Self::cyclic_shift(n, 0)
    }

    /// Permutation matrix with ones at `(i, (i + k) mod n)`.
    ///
    /// This is the identity rolled `k` places along the column axis, the
    /// building block of the BB polynomial algebra.
    pub fn cyclic_shift(n: usize, k: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.set(i, (i + k) % n, true);
        }
        m
    }

    /// Builds a matrix from explicit rows. All rows must have length `cols`.
    pub fn from_rows(rows: Vec<BitRow>, cols: usize) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == cols));
        Self { rows, cols }
    }

    /// Builds a matrix whose row `i` has ones at the given column indices.
    pub fn from_supports<I, S>(supports: I, cols: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: IntoIterator<Item = usize>,
    {
        let rows = supports
            .into_iter()
            .map(|support| {
                let mut row = zero_row(cols);
                for c in support {
                    row.set(c, true);
                }
                row
            })
            .collect();
        Self { rows, cols }
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, r: usize, c: usize) -> bool {
        self.rows[r][c]
    }

    pub fn set(&mut self, r: usize, c: usize, value: bool) {
        self.rows[r].set(c, value);
    }

    pub fn row(&self, r: usize) -> &BitRow {
        &self.rows[r]
    }

    pub fn rows(&self) -> impl Iterator<Item = &BitRow> {
        self.rows.iter()
    }

    /// Number of ones in row `r`.
    pub fn row_weight(&self, r: usize) -> usize {
        self.rows[r].count_ones()
    }

    /// Column indices of the ones in row `r`.
    pub fn row_support(&self, r: usize) -> Vec<usize> {
        self.rows[r].iter_ones().collect()
    }

    pub fn transpose(&self) -> Self {
        let mut t = Self::zeros(self.cols, self.rows.len());
        for (r, row) in self.rows.iter().enumerate() {
            for c in row.iter_ones() {
                t.set(c, r, true);
            }
        }
        t
    }

    /// Matrix product over GF(2).
    pub fn mul(&self, other: &BitMatrix) -> Self {
        assert_eq!(self.cols, other.num_rows(), "dimension mismatch in GF(2) product");
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut acc = zero_row(other.cols);
                for k in row.iter_ones() {
                    acc ^= other.rows[k].as_bitslice();
                }
                acc
            })
            .collect();
        Self {
            rows,
            cols: other.cols,
        }
    }

    /// Entry-wise sum (XOR).
    pub fn add(&self, other: &BitMatrix) -> Self {
        assert_eq!(self.cols, other.cols);
        assert_eq!(self.rows.len(), other.rows.len());
        let rows = self
            .rows
            .iter()
            .zip(&other.rows)
            .map(|(a, b)| {
                let mut sum = a.clone();
                sum ^= b.as_bitslice();
                sum
            })
            .collect();
        Self {
            rows,
            cols: self.cols,
        }
    }

    /// Kronecker product.
    pub fn kron(&self, other: &BitMatrix) -> Self {
        let (br, bc) = (other.num_rows(), other.cols);
        let mut out = Self::zeros(self.rows.len() * br, self.cols * bc);
        for (i, row) in self.rows.iter().enumerate() {
            for j in row.iter_ones() {
                for (k, orow) in other.rows.iter().enumerate() {
                    for l in orow.iter_ones() {
                        out.set(i * br + k, j * bc + l, true);
                    }
                }
            }
        }
        out
    }

    /// Horizontal concatenation `[self | other]`.
    pub fn hstack(&self, other: &BitMatrix) -> Self {
        assert_eq!(self.rows.len(), other.rows.len());
        let rows = self
            .rows
            .iter()
            .zip(&other.rows)
            .map(|(a, b)| {
                let mut row = a.clone();
                row.extend_from_bitslice(b.as_bitslice());
                row
            })
            .collect();
        Self {
            rows,
            cols: self.cols + other.cols,
        }
    }

    /// Copy of the matrix without the listed rows.
    pub fn without_rows(&self, drop: &[usize]) -> Self {
        let rows = self
            .rows
            .iter()
            .enumerate()
            .filter(|(i, _)| !drop.contains(i))
            .map(|(_, r)| r.clone())
            .collect();
        Self {
            rows,
            cols: self.cols,
        }
    }

    /// Matrix-vector product, one parity bit per row.
    pub fn syndrome(&self, v: &BitSlice<u64, Lsb0>) -> BitRow {
        self.rows.iter().map(|row| dot(row, v)).collect()
    }

    /// Reduced row echelon form and its pivot columns.
    pub fn rref(&self) -> (BitMatrix, Vec<usize>) {
        let mut rows = self.rows.clone();
        let mut pivots = Vec::new();
        let mut r = 0;
        for c in 0..self.cols {
            if r == rows.len() {
                break;
            }
            let Some(p) = (r..rows.len()).find(|&i| rows[i][c]) else {
                continue;
            };
            rows.swap(r, p);
            let pivot_row = rows[r].clone();
            for (i, row) in rows.iter_mut().enumerate() {
                if i != r && row[c] {
                    *row ^= pivot_row.as_bitslice();
                }
            }
            pivots.push(c);
            r += 1;
        }
        rows.truncate(r);
        (
            BitMatrix {
                rows,
                cols: self.cols,
            },
            pivots,
        )
    }

    pub fn rank(&self) -> usize {
        self.rref().1.len()
    }

    /// Basis of the right null space `{x : self · x = 0}`, one vector per row.
    pub fn kernel(&self) -> BitMatrix {
        let (reduced, pivots) = self.rref();
        let mut is_pivot = vec![false; self.cols];
        for &p in &pivots {
            is_pivot[p] = true;
        }
        let basis = (0..self.cols)
            .filter(|&f| !is_pivot[f])
            .map(|free| {
                let mut v = zero_row(self.cols);
                v.set(free, true);
                for (row, &p) in reduced.rows.iter().zip(&pivots) {
                    if row[free] {
                        v.set(p, true);
                    }
                }
                v
            })
            .collect();
        BitMatrix {
            rows: basis,
            cols: self.cols,
        }
    }

    /// Indices of rows that are linear combinations of earlier rows.
    pub fn redundant_rows(&self) -> Vec<usize> {
        let mut basis = EchelonBasis::new(self.cols);
        self.rows
            .iter()
            .enumerate()
            .filter_map(|(i, row)| (!basis.insert(row)).then_some(i))
            .collect()
    }
}

impl fmt::Debug for BitMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BitMatrix {}x{}", self.rows.len(), self.cols)?;
        for row in &self.rows {
            let line: String = row.iter().map(|b| if *b { '1' } else { '0' }).collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Incrementally built row-space basis.
///
/// Vectors are kept with distinct pivots, each reduced against all earlier
/// ones, so reducing a candidate in insertion order clears every pivot.
#[derive(Clone, Debug)]
pub struct EchelonBasis {
    len: usize,
    vectors: Vec<(usize, BitRow)>,
}

impl EchelonBasis {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            vectors: Vec::new(),
        }
    }

    pub fn dim(&self) -> usize {
        self.vectors.len()
    }

    /// Reduces `v` against the basis; the result is zero iff `v` is in the span.
    pub fn reduce(&self, v: &BitSlice<u64, Lsb0>) -> BitRow {
        debug_assert_eq!(v.len(), self.len);
        let mut out = v.to_bitvec();
        for (pivot, b) in &self.vectors {
            if out[*pivot] {
                out ^= b.as_bitslice();
            }
        }
        out
    }

    pub fn contains(&self, v: &BitSlice<u64, Lsb0>) -> bool {
        self.reduce(v).not_any()
    }

    /// Adds `v` to the span. Returns `false` if it was already spanned.
    pub fn insert(&mut self, v: &BitSlice<u64, Lsb0>) -> bool {
        let reduced = self.reduce(v);
        match reduced.first_one() {
            Some(pivot) => {
                self.vectors.push((pivot, reduced));
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cyclic_shift_powers_compose() {
        let s1 = BitMatrix::cyclic_shift(5, 1);
        let s2 = BitMatrix::cyclic_shift(5, 2);
        assert_eq!(s1.mul(&s1), s2);
        assert_eq!(s2.mul(&BitMatrix::cyclic_shift(5, 3)), BitMatrix::identity(5));
    }

    #[test]
    fn kernel_vectors_are_annihilated() {
        let h = BitMatrix::from_supports([vec![0, 1], vec![1, 2], vec![2, 3]], 5);
        assert_eq!(h.rank(), 3);
        let ker = h.kernel();
        assert_eq!(ker.num_rows(), 2);
        for v in ker.rows() {
            assert!(h.syndrome(v).not_any());
        }
    }

    #[test]
    fn redundant_rows_are_reported_in_order() {
        let h = BitMatrix::from_supports(
            [vec![0, 1], vec![1, 2], vec![0, 2], vec![3], vec![0, 1, 3]],
            4,
        );
        assert_eq!(h.redundant_rows(), vec![2, 4]);
        assert_eq!(h.rank(), 3);
        let mut basis = EchelonBasis::new(4);
        for row in h.rows() {
            basis.insert(row);
        }
        assert!(basis.contains(h.row(4)));
    }

    #[test]
    fn kron_of_identities_is_identity() {
        let k = BitMatrix::identity(2).kron(&BitMatrix::identity(3));
        assert_eq!(k, BitMatrix::identity(6));
        let t = BitMatrix::cyclic_shift(3, 1).transpose();
        assert_eq!(t, BitMatrix::cyclic_shift(3, 2));
    }
}
