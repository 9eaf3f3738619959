//! CSS parity-check pair with its logical basis.

use super::StabilizerKind;
use crate::QecError;
use crate::gf2::{BitMatrix, EchelonBasis};
use tracing::debug;

/// A CSS code given by `hx` and `hz` over a shared column ordering.
///
/// Column `j` corresponds to the data qubit with lattice label
/// `column_labels[j]`. The logical bases are computed once at construction:
/// `lz` spans `ker(hx) / rowspace(hz)` and `lx` spans `ker(hz) / rowspace(hx)`.
#[derive(Debug, Clone)]
pub struct CssCode {
    hx: BitMatrix,
    hz: BitMatrix,
    lx: BitMatrix,
    lz: BitMatrix,
    column_labels: Vec<usize>,
}

impl CssCode {
    /// Builds the code and its logical bases.
    ///
    /// # Arguments
    ///
    /// * `hx` - X-type checks, one row per X stabilizer
    /// * `hz` - Z-type checks, one row per Z stabilizer
    /// * `column_labels` - Lattice label of the data qubit behind each column
    ///
    /// # Returns
    ///
    /// The code, or an error if the checks do not commute or the shapes
    /// disagree.
    pub fn new(hx: BitMatrix, hz: BitMatrix, column_labels: Vec<usize>) -> Result<Self, QecError> {
        let n = hx.num_cols();
        if hz.num_cols() != n || column_labels.len() != n {
            return Err(QecError::InvalidConfiguration(format!(
                "check matrices disagree on qubit count: hx {}, hz {}, labels {}",
                n,
                hz.num_cols(),
                column_labels.len()
            )));
        }
        if let Err((z_row, x_row)) = super::check_logicals(&hx, &hz) {
            return Err(QecError::InvalidConfiguration(format!(
                "X check {x_row} and Z check {z_row} anticommute"
            )));
        }

        let lz = logical_basis(&hx, &hz);
        let lx = logical_basis(&hz, &hx);
        debug_assert_eq!(lx.num_rows(), lz.num_rows());
        debug!(n, k = lz.num_rows(), "built CSS code");

        Ok(Self {
            hx,
            hz,
            lx,
            lz,
            column_labels,
        })
    }

    pub fn n(&self) -> usize {
        self.hx.num_cols()
    }

    /// Number of logical qubits, `n - rank(hx) - rank(hz)`.
    pub fn k(&self) -> usize {
        self.lz.num_rows()
    }

    pub fn hx(&self) -> &BitMatrix {
        &self.hx
    }

    pub fn hz(&self) -> &BitMatrix {
        &self.hz
    }

    pub fn lx(&self) -> &BitMatrix {
        &self.lx
    }

    pub fn lz(&self) -> &BitMatrix {
        &self.lz
    }

    pub fn checks(&self, kind: StabilizerKind) -> &BitMatrix {
        match kind {
            StabilizerKind::X => &self.hx,
            StabilizerKind::Z => &self.hz,
        }
    }

    pub fn logicals(&self, kind: StabilizerKind) -> &BitMatrix {
        match kind {
            StabilizerKind::X => &self.lx,
            StabilizerKind::Z => &self.lz,
        }
    }

    pub fn column_labels(&self) -> &[usize] {
        &self.column_labels
    }

    /// Converts a set of columns to lattice labels, sorted.
    pub fn labels_of(&self, columns: impl IntoIterator<Item = usize>) -> Vec<usize> {
        let mut labels: Vec<usize> = columns
            .into_iter()
            .map(|c| self.column_labels[c])
            .collect();
        labels.sort_unstable();
        labels
    }

    /// Logical supports of the given type as lattice labels.
    pub fn logical_supports(&self, kind: StabilizerKind) -> Vec<Vec<usize>> {
        let basis = self.logicals(kind);
        (0..basis.num_rows())
            .map(|r| self.labels_of(basis.row(r).iter_ones()))
            .collect()
    }

    /// Smallest row weight of the canonical Z logical basis.
    ///
    /// An upper bound on the Z distance that needs no solver; zero if `k = 0`.
    pub fn basis_weight_bound(&self) -> usize {
        (0..self.lz.num_rows())
            .map(|r| self.lz.row_weight(r))
            .min()
            .unwrap_or(0)
    }

    /// The same code with some X checks removed, as when their ancillas drop out.
    ///
    /// Removing checks can only grow the logical space; the Z distance of the
    /// result is computed by the same solver path as the full code.
    pub fn without_x_checks(&self, rows: &[usize]) -> Result<CssCode, QecError> {
        CssCode::new(
            self.hx.without_rows(rows),
            self.hz.clone(),
            self.column_labels.clone(),
        )
    }

    /// Indices of X and Z checks that are products of earlier checks.
    pub fn redundant_checks(&self) -> (Vec<usize>, Vec<usize>) {
        (self.hx.redundant_rows(), self.hz.redundant_rows())
    }
}

/// Basis of `ker(checks) / rowspace(stabilizers)`.
fn logical_basis(checks: &BitMatrix, stabilizers: &BitMatrix) -> BitMatrix {
    let n = checks.num_cols();
    let mut span = EchelonBasis::new(n);
    for row in stabilizers.rows() {
        span.insert(row);
    }
    let kernel = checks.kernel();
    let rows = kernel
        .rows()
        .filter(|v| span.insert(v))
        .cloned()
        .collect();
    BitMatrix::from_rows(rows, n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::check_logicals;

    /// Steane code, columns labelled 0..7.
    fn steane() -> CssCode {
        let h = BitMatrix::from_supports(
            [vec![3, 4, 5, 6], vec![1, 2, 5, 6], vec![0, 2, 4, 6]],
            7,
        );
        CssCode::new(h.clone(), h, (0..7).collect()).unwrap()
    }

    #[test]
    fn steane_code_has_one_logical() {
        let code = steane();
        assert_eq!(code.k(), 1);
        assert!(check_logicals(code.hx(), code.lz()).is_ok());
        assert!(check_logicals(code.hz(), code.lx()).is_ok());
        assert!(crate::gf2::dot(code.lx().row(0), code.lz().row(0)));
    }

    #[test]
    fn anticommuting_checks_are_rejected() {
        let hx = BitMatrix::from_supports([vec![0, 1]], 3);
        let hz = BitMatrix::from_supports([vec![1, 2]], 3);
        assert!(CssCode::new(hx, hz, vec![0, 1, 2]).is_err());
    }

    #[test]
    fn dropping_checks_grows_the_logical_space() {
        let code = steane();
        let reduced = code.without_x_checks(&[0]).unwrap();
        assert_eq!(reduced.k(), 2);
        assert_eq!(code.redundant_checks(), (vec![], vec![]));
    }
}
