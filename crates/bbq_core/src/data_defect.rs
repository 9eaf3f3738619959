//! Faulty data qubits.
//!
//! A stabilizer touching a faulty data qubit can no longer be measured as
//! designed. The incomplete stabilizers of each type are combined into
//! super-stabilizers: GF(2) products whose support avoids every faulty qubit.
//! Logical operators are moved off the faulty qubits the same way, by
//! multiplying them with stabilizers of their own type.

use crate::QecError;
use crate::code::{CodeLayout, CssCode, StabilizerKind};
use crate::gf2::{self, BitMatrix, EchelonBasis};
use rand::Rng;
use tracing::{debug, info};

/// Sorted set of faulty data qubits, as lattice labels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataDefects {
    qubits: Vec<usize>,
}

impl DataDefects {
    pub fn new(mut qubits: Vec<usize>) -> Self {
        qubits.sort_unstable();
        qubits.dedup();
        Self { qubits }
    }

    /// Marks each data qubit faulty independently with probability `rate`.
    pub fn sample<L: CodeLayout, R: Rng + ?Sized>(
        code: &L,
        rate: f64,
        rng: &mut R,
    ) -> Result<Self, QecError> {
        if !(0.0..=1.0).contains(&rate) {
            return Err(QecError::InvalidConfiguration(format!(
                "data defect rate must lie in [0, 1], got {rate}"
            )));
        }
        let qubits = code
            .partition()
            .data()
            .iter()
            .copied()
            .filter(|_| rng.gen_bool(rate))
            .collect();
        let defects = Self::new(qubits);
        info!(rate, faulty = defects.len(), "sampled data qubit defects");
        Ok(defects)
    }

    pub fn qubits(&self) -> &[usize] {
        &self.qubits
    }

    pub fn contains(&self, qubit: usize) -> bool {
        self.qubits.binary_search(&qubit).is_ok()
    }

    pub fn len(&self) -> usize {
        self.qubits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.qubits.is_empty()
    }

    /// Logical basis of one type whose supports avoid every faulty qubit.
    ///
    /// Each candidate is a product of `kind` checks and `kind` logicals; it
    /// avoids the faulty columns exactly when its coefficient vector lies in
    /// the left null space of those rows restricted to the faulty columns.
    /// Null-space vectors are kept while their logical parts stay
    /// independent, so the result is a full logical basis modulo the checks.
    ///
    /// # Returns
    ///
    /// `k` supports as sorted lattice labels, or
    /// [`QecError::UncleanableLogical`] when the faulty qubits carry a
    /// logical operator of the dual type.
    pub fn clean_logicals(
        &self,
        css: &CssCode,
        kind: StabilizerKind,
    ) -> Result<Vec<Vec<usize>>, QecError> {
        if self.is_empty() {
            return Ok(css.logical_supports(kind));
        }
        let checks = css.checks(kind);
        let logicals = css.logicals(kind);
        let (r, k, n) = (checks.num_rows(), logicals.num_rows(), css.n());
        let rows: Vec<_> = checks.rows().chain(logicals.rows()).collect();

        let faulty: Vec<usize> = (0..n)
            .filter(|&c| self.contains(css.column_labels()[c]))
            .collect();
        let restricted = BitMatrix::from_supports(
            rows.iter().map(|row| {
                faulty
                    .iter()
                    .enumerate()
                    .filter(|&(_, &c)| row[c])
                    .map(|(i, _)| i)
                    .collect::<Vec<_>>()
            }),
            faulty.len(),
        );

        let mut chosen = EchelonBasis::new(k);
        let mut out = Vec::with_capacity(k);
        for combo in restricted.transpose().kernel().rows() {
            if chosen.dim() == k {
                break;
            }
            if !chosen.insert(&combo[r..]) {
                continue;
            }
            let mut product = gf2::zero_row(n);
            for i in combo.iter_ones() {
                product ^= rows[i].as_bitslice();
            }
            out.push(css.labels_of(product.iter_ones()));
        }
        if out.len() < k {
            return Err(QecError::UncleanableLogical {
                kind,
                faulty: self.len(),
            });
        }
        debug!(?kind, faulty = self.len(), logicals = k, "cleaned logicals");
        Ok(out)
    }
}

/// A stabilizer with its faulty qubits removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReducedStabilizer {
    pub ancilla: usize,
    /// Surviving support, sorted.
    pub support: Vec<usize>,
    /// Number of faulty qubits that were removed.
    pub lost: usize,
}

impl ReducedStabilizer {
    pub fn is_complete(&self) -> bool {
        self.lost == 0
    }
}

/// Per-stabilizer reduced supports of one type, split by completeness.
#[derive(Debug, Clone)]
pub struct DefectSplit {
    pub kind: StabilizerKind,
    pub complete: Vec<ReducedStabilizer>,
    pub incomplete: Vec<ReducedStabilizer>,
}

/// Reduces every stabilizer of `kind` and sorts it into complete or incomplete.
pub fn split_stabilizers<L: CodeLayout>(
    code: &L,
    defects: &DataDefects,
    kind: StabilizerKind,
) -> DefectSplit {
    let (complete, incomplete) = code
        .stabilizers(kind)
        .iter()
        .map(|s| {
            let mut support: Vec<usize> = s.support().filter(|&q| !defects.contains(q)).collect();
            support.sort_unstable();
            ReducedStabilizer {
                ancilla: s.ancilla,
                lost: s.weight() - support.len(),
                support,
            }
        })
        .partition(ReducedStabilizer::is_complete);
    DefectSplit {
        kind,
        complete,
        incomplete,
    }
}

/// Product of incomplete stabilizers that avoids every faulty qubit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuperStabilizer {
    pub kind: StabilizerKind,
    /// Ancillas whose stabilizers are multiplied together.
    pub components: Vec<usize>,
    /// Support of the product, sorted lattice labels.
    pub support: Vec<usize>,
}

/// Builds independent super-stabilizers of one type.
///
/// Let `M` be the incomplete stabilizers restricted to the faulty columns.
/// Products avoiding all faulty qubits are exactly the left null space of
/// `M`. Each null-space vector is kept only if its product is nonzero and
/// independent of the products already kept.
pub fn super_stabilizers<L: CodeLayout>(
    code: &L,
    defects: &DataDefects,
    kind: StabilizerKind,
) -> Vec<SuperStabilizer> {
    let split = split_stabilizers(code, defects, kind);
    let stabs = code.stabilizers(kind);
    let partition = code.partition();
    let n = partition.data().len();

    let full: Vec<Vec<usize>> = split
        .incomplete
        .iter()
        .filter_map(|r| stabs.get(r.ancilla))
        .map(|s| s.support().filter_map(|q| partition.data_index(q)).collect())
        .collect();
    let faulty_columns: Vec<usize> = defects
        .qubits()
        .iter()
        .filter_map(|&q| partition.data_index(q))
        .collect();
    let restricted = BitMatrix::from_supports(
        full.iter().map(|cols| {
            faulty_columns
                .iter()
                .enumerate()
                .filter(|(_, f)| cols.contains(f))
                .map(|(i, _)| i)
                .collect::<Vec<_>>()
        }),
        faulty_columns.len(),
    );

    let mut seen = EchelonBasis::new(n);
    let mut out = Vec::new();
    for combo in restricted.transpose().kernel().rows() {
        let product = BitMatrix::from_supports(
            combo.iter_ones().map(|i| full[i].iter().copied()),
            n,
        )
        .rows()
        .fold(crate::gf2::zero_row(n), |mut acc, row| {
            acc ^= row.as_bitslice();
            acc
        });
        if product.not_any() || !seen.insert(&product) {
            continue;
        }
        let mut support: Vec<usize> = product.iter_ones().map(|c| partition.data()[c]).collect();
        support.sort_unstable();
        out.push(SuperStabilizer {
            kind,
            components: combo.iter_ones().map(|i| split.incomplete[i].ancilla).collect(),
            support,
        });
    }
    debug!(
        ?kind,
        incomplete = split.incomplete.len(),
        super_stabilizers = out.len(),
        "built super-stabilizers"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{BbCode, SurfaceCode, SurfaceLayout, check_logicals};
    use crate::config::{SurfaceParams, code_config};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn balanced() -> BbCode {
        BbCode::new(code_config(1).unwrap().params).unwrap()
    }

    #[test]
    fn sampling_is_seeded_and_bounded() {
        let code = balanced();
        let a = DataDefects::sample(&code, 0.1, &mut StdRng::seed_from_u64(8)).unwrap();
        let b = DataDefects::sample(&code, 0.1, &mut StdRng::seed_from_u64(8)).unwrap();
        assert_eq!(a, b);
        assert!(DataDefects::sample(&code, 0.0, &mut StdRng::seed_from_u64(8)).unwrap().is_empty());
        assert!(DataDefects::sample(&code, 2.0, &mut StdRng::seed_from_u64(8)).is_err());
    }

    #[test]
    fn one_faulty_qubit_touches_three_stabilizers_per_type() {
        let code = balanced();
        let q = code.partition().data()[0];
        let defects = DataDefects::new(vec![q]);
        for kind in [StabilizerKind::X, StabilizerKind::Z] {
            let split = split_stabilizers(&code, &defects, kind);
            assert_eq!(split.incomplete.len(), 3);
            assert_eq!(split.complete.len(), 33);
            assert!(split.incomplete.iter().all(|r| r.support.len() == 5));

            let supers = super_stabilizers(&code, &defects, kind);
            assert_eq!(supers.len(), 2);
            for s in &supers {
                assert!(!s.support.contains(&q));
                assert_eq!(s.components.len() % 2, 0);
            }
        }
    }

    #[test]
    fn super_stabilizers_avoid_every_faulty_qubit() {
        let code = balanced();
        let defects = DataDefects::sample(&code, 0.05, &mut StdRng::seed_from_u64(11)).unwrap();
        for kind in [StabilizerKind::X, StabilizerKind::Z] {
            let supers = super_stabilizers(&code, &defects, kind);
            let mut basis = EchelonBasis::new(code.partition().data().len());
            for s in &supers {
                assert!(s.support.iter().all(|&q| !defects.contains(q)));
                let row = BitMatrix::from_supports(
                    [s.support.iter().map(|&q| code.partition().data_index(q).unwrap())],
                    code.partition().data().len(),
                );
                assert!(basis.insert(row.row(0)));
            }
        }
    }

    fn columns(code: &BbCode, labels: &[usize]) -> Vec<usize> {
        labels
            .iter()
            .map(|&q| code.css().column_labels().iter().position(|&l| l == q).unwrap())
            .collect()
    }

    #[test]
    fn cleaned_logicals_avoid_faulty_qubits() {
        let code = balanced();
        let css = code.css();
        let defects = DataDefects::new(code.partition().data()[..6].to_vec());
        for kind in [StabilizerKind::X, StabilizerKind::Z] {
            let cleaned = defects.clean_logicals(css, kind).unwrap();
            assert_eq!(cleaned.len(), css.k());
            for logical in &cleaned {
                assert!(!logical.is_empty());
                assert!(logical.iter().all(|&q| !defects.contains(q)));
            }

            let n = css.n();
            let as_matrix = BitMatrix::from_supports(cleaned.iter().map(|l| columns(&code, l)), n);
            assert_eq!(check_logicals(css.checks(kind.dual()), &as_matrix), Ok(()));
            for sup in super_stabilizers(&code, &defects, kind.dual()) {
                for logical in &cleaned {
                    let overlap = logical.iter().filter(|q| sup.support.contains(q)).count();
                    assert_eq!(overlap % 2, 0);
                }
            }

            let checks = css.checks(kind);
            let mut stacked = EchelonBasis::new(n);
            for row in checks.rows() {
                stacked.insert(row);
            }
            let rank = stacked.dim();
            for row in as_matrix.rows() {
                assert!(stacked.insert(row), "cleaned {kind:?} logicals are dependent");
            }
            assert_eq!(stacked.dim(), rank + css.k());
        }
    }

    #[test]
    fn defect_free_cleaning_keeps_the_basis() {
        let code = balanced();
        let cleaned = DataDefects::default().clean_logicals(code.css(), StabilizerKind::Z).unwrap();
        assert_eq!(cleaned, code.css().logical_supports(StabilizerKind::Z));
    }

    #[test]
    fn logical_support_cannot_be_cleaned_by_its_dual() {
        let code = SurfaceCode::new(SurfaceParams::new(3, 3), SurfaceLayout::Standard).unwrap();
        let defects = DataDefects::new(code.x_logical().to_vec());
        assert!(matches!(
            defects.clean_logicals(code.css(), StabilizerKind::Z),
            Err(QecError::UncleanableLogical { kind: StabilizerKind::Z, faulty: 3 })
        ));
        let x = defects.clean_logicals(code.css(), StabilizerKind::X).unwrap();
        assert_eq!(x.len(), 1);
        assert!(x[0].iter().all(|&q| !defects.contains(q)));
    }
}
