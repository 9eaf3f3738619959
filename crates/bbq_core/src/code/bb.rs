//! Bivariate-bicycle codes on a `2l × 2m` torus.
//!
//! Data qubits sit on the `(even, even)` and `(odd, odd)` sublattices,
//! X ancillas on `(odd, even)` and Z ancillas on `(even, odd)`. Each ancilla
//! couples to four nearest neighbors (slots 0..=3) and two long-range
//! neighbors (slots 4 and 5) whose offsets come from the polynomial
//! exponents.

use super::{CodeLayout, CssCode, IncidenceMap, QubitPartition, Stabilizer, StabilizerKind};
use crate::QecError;
use crate::config::BbParams;
use crate::gf2::BitMatrix;
use crate::lattice::Lattice;
use std::collections::HashMap;
use tracing::info;

/// Designed weight of every BB stabilizer.
pub const BB_STABILIZER_WEIGHT: usize = 6;

/// Slot of the first long-range neighbor.
pub const FIRST_LONG_RANGE_SLOT: usize = 4;

/// Slot of the second long-range neighbor.
pub const SECOND_LONG_RANGE_SLOT: usize = 5;

type Offsets = [(i64, i64); BB_STABILIZER_WEIGHT];

/// Which ancilla of the opposite type serves as a routing bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pairing {
    /// Pairing through the first long-range offsets (slot 4 on both sides).
    Full,
    /// Pairing used when both stabilizer types lose a coupler.
    Half,
    /// Nearest relay ancilla of a three-coupler surface patch; BB codes have none.
    Relay,
}

/// A BB code with its incidence maps, pairings and parity checks.
#[derive(Debug, Clone)]
pub struct BbCode {
    params: BbParams,
    lattice: Lattice,
    partition: QubitPartition,
    x_stabilizers: IncidenceMap,
    z_stabilizers: IncidenceMap,
    x_offsets: Offsets,
    z_offsets: Offsets,
    partners: HashMap<(StabilizerKind, Pairing), HashMap<usize, usize>>,
    css: CssCode,
}

/// Relative data-qubit offsets of the six slots, for X and Z ancillas.
fn slot_offsets(p: &BbParams) -> (Offsets, Offsets) {
    let a1 = 2 * p.a;
    let b1 = 2 * (p.b - 1) + 1;
    let c1 = 2 * (p.c - 1) + 1;
    let d1 = 2 * p.d;
    let x = [(0, -1), (1, 0), (0, 1), (-1, 0), (c1, d1), (a1, b1)];
    let z = [(0, -1), (1, 0), (0, 1), (-1, 0), (-a1, -b1), (-c1, -d1)];
    (x, z)
}

/// Lattice label of column `idx` of the polynomial check matrices.
///
/// Columns `0..n/2` (the `A` block of `hx`) land on the `(odd, odd)`
/// sublattice shifted one column left; columns `n/2..n` land on the
/// `(even, even)` sublattice. The result is taken modulo `2n`, the lattice
/// size. This must change together with the qubit placement in
/// [`BbCode::new`].
pub fn solver_column_label(idx: usize, m: usize, n: usize) -> usize {
    if idx < n / 2 {
        (2 * m + (idx / m) * 4 * m + ((idx + 2 * m - 1) % m) * 2 + 1) % (2 * n)
    } else {
        let idx = idx - n / 2;
        ((idx / m) * 4 * m + (idx % m) * 2) % (2 * n)
    }
}

impl BbCode {
    /// Builds the code from polynomial parameters.
    ///
    /// # Arguments
    ///
    /// * `params` - Lattice dimensions and the four polynomial exponents
    ///
    /// # Returns
    ///
    /// The code, or an error when the lattice is empty or the offsets
    /// collapse two slots of a stabilizer onto the same data qubit.
    pub fn new(params: BbParams) -> Result<Self, QecError> {
        params.validate()?;
        let (l, m) = (params.l, params.m);
        let lattice = Lattice::new(2 * l, 2 * m);
        let (x_offsets, z_offsets) = slot_offsets(&params);

        let mut data = Vec::with_capacity(params.n());
        let mut x_stabs = Vec::with_capacity(l * m);
        let mut z_stabs = Vec::with_capacity(l * m);
        for i in 0..l as i64 {
            for j in 0..m as i64 {
                data.push(lattice.label(2 * i, 2 * j));
                data.push(lattice.label(2 * i + 1, 2 * j + 1));

                let (xr, xc) = (2 * i + 1, 2 * j);
                x_stabs.push(Stabilizer {
                    ancilla: lattice.label(xr, xc),
                    slots: x_offsets
                        .iter()
                        .map(|&(dr, dc)| Some(lattice.label(xr + dr, xc + dc)))
                        .collect(),
                });

                let (zr, zc) = (2 * i, 2 * j + 1);
                z_stabs.push(Stabilizer {
                    ancilla: lattice.label(zr, zc),
                    slots: z_offsets
                        .iter()
                        .map(|&(dr, dc)| Some(lattice.label(zr + dr, zc + dc)))
                        .collect(),
                });
            }
        }
        data.sort_unstable();

        for (kind, stabs) in [(StabilizerKind::X, &x_stabs), (StabilizerKind::Z, &z_stabs)] {
            for s in stabs.iter() {
                let mut support: Vec<usize> = s.support().collect();
                support.sort_unstable();
                support.dedup();
                if support.len() != BB_STABILIZER_WEIGHT {
                    return Err(QecError::WeightMismatch {
                        kind,
                        ancilla: s.ancilla,
                        expected: BB_STABILIZER_WEIGHT,
                        found: support.len(),
                    });
                }
            }
        }

        let partition = QubitPartition::new(
            data,
            x_stabs.iter().map(|s| s.ancilla).collect(),
            z_stabs.iter().map(|s| s.ancilla).collect(),
        );

        let mut partners = HashMap::new();
        let sub = |a: (i64, i64), b: (i64, i64)| (a.0 - b.0, a.1 - b.1);
        let pairing_rules = [
            (StabilizerKind::X, Pairing::Full, sub(x_offsets[4], z_offsets[4])),
            (StabilizerKind::X, Pairing::Half, sub(x_offsets[5], z_offsets[3])),
            (StabilizerKind::Z, Pairing::Full, sub(z_offsets[4], x_offsets[4])),
            (StabilizerKind::Z, Pairing::Half, sub(z_offsets[5], x_offsets[2])),
        ];
        for (kind, pairing, (dr, dc)) in pairing_rules {
            let ancillas = partition.ancillas(kind);
            let map = ancillas
                .iter()
                .map(|&a| (a, lattice.offset(a, dr, dc)))
                .collect();
            partners.insert((kind, pairing), map);
        }

        let css = CssCode::new(
            Self::polynomial_hx(&params),
            Self::polynomial_hz(&params),
            (0..params.n())
                .map(|idx| solver_column_label(idx, m, params.n()))
                .collect(),
        )?;

        info!(
            l,
            m,
            n = params.n(),
            k = css.k(),
            "constructed BB code"
        );

        Ok(Self {
            params,
            lattice,
            partition,
            x_stabilizers: IncidenceMap::new(StabilizerKind::X, x_stabs),
            z_stabilizers: IncidenceMap::new(StabilizerKind::Z, z_stabs),
            x_offsets,
            z_offsets,
            partners,
            css,
        })
    }

    /// The polynomials `A` and `B` as `lm × lm` matrices.
    fn polynomials(p: &BbParams) -> (BitMatrix, BitMatrix) {
        let (l, m) = (p.l, p.m);
        let x = |i: i64| {
            BitMatrix::cyclic_shift(l, i.rem_euclid(l as i64) as usize).kron(&BitMatrix::identity(m))
        };
        let y = |j: i64| {
            BitMatrix::identity(l).kron(&BitMatrix::cyclic_shift(m, j.rem_euclid(m as i64) as usize))
        };
        let id = BitMatrix::identity(l * m);
        let a = id.add(&y(1)).add(&x(p.a).mul(&y(p.b)));
        let b = id.add(&x(1)).add(&x(p.c).mul(&y(p.d)));
        (a, b)
    }

    fn polynomial_hx(p: &BbParams) -> BitMatrix {
        let (a, b) = Self::polynomials(p);
        a.hstack(&b)
    }

    fn polynomial_hz(p: &BbParams) -> BitMatrix {
        let (a, b) = Self::polynomials(p);
        b.transpose().hstack(&a.transpose())
    }

    pub fn params(&self) -> &BbParams {
        &self.params
    }

    /// Number of data qubits.
    pub fn n(&self) -> usize {
        self.params.n()
    }

    /// Number of logical qubits.
    pub fn k(&self) -> usize {
        self.css.k()
    }

    pub fn css(&self) -> &CssCode {
        &self.css
    }

    pub fn hx(&self) -> &BitMatrix {
        self.css.hx()
    }

    pub fn hz(&self) -> &BitMatrix {
        self.css.hz()
    }

    /// Slot offsets `(drow, dcol)` for ancillas of the given type.
    pub fn offsets(&self, kind: StabilizerKind) -> &[(i64, i64); BB_STABILIZER_WEIGHT] {
        match kind {
            StabilizerKind::X => &self.x_offsets,
            StabilizerKind::Z => &self.z_offsets,
        }
    }

    /// Total number of long-range couplers (two per ancilla).
    pub fn long_range_couplers(&self) -> usize {
        2 * (self.x_stabilizers.len() + self.z_stabilizers.len())
    }
}

impl CodeLayout for BbCode {
    fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    fn partition(&self) -> &QubitPartition {
        &self.partition
    }

    fn stabilizers(&self, kind: StabilizerKind) -> &IncidenceMap {
        match kind {
            StabilizerKind::X => &self.x_stabilizers,
            StabilizerKind::Z => &self.z_stabilizers,
        }
    }

    fn z_logicals(&self) -> Vec<Vec<usize>> {
        self.css.logical_supports(StabilizerKind::Z)
    }
    /// Partners are translations by a fixed offset, so each pairing is a
    /// bijection between the two ancilla sets.
    fn partner(&self, kind: StabilizerKind, ancilla: usize, pairing: Pairing) -> Option<usize> {
        self.partners
            .get(&(kind, pairing))
            .and_then(|m| m.get(&ancilla))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::code_config;

    fn balanced() -> BbCode {
        BbCode::new(code_config(1).unwrap().params).unwrap()
    }

    #[test]
    fn roles_are_disjoint_and_cover_the_lattice() {
        let code = balanced();
        let mut all = code.partition().all();
        assert_eq!(all.len(), code.lattice().size());
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), code.lattice().size());
    }

    #[test]
    fn partners_are_mutually_inverse_for_full_pairing() {
        let code = balanced();
        for &x in code.partition().x_ancillas() {
            let z = code.partner(StabilizerKind::X, x, Pairing::Full).unwrap();
            assert!(code.stabilizers(StabilizerKind::Z).get(z).is_some());
            assert_eq!(code.partner(StabilizerKind::Z, z, Pairing::Full), Some(x));
        }
    }

    #[test]
    fn half_pairing_neighbors_the_second_long_range_qubit() {
        let code = balanced();
        let lattice = *code.lattice();
        for s in code.stabilizers(StabilizerKind::Z).iter() {
            let bridge = code.partner(StabilizerKind::Z, s.ancilla, Pairing::Half).unwrap();
            assert!(code.stabilizers(StabilizerKind::X).get(bridge).is_some());
            assert_eq!(lattice.offset(bridge, 0, 1), s.slot(SECOND_LONG_RANGE_SLOT).unwrap());
        }
    }

    #[test]
    fn column_remap_hits_every_data_qubit_once() {
        let code = balanced();
        let mut labels = code.css().column_labels().to_vec();
        labels.sort_unstable();
        assert_eq!(labels, code.partition().data());
    }

    #[test]
    fn collapsed_offsets_are_rejected() {
        // a = 0, b = 1 lands slot 5 on slot 2.
        let err = BbCode::new(BbParams::new(3, 3, 0, 1, 1, 0)).unwrap_err();
        assert!(matches!(err, QecError::WeightMismatch { .. }));
    }
}
