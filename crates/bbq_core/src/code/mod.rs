//! Stabilizer code models.
//!
//! A code is described by its lattice, the partition of lattice sites into
//! data and ancilla qubits, and one incidence map per stabilizer type. The
//! incidence maps are the single source of truth for circuit construction;
//! the parity-check matrices in [`css::CssCode`] are derived views used for
//! rank, logical and distance computations.

pub mod bb;
pub mod css;
pub mod surface;

use crate::gf2::BitMatrix;
use crate::lattice::Lattice;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use bb::{BbCode, Pairing};
pub use css::CssCode;
pub use surface::{SurfaceCode, SurfaceLayout};

/// Pauli type of a stabilizer (and of the ancilla that measures it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StabilizerKind {
    X,
    Z,
}

impl StabilizerKind {
    /// The opposite Pauli type.
    pub const fn dual(self) -> Self {
        match self {
            StabilizerKind::X => StabilizerKind::Z,
            StabilizerKind::Z => StabilizerKind::X,
        }
    }
}

/// One stabilizer: its ancilla and the data qubit in each neighbor slot.
///
/// A slot is `None` when the neighbor falls outside a surface-code boundary.
/// BB stabilizers never have absent slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stabilizer {
    pub ancilla: usize,
    pub slots: Vec<Option<usize>>,
}

impl Stabilizer {
    pub fn slot(&self, k: usize) -> Option<usize> {
        self.slots.get(k).copied().flatten()
    }

    /// Data qubits in slot order, absent slots skipped.
    pub fn support(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots.iter().filter_map(|s| *s)
    }

    pub fn weight(&self) -> usize {
        self.support().count()
    }
}

/// Ancilla-to-data incidence for one stabilizer type.
///
/// Stabilizers keep their construction order, which fixes the order of
/// ancilla measurements and therefore every detector record offset.
#[derive(Debug, Clone)]
pub struct IncidenceMap {
    kind: StabilizerKind,
    stabilizers: Vec<Stabilizer>,
    position: HashMap<usize, usize>,
}

impl IncidenceMap {
    pub fn new(kind: StabilizerKind, stabilizers: Vec<Stabilizer>) -> Self {
        let position = stabilizers
            .iter()
            .enumerate()
            .map(|(i, s)| (s.ancilla, i))
            .collect();
        Self {
            kind,
            stabilizers,
            position,
        }
    }

    pub fn kind(&self) -> StabilizerKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.stabilizers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stabilizers.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Stabilizer> {
        self.stabilizers.iter()
    }

    pub fn stabilizers(&self) -> &[Stabilizer] {
        &self.stabilizers
    }

    /// Ancilla labels in measurement order.
    pub fn ancillas(&self) -> Vec<usize> {
        self.stabilizers.iter().map(|s| s.ancilla).collect()
    }

    pub fn get(&self, ancilla: usize) -> Option<&Stabilizer> {
        self.position.get(&ancilla).map(|&i| &self.stabilizers[i])
    }

    /// Index of an ancilla in measurement order.
    pub fn position(&self, ancilla: usize) -> Option<usize> {
        self.position.get(&ancilla).copied()
    }

    /// Data qubit at `(ancilla, slot)`, or `None` if absent or unknown.
    pub fn entry(&self, ancilla: usize, slot: usize) -> Option<usize> {
        self.get(ancilla).and_then(|s| s.slot(slot))
    }

    /// Sorted supports, one per stabilizer.
    pub fn supports(&self) -> Vec<Vec<usize>> {
        self.stabilizers
            .iter()
            .map(|s| {
                let mut v: Vec<usize> = s.support().collect();
                v.sort_unstable();
                v
            })
            .collect()
    }
}

/// Disjoint role assignment of physical qubits.
#[derive(Debug, Clone)]
pub struct QubitPartition {
    data: Vec<usize>,
    x_ancillas: Vec<usize>,
    z_ancillas: Vec<usize>,
    relays: Vec<usize>,
    data_position: HashMap<usize, usize>,
}

impl QubitPartition {
    pub fn new(data: Vec<usize>, x_ancillas: Vec<usize>, z_ancillas: Vec<usize>) -> Self {
        let data_position = data.iter().enumerate().map(|(i, &q)| (q, i)).collect();
        Self {
            data,
            x_ancillas,
            z_ancillas,
            relays: Vec::new(),
            data_position,
        }
    }

    /// Adds ancillas that only forward parity and measure no stabilizer.
    pub fn with_relays(mut self, relays: Vec<usize>) -> Self {
        self.relays = relays;
        self
    }

    pub fn data(&self) -> &[usize] {
        &self.data
    }

    pub fn x_ancillas(&self) -> &[usize] {
        &self.x_ancillas
    }

    pub fn z_ancillas(&self) -> &[usize] {
        &self.z_ancillas
    }

    pub fn ancillas(&self, kind: StabilizerKind) -> &[usize] {
        match kind {
            StabilizerKind::X => &self.x_ancillas,
            StabilizerKind::Z => &self.z_ancillas,
        }
    }

    pub fn relays(&self) -> &[usize] {
        &self.relays
    }

    /// Position of a data qubit in the data list (and in the final data measurement).
    pub fn data_index(&self, qubit: usize) -> Option<usize> {
        self.data_position.get(&qubit).copied()
    }

    /// Every qubit: data first, then X ancillas, Z ancillas and relays.
    pub fn all(&self) -> Vec<usize> {
        self.data
            .iter()
            .chain(&self.x_ancillas)
            .chain(&self.z_ancillas)
            .chain(&self.relays)
            .copied()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.data.len() + self.x_ancillas.len() + self.z_ancillas.len() + self.relays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What circuit construction needs to know about a code.
pub trait CodeLayout {
    fn lattice(&self) -> &Lattice;
    fn partition(&self) -> &QubitPartition;
    fn stabilizers(&self, kind: StabilizerKind) -> &IncidenceMap;
    /// Z logical supports, as lattice labels, one per observable.
    fn z_logicals(&self) -> Vec<Vec<usize>>;

    /// Ancilla-to-data couplers a routing table is expanded over.
    ///
    /// Equal to the stabilizers unless the code measures through ancillas
    /// other than the ones its stabilizers are centred on.
    fn couplers(&self, kind: StabilizerKind) -> &IncidenceMap {
        self.stabilizers(kind)
    }

    /// Stabilizers read out halfway through a mirrored cycle, if any.
    fn mid_cycle_stabilizers(&self, _kind: StabilizerKind) -> Option<&IncidenceMap> {
        None
    }

    /// Ancilla of the opposite type that bridges a dropped coupler.
    ///
    /// Codes without long-range couplers have no bridges.
    fn partner(&self, _kind: StabilizerKind, _ancilla: usize, _pairing: Pairing) -> Option<usize> {
        None
    }
}

/// Checks that every logical commutes with every stabilizer of the dual type.
///
/// `checks` has one row per stabilizer, `logicals` one row per logical, both
/// over the same column ordering. Returns the first `(logical, check)` pair
/// with odd overlap.
pub fn check_logicals(checks: &BitMatrix, logicals: &BitMatrix) -> Result<(), (usize, usize)> {
    for (li, logical) in logicals.rows().enumerate() {
        for (ci, check) in checks.rows().enumerate() {
            if crate::gf2::dot(logical, check) {
                return Err((li, ci));
            }
        }
    }
    Ok(())
}

/// Overlap parity check on lattice-label supports.
pub fn commutes(support: &[usize], stabilizer: &Stabilizer) -> bool {
    stabilizer.support().filter(|q| support.contains(q)).count() % 2 == 0
}
