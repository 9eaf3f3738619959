//! Code construction and syndrome-circuit generation for bivariate-bicycle
//! and rotated surface codes.
//!
//! This crate derives the stabilizer structure of a code on a periodic
//! lattice, injects hardware defects (dropped long-range couplers and faulty
//! data qubits), schedules the two-qubit gate rounds that measure every
//! stabilizer, and emits a Stim-compatible circuit with detectors and
//! observables. A noise pass rewrites emitted circuits under a named profile.

/// Periodic lattice labeling and the gate vocabulary, re-exported.
pub use bbq_common::{isa, lattice};

/// Dense binary matrices over GF(2).
///
/// Row-major bit matrices backed by `bitvec`, with the elimination routines
/// (rank, kernel, row-space reduction) needed to derive logical operators.
pub mod gf2;

/// Code parameters and the registry of standard configurations.
///
/// Resolves numeric or named identifiers into BB polynomial parameters and
/// holds the serde-backed experiment configuration consumed by the host.
pub mod config;

/// Stabilizer code models.
///
/// Builds incidence maps, qubit partitions and parity-check matrices for BB
/// and surface codes, and the CSS logical basis derived from them.
pub mod code;

/// Minimum-weight logical operators through a pluggable solver.
///
/// The integer-programming backend is external; this module defines the
/// solver seam, the parallel reduction over logical qubits and a bounded
/// exhaustive solver for small codes.
pub mod distance;

/// Long-range coupler dropout.
///
/// Tags stabilizers whose long-range coupler is missing, under random or
/// fixed policies driven by a caller-owned random source.
pub mod defect;

/// Faulty data qubits and super-stabilizers.
pub mod data_defect;

/// Gate-round scheduling from routing tables.
///
/// Each supported defect rate has its own hand-derived routing table. The
/// scheduler turns a table plus tagged stabilizers into rounds of disjoint
/// operand pairs and checks them by Pauli back-propagation.
pub mod schedule;

/// Circuit representation and record-reference validation.
pub mod circuit;

/// Syndrome-extraction circuit assembly.
///
/// Lays out resets, scheduled rounds, measurements, the repeated steady-state
/// block, detectors and observables, deriving every record offset from the
/// actual ancilla counts.
pub mod emit;

/// Noise profiles and the circuit rewrite that inserts error channels.
pub mod noise;

use code::StabilizerKind;
use thiserror::Error;

/// Errors raised while building codes, schedules and circuits.
///
/// Configuration errors surface invalid user input. The structural variants
/// (forward references, duplicate targets, weight mismatches, uncovered
/// stabilizers) point at a scheduling or layout bug rather than bad input.
#[derive(Debug, Error)]
pub enum QecError {
    /// An identifier or parameter set does not name a usable code.
    #[error("{0}")]
    InvalidConfiguration(String),

    /// Lattice dimensions cannot host the required sublattice structure.
    #[error("invalid lattice: {0}")]
    InvalidLattice(String),

    /// The distance solver failed for one logical qubit.
    ///
    /// The distance estimate is incomplete; no weight is reported in its place.
    #[error("solver failed on logical {logical}: {reason}")]
    Solver { logical: usize, reason: String },

    /// A detector or observable points at a measurement that has not happened yet.
    #[error(
        "instruction {instruction} references rec[-{offset}] with only {available} records available"
    )]
    ForwardReference {
        instruction: usize,
        offset: u32,
        available: usize,
    },

    /// A qubit appears twice among operations that must act in parallel.
    #[error("qubit {qubit} appears twice in {context}")]
    DuplicateTarget { qubit: usize, context: String },

    /// A stabilizer does not have its designed weight.
    #[error("{kind:?} stabilizer on ancilla {ancilla} has weight {found}, expected {expected}")]
    WeightMismatch {
        kind: StabilizerKind,
        ancilla: usize,
        expected: usize,
        found: usize,
    },

    /// A schedule does not measure the stabilizer it is meant to measure.
    #[error("{kind:?} ancilla {ancilla} does not measure its stabilizer: {detail}")]
    UncoveredStabilizer {
        kind: StabilizerKind,
        ancilla: usize,
        detail: String,
    },

    /// A measurement look-back does not fit a record target.
    #[error("record look-back {0} exceeds the 32-bit target range")]
    RecordOverflow(usize),

    /// Every representative of some logical touches a faulty data qubit.
    #[error("no {kind:?} logical basis avoids the {faulty} faulty data qubits")]
    UncleanableLogical { kind: StabilizerKind, faulty: usize },
}
