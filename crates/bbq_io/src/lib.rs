//! File formats for circuits and parity-check data.
//!
//! Circuits are exchanged in Stim text form. Check matrices and logical
//! supports are written for external decoders and distance solvers, either
//! as dense `0`/`1` text or as packed `.b8` rows.

/// Reading packed `.b8` and dense text matrices.
///
/// Every matrix row starts on a byte boundary, least significant bit first,
/// the same layout Stim uses for measurement records.
pub mod loader;

/// Stim circuit text parser.
///
/// A line-oriented `nom` grammar for the instructions the emitter produces,
/// with a block stack for nested `REPEAT` bodies.
pub mod parser;

/// Writers for circuits, matrices, supports and qubit partitions.
pub mod writer;
