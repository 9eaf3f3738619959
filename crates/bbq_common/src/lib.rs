//! Common definitions shared across the syndrome-circuit toolchain.
//!
//! This crate provides the periodic lattice arithmetic every other component
//! uses to turn coordinates into qubit labels, and the instruction vocabulary
//! (gate opcodes) that circuits are built from. It has no dependencies and is
//! usable in `no_std` contexts.

#![cfg_attr(not(test), no_std)]

/// Periodic (toric) lattice labeling.
///
/// Every coordinate-to-index conversion in the workspace goes through
/// [`lattice::Lattice::label`]. Coordinates are reduced modulo the grid size
/// first, so two coordinates congruent modulo the grid denote the same
/// physical qubit.
pub mod lattice {
    /// A rectangular grid with periodic boundaries.
    ///
    /// Labels are assigned row-major: `label = row * cols + col` after both
    /// components are reduced into range. The grid never changes after
    /// construction.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Lattice {
        rows: usize,
        cols: usize,
    }

    impl Lattice {
        /// Creates a lattice with the given number of rows and columns.
        ///
        /// Both dimensions must be non-zero; callers validate this when they
        /// build code configurations.
        pub const fn new(rows: usize, cols: usize) -> Self {
            Self { rows, cols }
        }

        pub const fn rows(&self) -> usize {
            self.rows
        }

        pub const fn cols(&self) -> usize {
            self.cols
        }

        /// Total number of lattice sites.
        pub const fn size(&self) -> usize {
            self.rows * self.cols
        }

        /// Maps a (possibly out-of-range or negative) coordinate to a label.
        ///
        /// # Arguments
        ///
        /// * `row` - Row coordinate, reduced modulo `rows`
        /// * `col` - Column coordinate, reduced modulo `cols`
        ///
        /// # Returns
        ///
        /// The row-major label of the reduced coordinate.
        #[inline]
        pub fn label(&self, row: i64, col: i64) -> usize {
            let r = row.rem_euclid(self.rows as i64) as usize;
            let c = col.rem_euclid(self.cols as i64) as usize;
            r * self.cols + c
        }

        /// Inverse of [`Lattice::label`] on reduced coordinates.
        #[inline]
        pub fn coord(&self, label: usize) -> (usize, usize) {
            (label / self.cols, label % self.cols)
        }

        /// Label of the site displaced from `label` by `(dr, dc)`.
        #[inline]
        pub fn offset(&self, label: usize, dr: i64, dc: i64) -> usize {
            let (r, c) = self.coord(label);
            self.label(r as i64 + dr, c as i64 + dc)
        }
    }
}

/// Instruction vocabulary for syndrome-extraction circuits.
///
/// Names follow the Stim text format so emitted circuits can be handed to
/// external simulators unchanged.
pub mod isa {
    /// Measurement or preparation basis.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum Basis {
        X,
        Z,
    }

    /// Gate opcodes that act on a list of qubit targets.
    ///
    /// Annotations (ticks, coordinates, detectors, observables, repeat
    /// blocks) are not gates and live in the circuit representation instead.
    #[repr(u8)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum Gate {
        /// Reset to |0⟩.
        R = 0x01,
        /// Reset to |+⟩.
        RX = 0x02,
        /// Controlled-NOT. Targets come in (control, target) pairs.
        CX = 0x03,
        /// Z-basis measurement.
        M = 0x10,
        /// X-basis measurement.
        MX = 0x11,
        /// Z-basis measurement followed by reset to |0⟩.
        MR = 0x12,
        /// X-basis measurement followed by reset to |+⟩.
        MRX = 0x13,
        /// Pauli X flip with probability `p`.
        XError = 0x20,
        /// Pauli Z flip with probability `p`.
        ZError = 0x21,
        /// Single-qubit depolarizing channel.
        Depolarize1 = 0x22,
        /// Two-qubit depolarizing channel on target pairs.
        Depolarize2 = 0x23,
    }

    impl Gate {
        pub const ALL: [Gate; 11] = [
            Gate::R,
            Gate::RX,
            Gate::CX,
            Gate::M,
            Gate::MX,
            Gate::MR,
            Gate::MRX,
            Gate::XError,
            Gate::ZError,
            Gate::Depolarize1,
            Gate::Depolarize2,
        ];

        /// Stim name of the gate.
        pub const fn name(self) -> &'static str {
            match self {
                Gate::R => "R",
                Gate::RX => "RX",
                Gate::CX => "CX",
                Gate::M => "M",
                Gate::MX => "MX",
                Gate::MR => "MR",
                Gate::MRX => "MRX",
                Gate::XError => "X_ERROR",
                Gate::ZError => "Z_ERROR",
                Gate::Depolarize1 => "DEPOLARIZE1",
                Gate::Depolarize2 => "DEPOLARIZE2",
            }
        }

        /// Parses a gate name. `CNOT` and `ZCX` are accepted as aliases of `CX`.
        pub fn from_name(name: &str) -> Option<Gate> {
            match name {
                "CNOT" | "ZCX" => Some(Gate::CX),
                _ => Gate::ALL.iter().copied().find(|g| g.name() == name),
            }
        }

        /// Whether the gate appends one record per target to the measurement stream.
        pub const fn is_measurement(self) -> bool {
            matches!(self, Gate::M | Gate::MX | Gate::MR | Gate::MRX)
        }

        pub const fn is_reset(self) -> bool {
            matches!(self, Gate::R | Gate::RX | Gate::MR | Gate::MRX)
        }

        pub const fn is_noise(self) -> bool {
            matches!(
                self,
                Gate::XError | Gate::ZError | Gate::Depolarize1 | Gate::Depolarize2
            )
        }

        /// Whether targets are consumed in pairs.
        pub const fn is_two_qubit(self) -> bool {
            matches!(self, Gate::CX | Gate::Depolarize2)
        }

        /// Basis of a reset or measurement; `None` for other gates.
        pub const fn basis(self) -> Option<Basis> {
            match self {
                Gate::R | Gate::M | Gate::MR => Some(Basis::Z),
                Gate::RX | Gate::MX | Gate::MRX => Some(Basis::X),
                _ => None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::isa::Gate;
    use super::lattice::Lattice;

    #[test]
    fn label_round_trips_through_coord() {
        let lattice = Lattice::new(12, 10);
        for row in -30i64..30 {
            for col in -25i64..25 {
                let label = lattice.label(row, col);
                let (r, c) = lattice.coord(label);
                assert_eq!(r as i64, row.rem_euclid(12));
                assert_eq!(c as i64, col.rem_euclid(10));
                assert_eq!(lattice.label(r as i64, c as i64), label);
            }
        }
    }

    #[test]
    fn congruent_coordinates_share_a_label() {
        let lattice = Lattice::new(7, 7);
        assert_eq!(lattice.label(-1, 3), lattice.label(6, 3));
        assert_eq!(lattice.label(8, -8), lattice.label(1, 6));
        assert_eq!(lattice.offset(lattice.label(0, 0), -1, -1), lattice.label(6, 6));
    }

    #[test]
    fn gate_names_parse_back() {
        for gate in Gate::ALL {
            assert_eq!(Gate::from_name(gate.name()), Some(gate));
        }
        assert_eq!(Gate::from_name("CNOT"), Some(Gate::CX));
        assert_eq!(Gate::from_name("H"), None);
    }
}
