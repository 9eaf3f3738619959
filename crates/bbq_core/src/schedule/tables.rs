//! Routing tables.
//!
//! Z-side pairs are written `(control, target)` with data as control and the
//! ancilla as target; X-side pairs the other way round. A bridge pair moves
//! the parity of a data qubit whose coupler is missing through the partner
//! ancilla of the opposite type.

use super::{Operand, PairRule, RoundLayout, RoutingTable, TagCondition};
use crate::code::Pairing;

use Operand::{Ancilla as A, Partner as P};
use TagCondition::{Any, DropLast as D5, DropSecondLast as D4, Intact};

const fn rule(when: TagCondition, control: Operand, target: Operand) -> PairRule {
    PairRule {
        when,
        control,
        target,
    }
}

const fn e(k: u8) -> Operand {
    Operand::Slot(k)
}

/// Defect-free BB schedule: six X rounds, then six Z rounds.
pub static INTERLEAVED_BB: RoutingTable = RoutingTable {
    name: "interleaved",
    layout: RoundLayout::Sequential,
    pairing: None,
    x_rounds: &[
        &[rule(Any, A, e(0))],
        &[rule(Any, A, e(1))],
        &[rule(Any, A, e(2))],
        &[rule(Any, A, e(3))],
        &[rule(Any, A, e(4))],
        &[rule(Any, A, e(5))],
    ],
    z_rounds: &[
        &[rule(Any, e(0), A)],
        &[rule(Any, e(1), A)],
        &[rule(Any, e(2), A)],
        &[rule(Any, e(3), A)],
        &[rule(Any, e(4), A)],
        &[rule(Any, e(5), A)],
    ],
};

/// Surface-code schedule: X and Z slot `k` share round `k`.
pub static INTERLEAVED_SURFACE: RoutingTable = RoutingTable {
    name: "surface",
    layout: RoundLayout::Merged,
    pairing: None,
    x_rounds: &[
        &[rule(Any, A, e(0))],
        &[rule(Any, A, e(1))],
        &[rule(Any, A, e(2))],
        &[rule(Any, A, e(3))],
    ],
    z_rounds: &[
        &[rule(Any, e(0), A)],
        &[rule(Any, e(1), A)],
        &[rule(Any, e(2), A)],
        &[rule(Any, e(3), A)],
    ],
};

/// Three-coupler surface schedule. Each coupler site drives slots 0, 1 and
/// 2 only; the cycle replays these rounds in reverse for its second pass.
pub static SURFACE_GIDNEY: RoutingTable = RoutingTable {
    name: "gidney",
    layout: RoundLayout::Mirrored,
    pairing: None,
    x_rounds: &[
        &[rule(Any, A, e(0))],
        &[rule(Any, A, e(1))],
        &[rule(Any, e(2), A)],
        &[rule(Any, e(0), A)],
    ],
    z_rounds: &[
        &[rule(Any, e(0), A)],
        &[rule(Any, e(1), A)],
        &[rule(Any, A, e(2))],
        &[rule(Any, A, e(0))],
    ],
};

/// Three-coupler surface schedule. The ancilla touches slots 0 to 2; the
/// slot-3 parity is folded into the slot-2 data qubit by the relay and
/// unfolded again afterwards.
pub static SURFACE_RELAYED: RoutingTable = RoutingTable {
    name: "relayed",
    layout: RoundLayout::TwoPhase,
    pairing: Some(Pairing::Relay),
    x_rounds: &[
        &[rule(Any, A, e(1)), rule(Any, P, e(3))],
        &[rule(Any, A, e(0)), rule(Any, e(2), P)],
        &[rule(Any, A, e(2))],
        &[rule(Any, e(2), P)],
        &[rule(Any, P, e(3))],
    ],
    z_rounds: &[
        &[rule(Any, e(1), A), rule(Any, e(3), P)],
        &[rule(Any, e(0), A), rule(Any, P, e(2))],
        &[rule(Any, e(2), A)],
        &[rule(Any, P, e(2))],
        &[rule(Any, e(3), P)],
    ],
};

/// Handles any mix of intact, slot-5 and slot-4 dropouts on either side.
pub static GENERAL: RoutingTable = RoutingTable {
    name: "general",
    layout: RoundLayout::TwoPhase,
    pairing: Some(Pairing::Full),
    x_rounds: &[
        &[rule(Any, A, e(0))],
        &[rule(Any, A, e(1)), rule(D5, P, e(5))],
        &[rule(Any, A, e(2)), rule(D4, P, e(4))],
        &[rule(Any, A, e(3))],
        &[rule(Intact, A, e(4))],
        &[rule(Intact, A, e(5))],
        &[rule(D5, e(4), P), rule(D4, e(5), P)],
        &[rule(D5, A, e(4)), rule(D4, A, e(5))],
        &[rule(D5, e(4), P), rule(D4, e(5), P)],
        &[rule(D5, P, e(5)), rule(D4, P, e(4))],
    ],
    z_rounds: &[
        &[rule(Any, e(0), A)],
        &[rule(Any, e(1), A), rule(D4, e(4), P)],
        &[rule(Any, e(2), A), rule(D5, e(5), P)],
        &[rule(Any, e(3), A)],
        &[rule(Intact, e(4), A)],
        &[rule(Intact, e(5), A)],
        &[rule(D5, P, e(4)), rule(D4, P, e(5))],
        &[rule(D5, e(4), A), rule(D4, e(5), A)],
        &[rule(D5, P, e(4)), rule(D4, P, e(5))],
        &[rule(D5, e(5), P), rule(D4, e(4), P)],
    ],
};

/// Every Z stabilizer lost its slot-4 coupler; X stabilizers are intact.
pub static THREE_QUARTER: RoutingTable = RoutingTable {
    name: "three-quarter",
    layout: RoundLayout::TwoPhase,
    pairing: Some(Pairing::Full),
    x_rounds: &[
        &[rule(Any, A, e(0))],
        &[rule(Any, A, e(1))],
        &[rule(Any, A, e(2))],
        &[rule(Any, A, e(3))],
        &[rule(Any, A, e(4))],
        &[rule(Any, A, e(5))],
    ],
    z_rounds: &[
        &[rule(Any, e(0), A)],
        &[rule(D4, e(1), A), rule(D4, e(4), P)],
        &[rule(Any, e(2), A)],
        &[rule(Any, e(3), A)],
        &[rule(D4, P, e(5))],
        &[rule(D4, e(5), A)],
        &[rule(D4, P, e(5))],
        &[rule(D4, e(4), P)],
    ],
};

/// Both types lost their slot-4 coupler; bridges use the half pairing.
pub static HALF: RoutingTable = RoutingTable {
    name: "half",
    layout: RoundLayout::TwoPhase,
    pairing: Some(Pairing::Half),
    x_rounds: &[
        &[rule(Any, A, e(0))],
        &[rule(D4, A, e(1))],
        &[rule(D4, A, e(2)), rule(D4, P, e(4))],
        &[rule(D4, A, e(3))],
        &[rule(D4, e(5), P)],
        &[rule(D4, A, e(5))],
        &[rule(D4, e(5), P)],
        &[rule(D4, P, e(4))],
    ],
    z_rounds: &[
        &[rule(Any, e(0), A)],
        &[rule(D4, e(1), A), rule(D4, e(4), P)],
        &[rule(D4, e(2), A)],
        &[rule(D4, e(3), A)],
        &[rule(D4, P, e(5))],
        &[rule(D4, e(5), A)],
        &[rule(D4, P, e(5))],
        &[rule(D4, e(4), P)],
    ],
};
