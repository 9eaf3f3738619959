pub mod tables;

use crate::QecError;
use crate::code::{CodeLayout, IncidenceMap, Pairing, QubitPartition, StabilizerKind, SurfaceLayout};
use crate::config::DefectRate;
use crate::defect::{DefectPattern, DefectTag};
use crate::gf2::{self, BitRow};
use std::collections::HashSet;
use tracing::debug;

/// Where one side of a scheduled CX comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// The stabilizer's own ancilla.
    Ancilla,
    /// The data qubit in the given slot.
    Slot(u8),
    /// The bridging ancilla of the opposite type.
    Partner,
}

/// Which stabilizers a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagCondition {
    Any,
    Intact,
    DropLast,
    DropSecondLast,
}

impl TagCondition {
    pub const fn matches(self, tag: DefectTag) -> bool {
        matches!(
            (self, tag),
            (TagCondition::Any, _)
                | (TagCondition::Intact, DefectTag::Intact)
                | (TagCondition::DropLast, DefectTag::DropLast)
                | (TagCondition::DropSecondLast, DefectTag::DropSecondLast)
        )
    }
}

/// One CX template: applied to every stabilizer whose tag matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairRule {
    pub when: TagCondition,
    pub control: Operand,
    pub target: Operand,
}

/// How the X and Z rounds of a table are laid out in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundLayout {
    /// All X rounds, then all Z rounds, in one measurement cycle.
    Sequential,
    /// X round `k` and Z round `k` run together.
    Merged,
    /// An X phase and a Z phase, each with its own resets and measurements.
    TwoPhase,
    /// Merged rounds run forward, then in reverse, with a readout after
    /// each pass; the two passes measure different stabilizer frames.
    Mirrored,
}

/// A routing table: per-side rounds of pair rules.
#[derive(Debug)]
pub struct RoutingTable {
    pub name: &'static str,
    pub layout: RoundLayout,
    /// Pairing used to resolve [`Operand::Partner`].
    pub pairing: Option<Pairing>,
    pub x_rounds: &'static [&'static [PairRule]],
    pub z_rounds: &'static [&'static [PairRule]],
}

impl RoutingTable {
    /// Table for a BB code under the given defect-rate selector.
    pub fn for_rate(rate: DefectRate) -> &'static RoutingTable {
        match rate {
            DefectRate::None => &tables::INTERLEAVED_BB,
            DefectRate::Half => &tables::HALF,
            DefectRate::ThreeQuarter => &tables::THREE_QUARTER,
            DefectRate::Full | DefectRate::Random(_) => &tables::GENERAL,
        }
    }

    /// Table for a surface-code ancilla layout.
    pub fn for_surface(layout: SurfaceLayout) -> &'static RoutingTable {
        match layout {
            SurfaceLayout::Standard | SurfaceLayout::Dual => &tables::INTERLEAVED_SURFACE,
            SurfaceLayout::Gidney => &tables::SURFACE_GIDNEY,
            SurfaceLayout::Relayed => &tables::SURFACE_RELAYED,
        }
    }

    pub fn rounds(&self, kind: StabilizerKind) -> &'static [&'static [PairRule]] {
        match kind {
            StabilizerKind::X => self.x_rounds,
            StabilizerKind::Z => self.z_rounds,
        }
    }
}

/// A scheduled CX gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CxPair {
    pub control: usize,
    pub target: usize,
}

/// A set of CX gates that act in parallel.
pub type Round = Vec<CxPair>;

/// Concrete gate rounds for one code and defect pattern.
#[derive(Debug, Clone)]
pub struct Schedule {
    layout: RoundLayout,
    x_rounds: Vec<Round>,
    z_rounds: Vec<Round>,
}

impl Schedule {
    pub fn layout(&self) -> RoundLayout {
        self.layout
    }

    pub fn rounds(&self, kind: StabilizerKind) -> &[Round] {
        match kind {
            StabilizerKind::X => &self.x_rounds,
            StabilizerKind::Z => &self.z_rounds,
        }
    }

    /// Rounds of a single-phase cycle in time order.
    ///
    /// For a two-phase schedule this is the X phase followed by the Z phase,
    /// which is only meaningful for gate counting. For a mirrored schedule
    /// it is the forward pass.
    pub fn cycle_rounds(&self) -> Vec<Round> {
        match self.layout {
            RoundLayout::Merged | RoundLayout::Mirrored => {
                let depth = self.x_rounds.len().max(self.z_rounds.len());
                (0..depth)
                    .map(|k| {
                        let x = self.x_rounds.get(k).into_iter().flatten();
                        let z = self.z_rounds.get(k).into_iter().flatten();
                        x.chain(z).copied().collect()
                    })
                    .collect()
            }
            RoundLayout::Sequential | RoundLayout::TwoPhase => self
                .x_rounds
                .iter()
                .chain(&self.z_rounds)
                .cloned()
                .collect(),
        }
    }

    pub fn gate_count(&self) -> usize {
        self.x_rounds
            .iter()
            .chain(&self.z_rounds)
            .map(Vec::len)
            .sum()
    }

    /// Every `(ancilla, data)` coupling the schedule drives, sorted.
    ///
    /// Gates between two ancillas, as in a bridge, are left out.
    pub fn couplers(&self, partition: &QubitPartition) -> Vec<(usize, usize)> {
        let mut edges: Vec<(usize, usize)> = self
            .x_rounds
            .iter()
            .chain(&self.z_rounds)
            .flatten()
            .filter_map(|p| {
                match (partition.data_index(p.control), partition.data_index(p.target)) {
                    (Some(_), None) => Some((p.target, p.control)),
                    (None, Some(_)) => Some((p.control, p.target)),
                    _ => None,
                }
            })
            .collect();
        edges.sort_unstable();
        edges.dedup();
        edges
    }
}

fn resolve<L: CodeLayout>(
    code: &L,
    kind: StabilizerKind,
    ancilla: usize,
    slots: &[Option<usize>],
    pairing: Option<Pairing>,
    operand: Operand,
) -> Result<Option<usize>, QecError> {
    match operand {
        Operand::Ancilla => Ok(Some(ancilla)),
        Operand::Slot(k) => Ok(slots.get(k as usize).copied().flatten()),
        Operand::Partner => {
            let pairing = pairing.ok_or_else(|| {
                QecError::InvalidConfiguration(
                    "routing table uses a bridge but has no pairing".to_string(),
                )
            })?;
            code.partner(kind, ancilla, pairing)
                .map(Some)
                .ok_or_else(|| QecError::UncoveredStabilizer {
                    kind,
                    ancilla,
                    detail: format!("no {pairing:?} partner to bridge through"),
                })
        }
    }
}

fn check_disjoint(round: &[CxPair], context: impl Fn() -> String) -> Result<(), QecError> {
    let mut used = HashSet::with_capacity(2 * round.len());
    for pair in round {
        for q in [pair.control, pair.target] {
            if !used.insert(q) {
                return Err(QecError::DuplicateTarget {
                    qubit: q,
                    context: context(),
                });
            }
        }
    }
    Ok(())
}

/// Expands a routing table into concrete gate rounds.
///
/// # Arguments
///
/// * `code` - Code providing stabilizers and partners
/// * `table` - Routing table
/// * `pattern` - Coupler tags, in ancilla order per type
///
/// # Returns
///
/// The schedule, or an error if a round uses a qubit twice or a bridge
/// cannot be resolved. Pairs whose data slot is absent are skipped before
/// any bridge is looked up.
pub fn build_schedule<L: CodeLayout>(
    code: &L,
    table: &RoutingTable,
    pattern: &DefectPattern,
) -> Result<Schedule, QecError> {
    for kind in [StabilizerKind::X, StabilizerKind::Z] {
        let (tags, stabs) = (pattern.tags(kind).len(), code.couplers(kind).len());
        if tags != stabs {
            return Err(QecError::InvalidConfiguration(format!(
                "defect pattern has {tags} {kind:?} tags for {stabs} ancillas"
            )));
        }
    }

    let mut sides = [Vec::new(), Vec::new()];
    for (side, kind) in sides.iter_mut().zip([StabilizerKind::X, StabilizerKind::Z]) {
        for (r, rules) in table.rounds(kind).iter().enumerate() {
            let mut round = Vec::new();
            for rule in rules.iter() {
                for t in pattern.tagged(code, kind) {
                    if !rule.when.matches(t.tag) {
                        continue;
                    }
                    let s = t.stabilizer;
                    let absent = |op: Operand| matches!(op, Operand::Slot(k) if s.slot(k as usize).is_none());
                    if absent(rule.control) || absent(rule.target) {
                        continue;
                    }
                    let control = resolve(code, kind, s.ancilla, &s.slots, table.pairing, rule.control)?;
                    let target = resolve(code, kind, s.ancilla, &s.slots, table.pairing, rule.target)?;
                    if let (Some(control), Some(target)) = (control, target) {
                        round.push(CxPair { control, target });
                    }
                }
            }
            check_disjoint(&round, || format!("{} {kind:?} round {r}", table.name))?;
            side.push(round);
        }
    }
    let [x_rounds, z_rounds] = sides;
    let schedule = Schedule {
        layout: table.layout,
        x_rounds,
        z_rounds,
    };
    if matches!(schedule.layout, RoundLayout::Merged | RoundLayout::Mirrored) {
        for (r, round) in schedule.cycle_rounds().iter().enumerate() {
            check_disjoint(round, || format!("{} merged round {r}", table.name))?;
        }
    }
    debug!(
        table = table.name,
        gates = schedule.gate_count(),
        x_rounds = schedule.x_rounds.len(),
        z_rounds = schedule.z_rounds.len(),
        "built schedule"
    );
    Ok(schedule)
}

/// Pulls a single-type Pauli back through CX rounds, latest round first.
///
/// An X on the control spreads to the target; a Z on the target spreads to
/// the control.
fn back_propagate(rounds: &[Round], start: usize, kind: StabilizerKind, size: usize) -> BitRow {
    let mut op = gf2::zero_row(size);
    op.set(start, true);
    for round in rounds.iter().rev() {
        for pair in round {
            match kind {
                StabilizerKind::X if op[pair.control] => {
                    let v = op[pair.target];
                    op.set(pair.target, !v);
                }
                StabilizerKind::Z if op[pair.target] => {
                    let v = op[pair.control];
                    op.set(pair.control, !v);
                }
                _ => {}
            }
        }
    }
    op
}

/// Compares the back-propagated measurement of each stabilizer's ancilla
/// with its support.
///
/// With `residue` set, the ancilla part of the measured Pauli may only touch
/// the listed ancillas.
fn check_measured(
    stabilizers: &IncidenceMap,
    rounds: &[Round],
    is_data: &[bool],
    residue: Option<&[usize]>,
) -> Result<(), QecError> {
    let kind = stabilizers.kind();
    for s in stabilizers.iter() {
        let op = back_propagate(rounds, s.ancilla, kind, is_data.len());
        let mut measured: Vec<usize> = op.iter_ones().filter(|&q| is_data[q]).collect();
        let mut expected: Vec<usize> = s.support().collect();
        measured.sort_unstable();
        expected.sort_unstable();
        if measured != expected {
            return Err(QecError::UncoveredStabilizer {
                kind,
                ancilla: s.ancilla,
                detail: format!("measures {measured:?}, expected {expected:?}"),
            });
        }
        let Some(allowed) = residue else {
            continue;
        };
        if let Some(q) = op.iter_ones().find(|&q| !is_data[q] && !allowed.contains(&q)) {
            return Err(QecError::UncoveredStabilizer {
                kind,
                ancilla: s.ancilla,
                detail: format!("leaves a {kind:?} residue on ancilla {q} prepared in the other basis"),
            });
        }
    }
    Ok(())
}

/// Checks that every ancilla measures exactly its stabilizer.
///
/// The measured Pauli of each ancilla is propagated back to the resets. Its
/// data part must equal the stabilizer support. Its ancilla part may only
/// touch ancillas prepared in the same basis, which leaves the outcome
/// unaffected. A mirrored schedule is checked pass by pass: the forward
/// pass against the end-of-cycle stabilizers, the reversed pass against the
/// mid-cycle ones. No gate may act across a coupler the pattern marks as
/// dropped.
pub fn verify<L: CodeLayout>(
    code: &L,
    schedule: &Schedule,
    pattern: &DefectPattern,
) -> Result<(), QecError> {
    let couplers: HashSet<(usize, usize)> = schedule
        .x_rounds
        .iter()
        .chain(&schedule.z_rounds)
        .flatten()
        .flat_map(|p| [(p.control, p.target), (p.target, p.control)])
        .collect();
    for kind in [StabilizerKind::X, StabilizerKind::Z] {
        for t in pattern.tagged(code, kind) {
            let Some(slot) = t.tag.dropped_slot() else {
                continue;
            };
            if let Some(q) = t.stabilizer.slot(slot) {
                if couplers.contains(&(t.stabilizer.ancilla, q)) {
                    return Err(QecError::UncoveredStabilizer {
                        kind,
                        ancilla: t.stabilizer.ancilla,
                        detail: format!("couples to data qubit {q} through dropped slot {slot}"),
                    });
                }
            }
        }
    }

    let partition = code.partition();
    let mut is_data = vec![false; code.lattice().size()];
    for &q in partition.data() {
        is_data[q] = true;
    }

    for kind in [StabilizerKind::X, StabilizerKind::Z] {
        let stabilizers = code.stabilizers(kind);
        match schedule.layout {
            RoundLayout::TwoPhase => check_measured(stabilizers, schedule.rounds(kind), &is_data, None)?,
            RoundLayout::Sequential | RoundLayout::Merged => check_measured(
                stabilizers,
                &schedule.cycle_rounds(),
                &is_data,
                Some(partition.ancillas(kind)),
            )?,
            RoundLayout::Mirrored => {
                let mid = code.mid_cycle_stabilizers(kind).ok_or_else(|| {
                    QecError::InvalidConfiguration(
                        "mirrored schedule on a code without a mid-cycle frame".to_string(),
                    )
                })?;
                let forward = schedule.cycle_rounds();
                let reversed: Vec<Round> = forward.iter().rev().cloned().collect();
                check_measured(stabilizers, &forward, &is_data, Some(mid.ancillas().as_slice()))?;
                check_measured(mid, &reversed, &is_data, Some(partition.ancillas(kind)))?;
            }
        }
    }
    Ok(())
}
