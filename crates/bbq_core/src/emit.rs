use crate::QecError;
use crate::circuit::Circuit;
use crate::code::{CodeLayout, IncidenceMap, StabilizerKind};
use crate::defect::DefectPattern;
use crate::isa::Gate;
use crate::schedule::{self, Round, RoundLayout, Schedule};
use tracing::debug;

/// Knobs of the emitted memory experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitOptions {
    /// Repetitions of the steady-state block after the first cycle.
    pub rounds: usize,
    /// Also declare detectors on X-stabilizer outcomes.
    pub x_detectors: bool,
}

impl Default for CircuitOptions {
    fn default() -> Self {
        Self {
            rounds: 1,
            x_detectors: false,
        }
    }
}

/// Record counts of one stabilizer cycle.
#[derive(Debug, Clone, Copy)]
struct Counts {
    data: usize,
    x: usize,
    z: usize,
    relays: usize,
}

impl Counts {
    fn of<L: CodeLayout>(code: &L) -> Self {
        let p = code.partition();
        Self {
            data: p.data().len(),
            x: p.x_ancillas().len(),
            z: p.z_ancillas().len(),
            relays: p.relays().len(),
        }
    }

    fn ancillas(self) -> usize {
        self.x + self.z + self.relays
    }
}

fn look_back(k: usize) -> Result<u32, QecError> {
    u32::try_from(k).map_err(|_| QecError::RecordOverflow(k))
}

struct Emitter<'a, L: CodeLayout> {
    code: &'a L,
    counts: Counts,
    x_ancillas: &'a [usize],
    z_ancillas: &'a [usize],
}

impl<'a, L: CodeLayout> Emitter<'a, L> {
    fn coords(&self, label: usize, t: f64) -> Vec<f64> {
        let (r, c) = self.code.lattice().coord(label);
        vec![r as f64, c as f64, t]
    }

    fn rounds(&self, circuit: &mut Circuit, rounds: &[Round]) {
        for round in rounds {
            circuit.gate(Gate::CX, round.iter().flat_map(|p| [p.control, p.target]));
            circuit.tick();
        }
    }

    /// Detectors for `ancillas`, whose block ends `tail` records before the
    /// newest one; `period` is the distance to the previous cycle's record.
    fn detectors(
        &self,
        circuit: &mut Circuit,
        ancillas: &[usize],
        tail: usize,
        period: Option<usize>,
    ) -> Result<(), QecError> {
        let len = ancillas.len();
        for (i, &a) in ancillas.iter().enumerate() {
            let current = tail + len - i;
            let mut records = vec![look_back(current)?];
            if let Some(period) = period {
                records.push(look_back(current + period)?);
            }
            circuit.detector(self.coords(a, 0.0), records);
        }
        Ok(())
    }

    fn preamble(&self, circuit: &mut Circuit) {
        let mut qubits = self.code.partition().all();
        qubits.sort_unstable();
        for q in qubits {
            let (r, c) = self.code.lattice().coord(q);
            circuit.qubit_coords(q, vec![r as f64, c as f64]);
        }
        circuit.tick();
        circuit.gate(Gate::R, self.code.partition().data().iter().copied());
        circuit.tick();
    }

    /// Data measurement, final Z detectors and one observable per Z logical.
    ///
    /// `z_tail` counts the records taken after the last Z-ancilla block.
    fn epilogue(&self, circuit: &mut Circuit, z_tail: usize) -> Result<(), QecError> {
        let partition = self.code.partition();
        let n = self.counts.data;
        circuit.gate(Gate::M, partition.data().iter().copied());

        let data_records = |support: &mut dyn Iterator<Item = usize>| -> Result<Vec<u32>, QecError> {
            support
                .filter_map(|q| partition.data_index(q))
                .map(|i| look_back(n - i))
                .collect()
        };
        for (i, s) in self.code.stabilizers(StabilizerKind::Z).iter().enumerate() {
            let mut records = vec![look_back(n + z_tail + self.counts.z - i)?];
            records.extend(data_records(&mut s.support())?);
            circuit.detector(self.coords(s.ancilla, 1.0), records);
        }
        for (index, logical) in self.code.z_logicals().iter().enumerate() {
            let records = data_records(&mut logical.iter().copied())?;
            circuit.observable(index, records);
        }
        Ok(())
    }

    fn single_phase(&self, circuit: &mut Circuit, rounds: &[Round], opts: &CircuitOptions) -> Result<(), QecError> {
        let (nx, nz) = (self.counts.x, self.counts.z);
        let period = self.counts.ancillas();

        circuit.gate(Gate::RX, self.x_ancillas.iter().copied());
        circuit.gate(Gate::R, self.z_ancillas.iter().copied());
        circuit.tick();
        self.rounds(circuit, rounds);
        circuit.gate(Gate::MRX, self.x_ancillas.iter().copied());
        circuit.gate(Gate::MR, self.z_ancillas.iter().copied());
        self.detectors(circuit, self.z_ancillas, 0, None)?;
        circuit.tick();

        let mut body = Circuit::new();
        self.rounds(&mut body, rounds);
        body.shift_coords(vec![0.0, 0.0, 1.0]);
        body.gate(Gate::MRX, self.x_ancillas.iter().copied());
        if opts.x_detectors {
            self.detectors(&mut body, self.x_ancillas, 0, Some(period))?;
        }
        body.gate(Gate::MR, self.z_ancillas.iter().copied());
        self.detectors(&mut body, self.z_ancillas, 0, Some(period))?;
        body.tick();
        circuit.repeat(opts.rounds, body);
        debug!(nx, nz, period, "emitted single-phase cycle");
        Ok(())
    }

    /// One X phase and one Z phase, every ancilla reset and measured in both.
    ///
    /// Relays are measured first, so Z-ancilla records are always the newest.
    fn two_phase_cycle(
        &self,
        circuit: &mut Circuit,
        schedule: &Schedule,
        detectors: Option<bool>,
    ) -> Result<(), QecError> {
        let all: Vec<usize> = self
            .code
            .partition()
            .relays()
            .iter()
            .chain(self.x_ancillas)
            .chain(self.z_ancillas)
            .copied()
            .collect();
        let period = 2 * self.counts.ancillas();

        circuit.gate(Gate::RX, all.iter().copied());
        circuit.tick();
        self.rounds(circuit, schedule.rounds(StabilizerKind::X));
        circuit.gate(Gate::MX, all.iter().copied());
        if detectors == Some(true) {
            self.detectors(circuit, self.x_ancillas, self.counts.z, Some(period))?;
        }
        circuit.tick();

        circuit.gate(Gate::R, all.iter().copied());
        circuit.tick();
        self.rounds(circuit, schedule.rounds(StabilizerKind::Z));
        circuit.gate(Gate::M, all.iter().copied());
        let period = detectors.map(|_| period);
        self.detectors(circuit, self.z_ancillas, 0, period)?;
        circuit.tick();
        Ok(())
    }

    fn two_phase(&self, circuit: &mut Circuit, schedule: &Schedule, opts: &CircuitOptions) -> Result<(), QecError> {
        self.two_phase_cycle(circuit, schedule, None)?;
        let mut body = Circuit::new();
        body.shift_coords(vec![0.0, 0.0, 1.0]);
        self.two_phase_cycle(&mut body, schedule, Some(opts.x_detectors))?;
        circuit.repeat(opts.rounds, body);
        Ok(())
    }

    /// Forward pass read out on the end-of-cycle ancillas, reversed pass
    /// read out on the mid-cycle ones.
    ///
    /// Every ancilla is measured once per pass, so consecutive readouts of
    /// one ancilla are a full cycle apart.
    fn mirrored_cycle(
        &self,
        circuit: &mut Circuit,
        forward: &[Round],
        reversed: &[Round],
        mid: (&[usize], &[usize]),
        repeated: bool,
    ) -> Result<(), QecError> {
        let (mid_x, mid_z) = mid;
        let period = repeated.then_some(2 * self.counts.ancillas());

        self.rounds(circuit, forward);
        circuit.gate(Gate::MR, self.z_ancillas.iter().copied());
        self.detectors(circuit, self.z_ancillas, 0, period)?;
        circuit.gate(Gate::MRX, self.x_ancillas.iter().copied());
        circuit.tick();

        self.rounds(circuit, reversed);
        circuit.gate(Gate::MR, mid_z.iter().copied());
        self.detectors(circuit, mid_z, 0, period)?;
        circuit.gate(Gate::MRX, mid_x.iter().copied());
        circuit.tick();
        Ok(())
    }

    /// Returns the record count taken after the last Z-ancilla readout.
    fn mirrored(&self, circuit: &mut Circuit, schedule: &Schedule, opts: &CircuitOptions) -> Result<usize, QecError> {
        if opts.x_detectors {
            return Err(QecError::InvalidConfiguration(
                "mirrored cycles change stabilizer frame mid-cycle; X detectors are not deterministic".to_string(),
            ));
        }
        let frame = |kind| {
            self.code
                .mid_cycle_stabilizers(kind)
                .map(IncidenceMap::ancillas)
                .ok_or_else(|| {
                    QecError::InvalidConfiguration(
                        "mirrored schedule on a code without a mid-cycle frame".to_string(),
                    )
                })
        };
        let mid_x = frame(StabilizerKind::X)?;
        let mid_z = frame(StabilizerKind::Z)?;
        let forward = schedule.cycle_rounds();
        let reversed: Vec<Round> = forward.iter().rev().cloned().collect();

        circuit.gate(Gate::RX, mid_x.iter().copied());
        circuit.gate(Gate::R, mid_z.iter().copied());
        circuit.tick();
        self.mirrored_cycle(circuit, &forward, &reversed, (mid_x.as_slice(), mid_z.as_slice()), false)?;
        let mut body = Circuit::new();
        body.shift_coords(vec![0.0, 0.0, 1.0]);
        self.mirrored_cycle(&mut body, &forward, &reversed, (mid_x.as_slice(), mid_z.as_slice()), true)?;
        circuit.repeat(opts.rounds, body);
        debug!(mid_x = mid_x.len(), mid_z = mid_z.len(), "emitted mirrored cycle");
        Ok(self.counts.x + mid_x.len() + mid_z.len())
    }
}

/// Emits a memory experiment that measures every stabilizer each cycle.
///
/// The schedule is verified against the code and defect pattern first.
/// Single-phase schedules (sequential or merged rounds) measure X and Z
/// ancillas in one cycle; two-phase schedules give each type its own reset
/// and measurement; mirrored schedules read out one stabilizer frame after
/// the forward pass and the other after the reversed pass, with Z detectors
/// only. Every record offset is derived from the actual data and ancilla
/// counts.
///
/// # Arguments
///
/// * `code` - Code layout
/// * `schedule` - Gate rounds built from a routing table
/// * `pattern` - Defect pattern the schedule was built for
/// * `opts` - Repetition count and detector selection
///
/// # Returns
///
/// The circuit, validated for record references and CX layering.
pub fn syndrome_circuit<L: CodeLayout>(
    code: &L,
    schedule: &Schedule,
    pattern: &DefectPattern,
    opts: &CircuitOptions,
) -> Result<Circuit, QecError> {
    schedule::verify(code, schedule, pattern)?;

    let partition = code.partition();
    let emitter = Emitter {
        code,
        counts: Counts::of(code),
        x_ancillas: partition.x_ancillas(),
        z_ancillas: partition.z_ancillas(),
    };

    let mut circuit = Circuit::new();
    emitter.preamble(&mut circuit);
    let z_tail = match schedule.layout() {
        RoundLayout::Sequential | RoundLayout::Merged => {
            emitter.single_phase(&mut circuit, &schedule.cycle_rounds(), opts)?;
            0
        }
        RoundLayout::TwoPhase => {
            emitter.two_phase(&mut circuit, schedule, opts)?;
            0
        }
        RoundLayout::Mirrored => emitter.mirrored(&mut circuit, schedule, opts)?,
    };
    emitter.epilogue(&mut circuit, z_tail)?;

    let summary = circuit.validate()?;
    debug!(?summary, "validated circuit");
    Ok(circuit)
}
