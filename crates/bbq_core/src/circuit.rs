use crate::QecError;
use crate::isa::Gate;
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// One line (or block) of a circuit.
///
/// Record references are stored as positive look-backs: `k` means
/// `rec[-k]`, the k-th most recent measurement.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Gate {
        gate: Gate,
        targets: Vec<usize>,
        /// Probability argument of noise channels.
        arg: Option<f64>,
    },
    Tick,
    QubitCoords {
        qubit: usize,
        coords: Vec<f64>,
    },
    ShiftCoords(Vec<f64>),
    Detector {
        coords: Vec<f64>,
        records: Vec<u32>,
    },
    Observable {
        index: usize,
        records: Vec<u32>,
    },
    Repeat {
        count: usize,
        body: Vec<Instruction>,
    },
}

impl Instruction {
    /// Records appended by this instruction, counting every repetition.
    pub fn measurement_count(&self) -> usize {
        match self {
            Instruction::Gate { gate, targets, .. } if gate.is_measurement() => targets.len(),
            Instruction::Repeat { count, body } => {
                count * body.iter().map(Instruction::measurement_count).sum::<usize>()
            }
            _ => 0,
        }
    }
}

/// An ordered list of instructions in the Stim circuit model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Circuit {
    instructions: Vec<Instruction>,
}

/// Counts gathered while validating a circuit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CircuitSummary {
    pub qubits: usize,
    pub measurements: usize,
    pub detectors: usize,
    pub observables: usize,
    pub ticks: usize,
    pub cx_gates: usize,
}

impl Circuit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_instructions(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn into_instructions(self) -> Vec<Instruction> {
        self.instructions
    }

    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// Appends a gate; empty target lists are dropped.
    pub fn gate(&mut self, gate: Gate, targets: impl IntoIterator<Item = usize>) {
        self.gate_with(gate, targets, None);
    }

    pub fn gate_with(&mut self, gate: Gate, targets: impl IntoIterator<Item = usize>, arg: Option<f64>) {
        let targets: Vec<usize> = targets.into_iter().collect();
        if !targets.is_empty() {
            self.instructions.push(Instruction::Gate { gate, targets, arg });
        }
    }

    pub fn tick(&mut self) {
        self.instructions.push(Instruction::Tick);
    }

    pub fn qubit_coords(&mut self, qubit: usize, coords: Vec<f64>) {
        self.instructions.push(Instruction::QubitCoords { qubit, coords });
    }

    pub fn shift_coords(&mut self, shift: Vec<f64>) {
        self.instructions.push(Instruction::ShiftCoords(shift));
    }

    pub fn detector(&mut self, coords: Vec<f64>, records: Vec<u32>) {
        self.instructions.push(Instruction::Detector { coords, records });
    }

    pub fn observable(&mut self, index: usize, records: Vec<u32>) {
        self.instructions.push(Instruction::Observable { index, records });
    }

    /// Appends a repeat block; a zero count appends nothing.
    pub fn repeat(&mut self, count: usize, body: Circuit) {
        if count > 0 {
            self.instructions.push(Instruction::Repeat {
                count,
                body: body.instructions,
            });
        }
    }

    pub fn measurement_count(&self) -> usize {
        self.instructions.iter().map(Instruction::measurement_count).sum()
    }

    /// Walks the circuit and checks every record reference and CX layer.
    ///
    /// Repeat bodies are checked on their first iteration, where the fewest
    /// records are available.
    ///
    /// # Returns
    ///
    /// Counts over the fully unrolled circuit, or the first violation: a
    /// detector or observable looking past the start of the record stream,
    /// or a qubit used twice by one CX instruction.
    pub fn validate(&self) -> Result<CircuitSummary, QecError> {
        let mut walker = Walker::default();
        walker.walk(&self.instructions, 1)?;
        Ok(CircuitSummary {
            qubits: walker.qubits.len(),
            measurements: walker.available,
            ..walker.summary
        })
    }
}

#[derive(Default)]
struct Walker {
    available: usize,
    index: usize,
    qubits: BTreeSet<usize>,
    observables: BTreeSet<usize>,
    summary: CircuitSummary,
}

impl Walker {
    fn check_records(&self, records: &[u32]) -> Result<(), QecError> {
        for &offset in records {
            if offset == 0 || offset as usize > self.available {
                return Err(QecError::ForwardReference {
                    instruction: self.index,
                    offset,
                    available: self.available,
                });
            }
        }
        Ok(())
    }

    fn walk(&mut self, instructions: &[Instruction], reps: usize) -> Result<(), QecError> {
        for inst in instructions {
            match inst {
                Instruction::Gate { gate, targets, .. } => {
                    self.qubits.extend(targets.iter().copied());
                    if *gate == Gate::CX {
                        let mut seen = HashSet::with_capacity(targets.len());
                        for &q in targets {
                            if !seen.insert(q) {
                                return Err(QecError::DuplicateTarget {
                                    qubit: q,
                                    context: format!("CX at instruction {}", self.index),
                                });
                            }
                        }
                        self.summary.cx_gates += reps * targets.len() / 2;
                    }
                    if gate.is_measurement() {
                        self.available += targets.len();
                    }
                }
                Instruction::Tick => self.summary.ticks += reps,
                Instruction::Detector { records, .. } => {
                    self.check_records(records)?;
                    self.summary.detectors += reps;
                }
                Instruction::Observable { index, records } => {
                    self.check_records(records)?;
                    self.observables.insert(*index);
                    self.summary.observables = self.observables.len();
                }
                Instruction::Repeat { count, body } => {
                    let before = self.available;
                    self.walk(body, reps * count)?;
                    let per_iteration = self.available - before;
                    self.available = before + count * per_iteration;
                }
                Instruction::QubitCoords { qubit, .. } => {
                    self.qubits.insert(*qubit);
                }
                Instruction::ShiftCoords(_) => {}
            }
            self.index += 1;
        }
        Ok(())
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[f64]) -> fmt::Result {
    if args.is_empty() {
        return Ok(());
    }
    write!(f, "(")?;
    for (i, a) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{a}")?;
    }
    write!(f, ")")
}

fn write_records(f: &mut fmt::Formatter<'_>, records: &[u32]) -> fmt::Result {
    for r in records {
        write!(f, " rec[-{r}]")?;
    }
    Ok(())
}

fn write_block(f: &mut fmt::Formatter<'_>, instructions: &[Instruction], depth: usize) -> fmt::Result {
    let indent = "    ".repeat(depth);
    for inst in instructions {
        write!(f, "{indent}")?;
        match inst {
            Instruction::Gate { gate, targets, arg } => {
                write!(f, "{}", gate.name())?;
                if let Some(p) = arg {
                    write_args(f, &[*p])?;
                }
                for t in targets {
                    write!(f, " {t}")?;
                }
            }
            Instruction::Tick => write!(f, "TICK")?,
            Instruction::QubitCoords { qubit, coords } => {
                write!(f, "QUBIT_COORDS")?;
                write_args(f, coords)?;
                write!(f, " {qubit}")?;
            }
            Instruction::ShiftCoords(shift) => {
                write!(f, "SHIFT_COORDS")?;
                write_args(f, shift)?;
            }
            Instruction::Detector { coords, records } => {
                write!(f, "DETECTOR")?;
                write_args(f, coords)?;
                write_records(f, records)?;
            }
            Instruction::Observable { index, records } => {
                write!(f, "OBSERVABLE_INCLUDE({index})")?;
                write_records(f, records)?;
            }
            Instruction::Repeat { count, body } => {
                writeln!(f, "REPEAT {count} {{")?;
                write_block(f, body, depth + 1)?;
                write!(f, "{indent}}}")?;
            }
        }
        writeln!(f)?;
    }
    Ok(())
}

/// Stim text format, one instruction per line.
impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_block(f, &self.instructions, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> Circuit {
        let mut c = Circuit::new();
        c.gate(Gate::R, [0, 1, 2]);
        c.tick();
        c.gate(Gate::CX, [0, 1]);
        c.gate(Gate::MR, [1]);
        c.detector(vec![1.0, 0.0, 0.0], vec![1]);
        let mut body = Circuit::new();
        body.gate(Gate::CX, [0, 1]);
        body.gate(Gate::MR, [1]);
        body.shift_coords(vec![0.0, 0.0, 1.0]);
        body.detector(vec![1.0, 0.0, 0.0], vec![1, 2]);
        c.repeat(3, body);
        c.gate(Gate::M, [0, 2]);
        c.observable(0, vec![2]);
        c
    }

    #[test]
    fn validation_counts_unrolled_records() {
        let summary = small().validate().unwrap();
        assert_eq!(summary.measurements, 6);
        assert_eq!(summary.detectors, 4);
        assert_eq!(summary.observables, 1);
        assert_eq!(summary.cx_gates, 4);
        assert_eq!(summary.qubits, 3);
        assert_eq!(small().measurement_count(), 6);
    }

    #[test]
    fn look_back_past_the_first_record_is_rejected() {
        let mut c = Circuit::new();
        c.gate(Gate::M, [0]);
        c.detector(vec![], vec![2]);
        assert!(matches!(
            c.validate(),
            Err(QecError::ForwardReference { offset: 2, available: 1, .. })
        ));
    }

    #[test]
    fn repeat_body_is_checked_on_its_first_pass() {
        let mut body = Circuit::new();
        body.gate(Gate::M, [0]);
        body.detector(vec![], vec![1, 2]);
        let mut c = Circuit::new();
        c.repeat(4, body);
        assert!(c.validate().is_err());
    }

    #[test]
    fn cx_layer_cannot_reuse_a_qubit() {
        let mut c = Circuit::new();
        c.gate(Gate::CX, [0, 1, 1, 2]);
        assert!(matches!(c.validate(), Err(QecError::DuplicateTarget { qubit: 1, .. })));
    }

    #[test]
    fn display_uses_stim_syntax() {
        let mut c = Circuit::new();
        c.gate_with(Gate::XError, [3], Some(0.001));
        c.qubit_coords(3, vec![1.0, 2.0]);
        let mut body = Circuit::new();
        body.tick();
        c.repeat(2, body);
        c.gate(Gate::M, [3]);
        c.detector(vec![1.0, 2.0, 0.5], vec![1]);
        let text = c.to_string();
        assert_eq!(
            text,
            "X_ERROR(0.001) 3\nQUBIT_COORDS(1, 2) 3\nREPEAT 2 {\n    TICK\n}\nM 3\nDETECTOR(1, 2, 0.5) rec[-1]\n"
        );
    }
}
