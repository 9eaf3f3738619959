use crate::QecError;
use crate::circuit::{Circuit, Instruction};
use crate::config::NoiseKind;
use crate::isa::{Basis, Gate};
use std::collections::BTreeSet;

/// Per-operation error rates derived from one base probability.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Rates {
    reset_flip: f64,
    reset_idle: f64,
    measure_before: f64,
    measure_after: f64,
    measure_idle: f64,
    cx: f64,
    cx_idle: f64,
}

/// A noise profile bound to its base probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseModel {
    kind: NoiseKind,
    p: f64,
    rates: Rates,
}

impl NoiseModel {
    /// Builds a model, rejecting probabilities that would push any derived
    /// rate outside `[0, 1]`.
    pub fn new(kind: NoiseKind, p: f64) -> Result<Self, QecError> {
        let rates = match kind {
            NoiseKind::Uniform => Rates {
                reset_flip: p,
                reset_idle: p,
                measure_before: p,
                measure_after: p,
                measure_idle: p,
                cx: p,
                cx_idle: p,
            },
            NoiseKind::Si1000 => Rates {
                reset_flip: 2.0 * p,
                reset_idle: 2.0 * p,
                measure_before: 5.0 * p,
                measure_after: p,
                measure_idle: 2.0 * p,
                cx: p,
                cx_idle: p / 10.0,
            },
        };
        let max = match kind {
            NoiseKind::Uniform => p,
            NoiseKind::Si1000 => 5.0 * p,
        };
        if !(0.0..=1.0).contains(&p) || max > 1.0 {
            return Err(QecError::InvalidConfiguration(format!(
                "noise probability {p} is out of range for {kind:?}"
            )));
        }
        Ok(Self { kind, p, rates })
    }

    pub fn kind(&self) -> NoiseKind {
        self.kind
    }

    pub fn p(&self) -> f64 {
        self.p
    }

    /// Rewrites a circuit with error channels around every reset,
    /// measurement and CX.
    ///
    /// # Arguments
    ///
    /// * `circuit` - Noiseless circuit
    /// * `qubits` - Qubits that idle whenever an instruction does not touch them
    ///
    /// # Returns
    ///
    /// A new circuit. Repeat blocks are rewritten once with their count
    /// kept; annotations pass through unchanged.
    pub fn apply(&self, circuit: &Circuit, qubits: &[usize]) -> Circuit {
        let all: BTreeSet<usize> = qubits.iter().copied().collect();
        Circuit::from_instructions(self.rewrite(circuit.instructions(), &all))
    }

    fn rewrite(&self, instructions: &[Instruction], all: &BTreeSet<usize>) -> Vec<Instruction> {
        let mut out = Circuit::new();
        for inst in instructions {
            match inst {
                Instruction::Repeat { count, body } => out.push(Instruction::Repeat {
                    count: *count,
                    body: self.rewrite(body, all),
                }),
                Instruction::Gate { gate, targets, .. } => {
                    self.noisy_gate(&mut out, inst.clone(), *gate, targets, all)
                }
                other => out.push(other.clone()),
            }
        }
        out.into_instructions()
    }

    fn noisy_gate(
        &self,
        out: &mut Circuit,
        inst: Instruction,
        gate: Gate,
        targets: &[usize],
        all: &BTreeSet<usize>,
    ) {
        let r = &self.rates;
        let flip = match gate.basis() {
            Some(Basis::Z) => Gate::XError,
            _ => Gate::ZError,
        };
        let idle = |out: &mut Circuit, p: f64| {
            let busy: BTreeSet<usize> = targets.iter().copied().collect();
            out.gate_with(Gate::Depolarize1, all.difference(&busy).copied(), Some(p));
        };
        let on_targets = |out: &mut Circuit, g: Gate, p: f64| {
            out.gate_with(g, targets.iter().copied(), Some(p));
        };

        match gate {
            Gate::R | Gate::RX => {
                out.push(inst);
                on_targets(out, flip, r.reset_flip);
                idle(out, r.reset_idle);
            }
            Gate::M | Gate::MX | Gate::MR | Gate::MRX => {
                on_targets(out, flip, r.measure_before);
                out.push(inst);
                on_targets(out, flip, r.measure_after);
                idle(out, r.measure_idle);
            }
            Gate::CX => {
                out.push(inst);
                on_targets(out, Gate::Depolarize2, r.cx);
                idle(out, r.cx_idle);
            }
            Gate::XError | Gate::ZError | Gate::Depolarize1 | Gate::Depolarize2 => out.push(inst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy() -> Circuit {
        let mut c = Circuit::new();
        c.gate(Gate::R, [0, 1, 2]);
        c.tick();
        let mut body = Circuit::new();
        body.gate(Gate::CX, [0, 1]);
        body.gate(Gate::MX, [1]);
        body.detector(vec![], vec![1]);
        c.repeat(4, body);
        c
    }

    fn gate_at(c: &[Instruction], i: usize) -> (Gate, Vec<usize>, Option<f64>) {
        match &c[i] {
            Instruction::Gate { gate, targets, arg } => (*gate, targets.clone(), *arg),
            other => panic!("expected a gate, found {other:?}"),
        }
    }

    #[test]
    fn uniform_profile_wraps_each_gate() {
        let noisy = NoiseModel::new(NoiseKind::Uniform, 0.01).unwrap().apply(&toy(), &[0, 1, 2]);
        let top = noisy.instructions();
        assert_eq!(gate_at(top, 1), (Gate::XError, vec![0, 1, 2], Some(0.01)));
        // Every qubit was reset, so no idle channel follows.
        assert_eq!(top[2], Instruction::Tick);
        let Instruction::Repeat { count, body } = &top[3] else {
            panic!("repeat block lost");
        };
        assert_eq!(*count, 4);
        assert_eq!(gate_at(body, 1), (Gate::Depolarize2, vec![0, 1], Some(0.01)));
        assert_eq!(gate_at(body, 2), (Gate::Depolarize1, vec![2], Some(0.01)));
        assert_eq!(gate_at(body, 3), (Gate::ZError, vec![1], Some(0.01)));
        assert_eq!(gate_at(body, 4).0, Gate::MX);
        assert_eq!(gate_at(body, 6), (Gate::Depolarize1, vec![0, 2], Some(0.01)));
        assert!(matches!(body[7], Instruction::Detector { .. }));
    }

    #[test]
    fn si1000_scales_rates() {
        let noisy = NoiseModel::new(NoiseKind::Si1000, 0.001).unwrap().apply(&toy(), &[0, 1, 2, 3]);
        let top = noisy.instructions();
        assert_eq!(gate_at(top, 1), (Gate::XError, vec![0, 1, 2], Some(0.002)));
        assert_eq!(gate_at(top, 2), (Gate::Depolarize1, vec![3], Some(0.002)));
        let Instruction::Repeat { body, .. } = &top[4] else {
            panic!("repeat block lost");
        };
        assert_eq!(gate_at(body, 2), (Gate::Depolarize1, vec![2, 3], Some(0.0001)));
        assert_eq!(gate_at(body, 3), (Gate::ZError, vec![1], Some(0.005)));
        assert_eq!(gate_at(body, 5), (Gate::ZError, vec![1], Some(0.001)));
    }

    #[test]
    fn probabilities_are_range_checked() {
        assert!(NoiseModel::new(NoiseKind::Uniform, -0.1).is_err());
        assert!(NoiseModel::new(NoiseKind::Uniform, 1.0).is_ok());
        assert!(NoiseModel::new(NoiseKind::Si1000, 0.3).is_err());
    }

    #[test]
    fn noise_preserves_measurements() {
        let c = toy();
        let noisy = NoiseModel::new(NoiseKind::Uniform, 0.001).unwrap().apply(&c, &[0, 1, 2]);
        assert_eq!(noisy.measurement_count(), c.measurement_count());
        assert!(noisy.validate().is_ok());
    }
}
