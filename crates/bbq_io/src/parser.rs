//! Parser for Stim circuit text.
//!
//! Covers the instruction set the syndrome emitter and noise rewriter
//! produce: plain gates with an optional probability, `TICK`, coordinate
//! annotations, detectors, observables and nested `REPEAT` blocks.

use anyhow::{Context, Result, anyhow, bail};
use bbq_core::circuit::{Circuit, Instruction};
use bbq_core::isa::Gate;
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, space0, space1, u32 as dec_u32, u64 as dec_u64},
    combinator::{all_consuming, map, opt},
    multi::{many0, separated_list0},
    number::complete::double,
    sequence::{delimited, pair, preceded, tuple},
};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Target {
    Qubit(usize),
    Record(u32),
}

#[derive(Debug, Clone, PartialEq)]
enum Line<'a> {
    Op {
        name: &'a str,
        args: Vec<f64>,
        targets: Vec<Target>,
    },
    RepeatStart(usize),
    BlockEnd,
}

fn name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}

fn args(input: &str) -> IResult<&str, Vec<f64>> {
    delimited(
        pair(char('('), space0),
        separated_list0(delimited(space0, char(','), space0), double),
        pair(space0, char(')')),
    )(input)
}

fn target(input: &str) -> IResult<&str, Target> {
    alt((
        map(delimited(tag("rec[-"), dec_u32, char(']')), Target::Record),
        map(dec_u64, |q| Target::Qubit(q as usize)),
    ))(input)
}

fn repeat_start(input: &str) -> IResult<&str, Line<'_>> {
    map(
        tuple((tag("REPEAT"), space1, dec_u64, space0, char('{'))),
        |(_, _, count, _, _)| Line::RepeatStart(count as usize),
    )(input)
}

fn operation(input: &str) -> IResult<&str, Line<'_>> {
    map(
        tuple((name, opt(args), many0(preceded(space1, target)))),
        |(name, args, targets)| Line::Op {
            name,
            args: args.unwrap_or_default(),
            targets,
        },
    )(input)
}

fn line(input: &str) -> IResult<&str, Line<'_>> {
    all_consuming(alt((
        repeat_start,
        map(char('}'), |_| Line::BlockEnd),
        operation,
    )))(input)
}

fn qubits(targets: &[Target]) -> Result<Vec<usize>> {
    targets
        .iter()
        .map(|t| match t {
            Target::Qubit(q) => Ok(*q),
            Target::Record(r) => Err(anyhow!("record target rec[-{r}] where a qubit was expected")),
        })
        .collect()
}

fn records(targets: &[Target]) -> Result<Vec<u32>> {
    targets
        .iter()
        .map(|t| match t {
            Target::Record(r) => Ok(*r),
            Target::Qubit(q) => Err(anyhow!("qubit target {q} where a record was expected")),
        })
        .collect()
}

fn to_instructions(name: &str, args: Vec<f64>, targets: &[Target]) -> Result<Vec<Instruction>> {
    let single = match name {
        "TICK" => Instruction::Tick,
        "SHIFT_COORDS" => Instruction::ShiftCoords(args),
        "DETECTOR" => Instruction::Detector {
            coords: args,
            records: records(targets)?,
        },
        "OBSERVABLE_INCLUDE" => {
            let index = match args.as_slice() {
                [i] if *i >= 0.0 && i.fract() == 0.0 => *i as usize,
                _ => bail!("OBSERVABLE_INCLUDE takes one integer index"),
            };
            Instruction::Observable {
                index,
                records: records(targets)?,
            }
        }
        "QUBIT_COORDS" => {
            return Ok(qubits(targets)?
                .into_iter()
                .map(|qubit| Instruction::QubitCoords {
                    qubit,
                    coords: args.clone(),
                })
                .collect());
        }
        other => {
            let gate = Gate::from_name(other).ok_or_else(|| anyhow!("unknown instruction {other}"))?;
            let arg = match args.as_slice() {
                [] => None,
                [p] => Some(*p),
                _ => bail!("{other} takes at most one argument"),
            };
            Instruction::Gate {
                gate,
                targets: qubits(targets)?,
                arg,
            }
        }
    };
    Ok(vec![single])
}

/// Parses Stim circuit text.
///
/// Comments (`#` to end of line) and blank lines are skipped. Every other
/// line must be one instruction, a `REPEAT n {` header or a closing `}`.
///
/// # Returns
///
/// The circuit, or an error naming the first offending line.
pub fn parse_circuit(text: &str) -> Result<Circuit> {
    let mut stack: Vec<(usize, Vec<Instruction>)> = vec![(0, Vec::new())];

    for (lineno, raw) in text.lines().enumerate() {
        let content = raw.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }
        let (_, parsed) =
            line(content).map_err(|e| anyhow!("line {}: parse error: {:?}", lineno + 1, e))?;

        match parsed {
            Line::RepeatStart(count) => stack.push((count, Vec::new())),
            Line::BlockEnd => {
                if stack.len() < 2 {
                    bail!("line {}: unmatched closing brace", lineno + 1);
                }
                if let Some((count, body)) = stack.pop() {
                    if let Some((_, parent)) = stack.last_mut() {
                        parent.push(Instruction::Repeat { count, body });
                    }
                }
            }
            Line::Op { name, args, targets } => {
                let instructions = to_instructions(name, args, &targets)
                    .with_context(|| format!("line {}", lineno + 1))?;
                if let Some((_, block)) = stack.last_mut() {
                    block.extend(instructions);
                }
            }
        }
    }

    if stack.len() != 1 {
        bail!("{} REPEAT block(s) left open", stack.len() - 1);
    }
    let (_, instructions) = stack.pop().unwrap_or_default();
    Ok(Circuit::from_instructions(instructions))
}

/// Reads and parses a Stim circuit file.
pub fn load_circuit<P: AsRef<Path>>(path: P) -> Result<Circuit> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to open circuit {}", path.display()))?;
    parse_circuit(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_targets_and_arguments() {
        let (_, parsed) = line("DEPOLARIZE2(0.001) 0 1 4 5").unwrap();
        assert_eq!(
            parsed,
            Line::Op {
                name: "DEPOLARIZE2",
                args: vec![0.001],
                targets: vec![Target::Qubit(0), Target::Qubit(1), Target::Qubit(4), Target::Qubit(5)],
            }
        );
        let (_, parsed) = line("DETECTOR(1, 0, 0) rec[-3] rec[-147]").unwrap();
        assert_eq!(
            parsed,
            Line::Op {
                name: "DETECTOR",
                args: vec![1.0, 0.0, 0.0],
                targets: vec![Target::Record(3), Target::Record(147)],
            }
        );
        assert_eq!(line("REPEAT 11 {").unwrap().1, Line::RepeatStart(11));
        assert!(line("CX 0 1 junk").is_err());
    }

    #[test]
    fn nested_blocks_and_comments() {
        let text = "# header\nR 0 1\nREPEAT 2 {\n    M 0\n    REPEAT 3 {\n        TICK\n    }\n}\nOBSERVABLE_INCLUDE(0) rec[-1]  # tail\n";
        let circuit = parse_circuit(text).unwrap();
        let inst = circuit.instructions();
        assert_eq!(inst.len(), 3);
        let Instruction::Repeat { count: 2, body } = &inst[1] else {
            panic!("outer block missing");
        };
        assert!(matches!(body[1], Instruction::Repeat { count: 3, .. }));
        assert_eq!(inst[2], Instruction::Observable { index: 0, records: vec![1] });
        assert_eq!(circuit.measurement_count(), 2);
    }

    #[test]
    fn malformed_text_is_rejected() {
        assert!(parse_circuit("REPEAT 2 {\nTICK\n").is_err());
        assert!(parse_circuit("}\n").is_err());
        assert!(parse_circuit("FOO 1 2\n").is_err());
        assert!(parse_circuit("CX rec[-1]\n").is_err());
        assert!(parse_circuit("DETECTOR 3\n").is_err());
        assert!(parse_circuit("X_ERROR(0.1, 0.2) 0\n").is_err());
    }
}
