//! From an experiment description to a validated circuit.

use anyhow::{Context, Result, bail};
use bbq_core::circuit::{Circuit, CircuitSummary};
use bbq_core::code::{BbCode, CodeLayout, CssCode, QubitPartition, SurfaceCode};
use bbq_core::config::{CodeSpec, DefectRate, ExperimentConfig, resolve_code};
use bbq_core::defect::{DefectPattern, DropoutPolicy};
use bbq_core::emit::{CircuitOptions, syndrome_circuit};
use bbq_core::noise::NoiseModel;
use bbq_core::schedule::{RoutingTable, build_schedule};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fs;
use std::path::Path;
use tracing::info;

/// A constructed code of either family.
pub enum Code {
    Bb { name: String, code: BbCode },
    Surface(SurfaceCode),
}

impl Code {
    pub fn build(spec: &CodeSpec) -> Result<Self> {
        Ok(match spec {
            CodeSpec::Standard { key } => {
                let cfg = resolve_code(key)?;
                Code::Bb {
                    name: cfg.name.to_string(),
                    code: BbCode::new(cfg.params)?,
                }
            }
            CodeSpec::Bb { params } => Code::Bb {
                name: format!(
                    "BB l={} m={} a={} b={} c={} d={}",
                    params.l, params.m, params.a, params.b, params.c, params.d
                ),
                code: BbCode::new(*params)?,
            },
            CodeSpec::Surface { params, layout } => Code::Surface(SurfaceCode::new(*params, *layout)?),
        })
    }

    pub fn name(&self) -> String {
        match self {
            Code::Bb { name, .. } => name.clone(),
            Code::Surface(sc) => format!(
                "Surface {}x{} ({:?})",
                sc.params().lx,
                sc.params().ly,
                sc.layout()
            ),
        }
    }

    pub fn css(&self) -> &CssCode {
        match self {
            Code::Bb { code, .. } => code.css(),
            Code::Surface(sc) => sc.css(),
        }
    }

    pub fn partition(&self) -> &QubitPartition {
        match self {
            Code::Bb { code, .. } => code.partition(),
            Code::Surface(sc) => sc.partition(),
        }
    }
}

/// A generated circuit and what went into it.
pub struct Generated {
    pub circuit: Circuit,
    pub summary: CircuitSummary,
    pub table: &'static str,
    /// Dropped long-range couplers out of the total, for BB codes.
    pub dropped: Option<(usize, usize)>,
    /// `(ancilla, data)` couplers the schedule drives.
    pub couplers: Vec<(usize, usize)>,
}

/// Reads an experiment description from a JSON file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ExperimentConfig> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))
}

/// Builds the code, draws defects, schedules, emits and applies noise.
///
/// Every random draw comes from a generator seeded with `config.seed`, so a
/// configuration always reproduces the same circuit.
///
/// # Arguments
///
/// * `config` - Code, defect selector, rounds, noise and seed
///
/// # Returns
///
/// The validated circuit with its summary, or the first failure. Coupler
/// defects on a surface code are rejected; the surface routing table follows
/// the ancilla layout.
pub fn generate(config: &ExperimentConfig) -> Result<Generated> {
    let code = Code::build(&config.code)?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let opts = CircuitOptions {
        rounds: config.rounds,
        x_detectors: config.x_detectors,
    };
    let (circuit, table, dropped, couplers) = match &code {
        Code::Bb { code: bb, .. } => {
            let pattern = match DropoutPolicy::for_rate(config.defects)? {
                Some(policy) => DefectPattern::inject(bb, policy, &mut rng),
                None => DefectPattern::intact_for(bb),
            };
            let table = RoutingTable::for_rate(config.defects);
            let schedule = build_schedule(bb, table, &pattern)
                .with_context(|| format!("routing with the {} table", table.name))?;
            let circuit = syndrome_circuit(bb, &schedule, &pattern, &opts)?;
            let dropped = (pattern.dropped_couplers(), bb.long_range_couplers());
            (circuit, table.name, Some(dropped), schedule.couplers(bb.partition()))
        }
        Code::Surface(sc) => {
            if config.defects != DefectRate::None {
                bail!("coupler defects are only modelled on BB codes");
            }
            let pattern = DefectPattern::intact_for(sc);
            let table = RoutingTable::for_surface(sc.layout());
            let schedule = build_schedule(sc, table, &pattern)
                .with_context(|| format!("routing with the {} table", table.name))?;
            let circuit = syndrome_circuit(sc, &schedule, &pattern, &opts)?;
            (circuit, table.name, None, schedule.couplers(sc.partition()))
        }
    };

    let circuit = match config.noise {
        Some(noise) => {
            let model = NoiseModel::new(noise.profile, noise.p)?;
            model.apply(&circuit, &code.partition().all())
        }
        None => circuit,
    };
    let summary = circuit.validate()?;
    info!(
        code = %code.name(),
        table,
        qubits = summary.qubits,
        detectors = summary.detectors,
        "circuit generated"
    );

    Ok(Generated {
        circuit,
        summary,
        table,
        dropped,
        couplers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bbq_core::code::SurfaceLayout;
    use bbq_core::config::{NoiseKind, NoiseSettings, SurfaceParams};

    fn config(code: CodeSpec, defects: DefectRate) -> ExperimentConfig {
        ExperimentConfig {
            code,
            defects,
            rounds: 2,
            noise: None,
            x_detectors: false,
            seed: 7,
            output: None,
        }
    }

    fn standard(key: &str) -> CodeSpec {
        CodeSpec::Standard { key: key.to_string() }
    }

    #[test]
    fn standard_code_with_half_defects() {
        let g = generate(&config(standard("1"), DefectRate::Half)).unwrap();
        assert_eq!(g.table, "half");
        assert_eq!(g.summary.observables, 12);
        assert_eq!(g.dropped, Some((72, 144)));
    }

    #[test]
    fn same_seed_same_circuit() {
        let cfg = config(standard("4"), DefectRate::Random(0.3));
        let a = generate(&cfg).unwrap().circuit.to_string();
        let b = generate(&cfg).unwrap().circuit.to_string();
        assert_eq!(a, b);
    }

    #[test]
    fn noise_keeps_the_record_layout() {
        let mut cfg = config(standard("2"), DefectRate::None);
        let clean = generate(&cfg).unwrap().summary;
        cfg.noise = Some(NoiseSettings {
            profile: NoiseKind::Uniform,
            p: 0.001,
        });
        let noisy = generate(&cfg).unwrap().summary;
        assert_eq!(noisy.measurements, clean.measurements);
        assert_eq!(noisy.detectors, clean.detectors);
    }

    #[test]
    fn surface_codes_take_no_coupler_defects() {
        let surface = CodeSpec::Surface {
            params: SurfaceParams::new(3, 5),
            layout: SurfaceLayout::Dual,
        };
        let g = generate(&config(surface.clone(), DefectRate::None)).unwrap();
        assert_eq!(g.summary.observables, 1);
        assert_eq!(g.dropped, None);
        assert!(generate(&config(surface, DefectRate::Half)).is_err());
    }

    #[test]
    fn three_coupler_layouts_pick_their_tables() {
        for (layout, name) in [(SurfaceLayout::Gidney, "gidney"), (SurfaceLayout::Relayed, "relayed")] {
            let surface = CodeSpec::Surface {
                params: SurfaceParams::new(5, 5),
                layout,
            };
            let g = generate(&config(surface, DefectRate::None)).unwrap();
            assert_eq!(g.table, name);
            assert_eq!(g.summary.observables, 1);
            let mut per_ancilla = std::collections::HashMap::new();
            for (a, _) in &g.couplers {
                *per_ancilla.entry(*a).or_insert(0) += 1;
            }
            assert!(per_ancilla.values().all(|&n| n <= 3));
        }
    }

    #[test]
    fn unknown_code_is_an_error() {
        assert!(generate(&config(standard("9"), DefectRate::None)).is_err());
    }
}
