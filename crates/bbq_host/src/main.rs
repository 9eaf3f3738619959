mod experiment;
mod stats;

use anyhow::{Context, Result, bail};
use bbq_core::code::{BbCode, StabilizerKind, SurfaceLayout};
use bbq_core::config::{
    BposdParameters, CodeSpec, DefectRate, ExperimentConfig, NoiseKind, NoiseSettings,
    STANDARD_CODES, SurfaceParams,
};
use bbq_core::data_defect::{DataDefects, split_stabilizers, super_stabilizers};
use bbq_core::defect::{DefectPattern, DropoutPolicy};
use bbq_core::distance::{ExhaustiveSolver, compute_distance};
use bbq_core::schedule::{RoutingTable, build_schedule, verify};
use bbq_io::parser::load_circuit;
use bbq_io::writer::{
    write_b8_matrix, write_circuit, write_connections, write_dense_matrix, write_partition,
    write_supports,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use experiment::Code;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use stats::DefectStats;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "bbq", version, about = "Defect-aware syndrome circuits for BB and surface codes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Debug)]
struct CodeArgs {
    /// Standard code id or name
    #[arg(short, long, default_value = "1")]
    code: String,
    /// Use a rotated surface code instead, given as LXxLY
    #[arg(long, value_parser = parse_surface)]
    surface: Option<SurfaceParams>,
    /// Ancilla layout of the surface code
    #[arg(long, value_enum, requires = "surface")]
    layout: Option<LayoutArg>,
}

impl CodeArgs {
    fn spec(&self) -> CodeSpec {
        match self.surface {
            Some(params) => CodeSpec::Surface {
                params,
                layout: match self.layout.unwrap_or(LayoutArg::Standard) {
                    LayoutArg::Standard => SurfaceLayout::Standard,
                    LayoutArg::Dual => SurfaceLayout::Dual,
                    LayoutArg::Gidney => SurfaceLayout::Gidney,
                    LayoutArg::Relayed => SurfaceLayout::Relayed,
                },
            },
            None => CodeSpec::Standard {
                key: self.code.clone(),
            },
        }
    }
}

fn parse_surface(s: &str) -> Result<SurfaceParams, String> {
    let (lx, ly) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected LXxLY, got {s}"))?;
    let lx = lx.trim().parse().map_err(|e| format!("bad lx: {e}"))?;
    let ly = ly.trim().parse().map_err(|e| format!("bad ly: {e}"))?;
    Ok(SurfaceParams::new(lx, ly))
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum DefectArg {
    None,
    Half,
    ThreeQuarter,
    Full,
    Random,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LayoutArg {
    Standard,
    /// X and Z exchanged in the bulk
    Dual,
    /// Three couplers per ancilla, mirrored cycle
    Gidney,
    /// Three couplers per ancilla, fourth bridged through a relay
    Relayed,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum NoiseArg {
    Uniform,
    Si1000,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum KindArg {
    X,
    Z,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum MatrixFormat {
    Dense,
    B8,
}

fn defect_rate(arg: DefectArg, rate: f64) -> DefectRate {
    match arg {
        DefectArg::None => DefectRate::None,
        DefectArg::Half => DefectRate::Half,
        DefectArg::ThreeQuarter => DefectRate::ThreeQuarter,
        DefectArg::Full => DefectRate::Full,
        DefectArg::Random => DefectRate::Random(rate),
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List the standard BB configurations
    Codes,
    /// Print the structure of one code
    Info {
        #[command(flatten)]
        code: CodeArgs,
    },
    /// Generate a syndrome-extraction circuit
    Circuit {
        #[command(flatten)]
        code: CodeArgs,
        #[arg(long, value_enum, default_value_t = DefectArg::None)]
        defects: DefectArg,
        /// Dropout probability for random defects
        #[arg(long, default_value_t = 0.1)]
        rate: f64,
        /// Repetitions of the steady-state block
        #[arg(short, long, default_value_t = 1)]
        rounds: usize,
        #[arg(long, value_enum)]
        noise: Option<NoiseArg>,
        /// Base error probability of the noise profile
        #[arg(short, long, default_value_t = 0.001)]
        p: f64,
        /// Declare X detectors as well as Z detectors
        #[arg(long)]
        x_detectors: bool,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Output file; standard output when omitted
        #[arg(short, long)]
        out: Option<String>,
        /// JSON experiment description, overriding the options above
        #[arg(long)]
        config: Option<PathBuf>,
        /// Write the resolved experiment description as JSON
        #[arg(long)]
        save_config: Option<PathBuf>,
        /// Write the scheduled ancilla-data couplers, one pair per line
        #[arg(long)]
        connections: Option<PathBuf>,
    },
    /// Draw random coupler defects and report dropout statistics
    Defects {
        #[arg(short, long, default_value = "1")]
        code: String,
        #[arg(long, default_value_t = 0.1)]
        rate: f64,
        #[arg(short, long, default_value_t = 1000)]
        trials: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// Sample faulty data qubits and build super-stabilizers
    DataDefects {
        #[command(flatten)]
        code: CodeArgs,
        #[arg(long, default_value_t = 0.02)]
        rate: f64,
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// Minimum-weight logicals by bounded exhaustive search
    Distance {
        #[command(flatten)]
        code: CodeArgs,
        #[arg(long, value_enum, default_value_t = KindArg::Z)]
        kind: KindArg,
        #[arg(long, default_value_t = 6)]
        max_weight: usize,
        /// X checks to remove first, as when their ancillas drop out
        #[arg(long, value_delimiter = ',')]
        drop_x_checks: Vec<usize>,
    },
    /// Write check matrices, logicals and the qubit partition
    Matrices {
        #[command(flatten)]
        code: CodeArgs,
        #[arg(short, long, default_value = "matrices")]
        out: PathBuf,
        #[arg(long, value_enum, default_value_t = MatrixFormat::Dense)]
        format: MatrixFormat,
    },
    /// Parse a circuit file and validate its record references
    Check { path: PathBuf },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Codes => list_codes()?,
        Commands::Info { code } => print_info(&Code::build(&code.spec())?),
        Commands::Circuit {
            code,
            defects,
            rate,
            rounds,
            noise,
            p,
            x_detectors,
            seed,
            out,
            config,
            save_config,
            connections,
        } => {
            let config = match config {
                Some(path) => experiment::load_config(path)?,
                None => ExperimentConfig {
                    code: code.spec(),
                    defects: defect_rate(defects, rate),
                    rounds,
                    noise: noise.map(|n| NoiseSettings {
                        profile: match n {
                            NoiseArg::Uniform => NoiseKind::Uniform,
                            NoiseArg::Si1000 => NoiseKind::Si1000,
                        },
                        p,
                    }),
                    x_detectors,
                    seed,
                    output: out,
                },
            };
            run_circuit(&config, save_config, connections)?;
        }
        Commands::Defects {
            code,
            rate,
            trials,
            seed,
        } => run_defects(&code, rate, trials, seed)?,
        Commands::DataDefects { code, rate, seed } => {
            run_data_defects(&Code::build(&code.spec())?, rate, seed)?
        }
        Commands::Distance {
            code,
            kind,
            max_weight,
            drop_x_checks,
        } => {
            let kind = match kind {
                KindArg::X => StabilizerKind::X,
                KindArg::Z => StabilizerKind::Z,
            };
            run_distance(&Code::build(&code.spec())?, kind, max_weight, &drop_x_checks)?
        }
        Commands::Matrices { code, out, format } => {
            write_matrices(&Code::build(&code.spec())?, &out, format)?
        }
        Commands::Check { path } => {
            let circuit = load_circuit(&path)?;
            let summary = circuit
                .validate()
                .with_context(|| format!("{} failed validation", path.display()))?;
            println!("{}: ok", path.display());
            println!("Qubits:       {}", summary.qubits);
            println!("Measurements: {}", summary.measurements);
            println!("Detectors:    {}", summary.detectors);
            println!("Observables:  {}", summary.observables);
            println!("CX gates:     {}", summary.cx_gates);
            println!("Ticks:        {}", summary.ticks);
        }
    }
    Ok(())
}

fn list_codes() -> Result<()> {
    println!("{:>3}  {:<24} {:>5} {:>4}", "id", "name", "n", "k");
    for cfg in STANDARD_CODES.iter() {
        let code = BbCode::new(cfg.params)?;
        println!("{:>3}  {:<24} {:>5} {:>4}", cfg.id, cfg.name, code.n(), code.k());
    }
    Ok(())
}

fn print_info(code: &Code) {
    let css = code.css();
    let partition = code.partition();
    let (rx, rz) = css.redundant_checks();
    println!("{}", code.name());
    println!("Data qubits:     {}", partition.data().len());
    println!("X ancillas:      {}", partition.x_ancillas().len());
    println!("Z ancillas:      {}", partition.z_ancillas().len());
    if !partition.relays().is_empty() {
        println!("Relay ancillas:  {}", partition.relays().len());
    }
    println!("Logical qubits:  {}", css.k());
    println!("Redundant X/Z:   {}/{}", rx.len(), rz.len());
    println!("Z basis bound:   {}", css.basis_weight_bound());
    if let Code::Bb { code, .. } = code {
        println!("Long couplers:   {}", code.long_range_couplers());
    }
}

fn run_circuit(
    config: &ExperimentConfig,
    save_config: Option<PathBuf>,
    connections: Option<PathBuf>,
) -> Result<()> {
    if let Some(path) = save_config {
        let json = serde_json::to_string_pretty(config)?;
        fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    }
    let generated = experiment::generate(config)?;
    if let Some(path) = connections {
        write_connections(&path, &generated.couplers)?;
        eprintln!("Wrote {} couplers to {}", generated.couplers.len(), path.display());
    }
    match &config.output {
        Some(path) => {
            write_circuit(path, &generated.circuit)?;
            let s = &generated.summary;
            println!("Wrote {path} ({} table)", generated.table);
            println!(
                "{} qubits, {} measurements, {} detectors, {} observables",
                s.qubits, s.measurements, s.detectors, s.observables
            );
            if let Some((dropped, total)) = generated.dropped {
                println!("Dropped couplers: {dropped}/{total}");
            }
        }
        None => print!("{}", generated.circuit),
    }
    Ok(())
}

fn run_defects(key: &str, rate: f64, trials: usize, seed: u64) -> Result<()> {
    let cfg = bbq_core::config::resolve_code(key)?;
    let code = BbCode::new(cfg.params)?;
    let policy = DropoutPolicy::random(rate)?;
    let table = RoutingTable::for_rate(DefectRate::Random(rate));
    let total = code.long_range_couplers();

    let stats = (0..trials)
        .into_par_iter()
        .fold(DefectStats::new, |mut acc, t| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(t as u64));
            let pattern = DefectPattern::inject(&code, policy, &mut rng);
            let routed = build_schedule(&code, table, &pattern)
                .and_then(|s| verify(&code, &s, &pattern))
                .is_ok();
            acc.update(
                pattern.dropped_fraction(total),
                defective(&pattern, StabilizerKind::X),
                defective(&pattern, StabilizerKind::Z),
                routed,
            );
            acc
        })
        .reduce(DefectStats::new, DefectStats::merge);

    println!("{} at dropout rate {rate}", cfg.name);
    stats.print_report();
    if stats.unroutable > 0 {
        bail!("{} of {} patterns could not be routed", stats.unroutable, stats.count);
    }
    Ok(())
}

fn defective(pattern: &DefectPattern, kind: StabilizerKind) -> usize {
    pattern.tags(kind).iter().filter(|t| t.is_defective()).count()
}

fn run_data_defects(code: &Code, rate: f64, seed: u64) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(seed);
    let (defects, splits, supers) = match code {
        Code::Bb { code, .. } => {
            let defects = DataDefects::sample(code, rate, &mut rng)?;
            let splits = [StabilizerKind::X, StabilizerKind::Z]
                .map(|kind| split_stabilizers(code, &defects, kind));
            let supers = [StabilizerKind::X, StabilizerKind::Z]
                .map(|kind| super_stabilizers(code, &defects, kind));
            (defects, splits, supers)
        }
        Code::Surface(sc) => {
            let defects = DataDefects::sample(sc, rate, &mut rng)?;
            let splits = [StabilizerKind::X, StabilizerKind::Z]
                .map(|kind| split_stabilizers(sc, &defects, kind));
            let supers = [StabilizerKind::X, StabilizerKind::Z]
                .map(|kind| super_stabilizers(sc, &defects, kind));
            (defects, splits, supers)
        }
    };

    println!("{}", code.name());
    println!("Faulty data qubits: {:?}", defects.qubits());
    for (split, supers) in splits.iter().zip(&supers) {
        println!(
            "{:?}: {} complete, {} incomplete, {} super-stabilizers",
            split.kind,
            split.complete.len(),
            split.incomplete.len(),
            supers.len()
        );
        for s in supers {
            println!("  {:?} -> weight {}", s.components, s.support.len());
        }
    }
    for kind in [StabilizerKind::X, StabilizerKind::Z] {
        match defects.clean_logicals(code.css(), kind) {
            Ok(logicals) => {
                let weights: Vec<usize> = logicals.iter().map(Vec::len).collect();
                println!("{kind:?} logicals off the faulty qubits: weights {weights:?}");
            }
            Err(e) => warn!(?kind, "{e}"),
        }
    }
    Ok(())
}

fn run_distance(code: &Code, kind: StabilizerKind, max_weight: usize, drop_x: &[usize]) -> Result<()> {
    let css = if drop_x.is_empty() {
        code.css().clone()
    } else {
        code.css().without_x_checks(drop_x)?
    };
    println!("{}", code.name());
    println!("Logical qubits: {}", css.k());
    println!("Z basis bound:  {}", css.basis_weight_bound());

    let report = compute_distance(&css, kind, &ExhaustiveSolver::new(max_weight))?;
    println!("{:?} distance: {}", report.kind, report.distance);
    if let Some(lightest) = report.lightest() {
        println!("Lightest logical {}: {:?}", lightest.index, lightest.support);
    }
    Ok(())
}

fn write_matrices(code: &Code, dir: &Path, format: MatrixFormat) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let css = code.css();
    let matrices = [("hx", css.hx()), ("hz", css.hz()), ("lx", css.lx()), ("lz", css.lz())];
    for (name, m) in matrices {
        match format {
            MatrixFormat::Dense => write_dense_matrix(dir.join(format!("{name}.txt")), m)?,
            MatrixFormat::B8 => write_b8_matrix(dir.join(format!("{name}.b8")), m)?,
        }
    }
    write_supports(dir.join("lx_supports.txt"), &css.logical_supports(StabilizerKind::X))?;
    write_supports(dir.join("lz_supports.txt"), &css.logical_supports(StabilizerKind::Z))?;
    write_supports(dir.join("columns.txt"), &[css.column_labels().to_vec()])?;
    write_partition(dir.join("qubits.txt"), code.partition())?;
    let bposd = serde_json::to_string_pretty(&BposdParameters::default())?;
    fs::write(dir.join("bposd.json"), bposd)?;
    println!("Wrote matrices for {} to {}", code.name(), dir.display());
    Ok(())
}
