//! Code parameters and the registry of standard configurations.

use crate::QecError;
use crate::code::SurfaceLayout;
use serde::{Deserialize, Serialize};

/// Polynomial parameters of a bivariate-bicycle code.
///
/// The code lives on a `2l × 2m` torus with check polynomials
/// `A = 1 + y + x^a y^b` and `B = 1 + x + x^c y^d`. Exponents may be
/// negative; they are reduced modulo `l` (for `x`) and `m` (for `y`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BbParams {
    pub l: usize,
    pub m: usize,
    pub a: i64,
    pub b: i64,
    pub c: i64,
    pub d: i64,
}

impl BbParams {
    pub const fn new(l: usize, m: usize, a: i64, b: i64, c: i64, d: i64) -> Self {
        Self { l, m, a, b, c, d }
    }

    /// Number of data qubits, `2·l·m`.
    pub const fn n(&self) -> usize {
        2 * self.l * self.m
    }

    pub fn validate(&self) -> Result<(), QecError> {
        if self.l == 0 || self.m == 0 {
            return Err(QecError::InvalidLattice(format!(
                "BB lattice needs l, m >= 1, got l={}, m={}",
                self.l, self.m
            )));
        }
        Ok(())
    }
}

/// Size of a rotated surface code patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceParams {
    pub lx: usize,
    pub ly: usize,
}

impl SurfaceParams {
    pub const fn new(lx: usize, ly: usize) -> Self {
        Self { lx, ly }
    }

    /// Boundary stabilizers only tile correctly for odd patch sizes.
    pub fn validate(&self) -> Result<(), QecError> {
        if self.lx < 3 || self.ly < 3 || self.lx % 2 == 0 || self.ly % 2 == 0 {
            return Err(QecError::InvalidLattice(format!(
                "surface code needs odd lx, ly >= 3, got lx={}, ly={}",
                self.lx, self.ly
            )));
        }
        Ok(())
    }
}

/// A named entry of the standard configuration registry.
#[derive(Debug, Clone, Copy)]
pub struct CodeConfig {
    pub id: u32,
    pub name: &'static str,
    pub params: BbParams,
}

/// The standard BB configurations, in registry order.
pub const STANDARD_CODES: [CodeConfig; 5] = [
    CodeConfig {
        id: 1,
        name: "Balanced 6x6 Code",
        params: BbParams::new(6, 6, 3, -1, -1, 3),
    },
    CodeConfig {
        id: 2,
        name: "Rectangular 3x15 Code",
        params: BbParams::new(3, 15, 0, 5, -1, 3),
    },
    CodeConfig {
        id: 3,
        name: "Balanced 7x7 Code",
        params: BbParams::new(7, 7, 1, -3, -3, 1),
    },
    CodeConfig {
        id: 4,
        name: "Rectangular 9x6 Code",
        params: BbParams::new(9, 6, 3, -1, -1, 3),
    },
    CodeConfig {
        id: 5,
        name: "Rectangular 12x6 Code",
        params: BbParams::new(12, 6, 3, -1, -1, 3),
    },
];

fn valid_options() -> String {
    STANDARD_CODES
        .iter()
        .map(|c| format!("{} ({})", c.id, c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Looks up a standard configuration by numeric id.
pub fn code_config(id: u32) -> Result<&'static CodeConfig, QecError> {
    STANDARD_CODES.iter().find(|c| c.id == id).ok_or_else(|| {
        QecError::InvalidConfiguration(format!(
            "Invalid configuration ID: {id}. Valid options are: {}",
            valid_options()
        ))
    })
}

/// Resolves a numeric id or a case-insensitive name.
pub fn resolve_code(key: &str) -> Result<&'static CodeConfig, QecError> {
    let key = key.trim();
    if let Ok(id) = key.parse::<u32>() {
        return code_config(id);
    }
    STANDARD_CODES
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(key))
        .ok_or_else(|| {
            QecError::InvalidConfiguration(format!(
                "Invalid configuration ID: {key}. Valid options are: {}",
                valid_options()
            ))
        })
}

/// Settings handed to the external BP+OSD decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BposdParameters {
    pub max_iter: usize,
    pub ms_scaling_factor: f64,
    pub osd_method: String,
    pub bp_method: String,
    pub osd_order: usize,
}

impl Default for BposdParameters {
    fn default() -> Self {
        Self {
            max_iter: 15,
            ms_scaling_factor: 0.0,
            osd_method: "osd0".to_string(),
            bp_method: "ms".to_string(),
            osd_order: 0,
        }
    }
}

/// Which code family an experiment targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum CodeSpec {
    /// A registry entry by id or name.
    Standard { key: String },
    Bb { params: BbParams },
    Surface {
        params: SurfaceParams,
        #[serde(default)]
        layout: SurfaceLayout,
    },
}

/// Coupler defect selector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "rate", rename_all = "snake_case")]
pub enum DefectRate {
    /// All couplers present.
    None,
    /// Both stabilizer types lose one long-range coupler each.
    Half,
    /// Every Z stabilizer loses one long-range coupler.
    ThreeQuarter,
    /// Like `ThreeQuarter`, routed through the general table.
    Full,
    /// Independent random dropout with the given probability.
    Random(f64),
}

/// Named noise profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseKind {
    Uniform,
    Si1000,
}

/// Everything needed to reproduce one generated circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub code: CodeSpec,
    #[serde(default = "default_defects")]
    pub defects: DefectRate,
    /// Repetitions of the steady-state block.
    pub rounds: usize,
    #[serde(default)]
    pub noise: Option<NoiseSettings>,
    /// Declare X detectors as well as Z detectors.
    #[serde(default)]
    pub x_detectors: bool,
    #[serde(default)]
    pub seed: u64,
    /// Where the circuit text goes; standard output when absent.
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseSettings {
    pub profile: NoiseKind,
    pub p: f64,
}

fn default_defects() -> DefectRate {
    DefectRate::None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_resolves_ids_and_names() {
        let c = code_config(1).unwrap();
        assert_eq!(c.params, BbParams::new(6, 6, 3, -1, -1, 3));
        assert_eq!(c.params.n(), 72);
        let by_name = resolve_code("rectangular 12x6 code").unwrap();
        assert_eq!(by_name.id, 5);
        assert_eq!(resolve_code(" 3 ").unwrap().params.l, 7);
    }

    #[test]
    fn unknown_id_lists_valid_options() {
        let err = code_config(9).unwrap_err().to_string();
        assert!(err.starts_with("Invalid configuration ID: 9."));
        assert!(err.contains("1 (Balanced 6x6 Code)"));
        assert!(err.contains("5 (Rectangular 12x6 Code)"));
    }

    #[test]
    fn surface_sizes_must_be_odd() {
        assert!(SurfaceParams::new(3, 5).validate().is_ok());
        assert!(SurfaceParams::new(4, 5).validate().is_err());
        assert!(SurfaceParams::new(1, 1).validate().is_err());
        assert!(BbParams::new(0, 6, 3, -1, -1, 3).validate().is_err());
    }

    #[test]
    fn experiment_config_reads_json_with_defaults() {
        let json = r#"{
            "code": {"family": "standard", "key": "2"},
            "defects": {"kind": "random", "rate": 0.1},
            "rounds": 5,
            "noise": {"profile": "si1000", "p": 0.001}
        }"#;
        let cfg: ExperimentConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.code, CodeSpec::Standard { key: "2".to_string() });
        assert_eq!(cfg.defects, DefectRate::Random(0.1));
        assert_eq!(cfg.noise.unwrap().profile, NoiseKind::Si1000);
        assert!(!cfg.x_detectors);
        assert_eq!(cfg.seed, 0);
        assert_eq!(cfg.output, None);

        let surface: CodeSpec =
            serde_json::from_str(r#"{"family": "surface", "params": {"lx": 3, "ly": 5}}"#).unwrap();
        assert_eq!(
            surface,
            CodeSpec::Surface { params: SurfaceParams::new(3, 5), layout: SurfaceLayout::Standard }
        );
        let relayed: CodeSpec = serde_json::from_str(
            r#"{"family": "surface", "params": {"lx": 5, "ly": 5}, "layout": "relayed"}"#,
        )
        .unwrap();
        assert_eq!(
            relayed,
            CodeSpec::Surface { params: SurfaceParams::new(5, 5), layout: SurfaceLayout::Relayed }
        );
        let none: DefectRate = serde_json::from_str(r#"{"kind": "none"}"#).unwrap();
        assert_eq!(none, DefectRate::None);
    }

    #[test]
    fn bposd_defaults_match_decoder_settings() {
        let p = BposdParameters::default();
        assert_eq!(p.max_iter, 15);
        assert_eq!(p.osd_method, "osd0");
        assert_eq!(p.bp_method, "ms");
        assert_eq!(p.osd_order, 0);
    }
}
