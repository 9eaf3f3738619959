use crate::QecError;
use crate::code::bb::{BbCode, FIRST_LONG_RANGE_SLOT, Pairing, SECOND_LONG_RANGE_SLOT};
use crate::code::{CodeLayout, Stabilizer, StabilizerKind};
use crate::config::DefectRate;
use rand::Rng;
use tracing::info;

/// Coupler state of one stabilizer.
///
/// The integer values are the ones used in exported defect lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(i8)]
pub enum DefectTag {
    #[default]
    Intact = 0,
    /// The slot-5 long-range coupler is missing.
    DropLast = -1,
    /// The slot-4 long-range coupler is missing.
    DropSecondLast = -2,
}

impl DefectTag {
    pub const fn value(self) -> i8 {
        self as i8
    }

    pub const fn from_value(v: i8) -> Option<Self> {
        match v {
            0 => Some(DefectTag::Intact),
            -1 => Some(DefectTag::DropLast),
            -2 => Some(DefectTag::DropSecondLast),
            _ => None,
        }
    }

    /// Slot whose coupler is missing, if any.
    pub const fn dropped_slot(self) -> Option<usize> {
        match self {
            DefectTag::Intact => None,
            DefectTag::DropLast => Some(SECOND_LONG_RANGE_SLOT),
            DefectTag::DropSecondLast => Some(FIRST_LONG_RANGE_SLOT),
        }
    }

    pub const fn is_defective(self) -> bool {
        !matches!(self, DefectTag::Intact)
    }
}

/// How dropped couplers are assigned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DropoutPolicy {
    /// Each Z stabilizer independently loses one long-range coupler with
    /// probability `rate`; X stabilizers likewise unless their Z partner
    /// already lost one.
    Random { rate: f64 },
    /// Every Z stabilizer loses its slot-4 coupler.
    Fixed,
    /// Every stabilizer of both types loses its slot-4 coupler.
    FixedHalf,
}

impl DropoutPolicy {
    pub fn random(rate: f64) -> Result<Self, QecError> {
        if !(0.0..=1.0).contains(&rate) {
            return Err(QecError::InvalidConfiguration(format!(
                "dropout rate must lie in [0, 1], got {rate}"
            )));
        }
        Ok(DropoutPolicy::Random { rate })
    }

    /// Policy behind a defect-rate selector; `None` for a defect-free run.
    pub fn for_rate(rate: DefectRate) -> Result<Option<Self>, QecError> {
        Ok(match rate {
            DefectRate::None => None,
            DefectRate::Half => Some(DropoutPolicy::FixedHalf),
            DefectRate::ThreeQuarter | DefectRate::Full => Some(DropoutPolicy::Fixed),
            DefectRate::Random(p) => Some(Self::random(p)?),
        })
    }
}

/// A stabilizer together with its coupler tag.
#[derive(Debug, Clone, Copy)]
pub struct TaggedStabilizer<'a> {
    pub stabilizer: &'a Stabilizer,
    pub tag: DefectTag,
}

/// Per-stabilizer tags for both types, in ancilla measurement order.
///
/// The incidence maps themselves are left untouched; a tag only records
/// which coupler the scheduler must route around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefectPattern {
    x_tags: Vec<DefectTag>,
    z_tags: Vec<DefectTag>,
}

impl DefectPattern {
    /// No dropped couplers.
    pub fn intact(x_count: usize, z_count: usize) -> Self {
        Self {
            x_tags: vec![DefectTag::Intact; x_count],
            z_tags: vec![DefectTag::Intact; z_count],
        }
    }

    /// No dropped couplers, one tag per coupler ancilla of `code`.
    pub fn intact_for<L: CodeLayout>(code: &L) -> Self {
        Self::intact(
            code.couplers(StabilizerKind::X).len(),
            code.couplers(StabilizerKind::Z).len(),
        )
    }

    pub fn from_tags(x_tags: Vec<DefectTag>, z_tags: Vec<DefectTag>) -> Self {
        Self { x_tags, z_tags }
    }

    /// Draws a defect pattern for a BB code.
    ///
    /// # Arguments
    ///
    /// * `code` - The code whose stabilizers are tagged
    /// * `policy` - Assignment rule
    /// * `rng` - Caller-owned random source; only `Random` draws from it
    ///
    /// # Returns
    ///
    /// The pattern. Draw order is all Z stabilizers, then all X stabilizers,
    /// so a fixed seed always yields the same pattern.
    pub fn inject<R: Rng + ?Sized>(code: &BbCode, policy: DropoutPolicy, rng: &mut R) -> Self {
        let xs = code.stabilizers(StabilizerKind::X);
        let zs = code.stabilizers(StabilizerKind::Z);

        let pattern = match policy {
            DropoutPolicy::Fixed => Self {
                x_tags: vec![DefectTag::Intact; xs.len()],
                z_tags: vec![DefectTag::DropSecondLast; zs.len()],
            },
            DropoutPolicy::FixedHalf => Self {
                x_tags: vec![DefectTag::DropSecondLast; xs.len()],
                z_tags: vec![DefectTag::DropSecondLast; zs.len()],
            },
            DropoutPolicy::Random { rate } => {
                let mut draw = || {
                    if rng.gen_bool(rate) {
                        if rng.gen_bool(0.5) {
                            DefectTag::DropLast
                        } else {
                            DefectTag::DropSecondLast
                        }
                    } else {
                        DefectTag::Intact
                    }
                };
                let z_tags: Vec<DefectTag> = zs.iter().map(|_| draw()).collect();
                let x_tags = xs
                    .iter()
                    .map(|s| {
                        let partner_dropped = code
                            .partner(StabilizerKind::X, s.ancilla, Pairing::Full)
                            .and_then(|z| zs.position(z))
                            .is_some_and(|i| z_tags[i].is_defective());
                        if partner_dropped {
                            DefectTag::Intact
                        } else {
                            draw()
                        }
                    })
                    .collect();
                Self { x_tags, z_tags }
            }
        };

        info!(
            ?policy,
            dropped = pattern.dropped_couplers(),
            total = code.long_range_couplers(),
            "injected coupler defects"
        );
        pattern
    }

    pub fn tags(&self, kind: StabilizerKind) -> &[DefectTag] {
        match kind {
            StabilizerKind::X => &self.x_tags,
            StabilizerKind::Z => &self.z_tags,
        }
    }

    /// Coupler ancillas of one type paired with their tags.
    pub fn tagged<'a, L: CodeLayout>(
        &'a self,
        code: &'a L,
        kind: StabilizerKind,
    ) -> impl Iterator<Item = TaggedStabilizer<'a>> + 'a {
        code.couplers(kind)
            .iter()
            .zip(self.tags(kind).iter().copied())
            .map(|(stabilizer, tag)| TaggedStabilizer { stabilizer, tag })
    }

    pub fn count(&self, kind: StabilizerKind, tag: DefectTag) -> usize {
        self.tags(kind).iter().filter(|&&t| t == tag).count()
    }

    /// Number of missing long-range couplers over both types.
    pub fn dropped_couplers(&self) -> usize {
        self.x_tags
            .iter()
            .chain(&self.z_tags)
            .filter(|t| t.is_defective())
            .count()
    }

    /// Dropped fraction of a total coupler budget.
    pub fn dropped_fraction(&self, total_couplers: usize) -> f64 {
        if total_couplers == 0 {
            return 0.0;
        }
        self.dropped_couplers() as f64 / total_couplers as f64
    }

    pub fn is_intact(&self) -> bool {
        self.dropped_couplers() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::code_config;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn balanced() -> BbCode {
        BbCode::new(code_config(1).unwrap().params).unwrap()
    }

    #[test]
    fn tag_values_round_trip() {
        for tag in [DefectTag::Intact, DefectTag::DropLast, DefectTag::DropSecondLast] {
            assert_eq!(DefectTag::from_value(tag.value()), Some(tag));
        }
        assert_eq!(DefectTag::from_value(-3), None);
        assert_eq!(DefectTag::from_value(1), None);
        assert_eq!(DefectTag::DropLast.dropped_slot(), Some(5));
        assert_eq!(DefectTag::DropSecondLast.dropped_slot(), Some(4));
    }

    #[test]
    fn same_seed_same_pattern() {
        let code = balanced();
        let policy = DropoutPolicy::random(0.3).unwrap();
        let a = DefectPattern::inject(&code, policy, &mut StdRng::seed_from_u64(42));
        let b = DefectPattern::inject(&code, policy, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn z_dropout_rate_converges() {
        let code = balanced();
        let policy = DropoutPolicy::random(0.2).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let trials = 400;
        let mut dropped = 0;
        let mut total = 0;
        for _ in 0..trials {
            let p = DefectPattern::inject(&code, policy, &mut rng);
            let z = p.tags(StabilizerKind::Z);
            dropped += z.iter().filter(|t| t.is_defective()).count();
            total += z.len();
        }
        let observed = dropped as f64 / total as f64;
        assert!((observed - 0.2).abs() < 0.02, "observed {observed}");
    }

    #[test]
    fn fixed_half_drops_slot_four_everywhere() {
        let code = balanced();
        let p = DefectPattern::inject(&code, DropoutPolicy::FixedHalf, &mut StdRng::seed_from_u64(0));
        for kind in [StabilizerKind::X, StabilizerKind::Z] {
            assert_eq!(p.count(kind, DefectTag::DropSecondLast), 36);
            assert_eq!(p.count(kind, DefectTag::DropLast), 0);
        }
        assert_eq!(p.dropped_fraction(code.long_range_couplers()), 0.5);
    }

    #[test]
    fn x_stabilizer_is_spared_when_its_partner_dropped() {
        let code = balanced();
        let policy = DropoutPolicy::random(0.5).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let p = DefectPattern::inject(&code, policy, &mut rng);
            let zs = code.stabilizers(StabilizerKind::Z);
            for t in p.tagged(&code, StabilizerKind::X) {
                let z = code
                    .partner(StabilizerKind::X, t.stabilizer.ancilla, Pairing::Full)
                    .unwrap();
                if p.tags(StabilizerKind::Z)[zs.position(z).unwrap()].is_defective() {
                    assert_eq!(t.tag, DefectTag::Intact);
                }
            }
        }
    }

    #[test]
    fn intact_pattern_follows_the_coupler_count() {
        use crate::code::{SurfaceCode, SurfaceLayout};
        use crate::config::SurfaceParams;

        let code = SurfaceCode::new(SurfaceParams::new(3, 5), SurfaceLayout::Gidney).unwrap();
        let p = DefectPattern::intact_for(&code);
        assert_eq!(p.tags(StabilizerKind::X).len(), 7);
        assert_eq!(p.tags(StabilizerKind::Z).len(), 7);
        assert_eq!(code.stabilizers(StabilizerKind::X).len(), 6);
        assert!(p.is_intact());
        assert_eq!(p.tagged(&code, StabilizerKind::Z).count(), 7);

        let bb = balanced();
        assert_eq!(DefectPattern::intact_for(&bb), DefectPattern::intact(36, 36));
    }

    #[test]
    fn rates_outside_unit_interval_are_rejected() {
        assert!(DropoutPolicy::random(1.5).is_err());
        assert!(DropoutPolicy::random(-0.1).is_err());
        assert!(DropoutPolicy::for_rate(DefectRate::None).unwrap().is_none());
        assert_eq!(
            DropoutPolicy::for_rate(DefectRate::Full).unwrap(),
            Some(DropoutPolicy::Fixed)
        );
    }
}
