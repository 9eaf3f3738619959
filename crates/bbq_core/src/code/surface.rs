//! Rotated surface code on a `(2·ly+1) × (2·lx+1)` grid.
//!
//! Data qubits occupy the `(odd, odd)` sites. Ancillas sit on even rows at
//! column positions spaced four apart, alternating between X and Z types
//! from one even row to the next. Neighbors that fall off the patch map to
//! an absent slot, which gives weight-2 boundary stabilizers.
//!
//! Two layouts target hardware where each ancilla reaches only three data
//! qubits. [`SurfaceLayout::Gidney`] moves every ancilla two sites along
//! its type's axis, so a stabilizer is read through a shifted ancilla and
//! the cycle alternates between two stabilizer frames.
//! [`SurfaceLayout::Relayed`] keeps the standard stabilizers and reaches
//! the fourth data qubit through a neighboring relay ancilla.

use super::{CodeLayout, CssCode, IncidenceMap, Pairing, QubitPartition, Stabilizer, StabilizerKind};
use crate::QecError;
use crate::config::SurfaceParams;
use crate::gf2::BitMatrix;
use crate::lattice::Lattice;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::info;

/// Slot count of a surface stabilizer; boundary stabilizers leave two absent.
pub const SURFACE_STABILIZER_WEIGHT: usize = 4;

const X_OFFSETS: [(i64, i64); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];
const Z_OFFSETS: [(i64, i64); 4] = [(-1, -1), (1, -1), (-1, 1), (1, 1)];

/// Placement of X and Z ancillas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceLayout {
    #[default]
    Standard,
    /// X and Z exchanged in the bulk; boundary types unchanged.
    Dual,
    /// Three couplers per ancilla; the cycle runs forward then mirrored,
    /// ending on the dual stabilizers.
    Gidney,
    /// Standard stabilizers, fourth coupler bridged through a relay ancilla.
    Relayed,
}

impl SurfaceLayout {
    pub const ALL: [SurfaceLayout; 4] = [
        SurfaceLayout::Standard,
        SurfaceLayout::Dual,
        SurfaceLayout::Gidney,
        SurfaceLayout::Relayed,
    ];

    /// Placement of the stabilizers read out at the end of a cycle.
    fn placement(self) -> Placement {
        match self {
            SurfaceLayout::Standard | SurfaceLayout::Relayed => Placement::Standard,
            SurfaceLayout::Dual | SurfaceLayout::Gidney => Placement::Dual,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Placement {
    Standard,
    Dual,
    /// Coupler sites of the three-coupler grid.
    Shifted,
}

/// Column ranges `(start, end_exclusive)` with step 4 for one even row.
struct RowPlan {
    x: Option<(usize, usize)>,
    z: Option<(usize, usize)>,
}

impl Placement {
    fn row_plan(self, i: usize, rows: usize, cols: usize) -> RowPlan {
        let odd_band = (i / 2) % 2 == 1;
        match self {
            Placement::Standard => {
                if i == 0 {
                    RowPlan { x: Some((2, cols - 1)), z: None }
                } else if i == rows - 1 {
                    RowPlan { x: Some((4, cols)), z: None }
                } else if odd_band {
                    RowPlan { x: Some((4, cols - 1)), z: Some((2, cols)) }
                } else {
                    RowPlan { x: Some((2, cols - 1)), z: Some((0, cols)) }
                }
            }
            Placement::Dual => {
                if i == 0 {
                    RowPlan { x: Some((4, cols)), z: None }
                } else if i == rows - 1 {
                    RowPlan { x: Some((2, cols - 1)), z: None }
                } else if odd_band {
                    RowPlan { x: Some((2, cols - 1)), z: Some((0, cols - 1)) }
                } else {
                    RowPlan { x: Some((4, cols)), z: Some((2, cols)) }
                }
            }
            Placement::Shifted => {
                if i == 0 {
                    RowPlan { x: None, z: None }
                } else if i == rows - 1 {
                    RowPlan { x: Some((2, cols - 1)), z: Some((4, cols)) }
                } else if odd_band {
                    RowPlan { x: Some((2, cols)), z: Some((4, cols)) }
                } else {
                    RowPlan { x: Some((4, cols)), z: Some((2, cols)) }
                }
            }
        }
    }
}

/// X and Z incidence maps of one stabilizer frame.
#[derive(Debug, Clone)]
struct Frame {
    x: IncidenceMap,
    z: IncidenceMap,
}

impl Frame {
    fn new(x: Vec<Stabilizer>, z: Vec<Stabilizer>) -> Self {
        Self {
            x: IncidenceMap::new(StabilizerKind::X, x),
            z: IncidenceMap::new(StabilizerKind::Z, z),
        }
    }

    fn get(&self, kind: StabilizerKind) -> &IncidenceMap {
        match kind {
            StabilizerKind::X => &self.x,
            StabilizerKind::Z => &self.z,
        }
    }
}

/// Site two steps along `kind`'s axis: right for Z, down for X.
fn shifted(lattice: &Lattice, kind: StabilizerKind, site: usize) -> Option<usize> {
    let (i, j) = lattice.coord(site);
    let (i, j) = match kind {
        StabilizerKind::X => (i + 2, j),
        StabilizerKind::Z => (i, j + 2),
    };
    (i < lattice.rows() && j < lattice.cols()).then(|| lattice.label(i as i64, j as i64))
}

/// Reassigns each stabilizer to the coupler site that measures it.
///
/// The shifted site is preferred; a stabilizer whose shifted site is not a
/// coupler keeps its own centre, which must then be one.
fn measured_through(
    lattice: &Lattice,
    kind: StabilizerKind,
    stabilizers: Vec<Stabilizer>,
    sites: &HashSet<usize>,
) -> Result<Vec<Stabilizer>, QecError> {
    let mut used = HashSet::new();
    stabilizers
        .into_iter()
        .map(|mut s| {
            let ancilla = shifted(lattice, kind, s.ancilla)
                .filter(|a| sites.contains(a))
                .or_else(|| Some(s.ancilla).filter(|a| sites.contains(a)))
                .ok_or_else(|| {
                    QecError::InvalidLattice(format!(
                        "{kind:?} stabilizer at {:?} has no coupler site",
                        lattice.coord(s.ancilla)
                    ))
                })?;
            if !used.insert(ancilla) {
                return Err(QecError::InvalidLattice(format!(
                    "coupler site {:?} measures two {kind:?} stabilizers",
                    lattice.coord(ancilla)
                )));
            }
            s.ancilla = ancilla;
            Ok(s)
        })
        .collect()
}

/// A rotated surface code patch.
#[derive(Debug, Clone)]
pub struct SurfaceCode {
    params: SurfaceParams,
    layout: SurfaceLayout,
    lattice: Lattice,
    partition: QubitPartition,
    stabilizers: Frame,
    couplers: Option<Frame>,
    mid_cycle: Option<Frame>,
    relays: HashMap<(StabilizerKind, usize), usize>,
    x_logical: Vec<usize>,
    z_logical: Vec<usize>,
    css: CssCode,
}

impl SurfaceCode {
    pub fn new(params: SurfaceParams, layout: SurfaceLayout) -> Result<Self, QecError> {
        params.validate()?;
        let rows = 2 * params.ly + 1;
        let cols = 2 * params.lx + 1;
        let lattice = Lattice::new(rows, cols);

        let is_data = |label: usize| {
            let (r, c) = lattice.coord(label);
            r % 2 == 1 && c % 2 == 1
        };
        let stabilizer = |i: usize, j: usize, offsets: &[(i64, i64); 4]| {
            let (i, j) = (i as i64, j as i64);
            Stabilizer {
                ancilla: lattice.label(i, j),
                slots: offsets
                    .iter()
                    .map(|&(dr, dc)| Some(lattice.label(i + dr, j + dc)).filter(|&q| is_data(q)))
                    .collect(),
            }
        };
        let place = |placement: Placement| {
            let mut x_stabs = Vec::new();
            let mut z_stabs = Vec::new();
            for i in (0..rows).step_by(2) {
                let plan = placement.row_plan(i, rows, cols);
                if let Some((start, end)) = plan.z {
                    z_stabs.extend((start..end).step_by(4).map(|j| stabilizer(i, j, &Z_OFFSETS)));
                }
                if let Some((start, end)) = plan.x {
                    x_stabs.extend((start..end).step_by(4).map(|j| stabilizer(i, j, &X_OFFSETS)));
                }
            }
            (x_stabs, z_stabs)
        };

        let data: Vec<usize> = (1..rows)
            .step_by(2)
            .flat_map(|i| (1..cols).step_by(2).map(move |j| (i, j)))
            .map(|(i, j)| lattice.label(i as i64, j as i64))
            .collect();

        let (mut x_stabs, mut z_stabs) = place(layout.placement());
        let mut couplers = None;
        let mut mid_cycle = None;
        let mut relays = HashMap::new();
        let mut relay_only = Vec::new();
        match layout {
            SurfaceLayout::Standard | SurfaceLayout::Dual => {}
            SurfaceLayout::Gidney => {
                let (cx, cz) = place(Placement::Shifted);
                let sites: HashSet<usize> = cx.iter().chain(&cz).map(|s| s.ancilla).collect();
                let (sx, sz) = place(Placement::Standard);
                mid_cycle = Some(Frame::new(
                    measured_through(&lattice, StabilizerKind::X, sx, &sites)?,
                    measured_through(&lattice, StabilizerKind::Z, sz, &sites)?,
                ));
                x_stabs = measured_through(&lattice, StabilizerKind::X, x_stabs, &sites)?;
                z_stabs = measured_through(&lattice, StabilizerKind::Z, z_stabs, &sites)?;
                couplers = Some(Frame::new(cx, cz));
            }
            SurfaceLayout::Relayed => {
                let measuring: HashSet<usize> =
                    x_stabs.iter().chain(&z_stabs).map(|s| s.ancilla).collect();
                for (kind, stabs) in [(StabilizerKind::Z, &z_stabs), (StabilizerKind::X, &x_stabs)] {
                    for s in stabs.iter().filter(|s| s.slot(3).is_some()) {
                        let relay = shifted(&lattice, kind, s.ancilla).ok_or_else(|| {
                            QecError::InvalidLattice(format!(
                                "{kind:?} stabilizer at {:?} has no relay site",
                                lattice.coord(s.ancilla)
                            ))
                        })?;
                        relays.insert((kind, s.ancilla), relay);
                        if !measuring.contains(&relay) && !relay_only.contains(&relay) {
                            relay_only.push(relay);
                        }
                    }
                }
            }
        }

        let z_logical: Vec<usize> = (1..cols - 1)
            .step_by(2)
            .map(|j| lattice.label(1, j as i64))
            .collect();
        let x_logical: Vec<usize> = (1..rows - 1)
            .step_by(2)
            .map(|i| lattice.label(i as i64, 1))
            .collect();

        let partition = QubitPartition::new(
            data.clone(),
            x_stabs.iter().map(|s| s.ancilla).collect(),
            z_stabs.iter().map(|s| s.ancilla).collect(),
        )
        .with_relays(relay_only);
        let to_columns = |stabs: &[Stabilizer]| {
            BitMatrix::from_supports(
                stabs.iter().map(|s| {
                    s.support()
                        .filter_map(|q| partition.data_index(q))
                        .collect::<Vec<_>>()
                }),
                data.len(),
            )
        };
        let css = CssCode::new(to_columns(&x_stabs), to_columns(&z_stabs), data)?;

        info!(
            lx = params.lx,
            ly = params.ly,
            ?layout,
            x_stabilizers = x_stabs.len(),
            z_stabilizers = z_stabs.len(),
            relays = partition.relays().len(),
            "constructed surface code"
        );

        Ok(Self {
            params,
            layout,
            lattice,
            partition,
            stabilizers: Frame::new(x_stabs, z_stabs),
            couplers,
            mid_cycle,
            relays,
            x_logical,
            z_logical,
            css,
        })
    }
    pub fn params(&self) -> &SurfaceParams {
        &self.params
    }

    pub fn layout(&self) -> SurfaceLayout {
        self.layout
    }

    pub fn n(&self) -> usize {
        self.params.lx * self.params.ly
    }

    pub fn k(&self) -> usize {
        1
    }

    /// Designed distance, `min(lx, ly)`.
    pub fn d(&self) -> usize {
        self.params.lx.min(self.params.ly)
    }

    pub fn x_logical(&self) -> &[usize] {
        &self.x_logical
    }

    pub fn z_logical(&self) -> &[usize] {
        &self.z_logical
    }

    pub fn css(&self) -> &CssCode {
        &self.css
    }
}

impl CodeLayout for SurfaceCode {
    fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    fn partition(&self) -> &QubitPartition {
        &self.partition
    }

    fn stabilizers(&self, kind: StabilizerKind) -> &IncidenceMap {
        self.stabilizers.get(kind)
    }

    fn z_logicals(&self) -> Vec<Vec<usize>> {
        vec![self.z_logical.clone()]
    }

    fn couplers(&self, kind: StabilizerKind) -> &IncidenceMap {
        self.couplers.as_ref().unwrap_or(&self.stabilizers).get(kind)
    }

    fn mid_cycle_stabilizers(&self, kind: StabilizerKind) -> Option<&IncidenceMap> {
        self.mid_cycle.as_ref().map(|f| f.get(kind))
    }

    fn partner(&self, kind: StabilizerKind, ancilla: usize, pairing: Pairing) -> Option<usize> {
        if pairing != Pairing::Relay {
            return None;
        }
        self.relays.get(&(kind, ancilla)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::commutes;

    #[test]
    fn stabilizer_counts_and_weights() {
        for layout in SurfaceLayout::ALL {
            let code = SurfaceCode::new(SurfaceParams::new(5, 5), layout).unwrap();
            let x = code.stabilizers(StabilizerKind::X);
            let z = code.stabilizers(StabilizerKind::Z);
            assert_eq!(x.len() + z.len(), code.n() - 1);
            for s in x.iter().chain(z.iter()) {
                assert!(s.weight() == 4 || s.weight() == 2, "weight {}", s.weight());
                assert_eq!(s.slots.len(), SURFACE_STABILIZER_WEIGHT);
            }
            assert_eq!(code.css().k(), 1);
        }
    }

    #[test]
    fn logicals_commute_with_dual_stabilizers() {
        for (lx, ly) in [(3, 3), (3, 5), (5, 3), (7, 7)] {
            for layout in SurfaceLayout::ALL {
                let code = SurfaceCode::new(SurfaceParams::new(lx, ly), layout).unwrap();
                for s in code.stabilizers(StabilizerKind::X).iter() {
                    assert!(commutes(code.z_logical(), s));
                }
                for s in code.stabilizers(StabilizerKind::Z).iter() {
                    assert!(commutes(code.x_logical(), s));
                }
                let overlap = code
                    .z_logical()
                    .iter()
                    .filter(|q| code.x_logical().contains(q))
                    .count();
                assert_eq!(overlap % 2, 1);
            }
        }
    }

    #[test]
    fn boundary_neighbors_are_absent() {
        let code = SurfaceCode::new(SurfaceParams::new(3, 3), SurfaceLayout::Standard).unwrap();
        let lattice = *code.lattice();
        let top = code
            .stabilizers(StabilizerKind::X)
            .get(lattice.label(0, 2))
            .unwrap();
        assert_eq!(top.slots[0], None);
        assert_eq!(top.slots[1], None);
        assert_eq!(top.slots[2], Some(lattice.label(1, 1)));
        assert_eq!(top.slots[3], Some(lattice.label(1, 3)));
    }

    fn sorted(mut v: Vec<usize>) -> Vec<usize> {
        v.sort_unstable();
        v
    }

    #[test]
    fn gidney_frames_cover_every_coupler_site_once() {
        for (lx, ly) in [(3, 3), (3, 5), (5, 3), (5, 5), (7, 5)] {
            let code = SurfaceCode::new(SurfaceParams::new(lx, ly), SurfaceLayout::Gidney).unwrap();
            let sites = |f: &dyn Fn(StabilizerKind) -> Vec<usize>| {
                sorted([StabilizerKind::X, StabilizerKind::Z].into_iter().flat_map(f).collect())
            };
            let couplers = sites(&|k| code.couplers(k).ancillas());
            let home = sites(&|k| code.stabilizers(k).ancillas());
            let mid = sites(&|k| code.mid_cycle_stabilizers(k).unwrap().ancillas());
            assert_eq!(couplers.len(), code.n() - 1);
            assert_eq!(home, couplers);
            assert_eq!(mid, couplers);
            assert!(code.partition().relays().is_empty());
        }
    }

    #[test]
    fn gidney_couplers_sit_beside_their_stabilizers() {
        let code = SurfaceCode::new(SurfaceParams::new(5, 5), SurfaceLayout::Gidney).unwrap();
        let lattice = *code.lattice();
        assert!(code.couplers(StabilizerKind::X).iter().all(|s| lattice.coord(s.ancilla).0 > 0));
        for kind in [StabilizerKind::X, StabilizerKind::Z] {
            for s in code.stabilizers(kind).iter() {
                let (i, j) = lattice.coord(s.ancilla);
                assert_eq!(i % 2, 0);
                assert_eq!(j % 2, 0);
                assert!(code.couplers(kind).get(s.ancilla).is_some() || code.couplers(kind.dual()).get(s.ancilla).is_some());
            }
        }
    }

    #[test]
    fn relayed_layout_adds_relays_on_the_far_boundaries() {
        let code = SurfaceCode::new(SurfaceParams::new(3, 3), SurfaceLayout::Relayed).unwrap();
        let lattice = *code.lattice();
        let relays: Vec<(usize, usize)> = code
            .partition()
            .relays()
            .iter()
            .map(|&q| lattice.coord(q))
            .collect();
        assert_eq!(relays, vec![(4, 6), (6, 2)]);
        assert_eq!(code.partition().len(), 9 + 8 + 2);
        assert_eq!(code.partition().all().len(), code.partition().len());

        let code = SurfaceCode::new(SurfaceParams::new(5, 5), SurfaceLayout::Relayed).unwrap();
        assert_eq!(code.partition().relays().len(), 4);
    }

    #[test]
    fn relay_partners_need_the_fourth_slot() {
        let code = SurfaceCode::new(SurfaceParams::new(5, 5), SurfaceLayout::Relayed).unwrap();
        let lattice = *code.lattice();
        for kind in [StabilizerKind::X, StabilizerKind::Z] {
            for s in code.stabilizers(kind).iter() {
                let relay = code.partner(kind, s.ancilla, Pairing::Relay);
                assert_eq!(relay.is_some(), s.slot(3).is_some());
                if let Some(r) = relay {
                    let (i, j) = lattice.coord(s.ancilla);
                    let expected = match kind {
                        StabilizerKind::X => (i + 2, j),
                        StabilizerKind::Z => (i, j + 2),
                    };
                    assert_eq!(lattice.coord(r), expected);
                }
                assert_eq!(code.partner(kind, s.ancilla, Pairing::Full), None);
            }
        }
        let standard = SurfaceCode::new(SurfaceParams::new(5, 5), SurfaceLayout::Standard).unwrap();
        let s = &standard.stabilizers(StabilizerKind::Z).stabilizers()[1];
        assert_eq!(standard.partner(StabilizerKind::Z, s.ancilla, Pairing::Relay), None);
    }

    #[test]
    fn layouts_deserialize_from_snake_case() {
        let layout: SurfaceLayout = serde_json::from_str("\"gidney\"").unwrap();
        assert_eq!(layout, SurfaceLayout::Gidney);
        assert_eq!(serde_json::to_string(&SurfaceLayout::Relayed).unwrap(), "\"relayed\"");
    }
}
