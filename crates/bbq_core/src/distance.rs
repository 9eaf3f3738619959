use crate::QecError;
use crate::code::{CssCode, StabilizerKind};
use crate::gf2::{self, BitMatrix, BitRow};
use bitvec::prelude::*;
use rand::Rng;
use rayon::prelude::*;
use tracing::{debug, info};

/// Solution values above this are read as 1 when rounding a relaxed solve.
pub const SOLUTION_ROUNDING_THRESHOLD: f64 = 0.5;

/// Backend that finds a minimum-weight vector in `ker(checks)` with odd
/// overlap against one logical of the dual type.
///
/// Implementations must be safe to call from several rayon workers at once.
pub trait DistanceSolver: Sync {
    /// Minimizes `|x|` subject to `checks · x = 0` and `logical · x = 1`.
    ///
    /// # Arguments
    ///
    /// * `checks` - Parity checks the solution must satisfy
    /// * `logical` - Dual logical the solution must anticommute with
    ///
    /// # Returns
    ///
    /// One value per column. Values are rounded against
    /// [`SOLUTION_ROUNDING_THRESHOLD`]. An error means no optimal solution
    /// was proven.
    fn solve(&self, checks: &BitMatrix, logical: &BitSlice<u64, Lsb0>) -> Result<Vec<f64>, String>;
}

/// Minimum-weight representative found for one logical index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinWeightLogical {
    pub index: usize,
    pub weight: usize,
    /// Support as sorted lattice labels.
    pub support: Vec<usize>,
}

/// Result of [`compute_distance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistanceReport {
    pub kind: StabilizerKind,
    /// Minimum over all logicals; zero when the code encodes nothing.
    pub distance: usize,
    /// One entry per logical index, in index order.
    pub logicals: Vec<MinWeightLogical>,
}

impl DistanceReport {
    /// The lightest logical, ties broken by the lowest index.
    pub fn lightest(&self) -> Option<&MinWeightLogical> {
        self.logicals.iter().min_by_key(|l| (l.weight, l.index))
    }
}

/// Checks and dual logicals for a distance of the given Pauli type.
fn problem(code: &CssCode, kind: StabilizerKind) -> (&BitMatrix, &BitMatrix) {
    match kind {
        StabilizerKind::Z => (code.hx(), code.lx()),
        StabilizerKind::X => (code.hz(), code.lz()),
    }
}

fn solve_one(
    code: &CssCode,
    kind: StabilizerKind,
    index: usize,
    solver: &dyn DistanceSolver,
) -> Result<MinWeightLogical, QecError> {
    let (checks, duals) = problem(code, kind);
    let dual = duals.row(index);
    let fail = |reason: String| QecError::Solver {
        logical: index,
        reason,
    };

    let values = solver.solve(checks, dual).map_err(fail)?;
    if values.len() != code.n() {
        return Err(fail(format!(
            "solution has {} entries for {} qubits",
            values.len(),
            code.n()
        )));
    }
    let mut x: BitRow = gf2::zero_row(code.n());
    for (j, &v) in values.iter().enumerate() {
        x.set(j, v > SOLUTION_ROUNDING_THRESHOLD);
    }
    if checks.syndrome(&x).any() || !gf2::dot(&x, dual) {
        return Err(fail("rounded solution violates the constraints".to_string()));
    }

    let weight = x.count_ones();
    debug!(?kind, index, weight, "solved logical");
    Ok(MinWeightLogical {
        index,
        weight,
        support: code.labels_of(x.iter_ones()),
    })
}

/// Computes the X or Z distance of a code.
///
/// Every logical index is solved in parallel and the minimum is taken over
/// the per-index results. A code with `k = 0` reports distance zero
/// without invoking the solver.
///
/// # Arguments
///
/// * `code` - The CSS code
/// * `kind` - Pauli type of the logicals to minimize
/// * `solver` - Minimum-weight backend
///
/// # Returns
///
/// The report, or the first solver failure by logical index.
pub fn compute_distance(
    code: &CssCode,
    kind: StabilizerKind,
    solver: &dyn DistanceSolver,
) -> Result<DistanceReport, QecError> {
    let k = code.k();
    if k == 0 {
        info!(?kind, "code encodes no logical qubits, distance is 0");
        return Ok(DistanceReport {
            kind,
            distance: 0,
            logicals: Vec::new(),
        });
    }

    let logicals = (0..k)
        .into_par_iter()
        .map(|i| solve_one(code, kind, i, solver))
        .collect::<Result<Vec<_>, _>>()?;
    let distance = logicals.iter().map(|l| l.weight).min().unwrap_or(0);
    info!(?kind, n = code.n(), k, distance, "distance computed");

    Ok(DistanceReport {
        kind,
        distance,
        logicals,
    })
}

/// Minimum-weight Z logical for one randomly chosen logical index.
///
/// Returns `None` when the code encodes nothing.
pub fn random_z_logical<R: Rng + ?Sized>(
    code: &CssCode,
    rng: &mut R,
    solver: &dyn DistanceSolver,
) -> Result<Option<MinWeightLogical>, QecError> {
    if code.k() == 0 {
        return Ok(None);
    }
    let index = rng.gen_range(0..code.k());
    solve_one(code, StabilizerKind::Z, index, solver).map(Some)
}

/// Bounded brute-force search in order of increasing weight.
///
/// Exact for any code whose distance does not exceed `max_weight`. The cost
/// grows as `n choose max_weight`, so this is only practical for small codes.
#[derive(Debug, Clone, Copy)]
pub struct ExhaustiveSolver {
    pub max_weight: usize,
}

impl ExhaustiveSolver {
    pub const fn new(max_weight: usize) -> Self {
        Self { max_weight }
    }
}

impl DistanceSolver for ExhaustiveSolver {
    fn solve(&self, checks: &BitMatrix, logical: &BitSlice<u64, Lsb0>) -> Result<Vec<f64>, String> {
        let n = checks.num_cols();
        let mut candidate = gf2::zero_row(n);
        for w in 1..=self.max_weight.min(n) {
            let mut idx: Vec<usize> = (0..w).collect();
            loop {
                candidate.fill(false);
                for &j in &idx {
                    candidate.set(j, true);
                }
                if gf2::dot(&candidate, logical) && !checks.syndrome(&candidate).any() {
                    return Ok(candidate.iter().map(|b| if *b { 1.0 } else { 0.0 }).collect());
                }
                if !next_combination(&mut idx, n) {
                    break;
                }
            }
        }
        Err(format!("no logical of weight <= {}", self.max_weight))
    }
}

/// Advances `idx` to the next `k`-subset of `0..n` in lexicographic order.
fn next_combination(idx: &mut [usize], n: usize) -> bool {
    let k = idx.len();
    let mut i = k;
    while i > 0 {
        i -= 1;
        if idx[i] < n - k + i {
            idx[i] += 1;
            for j in i + 1..k {
                idx[j] = idx[j - 1] + 1;
            }
            return true;
        }
    }
    false
}
