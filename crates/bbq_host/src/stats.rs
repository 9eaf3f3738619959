//! Dropout statistics over repeated defect draws.
//!
//! Accumulates, per trial, the fraction of long-range couplers a defect
//! pattern removes, the per-type tag counts, and whether the resulting
//! pattern could be scheduled. Partial tallies from parallel workers are
//! combined with [`DefectStats::merge`].

const BUCKETS: usize = 10;

/// Running tally over defect trials.
///
/// Fractions are bucketed in tenths; a fraction of exactly one lands in the
/// last bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct DefectStats {
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    pub count: u64,
    pub x_defective: u64,
    pub z_defective: u64,
    pub unroutable: u64,
    pub buckets: [u64; BUCKETS],
}

impl Default for DefectStats {
    fn default() -> Self {
        Self::new()
    }
}

impl DefectStats {
    /// Creates an empty tally; `min` starts at 1 so the first trial replaces it.
    pub fn new() -> Self {
        Self {
            min: 1.0,
            max: 0.0,
            sum: 0.0,
            count: 0,
            x_defective: 0,
            z_defective: 0,
            unroutable: 0,
            buckets: [0; BUCKETS],
        }
    }

    /// Records one trial.
    ///
    /// # Arguments
    ///
    /// * `fraction` - Dropped couplers over all long-range couplers
    /// * `x_defective` - X stabilizers carrying a defect tag
    /// * `z_defective` - Z stabilizers carrying a defect tag
    /// * `routed` - Whether scheduling and verification succeeded
    pub fn update(&mut self, fraction: f64, x_defective: usize, z_defective: usize, routed: bool) {
        self.min = self.min.min(fraction);
        self.max = self.max.max(fraction);
        self.sum += fraction;
        self.count += 1;
        self.x_defective += x_defective as u64;
        self.z_defective += z_defective as u64;
        if !routed {
            self.unroutable += 1;
        }
        let idx = ((fraction * BUCKETS as f64) as usize).min(BUCKETS - 1);
        self.buckets[idx] += 1;
    }

    /// Combines two partial tallies.
    pub fn merge(mut self, other: Self) -> Self {
        if other.count == 0 {
            return self;
        }
        if self.count == 0 {
            return other;
        }
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.sum += other.sum;
        self.count += other.count;
        self.x_defective += other.x_defective;
        self.z_defective += other.z_defective;
        self.unroutable += other.unroutable;
        for (a, b) in self.buckets.iter_mut().zip(other.buckets) {
            *a += b;
        }
        self
    }

    /// Mean dropped fraction, or 0.0 before any trial.
    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    pub fn print_report(&self) {
        println!("\nCoupler Dropout");
        println!("Trials:     {}", self.count);
        if self.count == 0 {
            return;
        }
        println!("Min:        {:.4}", self.min);
        println!("Avg:        {:.4}", self.avg());
        println!("Max:        {:.4}", self.max);
        println!(
            "Defective:  {:.2} X, {:.2} Z per trial",
            self.x_defective as f64 / self.count as f64,
            self.z_defective as f64 / self.count as f64
        );
        println!("Unroutable: {}", self.unroutable);

        println!("Distribution (dropped fraction):");
        for (i, &count) in self.buckets.iter().enumerate() {
            if count > 0 {
                println!("[{:.1}-{:.1}]: {}", i as f64 / 10.0, (i + 1) as f64 / 10.0, count);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_tracks_extremes_and_buckets() {
        let mut s = DefectStats::new();
        s.update(0.25, 3, 5, true);
        s.update(1.0, 10, 10, false);
        assert_eq!(s.count, 2);
        assert_eq!(s.min, 0.25);
        assert_eq!(s.max, 1.0);
        assert_eq!(s.buckets[2], 1);
        assert_eq!(s.buckets[9], 1);
        assert_eq!(s.unroutable, 1);
        assert_eq!(s.avg(), 0.625);
    }

    #[test]
    fn merge_is_order_free() {
        let mut a = DefectStats::new();
        a.update(0.1, 1, 2, true);
        let mut b = DefectStats::new();
        b.update(0.3, 2, 1, true);
        b.update(0.5, 0, 4, true);
        let ab = a.clone().merge(b.clone());
        let ba = b.merge(a);
        assert_eq!(ab, ba);
        assert_eq!(ab.count, 3);
        assert_eq!(ab.z_defective, 7);
        assert_eq!(DefectStats::new().merge(ab.clone()), ab);
    }
}
