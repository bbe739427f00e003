use crate::config::capacity_tolerance::{CROSS_GB_ABS, GB_FLOOR, GB_RATIO, TB_ABS};
use crate::patterns::CapacityPatterns;

/// Every capacity number stated in a title, in order of appearance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stated {
    pub tbs: Vec<f64>,
    pub gbs: Vec<u32>,
}

pub fn scan(patterns: &CapacityPatterns, title: &str) -> Stated {
    let tbs = patterns
        .tb
        .captures_iter(title)
        .filter_map(|c| c[1].parse::<f64>().ok())
        .collect();
    let gbs = patterns
        .gb
        .captures_iter(title)
        .filter_map(|c| c[1].parse::<u32>().ok())
        .collect();
    Stated { tbs, gbs }
}

impl Stated {
    pub fn is_empty(&self) -> bool {
        self.tbs.is_empty() && self.gbs.is_empty()
    }

    /// Distinct TB values, compared at 3 decimals, ascending.
    pub fn distinct_tbs(&self) -> Vec<f64> {
        distinct(self.tbs.iter().copied())
    }

    pub fn distinct_gbs(&self) -> Vec<u32> {
        let mut v = self.gbs.clone();
        v.sort_unstable();
        v.dedup();
        v
    }

    /// Solid-state reading: `(capacity_gb, capacity_tb)`.
    ///
    /// The first TB value is primary and also fixes the GB value (×1024).
    /// Without one, the largest GB value is used.
    pub fn solid_state(&self) -> (Option<u32>, Option<f64>) {
        match self.tbs.first() {
            Some(&tb) => (Some((tb * 1024.0).round() as u32), Some(tb)),
            None => (self.gbs.iter().max().copied(), None),
        }
    }

    /// Rotating reading: smallest distinct TB value, else smallest GB value in TB.
    /// Also returns the distinct candidates the primary was picked from.
    pub fn rotating(&self) -> (Option<f64>, Vec<f64>) {
        let tbs = self.distinct_tbs();
        if !tbs.is_empty() {
            return (tbs.first().copied(), tbs);
        }
        let gbs: Vec<f64> = self.distinct_gbs().into_iter().map(|g| f64::from(g) / 1024.0).collect();
        (gbs.first().copied(), gbs)
    }
}

fn distinct(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut keyed: Vec<i64> = values.map(|v| (v * 1000.0).round() as i64).collect();
    keyed.sort_unstable();
    keyed.dedup();
    keyed.into_iter().map(|k| k as f64 / 1000.0).collect()
}

/// TB target against a listing's capacity.
///
/// A TB-stated listing must be within [`TB_ABS`]. A GB-only listing must be
/// within [`CROSS_GB_ABS`] of either the ×1024 or the ×1000 reading of the target.
pub fn matches_tb(target_tb: f64, cap_gb: Option<u32>, cap_tb: Option<f64>) -> bool {
    match (cap_tb, cap_gb) {
        (Some(tb), _) => (tb - target_tb).abs() <= TB_ABS,
        (None, Some(gb)) => {
            let gb = i64::from(gb);
            let binary = (target_tb * 1024.0).round() as i64;
            let decimal = (target_tb * 1000.0).round() as i64;
            (gb - binary).abs() <= CROSS_GB_ABS || (gb - decimal).abs() <= CROSS_GB_ABS
        }
        (None, None) => false,
    }
}

/// GB target against a GB capacity: within `max(GB_FLOOR, trunc(target × GB_RATIO))`.
pub fn matches_gb(target_gb: u32, cap_gb: Option<u32>) -> bool {
    let Some(gb) = cap_gb else {
        return false;
    };
    let band = GB_FLOOR.max((f64::from(target_gb) * GB_RATIO) as i64);
    (i64::from(gb) - i64::from(target_gb)).abs() <= band
}
