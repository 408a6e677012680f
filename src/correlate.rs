//! Correlation engine: Pearson correlation and feature-importance derivation.
//!
//! These are deterministic utilities for measuring how strongly each feature
//! tracks an outcome column, feeding the weight normalizer. Downstream only
//! needs relative strength, so [`feature_correlations`] discards sign and
//! keeps magnitudes.

use std::collections::{BTreeMap, BTreeSet};

use crate::weights::normalize_percent;
use crate::FeatureRecord;

/// Pearson correlation coefficient between two equal-length sequences.
///
/// Uses population (not sample) variance/covariance, computed as a single
/// mean pass followed by a residual pass. The population normalization
/// cancels in the ratio, so residual sums are used directly.
///
/// Returns `0.0` when:
/// - the lengths differ or `n < 2`, or
/// - either input has exactly zero variance (constant input) — a fixed policy
///   to avoid division by zero, not a mathematical default, or
/// - the result is non-finite (e.g. NaN contamination).
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.len() < 2 {
        return 0.0;
    }
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (&xi, &yi) in x.iter().zip(y.iter()) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return 0.0;
    }

    let r = cov / (var_x * var_y).sqrt();
    if r.is_finite() {
        r
    } else {
        0.0
    }
}

/// Per-feature correlation **magnitude** against `target`, over all records
/// where both the feature and the target are present.
///
/// Features with fewer than 2 paired observations are skipped (Pearson is
/// undefined there). The target column itself is not reported as a feature.
pub fn feature_correlations(records: &[FeatureRecord], target: &str) -> BTreeMap<String, f64> {
    let mut names: BTreeSet<&str> = BTreeSet::new();
    for r in records {
        for k in r.keys() {
            if k != target {
                names.insert(k.as_str());
            }
        }
    }

    let mut out = BTreeMap::new();
    for name in names {
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for r in records {
            if let (Some(&x), Some(&y)) = (r.get(name), r.get(target)) {
                xs.push(x);
                ys.push(y);
            }
        }
        if xs.len() < 2 {
            continue;
        }
        out.insert(name.to_string(), pearson(&xs, &ys).abs());
    }
    out
}

/// The weight-optimizer pipeline: correlation magnitudes against `target`,
/// normalized into integer percentage weights summing to 100.
///
/// Returns `None` when no feature carries signal (every correlation is zero,
/// or no feature has enough paired observations) — callers must guard rather
/// than receive a silently redistributed allocation.
pub fn optimize_weights(
    records: &[FeatureRecord],
    target: &str,
) -> Option<BTreeMap<String, u32>> {
    normalize_percent(&feature_correlations(records, target))
}
