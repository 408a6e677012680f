//! Weight allocation helpers (percentage normalization, traffic rescaling).
//!
//! These are deterministic utilities for turning raw importance scores into a
//! percentage allocation in a stable (reproducible) way. `BTreeMap` iteration
//! order (lexicographic by feature name) is the crate's canonical feature
//! order; all tie-breaks below resolve to the first feature in that order.

use std::collections::BTreeMap;

use crate::WeightMap;

/// Normalize a map of raw importance scores into integer weights summing to
/// exactly 100.
///
/// Algorithm:
/// 1. Sanitize: non-finite or negative scores are treated as 0.
/// 2. Divide each score by the total to get a fractional share.
/// 3. Round each share × 100 to the nearest integer.
/// 4. Add the entire rounding residual (100 − Σ rounded) to the single
///    highest-weight feature, first in iteration order on ties.
///
/// Returns `None` when the sanitized total is zero or non-finite — callers
/// must guard; the allocation is never silently redistributed.
///
/// The residual policy is compatibility-driven: giving all slack to the
/// current maximum can shift that feature by a few points versus a
/// largest-remainder scheme. Callers who prefer fairer remainder distribution
/// should renormalize downstream rather than change this function.
pub fn normalize_percent(raw: &BTreeMap<String, f64>) -> Option<BTreeMap<String, u32>> {
    if raw.is_empty() {
        return None;
    }
    let sanitized: Vec<(&String, f64)> = raw
        .iter()
        .map(|(k, &v)| (k, if v.is_finite() && v > 0.0 { v } else { 0.0 }))
        .collect();
    let total: f64 = sanitized.iter().map(|(_, v)| v).sum();
    if !(total.is_finite() && total > 0.0) {
        return None;
    }

    let mut rounded: BTreeMap<String, i64> = BTreeMap::new();
    let mut sum_rounded: i64 = 0;
    for (k, v) in &sanitized {
        let w = (v / total * 100.0).round() as i64;
        sum_rounded += w;
        rounded.insert((*k).clone(), w);
    }

    let residual = 100 - sum_rounded;
    if residual != 0 {
        let mut max_key: Option<String> = None;
        let mut max_w = i64::MIN;
        for (k, &w) in &rounded {
            if w > max_w {
                max_w = w;
                max_key = Some(k.clone());
            }
        }
        if let Some(k) = max_key {
            if let Some(w) = rounded.get_mut(&k) {
                // Floor at 0: with very many features a negative residual can
                // exceed the maximum weight; the sum-100 invariant yields to
                // non-negativity there.
                *w = (*w + residual).max(0);
            }
        }
    }

    Some(
        rounded
            .into_iter()
            .map(|(k, w)| (k, w.max(0) as u32))
            .collect(),
    )
}

/// Rescale a variant traffic allocation so it sums to exactly 100 (within
/// floating tolerance), regardless of the input sum.
///
/// Falls back to an equal split across `n` variants when the allocation is
/// absent, has the wrong length, or has a non-positive sanitized total.
/// Non-finite or negative entries are treated as 0 before rescaling.
pub fn rescale_allocation(alloc: Option<&[f64]>, n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    let equal = || vec![100.0 / n as f64; n];
    let Some(a) = alloc else {
        return equal();
    };
    if a.len() != n {
        return equal();
    }
    let sanitized: Vec<f64> = a
        .iter()
        .map(|&v| if v.is_finite() && v > 0.0 { v } else { 0.0 })
        .collect();
    let total: f64 = sanitized.iter().sum();
    if !(total.is_finite() && total > 0.0) {
        return equal();
    }
    sanitized.into_iter().map(|v| v / total * 100.0).collect()
}

/// Glue: integer percentage weights → a fractional-friendly [`WeightMap`].
///
/// The scorer divides by the total weight, so the integer values pass through
/// unchanged; this exists purely to bridge the map value types.
pub fn percent_to_weight_map(percent: &BTreeMap<String, u32>) -> WeightMap {
    percent
        .iter()
        .map(|(k, &w)| (k.clone(), w as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn m(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn residual_goes_to_the_single_highest_weight() {
        // Shares: 1/3 each → 33 + 33 + 33 = 99, residual 1 goes to the first
        // max in iteration order ("a").
        let w = normalize_percent(&m(&[("a", 1.0), ("b", 1.0), ("c", 1.0)])).unwrap();
        assert_eq!(w["a"], 34);
        assert_eq!(w["b"], 33);
        assert_eq!(w["c"], 33);
    }

    #[test]
    fn zero_total_is_none() {
        assert_eq!(normalize_percent(&m(&[("a", 0.0), ("b", 0.0)])), None);
        assert_eq!(normalize_percent(&BTreeMap::new()), None);
        assert_eq!(normalize_percent(&m(&[("a", f64::NAN)])), None);
    }

    #[test]
    fn single_feature_takes_everything() {
        let w = normalize_percent(&m(&[("only", 0.42)])).unwrap();
        assert_eq!(w["only"], 100);
    }

    #[test]
    fn rescale_normalizes_any_positive_sum_to_100() {
        let a = rescale_allocation(Some(&[30.0, 30.0, 30.0]), 3);
        let sum: f64 = a.iter().sum();
        assert!((sum - 100.0).abs() < 1e-6, "sum={sum}");
        for &v in &a {
            assert!((v - 100.0 / 3.0).abs() < 1e-6);
        }
    }

    #[test]
    fn rescale_falls_back_to_equal_split() {
        assert_eq!(rescale_allocation(None, 2), vec![50.0, 50.0]);
        assert_eq!(rescale_allocation(Some(&[100.0]), 2), vec![50.0, 50.0]);
        assert_eq!(rescale_allocation(Some(&[0.0, 0.0]), 2), vec![50.0, 50.0]);
        assert!(rescale_allocation(Some(&[]), 0).is_empty());
    }

    proptest! {
        #[test]
        fn normalized_weights_sum_to_exactly_100(
            kvs in proptest::collection::btree_map("[a-z]{1,8}", 0.0f64..1.0e6, 1..12),
            // Guarantee at least one strictly positive score.
            anchor in 1.0e-3f64..1.0e6,
        ) {
            let mut raw = kvs;
            raw.insert("anchor".to_string(), anchor);
            let w = normalize_percent(&raw).unwrap();
            prop_assert_eq!(w.len(), raw.len());
            let sum: u64 = w.values().map(|&x| x as u64).sum();
            prop_assert_eq!(sum, 100);
        }

        #[test]
        fn rescaled_allocation_sums_to_100(
            alloc in proptest::collection::vec(0.0f64..1.0e4, 1..8),
        ) {
            let n = alloc.len();
            let out = rescale_allocation(Some(&alloc), n);
            prop_assert_eq!(out.len(), n);
            let sum: f64 = out.iter().sum();
            prop_assert!((sum - 100.0).abs() < 1e-6, "sum={}", sum);
            for &v in &out {
                prop_assert!(v >= 0.0);
            }
        }
    }
}
