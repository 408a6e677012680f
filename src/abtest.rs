//! A/B test management: deterministic assignment, conversion counters, and
//! significance analysis.
//!
//! Each named test holds an ordered variant list, a traffic allocation
//! summing to 100, and per-variant running counters. Assignment is **not**
//! uniform-random: it is a consistent, repeatable mapping from
//! `(customer, test)` pairs to variants via [`percentile_bucket`] — the same
//! customer always lands in the same variant for a given test, which is the
//! entire point.
//!
//! Counters are atomic so the read/record paths take `&self`: a manager
//! shared across request handlers can assign and record conversions
//! concurrently without external locking. Structural changes (`setup`,
//! `set_status`) still require `&mut self`.
//!
//! There are no fatal conditions here. Unknown tests or variants surface as
//! `bool`/`Option` returns and `fallback_used` markers, never as panics or
//! propagated errors.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::bucket::percentile_bucket;
use crate::stat::{chi_squared_2x2, chi_squared_p_value, wilson_bounds};
use crate::weights::rescale_allocation;
use crate::WeightMap;

/// Variant name returned when assignment is asked about an unknown test.
pub const DEFAULT_VARIANT: &str = "control";

/// Significance level gating the analyzer's recommendation.
pub const SIGNIFICANCE_ALPHA: f64 = 0.05;

/// Z-score for the analyzer's 95% Wilson intervals.
const WILSON_Z: f64 = 1.96;

/// Lifecycle status of a test. Tests are created `Active`; the other states
/// are set externally via [`AbTestManager::set_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TestStatus {
    Active,
    Paused,
    Completed,
}

/// One configuration under test: a name plus the weight set it ships.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Variant {
    pub name: String,
    pub weights: WeightMap,
}

#[derive(Debug, Default)]
struct VariantCounters {
    total: AtomicU64,
    conversions: AtomicU64,
}

#[derive(Debug)]
struct AbTest {
    variants: Vec<Variant>,
    /// Effective allocation, rescaled to sum exactly 100.
    allocation: Vec<f64>,
    status: TestStatus,
    counters: Vec<VariantCounters>,
}

/// Explain-style assignment output.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AssignmentDecision {
    /// The assigned variant name (or [`DEFAULT_VARIANT`] on fallback).
    pub variant: String,
    /// The percentile bucket in `[0, 100)` the customer hashed to.
    pub bucket: u32,
    /// True when the test was unknown and a default pseudo-test was
    /// synthesized; nothing is recorded in that case.
    pub fallback_used: bool,
}

/// Per-variant analysis row.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VariantAnalysis {
    pub name: String,
    /// Assignments observed.
    pub total: u64,
    /// Conversions recorded.
    pub conversions: u64,
    /// `conversions / total`, `0.0` at zero total.
    pub conversion_rate: f64,
    /// 95% Wilson interval lower bound for the conversion rate.
    pub wilson_lo: f64,
    /// 95% Wilson interval upper bound for the conversion rate.
    pub wilson_hi: f64,
}

/// Output of [`AbTestManager::analyze`].
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AbTestAnalysis {
    pub test: String,
    pub status: TestStatus,
    /// Per-variant rows, in configured order.
    pub variants: Vec<VariantAnalysis>,
    /// The first-configured variant.
    pub control: String,
    /// Highest conversion rate; first-configured wins ties.
    pub best: String,
    /// Chi-squared statistic between control and best (2×2), when the test
    /// has more than one variant.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub chi_squared: Option<f64>,
    /// Approximate p-value for `chi_squared` (df=1). Closed-form
    /// approximation; trust ~2–3 significant digits.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub p_value: Option<f64>,
    /// `p_value < 0.05`.
    pub significant: bool,
    /// The best performer when significant, otherwise the control.
    pub recommendation: String,
}

/// A compact, log-ready row for one variant of an analyzed test.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VariantLogRow {
    pub test: String,
    pub variant: String,
    pub conversion_rate: f64,
    pub total: u64,
    pub conversions: u64,
    pub recommended: bool,
}

/// Extract log-ready rows from an analysis, sorted by conversion rate
/// (descending, stable name tie-break).
pub fn log_variant_rows(analysis: &AbTestAnalysis) -> Vec<VariantLogRow> {
    let mut rows: Vec<VariantLogRow> = analysis
        .variants
        .iter()
        .map(|v| VariantLogRow {
            test: analysis.test.clone(),
            variant: v.name.clone(),
            conversion_rate: v.conversion_rate,
            total: v.total,
            conversions: v.conversions,
            recommended: v.name == analysis.recommendation,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.conversion_rate
            .total_cmp(&a.conversion_rate)
            .then_with(|| a.variant.cmp(&b.variant))
    });
    rows
}

/// Owns all test state for one scoring context.
///
/// Constructor-injected by design: there is no process-wide singleton, and a
/// manager's state lives exactly as long as its owner.
#[derive(Debug, Default)]
pub struct AbTestManager {
    tests: BTreeMap<String, AbTest>,
}

impl AbTestManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or replace) a test.
    ///
    /// - Requires at least one variant; returns `false` otherwise.
    /// - `allocation` is rescaled to sum exactly 100; equal split when
    ///   omitted, mis-sized, or degenerate.
    /// - Last write wins on an existing name: the previous test and its
    ///   counters are discarded.
    pub fn setup(&mut self, name: &str, variants: Vec<Variant>, allocation: Option<&[f64]>) -> bool {
        if variants.is_empty() {
            return false;
        }
        let allocation = rescale_allocation(allocation, variants.len());
        let counters = (0..variants.len())
            .map(|_| VariantCounters::default())
            .collect();
        self.tests.insert(
            name.to_string(),
            AbTest {
                variants,
                allocation,
                status: TestStatus::Active,
                counters,
            },
        );
        true
    }

    /// Names of configured tests, in stable order.
    pub fn test_names(&self) -> Vec<String> {
        self.tests.keys().cloned().collect()
    }

    /// Status of a test, if it exists.
    pub fn status(&self, test: &str) -> Option<TestStatus> {
        self.tests.get(test).map(|t| t.status)
    }

    /// Set the lifecycle status of a test. `false` for unknown tests.
    pub fn set_status(&mut self, test: &str, status: TestStatus) -> bool {
        match self.tests.get_mut(test) {
            Some(t) => {
                t.status = status;
                true
            }
            None => false,
        }
    }

    /// The effective (rescaled) allocation of a test.
    pub fn allocation(&self, test: &str) -> Option<&[f64]> {
        self.tests.get(test).map(|t| t.allocation.as_slice())
    }

    /// Deterministically assign a customer to a variant and count it.
    pub fn assign(&self, test: &str, customer_id: &str) -> String {
        self.assign_explain(test, customer_id).variant
    }

    /// Like [`assign`](Self::assign), with bucket and fallback metadata.
    ///
    /// The customer's percentile bucket is walked against the cumulative
    /// allocation in variant order; the first variant whose cumulative share
    /// exceeds the bucket wins and its `total` counter is incremented. A
    /// bucket past the cumulative 100 (float dust only, given rescaling)
    /// falls back to variant 0. An unknown test synthesizes a default
    /// pseudo-test and records nothing.
    pub fn assign_explain(&self, test: &str, customer_id: &str) -> AssignmentDecision {
        let bucket = percentile_bucket(customer_id, test);
        let Some(t) = self.tests.get(test) else {
            return AssignmentDecision {
                variant: DEFAULT_VARIANT.to_string(),
                bucket,
                fallback_used: true,
            };
        };

        let mut idx = 0usize;
        let mut matched = false;
        let mut cumulative = 0.0_f64;
        for (i, share) in t.allocation.iter().enumerate() {
            cumulative += share;
            if (bucket as f64) < cumulative {
                idx = i;
                matched = true;
                break;
            }
        }
        if !matched {
            idx = 0;
        }

        t.counters[idx].total.fetch_add(1, Ordering::Relaxed);
        AssignmentDecision {
            variant: t.variants[idx].name.clone(),
            bucket,
            fallback_used: false,
        }
    }

    /// Record a conversion outcome for a variant.
    ///
    /// Returns `false` when the test or variant is unknown; never panics.
    /// `converted = false` is still a successful record (it simply does not
    /// move the conversion counter — totals are owned by assignment).
    pub fn record_conversion(&self, test: &str, variant: &str, converted: bool) -> bool {
        let Some(t) = self.tests.get(test) else {
            return false;
        };
        let Some(i) = t.variants.iter().position(|v| v.name == variant) else {
            return false;
        };
        if converted {
            t.counters[i].conversions.fetch_add(1, Ordering::Relaxed);
        }
        true
    }

    /// Analyze a test: per-variant rates with 95% Wilson intervals, plus a
    /// control-vs-best chi-squared significance readout.
    ///
    /// `None` for unknown tests. With a single variant there is nothing to
    /// compare: `chi_squared`/`p_value` stay `None` and the recommendation is
    /// the control.
    pub fn analyze(&self, test: &str) -> Option<AbTestAnalysis> {
        let t = self.tests.get(test)?;

        let mut variants = Vec::with_capacity(t.variants.len());
        for (v, c) in t.variants.iter().zip(t.counters.iter()) {
            let total = c.total.load(Ordering::Relaxed);
            let conversions = c.conversions.load(Ordering::Relaxed).min(total);
            let conversion_rate = if total == 0 {
                0.0
            } else {
                conversions as f64 / total as f64
            };
            let (wilson_lo, wilson_hi, _) = wilson_bounds(conversions, total, WILSON_Z);
            variants.push(VariantAnalysis {
                name: v.name.clone(),
                total,
                conversions,
                conversion_rate,
                wilson_lo,
                wilson_hi,
            });
        }

        // Control is the first-configured variant; best is the highest rate,
        // first-configured on ties (strict comparison keeps the first).
        let control = variants[0].name.clone();
        let mut best_idx = 0usize;
        for (i, row) in variants.iter().enumerate() {
            if row.conversion_rate > variants[best_idx].conversion_rate {
                best_idx = i;
            }
        }
        let best = variants[best_idx].name.clone();

        let (chi_squared, p_value) = if variants.len() > 1 {
            let ctrl = &variants[0];
            let top = &variants[best_idx];
            let chi2 = chi_squared_2x2(ctrl.conversions, ctrl.total, top.conversions, top.total);
            (Some(chi2), Some(chi_squared_p_value(chi2, 1)))
        } else {
            (None, None)
        };

        let significant = p_value.map(|p| p < SIGNIFICANCE_ALPHA).unwrap_or(false);
        let recommendation = if significant {
            best.clone()
        } else {
            control.clone()
        };

        Some(AbTestAnalysis {
            test: test.to_string(),
            status: t.status,
            variants,
            control,
            best,
            chi_squared,
            p_value,
            significant,
            recommendation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn variants(names: &[&str]) -> Vec<Variant> {
        names
            .iter()
            .map(|n| Variant {
                name: n.to_string(),
                weights: WeightMap::new(),
            })
            .collect()
    }

    #[test]
    fn setup_requires_at_least_one_variant() {
        let mut mgr = AbTestManager::new();
        assert!(!mgr.setup("t", Vec::new(), None));
        assert!(mgr.setup("t", variants(&["A"]), None));
        assert_eq!(mgr.status("t"), Some(TestStatus::Active));
    }

    #[test]
    fn setup_rescales_allocation_to_100() {
        let mut mgr = AbTestManager::new();
        assert!(mgr.setup("t", variants(&["A", "B", "C"]), Some(&[30.0, 30.0, 30.0])));
        let alloc = mgr.allocation("t").unwrap();
        let sum: f64 = alloc.iter().sum();
        assert!((sum - 100.0).abs() < 1e-6, "sum={sum}");
        assert!((alloc[0] - 100.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn setup_is_last_write_wins() {
        let mut mgr = AbTestManager::new();
        assert!(mgr.setup("t", variants(&["A", "B"]), None));
        for i in 0..10 {
            mgr.assign("t", &format!("cust_{i}"));
        }
        // Replacing the test discards the old counters.
        assert!(mgr.setup("t", variants(&["A", "B"]), None));
        let total: u64 = mgr.analyze("t").unwrap().variants.iter().map(|v| v.total).sum();
        assert_eq!(total, 0);
    }

    #[test]
    fn assignment_is_deterministic() {
        let mut mgr = AbTestManager::new();
        assert!(mgr.setup("t", variants(&["A", "B"]), None));
        let first = mgr.assign("t", "cust_1");
        let second = mgr.assign("t", "cust_1");
        assert_eq!(first, second);

        let d = mgr.assign_explain("t", "cust_1");
        assert_eq!(d.variant, first);
        assert!(d.bucket < 100);
        assert!(!d.fallback_used);
    }

    #[test]
    fn assignment_counts_totals() {
        let mut mgr = AbTestManager::new();
        assert!(mgr.setup("t", variants(&["A", "B"]), None));
        for i in 0..500 {
            mgr.assign("t", &format!("cust_{i}"));
        }
        let a = mgr.analyze("t").unwrap();
        let total: u64 = a.variants.iter().map(|v| v.total).sum();
        assert_eq!(total, 500);
    }

    #[test]
    fn unknown_test_falls_back_to_default_variant() {
        let mgr = AbTestManager::new();
        let d = mgr.assign_explain("missing", "cust_1");
        assert_eq!(d.variant, DEFAULT_VARIANT);
        assert!(d.fallback_used);
    }

    #[test]
    fn record_conversion_on_unknown_test_or_variant_is_false() {
        let mut mgr = AbTestManager::new();
        assert!(!mgr.record_conversion("unknown_test", "A", true));
        assert!(mgr.setup("t", variants(&["A"]), None));
        assert!(!mgr.record_conversion("t", "Z", true));
        assert!(mgr.record_conversion("t", "A", true));
        // A non-converted record succeeds without moving the counter.
        assert!(mgr.record_conversion("t", "A", false));
        let a = mgr.analyze("t").unwrap();
        assert_eq!(a.variants[0].conversions, 1);
    }

    #[test]
    fn skewed_allocation_respects_shares() {
        let mut mgr = AbTestManager::new();
        assert!(mgr.setup("t", variants(&["A", "B"]), Some(&[90.0, 10.0])));
        for i in 0..10_000 {
            mgr.assign("t", &format!("cust_{i}"));
        }
        let a = mgr.analyze("t").unwrap();
        let share_a = a.variants[0].total as f64 / 10_000.0;
        assert!((share_a - 0.9).abs() < 0.05, "share_a={share_a}");
    }

    #[test]
    fn set_status_transitions_are_visible_in_analysis() {
        let mut mgr = AbTestManager::new();
        assert!(mgr.setup("t", variants(&["A"]), None));
        assert!(mgr.set_status("t", TestStatus::Paused));
        assert_eq!(mgr.analyze("t").unwrap().status, TestStatus::Paused);
        assert!(!mgr.set_status("missing", TestStatus::Completed));
    }

    #[test]
    fn analyze_single_variant_has_no_comparison() {
        let mut mgr = AbTestManager::new();
        assert!(mgr.setup("t", variants(&["A"]), None));
        let a = mgr.analyze("t").unwrap();
        assert_eq!(a.chi_squared, None);
        assert_eq!(a.p_value, None);
        assert!(!a.significant);
        assert_eq!(a.recommendation, "A");
        assert_eq!(mgr.analyze("missing").map(|a| a.test), None);
    }

    #[test]
    fn log_rows_sort_by_rate_and_mark_the_recommendation() {
        let mut mgr = AbTestManager::new();
        assert!(mgr.setup("t", variants(&["A", "B"]), None));
        for i in 0..2000 {
            let id = format!("cust_{i}");
            let v = mgr.assign("t", &id);
            // B converts far more often than A.
            let converted = if v == "B" { i % 2 == 0 } else { i % 20 == 0 };
            assert!(mgr.record_conversion("t", &v, converted));
        }
        let a = mgr.analyze("t").unwrap();
        let rows = log_variant_rows(&a);
        assert_eq!(rows.len(), 2);
        assert!(rows[0].conversion_rate >= rows[1].conversion_rate);
        assert_eq!(rows[0].variant, "B");
        assert!(rows.iter().any(|r| r.recommended));
    }

    proptest! {
        #[test]
        fn assign_always_returns_a_configured_variant(
            id in ".{0,24}",
            alloc in proptest::collection::vec(0.0f64..100.0, 3),
        ) {
            let mut mgr = AbTestManager::new();
            prop_assert!(mgr.setup("t", variants(&["A", "B", "C"]), Some(&alloc)));
            let v = mgr.assign("t", &id);
            prop_assert!(["A", "B", "C"].contains(&v.as_str()), "v={}", v);
        }
    }
}
