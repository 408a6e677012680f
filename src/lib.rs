//! `scorecard`: deterministic customer-health scoring and A/B experimentation primitives.
//!
//! Designed for “scorecard” problems: you have a set of named numeric signals
//! (features) describing customers, and you repeatedly need to (a) turn observed
//! feature/outcome data into an importance allocation, (b) collapse a customer's
//! features into a single health score, and (c) test competing weight sets
//! against each other on live traffic and read the result.
//!
//! The pipeline, leaves first:
//!
//! - [`pearson`] / [`feature_correlations`]: per-feature correlation strength
//!   against an outcome column.
//! - [`normalize_percent`]: raw importance scores → integer percentage weights
//!   summing to exactly 100.
//! - [`health_score`] / [`score_customer`]: weighted `[0,100]` aggregate of a
//!   customer's features under a [`WeightMap`], with lower-is-better inversion.
//! - [`AbTestManager`]: deterministic hash-bucketed variant assignment,
//!   conversion counters, and Wilson/chi-squared significance analysis.
//!
//! **Goals:**
//! - **Deterministic by default**: same inputs → same weights, same score, same
//!   variant. Assignment is a repeatable mapping from `(customer, test)` pairs,
//!   not a random draw — the same customer always lands in the same variant of
//!   a given test.
//! - **Fail soft**: no operation in this crate raises for bad runtime data.
//!   Scoring falls back to the `50.0` “unknown” default, assignment on an
//!   unknown test falls back to a synthesized default variant, and conversion
//!   recording reports success as a `bool`. Degenerate statistics (zero
//!   variance, zero totals, empty margins) produce fixed neutral values.
//! - **Small K**: designed for a handful of features and 2–10 variants per
//!   test; not a full experimentation platform (no storage, no offline
//!   evaluation pipelines, no dashboards).
//!
//! The significance arithmetic ([`wilson_bounds`], [`chi_squared_p_value`]) is
//! intentionally closed-form and approximate (Wilson 1927 intervals; a
//! polynomial normal CDF behind the chi-squared p-value). Expect agreement
//! with a real statistics library to ~2–3 significant digits, which is enough
//! to gate a ship/hold recommendation at `p < 0.05`. For a reproducible
//! Bayesian readout alongside it, enable the `stochastic` feature and see
//! `prob_beats_control`.
//!
//! # Example
//!
//! ```rust
//! use scorecard::{AbTestManager, Variant, WeightMap};
//!
//! let mut mgr = AbTestManager::new();
//! let variants = vec![
//!     Variant { name: "A".to_string(), weights: WeightMap::new() },
//!     Variant { name: "B".to_string(), weights: WeightMap::new() },
//! ];
//! assert!(mgr.setup("onboarding", variants, None));
//!
//! // Deterministic: the same customer always gets the same variant.
//! let v1 = mgr.assign("onboarding", "cust_42");
//! let v2 = mgr.assign("onboarding", "cust_42");
//! assert_eq!(v1, v2);
//!
//! assert!(mgr.record_conversion("onboarding", &v1, true));
//! let analysis = mgr.analyze("onboarding").unwrap();
//! assert_eq!(analysis.control, "A");
//! ```

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

/// A customer's named numeric signals, plus (optionally) an outcome column.
///
/// Ephemeral: built per scoring/optimization call and owned by the caller.
/// Values fed to the scorer are assumed pre-normalized to `[0, 1]`; the crate
/// performs no bounds clamping on them.
pub type FeatureRecord = BTreeMap<String, f64>;

/// Feature name → non-negative importance weight.
///
/// Producers keep one of two conventions: integer weights summing to 100
/// (see [`normalize_percent`]) or fractional weights summing to 1.0. The
/// scorer divides by the total weight, so either convention works unchanged.
pub type WeightMap = BTreeMap<String, f64>;

mod correlate;
pub use correlate::*;

mod weights;
pub use weights::*;

mod score;
pub use score::*;

mod bucket;
pub use bucket::*;

mod stat;
pub use stat::*;

mod abtest;
pub use abtest::*;

#[cfg(feature = "stochastic")]
mod posterior;
#[cfg(feature = "stochastic")]
pub use posterior::*;

pub const SCORECARD_VERSION: &str = env!("CARGO_PKG_VERSION");
