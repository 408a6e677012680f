//! Health score calculator: weighted feature aggregation with fail-soft defaults.
//!
//! The score is a weighted mean over the features present in both the record
//! and the weight map, scaled to `[0, 100]`. Features whose names match a
//! lower-is-better marker are inverted (`1 - value`) before weighting; values
//! are assumed pre-normalized to `[0, 1]` by the caller and are not clamped.
//!
//! There is no error path: any degenerate input (no overlapping features,
//! zero total weight, NaN contamination) yields the fixed “unknown” score of
//! `50.0` rather than propagating a failure.

use crate::{FeatureRecord, WeightMap};

/// The fixed fallback returned when a score cannot be computed.
pub const UNKNOWN_SCORE: f64 = 50.0;

/// Scoring configuration.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoreConfig {
    /// Lower-is-better marker tokens, matched case-insensitively as
    /// substrings of feature names. A matching feature's value is inverted
    /// as `1 - value` before weighting.
    pub inverted_markers: Vec<String>,
    /// Scores at or above this threshold yield a positive retention
    /// prediction in [`score_customer`].
    pub prediction_threshold: f64,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            inverted_markers: vec![
                "churnProbability".to_string(),
                "daysSinceLastLogin".to_string(),
                "supportTickets".to_string(),
            ],
            prediction_threshold: 50.0,
        }
    }
}

impl ScoreConfig {
    /// Whether `feature` matches one of the lower-is-better markers.
    pub fn is_inverted(&self, feature: &str) -> bool {
        let name = feature.to_lowercase();
        self.inverted_markers
            .iter()
            .any(|m| name.contains(&m.to_lowercase()))
    }
}

/// Result of scoring one customer. Immutable after construction.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoringResult {
    /// Caller-supplied customer identifier.
    pub customer_id: String,
    /// Health score in `[0, 100]` (given `[0, 1]` inputs).
    pub score: f64,
    /// Binary retention prediction: `score >= prediction_threshold`.
    pub prediction: bool,
    /// Human-readable summary of what drove the score.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub explanation: Option<String>,
}

/// Compute a health score in `[0, 100]` for `record` under `weights`.
///
/// Only features present in both maps contribute. Returns
/// `100 * Σ(value_i * weight_i) / Σ(weight_i)` when the accumulated weight is
/// positive; otherwise [`UNKNOWN_SCORE`]. A non-finite result (NaN/inf
/// contamination) also yields [`UNKNOWN_SCORE`].
pub fn health_score(record: &FeatureRecord, weights: &WeightMap, cfg: &ScoreConfig) -> f64 {
    let mut acc = 0.0_f64;
    let mut total_weight = 0.0_f64;
    for (name, &w) in weights {
        let Some(&raw) = record.get(name) else {
            continue;
        };
        let value = if cfg.is_inverted(name) { 1.0 - raw } else { raw };
        acc += value * w;
        total_weight += w;
    }
    if total_weight > 0.0 {
        let s = 100.0 * (acc / total_weight);
        if s.is_finite() {
            s
        } else {
            UNKNOWN_SCORE
        }
    } else {
        UNKNOWN_SCORE
    }
}

/// Score one customer and wrap the result with a prediction and explanation.
pub fn score_customer(
    customer_id: &str,
    record: &FeatureRecord,
    weights: &WeightMap,
    cfg: &ScoreConfig,
) -> ScoringResult {
    let score = health_score(record, weights, cfg);

    let mut used: Vec<(&String, f64)> = weights
        .iter()
        .filter(|(name, _)| record.contains_key(*name))
        .map(|(name, &w)| (name, w))
        .collect();
    used.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let explanation = if used.is_empty() {
        Some(format!(
            "no weighted features present; defaulted to {UNKNOWN_SCORE}"
        ))
    } else {
        let top: Vec<String> = used
            .iter()
            .take(3)
            .map(|(name, w)| format!("{name} (w={w:.0})"))
            .collect();
        Some(format!(
            "{} weighted feature(s); top: {}",
            used.len(),
            top.join(", ")
        ))
    };

    ScoringResult {
        customer_id: customer_id.to_string(),
        score,
        prediction: score >= cfg.prediction_threshold,
        explanation,
    }
}
