//! Composite scorer: one 0–100 investment score from five KPIs.
//!
//! Each KPI is first mapped onto [0, 100]:
//!   rule_of_40          clip to [0, rule_of_40_max]
//!   traction_index      clip to [0, traction_max]
//!   capital_efficiency  clip to [0, capital_efficiency_max], then rescale
//!   burn_multiple       lower is better: floor, invert, min-max over
//!                       [burn_inverse_min, burn_inverse_max]
//!   runway_months       clip to [0, runway_max_months], then rescale
//!
//! The score is the weighted sum of the five normalized values, rounded to
//! two decimals. Weights are normalized to sum to 1 at construction, so
//! the score is always in [0, 100]. Every mapping is non-decreasing in
//! its KPI (non-increasing for burn multiple), so the score is monotonic
//! in each input.

use crate::{
    config::{NormalizationBounds, ScopeConfig, ScoreWeights},
    error::ScopeResult,
};
use serde::{Deserialize, Serialize};

/// The five KPI values the score is built from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreInputs {
    pub rule_of_40:         f64,
    pub traction_index:     f64,
    pub capital_efficiency: f64,
    pub burn_multiple:      f64,
    pub runway_months:      f64,
}

/// The same five KPIs after normalization to [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub rule_of_40:         f64,
    pub traction_index:     f64,
    pub capital_efficiency: f64,
    pub burn_multiple:      f64,
    pub runway_months:      f64,
}

impl ScoreComponents {
    pub fn as_array(&self) -> [f64; 5] {
        [
            self.rule_of_40,
            self.traction_index,
            self.capital_efficiency,
            self.burn_multiple,
            self.runway_months,
        ]
    }
}

#[derive(Debug, Clone)]
pub struct CompositeScorer {
    weights: ScoreWeights,
    bounds:  NormalizationBounds,
}

impl CompositeScorer {
    /// Build a scorer. Weights not summing to 1 are rescaled so they do.
    /// Bounds that would make a clip panic are rejected here.
    pub fn new(weights: ScoreWeights, bounds: NormalizationBounds) -> ScopeResult<Self> {
        bounds.validate()?;
        let normalised = weights.normalised()?;
        if (weights.sum() - 1.0).abs() > 1e-9 {
            log::warn!(
                "score weights sum to {:.4}; rescaled to 1.0",
                weights.sum()
            );
        }
        Ok(Self { weights: normalised, bounds })
    }

    pub fn from_config(config: &ScopeConfig) -> ScopeResult<Self> {
        Self::new(config.weights, config.normalization)
    }

    /// The effective (normalized) weights.
    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    pub fn normalize(&self, inputs: &ScoreInputs) -> ScoreComponents {
        let b = &self.bounds;

        let inverted_burn = 1.0 / inputs.burn_multiple.max(b.burn_multiple_floor);

        ScoreComponents {
            rule_of_40: normalize_to_100(
                inputs.rule_of_40.clamp(0.0, b.rule_of_40_max),
                0.0,
                b.rule_of_40_max,
            ),
            traction_index: normalize_to_100(
                inputs.traction_index.clamp(0.0, b.traction_max),
                0.0,
                b.traction_max,
            ),
            capital_efficiency: normalize_to_100(
                inputs.capital_efficiency.clamp(0.0, b.capital_efficiency_max),
                0.0,
                b.capital_efficiency_max,
            ),
            burn_multiple: normalize_to_100(inverted_burn, b.burn_inverse_min, b.burn_inverse_max),
            runway_months: normalize_to_100(
                inputs.runway_months.clamp(0.0, b.runway_max_months),
                0.0,
                b.runway_max_months,
            ),
        }
    }

    pub fn score(&self, inputs: &ScoreInputs) -> f64 {
        let components = self.normalize(inputs).as_array();
        let weights = self.weights.as_array();
        let raw: f64 = components
            .iter()
            .zip(weights.iter())
            .map(|(c, w)| c * w)
            .sum();
        round2(raw.clamp(0.0, 100.0))
    }
}

/// Min-max map `value` from [min, max] onto [0, 100], clipped.
/// A degenerate range maps everything to 50.
pub fn normalize_to_100(value: f64, min: f64, max: f64) -> f64 {
    if max == min {
        return 50.0;
    }
    ((value - min) / (max - min) * 100.0).clamp(0.0, 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
