//! Scoring configuration.
//!
//! One `ScopeConfig` is built at startup (from `data/` or from
//! `default_test()`) and passed by reference to every stage of the
//! pipeline. Nothing reads process-wide state.

use crate::{
    benchmarks::BenchmarkTables,
    error::{ScopeError, ScopeResult},
    types::Year,
};
use chrono::Datelike;
use serde::{Deserialize, Serialize};

// ── KPI derivation ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KpiParams {
    /// Share of total funding assumed still in the bank.
    pub cash_fraction: f64,
    /// Capital efficiency at which the Rule-of-40 adjustment is zero.
    pub capital_efficiency_baseline: f64,
    /// Rule-of-40 points per unit of capital efficiency above baseline.
    pub rule_of_40_slope: f64,
    pub rule_of_40_min: f64,
    pub rule_of_40_max: f64,
    /// Floor applied to company age (years) before it divides traction.
    pub age_floor_years: f64,
    /// Floor applied to monetary denominators (burn, revenue).
    pub ratio_epsilon: f64,
    pub traction_scaling: TractionScaling,
}

impl Default for KpiParams {
    fn default() -> Self {
        Self {
            cash_fraction: 0.5,
            capital_efficiency_baseline: 0.30,
            rule_of_40_slope: 50.0,
            rule_of_40_min: 0.0,
            rule_of_40_max: 150.0,
            age_floor_years: 1.0,
            ratio_epsilon: 1e-9,
            traction_scaling: TractionScaling::Population,
        }
    }
}

impl KpiParams {
    /// Reject parameter sets that would panic or produce NaN mid-run.
    pub fn validate(&self) -> ScopeResult<()> {
        require_finite("kpi.capital_efficiency_baseline", self.capital_efficiency_baseline)?;
        require_finite("kpi.rule_of_40_slope", self.rule_of_40_slope)?;
        if !(self.cash_fraction > 0.0 && self.cash_fraction <= 1.0) {
            return Err(ScopeError::invalid_config(
                "kpi.cash_fraction",
                format!("must be in (0, 1], got {}", self.cash_fraction),
            ));
        }
        require_range("kpi.rule_of_40", self.rule_of_40_min, self.rule_of_40_max)?;
        require_positive("kpi.age_floor_years", self.age_floor_years)?;
        require_positive("kpi.ratio_epsilon", self.ratio_epsilon)?;
        self.traction_scaling.validate()
    }
}

/// How raw traction is mapped onto [0, 100].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TractionScaling {
    /// Min-max fitted over the surviving population of one run.
    /// The resulting traction index depends on every other record.
    Population,
    /// Fixed bounds; traction becomes a pure function of one record.
    Fixed { min: f64, max: f64 },
}

impl TractionScaling {
    pub fn validate(&self) -> ScopeResult<()> {
        match *self {
            Self::Population => Ok(()),
            Self::Fixed { min, max } => require_range("kpi.traction_scaling", min, max),
        }
    }
}

// ── Composite score ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoreWeights {
    pub rule_of_40:         f64,
    pub traction_index:     f64,
    pub capital_efficiency: f64,
    pub burn_multiple:      f64,
    pub runway_months:      f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            rule_of_40:         0.25,
            traction_index:     0.25,
            capital_efficiency: 0.20,
            burn_multiple:      0.15,
            runway_months:      0.15,
        }
    }
}

impl ScoreWeights {
    pub fn as_array(&self) -> [f64; 5] {
        [
            self.rule_of_40,
            self.traction_index,
            self.capital_efficiency,
            self.burn_multiple,
            self.runway_months,
        ]
    }

    pub fn sum(&self) -> f64 {
        self.as_array().iter().sum()
    }

    /// Every weight finite and non-negative, and at least one positive.
    pub fn validate(&self) -> ScopeResult<()> {
        if let Some(w) = self.as_array().iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(ScopeError::InvalidWeights {
                reason: format!("weight {w} is negative or not finite"),
            });
        }
        if self.sum() <= 0.0 {
            return Err(ScopeError::InvalidWeights {
                reason: "weights sum to zero".into(),
            });
        }
        Ok(())
    }

    /// A copy rescaled to sum to exactly 1.
    pub fn normalised(&self) -> ScopeResult<Self> {
        self.validate()?;
        let sum = self.sum();
        Ok(Self {
            rule_of_40:         self.rule_of_40 / sum,
            traction_index:     self.traction_index / sum,
            capital_efficiency: self.capital_efficiency / sum,
            burn_multiple:      self.burn_multiple / sum,
            runway_months:      self.runway_months / sum,
        })
    }
}

/// Clipping and rescaling applied to each KPI before weighting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NormalizationBounds {
    pub rule_of_40_max:         f64,
    pub traction_max:           f64,
    /// Capital efficiency above this maps to 100.
    pub capital_efficiency_max: f64,
    /// Burn multiple is floored here before inversion.
    pub burn_multiple_floor:    f64,
    pub burn_inverse_min:       f64,
    pub burn_inverse_max:       f64,
    pub runway_max_months:      f64,
}

impl Default for NormalizationBounds {
    fn default() -> Self {
        Self {
            rule_of_40_max:         100.0,
            traction_max:           100.0,
            capital_efficiency_max: 1.0,
            burn_multiple_floor:    0.1,
            burn_inverse_min:       0.1,
            burn_inverse_max:       3.0,
            runway_max_months:      24.0,
        }
    }
}

impl NormalizationBounds {
    /// Every clip ceiling positive, the burn window non-empty.
    pub fn validate(&self) -> ScopeResult<()> {
        require_positive("normalization.rule_of_40_max", self.rule_of_40_max)?;
        require_positive("normalization.traction_max", self.traction_max)?;
        require_positive("normalization.capital_efficiency_max", self.capital_efficiency_max)?;
        require_positive("normalization.runway_max_months", self.runway_max_months)?;
        require_positive("normalization.burn_multiple_floor", self.burn_multiple_floor)?;
        require_range("normalization.burn_inverse", self.burn_inverse_min, self.burn_inverse_max)
    }
}

fn require_finite(field: &'static str, value: f64) -> ScopeResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ScopeError::invalid_config(field, format!("must be finite, got {value}")))
    }
}

fn require_positive(field: &'static str, value: f64) -> ScopeResult<()> {
    require_finite(field, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ScopeError::invalid_config(field, format!("must be > 0, got {value}")))
    }
}

fn require_range(field: &'static str, min: f64, max: f64) -> ScopeResult<()> {
    require_finite(field, min)?;
    require_finite(field, max)?;
    if min < max {
        Ok(())
    } else {
        Err(ScopeError::invalid_config(field, format!("min {min} must be below max {max}")))
    }
}

// ── Classifier and ingestion ───────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    pub n_estimators:      usize,
    pub max_depth:         usize,
    /// A node smaller than this is never split.
    pub min_samples_split: usize,
    pub min_samples_leaf:  usize,
    pub bootstrap:         bool,
    pub seed:              u64,
    pub test_fraction:     f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            n_estimators:      100,
            max_depth:         10,
            min_samples_split: 20,
            min_samples_leaf:  10,
            bootstrap:         true,
            seed:              42,
            test_fraction:     0.20,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct IngestConfig {
    /// Additional funding threshold on top of the `> 0` rule. 0 disables it.
    #[serde(default)]
    pub min_funding: f64,
}

// ── Aggregate ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
struct ScoringFile {
    /// Absent means "the current calendar year".
    #[serde(default)]
    observation_year: Option<Year>,
    #[serde(default)]
    kpi: KpiParams,
    #[serde(default)]
    weights: ScoreWeights,
    #[serde(default)]
    normalization: NormalizationBounds,
    #[serde(default)]
    model: ModelConfig,
    #[serde(default)]
    ingest: IngestConfig,
}

impl Default for ScoringFile {
    fn default() -> Self {
        Self {
            observation_year: Some(2025),
            kpi: KpiParams::default(),
            weights: ScoreWeights::default(),
            normalization: NormalizationBounds::default(),
            model: ModelConfig::default(),
            ingest: IngestConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScopeConfig {
    /// Year company age is measured against.
    pub observation_year: Year,
    pub kpi:              KpiParams,
    pub weights:          ScoreWeights,
    pub normalization:    NormalizationBounds,
    pub benchmarks:       BenchmarkTables,
    pub model:            ModelConfig,
    pub ingest:           IngestConfig,
}

impl ScopeConfig {
    /// Load from the data/ directory.
    /// In tests, use ScopeConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/scoring/scoring_config.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let file: ScoringFile = serde_json::from_str(&content)?;

        let benchmarks = BenchmarkTables::load(data_dir)?;
        let observation_year = file.observation_year.unwrap_or_else(|| {
            let year = chrono::Utc::now().year();
            log::warn!("{path}: no observation_year, using current year {year}");
            year
        });

        let config = Self {
            observation_year,
            kpi:              file.kpi,
            weights:          file.weights,
            normalization:    file.normalization,
            benchmarks,
            model:            file.model,
            ingest:           file.ingest,
        };
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("{path}: {e}"))?;
        Ok(config)
    }

    /// Check every numeric parameter the scoring path divides by or
    /// clamps with. Benchmark tables are checked separately.
    pub fn validate(&self) -> ScopeResult<()> {
        self.kpi.validate()?;
        self.weights.validate()?;
        self.normalization.validate()
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        let file = ScoringFile::default();
        Self {
            observation_year: file.observation_year.unwrap_or(2025),
            kpi:              file.kpi,
            weights:          file.weights,
            normalization:    file.normalization,
            benchmarks:       BenchmarkTables::standard(),
            model: ModelConfig {
                n_estimators: 25,
                ..file.model
            },
            ingest:           file.ingest,
        }
    }
}
