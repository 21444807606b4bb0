//! KPI calculator: derives the financial ratio vector for one company.
//!
//! Formulas (per record, given the stage benchmark `b`):
//!   estimated_revenue    = funding × b.revenue_multiple
//!   capital_efficiency   = estimated_revenue / funding   (= b.revenue_multiple)
//!   monthly_burn         = funding / b.burn_period_months
//!   estimated_cash       = cash_fraction × funding
//!   runway_months        = estimated_cash / monthly_burn
//!   burn_multiple        = (monthly_burn × 12) / estimated_revenue
//!   traction_index_raw   = log10(funding) × investors × b.stage_weight / age
//!   rule_of_40_estimated = clip(b.rule_of_40 + (capital_efficiency − baseline) × slope, min, max)
//!
//! RULES:
//!   - Every denominator is floored: `max(denominator, floor)`. Monetary
//!     denominators use `ratio_epsilon`, age uses `age_floor_years`.
//!     There is no "undefined" sentinel anywhere.
//!   - Precondition: funding > 0 (the ingestion filter guarantees it).
//!     `derive` still rejects a non-positive amount with a Validation
//!     error instead of taking log10(0).
//!   - `derive` is pure: no I/O, no hidden state. Identical inputs give
//!     bit-identical outputs.
//!   - Traction rescaling is the one non-pure step. Under
//!     `TractionScaling::Population` the scale is fitted over every
//!     surviving record of the run, so a record's traction index (and its
//!     investment score) depends on the rest of the batch.

use crate::{
    benchmarks::BenchmarkTables,
    config::{KpiParams, ScopeConfig, TractionScaling},
    error::{ScopeError, ScopeResult},
    imputation::ImputedRecord,
    scoring::{CompositeScorer, ScoreInputs},
    stage::Stage,
    types::Year,
};
use serde::{Deserialize, Serialize};

const MONTHS_PER_YEAR: f64 = 12.0;

/// KPIs that depend on one record only (everything but the rescaled
/// traction index and the composite score).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseKpis {
    pub stage:                Stage,
    pub age_years:            f64,
    pub estimated_revenue:    f64,
    pub capital_efficiency:   f64,
    pub monthly_burn:         f64,
    pub estimated_cash:       f64,
    pub runway_months:        f64,
    pub burn_multiple:        f64,
    pub traction_index_raw:   f64,
    pub rule_of_40_estimated: f64,
}

/// The full derived vector for one company. Never mutated once produced;
/// regenerate it from the source record instead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KpiRecord {
    pub age_years:            f64,
    pub estimated_revenue:    f64,
    pub capital_efficiency:   f64,
    pub monthly_burn:         f64,
    pub estimated_cash:       f64,
    pub runway_months:        f64,
    pub burn_multiple:        f64,
    pub traction_index_raw:   f64,
    pub traction_index:       f64,
    pub rule_of_40_estimated: f64,
    pub investment_score:     f64,
}

impl KpiRecord {
    pub fn score_inputs(&self) -> ScoreInputs {
        ScoreInputs {
            rule_of_40:         self.rule_of_40_estimated,
            traction_index:     self.traction_index,
            capital_efficiency: self.capital_efficiency,
            burn_multiple:      self.burn_multiple,
            runway_months:      self.runway_months,
        }
    }
}

// ── Traction rescaling ───────────────────────────────────────────────────────

/// Min-max mapping of raw traction onto [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TractionScale {
    pub min: f64,
    pub max: f64,
}

impl TractionScale {
    pub fn fixed(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Fit over a population of raw values. Non-finite values are ignored.
    /// An empty population yields a degenerate scale (everything maps to 50).
    pub fn fit(raw_values: &[f64]) -> Self {
        let mut finite = raw_values.iter().copied().filter(|v| v.is_finite());
        let Some(first) = finite.next() else {
            return Self { min: 0.0, max: 0.0 };
        };
        let (min, max) = finite.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        Self { min, max }
    }

    pub fn for_population(scaling: TractionScaling, raw_values: &[f64]) -> Self {
        match scaling {
            TractionScaling::Population => Self::fit(raw_values),
            TractionScaling::Fixed { min, max } => Self::fixed(min, max),
        }
    }

    pub fn apply(&self, raw: f64) -> f64 {
        if self.max == self.min {
            return 50.0;
        }
        ((raw - self.min) / (self.max - self.min) * 100.0).clamp(0.0, 100.0)
    }
}

// ── Calculator ───────────────────────────────────────────────────────────────

pub struct KpiCalculator<'a> {
    benchmarks:       &'a BenchmarkTables,
    params:           &'a KpiParams,
    observation_year: Year,
}

impl<'a> KpiCalculator<'a> {
    pub fn new(config: &'a ScopeConfig) -> Self {
        Self::with_parts(&config.benchmarks, &config.kpi, config.observation_year)
    }

    pub fn with_parts(
        benchmarks: &'a BenchmarkTables,
        params: &'a KpiParams,
        observation_year: Year,
    ) -> Self {
        Self { benchmarks, params, observation_year }
    }

    pub fn benchmark_version(&self) -> &str {
        &self.benchmarks.version
    }

    /// Derive every single-record KPI.
    ///
    /// Errors:
    ///   - Validation: stage absent or unrecognized, funding absent or
    ///     not > 0, founding year absent or not positive.
    ///   - Configuration: the stage has no entry in a benchmark table.
    pub fn derive(&self, imputed: &ImputedRecord) -> ScopeResult<BaseKpis> {
        let record = imputed.record();
        let id = record.entity_id.as_str();

        let stage = match record.stage.as_deref().map(str::trim) {
            None | Some("") => return Err(ScopeError::validation(id, "stage is missing")),
            Some(raw) => Stage::parse(raw).ok_or_else(|| {
                ScopeError::validation(id, format!("unrecognized stage '{raw}'"))
            })?,
        };

        let funding = match record.funding_amount {
            None => return Err(ScopeError::validation(id, "funding_amount is missing")),
            Some(f) if !f.is_finite() || f <= 0.0 => {
                return Err(ScopeError::validation(
                    id,
                    format!("funding_amount must be > 0, got {f}"),
                ))
            }
            Some(f) => f,
        };

        let founded = match record.founded_year {
            None => return Err(ScopeError::validation(id, "founded_year is missing")),
            Some(y) if y <= 0 => {
                return Err(ScopeError::validation(id, format!("founded_year {y} out of domain")))
            }
            Some(y) => y,
        };

        let bench = self.benchmarks.lookup(stage)?;
        let p = self.params;

        // Founded after the observation year: clip to age 0, then the floor applies.
        let age_years = f64::from(self.observation_year - founded).max(0.0);

        let estimated_revenue = funding * bench.revenue_multiple;
        // Revenue is estimated from the stage multiple, so revenue / funding
        // reduces to the multiple. Taken directly to keep it bit-exact.
        let capital_efficiency = bench.revenue_multiple;
        let monthly_burn = funding / bench.burn_period_months.max(p.ratio_epsilon);
        let estimated_cash = p.cash_fraction * funding;
        let runway_months = estimated_cash / monthly_burn.max(p.ratio_epsilon);
        let burn_multiple =
            (monthly_burn * MONTHS_PER_YEAR) / estimated_revenue.max(p.ratio_epsilon);

        let traction_index_raw = funding.log10()
            * f64::from(imputed.investors_count())
            * bench.stage_weight
            / age_years.max(p.age_floor_years);

        let rule_of_40_estimated = (bench.rule_of_40_benchmark
            + (capital_efficiency - p.capital_efficiency_baseline) * p.rule_of_40_slope)
            .clamp(p.rule_of_40_min, p.rule_of_40_max);

        Ok(BaseKpis {
            stage,
            age_years,
            estimated_revenue,
            capital_efficiency,
            monthly_burn,
            estimated_cash,
            runway_months,
            burn_multiple,
            traction_index_raw,
            rule_of_40_estimated,
        })
    }

    /// Rescale traction and attach the composite score.
    pub fn complete(
        &self,
        base: &BaseKpis,
        scale: &TractionScale,
        scorer: &CompositeScorer,
    ) -> KpiRecord {
        let traction_index = scale.apply(base.traction_index_raw);
        let investment_score = scorer.score(&ScoreInputs {
            rule_of_40:         base.rule_of_40_estimated,
            traction_index,
            capital_efficiency: base.capital_efficiency,
            burn_multiple:      base.burn_multiple,
            runway_months:      base.runway_months,
        });

        KpiRecord {
            age_years:            base.age_years,
            estimated_revenue:    base.estimated_revenue,
            capital_efficiency:   base.capital_efficiency,
            monthly_burn:         base.monthly_burn,
            estimated_cash:       base.estimated_cash,
            runway_months:        base.runway_months,
            burn_multiple:        base.burn_multiple,
            traction_index_raw:   base.traction_index_raw,
            traction_index,
            rule_of_40_estimated: base.rule_of_40_estimated,
            investment_score,
        }
    }
}
