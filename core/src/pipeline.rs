//! The scoring pipeline: raw company table in, scored and ranked table out.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Missing-value policy   (per record)
//!   2. KPI derivation         (per record, pure)
//!   3. Traction scale fit     (once, over every surviving record)
//!   4. Traction rescale + composite score (per record)
//!
//! RULES:
//!   - Input is expected to be ingestion-filtered already (companies with
//!     funding > 0). Anything that still fails validation is excluded and
//!     counted, never defaulted.
//!   - A record's failure never aborts the batch. The one exception is a
//!     configuration error hitting every record: the tables cannot score
//!     this snapshot at all, so the run fails.
//!   - Output order is input order. Ranking is a separate, explicit step.

use crate::{
    config::ScopeConfig,
    error::{ScopeError, ScopeResult},
    imputation::MissingValuePolicy,
    kpi::{BaseKpis, KpiCalculator, KpiRecord, TractionScale},
    record::EntityRecord,
    scoring::CompositeScorer,
    stage::Stage,
    types::{EntityId, RunId, Year},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Output types ─────────────────────────────────────────────────────────────

/// One row of the scoring output table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub run_id:            RunId,
    pub benchmark_version: String,
    pub entity_id:         EntityId,
    pub company:           String,
    pub stage:             Stage,
    pub sector:            Option<String>,
    pub country:           Option<String>,
    pub status:            Option<String>,
    pub funding_amount:    f64,
    pub investors_count:   u32,
    pub investors_imputed: bool,
    pub founded_year:      Year,
    pub kpis:              KpiRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionKind {
    Validation,
    Configuration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exclusion {
    pub entity_id: EntityId,
    pub kind:      ExclusionKind,
    pub reason:    String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExclusionReport {
    pub exclusions: Vec<Exclusion>,
}

impl ExclusionReport {
    pub fn total(&self) -> usize {
        self.exclusions.len()
    }

    pub fn count(&self, kind: ExclusionKind) -> usize {
        self.exclusions.iter().filter(|e| e.kind == kind).count()
    }

    pub fn by_kind(&self) -> BTreeMap<ExclusionKind, usize> {
        let mut counts = BTreeMap::new();
        for e in &self.exclusions {
            *counts.entry(e.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Counts per reason text. Reasons carry the offending value, so this
    /// groups identical failures (e.g. every "unrecognized stage 'Grant'").
    pub fn by_reason(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for e in &self.exclusions {
            *counts.entry(e.reason.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

#[derive(Debug, Clone)]
pub struct ScoringRun {
    pub run_id:            RunId,
    pub benchmark_version: String,
    pub traction_scale:    TractionScale,
    pub scored:            Vec<ScoredRecord>,
    pub exclusions:        ExclusionReport,
    /// Records whose investors_count was filled by the policy in this run.
    pub investors_imputed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRecord {
    pub rank:   usize,
    pub record: ScoredRecord,
}

// ── Pipeline ─────────────────────────────────────────────────────────────────

pub struct ScoringPipeline<'a> {
    policy:     MissingValuePolicy,
    calculator: KpiCalculator<'a>,
    scorer:     CompositeScorer,
    config:     &'a ScopeConfig,
}

/// A record that survived steps 1–2.
struct Derived<'r> {
    source:            &'r EntityRecord,
    investors_count:   u32,
    investors_imputed: bool,
    founded_year:      Year,
    base:              BaseKpis,
}

impl<'a> ScoringPipeline<'a> {
    /// Build a pipeline. Fails if the benchmark tables, weights or any
    /// numeric parameter are unusable; that is a startup error, not a
    /// per-record one.
    pub fn new(config: &'a ScopeConfig) -> ScopeResult<Self> {
        config.benchmarks.validate()?;
        config.validate()?;
        Ok(Self {
            policy:     MissingValuePolicy::default(),
            calculator: KpiCalculator::new(config),
            scorer:     CompositeScorer::from_config(config)?,
            config,
        })
    }

    pub fn scorer(&self) -> &CompositeScorer {
        &self.scorer
    }

    /// Score a batch under a fresh run id.
    pub fn run(&self, records: &[EntityRecord]) -> ScopeResult<ScoringRun> {
        self.run_with_id(uuid::Uuid::new_v4().to_string(), records)
    }

    /// Score a batch under a caller-chosen run id. Same id + same input
    /// gives an identical run.
    pub fn run_with_id(&self, run_id: RunId, records: &[EntityRecord]) -> ScopeResult<ScoringRun> {
        let version = self.calculator.benchmark_version().to_string();
        let mut exclusions = ExclusionReport::default();
        let mut derived = Vec::with_capacity(records.len());
        let mut first_config_error = None;

        // 1–2. Impute, then derive.
        for record in records {
            match self.derive(record) {
                Ok(d) => derived.push(d),
                Err(err) => {
                    let (kind, reason) = match &err {
                        ScopeError::Configuration { .. } => {
                            (ExclusionKind::Configuration, err.to_string())
                        }
                        ScopeError::Validation { reason, .. } => {
                            (ExclusionKind::Validation, reason.clone())
                        }
                        other => (ExclusionKind::Validation, other.to_string()),
                    };
                    log::debug!("run={run_id} exclude {}: {err}", record.entity_id);
                    exclusions.exclusions.push(Exclusion {
                        entity_id: record.entity_id.clone(),
                        kind,
                        reason,
                    });
                    if kind == ExclusionKind::Configuration && first_config_error.is_none() {
                        first_config_error = Some(err);
                    }
                }
            }
        }

        if !records.is_empty() && exclusions.count(ExclusionKind::Configuration) == records.len() {
            if let Some(err) = first_config_error {
                log::warn!("run={run_id} every record hit a benchmark configuration error");
                return Err(err);
            }
        }

        // 3. Fit the traction scale over the survivors.
        let raw: Vec<f64> = derived.iter().map(|d| d.base.traction_index_raw).collect();
        let traction_scale = TractionScale::for_population(self.config.kpi.traction_scaling, &raw);

        // 4. Rescale and score.
        let scored: Vec<ScoredRecord> = derived
            .iter()
            .map(|d| self.finish(&run_id, &version, d, &traction_scale))
            .collect();

        let investors_imputed = derived.iter().filter(|d| d.investors_imputed).count();

        for (kind, count) in exclusions.by_kind() {
            log::warn!("run={run_id} excluded {count} record(s): {kind:?}");
        }
        log::info!(
            "run={run_id} benchmarks={version} scored {} of {} record(s), traction scale [{:.3}, {:.3}]",
            scored.len(),
            records.len(),
            traction_scale.min,
            traction_scale.max
        );

        Ok(ScoringRun {
            run_id,
            benchmark_version: version,
            traction_scale,
            scored,
            exclusions,
            investors_imputed,
        })
    }

    /// Score one record against an already-fitted traction scale, so the
    /// result is comparable to the batch that produced the scale.
    pub fn score_one(
        &self,
        run_id: &str,
        record: &EntityRecord,
        scale: &TractionScale,
    ) -> ScopeResult<ScoredRecord> {
        let derived = self.derive(record)?;
        Ok(self.finish(run_id, self.calculator.benchmark_version(), &derived, scale))
    }

    fn derive<'r>(&self, record: &'r EntityRecord) -> ScopeResult<Derived<'r>> {
        let imputed = self.policy.apply(record);
        let base = self.calculator.derive(&imputed)?;
        Ok(Derived {
            source:            record,
            investors_count:   imputed.investors_count(),
            investors_imputed: imputed.investors_imputed(),
            // derive() has already rejected a missing founding year.
            founded_year:      record.founded_year.unwrap_or_default(),
            base,
        })
    }

    fn finish(
        &self,
        run_id: &str,
        version: &str,
        d: &Derived<'_>,
        scale: &TractionScale,
    ) -> ScoredRecord {
        let kpis = self.calculator.complete(&d.base, scale, &self.scorer);
        ScoredRecord {
            run_id:            run_id.to_string(),
            benchmark_version: version.to_string(),
            entity_id:         d.source.entity_id.clone(),
            company:           d.source.company.clone(),
            stage:             d.base.stage,
            sector:            d.source.sector.clone(),
            country:           d.source.country.clone(),
            status:            d.source.status.clone(),
            funding_amount:    d.source.funding_amount.unwrap_or_default(),
            investors_count:   d.investors_count,
            investors_imputed: d.investors_imputed,
            founded_year:      d.founded_year,
            kpis,
        }
    }
}

// ── Ranking ──────────────────────────────────────────────────────────────────

/// Sort by investment score, highest first, and assign 1-based ranks.
/// Ties are broken by entity id so the order is reproducible.
pub fn rank(scored: &[ScoredRecord]) -> Vec<RankedRecord> {
    let mut sorted: Vec<&ScoredRecord> = scored.iter().collect();
    sorted.sort_by(|a, b| {
        b.kpis
            .investment_score
            .total_cmp(&a.kpis.investment_score)
            .then_with(|| a.entity_id.cmp(&b.entity_id))
    });
    sorted
        .into_iter()
        .enumerate()
        .map(|(i, record)| RankedRecord {
            rank:   i + 1,
            record: record.clone(),
        })
        .collect()
}

pub fn top_n(ranked: &[RankedRecord], n: usize) -> &[RankedRecord] {
    &ranked[..n.min(ranked.len())]
}
