//! Stage benchmark tables.
//!
//! Four static lookups keyed by `Stage`:
//!   1. revenue multiple         (estimated revenue per dollar raised)
//!   2. burn period in months    (how long a round is expected to last)
//!   3. stage weight             (traction index multiplier)
//!   4. Rule-of-40 benchmark     (baseline before the efficiency adjustment)
//!
//! RULES:
//!   - Tables are configuration, never computed. A change is a new version.
//!   - Every derived score carries the version of the tables it used.
//!   - A stage missing from a table is a per-record configuration error,
//!     never a fallback to another stage's benchmark.
//!   - A malformed table (empty, non-finite, non-positive) is fatal at load.

use crate::{
    error::{ScopeError, ScopeResult},
    stage::Stage,
};
use serde::Deserialize;
use std::collections::BTreeMap;

pub const REVENUE_MULTIPLE_TABLE: &str = "revenue_multiple";
pub const BURN_PERIOD_TABLE: &str = "burn_period_months";
pub const STAGE_WEIGHT_TABLE: &str = "stage_weight";
pub const RULE_OF_40_TABLE: &str = "rule_of_40_benchmark";

#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkTables {
    pub version:              String,
    pub revenue_multiple:     BTreeMap<Stage, f64>,
    pub burn_period_months:   BTreeMap<Stage, f64>,
    pub stage_weight:         BTreeMap<Stage, f64>,
    pub rule_of_40_benchmark: BTreeMap<Stage, f64>,
}

/// All four benchmarks for one stage, resolved in a single lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageBenchmark {
    pub stage:                Stage,
    pub revenue_multiple:     f64,
    pub burn_period_months:   f64,
    pub stage_weight:         f64,
    pub rule_of_40_benchmark: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct BenchmarkFile {
    version:              String,
    revenue_multiple:     BTreeMap<String, f64>,
    burn_period_months:   BTreeMap<String, f64>,
    stage_weight:         BTreeMap<String, f64>,
    rule_of_40_benchmark: BTreeMap<String, f64>,
}

impl BenchmarkTables {
    /// The built-in `stage-benchmarks-v1` tables.
    pub fn standard() -> Self {
        // (stage, revenue multiple, burn months, stage weight, rule-of-40 base)
        let rows = [
            (Stage::PreSeed,     0.05, 18.0, 0.75, 100.0),
            (Stage::Seed,        0.10, 18.0, 1.00, 100.0),
            (Stage::Angel,       0.08, 18.0, 1.00,  90.0),
            (Stage::SeriesA,     0.30, 24.0, 1.50, 100.0),
            (Stage::SeriesB,     0.50, 30.0, 2.00,  80.0),
            (Stage::SeriesC,     0.80, 36.0, 2.50,  50.0),
            (Stage::SeriesDPlus, 1.00, 36.0, 3.00,  40.0),
        ];
        Self {
            version:              "stage-benchmarks-v1".into(),
            revenue_multiple:     rows.iter().map(|r| (r.0, r.1)).collect(),
            burn_period_months:   rows.iter().map(|r| (r.0, r.2)).collect(),
            stage_weight:         rows.iter().map(|r| (r.0, r.3)).collect(),
            rule_of_40_benchmark: rows.iter().map(|r| (r.0, r.4)).collect(),
        }
    }

    /// Parse and validate tables from their JSON form.
    pub fn from_json(content: &str) -> ScopeResult<Self> {
        let file: BenchmarkFile = serde_json::from_str(content)?;
        let tables = Self {
            version:              file.version,
            revenue_multiple:     stage_keyed(REVENUE_MULTIPLE_TABLE, file.revenue_multiple)?,
            burn_period_months:   stage_keyed(BURN_PERIOD_TABLE, file.burn_period_months)?,
            stage_weight:         stage_keyed(STAGE_WEIGHT_TABLE, file.stage_weight)?,
            rule_of_40_benchmark: stage_keyed(RULE_OF_40_TABLE, file.rule_of_40_benchmark)?,
        };
        tables.validate()?;
        Ok(tables)
    }

    /// Load from `{data_dir}/benchmarks/stage_benchmarks.json`.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/benchmarks/stage_benchmarks.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let tables = Self::from_json(&content)
            .map_err(|e| anyhow::anyhow!("Cannot load {path}: {e}"))?;
        for (stage, table) in tables.coverage_gaps() {
            log::warn!(
                "benchmarks {}: stage '{stage}' missing from '{table}'; its records will be excluded",
                tables.version
            );
        }
        Ok(tables)
    }

    /// Reject tables no record could be scored against.
    pub fn validate(&self) -> ScopeResult<()> {
        if self.version.trim().is_empty() {
            return Err(invalid("version must not be empty".into()));
        }

        // (table, values, allow zero)
        let tables: [(&str, &BTreeMap<Stage, f64>, bool); 4] = [
            (REVENUE_MULTIPLE_TABLE, &self.revenue_multiple,     false),
            (BURN_PERIOD_TABLE,      &self.burn_period_months,   false),
            (STAGE_WEIGHT_TABLE,     &self.stage_weight,         false),
            (RULE_OF_40_TABLE,       &self.rule_of_40_benchmark, true),
        ];

        for (name, values, allow_zero) in tables {
            if values.is_empty() {
                return Err(invalid(format!("table '{name}' is empty")));
            }
            for (stage, value) in values {
                let in_domain = value.is_finite() && (*value > 0.0 || (allow_zero && *value == 0.0));
                if !in_domain {
                    return Err(invalid(format!(
                        "table '{name}' has out-of-domain value {value} for '{stage}'"
                    )));
                }
            }
        }

        if Stage::ALL.iter().all(|s| self.lookup(*s).is_err()) {
            return Err(invalid("no stage is covered by all four tables".into()));
        }
        Ok(())
    }

    /// Resolve all four benchmarks for `stage`.
    pub fn lookup(&self, stage: Stage) -> ScopeResult<StageBenchmark> {
        Ok(StageBenchmark {
            stage,
            revenue_multiple:     get(&self.revenue_multiple, stage, REVENUE_MULTIPLE_TABLE)?,
            burn_period_months:   get(&self.burn_period_months, stage, BURN_PERIOD_TABLE)?,
            stage_weight:         get(&self.stage_weight, stage, STAGE_WEIGHT_TABLE)?,
            rule_of_40_benchmark: get(&self.rule_of_40_benchmark, stage, RULE_OF_40_TABLE)?,
        })
    }

    /// Every (stage, table) pair with no entry.
    pub fn coverage_gaps(&self) -> Vec<(Stage, &'static str)> {
        let tables = [
            (REVENUE_MULTIPLE_TABLE, &self.revenue_multiple),
            (BURN_PERIOD_TABLE,      &self.burn_period_months),
            (STAGE_WEIGHT_TABLE,     &self.stage_weight),
            (RULE_OF_40_TABLE,       &self.rule_of_40_benchmark),
        ];
        Stage::ALL
            .iter()
            .flat_map(|stage| {
                tables
                    .iter()
                    .filter(|(_, values)| !values.contains_key(stage))
                    .map(move |(name, _)| (*stage, *name))
            })
            .collect()
    }
}

fn get(table: &BTreeMap<Stage, f64>, stage: Stage, name: &'static str) -> ScopeResult<f64> {
    table.get(&stage).copied().ok_or_else(|| ScopeError::Configuration {
        stage: stage.name().to_string(),
        table: name,
    })
}

fn stage_keyed(name: &str, raw: BTreeMap<String, f64>) -> ScopeResult<BTreeMap<Stage, f64>> {
    raw.into_iter()
        .map(|(key, value)| match Stage::parse(&key) {
            Some(stage) => Ok((stage, value)),
            None => Err(invalid(format!("table '{name}' has unknown stage '{key}'"))),
        })
        .collect()
}

fn invalid(reason: String) -> ScopeError {
    ScopeError::InvalidBenchmarks { reason }
}
