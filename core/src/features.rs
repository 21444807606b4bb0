//! Feature matrix for the success classifier.
//!
//! Columns, in order:
//!   1. The eight numeric features in `NUMERIC_FEATURES`.
//!   2. `stage_<name>`, `sector_<value>`, `country_<value>` one-hot blocks.
//!
//! The one-hot vocabulary is frozen when the schema is built from the
//! training table and kept sorted, so column order never depends on row
//! order. A category the schema has not seen vectorizes to all zeros for
//! its block; so does a missing sector or country.

use crate::{labeling::LabeledRecord, pipeline::ScoredRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const NUMERIC_FEATURES: [&str; 8] = [
    "funding_amount",
    "investors_count",
    "rule_of_40",
    "traction_index",
    "capital_efficiency",
    "burn_multiple",
    "runway_months",
    "investment_score",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    stages:    Vec<String>,
    sectors:   Vec<String>,
    countries: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    pub columns: Vec<String>,
    pub rows:    Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// A new matrix holding only the given rows, in the given order.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            columns: self.columns.clone(),
            rows:    indices.iter().filter_map(|&i| self.rows.get(i).cloned()).collect(),
        }
    }
}

fn clean(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl FeatureSchema {
    pub fn from_records<'r>(records: impl IntoIterator<Item = &'r ScoredRecord>) -> Self {
        let mut stages = BTreeSet::new();
        let mut sectors = BTreeSet::new();
        let mut countries = BTreeSet::new();
        for r in records {
            stages.insert(r.stage.name().to_string());
            if let Some(s) = clean(r.sector.as_deref()) {
                sectors.insert(s.to_string());
            }
            if let Some(c) = clean(r.country.as_deref()) {
                countries.insert(c.to_string());
            }
        }
        Self {
            stages:    stages.into_iter().collect(),
            sectors:   sectors.into_iter().collect(),
            countries: countries.into_iter().collect(),
        }
    }

    pub fn columns(&self) -> Vec<String> {
        NUMERIC_FEATURES
            .iter()
            .map(|n| n.to_string())
            .chain(self.stages.iter().map(|s| format!("stage_{s}")))
            .chain(self.sectors.iter().map(|s| format!("sector_{s}")))
            .chain(self.countries.iter().map(|c| format!("country_{c}")))
            .collect()
    }

    pub fn width(&self) -> usize {
        NUMERIC_FEATURES.len() + self.stages.len() + self.sectors.len() + self.countries.len()
    }

    pub fn vectorize(&self, record: &ScoredRecord) -> Vec<f64> {
        let k = &record.kpis;
        let mut row = Vec::with_capacity(self.width());
        row.extend_from_slice(&[
            record.funding_amount,
            f64::from(record.investors_count),
            k.rule_of_40_estimated,
            k.traction_index,
            k.capital_efficiency,
            k.burn_multiple,
            k.runway_months,
            k.investment_score,
        ]);
        one_hot(&mut row, &self.stages, Some(record.stage.name()));
        one_hot(&mut row, &self.sectors, clean(record.sector.as_deref()));
        one_hot(&mut row, &self.countries, clean(record.country.as_deref()));
        row
    }

    pub fn matrix<'r>(&self, records: impl IntoIterator<Item = &'r ScoredRecord>) -> FeatureMatrix {
        FeatureMatrix {
            columns: self.columns(),
            rows:    records.into_iter().map(|r| self.vectorize(r)).collect(),
        }
    }
}

fn one_hot(row: &mut Vec<f64>, vocabulary: &[String], value: Option<&str>) {
    let hot = value.and_then(|v| vocabulary.iter().position(|w| w == v));
    row.extend((0..vocabulary.len()).map(|i| if Some(i) == hot { 1.0 } else { 0.0 }));
}

/// Build the schema from the labeled table and return it with the
/// training matrix and labels.
pub fn training_set(labeled: &[LabeledRecord]) -> (FeatureSchema, FeatureMatrix, Vec<u8>) {
    let schema = FeatureSchema::from_records(labeled.iter().map(|l| &l.record));
    let matrix = schema.matrix(labeled.iter().map(|l| &l.record));
    let labels = labeled.iter().map(|l| l.label).collect();
    log::debug!(
        "feature matrix: {} row(s) x {} column(s)",
        matrix.n_rows(),
        matrix.n_features()
    );
    (schema, matrix, labels)
}
