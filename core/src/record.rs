//! The canonical per-company record produced by ingestion.
//!
//! RULE: an EntityRecord is read-only once ingested. Every later stage
//! (imputation, KPI derivation, scoring) produces new values from it and
//! never mutates it in place.

use crate::types::{EntityId, Year};
use serde::{Deserialize, Serialize};

/// The only entity type that survives the ingestion filter.
pub const COMPANY_ENTITY_TYPE: &str = "Company";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub entity_id:       EntityId,
    pub company:         String,
    pub entity_type:     Option<String>,
    /// Total funding raised. Zero and absent are both "missing" upstream.
    pub funding_amount:  Option<f64>,
    /// Raw stage text; standardized by `Stage::parse` at scoring time.
    pub stage:           Option<String>,
    /// Absent far more often for small raises (MNAR). Imputed before use.
    pub investors_count: Option<u32>,
    pub founded_year:    Option<Year>,
    pub sector:          Option<String>,
    pub country:         Option<String>,
    /// Raw lifecycle status: operating, acquired, ipo, closed, ...
    pub status:          Option<String>,
}

impl EntityRecord {
    /// A company record with the given id (also used as display name).
    pub fn company(entity_id: impl Into<String>) -> Self {
        let entity_id = entity_id.into();
        Self {
            company: entity_id.clone(),
            entity_id,
            entity_type: Some(COMPANY_ENTITY_TYPE.to_string()),
            ..Self::default()
        }
    }

    /// True when the record is a company, or carries no entity type at all
    /// (single-source snapshots often omit the column).
    pub fn is_company(&self) -> bool {
        match &self.entity_type {
            Some(t) => t.trim() == COMPANY_ENTITY_TYPE,
            None => true,
        }
    }

    /// True when funding is present and strictly positive.
    pub fn is_funded(&self) -> bool {
        matches!(self.funding_amount, Some(f) if f.is_finite() && f > 0.0)
    }
}
