//! Missing-value policy.
//!
//! The policy is a fixed table, applied exactly once per record before any
//! KPI is derived:
//!
//!   investors_count  absent → 0
//!
//! No other field is imputed. A missing stage, funding amount, or founding
//! year is a validation failure handled by the pipeline, not a gap to fill.
//!
//! `investors_count` is Missing-Not-At-Random: it is absent far more often
//! for small raises. Imputing 0 is a conservative policy choice, not a
//! statistical estimate. Once imputed, a 0 is indistinguishable from an
//! observed 0, so re-applying the policy is a no-op.

use crate::record::EntityRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingValuePolicy {
    pub investors_count_default: u32,
}

impl Default for MissingValuePolicy {
    fn default() -> Self {
        Self { investors_count_default: 0 }
    }
}

/// A record the policy has been applied to.
/// The only way to obtain one is through `MissingValuePolicy::apply`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImputedRecord {
    record:            EntityRecord,
    investors_imputed: bool,
}

impl ImputedRecord {
    pub fn record(&self) -> &EntityRecord {
        &self.record
    }

    pub fn into_record(self) -> EntityRecord {
        self.record
    }

    /// Always present after imputation.
    pub fn investors_count(&self) -> u32 {
        self.record.investors_count.unwrap_or_default()
    }

    /// Whether this application of the policy filled `investors_count`.
    pub fn investors_imputed(&self) -> bool {
        self.investors_imputed
    }
}

impl MissingValuePolicy {
    /// Return a copy of `record` with every recognized-missing field filled.
    pub fn apply(&self, record: &EntityRecord) -> ImputedRecord {
        let mut imputed = record.clone();
        let investors_imputed = imputed.investors_count.is_none();
        if investors_imputed {
            imputed.investors_count = Some(self.investors_count_default);
            log::debug!(
                "impute {}: investors_count absent -> {}",
                record.entity_id,
                self.investors_count_default
            );
        }
        ImputedRecord {
            record: imputed,
            investors_imputed,
        }
    }
}
