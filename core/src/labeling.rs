//! Outcome labeler: raw lifecycle status to a training label.
//!
//!   acquired, ipo  → Success
//!   closed         → Failure
//!   anything else  → Excluded   (operating, blank, unknown values)
//!
//! The table is closed. A status value nobody has mapped yet is Excluded,
//! never Success or Failure.

use crate::pipeline::ScoredRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure,
    Excluded,
}

impl Outcome {
    /// Binary label for classifier training. None for Excluded.
    pub fn label(&self) -> Option<u8> {
        match self {
            Self::Success  => Some(1),
            Self::Failure  => Some(0),
            Self::Excluded => None,
        }
    }
}

pub fn label_status(status: Option<&str>) -> Outcome {
    let Some(raw) = status else {
        return Outcome::Excluded;
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "acquired" | "ipo" => Outcome::Success,
        "closed" => Outcome::Failure,
        _ => Outcome::Excluded,
    }
}

/// A scored record with a known outcome, ready for classifier training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledRecord {
    pub record:  ScoredRecord,
    pub outcome: Outcome,
    pub label:   u8,
}

/// Keep only Success/Failure records and attach the binary label.
pub fn labeled_table(scored: &[ScoredRecord]) -> Vec<LabeledRecord> {
    let labeled: Vec<LabeledRecord> = scored
        .iter()
        .filter_map(|record| {
            let outcome = label_status(record.status.as_deref());
            outcome.label().map(|label| LabeledRecord {
                record: record.clone(),
                outcome,
                label,
            })
        })
        .collect();

    let successes = labeled.iter().filter(|l| l.label == 1).count();
    log::info!(
        "labeled {} of {} scored record(s): {} success, {} failure",
        labeled.len(),
        scored.len(),
        successes,
        labeled.len() - successes
    );
    labeled
}
