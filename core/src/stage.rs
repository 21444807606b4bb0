//! Funding stage: the closed enumeration every benchmark is keyed by.
//!
//! Raw snapshots spell stages many ways ("SERIES A", "series-a+",
//! "venture"). `Stage::parse` folds the known spellings onto the seven
//! canonical stages and returns None for anything else. An unrecognized
//! stage is never defaulted: the scoring pipeline rejects the record.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    #[serde(rename = "Pre-Seed")]
    PreSeed,
    #[serde(rename = "Seed")]
    Seed,
    #[serde(rename = "Angel")]
    Angel,
    #[serde(rename = "Series A")]
    SeriesA,
    #[serde(rename = "Series B")]
    SeriesB,
    #[serde(rename = "Series C")]
    SeriesC,
    #[serde(rename = "Series D+")]
    SeriesDPlus,
}

impl Stage {
    /// Every stage, in funding order. Used to build one-hot columns
    /// and to validate benchmark coverage.
    pub const ALL: [Stage; 7] = [
        Stage::PreSeed,
        Stage::Seed,
        Stage::Angel,
        Stage::SeriesA,
        Stage::SeriesB,
        Stage::SeriesC,
        Stage::SeriesDPlus,
    ];

    /// Canonical display name, as it appears in benchmark files and output tables.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PreSeed     => "Pre-Seed",
            Self::Seed        => "Seed",
            Self::Angel       => "Angel",
            Self::SeriesA     => "Series A",
            Self::SeriesB     => "Series B",
            Self::SeriesC     => "Series C",
            Self::SeriesDPlus => "Series D+",
        }
    }

    /// Standardize a raw stage or funding-round-type string.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace.
    /// Returns None for blank or unrecognized input.
    pub fn parse(raw: &str) -> Option<Self> {
        let key = raw.trim().to_ascii_lowercase();
        let stage = match key.as_str() {
            "pre-seed" | "pre seed" | "preseed" => Self::PreSeed,
            "seed" => Self::Seed,
            "angel" => Self::Angel,
            "series a" | "series-a" | "series-a+" | "venture" => Self::SeriesA,
            "series b" | "series-b" | "series-b+" => Self::SeriesB,
            "series c" | "series-c" | "series-c+" => Self::SeriesC,
            "series d+" | "series d" | "series e" | "series f" | "series g"
            | "series-d" | "series-e" | "series-f" | "series-g"
            | "private-equity" => Self::SeriesDPlus,
            _ => return None,
        };
        Some(stage)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_names_round_trip_through_parse() {
        for stage in Stage::ALL {
            assert_eq!(Stage::parse(stage.name()), Some(stage), "{stage} did not parse");
        }
    }

    #[test]
    fn late_rounds_fold_into_series_d_plus() {
        for raw in ["series d", "SERIES E", " series-f ", "series-g", "private-equity"] {
            assert_eq!(Stage::parse(raw), Some(Stage::SeriesDPlus), "raw={raw:?}");
        }
    }

    #[test]
    fn crunchbase_round_types_are_recognized() {
        assert_eq!(Stage::parse("series-a+"), Some(Stage::SeriesA));
        assert_eq!(Stage::parse("venture"), Some(Stage::SeriesA));
        assert_eq!(Stage::parse("series-b+"), Some(Stage::SeriesB));
    }

    #[test]
    fn blank_and_unknown_stages_are_rejected() {
        assert_eq!(Stage::parse(""), None);
        assert_eq!(Stage::parse("   "), None);
        assert_eq!(Stage::parse("debt_financing"), None);
        assert_eq!(Stage::parse("crowdfunding"), None);
    }
}
