//! Descriptive summaries of a scored table.

use crate::{pipeline::ScoredRecord, scoring::CompositeScorer};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScoreBand {
    Excellent,
    Strong,
    Moderate,
    Weak,
    Poor,
}

impl ScoreBand {
    pub const ALL: [ScoreBand; 5] = [
        ScoreBand::Excellent,
        ScoreBand::Strong,
        ScoreBand::Moderate,
        ScoreBand::Weak,
        ScoreBand::Poor,
    ];

    /// Excellent [80,100], Strong [60,80), Moderate [40,60), Weak [20,40),
    /// Poor [0,20).
    pub fn of(score: f64) -> Self {
        if score >= 80.0 {
            Self::Excellent
        } else if score >= 60.0 {
            Self::Strong
        } else if score >= 40.0 {
            Self::Moderate
        } else if score >= 20.0 {
            Self::Weak
        } else {
            Self::Poor
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent (Top Tier)",
            Self::Strong    => "Strong (High Potential)",
            Self::Moderate  => "Moderate (Average)",
            Self::Weak      => "Weak (Below Average)",
            Self::Poor      => "Poor (High Risk)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub count:   usize,
    pub mean:    f64,
    pub median:  f64,
    /// Sample standard deviation (n − 1). Zero below two records.
    pub std_dev: f64,
    pub min:     f64,
    pub p25:     f64,
    pub p75:     f64,
    pub max:     f64,
    /// Record count per band, in `ScoreBand::ALL` order.
    pub bands:   Vec<(ScoreBand, usize)>,
}

impl ScoreSummary {
    /// Summary of the investment scores. All statistics are 0 for an
    /// empty table.
    pub fn from_records(records: &[ScoredRecord]) -> Self {
        let mut scores: Vec<f64> = records.iter().map(|r| r.kpis.investment_score).collect();
        scores.sort_by(f64::total_cmp);

        let count = scores.len();
        let bands = ScoreBand::ALL
            .iter()
            .map(|&band| (band, scores.iter().filter(|&&s| ScoreBand::of(s) == band).count()))
            .collect();

        if count == 0 {
            return Self {
                count,
                mean: 0.0,
                median: 0.0,
                std_dev: 0.0,
                min: 0.0,
                p25: 0.0,
                p75: 0.0,
                max: 0.0,
                bands,
            };
        }

        let mean = scores.iter().sum::<f64>() / count as f64;
        let std_dev = if count < 2 {
            0.0
        } else {
            let ss: f64 = scores.iter().map(|s| (s - mean).powi(2)).sum();
            (ss / (count - 1) as f64).sqrt()
        };

        Self {
            count,
            mean,
            median: quantile(&scores, 0.5),
            std_dev,
            min: scores[0],
            p25: quantile(&scores, 0.25),
            p75: quantile(&scores, 0.75),
            max: scores[count - 1],
            bands,
        }
    }

    pub fn band_count(&self, band: ScoreBand) -> usize {
        self.bands
            .iter()
            .find(|(b, _)| *b == band)
            .map_or(0, |(_, n)| *n)
    }
}

/// Linear-interpolated quantile of an ascending, non-empty slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

// ── Breakdown ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentLine {
    pub kpi:          String,
    pub raw:          f64,
    pub normalized:   f64,
    pub weight:       f64,
    pub contribution: f64,
}

/// How one record's investment score decomposes over the five KPIs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub entity_id:        String,
    pub company:          String,
    pub components:       Vec<ComponentLine>,
    pub investment_score: f64,
}

impl ScoreBreakdown {
    pub fn for_record(scorer: &CompositeScorer, record: &ScoredRecord) -> Self {
        let inputs = record.kpis.score_inputs();
        let raw = [
            inputs.rule_of_40,
            inputs.traction_index,
            inputs.capital_efficiency,
            inputs.burn_multiple,
            inputs.runway_months,
        ];
        let names = [
            "rule_of_40",
            "traction_index",
            "capital_efficiency",
            "burn_multiple",
            "runway_months",
        ];
        let normalized = scorer.normalize(&inputs).as_array();
        let weights = scorer.weights().as_array();

        let components = (0..5)
            .map(|i| ComponentLine {
                kpi:          names[i].to_string(),
                raw:          raw[i],
                normalized:   normalized[i],
                weight:       weights[i],
                contribution: normalized[i] * weights[i],
            })
            .collect();

        Self {
            entity_id: record.entity_id.clone(),
            company: record.company.clone(),
            components,
            investment_score: record.kpis.investment_score,
        }
    }

    /// Sum of contributions before rounding.
    pub fn contribution_total(&self) -> f64 {
        self.components.iter().map(|c| c.contribution).sum()
    }
}
