//! Single-startup assessment.
//!
//! A hypothetical startup goes through the same missing-value policy and
//! KPI calculator as the batch (see `ScoringPipeline::score_one`); its
//! traction is rescaled by the batch's fitted scale so its score is
//! comparable to the ranked table. The trained model then turns its
//! feature row into a success probability.
//!
//!   confidence      High   p > 0.80 or p < 0.20
//!                   Medium p > 0.65 or p < 0.35
//!                   Low    otherwise
//!   recommendation  StrongInvest ≥ 0.75, Consider ≥ 0.60,
//!                   Cautious ≥ 0.45, Pass below

use crate::{
    classifier::TrainedModel,
    features::FeatureSchema,
    pipeline::ScoredRecord,
    record::EntityRecord,
    stage::Stage,
    types::Year,
};
use serde::{Deserialize, Serialize};

/// The inputs an analyst supplies for one startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartupProfile {
    pub company:         String,
    pub funding_amount:  f64,
    pub stage:           String,
    pub sector:          Option<String>,
    pub country:         Option<String>,
    pub investors_count: Option<u32>,
    pub founded_year:    Option<Year>,
}

impl StartupProfile {
    pub fn to_record(&self) -> EntityRecord {
        EntityRecord {
            funding_amount:  Some(self.funding_amount),
            stage:           Some(self.stage.clone()),
            sector:          self.sector.clone(),
            country:         self.country.clone(),
            investors_count: self.investors_count,
            founded_year:    self.founded_year,
            ..EntityRecord::company(&self.company)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn from_probability(p: f64) -> Self {
        if p > 0.8 || p < 0.2 {
            Self::High
        } else if p > 0.65 || p < 0.35 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    StrongInvest,
    Consider,
    Cautious,
    Pass,
}

impl Recommendation {
    pub fn from_probability(p: f64) -> Self {
        if p >= 0.75 {
            Self::StrongInvest
        } else if p >= 0.60 {
            Self::Consider
        } else if p >= 0.45 {
            Self::Cautious
        } else {
            Self::Pass
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::StrongInvest => "STRONG INVEST",
            Self::Consider     => "CONSIDER",
            Self::Cautious     => "CAUTIOUS",
            Self::Pass         => "PASS",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub entity_id:           String,
    pub company:             String,
    pub stage:               Stage,
    pub investment_score:    f64,
    pub success_probability: f64,
    pub confidence:          Confidence,
    pub recommendation:      Recommendation,
    pub strengths:           Vec<String>,
    pub concerns:            Vec<String>,
}

pub fn assess(model: &dyn TrainedModel, schema: &FeatureSchema, record: &ScoredRecord) -> Assessment {
    let p = model.predict_proba(&schema.vectorize(record)).clamp(0.0, 1.0);
    let (strengths, concerns) = interpret(record);
    log::debug!("assess {}: p={p:.3}", record.entity_id);

    Assessment {
        entity_id:           record.entity_id.clone(),
        company:             record.company.clone(),
        stage:               record.stage,
        investment_score:    record.kpis.investment_score,
        success_probability: p,
        confidence:          Confidence::from_probability(p),
        recommendation:      Recommendation::from_probability(p),
        strengths,
        concerns,
    }
}

/// Funding above which a round counts as strong for its stage.
fn strong_round_threshold(stage: Stage) -> Option<f64> {
    match stage {
        Stage::Seed    => Some(2_000_000.0),
        Stage::SeriesA => Some(8_000_000.0),
        Stage::SeriesB => Some(20_000_000.0),
        _ => None,
    }
}

/// Plain-language strengths and concerns, by fixed thresholds.
pub fn interpret(record: &ScoredRecord) -> (Vec<String>, Vec<String>) {
    let mut strengths = Vec::new();
    let mut concerns = Vec::new();
    let k = &record.kpis;

    if let Some(threshold) = strong_round_threshold(record.stage) {
        if record.funding_amount > threshold {
            strengths.push(format!(
                "Strong {} round (${:.1}M)",
                record.stage,
                record.funding_amount / 1e6
            ));
        }
    }

    let investors = record.investors_count;
    if investors >= 5 {
        strengths.push(format!("Good investor validation ({investors} investors)"));
    } else if investors <= 2 {
        concerns.push(format!("Limited investor validation ({investors} investors)"));
    }

    if k.capital_efficiency > 0.40 {
        strengths.push(format!("Strong capital efficiency ({:.2})", k.capital_efficiency));
    } else if k.capital_efficiency < 0.20 {
        concerns.push(format!("Low capital efficiency ({:.2})", k.capital_efficiency));
    }

    if k.burn_multiple < 1.5 {
        strengths.push(format!("Efficient burn ({:.1}x burn multiple)", k.burn_multiple));
    } else if k.burn_multiple > 3.0 {
        concerns.push(format!("High burn ({:.1}x burn multiple)", k.burn_multiple));
    }

    if k.runway_months > 15.0 {
        strengths.push(format!("Healthy runway ({:.0} months)", k.runway_months));
    } else if k.runway_months < 9.0 {
        concerns.push(format!("Limited runway ({:.0} months)", k.runway_months));
    }

    if k.traction_index > 60.0 {
        strengths.push(format!("Strong traction index ({:.0}/100)", k.traction_index));
    } else if k.traction_index < 30.0 {
        concerns.push(format!("Low traction index ({:.0}/100)", k.traction_index));
    }

    if k.investment_score > 70.0 {
        strengths.push(format!("High investment score ({:.0}/100)", k.investment_score));
    } else if k.investment_score < 40.0 {
        concerns.push(format!("Below-average investment score ({:.0}/100)", k.investment_score));
    }

    (strengths, concerns)
}
