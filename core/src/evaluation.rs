//! Classifier evaluation: stratified hold-out split and binary metrics.
//!
//! RULES:
//!   - The split is stratified by label and seeded from ModelConfig.seed,
//!     so the same table and seed always give the same partition.
//!   - Every class keeps at least one training row.
//!   - A metric whose denominator is zero is reported as 0.

use crate::{
    classifier::{Classifier, TrainedModel},
    config::ModelConfig,
    error::{ScopeError, ScopeResult},
    features::FeatureMatrix,
    rng::{RngStream, ScopeRng},
};
use serde::{Deserialize, Serialize};

const DECISION_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub train: Vec<usize>,
    pub test:  Vec<usize>,
}

pub fn stratified_split(labels: &[u8], test_fraction: f64, seed: u64) -> ScopeResult<Split> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(ScopeError::model(format!(
            "test_fraction must be in (0, 1), got {test_fraction}"
        )));
    }

    let mut rng = ScopeRng::for_stream(seed, RngStream::Split);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for class in [0u8, 1u8] {
        let mut members: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|&(_, &l)| l == class)
            .map(|(i, _)| i)
            .collect();
        rng.shuffle(&mut members);

        let n_test = ((members.len() as f64 * test_fraction).round() as usize)
            .min(members.len().saturating_sub(1));
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    Ok(Split { train, test })
}

// ── Metrics ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positive:  usize,
    pub false_positive: usize,
    pub true_negative:  usize,
    pub false_negative: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub accuracy:  f64,
    pub precision: f64,
    pub recall:    f64,
    pub f1:        f64,
    pub roc_auc:   f64,
    pub confusion: ConfusionMatrix,
}

fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

pub fn evaluate(labels: &[u8], probabilities: &[f64]) -> Metrics {
    let mut cm = ConfusionMatrix::default();
    for (&label, &p) in labels.iter().zip(probabilities) {
        match (label == 1, p >= DECISION_THRESHOLD) {
            (true, true)   => cm.true_positive += 1,
            (false, true)  => cm.false_positive += 1,
            (false, false) => cm.true_negative += 1,
            (true, false)  => cm.false_negative += 1,
        }
    }

    let tp = cm.true_positive as f64;
    let total = (cm.true_positive + cm.false_positive + cm.true_negative + cm.false_negative) as f64;
    let precision = ratio(tp, tp + cm.false_positive as f64);
    let recall = ratio(tp, tp + cm.false_negative as f64);

    Metrics {
        accuracy: ratio(tp + cm.true_negative as f64, total),
        precision,
        recall,
        f1: ratio(2.0 * precision * recall, precision + recall),
        roc_auc: roc_auc(labels, probabilities),
        confusion: cm,
    }
}

/// Rank-based ROC-AUC (Mann-Whitney U). Tied scores share their average rank.
pub fn roc_auc(labels: &[u8], scores: &[f64]) -> f64 {
    let n = labels.len().min(scores.len());
    let positives = labels[..n].iter().filter(|&&l| l == 1).count();
    let negatives = n - positives;
    if positives == 0 || negatives == 0 {
        return 0.0;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // Ranks are 1-based; positions i..=j share the mean.
        let mean_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = mean_rank;
        }
        i = j + 1;
    }

    let positive_rank_sum: f64 = (0..n).filter(|&k| labels[k] == 1).map(|k| ranks[k]).sum();
    let p = positives as f64;
    (positive_rank_sum - p * (p + 1.0) / 2.0) / (p * negatives as f64)
}

// ── Train + evaluate ─────────────────────────────────────────────────────────

pub struct Evaluation {
    pub model:      Box<dyn TrainedModel>,
    pub metrics:    Metrics,
    pub train_size: usize,
    pub test_size:  usize,
}

/// Split, fit on the training part, score the held-out part.
pub fn train_and_evaluate(
    classifier: &dyn Classifier,
    features: &FeatureMatrix,
    labels: &[u8],
    config: &ModelConfig,
) -> ScopeResult<Evaluation> {
    let split = stratified_split(labels, config.test_fraction, config.seed)?;
    let pick = |idx: &[usize]| idx.iter().map(|&i| labels[i]).collect::<Vec<u8>>();

    let model = classifier.fit(&features.select(&split.train), &pick(&split.train))?;
    let test_labels = pick(&split.test);
    let proba = model.predict_proba_matrix(&features.select(&split.test));
    let metrics = evaluate(&test_labels, &proba);

    log::info!(
        "evaluation: train={} test={} accuracy={:.3} f1={:.3} roc_auc={:.3}",
        split.train.len(),
        split.test.len(),
        metrics.accuracy,
        metrics.f1,
        metrics.roc_auc
    );

    Ok(Evaluation {
        model,
        metrics,
        train_size: split.train.len(),
        test_size: split.test.len(),
    })
}
