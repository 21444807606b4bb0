//! Success classifier collaborator.
//!
//! The scoring core never depends on this module. `Classifier` is the
//! seam; `TreeEnsemble` is the reference implementation: bagged,
//! depth-limited binary decision trees split on Gini impurity.
//!
//! Per tree:
//!   1. Bootstrap sample of the training rows (or all rows).
//!   2. At each node, consider sqrt(n_features) randomly chosen features.
//!   3. Pick the threshold with the largest impurity decrease, subject to
//!      `min_samples_leaf` on both sides.
//!   4. Stop at `max_depth`, on a pure node, below `min_samples_split`
//!      rows, or when no split is legal.
//!
//! Feature importance is the sample-weighted impurity decrease per
//! feature, normalized per tree, averaged over trees, normalized to 1.

use crate::{
    config::ModelConfig,
    error::{ScopeError, ScopeResult},
    features::FeatureMatrix,
    rng::{RngStream, ScopeRng},
};

pub trait Classifier {
    fn fit(&self, features: &FeatureMatrix, labels: &[u8]) -> ScopeResult<Box<dyn TrainedModel>>;
}

pub trait TrainedModel {
    /// Probability of the positive (success) class for one feature row.
    fn predict_proba(&self, row: &[f64]) -> f64;

    /// One value per feature column, summing to 1 (all zero if no tree
    /// ever split).
    fn feature_importances(&self) -> Vec<f64>;

    fn predict_proba_matrix(&self, features: &FeatureMatrix) -> Vec<f64> {
        features.rows.iter().map(|r| self.predict_proba(r)).collect()
    }
}

// ── Tree ensemble ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct TreeEnsemble {
    config: ModelConfig,
}

impl TreeEnsemble {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        proba: f64,
    },
    Split {
        feature:   usize,
        threshold: f64,
        left:      usize,
        right:     usize,
    },
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn predict(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx) {
                Some(Node::Leaf { proba }) => return *proba,
                Some(Node::Split { feature, threshold, left, right }) => {
                    let value = row.get(*feature).copied().unwrap_or(0.0);
                    idx = if value <= *threshold { *left } else { *right };
                }
                None => return 0.0,
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainedEnsemble {
    trees:       Vec<Tree>,
    importances: Vec<f64>,
}

impl TrainedEnsemble {
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl TrainedModel for TrainedEnsemble {
    fn predict_proba(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let total: f64 = self.trees.iter().map(|t| t.predict(row)).sum();
        total / self.trees.len() as f64
    }

    fn feature_importances(&self) -> Vec<f64> {
        self.importances.clone()
    }
}

impl Classifier for TreeEnsemble {
    fn fit(&self, features: &FeatureMatrix, labels: &[u8]) -> ScopeResult<Box<dyn TrainedModel>> {
        Ok(Box::new(self.fit_ensemble(features, labels)?))
    }
}

impl TreeEnsemble {
    pub fn fit_ensemble(&self, features: &FeatureMatrix, labels: &[u8]) -> ScopeResult<TrainedEnsemble> {
        let n = features.n_rows();
        let width = features.n_features();
        if n == 0 {
            return Err(ScopeError::model("cannot fit on an empty table"));
        }
        if labels.len() != n {
            return Err(ScopeError::model(format!(
                "{} label(s) for {} feature row(s)",
                labels.len(),
                n
            )));
        }
        if features.rows.iter().any(|r| r.len() != width) {
            return Err(ScopeError::model("feature rows differ in width"));
        }
        let positives = labels.iter().filter(|&&l| l == 1).count();
        if positives == 0 || positives == n {
            return Err(ScopeError::model("training labels contain a single class"));
        }
        if self.config.n_estimators == 0 {
            return Err(ScopeError::model("n_estimators must be > 0"));
        }

        let max_features = ((width as f64).sqrt() as usize).clamp(1, width.max(1));
        let bootstrap_rng = ScopeRng::for_stream(self.config.seed, RngStream::Bootstrap);
        let features_rng = ScopeRng::for_stream(self.config.seed, RngStream::Features);

        let mut trees = Vec::with_capacity(self.config.n_estimators);
        let mut importances = vec![0.0; width];

        for t in 0..self.config.n_estimators {
            let mut boot = bootstrap_rng.child(t as u64);
            let sample: Vec<usize> = if self.config.bootstrap {
                (0..n).map(|_| boot.next_index(n)).collect()
            } else {
                (0..n).collect()
            };

            let mut builder = TreeBuilder {
                features,
                labels,
                max_depth: self.config.max_depth,
                min_split: self.config.min_samples_split.max(2),
                min_leaf: self.config.min_samples_leaf.max(1),
                max_features,
                rng: features_rng.child(t as u64),
                nodes: Vec::new(),
                importances: vec![0.0; width],
            };
            builder.grow(sample, 0);

            let tree_total: f64 = builder.importances.iter().sum();
            if tree_total > 0.0 {
                for (acc, v) in importances.iter_mut().zip(&builder.importances) {
                    *acc += v / tree_total;
                }
            }
            trees.push(Tree { nodes: builder.nodes });
        }

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for v in &mut importances {
                *v /= total;
            }
        }

        log::info!(
            "classifier: fitted {} tree(s) on {} row(s) x {} feature(s), {} positive",
            trees.len(),
            n,
            width,
            positives
        );
        Ok(TrainedEnsemble { trees, importances })
    }
}

fn gini(positives: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let p = positives as f64 / total as f64;
    1.0 - p * p - (1.0 - p) * (1.0 - p)
}

struct BestSplit {
    feature:   usize,
    threshold: f64,
    decrease:  f64,
}

struct TreeBuilder<'m> {
    features:     &'m FeatureMatrix,
    labels:       &'m [u8],
    max_depth:    usize,
    min_split:    usize,
    min_leaf:     usize,
    max_features: usize,
    rng:          ScopeRng,
    nodes:        Vec<Node>,
    importances:  Vec<f64>,
}

impl TreeBuilder<'_> {
    /// Grow a subtree over `sample` and return its root's node index.
    fn grow(&mut self, sample: Vec<usize>, depth: usize) -> usize {
        let n = sample.len();
        let positives = sample.iter().filter(|&&i| self.labels[i] == 1).count();
        let proba = if n == 0 { 0.0 } else { positives as f64 / n as f64 };

        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf { proba });

        if depth >= self.max_depth
            || positives == 0
            || positives == n
            || n < self.min_split
            || n < 2 * self.min_leaf
        {
            return idx;
        }

        let Some(best) = self.best_split(&sample, positives) else {
            return idx;
        };
        self.importances[best.feature] += best.decrease;

        let (left, right): (Vec<usize>, Vec<usize>) = sample
            .into_iter()
            .partition(|&i| self.features.rows[i][best.feature] <= best.threshold);

        let left_idx = self.grow(left, depth + 1);
        let right_idx = self.grow(right, depth + 1);
        self.nodes[idx] = Node::Split {
            feature:   best.feature,
            threshold: best.threshold,
            left:      left_idx,
            right:     right_idx,
        };
        idx
    }

    fn best_split(&mut self, sample: &[usize], positives: usize) -> Option<BestSplit> {
        let n = sample.len();
        let parent = gini(positives, n) * n as f64;
        let width = self.features.n_features();
        let candidates = self.rng.sample_indices(width, self.max_features);

        let mut best: Option<BestSplit> = None;
        for feature in candidates {
            let mut column: Vec<(f64, u8)> = sample
                .iter()
                .map(|&i| (self.features.rows[i][feature], self.labels[i]))
                .collect();
            column.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_pos = 0;
            for split in 1..n {
                left_pos += usize::from(column[split - 1].1 == 1);
                let (lo, hi) = (column[split - 1].0, column[split].0);
                if lo == hi || split < self.min_leaf || n - split < self.min_leaf {
                    continue;
                }
                let children = gini(left_pos, split) * split as f64
                    + gini(positives - left_pos, n - split) * (n - split) as f64;
                let decrease = parent - children;
                if decrease > best.as_ref().map_or(0.0, |b| b.decrease) {
                    best = Some(BestSplit {
                        feature,
                        threshold: lo + (hi - lo) / 2.0,
                        decrease,
                    });
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gini_is_zero_when_pure_and_half_when_balanced() {
        assert_eq!(gini(0, 10), 0.0);
        assert_eq!(gini(10, 10), 0.0);
        assert!((gini(5, 10) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn tree_walks_to_the_right_leaf() {
        let tree = Tree {
            nodes: vec![
                Node::Split { feature: 0, threshold: 1.0, left: 1, right: 2 },
                Node::Leaf { proba: 0.1 },
                Node::Leaf { proba: 0.9 },
            ],
        };
        assert_eq!(tree.predict(&[0.5]), 0.1);
        assert_eq!(tree.predict(&[1.5]), 0.9);
    }
}
