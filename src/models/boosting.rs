//! Gradient-boosted trees.
//!
//! - `BoostedRegressor`: squared loss, each round fits a regression tree to the
//!   current residuals.
//! - `BoostedClassifier`: multinomial softmax. Each round fits one regression tree
//!   per class to `y_k - p_k`, then replaces every leaf with a single Newton step:
//!
//! ```text
//! leaf = (K - 1) / K * Σ r / Σ |r| (1 - |r|)
//! ```
//!
//! Both use row subsampling without replacement per round and per-node column
//! subsampling. Rounds are sequential; a fixed seed gives a fixed model.

use nalgebra::DMatrix;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::models::tree::{MaxFeatures, Mse, Tree, TreeParams, normalize_importances};

const MIN_PRIOR: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostParams {
    pub rounds: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Fraction of rows drawn (without replacement) for each round.
    pub subsample: f64,
    /// Fraction of features each node may consider.
    pub col_fraction: f64,
}

impl Default for BoostParams {
    fn default() -> Self {
        Self {
            rounds: 200,
            learning_rate: 0.05,
            max_depth: 6,
            min_samples_leaf: 3,
            subsample: 0.85,
            col_fraction: 0.8,
        }
    }
}

impl BoostParams {
    fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            min_samples_split: 2 * self.min_samples_leaf.max(1),
            min_samples_leaf: self.min_samples_leaf.max(1),
            max_features: MaxFeatures::Fraction(self.col_fraction),
        }
    }

    fn row_sample(&self, n: usize, rng: &mut StdRng) -> Vec<usize> {
        let k = ((self.subsample * n as f64).round() as usize).clamp(1, n.max(1));
        if k >= n {
            return (0..n).collect();
        }
        let mut rows = rand::seq::index::sample(rng, n, k).into_vec();
        rows.sort_unstable();
        rows
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostedRegressor {
    base: f64,
    learning_rate: f64,
    trees: Vec<Tree>,
}

impl BoostedRegressor {
    pub fn fit(x: &DMatrix<f64>, y: &[f64], params: &BoostParams, seed: u64) -> Self {
        let n = x.nrows();
        let base = if n == 0 { 0.0 } else { y.iter().sum::<f64>() / n as f64 };
        let mut pred = vec![base; n];
        let mut rng = StdRng::seed_from_u64(seed);
        let tree_params = params.tree_params();
        let mut trees = Vec::with_capacity(params.rounds);

        for _ in 0..params.rounds {
            let residual: Vec<f64> = y.iter().zip(&pred).map(|(t, p)| t - p).collect();
            let rows = params.row_sample(n, &mut rng);
            let tree = Tree::fit(x, &rows, &Mse { target: &residual }, &tree_params, &mut rng);
            for (p, step) in pred.iter_mut().zip(tree.predict_scalar(x)) {
                *p += params.learning_rate * step;
            }
            trees.push(tree);
        }

        Self {
            base,
            learning_rate: params.learning_rate,
            trees,
        }
    }

    pub fn predict(&self, x: &DMatrix<f64>) -> Vec<f64> {
        let mut out = vec![self.base; x.nrows()];
        for tree in &self.trees {
            for (o, step) in out.iter_mut().zip(tree.predict_scalar(x)) {
                *o += self.learning_rate * step;
            }
        }
        out
    }

    pub fn n_rounds(&self) -> usize {
        self.trees.len()
    }

    pub fn feature_importances(&self) -> Vec<f64> {
        summed_importances(&self.trees)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostedClassifier {
    n_classes: usize,
    /// Initial raw scores: log class priors.
    init: Vec<f64>,
    learning_rate: f64,
    /// `rounds[r][k]` is the tree for class `k` in round `r`.
    rounds: Vec<Vec<Tree>>,
}

impl BoostedClassifier {
    pub fn fit(x: &DMatrix<f64>, y: &[usize], n_classes: usize, params: &BoostParams, seed: u64) -> Self {
        let n = x.nrows();
        let k_classes = n_classes.max(1);

        let mut counts = vec![0.0; k_classes];
        for &c in y {
            if c < k_classes {
                counts[c] += 1.0;
            }
        }
        let total = (n.max(1)) as f64;
        let init: Vec<f64> = counts.iter().map(|c| (c / total).max(MIN_PRIOR).ln()).collect();

        let mut raw: Vec<Vec<f64>> = vec![init.clone(); n];
        let mut rng = StdRng::seed_from_u64(seed);
        let tree_params = params.tree_params();
        let newton_scale = (k_classes as f64 - 1.0) / k_classes as f64;
        let mut rounds = Vec::with_capacity(params.rounds);

        for _ in 0..params.rounds {
            let probs: Vec<Vec<f64>> = raw.iter().map(|f| softmax(f)).collect();
            let rows = params.row_sample(n, &mut rng);
            let mut round = Vec::with_capacity(k_classes);

            for k in 0..k_classes {
                let residual: Vec<f64> = (0..n)
                    .map(|i| f64::from(u8::from(y[i] == k)) - probs[i][k])
                    .collect();
                let mut tree = Tree::fit(x, &rows, &Mse { target: &residual }, &tree_params, &mut rng);

                let leaves = tree.apply(x);
                let mut sums = vec![(0.0, 0.0); tree.node_count()];
                for &i in &rows {
                    let r = residual[i];
                    let s = &mut sums[leaves[i]];
                    s.0 += r;
                    s.1 += r.abs() * (1.0 - r.abs());
                }
                for leaf in tree.leaf_ids() {
                    let (num, den) = sums[leaf];
                    let value = if den.abs() < 1e-12 { 0.0 } else { newton_scale * num / den };
                    tree.set_leaf_value(leaf, vec![value]);
                }

                for (f, step) in raw.iter_mut().zip(tree.predict_scalar(x)) {
                    f[k] += params.learning_rate * step;
                }
                round.push(tree);
            }
            rounds.push(round);
        }

        Self {
            n_classes: k_classes,
            init,
            learning_rate: params.learning_rate,
            rounds,
        }
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn predict_proba(&self, x: &DMatrix<f64>) -> Vec<Vec<f64>> {
        let mut raw: Vec<Vec<f64>> = vec![self.init.clone(); x.nrows()];
        for round in &self.rounds {
            for (k, tree) in round.iter().enumerate() {
                for (f, step) in raw.iter_mut().zip(tree.predict_scalar(x)) {
                    f[k] += self.learning_rate * step;
                }
            }
        }
        raw.iter().map(|f| softmax(f)).collect()
    }

    pub fn feature_importances(&self) -> Vec<f64> {
        let trees: Vec<Tree> = self.rounds.iter().flatten().cloned().collect();
        summed_importances(&trees)
    }
}

fn summed_importances(trees: &[Tree]) -> Vec<f64> {
    let Some(first) = trees.first() else {
        return Vec::new();
    };
    let mut acc = vec![0.0; first.n_features()];
    for tree in trees {
        for (a, v) in acc.iter_mut().zip(tree.raw_importances()) {
            *a += v;
        }
    }
    normalize_importances(acc)
}

pub fn softmax(raw: &[f64]) -> Vec<f64> {
    let max = raw.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp: Vec<f64> = raw.iter().map(|v| (v - max).exp()).collect();
    let total: f64 = exp.iter().sum();
    exp.iter().map(|e| e / total).collect()
}
