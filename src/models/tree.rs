//! CART decision trees.
//!
//! One tree type serves every family:
//! - regression trees (MSE criterion) for PD, residual boosting and softmax boosting
//! - classification trees (Gini criterion) for the risk class
//!
//! Leaves hold a value vector: length 1 for regression, class probabilities for
//! classification. Nodes live in a flat arena so the tree serializes as a plain list.
//!
//! Implementation choices:
//! - Exhaustive split search over sorted feature values, thresholds at midpoints.
//! - `x <= threshold` goes left.
//! - Feature subsampling is redrawn at every node.
//! - Ties between equally good splits keep the first one found.

use nalgebra::DMatrix;
use rand::Rng;
use serde::{Deserialize, Serialize};

const MIN_GAIN: f64 = 1e-12;

/// How many features each node may consider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MaxFeatures {
    All,
    Sqrt,
    Fraction(f64),
}

impl MaxFeatures {
    pub fn count(self, n_features: usize) -> usize {
        let k = match self {
            MaxFeatures::All => n_features,
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::Fraction(f) => (f * n_features as f64).round() as usize,
        };
        k.clamp(1, n_features.max(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 15,
            min_samples_split: 6,
            min_samples_leaf: 3,
            max_features: MaxFeatures::Sqrt,
        }
    }
}

/// Node impurity bookkeeping for one target kind.
///
/// `impurity` returns the sample-weighted (total) impurity of a node, so a split's
/// gain is `parent - (left + right)`.
pub trait Criterion: Sync {
    type Stats: Clone;

    fn empty(&self) -> Self::Stats;
    fn push(&self, stats: &mut Self::Stats, sample: usize);
    fn pop(&self, stats: &mut Self::Stats, sample: usize);
    fn count(&self, stats: &Self::Stats) -> usize;
    fn impurity(&self, stats: &Self::Stats) -> f64;
    fn leaf_value(&self, stats: &Self::Stats) -> Vec<f64>;

    fn stats_of(&self, samples: &[usize]) -> Self::Stats {
        let mut s = self.empty();
        for &i in samples {
            self.push(&mut s, i);
        }
        s
    }
}

/// Squared-error criterion over a continuous target.
pub struct Mse<'a> {
    pub target: &'a [f64],
}

#[derive(Debug, Clone, Copy)]
pub struct MseStats {
    n: usize,
    sum: f64,
    sum_sq: f64,
}

impl Criterion for Mse<'_> {
    type Stats = MseStats;

    fn empty(&self) -> MseStats {
        MseStats {
            n: 0,
            sum: 0.0,
            sum_sq: 0.0,
        }
    }

    fn push(&self, s: &mut MseStats, sample: usize) {
        let y = self.target[sample];
        s.n += 1;
        s.sum += y;
        s.sum_sq += y * y;
    }

    fn pop(&self, s: &mut MseStats, sample: usize) {
        let y = self.target[sample];
        s.n -= 1;
        s.sum -= y;
        s.sum_sq -= y * y;
    }

    fn count(&self, s: &MseStats) -> usize {
        s.n
    }

    fn impurity(&self, s: &MseStats) -> f64 {
        if s.n == 0 {
            return 0.0;
        }
        (s.sum_sq - s.sum * s.sum / s.n as f64).max(0.0)
    }

    fn leaf_value(&self, s: &MseStats) -> Vec<f64> {
        let mean = if s.n == 0 { 0.0 } else { s.sum / s.n as f64 };
        vec![mean]
    }
}

/// Gini criterion over class ids `0..n_classes`.
pub struct Gini<'a> {
    pub target: &'a [usize],
    pub n_classes: usize,
}

#[derive(Debug, Clone)]
pub struct GiniStats {
    n: usize,
    counts: Vec<f64>,
}

impl Criterion for Gini<'_> {
    type Stats = GiniStats;

    fn empty(&self) -> GiniStats {
        GiniStats {
            n: 0,
            counts: vec![0.0; self.n_classes],
        }
    }

    fn push(&self, s: &mut GiniStats, sample: usize) {
        s.n += 1;
        s.counts[self.target[sample]] += 1.0;
    }

    fn pop(&self, s: &mut GiniStats, sample: usize) {
        s.n -= 1;
        s.counts[self.target[sample]] -= 1.0;
    }

    fn count(&self, s: &GiniStats) -> usize {
        s.n
    }

    fn impurity(&self, s: &GiniStats) -> f64 {
        if s.n == 0 {
            return 0.0;
        }
        let n = s.n as f64;
        let sum_p2: f64 = s.counts.iter().map(|c| (c / n) * (c / n)).sum();
        n * (1.0 - sum_p2)
    }

    fn leaf_value(&self, s: &GiniStats) -> Vec<f64> {
        let n = s.n.max(1) as f64;
        s.counts.iter().map(|c| c / n).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    n_features: usize,
    nodes: Vec<Node>,
    /// Total impurity decrease per feature (unnormalized).
    gains: Vec<f64>,
}

struct SplitChoice {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl Tree {
    /// Grow a tree on the given sample indices (duplicates allowed, for bootstrap).
    pub fn fit<C: Criterion, R: Rng>(
        x: &DMatrix<f64>,
        samples: &[usize],
        criterion: &C,
        params: &TreeParams,
        rng: &mut R,
    ) -> Self {
        let mut tree = Self {
            n_features: x.ncols(),
            nodes: Vec::new(),
            gains: vec![0.0; x.ncols()],
        };
        let mut samples = samples.to_vec();
        tree.grow(x, &mut samples, 0, criterion, params, rng);
        tree
    }

    fn grow<C: Criterion, R: Rng>(
        &mut self,
        x: &DMatrix<f64>,
        samples: &mut Vec<usize>,
        depth: usize,
        criterion: &C,
        params: &TreeParams,
        rng: &mut R,
    ) -> usize {
        let stats = criterion.stats_of(samples);
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: criterion.leaf_value(&stats),
        });

        let n = samples.len();
        let parent = criterion.impurity(&stats);
        if depth >= params.max_depth
            || n < params.min_samples_split.max(2)
            || n < 2 * params.min_samples_leaf.max(1)
            || parent <= MIN_GAIN
        {
            return id;
        }

        let Some(best) = self.best_split(x, samples, &stats, parent, criterion, params, rng) else {
            return id;
        };

        let (mut left, mut right): (Vec<usize>, Vec<usize>) = samples
            .iter()
            .partition(|&&i| x[(i, best.feature)] <= best.threshold);
        samples.clear();
        samples.shrink_to_fit();

        self.gains[best.feature] += best.gain;
        let l = self.grow(x, &mut left, depth + 1, criterion, params, rng);
        let r = self.grow(x, &mut right, depth + 1, criterion, params, rng);
        self.nodes[id] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: l,
            right: r,
        };
        id
    }

    #[allow(clippy::too_many_arguments)]
    fn best_split<C: Criterion, R: Rng>(
        &self,
        x: &DMatrix<f64>,
        samples: &[usize],
        stats: &C::Stats,
        parent: f64,
        criterion: &C,
        params: &TreeParams,
        rng: &mut R,
    ) -> Option<SplitChoice> {
        let n_features = x.ncols();
        let k = params.max_features.count(n_features);
        let mut features: Vec<usize> = if k >= n_features {
            (0..n_features).collect()
        } else {
            rand::seq::index::sample(rng, n_features, k).into_vec()
        };
        features.sort_unstable();

        let min_leaf = params.min_samples_leaf.max(1);
        let n = samples.len();
        let mut best: Option<SplitChoice> = None;
        let mut sorted: Vec<(f64, usize)> = Vec::with_capacity(n);

        for feature in features {
            sorted.clear();
            sorted.extend(samples.iter().map(|&i| (x[(i, feature)], i)));
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));
            if sorted[0].0 == sorted[n - 1].0 {
                continue;
            }

            let mut left = criterion.empty();
            let mut right = stats.clone();
            for pos in 0..n - 1 {
                let (value, sample) = sorted[pos];
                criterion.push(&mut left, sample);
                criterion.pop(&mut right, sample);

                let next = sorted[pos + 1].0;
                if value == next {
                    continue;
                }
                if criterion.count(&left) < min_leaf || criterion.count(&right) < min_leaf {
                    continue;
                }

                let gain = parent - criterion.impurity(&left) - criterion.impurity(&right);
                let better = match &best {
                    None => gain > MIN_GAIN,
                    Some(b) => gain > b.gain,
                };
                if better {
                    let mid = value + (next - value) / 2.0;
                    let threshold = if mid < next { mid } else { value };
                    best = Some(SplitChoice {
                        feature,
                        threshold,
                        gain,
                    });
                }
            }
        }

        best
    }

    fn leaf_of(&self, x: &DMatrix<f64>, row: usize) -> usize {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { .. } => return id,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if x[(row, *feature)] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Leaf value reached by one row of `x`.
    pub fn predict_row(&self, x: &DMatrix<f64>, row: usize) -> &[f64] {
        match &self.nodes[self.leaf_of(x, row)] {
            Node::Leaf { value } => value.as_slice(),
            Node::Split { .. } => &[],
        }
    }

    /// First leaf component for every row (the regression prediction).
    pub fn predict_scalar(&self, x: &DMatrix<f64>) -> Vec<f64> {
        (0..x.nrows())
            .map(|i| self.predict_row(x, i).first().copied().unwrap_or(0.0))
            .collect()
    }

    /// Leaf node id for every row.
    pub fn apply(&self, x: &DMatrix<f64>) -> Vec<usize> {
        (0..x.nrows()).map(|i| self.leaf_of(x, i)).collect()
    }

    /// Replace the value of a leaf (used for Newton-step leaf values in boosting).
    pub fn set_leaf_value(&mut self, leaf: usize, value: Vec<f64>) {
        if let Some(Node::Leaf { value: v }) = self.nodes.get_mut(leaf) {
            *v = value;
        }
    }

    pub fn leaf_ids(&self) -> Vec<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| matches!(n, Node::Leaf { .. }))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], id: usize) -> usize {
            match &nodes[id] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() { 0 } else { walk(&self.nodes, 0) }
    }

    /// Unnormalized impurity decrease per feature.
    pub fn raw_importances(&self) -> &[f64] {
        &self.gains
    }
}

/// Scale a vector of non-negative importances to sum to 1 (all zeros stay zero).
pub fn normalize_importances(mut v: Vec<f64>) -> Vec<f64> {
    let total: f64 = v.iter().sum();
    if total > 0.0 {
        for x in &mut v {
            *x /= total;
        }
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn all_features(depth: usize, leaf: usize) -> TreeParams {
        TreeParams {
            max_depth: depth,
            min_samples_split: 2,
            min_samples_leaf: leaf,
            max_features: MaxFeatures::All,
        }
    }

    #[test]
    fn regression_tree_learns_a_step() {
        // y = 1 when x0 > 5, else 0; x1 is noise.
        let n = 20;
        let x = DMatrix::from_fn(n, 2, |i, j| if j == 0 { i as f64 } else { ((i * 7) % 5) as f64 });
        let y: Vec<f64> = (0..n).map(|i| if i > 5 { 1.0 } else { 0.0 }).collect();
        let samples: Vec<usize> = (0..n).collect();

        let tree = Tree::fit(&x, &samples, &Mse { target: &y }, &all_features(3, 1), &mut StdRng::seed_from_u64(0));
        assert_eq!(tree.predict_scalar(&x), y);
        assert_eq!(tree.depth(), 1);

        let imp = normalize_importances(tree.raw_importances().to_vec());
        assert!((imp[0] - 1.0).abs() < 1e-12);
        assert_eq!(imp[1], 0.0);
    }

    #[test]
    fn gini_tree_separates_classes_and_outputs_probabilities() {
        let x = DMatrix::from_row_slice(6, 1, &[0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
        let y = [0usize, 0, 0, 2, 2, 2];
        let samples: Vec<usize> = (0..6).collect();
        let gini = Gini { target: &y, n_classes: 3 };

        let tree = Tree::fit(&x, &samples, &gini, &all_features(5, 1), &mut StdRng::seed_from_u64(0));
        assert_eq!(tree.predict_row(&x, 0), &[1.0, 0.0, 0.0]);
        assert_eq!(tree.predict_row(&x, 5), &[0.0, 0.0, 1.0]);

        // Threshold is the midpoint between 2 and 10.
        let probe = DMatrix::from_row_slice(2, 1, &[5.9, 6.1]);
        assert_eq!(tree.predict_row(&probe, 0)[0], 1.0);
        assert_eq!(tree.predict_row(&probe, 1)[2], 1.0);
    }

    #[test]
    fn depth_and_leaf_size_limits_hold() {
        let n = 64;
        let x = DMatrix::from_fn(n, 1, |i, _| i as f64);
        let y: Vec<f64> = (0..n).map(|i| (i as f64).sin()).collect();
        let samples: Vec<usize> = (0..n).collect();

        let tree = Tree::fit(&x, &samples, &Mse { target: &y }, &all_features(3, 4), &mut StdRng::seed_from_u64(0));
        assert!(tree.depth() <= 3);

        let leaves = tree.apply(&x);
        for leaf in tree.leaf_ids() {
            let size = leaves.iter().filter(|&&l| l == leaf).count();
            assert!(size >= 4, "leaf {leaf} has {size} samples");
        }
    }

    #[test]
    fn constant_target_gives_single_leaf() {
        let x = DMatrix::from_fn(10, 3, |i, j| (i + j) as f64);
        let y = vec![0.3; 10];
        let samples: Vec<usize> = (0..10).collect();
        let tree = Tree::fit(&x, &samples, &Mse { target: &y }, &TreeParams::default(), &mut StdRng::seed_from_u64(1));
        assert_eq!(tree.node_count(), 1);
        assert!((tree.predict_scalar(&x)[0] - 0.3).abs() < 1e-12);
    }

    #[test]
    fn max_features_counts() {
        assert_eq!(MaxFeatures::Sqrt.count(41), 6);
        assert_eq!(MaxFeatures::Fraction(0.8).count(41), 33);
        assert_eq!(MaxFeatures::All.count(41), 41);
        assert_eq!(MaxFeatures::Fraction(0.0).count(5), 1);
    }

    #[test]
    fn set_leaf_value_overrides_prediction() {
        let x = DMatrix::from_row_slice(4, 1, &[0.0, 1.0, 2.0, 3.0]);
        let y = [0.0, 0.0, 1.0, 1.0];
        let samples: Vec<usize> = (0..4).collect();
        let mut tree = Tree::fit(&x, &samples, &Mse { target: &y }, &all_features(2, 1), &mut StdRng::seed_from_u64(0));
        let leaf = tree.apply(&x)[0];
        tree.set_leaf_value(leaf, vec![-7.0]);
        assert_eq!(tree.predict_scalar(&x)[0], -7.0);
        assert_eq!(tree.predict_scalar(&x)[3], 1.0);
    }
}
