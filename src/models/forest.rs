//! Random forests: bootstrap-bagged CART trees.
//!
//! Trees are grown in parallel with rayon. Each tree owns an RNG seeded from the
//! forest seed and its index, so the result does not depend on thread scheduling.

use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::tree::{Criterion, Gini, MaxFeatures, Mse, Tree, TreeParams, normalize_importances};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub tree: TreeParams,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 150,
            tree: TreeParams {
                max_depth: 18,
                min_samples_split: 6,
                min_samples_leaf: 2,
                max_features: MaxFeatures::Sqrt,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forest {
    trees: Vec<Tree>,
}

fn tree_seed(seed: u64, index: usize) -> u64 {
    seed ^ (index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

impl Forest {
    pub fn fit_regressor(x: &DMatrix<f64>, y: &[f64], params: &ForestParams, seed: u64) -> Self {
        Self::fit_with(x, &Mse { target: y }, params, seed)
    }

    pub fn fit_classifier(
        x: &DMatrix<f64>,
        y: &[usize],
        n_classes: usize,
        params: &ForestParams,
        seed: u64,
    ) -> Self {
        Self::fit_with(x, &Gini { target: y, n_classes }, params, seed)
    }

    fn fit_with<C: Criterion>(x: &DMatrix<f64>, criterion: &C, params: &ForestParams, seed: u64) -> Self {
        let n = x.nrows();
        let trees = (0..params.n_trees.max(1))
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(tree_seed(seed, t));
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                Tree::fit(x, &bootstrap, criterion, &params.tree, &mut rng)
            })
            .collect();
        Self { trees }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Mean of the trees' regression outputs.
    pub fn predict_scalar(&self, x: &DMatrix<f64>) -> Vec<f64> {
        let mut out = vec![0.0; x.nrows()];
        for tree in &self.trees {
            for (o, v) in out.iter_mut().zip(tree.predict_scalar(x)) {
                *o += v;
            }
        }
        let k = self.trees.len().max(1) as f64;
        out.iter_mut().for_each(|o| *o /= k);
        out
    }

    /// Mean of the trees' class-probability leaves.
    pub fn predict_proba(&self, x: &DMatrix<f64>, n_classes: usize) -> Vec<Vec<f64>> {
        let k = self.trees.len().max(1) as f64;
        (0..x.nrows())
            .map(|i| {
                let mut p = vec![0.0; n_classes];
                for tree in &self.trees {
                    for (acc, v) in p.iter_mut().zip(tree.predict_row(x, i)) {
                        *acc += v;
                    }
                }
                p.iter_mut().for_each(|v| *v /= k);
                p
            })
            .collect()
    }

    /// Mean of per-tree normalized importances.
    pub fn feature_importances(&self) -> Vec<f64> {
        let Some(first) = self.trees.first() else {
            return Vec::new();
        };
        let mut acc = vec![0.0; first.n_features()];
        for tree in &self.trees {
            let imp = normalize_importances(tree.raw_importances().to_vec());
            for (a, v) in acc.iter_mut().zip(imp) {
                *a += v;
            }
        }
        normalize_importances(acc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> ForestParams {
        ForestParams {
            n_trees: 12,
            tree: TreeParams {
                max_depth: 4,
                min_samples_split: 2,
                min_samples_leaf: 1,
                max_features: MaxFeatures::All,
            },
        }
    }

    #[test]
    fn same_seed_same_forest() {
        let x = DMatrix::from_fn(40, 3, |i, j| ((i * (j + 3)) % 11) as f64);
        let y: Vec<f64> = (0..40).map(|i| (i % 7) as f64 / 7.0).collect();
        let a = Forest::fit_regressor(&x, &y, &small(), 5);
        let b = Forest::fit_regressor(&x, &y, &small(), 5);
        assert_eq!(a, b);
        assert_eq!(a.n_trees(), 12);
    }

    #[test]
    fn classifier_probabilities_sum_to_one() {
        let x = DMatrix::from_fn(30, 1, |i, _| i as f64);
        let y: Vec<usize> = (0..30).map(|i| i / 10).collect();
        let forest = Forest::fit_classifier(&x, &y, 4, &small(), 3);
        for p in forest.predict_proba(&x, 4) {
            assert_eq!(p.len(), 4);
            assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
            assert_eq!(p[3], 0.0);
        }
        let p_low = &forest.predict_proba(&x, 4)[0];
        assert!(p_low[0] > 0.5);
    }

    #[test]
    fn importances_favor_the_informative_feature() {
        let x = DMatrix::from_fn(60, 2, |i, j| if j == 0 { i as f64 } else { ((i * 13) % 4) as f64 });
        let y: Vec<f64> = (0..60).map(|i| if i < 30 { 0.1 } else { 0.9 }).collect();
        let forest = Forest::fit_regressor(&x, &y, &small(), 11);
        let imp = forest.feature_importances();
        assert!((imp.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(imp[0] > imp[1]);
    }
}
