//! Candidate model families.
//!
//! A candidate is a pair of learners (PD regressor + risk classifier) from one
//! family. Selection only sees the `Learner` trait, so tests can plug in cheap
//! fakes and new families need no selection changes.

use nalgebra::DMatrix;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::domain::{FamilyKind, TrainConfig};
use crate::models::tree::{Gini, Mse};
use crate::models::{
    BoostParams, BoostedClassifier, BoostedRegressor, Classifier, Forest, ForestParams, Regressor,
    Tree, TreeParams, argmax,
};

pub trait Learner: Sync {
    fn name(&self) -> &str;
    fn fit_regressor(&self, x: &DMatrix<f64>, y: &[f64], seed: u64) -> Regressor;
    fn fit_classifier(&self, x: &DMatrix<f64>, y: &[usize], n_classes: usize, seed: u64) -> Classifier;
}

/// A configured model family.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelFamily {
    GradientBoosting(BoostParams),
    RandomForest(ForestParams),
    DecisionTree(TreeParams),
    Baseline,
}

impl ModelFamily {
    pub fn from_config(kind: FamilyKind, config: &TrainConfig) -> Self {
        match kind {
            FamilyKind::Gbt => ModelFamily::GradientBoosting(BoostParams {
                rounds: config.gbt_rounds,
                learning_rate: config.gbt_learning_rate,
                max_depth: config.gbt_max_depth,
                subsample: config.gbt_subsample,
                ..BoostParams::default()
            }),
            FamilyKind::Forest => {
                let defaults = ForestParams::default();
                ModelFamily::RandomForest(ForestParams {
                    n_trees: config.forest_trees,
                    tree: TreeParams {
                        max_depth: config.forest_max_depth,
                        ..defaults.tree
                    },
                })
            }
            FamilyKind::Tree => ModelFamily::DecisionTree(TreeParams {
                max_depth: config.tree_max_depth,
                ..TreeParams::default()
            }),
            FamilyKind::Baseline => ModelFamily::Baseline,
        }
    }

    pub fn kind(&self) -> FamilyKind {
        match self {
            ModelFamily::GradientBoosting(_) => FamilyKind::Gbt,
            ModelFamily::RandomForest(_) => FamilyKind::Forest,
            ModelFamily::DecisionTree(_) => FamilyKind::Tree,
            ModelFamily::Baseline => FamilyKind::Baseline,
        }
    }
}

impl Learner for ModelFamily {
    fn name(&self) -> &str {
        self.kind().display_name()
    }

    fn fit_regressor(&self, x: &DMatrix<f64>, y: &[f64], seed: u64) -> Regressor {
        match self {
            ModelFamily::GradientBoosting(p) => Regressor::Boosted {
                model: BoostedRegressor::fit(x, y, p, seed),
            },
            ModelFamily::RandomForest(p) => Regressor::Forest {
                forest: Forest::fit_regressor(x, y, p, seed),
            },
            ModelFamily::DecisionTree(p) => {
                let rows: Vec<usize> = (0..x.nrows()).collect();
                let mut rng = StdRng::seed_from_u64(seed);
                Regressor::Tree {
                    tree: Tree::fit(x, &rows, &Mse { target: y }, p, &mut rng),
                }
            }
            ModelFamily::Baseline => {
                let value = if y.is_empty() { 0.0 } else { y.iter().sum::<f64>() / y.len() as f64 };
                Regressor::Constant { value }
            }
        }
    }

    fn fit_classifier(&self, x: &DMatrix<f64>, y: &[usize], n_classes: usize, seed: u64) -> Classifier {
        match self {
            ModelFamily::GradientBoosting(p) => Classifier::Boosted {
                model: BoostedClassifier::fit(x, y, n_classes, p, seed),
            },
            ModelFamily::RandomForest(p) => Classifier::Forest {
                forest: Forest::fit_classifier(x, y, n_classes, p, seed),
                n_classes,
            },
            ModelFamily::DecisionTree(p) => {
                let rows: Vec<usize> = (0..x.nrows()).collect();
                let mut rng = StdRng::seed_from_u64(seed);
                Classifier::Tree {
                    tree: Tree::fit(x, &rows, &Gini { target: y, n_classes }, p, &mut rng),
                    n_classes,
                }
            }
            ModelFamily::Baseline => {
                let mut counts = vec![0usize; n_classes];
                for &c in y {
                    if c < n_classes {
                        counts[c] += 1;
                    }
                }
                // One-hot on the majority class (lowest id on ties).
                let majority = argmax(&counts.iter().map(|&c| c as f64).collect::<Vec<_>>());
                let mut probabilities = vec![0.0; n_classes];
                if n_classes > 0 {
                    probabilities[majority] = 1.0;
                }
                Classifier::Constant { probabilities }
            }
        }
    }
}

/// Families evaluated when none are requested explicitly.
pub const DEFAULT_FAMILIES: [FamilyKind; 3] = [FamilyKind::Gbt, FamilyKind::Forest, FamilyKind::Tree];

pub fn families_from_config(config: &TrainConfig) -> Vec<ModelFamily> {
    let kinds: &[FamilyKind] = if config.families.is_empty() {
        &DEFAULT_FAMILIES
    } else {
        &config.families
    };
    let mut out: Vec<ModelFamily> = Vec::new();
    for &k in kinds {
        if !out.iter().any(|f| f.kind() == k) {
            out.push(ModelFamily::from_config(k, config));
        }
    }
    out
}
