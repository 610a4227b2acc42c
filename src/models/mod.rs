//! Tree-based model families and the fitted-model enums stored in a bundle.
//!
//! `Regressor` predicts probability of default; `Classifier` predicts a risk class
//! id (index into the bundle's label list). Both are plain serde enums, so a bundle
//! is self-describing JSON.

pub mod boosting;
pub mod forest;
pub mod tree;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

pub use boosting::{BoostParams, BoostedClassifier, BoostedRegressor};
pub use forest::{Forest, ForestParams};
pub use tree::{MaxFeatures, Tree, TreeParams};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum Regressor {
    Constant { value: f64 },
    Tree { tree: Tree },
    Forest { forest: Forest },
    Boosted { model: BoostedRegressor },
}

impl Regressor {
    pub fn predict(&self, x: &DMatrix<f64>) -> Vec<f64> {
        match self {
            Regressor::Constant { value } => vec![*value; x.nrows()],
            Regressor::Tree { tree } => tree.predict_scalar(x),
            Regressor::Forest { forest } => forest.predict_scalar(x),
            Regressor::Boosted { model } => model.predict(x),
        }
    }

    /// Normalized impurity-based importances; `None` for the constant model.
    pub fn feature_importances(&self) -> Option<Vec<f64>> {
        match self {
            Regressor::Constant { .. } => None,
            Regressor::Tree { tree } => Some(tree::normalize_importances(tree.raw_importances().to_vec())),
            Regressor::Forest { forest } => Some(forest.feature_importances()),
            Regressor::Boosted { model } => Some(model.feature_importances()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum Classifier {
    Constant { probabilities: Vec<f64> },
    Tree { tree: Tree, n_classes: usize },
    Forest { forest: Forest, n_classes: usize },
    Boosted { model: BoostedClassifier },
}

impl Classifier {
    pub fn n_classes(&self) -> usize {
        match self {
            Classifier::Constant { probabilities } => probabilities.len(),
            Classifier::Tree { n_classes, .. } | Classifier::Forest { n_classes, .. } => *n_classes,
            Classifier::Boosted { model } => model.n_classes(),
        }
    }

    pub fn predict_proba(&self, x: &DMatrix<f64>) -> Vec<Vec<f64>> {
        match self {
            Classifier::Constant { probabilities } => vec![probabilities.clone(); x.nrows()],
            Classifier::Tree { tree, .. } => (0..x.nrows()).map(|i| tree.predict_row(x, i).to_vec()).collect(),
            Classifier::Forest { forest, n_classes } => forest.predict_proba(x, *n_classes),
            Classifier::Boosted { model } => model.predict_proba(x),
        }
    }

    /// Most probable class per row; ties go to the lower class id.
    pub fn predict(&self, x: &DMatrix<f64>) -> Vec<usize> {
        self.predict_proba(x).iter().map(|p| argmax(p)).collect()
    }
}

pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}
