//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during training and scoring
//! - persisted inside the model bundle
//! - emitted in JSON responses

use std::fmt;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AppError;

/// Discretized risk class. The declaration order is the class id order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskCategory {
    #[serde(rename = "Low Risk")]
    Low,
    #[serde(rename = "Medium Risk")]
    Medium,
    #[serde(rename = "High Risk")]
    High,
    #[serde(rename = "Very High Risk")]
    VeryHigh,
}

impl RiskCategory {
    pub const ALL: [RiskCategory; 4] = [
        RiskCategory::Low,
        RiskCategory::Medium,
        RiskCategory::High,
        RiskCategory::VeryHigh,
    ];

    pub fn label(self) -> &'static str {
        match self {
            RiskCategory::Low => "Low Risk",
            RiskCategory::Medium => "Medium Risk",
            RiskCategory::High => "High Risk",
            RiskCategory::VeryHigh => "Very High Risk",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.into_iter().find(|c| c.label() == label)
    }

    pub fn class_id(self) -> usize {
        self as usize
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Upper PD bounds for Low / Medium / High; anything above `high` is Very High.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PdThresholds {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl Default for PdThresholds {
    fn default() -> Self {
        Self {
            low: 0.18,
            medium: 0.42,
            high: 0.68,
        }
    }
}

impl PdThresholds {
    /// Risk category implied by a PD value (bounds are inclusive).
    pub fn category_for(&self, pd: f64) -> RiskCategory {
        if pd <= self.low {
            RiskCategory::Low
        } else if pd <= self.medium {
            RiskCategory::Medium
        } else if pd <= self.high {
            RiskCategory::High
        } else {
            RiskCategory::VeryHigh
        }
    }
}

/// Loan products known to the one-hot encoder, in indicator-column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoanType {
    Personal,
    Home,
    Auto,
    Education,
    Business,
    CreditCard,
    Gold,
}

impl LoanType {
    pub const ALL: [LoanType; 7] = [
        LoanType::Personal,
        LoanType::Home,
        LoanType::Auto,
        LoanType::Education,
        LoanType::Business,
        LoanType::CreditCard,
        LoanType::Gold,
    ];

    pub fn label(self) -> &'static str {
        match self {
            LoanType::Personal => "personal loan",
            LoanType::Home => "home loan",
            LoanType::Auto => "auto loan",
            LoanType::Education => "education loan",
            LoanType::Business => "business loan",
            LoanType::CreditCard => "credit card",
            LoanType::Gold => "gold loan",
        }
    }

    /// Indicator column name, e.g. `loan_type_personal_loan`.
    pub fn column(self) -> &'static str {
        match self {
            LoanType::Personal => "loan_type_personal_loan",
            LoanType::Home => "loan_type_home_loan",
            LoanType::Auto => "loan_type_auto_loan",
            LoanType::Education => "loan_type_education_loan",
            LoanType::Business => "loan_type_business_loan",
            LoanType::CreditCard => "loan_type_credit_card",
            LoanType::Gold => "loan_type_gold_loan",
        }
    }

    /// Exact, case-sensitive lookup. Any other spelling is out of vocabulary.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.label() == label)
    }

    /// Secured products (backed by the financed asset).
    pub fn is_secured(self) -> bool {
        matches!(self, LoanType::Home | LoanType::Auto | LoanType::Gold)
    }
}

/// One raw applicant row as decoded from the request, in source column order.
///
/// Values are JSON scalars: numbers, strings, booleans or null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(Map<String, Value>);

impl RawRecord {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn insert(&mut self, column: impl Into<String>, value: Value) {
        self.0.insert(column.into(), value);
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value.into());
        self
    }

    /// Value of a column, treating JSON null as absent.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column).filter(|v| !v.is_null())
    }

    pub fn has(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn columns(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Which model families to train and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FamilyKind {
    /// Gradient-boosted trees.
    Gbt,
    /// Bagged trees (random forest).
    Forest,
    /// Single CART tree.
    Tree,
    /// Constant predictor (mean PD, majority class).
    Baseline,
}

impl FamilyKind {
    /// Display name used in reports and bundle metadata.
    pub fn display_name(self) -> &'static str {
        match self {
            FamilyKind::Gbt => "GradientBoosting",
            FamilyKind::Forest => "RandomForest",
            FamilyKind::Tree => "DecisionTree",
            FamilyKind::Baseline => "Baseline",
        }
    }
}

/// A full training run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub data_path: PathBuf,
    pub test_path: Option<PathBuf>,
    pub bundle_out: PathBuf,
    pub seed: u64,
    pub eval_fraction: f64,
    pub cv_folds: usize,
    pub families: Vec<FamilyKind>,

    pub gbt_rounds: usize,
    pub gbt_learning_rate: f64,
    pub gbt_max_depth: usize,
    pub gbt_subsample: f64,

    pub forest_trees: usize,
    pub forest_max_depth: usize,

    pub tree_max_depth: usize,
}

impl TrainConfig {
    /// A config with the documented defaults for everything but the paths.
    pub fn new(data_path: impl Into<PathBuf>, bundle_out: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            test_path: None,
            bundle_out: bundle_out.into(),
            seed: 42,
            eval_fraction: 0.25,
            cv_folds: 5,
            families: Vec::new(),
            gbt_rounds: 200,
            gbt_learning_rate: 0.05,
            gbt_max_depth: 6,
            gbt_subsample: 0.85,
            forest_trees: 150,
            forest_max_depth: 18,
            tree_max_depth: 15,
        }
    }

    /// Check ranges. Failures are configuration errors (exit code 2).
    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.eval_fraction > 0.0 && self.eval_fraction < 1.0) {
            return Err(AppError::new(2, "eval fraction must be in (0, 1)."));
        }
        if self.cv_folds < 2 {
            return Err(AppError::new(2, "cv folds must be at least 2."));
        }
        if self.gbt_rounds == 0 || self.forest_trees == 0 {
            return Err(AppError::new(2, "gbt rounds and forest trees must be positive."));
        }
        if !(self.gbt_learning_rate > 0.0 && self.gbt_learning_rate <= 1.0) {
            return Err(AppError::new(2, "gbt learning rate must be in (0, 1]."));
        }
        if !(self.gbt_subsample > 0.0 && self.gbt_subsample <= 1.0) {
            return Err(AppError::new(2, "gbt subsample must be in (0, 1]."));
        }
        if self.gbt_max_depth == 0 || self.forest_max_depth == 0 || self.tree_max_depth == 0 {
            return Err(AppError::new(2, "tree depths must be positive."));
        }
        Ok(())
    }
}
