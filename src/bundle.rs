//! The persisted model bundle.
//!
//! A bundle is the only coupling point between the training job and the scoring
//! side. It is created once by `app::pipeline::run_training`, written as JSON, and
//! loaded read-only. Nothing mutates a bundle after construction; a new model is
//! deployed by swapping the whole bundle (see `service::ModelService`).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{PdThresholds, RiskCategory};
use crate::features::FeatureSchema;
use crate::fit::CandidateMetrics;
use crate::math::StandardScaler;
use crate::models::{Classifier, Regressor};

/// Version of the on-disk layout. Bump when fields change incompatibly.
pub const BUNDLE_FORMAT_VERSION: u32 = 1;

pub const MODEL_VERSION: &str = "tree_family_comparison_with_loan_types";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleMetadata {
    pub model_version: String,
    pub winning_model: String,
    pub created_at: DateTime<Utc>,
    /// `[rows, features]` of the training matrix.
    pub train_shape: [usize; 2],
    /// `[rows, features]` of the optional test matrix.
    pub test_shape: Option<[usize; 2]>,
    pub feature_count: usize,
    pub risk_mapping: BTreeMap<String, usize>,
    pub pd_thresholds: PdThresholds,
    pub loan_type_features: Vec<String>,
    pub enhanced_features: Vec<String>,
    pub seed: u64,
    pub eval_fraction: f64,
    pub cv_folds: usize,
    /// Holdout metrics of every candidate (pre-refit).
    pub candidate_metrics: Vec<CandidateMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pub format_version: u32,
    pub scaler: StandardScaler,
    pub regressor: Regressor,
    pub classifier: Classifier,
    pub schema: FeatureSchema,
    /// Index = classifier class id.
    pub risk_labels: Vec<RiskCategory>,
    pub metadata: BundleMetadata,
}

impl ModelBundle {
    /// Check internal consistency (widths and label count). Returns a description
    /// of the first problem found.
    pub fn check(&self) -> Result<(), String> {
        if self.format_version != BUNDLE_FORMAT_VERSION {
            return Err(format!(
                "unsupported bundle format version {} (expected {BUNDLE_FORMAT_VERSION})",
                self.format_version
            ));
        }
        if self.scaler.n_features() != self.schema.len() {
            return Err(format!(
                "scaler has {} features but schema lists {}",
                self.scaler.n_features(),
                self.schema.len()
            ));
        }
        if self.classifier.n_classes() != self.risk_labels.len() {
            return Err(format!(
                "classifier has {} classes but bundle lists {} risk labels",
                self.classifier.n_classes(),
                self.risk_labels.len()
            ));
        }
        if self.risk_labels.is_empty() {
            return Err("bundle has no risk labels".to_string());
        }
        Ok(())
    }

    /// Map a classifier class id to its label. Out-of-range ids clamp to the last label.
    pub fn label_for(&self, class_id: usize) -> RiskCategory {
        let last = self.risk_labels.len().saturating_sub(1);
        self.risk_labels
            .get(class_id.min(last))
            .copied()
            .unwrap_or(RiskCategory::VeryHigh)
    }

    pub fn risk_mapping(labels: &[RiskCategory]) -> BTreeMap<String, usize> {
        labels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.label().to_string(), i))
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Small hand-built bundles for scoring tests.

    use super::*;
    use nalgebra::DMatrix;

    /// A bundle over the standard schema with constant models.
    pub fn constant_bundle(pd: f64, class_id: usize) -> ModelBundle {
        let schema = FeatureSchema::standard();
        let width = schema.len();
        let scaler = StandardScaler::fit(&DMatrix::from_fn(2, width, |i, _| i as f64)).unwrap();
        let mut probabilities = vec![0.0; 4];
        probabilities[class_id] = 1.0;
        let labels = RiskCategory::ALL.to_vec();

        ModelBundle {
            format_version: BUNDLE_FORMAT_VERSION,
            scaler,
            regressor: Regressor::Constant { value: pd },
            classifier: Classifier::Constant { probabilities },
            metadata: BundleMetadata {
                model_version: MODEL_VERSION.to_string(),
                winning_model: "Baseline".to_string(),
                created_at: Utc::now(),
                train_shape: [2, width],
                test_shape: None,
                feature_count: width,
                risk_mapping: ModelBundle::risk_mapping(&labels),
                pd_thresholds: PdThresholds::default(),
                loan_type_features: schema.loan_type_features(),
                enhanced_features: schema.enhanced_features(),
                seed: 42,
                eval_fraction: 0.25,
                cv_folds: 5,
                candidate_metrics: Vec::new(),
            },
            schema,
            risk_labels: labels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::constant_bundle;
    use super::*;

    #[test]
    fn consistent_bundle_passes_check() {
        let b = constant_bundle(0.3, 1);
        assert!(b.check().is_ok());
        assert_eq!(b.label_for(1), RiskCategory::Medium);
        assert_eq!(b.label_for(99), RiskCategory::VeryHigh);
        assert_eq!(b.metadata.risk_mapping["High Risk"], 2);
    }

    #[test]
    fn version_and_width_mismatches_are_reported() {
        let mut b = constant_bundle(0.3, 1);
        b.format_version = 0;
        assert!(b.check().unwrap_err().contains("format version"));

        let mut b = constant_bundle(0.3, 1);
        b.risk_labels.pop();
        assert!(b.check().unwrap_err().contains("risk labels"));
    }
}
