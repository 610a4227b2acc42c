//! Serving-side model lifecycle.
//!
//! `ModelService` owns the currently deployed bundle behind `RwLock<Option<Arc<_>>>`.
//! Readers clone the `Arc` and release the lock before scoring, so a `reload`
//! never waits on a running batch and a running batch never sees a half-swapped
//! bundle.

use std::path::Path;
use std::sync::{Arc, RwLock};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::bundle::ModelBundle;
use crate::domain::RawRecord;
use crate::error::{AppError, ScoringError, Stage};
use crate::inference::predict;
use crate::io::read_bundle_json;
use crate::output::{legacy_response, strict_response};

/// Response layout for `analyze`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputVariant {
    /// Fixed 56-field records.
    #[default]
    Strict,
    /// `{status, data, processed_rows}` with every input column kept.
    Legacy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    /// `healthy` or `degraded`.
    pub status: &'static str,
    pub model_loaded: bool,
    pub timestamp: String,
    #[serde(skip)]
    pub http_status: u16,
}

#[derive(Debug, Default)]
pub struct ModelService {
    bundle: RwLock<Option<Arc<ModelBundle>>>,
}

impl ModelService {
    /// A service with no bundle (degraded until `reload`).
    pub fn new_empty() -> Self {
        Self::default()
    }

    /// A service serving `bundle`, which must pass `ModelBundle::check`.
    pub fn from_bundle(bundle: ModelBundle) -> Result<Self, AppError> {
        let service = Self::new_empty();
        service.swap(bundle)?;
        Ok(service)
    }

    /// Load `path`, logging and staying degraded on failure.
    pub fn load_or_degrade(path: &Path) -> Self {
        let service = Self::new_empty();
        if let Err(err) = service.reload(path) {
            warn!(path = %path.display(), error = %err, "model bundle not loaded; service degraded");
        }
        service
    }

    /// The deployed bundle, or `ModelNotLoaded`.
    pub fn current(&self) -> Result<Arc<ModelBundle>, ScoringError> {
        let guard = self.bundle.read().map_err(|_| poisoned())?;
        guard.as_ref().cloned().ok_or(ScoringError::ModelNotLoaded)
    }

    pub fn is_loaded(&self) -> bool {
        self.bundle.read().map(|g| g.is_some()).unwrap_or(false)
    }

    /// Replace the deployed bundle. Returns the previous one, if any.
    ///
    /// An inconsistent bundle is rejected (exit 2) and the current one stays deployed.
    pub fn swap(&self, bundle: ModelBundle) -> Result<Option<Arc<ModelBundle>>, AppError> {
        bundle
            .check()
            .map_err(|e| AppError::new(2, format!("Inconsistent bundle: {e}")))?;
        let mut guard = self.bundle.write().map_err(|_| poisoned())?;
        Ok(guard.replace(Arc::new(bundle)))
    }

    /// Read a bundle from disk and deploy it. The current bundle stays in place
    /// when reading fails.
    pub fn reload(&self, path: &Path) -> Result<(), AppError> {
        let bundle = read_bundle_json(path)?;
        let winner = bundle.metadata.winning_model.clone();
        let features = bundle.schema.len();
        self.swap(bundle)?;
        info!(path = %path.display(), winner = %winner, features, "model bundle loaded");
        Ok(())
    }

    /// Score one batch and compose the response body.
    pub fn analyze(&self, records: &[RawRecord], seed: u64, variant: OutputVariant) -> Result<Value, ScoringError> {
        let bundle = self.current()?;
        let batch = predict(records, &bundle, seed)?;
        Ok(match variant {
            OutputVariant::Strict => strict_response(&batch),
            OutputVariant::Legacy => legacy_response(&batch),
        })
    }

    /// Schema and metadata of the deployed bundle.
    pub fn model_info(&self) -> Result<Value, ScoringError> {
        let bundle = self.current()?;
        let meta = &bundle.metadata;
        let labels: Vec<&str> = bundle.risk_labels.iter().map(|l| l.label()).collect();
        Ok(json!({
            "features": bundle.schema.names(),
            "risk_labels": labels,
            "feature_count": bundle.schema.len(),
            "model_version": meta.model_version,
            "winning_model": meta.winning_model,
            "enhanced_features": meta.enhanced_features,
            "pd_thresholds": meta.pd_thresholds,
            "train_shape": meta.train_shape,
            "test_shape": meta.test_shape,
            "created_at": meta.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }))
    }

    pub fn health(&self) -> HealthReport {
        let loaded = self.is_loaded();
        HealthReport {
            status: if loaded { "healthy" } else { "degraded" },
            model_loaded: loaded,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            http_status: if loaded { 200 } else { 503 },
        }
    }
}

fn poisoned() -> ScoringError {
    ScoringError::UnclassifiedProcessingError {
        stage: Stage::Predict,
        detail: "model lock poisoned".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::testing::constant_bundle;
    use crate::domain::columns as col;
    use crate::io::write_bundle_json;

    fn applicant() -> RawRecord {
        RawRecord::new()
            .with(col::AGE, 41)
            .with(col::MONTHLY_INCOME, 82000)
            .with(col::OUTSTANDING_LOAN, 150000)
    }

    #[test]
    fn empty_service_is_degraded_and_refuses_to_score() {
        let service = ModelService::new_empty();
        let health = service.health();
        assert_eq!(health.status, "degraded");
        assert!(!health.model_loaded);
        assert_eq!(health.http_status, 503);

        let err = service.analyze(&[applicant()], 42, OutputVariant::Strict).unwrap_err();
        assert_eq!(err, ScoringError::ModelNotLoaded);
        assert_eq!(service.model_info().unwrap_err().status(), 503);
    }

    #[test]
    fn loaded_service_scores_both_variants() {
        let service = ModelService::from_bundle(constant_bundle(0.55, 2)).unwrap();
        assert_eq!(service.health().http_status, 200);

        let strict = service.analyze(&[applicant()], 42, OutputVariant::Strict).unwrap();
        assert_eq!(strict[0][col::RISK_CATEGORY], "High Risk");

        let legacy = service.analyze(&[applicant()], 42, OutputVariant::Legacy).unwrap();
        assert_eq!(legacy["processed_rows"], 1);
        assert_eq!(legacy["data"][0][col::RISK_SCORE], 55.0);
    }

    #[test]
    fn model_info_reports_schema_and_thresholds() {
        let service = ModelService::from_bundle(constant_bundle(0.1, 0)).unwrap();
        let info = service.model_info().unwrap();
        assert_eq!(info["feature_count"], 41);
        assert_eq!(info["features"].as_array().unwrap().len(), 41);
        assert_eq!(info["risk_labels"][3], "Very High Risk");
        assert_eq!(info["pd_thresholds"]["medium"], 0.42);
        assert!(info["test_shape"].is_null());
    }

    #[test]
    fn failed_reload_keeps_the_current_bundle() {
        let service = ModelService::from_bundle(constant_bundle(0.1, 0)).unwrap();
        let missing = std::env::temp_dir().join("crisk_service_missing_bundle.json");
        assert!(service.reload(&missing).is_err());
        assert!(service.is_loaded());
    }

    #[test]
    fn reload_from_disk_replaces_the_bundle() {
        let path = std::env::temp_dir().join(format!("crisk_service_reload_{}.json", std::process::id()));
        write_bundle_json(&path, &constant_bundle(0.8, 3)).unwrap();

        let service = ModelService::load_or_degrade(&path);
        assert!(service.is_loaded());
        let body = service.analyze(&[applicant()], 1, OutputVariant::Strict).unwrap();
        assert_eq!(body[0][col::RISK_CATEGORY], "Very High Risk");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn inconsistent_bundles_are_never_installed() {
        let mut bad = constant_bundle(0.9, 3);
        bad.risk_labels.pop();
        assert_eq!(ModelService::from_bundle(bad.clone()).unwrap_err().exit_code(), 2);

        let service = ModelService::from_bundle(constant_bundle(0.1, 0)).unwrap();
        assert!(service.swap(bad).is_err());
        let body = service.analyze(&[applicant()], 1, OutputVariant::Strict).unwrap();
        assert_eq!(body[0][col::RISK_CATEGORY], "Low Risk");

        let previous = service.swap(constant_bundle(0.8, 3)).unwrap();
        let previous = previous.map(|b| b.metadata.winning_model.clone());
        assert_eq!(previous.as_deref(), Some("Baseline"));
    }
}
