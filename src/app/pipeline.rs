//! Shared training and scoring workflows used by the CLI handlers.
//!
//! Training:
//! load labeled file -> validate -> derive (seeded) -> project (standard schema)
//! -> select/refit -> bundle -> optional test scoring -> write bundle
//!
//! Scoring fans independent input files out over rayon against one shared
//! `ModelService`; each file is its own all-or-nothing batch.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rayon::prelude::*;
use serde_json::Value;
use tracing::info;

use crate::bundle::{BUNDLE_FORMAT_VERSION, BundleMetadata, MODEL_VERSION, ModelBundle};
use crate::domain::{PdThresholds, RawRecord, RiskCategory, TrainConfig};
use crate::error::{AppError, ScoringError};
use crate::features::FeatureSchema;
use crate::fit::{HoldoutSnapshot, SelectionOptions, families_from_config, select_best};
use crate::inference::{derive_batch, predict, project, validate};
use crate::io::{load_records, parse_labels, write_bundle_json};
use crate::math::{ClassMetrics, classification_report};
use crate::report::{LoanTypeAnalysis, loan_type_analysis, risk_distribution};
use crate::service::{ModelService, OutputVariant};

/// Scoring summary of the optional test file.
#[derive(Debug, Clone, PartialEq)]
pub struct TestSummary {
    pub rows: usize,
    pub distribution: [usize; 4],
    pub mean_pd: f64,
    pub threshold_disagreements: usize,
    pub loan_types: LoanTypeAnalysis,
}

/// Everything a training run produced.
#[derive(Debug, Clone)]
pub struct TrainingRun {
    pub bundle: ModelBundle,
    /// Winner's holdout predictions before the refit.
    pub holdout: HoldoutSnapshot,
    /// Per-class metrics of the winner's holdout predictions, class-id order.
    pub classification: Vec<ClassMetrics>,
    /// Normalized importances of the refit regressor, schema order.
    pub importances: Option<Vec<f64>>,
    pub train_distribution: [usize; 4],
    pub test: Option<TestSummary>,
}

/// Train from the files named in `config` and write the bundle.
pub fn run_training(config: &TrainConfig) -> Result<TrainingRun, AppError> {
    config.validate()?;

    let records = load_records(&config.data_path)?;
    info!(path = %config.data_path.display(), rows = records.len(), "loaded training data");

    let test_records = match &config.test_path {
        Some(path) => {
            let rows = load_records(path)?;
            info!(path = %path.display(), rows = rows.len(), "loaded test data");
            Some(rows)
        }
        None => None,
    };

    let run = train_on_records(config, &records, test_records.as_deref())?;
    write_bundle_json(&config.bundle_out, &run.bundle)?;
    info!(path = %config.bundle_out.display(), "bundle written");
    Ok(run)
}

/// Train on in-memory records. Does not touch the filesystem.
pub fn train_on_records(
    config: &TrainConfig,
    records: &[RawRecord],
    test_records: Option<&[RawRecord]>,
) -> Result<TrainingRun, AppError> {
    config.validate()?;

    validate(records)?;
    let labels = parse_labels(records)?;
    let derived = derive_batch(records, config.seed)?;

    let schema = FeatureSchema::standard();
    let x = project(&schema, &derived)?;
    let risk_labels = RiskCategory::ALL.to_vec();
    let classes: Vec<usize> = labels.categories.iter().map(|c| c.class_id()).collect();

    let learners = families_from_config(config);
    let options = SelectionOptions {
        eval_fraction: config.eval_fraction,
        cv_folds: config.cv_folds,
        seed: config.seed,
    };
    let selection = select_best(&x, &labels.pd, &classes, risk_labels.len(), &learners, &options)?;
    let classification = classification_report(
        &selection.holdout.class_truth,
        &selection.holdout.class_predicted,
        risk_labels.len(),
    );

    let mut bundle = ModelBundle {
        format_version: BUNDLE_FORMAT_VERSION,
        scaler: selection.scaler,
        regressor: selection.regressor,
        classifier: selection.classifier,
        metadata: BundleMetadata {
            model_version: MODEL_VERSION.to_string(),
            winning_model: selection.winner,
            created_at: Utc::now(),
            train_shape: [x.nrows(), x.ncols()],
            test_shape: None,
            feature_count: schema.len(),
            risk_mapping: ModelBundle::risk_mapping(&risk_labels),
            pd_thresholds: PdThresholds::default(),
            loan_type_features: schema.loan_type_features(),
            enhanced_features: schema.enhanced_features(),
            seed: config.seed,
            eval_fraction: config.eval_fraction,
            cv_folds: config.cv_folds,
            candidate_metrics: selection.candidates,
        },
        schema,
        risk_labels,
    };
    bundle
        .check()
        .map_err(|e| AppError::new(4, format!("Trained bundle is inconsistent: {e}")))?;

    let test = match test_records {
        Some(rows) => {
            let batch = predict(rows, &bundle, config.seed)?;
            bundle.metadata.test_shape = Some([rows.len(), bundle.schema.len()]);
            let categories: Vec<RiskCategory> = batch.rows.iter().map(|r| r.risk_category).collect();
            let mean_pd =
                batch.rows.iter().map(|r| r.probability_of_default).sum::<f64>() / batch.rows.len() as f64;
            Some(TestSummary {
                rows: batch.rows.len(),
                distribution: risk_distribution(&categories),
                mean_pd,
                threshold_disagreements: batch.threshold_disagreements,
                loan_types: loan_type_analysis(&batch.rows),
            })
        }
        None => None,
    };

    Ok(TrainingRun {
        train_distribution: risk_distribution(&labels.categories),
        bundle,
        holdout: selection.holdout,
        classification,
        importances: selection.importances,
        test,
    })
}

/// Result of scoring one input file.
#[derive(Debug)]
pub struct ScoredFile {
    pub path: PathBuf,
    pub outcome: Result<Value, ScoringError>,
}

/// Score each input file in parallel. Output order follows `inputs`.
pub fn run_scoring(service: &ModelService, inputs: &[PathBuf], seed: u64, variant: OutputVariant) -> Vec<ScoredFile> {
    inputs
        .par_iter()
        .map(|path| ScoredFile {
            path: path.clone(),
            outcome: score_file(service, path, seed, variant),
        })
        .collect()
}

fn score_file(service: &ModelService, path: &Path, seed: u64, variant: OutputVariant) -> Result<Value, ScoringError> {
    // Fail fast on a missing model before reading the file.
    service.current()?;
    let records = load_records(path)?;
    service.analyze(&records, seed, variant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::generate;
    use crate::domain::FamilyKind;
    use crate::domain::columns as col;
    use crate::output::OUTPUT_COLUMNS;

    fn small_config() -> TrainConfig {
        let mut config = TrainConfig::new("unused.csv", "unused.json");
        config.families = vec![FamilyKind::Tree, FamilyKind::Forest, FamilyKind::Baseline];
        config.forest_trees = 12;
        config.forest_max_depth = 6;
        config.tree_max_depth = 5;
        config.cv_folds = 3;
        config
    }

    #[test]
    fn training_then_scoring_end_to_end() {
        let train = generate(240, 11).unwrap();
        let test = generate(30, 12).unwrap();
        let run = train_on_records(&small_config(), &train, Some(&test)).unwrap();

        let meta = &run.bundle.metadata;
        assert_eq!(meta.train_shape, [240, 41]);
        assert_eq!(meta.test_shape, Some([30, 41]));
        assert_eq!(meta.feature_count, 41);
        assert_eq!(meta.candidate_metrics.len(), 3);
        assert!(["DecisionTree", "RandomForest", "Baseline"].contains(&meta.winning_model.as_str()));
        assert_eq!(run.train_distribution.iter().sum::<usize>(), 240);
        assert_eq!(run.test.as_ref().map(|t| t.rows), Some(30));
        assert_eq!(run.classification.len(), 4);
        let holdout_rows: usize = run.classification.iter().map(|m| m.support).sum();
        assert_eq!(holdout_rows, run.holdout.class_truth.len());

        let loan_types = &run.test.as_ref().unwrap().loan_types;
        assert_eq!(loan_types.secured + loan_types.unsecured, 30);
        assert_eq!(loan_types.unknown, 0);
        assert_eq!(loan_types.distribution.iter().map(|(_, n)| n).sum::<usize>(), 30);

        let service = ModelService::from_bundle(run.bundle).unwrap();
        let row = RawRecord::new()
            .with(col::AGE, 35)
            .with(col::MONTHLY_INCOME, 50000)
            .with(col::OUTSTANDING_LOAN, 20000);
        let body = service.analyze(&[row], 42, OutputVariant::Strict).unwrap();
        let r = body[0].as_object().unwrap();
        assert_eq!(r.len(), OUTPUT_COLUMNS.len());
        let pd = r[col::PROBABILITY_OF_DEFAULT].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&pd));
        let label = r[col::RISK_CATEGORY].as_str().unwrap();
        assert!(RiskCategory::from_label(label).is_some());
    }

    #[test]
    fn unlabeled_training_rows_are_rejected() {
        let rows = vec![
            RawRecord::new()
                .with(col::AGE, 35)
                .with(col::MONTHLY_INCOME, 50000)
                .with(col::OUTSTANDING_LOAN, 20000);
            12
        ];
        let err = train_on_records(&small_config(), &rows, None).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains(col::PROBABILITY_OF_DEFAULT));
    }

    #[test]
    fn scoring_files_keeps_input_order_and_isolates_failures() {
        let dir = std::env::temp_dir();
        let good = dir.join(format!("crisk_pipeline_good_{}.json", std::process::id()));
        let bad = dir.join(format!("crisk_pipeline_bad_{}.parquet", std::process::id()));
        std::fs::write(
            &good,
            r#"[{"age": 30, "monthly_income_inr": 40000, "outstanding_loan_amount_inr": 5000}]"#,
        )
        .unwrap();

        let service = ModelService::from_bundle(crate::bundle::testing::constant_bundle(0.2, 1)).unwrap();
        let results = run_scoring(&service, &[bad.clone(), good.clone()], 42, OutputVariant::Legacy);
        assert_eq!(results[0].path, bad);
        assert!(matches!(
            results[0].outcome,
            Err(ScoringError::UnsupportedInputFormat { .. })
        ));
        let body = results[1].outcome.as_ref().unwrap();
        assert_eq!(body["processed_rows"], 1);

        let _ = std::fs::remove_file(&good);
    }
}
