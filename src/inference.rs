//! Batch scoring against a loaded bundle.
//!
//! Per call: `Validate -> Derive -> Project -> Predict -> Compose`. The batch either
//! scores completely or fails with one `ScoringError`; no row is skipped.
//!
//! Derivation uses the same `features::derive` contract as training. The bundle's
//! schema decides which features reach the model and in which order.

use std::time::Instant;

use nalgebra::DMatrix;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::bundle::ModelBundle;
use crate::domain::columns as col;
use crate::domain::{RawRecord, RiskCategory};
use crate::error::{ScoringError, Stage};
use crate::features::{DerivedRecord, FeatureSchema, derive};

/// Default seed for the score-imputation stream.
pub const DEFAULT_IMPUTATION_SEED: u64 = 42;

/// One scored applicant.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub raw: RawRecord,
    pub derived: DerivedRecord,
    /// Regressor output, not clamped.
    pub probability_of_default: f64,
    /// Classifier output mapped through the bundle's label list.
    pub risk_category: RiskCategory,
    pub risk_score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredBatch {
    pub rows: Vec<ScoredRecord>,
    /// Rows where the classifier's category differs from the PD-threshold category.
    pub threshold_disagreements: usize,
}

/// `round(pd * 100, 1)` with ties to even.
pub fn risk_score(pd: f64) -> f64 {
    (pd * 100.0 * 10.0).round_ties_even() / 10.0
}

/// Reject empty batches and batches missing a required column.
///
/// A required column counts as missing when any row lacks a usable value for it.
pub fn validate(records: &[RawRecord]) -> Result<(), ScoringError> {
    if records.is_empty() {
        return Err(ScoringError::EmptyInput);
    }

    let missing: Vec<String> = col::REQUIRED
        .iter()
        .filter(|c| records.iter().any(|r| !r.has(c)))
        .map(|c| c.to_string())
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    let mut available: Vec<String> = Vec::new();
    for r in records {
        for c in r.columns() {
            if !available.contains(c) {
                available.push(c.clone());
            }
        }
    }
    Err(ScoringError::MissingRequiredColumns { missing, available })
}

/// Derive every row with one seeded imputation stream, in row order.
pub fn derive_batch(records: &[RawRecord], seed: u64) -> Result<Vec<DerivedRecord>, ScoringError> {
    let mut rng = StdRng::seed_from_u64(seed);
    records
        .iter()
        .enumerate()
        .map(|(row, r)| derive(r, row, &mut rng))
        .collect()
}

/// Build the model matrix in schema order.
pub fn project(schema: &FeatureSchema, derived: &[DerivedRecord]) -> Result<DMatrix<f64>, ScoringError> {
    let width = schema.len();
    let mut data = Vec::with_capacity(derived.len() * width);
    for d in derived {
        data.extend(schema.project(d)?);
    }
    Ok(DMatrix::from_row_slice(derived.len(), width, &data))
}

/// Score a batch of raw records.
pub fn predict(records: &[RawRecord], bundle: &ModelBundle, seed: u64) -> Result<ScoredBatch, ScoringError> {
    let started = Instant::now();

    validate(records)?;
    let derived = derive_batch(records, seed)?;
    let imputed: usize = derived
        .iter()
        .map(|d| d.imputed_scores.iter().filter(|&&b| b).count())
        .sum();
    debug!(rows = derived.len(), imputed_scores = imputed, "derived features");

    let x = project(&bundle.schema, &derived)?;
    let z = bundle
        .scaler
        .transform(&x)
        .ok_or_else(|| ScoringError::UnclassifiedProcessingError {
            stage: Stage::Predict,
            detail: format!(
                "scaler expects {} features, matrix has {}",
                bundle.scaler.n_features(),
                x.ncols()
            ),
        })?;

    let pd = bundle.regressor.predict(&z);
    let classes = bundle.classifier.predict(&z);
    if let Some(row) = pd.iter().position(|v| !v.is_finite()) {
        return Err(ScoringError::UnclassifiedProcessingError {
            stage: Stage::Predict,
            detail: format!("regressor produced a non-finite PD for row {row}"),
        });
    }

    let thresholds = bundle.metadata.pd_thresholds;
    let mut disagreements = 0;
    let rows: Vec<ScoredRecord> = records
        .iter()
        .zip(derived)
        .zip(pd.into_iter().zip(classes))
        .map(|((raw, derived), (pd, class_id))| {
            let risk_category = bundle.label_for(class_id);
            if thresholds.category_for(pd) != risk_category {
                disagreements += 1;
            }
            ScoredRecord {
                raw: raw.clone(),
                derived,
                probability_of_default: pd,
                risk_category,
                risk_score: risk_score(pd),
            }
        })
        .collect();

    if disagreements > 0 {
        warn!(
            rows = rows.len(),
            disagreements, "classifier risk category differs from PD thresholds"
        );
    }
    info!(
        rows = rows.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "scored batch"
    );

    Ok(ScoredBatch {
        rows,
        threshold_disagreements: disagreements,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::testing::constant_bundle;

    fn applicant() -> RawRecord {
        RawRecord::new()
            .with(col::AGE, 35)
            .with(col::MONTHLY_INCOME, 50000)
            .with(col::OUTSTANDING_LOAN, 20000)
    }

    #[test]
    fn risk_score_rounds_half_to_even() {
        assert_eq!(risk_score(0.1234), 12.3);
        assert_eq!(risk_score(0.5), 50.0);
        assert_eq!(risk_score(0.0625), 6.2);
        assert_eq!(risk_score(0.1875), 18.8);
        assert_eq!(risk_score(1.2), 120.0);
    }

    #[test]
    fn missing_age_lists_exactly_age() {
        let records = vec![RawRecord::new()
            .with(col::MONTHLY_INCOME, 50000)
            .with(col::OUTSTANDING_LOAN, 20000)];
        let err = predict(&records, &constant_bundle(0.2, 0), 42).unwrap_err();
        match err {
            ScoringError::MissingRequiredColumns { missing, available } => {
                assert_eq!(missing, vec!["age".to_string()]);
                assert_eq!(available, vec![col::MONTHLY_INCOME.to_string(), col::OUTSTANDING_LOAN.to_string()]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn one_bad_row_fails_the_whole_batch() {
        let records = vec![applicant(), applicant().with(col::MONTHLY_INCOME, 0)];
        let err = predict(&records, &constant_bundle(0.2, 0), 42).unwrap_err();
        assert!(matches!(err, ScoringError::ZeroDivisor { row: 1, .. }));

        let partial = vec![applicant(), RawRecord::new().with(col::AGE, 50)];
        assert!(matches!(
            predict(&partial, &constant_bundle(0.2, 0), 42),
            Err(ScoringError::MissingRequiredColumns { .. })
        ));
    }

    #[test]
    fn empty_batch_is_rejected() {
        assert_eq!(validate(&[]).unwrap_err(), ScoringError::EmptyInput);
    }

    #[test]
    fn classifier_is_the_category_source_and_disagreements_are_counted() {
        // PD 0.9 implies Very High, but the classifier says Low.
        let batch = predict(&[applicant(), applicant()], &constant_bundle(0.9, 0), 42).unwrap();
        assert_eq!(batch.rows.len(), 2);
        assert_eq!(batch.rows[0].risk_category, RiskCategory::Low);
        assert_eq!(batch.rows[0].risk_score, 90.0);
        assert_eq!(batch.threshold_disagreements, 2);
    }

    #[test]
    fn same_seed_same_imputed_scores() {
        let bundle = constant_bundle(0.2, 0);
        let a = predict(&[applicant()], &bundle, 7).unwrap();
        let b = predict(&[applicant()], &bundle, 7).unwrap();
        assert_eq!(a.rows[0].derived.scores, b.rows[0].derived.scores);
    }

    #[test]
    fn projection_error_names_the_missing_feature() {
        let mut bundle = constant_bundle(0.2, 0);
        bundle.schema = FeatureSchema::try_from(vec!["age".to_string(), "credit_score".to_string()]).unwrap();
        let derived = derive_batch(&[applicant()], 1).unwrap();
        let err = project(&bundle.schema, &derived).unwrap_err();
        assert_eq!(err.status(), 500);
        assert!(err.to_string().contains("credit_score"));
    }
}
