//! Candidate evaluation and winner selection.
//!
//! For each enabled family the trainer:
//! 1. standardizes the full training matrix (one scaler shared by all candidates)
//! 2. fits regressor + classifier on the stratified training split
//! 3. scores the holdout: accuracy, MAE, binary AUC (High/Very High vs rest)
//! 4. runs k-fold CV accuracy of the classifier on the full scaled matrix (reported)
//! 5. combines holdout metrics into a composite score
//!
//! ```text
//! composite = 0.5 * accuracy + 0.25 * (1 - MAE) + 0.25 * AUC    (undefined AUC counts as 0)
//! ```
//!
//! The highest composite wins; on an exact tie the earlier candidate is kept. The
//! winner is then refit on the whole scaled matrix. Reported metrics describe the
//! pre-refit model.

use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::AppError;
use crate::fit::candidates::Learner;
use crate::fit::split::{stratified_folds, stratified_split};
use crate::math::{StandardScaler, accuracy, binary_auc, mean_absolute_error};
use crate::models::{Classifier, Regressor};

/// Class ids at or above this count as "high risk" for the binary AUC.
pub const HIGH_RISK_CLASS_ID: usize = 2;

pub const WEIGHT_ACCURACY: f64 = 0.5;
pub const WEIGHT_MAE: f64 = 0.25;
pub const WEIGHT_AUC: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionOptions {
    pub eval_fraction: f64,
    pub cv_folds: usize,
    pub seed: u64,
}

impl Default for SelectionOptions {
    fn default() -> Self {
        Self {
            eval_fraction: 0.25,
            cv_folds: 5,
            seed: 42,
        }
    }
}

/// Holdout metrics of one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateMetrics {
    pub name: String,
    pub accuracy: f64,
    pub cv_accuracy: f64,
    pub mae: f64,
    /// `None` when the holdout contains a single binary class.
    pub auc: Option<f64>,
    pub composite: f64,
}

/// Holdout truth and predictions of the winning candidate (before refit).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HoldoutSnapshot {
    pub class_truth: Vec<usize>,
    pub class_predicted: Vec<usize>,
    pub pd_truth: Vec<f64>,
    pub pd_predicted: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct Selection {
    pub scaler: StandardScaler,
    pub regressor: Regressor,
    pub classifier: Classifier,
    pub winner: String,
    /// One entry per candidate, in evaluation order.
    pub candidates: Vec<CandidateMetrics>,
    pub holdout: HoldoutSnapshot,
    /// Normalized importances of the refit regressor, schema order.
    pub importances: Option<Vec<f64>>,
}

/// Composite selection score.
pub fn composite_score(accuracy: f64, mae: f64, auc: Option<f64>) -> f64 {
    let auc = auc.filter(|a| a.is_finite()).unwrap_or(0.0);
    WEIGHT_ACCURACY * accuracy + WEIGHT_MAE * (1.0 - mae) + WEIGHT_AUC * auc
}

/// Evaluate every candidate and return the refit winner.
///
/// `x` is the unscaled feature matrix in schema order; `pd` and `classes` are the
/// row-aligned targets.
pub fn select_best<L: Learner>(
    x: &DMatrix<f64>,
    pd: &[f64],
    classes: &[usize],
    n_classes: usize,
    learners: &[L],
    options: &SelectionOptions,
) -> Result<Selection, AppError> {
    let n = x.nrows();
    if pd.len() != n || classes.len() != n {
        return Err(AppError::new(4, "Target length does not match feature rows."));
    }
    if learners.is_empty() {
        return Err(AppError::new(2, "No model families enabled."));
    }
    let min_rows = (2 * options.cv_folds).max(4);
    if n < min_rows {
        return Err(AppError::new(
            3,
            format!("Insufficient data: {n} labeled rows, need at least {min_rows}."),
        ));
    }

    let scaler = StandardScaler::fit(x).ok_or_else(|| AppError::new(3, "Empty training matrix."))?;
    let z = scaler
        .transform(x)
        .ok_or_else(|| AppError::new(4, "Scaler width mismatch."))?;

    let (train_rows, eval_rows) = stratified_split(classes, options.eval_fraction, options.seed);
    if train_rows.is_empty() || eval_rows.is_empty() {
        return Err(AppError::new(3, "Insufficient data for a holdout split."));
    }
    info!(train = train_rows.len(), eval = eval_rows.len(), "holdout split");

    let z_train = z.select_rows(&train_rows);
    let z_eval = z.select_rows(&eval_rows);
    let pd_train = pick(pd, &train_rows);
    let pd_eval = pick(pd, &eval_rows);
    let cls_train = pick(classes, &train_rows);
    let cls_eval = pick(classes, &eval_rows);
    let folds = stratified_folds(classes, options.cv_folds);

    let evaluated: Vec<(CandidateMetrics, HoldoutSnapshot)> = learners
        .par_iter()
        .map(|learner| {
            let reg = learner.fit_regressor(&z_train, &pd_train, options.seed);
            let cls = learner.fit_classifier(&z_train, &cls_train, n_classes, options.seed);

            let pd_pred = reg.predict(&z_eval);
            let cls_pred = cls.predict(&z_eval);

            let acc = accuracy(&cls_eval, &cls_pred);
            let mae = mean_absolute_error(&pd_eval, &pd_pred);
            let high: Vec<bool> = cls_eval.iter().map(|&c| c >= HIGH_RISK_CLASS_ID).collect();
            let auc = binary_auc(&high, &pd_pred);
            let cv_accuracy = cross_validated_accuracy(learner, &z, classes, n_classes, &folds, options.seed);

            let metrics = CandidateMetrics {
                name: learner.name().to_string(),
                accuracy: acc,
                cv_accuracy,
                mae,
                auc,
                composite: composite_score(acc, mae, auc),
            };
            let snapshot = HoldoutSnapshot {
                class_truth: cls_eval.clone(),
                class_predicted: cls_pred,
                pd_truth: pd_eval.clone(),
                pd_predicted: pd_pred,
            };
            (metrics, snapshot)
        })
        .collect();

    for (m, _) in &evaluated {
        info!(
            model = %m.name,
            accuracy = m.accuracy,
            cv_accuracy = m.cv_accuracy,
            mae = m.mae,
            auc = ?m.auc,
            composite = m.composite,
            "candidate evaluated"
        );
    }

    let mut best = 0;
    for (i, (m, _)) in evaluated.iter().enumerate().skip(1) {
        if m.composite > evaluated[best].0.composite {
            best = i;
        }
    }

    let winner_learner = &learners[best];
    let winner = winner_learner.name().to_string();
    info!(model = %winner, composite = evaluated[best].0.composite, "refitting winner on full data");

    let regressor = winner_learner.fit_regressor(&z, pd, options.seed);
    let classifier = winner_learner.fit_classifier(&z, classes, n_classes, options.seed);
    let importances = regressor.feature_importances();

    let (candidates, mut snapshots): (Vec<CandidateMetrics>, Vec<HoldoutSnapshot>) = evaluated.into_iter().unzip();
    let holdout = std::mem::take(&mut snapshots[best]);

    Ok(Selection {
        scaler,
        regressor,
        classifier,
        winner,
        candidates,
        holdout,
        importances,
    })
}

/// Mean classifier accuracy over the folds (each fold held out once).
fn cross_validated_accuracy<L: Learner>(
    learner: &L,
    z: &DMatrix<f64>,
    classes: &[usize],
    n_classes: usize,
    folds: &[Vec<usize>],
    seed: u64,
) -> f64 {
    let scores: Vec<f64> = folds
        .par_iter()
        .enumerate()
        .filter(|(_, held_out)| !held_out.is_empty())
        .map(|(k, held_out)| {
            let train: Vec<usize> = folds
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != k)
                .flat_map(|(_, f)| f.iter().copied())
                .collect();
            let mut train = train;
            train.sort_unstable();

            let cls = learner.fit_classifier(&z.select_rows(&train), &pick(classes, &train), n_classes, seed);
            let predicted = cls.predict(&z.select_rows(held_out));
            let acc = accuracy(&pick(classes, held_out), &predicted);
            debug!(model = learner.name(), fold = k, accuracy = acc, "cv fold");
            acc
        })
        .collect();

    if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

fn pick<T: Copy>(values: &[T], rows: &[usize]) -> Vec<T> {
    rows.iter().map(|&i| values[i]).collect()
}
