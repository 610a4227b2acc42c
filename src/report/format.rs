//! Formatted terminal output for training runs.
//!
//! Formatting stays here so the fitting code stays clean and output changes
//! are localized.

use crate::app::pipeline::{TestSummary, TrainingRun};
use crate::domain::RiskCategory;
use crate::fit::CandidateMetrics;
use crate::math::{ClassMetrics, accuracy, confusion_matrix};

use super::{LoanTypeAnalysis, top_importances};

const TOP_IMPORTANCES: usize = 10;

/// Full training summary: data, comparison, winner, confusion matrix, importances.
pub fn format_training_summary(run: &TrainingRun) -> String {
    let bundle = &run.bundle;
    let meta = &bundle.metadata;
    let mut out = String::new();

    out.push_str("=== crisk - PD model training ===\n");
    out.push_str(&format!(
        "Train: rows={} features={} | seed={} eval_fraction={:.2} cv_folds={}\n",
        meta.train_shape[0], meta.train_shape[1], meta.seed, meta.eval_fraction, meta.cv_folds
    ));
    out.push_str(&format!("Labels: {}\n", fmt_distribution(&run.train_distribution)));

    out.push_str("\nModel comparison (holdout, before refit):\n");
    out.push_str(&format_model_comparison(&meta.candidate_metrics, &meta.winning_model));

    out.push_str(&format!("\nWinner: {}\n", meta.winning_model));
    if let Some(m) = meta.candidate_metrics.iter().find(|m| m.name == meta.winning_model) {
        out.push_str(&format!(
            "- accuracy={:.4} cv_accuracy={:.4} mae={:.4} auc={} composite={:.4}\n",
            m.accuracy,
            m.cv_accuracy,
            m.mae,
            fmt_optional(m.auc),
            m.composite
        ));
    }

    let labels: Vec<&str> = bundle.risk_labels.iter().map(|l| l.label()).collect();
    out.push_str("\nConfusion matrix (rows = truth, cols = predicted):\n");
    out.push_str(&format_confusion_matrix(
        &run.holdout.class_truth,
        &run.holdout.class_predicted,
        &labels,
    ));
    out.push_str(&format!(
        "holdout accuracy={:.4} rows={}\n",
        accuracy(&run.holdout.class_truth, &run.holdout.class_predicted),
        run.holdout.class_truth.len()
    ));
    out.push_str("\nPer-class metrics (holdout):\n");
    out.push_str(&format_classification_report(&run.classification, &labels));

    if let Some(importances) = &run.importances {
        out.push_str(&format!("\nTop {TOP_IMPORTANCES} features (PD model):\n"));
        out.push_str(&format_importances(bundle.schema.names(), importances, TOP_IMPORTANCES));
    }

    if let Some(test) = &run.test {
        out.push_str("\nTest file:\n");
        out.push_str(&format_test_summary(test));
    }

    out.push_str("\nNote: validation metrics describe the model before it was refit on all rows.\n");
    out
}

/// One row per candidate; the winner is marked with `*`.
pub fn format_model_comparison(candidates: &[CandidateMetrics], winner: &str) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "  {:<18} {:>9} {:>9} {:>8} {:>8} {:>10}\n",
            "model", "accuracy", "cv_acc", "mae", "auc", "composite"
        )
        .trim_end(),
    );
    out.push('\n');

    for m in candidates {
        let chosen = if m.name == winner { "*" } else { " " };
        out.push_str(
            format!(
                "{chosen} {:<18} {:>9.4} {:>9.4} {:>8.4} {:>8} {:>10.4}\n",
                truncate(&m.name, 18),
                m.accuracy,
                m.cv_accuracy,
                m.mae,
                fmt_optional(m.auc),
                m.composite
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// Square confusion matrix labeled with `labels` (index = class id).
pub fn format_confusion_matrix(truth: &[usize], predicted: &[usize], labels: &[&str]) -> String {
    let m = confusion_matrix(truth, predicted, labels.len());
    let mut out = String::new();

    out.push_str(&format!("{:<16}", ""));
    for l in labels {
        out.push_str(&format!(" {:>14}", truncate(l, 14)));
    }
    out.push('\n');

    for (label, row) in labels.iter().zip(&m) {
        out.push_str(&format!("{:<16}", truncate(label, 16)));
        for count in row {
            out.push_str(&format!(" {count:>14}"));
        }
        out.push('\n');
    }
    out
}

pub fn format_importances(names: &[String], importances: &[f64], top_n: usize) -> String {
    let mut out = String::new();
    for (rank, (name, value)) in top_importances(names, importances, top_n).iter().enumerate() {
        out.push_str(&format!("{:>3}. {:<36} {:>7.4}\n", rank + 1, truncate(name, 36), value));
    }
    out
}

/// Precision, recall, F1 and support per class plus the unweighted average.
pub fn format_classification_report(metrics: &[ClassMetrics], labels: &[&str]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "  {:<16} {:>9} {:>9} {:>9} {:>8}\n",
            "class", "precision", "recall", "f1", "support"
        )
        .trim_end(),
    );
    out.push('\n');

    for (label, m) in labels.iter().zip(metrics) {
        out.push_str(&format!(
            "  {:<16} {:>9.4} {:>9.4} {:>9.4} {:>8}\n",
            truncate(label, 16),
            m.precision,
            m.recall,
            m.f1,
            m.support
        ));
    }

    if !metrics.is_empty() {
        let n = metrics.len() as f64;
        let support: usize = metrics.iter().map(|m| m.support).sum();
        out.push_str(&format!(
            "  {:<16} {:>9.4} {:>9.4} {:>9.4} {:>8}\n",
            "macro avg",
            metrics.iter().map(|m| m.precision).sum::<f64>() / n,
            metrics.iter().map(|m| m.recall).sum::<f64>() / n,
            metrics.iter().map(|m| m.f1).sum::<f64>() / n,
            support
        ));
    }
    out
}

pub fn format_loan_type_analysis(analysis: &LoanTypeAnalysis) -> String {
    let mut out = String::new();
    let types: Vec<String> = analysis
        .distribution
        .iter()
        .map(|(t, n)| format!("{t}={n}"))
        .collect();
    out.push_str(&format!("- loan types: {}\n", types.join(", ")));
    out.push_str(&format!(
        "- secured={} unsecured={} unknown={}\n",
        analysis.secured, analysis.unsecured, analysis.unknown
    ));

    let rates: Vec<String> = RiskCategory::ALL
        .iter()
        .zip(&analysis.interest_rate_by_risk)
        .map(|(c, rate)| match rate {
            Some(r) => format!("{}={r:.2}", c.label()),
            None => format!("{}=n/a", c.label()),
        })
        .collect();
    out.push_str(&format!("- mean interest rate by risk: {}\n", rates.join(", ")));
    out.push_str(&format!(
        "- interest rate vs PD correlation: {}\n",
        fmt_optional(analysis.rate_pd_correlation)
    ));
    out
}

fn format_test_summary(test: &TestSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!("- rows={} mean_pd={:.4}\n", test.rows, test.mean_pd));
    out.push_str(&format!("- predicted: {}\n", fmt_distribution(&test.distribution)));
    if test.threshold_disagreements > 0 {
        out.push_str(&format!(
            "- {} rows where the classifier and the PD thresholds disagree\n",
            test.threshold_disagreements
        ));
    }
    out.push_str(&format_loan_type_analysis(&test.loan_types));
    out
}

fn fmt_distribution(counts: &[usize; 4]) -> String {
    let total: usize = counts.iter().sum();
    let parts: Vec<String> = RiskCategory::ALL
        .iter()
        .zip(counts)
        .map(|(c, &n)| {
            let share = if total == 0 { 0.0 } else { 100.0 * n as f64 / total as f64 };
            format!("{}={} ({:.1}%)", c.label(), n, share)
        })
        .collect();
    parts.join(", ")
}

fn fmt_optional(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.4}"),
        None => "n/a".to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(name: &str, composite: f64, auc: Option<f64>) -> CandidateMetrics {
        CandidateMetrics {
            name: name.to_string(),
            accuracy: 0.8,
            cv_accuracy: 0.75,
            mae: 0.05,
            auc,
            composite,
        }
    }

    #[test]
    fn comparison_marks_only_the_winner() {
        let table = format_model_comparison(
            &[metrics("RandomForest", 0.81, Some(0.9)), metrics("DecisionTree", 0.7, None)],
            "RandomForest",
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("* RandomForest"));
        assert!(lines[2].starts_with("  DecisionTree"));
        assert!(lines[2].contains("n/a"));
    }

    #[test]
    fn confusion_matrix_rows_follow_labels() {
        let text = format_confusion_matrix(&[0, 0, 1], &[0, 1, 1], &["Low Risk", "Medium Risk"]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        let low: Vec<&str> = lines[1].split_whitespace().collect();
        assert_eq!(low, ["Low", "Risk", "1", "1"]);
        let medium: Vec<&str> = lines[2].split_whitespace().collect();
        assert_eq!(medium, ["Medium", "Risk", "0", "1"]);
    }

    #[test]
    fn classification_report_has_one_row_per_class_and_macro_average() {
        let metrics = [
            ClassMetrics { precision: 1.0, recall: 0.5, f1: 2.0 / 3.0, support: 2 },
            ClassMetrics { precision: 0.5, recall: 1.0, f1: 2.0 / 3.0, support: 1 },
        ];
        let text = format_classification_report(&metrics, &["Low Risk", "Medium Risk"]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        let low: Vec<&str> = lines[1].split_whitespace().collect();
        assert_eq!(low, ["Low", "Risk", "1.0000", "0.5000", "0.6667", "2"]);
        let avg: Vec<&str> = lines[3].split_whitespace().collect();
        assert_eq!(avg, ["macro", "avg", "0.7500", "0.7500", "0.6667", "3"]);
    }

    #[test]
    fn loan_type_section_lists_split_and_rates() {
        let analysis = LoanTypeAnalysis {
            distribution: vec![("home loan".to_string(), 2), ("credit card".to_string(), 1)],
            secured: 2,
            unsecured: 1,
            unknown: 0,
            interest_rate_by_risk: [Some(8.5), None, Some(36.0), None],
            rate_pd_correlation: None,
        };
        let text = format_loan_type_analysis(&analysis);
        assert!(text.contains("home loan=2, credit card=1"));
        assert!(text.contains("secured=2 unsecured=1 unknown=0"));
        assert!(text.contains("Low Risk=8.50, Medium Risk=n/a, High Risk=36.00"));
        assert!(text.contains("correlation: n/a"));
    }

    #[test]
    fn distribution_shares() {
        let text = fmt_distribution(&[1, 1, 2, 0]);
        assert!(text.contains("Low Risk=1 (25.0%)"));
        assert!(text.contains("High Risk=2 (50.0%)"));
        assert_eq!(fmt_distribution(&[0; 4]).matches("(0.0%)").count(), 4);
    }

    #[test]
    fn truncate_marks_cut_names() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("mobile_banking_usage_score", 8), "mobile_.");
    }
}
