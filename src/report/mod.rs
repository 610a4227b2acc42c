//! Reporting utilities: label distributions, importance rankings and formatted
//! terminal output for training runs.

pub mod format;

pub use format::*;

use crate::domain::{LoanType, RiskCategory};
use crate::inference::ScoredRecord;
use crate::math::pearson;

/// Count of each risk category, indexed by class id.
pub fn risk_distribution(categories: &[RiskCategory]) -> [usize; 4] {
    let mut counts = [0; 4];
    for c in categories {
        counts[c.class_id()] += 1;
    }
    counts
}

/// The `top_n` largest importances with their feature names, descending.
/// Equal importances keep schema order.
pub fn top_importances(names: &[String], importances: &[f64], top_n: usize) -> Vec<(String, f64)> {
    let mut ranked: Vec<(String, f64)> = names.iter().cloned().zip(importances.iter().copied()).collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(top_n);
    ranked
}

/// Loan-product view of a scored batch.
#[derive(Debug, Clone, PartialEq)]
pub struct LoanTypeAnalysis {
    /// Rows per loan type after defaulting, most frequent first (ties keep first-seen order).
    pub distribution: Vec<(String, usize)>,
    pub secured: usize,
    pub unsecured: usize,
    /// Rows whose loan type is outside the one-hot vocabulary.
    pub unknown: usize,
    /// Mean interest rate per predicted category, indexed by class id.
    pub interest_rate_by_risk: [Option<f64>; 4],
    /// Pearson correlation of interest rate and predicted PD.
    pub rate_pd_correlation: Option<f64>,
}

pub fn loan_type_analysis(rows: &[ScoredRecord]) -> LoanTypeAnalysis {
    let mut distribution: Vec<(String, usize)> = Vec::new();
    let (mut secured, mut unsecured, mut unknown) = (0, 0, 0);
    let mut rate_sums = [0.0; 4];
    let mut rate_counts = [0usize; 4];

    for r in rows {
        let input = &r.derived.input;
        match distribution.iter().position(|(t, _)| *t == input.loan_type) {
            Some(i) => distribution[i].1 += 1,
            None => distribution.push((input.loan_type.clone(), 1)),
        }
        match LoanType::from_label(&input.loan_type) {
            Some(t) if t.is_secured() => secured += 1,
            Some(_) => unsecured += 1,
            None => unknown += 1,
        }
        let class = r.risk_category.class_id();
        rate_sums[class] += input.interest_rate;
        rate_counts[class] += 1;
    }
    distribution.sort_by(|a, b| b.1.cmp(&a.1));

    let rates: Vec<f64> = rows.iter().map(|r| r.derived.input.interest_rate).collect();
    let pds: Vec<f64> = rows.iter().map(|r| r.probability_of_default).collect();

    LoanTypeAnalysis {
        distribution,
        secured,
        unsecured,
        unknown,
        interest_rate_by_risk: std::array::from_fn(|i| {
            (rate_counts[i] > 0).then(|| rate_sums[i] / rate_counts[i] as f64)
        }),
        rate_pd_correlation: pearson(&rates, &pds),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::testing::constant_bundle;
    use crate::domain::{RawRecord, columns as col};
    use crate::inference::predict;

    fn applicant(loan_type: Option<&str>, rate: Option<f64>) -> RawRecord {
        let mut r = RawRecord::new()
            .with(col::AGE, 40)
            .with(col::MONTHLY_INCOME, 60000)
            .with(col::OUTSTANDING_LOAN, 15000);
        if let Some(t) = loan_type {
            r = r.with(col::LOAN_TYPE, t);
        }
        if let Some(v) = rate {
            r = r.with(col::INTEREST_RATE, v);
        }
        r
    }

    #[test]
    fn loan_type_analysis_splits_secured_and_averages_rates() {
        let rows = [
            applicant(Some("home loan"), Some(9.0)),
            applicant(None, None),
            applicant(Some("payday loan"), Some(20.0)),
            applicant(Some("gold loan"), Some(10.0)),
            applicant(Some("home loan"), Some(8.0)),
        ];
        let batch = predict(&rows, &constant_bundle(0.3, 1), 42).unwrap();
        let analysis = loan_type_analysis(&batch.rows);

        assert_eq!(analysis.distribution[0], ("home loan".to_string(), 2));
        let names: Vec<&str> = analysis.distribution.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(names, ["home loan", "personal loan", "payday loan", "gold loan"]);

        assert_eq!((analysis.secured, analysis.unsecured, analysis.unknown), (3, 1, 1));
        // Every row is Medium Risk; the missing rate defaults to 15.
        assert_eq!(analysis.interest_rate_by_risk[0], None);
        assert!((analysis.interest_rate_by_risk[1].unwrap() - 62.0 / 5.0).abs() < 1e-12);
        // Constant PD has no correlation.
        assert_eq!(analysis.rate_pd_correlation, None);
    }

    #[test]
    fn distribution_counts_by_class_id() {
        let cats = [RiskCategory::Low, RiskCategory::VeryHigh, RiskCategory::Low];
        assert_eq!(risk_distribution(&cats), [2, 0, 0, 1]);
    }

    #[test]
    fn top_importances_sorted_and_truncated() {
        let names: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        let top = top_importances(&names, &[0.1, 0.4, 0.1, 0.4], 3);
        let order: Vec<&str> = top.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(order, ["b", "d", "a"]);
    }
}
