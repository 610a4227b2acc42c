//! The feature-derivation contract shared by training and scoring.
//!
//! Order of operations per row:
//!
//! 1. parse (`RawInput::from_record`)
//! 2. minimum defaulting (`normalize`)
//! 3. score imputation for absent scores only
//! 4. loan-type one-hot
//! 5. derived ratios

use rand::Rng;

use crate::domain::columns as col;
use crate::domain::{LoanType, RawRecord};
use crate::error::ScoringError;
use crate::features::input::{NormalizedInput, RawInput, normalize};
use crate::features::scores::{ScoreKind, resolve_scores};

/// Ratios and totals computed from the normalized input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedRatios {
    pub application_to_income: f64,
    pub loan_utilization: f64,
    pub income_to_expense: f64,
    pub total_assets: f64,
    pub debt_service_coverage: f64,
}

impl DerivedRatios {
    /// Compute the five ratios. Zero income, expenses or applied amount is an error.
    pub fn compute(n: &NormalizedInput, row: usize) -> Result<Self, ScoringError> {
        let nonzero = |value: f64, column: &str| {
            if value == 0.0 || !value.is_finite() {
                Err(ScoringError::ZeroDivisor {
                    row,
                    column: column.to_string(),
                })
            } else {
                Ok(value)
            }
        };

        let income = nonzero(n.monthly_income, col::MONTHLY_INCOME)?;
        let expenses = nonzero(n.monthly_expenses, col::MONTHLY_EXPENSES)?;
        let applied = nonzero(n.loan_applied, col::LOAN_APPLIED)?;

        Ok(Self {
            application_to_income: n.loan_applied / (income * 12.0),
            loan_utilization: n.outstanding_loan / applied,
            income_to_expense: n.monthly_income / expenses,
            total_assets: n.property_value() + n.vehicle_value() + n.total_investments(),
            debt_service_coverage: n.monthly_savings / (n.outstanding_loan / 12.0 + 1.0),
        })
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        let v = match column {
            col::APPLICATION_TO_INCOME => self.application_to_income,
            col::LOAN_UTILIZATION => self.loan_utilization,
            col::INCOME_TO_EXPENSE => self.income_to_expense,
            col::TOTAL_ASSETS => self.total_assets,
            col::DEBT_SERVICE_COVERAGE => self.debt_service_coverage,
            _ => return None,
        };
        Some(v)
    }
}

/// One-hot indicators in `LoanType::ALL` order. Out-of-vocabulary types are all zero.
pub fn loan_type_one_hot(loan_type: &str) -> [u8; 7] {
    let mut out = [0u8; 7];
    if let Some(t) = LoanType::from_label(loan_type) {
        if let Some(i) = LoanType::ALL.iter().position(|x| *x == t) {
            out[i] = 1;
        }
    }
    out
}

/// Every feature the deriver can produce for one applicant.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedRecord {
    pub input: NormalizedInput,
    pub scores: [f64; 8],
    pub imputed_scores: [bool; 8],
    pub loan_type_one_hot: [u8; 7],
    pub ratios: DerivedRatios,
}

impl DerivedRecord {
    /// Look up a feature by column name.
    ///
    /// Covers raw numeric inputs (after defaulting), scores, one-hot indicators and
    /// derived ratios. Anything else is `None`.
    pub fn value(&self, column: &str) -> Option<f64> {
        if let Some(v) = self.input.numeric(column) {
            return Some(v);
        }
        if let Some(kind) = ScoreKind::from_column(column) {
            return Some(self.scores[kind.index()]);
        }
        if let Some(i) = LoanType::ALL.iter().position(|t| t.column() == column) {
            return Some(f64::from(self.loan_type_one_hot[i]));
        }
        self.ratios.get(column)
    }
}

/// Derive the full feature set for one row. `row` is 0-based and only used in errors.
pub fn derive<R: Rng>(
    record: &RawRecord,
    row: usize,
    rng: &mut R,
) -> Result<DerivedRecord, ScoringError> {
    let raw = RawInput::from_record(record, row)?;
    derive_input(&raw, row, rng)
}

pub fn derive_input<R: Rng>(
    raw: &RawInput,
    row: usize,
    rng: &mut R,
) -> Result<DerivedRecord, ScoringError> {
    let input = normalize(raw)?;
    let (scores, imputed_scores) = resolve_scores(&input, rng);
    let loan_type_one_hot = loan_type_one_hot(&input.loan_type);
    let ratios = DerivedRatios::compute(&input, row)?;

    Ok(DerivedRecord {
        input,
        scores,
        imputed_scores,
        loan_type_one_hot,
        ratios,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn minimal() -> RawRecord {
        RawRecord::new()
            .with(col::AGE, 35)
            .with(col::MONTHLY_INCOME, 50000)
            .with(col::OUTSTANDING_LOAN, 20000)
    }

    #[test]
    fn end_to_end_defaults_and_ratios() {
        let d = derive(&minimal(), 0, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(d.ratios.loan_utilization, 1.0);
        assert!((d.ratios.income_to_expense - 5.0 / 3.0).abs() < 1e-12);
        assert!((d.ratios.application_to_income - 20000.0 / 600000.0).abs() < 1e-12);
        assert_eq!(d.ratios.total_assets, 0.0);
        assert!((d.ratios.debt_service_coverage - 10000.0 / (20000.0 / 12.0 + 1.0)).abs() < 1e-9);
        assert_eq!(d.loan_type_one_hot, [1, 0, 0, 0, 0, 0, 0]);
        assert!(d.imputed_scores.iter().all(|&b| b));
    }

    #[test]
    fn one_hot_sums_to_one_in_vocabulary_and_zero_outside() {
        for t in LoanType::ALL {
            let v = loan_type_one_hot(t.label());
            assert_eq!(v.iter().map(|&x| x as u32).sum::<u32>(), 1, "{}", t.label());
        }
        assert_eq!(loan_type_one_hot("payday loan"), [0; 7]);
        // Matching is exact: other casings or padding get no indicator.
        assert_eq!(loan_type_one_hot("Personal Loan"), [0; 7]);
        assert_eq!(loan_type_one_hot("  HOME LOAN "), [0; 7]);
        assert_eq!(loan_type_one_hot(""), [0; 7]);
    }

    #[test]
    fn zero_divisors_are_defined_failures() {
        let record = minimal().with(col::OUTSTANDING_LOAN, 0);
        let err = derive(&record, 4, &mut StdRng::seed_from_u64(1)).unwrap_err();
        assert_eq!(
            err,
            ScoringError::ZeroDivisor {
                row: 4,
                column: col::LOAN_APPLIED.to_string(),
            }
        );

        let record = minimal().with(col::MONTHLY_INCOME, 0);
        let err = derive(&record, 0, &mut StdRng::seed_from_u64(1)).unwrap_err();
        assert!(matches!(
            err,
            ScoringError::ZeroDivisor { ref column, .. } if column == col::MONTHLY_INCOME
        ));
    }

    #[test]
    fn value_lookup_covers_every_feature_family() {
        let record = minimal()
            .with(col::LOAN_TYPE, "gold loan")
            .with(col::PROPERTY_VALUE, 1_000_000)
            .with(col::VEHICLE_VALUE, 200_000);
        let d = derive(&record, 0, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(d.value(col::AGE), Some(35.0));
        assert_eq!(d.value(col::PROPERTY_VALUE), Some(1_000_000.0));
        assert_eq!(d.value("loan_type_gold_loan"), Some(1.0));
        assert_eq!(d.value("loan_type_home_loan"), Some(0.0));
        assert_eq!(d.value(col::TOTAL_ASSETS), Some(1_200_000.0));
        assert!(d.value("timeliness_score").is_some());
        assert_eq!(d.value("credit_score"), None);
    }
}
