//! The ordered feature-name list a model is trained on.
//!
//! A `FeatureSchema` is built once per training run, stored in the bundle and read
//! back unchanged at scoring time. It is never extended or recomputed after that.

use serde::{Deserialize, Serialize};

use crate::domain::LoanType;
use crate::domain::columns as col;
use crate::error::{ScoringError, Stage};
use crate::features::derive::DerivedRecord;
use crate::features::input::SECONDARY_NUMERIC_COLUMNS;
use crate::features::scores::ScoreKind;

/// Leading raw numeric inputs, in model order.
const RAW_PREFIX: [&str; 8] = [
    col::AGE,
    col::MONTHLY_INCOME,
    col::MONTHLY_EXPENSES,
    col::MONTHLY_SAVINGS,
    col::OUTSTANDING_LOAN,
    col::LOAN_APPLIED,
    col::EMPLOYMENT_YEARS,
    col::BANKING_YEARS,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    /// The production feature list: 36 base features plus 5 derived ratios.
    pub fn standard() -> Self {
        let scores_head = [
            ScoreKind::Timeliness,
            ScoreKind::RepaymentAbility,
            ScoreKind::FinancialHealth,
            ScoreKind::PaymentReliability,
            ScoreKind::Stability,
        ];
        let scores_tail = [
            ScoreKind::UtilityPaymentRegularity,
            ScoreKind::LocationStability,
            ScoreKind::MobileBankingUsage,
        ];

        let mut names: Vec<String> = Vec::with_capacity(41);
        names.extend(RAW_PREFIX.iter().map(|s| s.to_string()));
        names.extend(scores_head.iter().map(|k| k.column().to_string()));
        names.extend(SECONDARY_NUMERIC_COLUMNS.iter().map(|s| s.to_string()));
        names.extend(scores_tail.iter().map(|k| k.column().to_string()));
        names.push(col::INTEREST_RATE.to_string());
        names.extend(LoanType::ALL.iter().map(|t| t.column().to_string()));
        names.extend(col::DERIVED_RATIOS.iter().map(|s| s.to_string()));

        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// One-hot and interest-rate features (reported as "enhanced" features).
    pub fn enhanced_features(&self) -> Vec<String> {
        self.names
            .iter()
            .filter(|n| n.as_str() == col::INTEREST_RATE || n.starts_with("loan_type_"))
            .cloned()
            .collect()
    }

    pub fn loan_type_features(&self) -> Vec<String> {
        self.names
            .iter()
            .filter(|n| n.starts_with("loan_type_"))
            .cloned()
            .collect()
    }

    /// Select this schema's features from a derived record, in schema order.
    pub fn project(&self, record: &DerivedRecord) -> Result<Vec<f64>, ScoringError> {
        self.names
            .iter()
            .map(|name| {
                record
                    .value(name)
                    .ok_or_else(|| ScoringError::FeatureProjectionError {
                        column: name.clone(),
                        stage: Stage::Project,
                    })
            })
            .collect()
    }
}

impl TryFrom<Vec<String>> for FeatureSchema {
    type Error = String;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        if names.is_empty() {
            return Err("feature schema is empty".to_string());
        }
        let mut seen = std::collections::HashSet::new();
        for n in &names {
            if !seen.insert(n.as_str()) {
                return Err(format!("duplicate feature in schema: {n}"));
            }
        }
        Ok(Self { names })
    }
}

impl From<FeatureSchema> for Vec<String> {
    fn from(schema: FeatureSchema) -> Self {
        schema.names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawRecord;
    use crate::features::derive::derive;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn standard_schema_shape() {
        let s = FeatureSchema::standard();
        assert_eq!(s.len(), 41);
        assert_eq!(s.names()[0], "age");
        assert_eq!(s.names()[8], "timeliness_score");
        assert_eq!(s.names()[28], "interest_rate");
        assert_eq!(s.names()[29], "loan_type_personal_loan");
        assert_eq!(s.names()[40], "debt_service_coverage");
        assert_eq!(s.enhanced_features().len(), 8);
        assert_eq!(s.loan_type_features().len(), 7);
    }

    #[test]
    fn deserializing_rejects_duplicates() {
        let json = r#"["age","age"]"#;
        assert!(serde_json::from_str::<FeatureSchema>(json).is_err());
        let ok: FeatureSchema = serde_json::from_str(r#"["age","interest_rate"]"#).unwrap();
        assert_eq!(ok.len(), 2);
    }

    #[test]
    fn projection_fails_on_unknown_feature() {
        let record = RawRecord::new()
            .with("age", 40)
            .with("monthly_income_inr", 60000)
            .with("outstanding_loan_amount_inr", 10000);
        let derived = derive(&record, 0, &mut StdRng::seed_from_u64(1)).unwrap();

        let row = FeatureSchema::standard().project(&derived).unwrap();
        assert_eq!(row.len(), 41);

        let odd = FeatureSchema::try_from(vec!["age".to_string(), "credit_score".to_string()]).unwrap();
        let err = odd.project(&derived).unwrap_err();
        assert_eq!(
            err,
            ScoringError::FeatureProjectionError {
                column: "credit_score".to_string(),
                stage: Stage::Project,
            }
        );
    }
}
