//! Typed applicant input and minimum defaulting.
//!
//! `RawInput` is the optional-field view of one `RawRecord`; `normalize` turns it
//! into a fully-populated `NormalizedInput`. Every default lives here so training
//! and scoring share a single copy of the contract.

use serde_json::Value;

use crate::domain::RawRecord;
use crate::domain::columns as col;
use crate::error::ScoringError;
use crate::features::scores::ScoreKind;

/// Defaults applied by `normalize` when the raw row lacks the field.
pub const DEFAULT_EXPENSE_SHARE: f64 = 0.6;
pub const DEFAULT_SAVINGS_SHARE: f64 = 0.2;
pub const DEFAULT_EMPLOYMENT_YEARS: f64 = 3.0;
pub const DEFAULT_BANKING_YEARS: f64 = 2.0;
pub const DEFAULT_LOAN_TYPE: &str = "personal loan";
pub const DEFAULT_INTEREST_RATE: f64 = 15.0;

/// Columns filled by minimum defaulting. These are echoed in strict output.
pub const MINIMUM_DEFAULT_COLUMNS: [&str; 7] = [
    col::MONTHLY_EXPENSES,
    col::MONTHLY_SAVINGS,
    col::LOAN_APPLIED,
    col::EMPLOYMENT_YEARS,
    col::BANKING_YEARS,
    col::LOAN_TYPE,
    col::INTEREST_RATE,
];

/// Secondary numeric inputs. Absent values enter the model as 0.0 and are not echoed.
pub const SECONDARY_NUMERIC_COLUMNS: [&str; 12] = [
    col::SPOUSE_INCOME,
    col::UTILITY_BILLS,
    col::PROPERTY_VALUE,
    col::VEHICLE_VALUE,
    col::TOTAL_INVESTMENTS,
    col::BUSINESS_REVENUE,
    col::DAILY_MOBILE_HOURS,
    col::DIGITAL_TRANSACTIONS,
    col::AVG_TRANSACTION_AMOUNT,
    col::SOCIAL_MEDIA_ACCOUNTS,
    col::MOBILE_APP_USAGE,
    col::DIGITAL_PAYMENT_ADOPTION,
];

/// One applicant with every model input optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawInput {
    pub age: Option<f64>,
    pub monthly_income: Option<f64>,
    pub outstanding_loan: Option<f64>,

    pub monthly_expenses: Option<f64>,
    pub monthly_savings: Option<f64>,
    pub loan_applied: Option<f64>,
    pub employment_years: Option<f64>,
    pub banking_years: Option<f64>,
    pub loan_type: Option<String>,
    pub interest_rate: Option<f64>,

    /// Values of `SECONDARY_NUMERIC_COLUMNS`, same order.
    pub secondary: [Option<f64>; 12],

    /// User-supplied behavioral scores, indexed by `ScoreKind`.
    pub scores: [Option<f64>; 8],
}

impl RawInput {
    /// Parse the model-relevant fields of a row. `row` is 0-based.
    pub fn from_record(record: &RawRecord, row: usize) -> Result<Self, ScoringError> {
        let num = |column: &str| numeric_field(record, column, row);

        let mut secondary = [None; 12];
        for (slot, column) in secondary.iter_mut().zip(SECONDARY_NUMERIC_COLUMNS) {
            *slot = num(column)?;
        }

        let mut scores = [None; 8];
        for (slot, kind) in scores.iter_mut().zip(ScoreKind::ALL) {
            *slot = num(kind.column())?;
        }

        let loan_type = match record.get(col::LOAN_TYPE) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
            Some(Value::String(_)) | None => None,
            Some(other) => Some(other.to_string()),
        };

        Ok(Self {
            age: num(col::AGE)?,
            monthly_income: num(col::MONTHLY_INCOME)?,
            outstanding_loan: num(col::OUTSTANDING_LOAN)?,
            monthly_expenses: num(col::MONTHLY_EXPENSES)?,
            monthly_savings: num(col::MONTHLY_SAVINGS)?,
            loan_applied: num(col::LOAN_APPLIED)?,
            employment_years: num(col::EMPLOYMENT_YEARS)?,
            banking_years: num(col::BANKING_YEARS)?,
            loan_type,
            interest_rate: num(col::INTEREST_RATE)?,
            secondary,
            scores,
        })
    }
}

/// Fully-populated applicant after minimum defaulting.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedInput {
    pub age: f64,
    pub monthly_income: f64,
    pub outstanding_loan: f64,
    pub monthly_expenses: f64,
    pub monthly_savings: f64,
    pub loan_applied: f64,
    pub employment_years: f64,
    pub banking_years: f64,
    pub loan_type: String,
    pub interest_rate: f64,
    pub secondary: [f64; 12],
    pub supplied_scores: [Option<f64>; 8],
}

impl NormalizedInput {
    pub fn secondary(&self, column: &str) -> Option<f64> {
        SECONDARY_NUMERIC_COLUMNS
            .iter()
            .position(|c| *c == column)
            .map(|i| self.secondary[i])
    }

    pub fn property_value(&self) -> f64 {
        self.secondary(col::PROPERTY_VALUE).unwrap_or(0.0)
    }

    pub fn vehicle_value(&self) -> f64 {
        self.secondary(col::VEHICLE_VALUE).unwrap_or(0.0)
    }

    pub fn total_investments(&self) -> f64 {
        self.secondary(col::TOTAL_INVESTMENTS).unwrap_or(0.0)
    }

    /// Numeric value of a model input column (not derived columns).
    pub fn numeric(&self, column: &str) -> Option<f64> {
        let v = match column {
            col::AGE => self.age,
            col::MONTHLY_INCOME => self.monthly_income,
            col::OUTSTANDING_LOAN => self.outstanding_loan,
            col::MONTHLY_EXPENSES => self.monthly_expenses,
            col::MONTHLY_SAVINGS => self.monthly_savings,
            col::LOAN_APPLIED => self.loan_applied,
            col::EMPLOYMENT_YEARS => self.employment_years,
            col::BANKING_YEARS => self.banking_years,
            col::INTEREST_RATE => self.interest_rate,
            other => return self.secondary(other),
        };
        Some(v)
    }
}

/// Apply minimum defaulting.
///
/// The three required fields must be present; the caller validates the batch first,
/// so a miss here reports only this row's missing columns.
pub fn normalize(raw: &RawInput) -> Result<NormalizedInput, ScoringError> {
    let (Some(age), Some(monthly_income), Some(outstanding_loan)) =
        (raw.age, raw.monthly_income, raw.outstanding_loan)
    else {
        let missing = [
            (col::AGE, raw.age),
            (col::MONTHLY_INCOME, raw.monthly_income),
            (col::OUTSTANDING_LOAN, raw.outstanding_loan),
        ]
        .into_iter()
        .filter(|(_, v)| v.is_none())
        .map(|(c, _)| c.to_string())
        .collect();
        return Err(ScoringError::MissingRequiredColumns {
            missing,
            available: Vec::new(),
        });
    };

    let mut secondary = [0.0; 12];
    for (out, v) in secondary.iter_mut().zip(raw.secondary) {
        *out = v.unwrap_or(0.0);
    }

    Ok(NormalizedInput {
        age,
        monthly_income,
        outstanding_loan,
        monthly_expenses: raw
            .monthly_expenses
            .unwrap_or(monthly_income * DEFAULT_EXPENSE_SHARE),
        monthly_savings: raw
            .monthly_savings
            .unwrap_or(monthly_income * DEFAULT_SAVINGS_SHARE),
        loan_applied: raw.loan_applied.unwrap_or(outstanding_loan),
        employment_years: raw.employment_years.unwrap_or(DEFAULT_EMPLOYMENT_YEARS),
        banking_years: raw.banking_years.unwrap_or(DEFAULT_BANKING_YEARS),
        loan_type: raw
            .loan_type
            .clone()
            .unwrap_or_else(|| DEFAULT_LOAN_TYPE.to_string()),
        interest_rate: raw.interest_rate.unwrap_or(DEFAULT_INTEREST_RATE),
        secondary,
        supplied_scores: raw.scores,
    })
}

/// Read a numeric column. Null/empty means absent; text that is not a number is an error.
pub fn numeric_field(
    record: &RawRecord,
    column: &str,
    row: usize,
) -> Result<Option<f64>, ScoringError> {
    let invalid = |value: String| ScoringError::InvalidFieldValue {
        row,
        column: column.to_string(),
        value,
    };

    match record.get(column) {
        None => Ok(None),
        Some(Value::Number(n)) => n.as_f64().map(Some).ok_or_else(|| invalid(n.to_string())),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            match s.parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(Some(v)),
                _ => Err(invalid(s.to_string())),
            }
        }
        Some(other) => Err(invalid(other.to_string())),
    }
}
