//! Response shapes.
//!
//! - strict: exactly `OUTPUT_COLUMNS` per record, in that order, absent fields null
//! - legacy: `{status, data, processed_rows}` where each data record keeps every
//!   input column and appends defaults, derived features and predictions
//! - error: `{status: "error", error}` with the user-safe message

use serde_json::{Map, Value, json};

use crate::domain::LoanType;
use crate::domain::columns as col;
use crate::error::ScoringError;
use crate::features::input::MINIMUM_DEFAULT_COLUMNS;
use crate::features::scores::ScoreKind;
use crate::inference::{ScoredBatch, ScoredRecord};

/// The fixed strict-schema field order.
pub const OUTPUT_COLUMNS: [&str; 56] = [
    col::APPLICANT_ID,
    col::APPLICATION_DATE,
    col::AGE,
    col::GENDER,
    col::EDUCATION_LEVEL,
    col::EMPLOYMENT_TYPE,
    col::MARITAL_STATUS,
    col::FAMILY_SIZE,
    col::NUMBER_OF_DEPENDENTS,
    col::LOCATION_TYPE,
    col::MONTHLY_INCOME,
    col::SPOUSE_INCOME,
    col::MONTHLY_EXPENSES,
    col::MONTHLY_SAVINGS,
    col::UTILITY_BILLS,
    col::PROPERTY_VALUE,
    col::VEHICLE_VALUE,
    col::TOTAL_INVESTMENTS,
    col::OUTSTANDING_LOAN,
    col::LOAN_APPLIED,
    col::EMPLOYMENT_YEARS,
    col::BANKING_YEARS,
    col::BUSINESS_REVENUE,
    col::DAILY_MOBILE_HOURS,
    col::DIGITAL_TRANSACTIONS,
    col::AVG_TRANSACTION_AMOUNT,
    col::SOCIAL_MEDIA_ACCOUNTS,
    col::MOBILE_APP_USAGE,
    col::DIGITAL_PAYMENT_ADOPTION,
    col::CONSENT_STATUS,
    col::CITY,
    col::LOAN_TYPE,
    col::INTEREST_RATE,
    "loan_type_personal_loan",
    "loan_type_home_loan",
    "loan_type_auto_loan",
    "loan_type_education_loan",
    "loan_type_business_loan",
    "loan_type_credit_card",
    "loan_type_gold_loan",
    "timeliness_score",
    "repayment_ability_score",
    "financial_health_score",
    "payment_reliability_score",
    "stability_index",
    "utility_payment_regularity_score",
    "location_stability_score",
    "mobile_banking_usage_score",
    col::APPLICATION_TO_INCOME,
    col::LOAN_UTILIZATION,
    col::INCOME_TO_EXPENSE,
    col::TOTAL_ASSETS,
    col::DEBT_SERVICE_COVERAGE,
    col::PROBABILITY_OF_DEFAULT,
    col::RISK_CATEGORY,
    col::RISK_SCORE,
];

/// Value of one output column for a scored record, if the record or its
/// derivation produced it.
///
/// Precedence: predictions, derived features, minimum defaults, raw input.
fn field(record: &ScoredRecord, column: &str) -> Option<Value> {
    let d = &record.derived;
    match column {
        col::PROBABILITY_OF_DEFAULT => return Some(number(record.probability_of_default)),
        col::RISK_CATEGORY => return Some(Value::from(record.risk_category.label())),
        col::RISK_SCORE => return Some(number(record.risk_score)),
        _ => {}
    }

    if let Some(i) = LoanType::ALL.iter().position(|t| t.column() == column) {
        return Some(Value::from(d.loan_type_one_hot[i]));
    }
    if let Some(kind) = ScoreKind::from_column(column) {
        let i = kind.index();
        if d.imputed_scores[i] {
            return Some(Value::from(d.scores[i] as i64));
        }
        return record.raw.get(column).cloned();
    }
    if let Some(v) = d.ratios.get(column) {
        return Some(number(v));
    }
    if column == col::LOAN_TYPE {
        return Some(Value::from(d.input.loan_type.clone()));
    }
    if MINIMUM_DEFAULT_COLUMNS.contains(&column) {
        if let Some(v) = record.raw.get(column) {
            return Some(v.clone());
        }
        return d.input.numeric(column).map(number);
    }
    record.raw.get(column).cloned()
}

fn number(v: f64) -> Value {
    Value::from(v)
}

/// One strict-schema record: all 56 fields in order.
pub fn strict_record(record: &ScoredRecord) -> Map<String, Value> {
    OUTPUT_COLUMNS
        .iter()
        .map(|c| (c.to_string(), field(record, c).unwrap_or(Value::Null)))
        .collect()
}

/// The strict response body: an array of 56-field records.
pub fn strict_response(batch: &ScoredBatch) -> Value {
    Value::Array(batch.rows.iter().map(|r| Value::Object(strict_record(r))).collect())
}

/// Every input column, then defaults, derived features and predictions appended
/// (existing columns keep their position).
pub fn legacy_record(record: &ScoredRecord) -> Map<String, Value> {
    let mut out = record.raw.as_map().clone();

    let appended = MINIMUM_DEFAULT_COLUMNS
        .iter()
        .copied()
        .chain(ScoreKind::ALL.iter().map(|k| k.column()))
        .chain(LoanType::ALL.iter().map(|t| t.column()))
        .chain(col::DERIVED_RATIOS)
        .chain([col::PROBABILITY_OF_DEFAULT, col::RISK_CATEGORY, col::RISK_SCORE]);

    for column in appended {
        if let Some(v) = field(record, column) {
            out.insert(column.to_string(), v);
        }
    }
    out
}

/// `{status: "success", data, processed_rows}`.
pub fn legacy_response(batch: &ScoredBatch) -> Value {
    let data: Vec<Value> = batch.rows.iter().map(|r| Value::Object(legacy_record(r))).collect();
    json!({
        "status": "success",
        "data": data,
        "processed_rows": batch.rows.len(),
    })
}

/// `{status: "error", error}` using the message that is safe for end users.
pub fn error_response(err: &ScoringError) -> Value {
    json!({
        "status": "error",
        "error": err.public_message(),
    })
}
