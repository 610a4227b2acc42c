//! Column names shared by ingest, feature derivation, training and output.

pub const APPLICANT_ID: &str = "applicant_id";
pub const APPLICATION_DATE: &str = "application_date";
pub const AGE: &str = "age";
pub const GENDER: &str = "gender";
pub const EDUCATION_LEVEL: &str = "education_level";
pub const EMPLOYMENT_TYPE: &str = "employment_type";
pub const MARITAL_STATUS: &str = "marital_status";
pub const FAMILY_SIZE: &str = "family_size";
pub const NUMBER_OF_DEPENDENTS: &str = "number_of_dependents";
pub const LOCATION_TYPE: &str = "location_type";

pub const MONTHLY_INCOME: &str = "monthly_income_inr";
pub const SPOUSE_INCOME: &str = "spouse_income_inr";
pub const MONTHLY_EXPENSES: &str = "monthly_expenses_inr";
pub const MONTHLY_SAVINGS: &str = "monthly_savings_inr";
pub const UTILITY_BILLS: &str = "monthly_utility_bills_inr";
pub const PROPERTY_VALUE: &str = "property_value_inr";
pub const VEHICLE_VALUE: &str = "vehicle_value_inr";
pub const TOTAL_INVESTMENTS: &str = "total_investments_inr";
pub const OUTSTANDING_LOAN: &str = "outstanding_loan_amount_inr";
pub const LOAN_APPLIED: &str = "loan_amount_applied_inr";
pub const EMPLOYMENT_YEARS: &str = "years_current_employment";
pub const BANKING_YEARS: &str = "banking_relationship_years";
pub const BUSINESS_REVENUE: &str = "monthly_business_revenue_inr";

pub const DAILY_MOBILE_HOURS: &str = "daily_mobile_hours";
pub const DIGITAL_TRANSACTIONS: &str = "monthly_digital_transactions";
pub const AVG_TRANSACTION_AMOUNT: &str = "avg_transaction_amount_inr";
pub const SOCIAL_MEDIA_ACCOUNTS: &str = "social_media_accounts_count";
pub const MOBILE_APP_USAGE: &str = "mobile_app_usage_intensity_score";
pub const DIGITAL_PAYMENT_ADOPTION: &str = "digital_payment_adoption_score";

pub const CONSENT_STATUS: &str = "consent_status";
pub const CITY: &str = "city";
pub const LOAN_TYPE: &str = "loan_type";
pub const INTEREST_RATE: &str = "interest_rate";

pub const APPLICATION_TO_INCOME: &str = "application_to_income_ratio";
pub const LOAN_UTILIZATION: &str = "loan_utilization_ratio";
pub const INCOME_TO_EXPENSE: &str = "income_to_expense_ratio";
pub const TOTAL_ASSETS: &str = "total_assets";
pub const DEBT_SERVICE_COVERAGE: &str = "debt_service_coverage";

pub const PROBABILITY_OF_DEFAULT: &str = "probability_of_default";
pub const RISK_CATEGORY: &str = "risk_category";
pub const RISK_SCORE: &str = "risk_score";

/// Columns every scoring batch must carry.
pub const REQUIRED: [&str; 3] = [AGE, MONTHLY_INCOME, OUTSTANDING_LOAN];

/// The five derived ratio/total columns, in model order.
pub const DERIVED_RATIOS: [&str; 5] = [
    APPLICATION_TO_INCOME,
    LOAN_UTILIZATION,
    INCOME_TO_EXPENSE,
    TOTAL_ASSETS,
    DEBT_SERVICE_COVERAGE,
];
