//! Synthetic labeled applicants.
//!
//! Used to bootstrap a bundle without real data and by the end-to-end tests.
//! Incomes and asset values are log-normal; the PD label comes from a logistic
//! link over affordability ratios plus Gaussian noise, and the risk label from
//! the PD thresholds. Behavioral scores are not generated: training derives them
//! with the same imputation contract used at scoring time.

use chrono::{Duration, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{LogNormal, Normal};

use crate::domain::columns as col;
use crate::domain::{LoanType, PdThresholds, RawRecord};
use crate::error::AppError;

/// Column order of generated datasets.
pub const SAMPLE_COLUMNS: [&str; 35] = [
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
    col::PROBABILITY_OF_DEFAULT,
    col::RISK_CATEGORY,
];

const MEDIAN_MONTHLY_INCOME: f64 = 45_000.0;
const PD_FLOOR: f64 = 0.01;
const PD_CEIL: f64 = 0.99;

const GENDERS: [&str; 2] = ["male", "female"];
const EDUCATION: [&str; 4] = ["high school", "graduate", "post graduate", "doctorate"];
const EMPLOYMENT: [&str; 4] = ["salaried", "self-employed", "business", "contract"];
const MARITAL: [&str; 3] = ["single", "married", "divorced"];
const LOCATIONS: [&str; 3] = ["urban", "semi-urban", "rural"];
const CITIES: [&str; 8] = [
    "Mumbai", "Delhi", "Bengaluru", "Pune", "Chennai", "Hyderabad", "Jaipur", "Lucknow",
];

struct Distributions {
    income: LogNormal<f64>,
    property: LogNormal<f64>,
    vehicle: LogNormal<f64>,
    ticket: LogNormal<f64>,
    noise: Normal<f64>,
}

impl Distributions {
    fn new() -> Result<Self, AppError> {
        let err = |e: rand_distr::NormalError| AppError::new(4, format!("Sample distribution error: {e}"));
        Ok(Self {
            income: LogNormal::new(MEDIAN_MONTHLY_INCOME.ln(), 0.55).map_err(err)?,
            property: LogNormal::new(2_500_000f64.ln(), 0.6).map_err(err)?,
            vehicle: LogNormal::new(400_000f64.ln(), 0.5).map_err(err)?,
            ticket: LogNormal::new(1_500f64.ln(), 0.6).map_err(err)?,
            noise: Normal::new(0.0, 0.45).map_err(err)?,
        })
    }
}

/// Generate `rows` labeled applicants. Same `(rows, seed)` gives the same data.
pub fn generate(rows: usize, seed: u64) -> Result<Vec<RawRecord>, AppError> {
    if rows == 0 {
        return Err(AppError::new(2, "Sample row count must be > 0."));
    }

    let dist = Distributions::new()?;
    let mut rng = StdRng::seed_from_u64(seed);
    let thresholds = PdThresholds::default();
    let epoch = NaiveDate::from_ymd_opt(2024, 1, 1).ok_or_else(|| AppError::new(4, "Invalid sample epoch."))?;

    Ok((0..rows)
        .map(|i| applicant(i, &dist, &thresholds, epoch, &mut rng))
        .collect())
}

fn applicant(
    i: usize,
    dist: &Distributions,
    thresholds: &PdThresholds,
    epoch: NaiveDate,
    rng: &mut StdRng,
) -> RawRecord {
    let age = rng.gen_range(21..=65u32);
    let marital = *pick(&MARITAL, rng);
    let employment = *pick(&EMPLOYMENT, rng);
    let loan_type = *pick(&LoanType::ALL, rng);

    let income = dist.income.sample(rng).max(8_000.0).round();
    let expenses = (income * rng.gen_range(0.35..0.9)).round();
    let savings = ((income - expenses).max(0.0) * rng.gen_range(0.3..0.9)).round();
    let spouse_income = if marital == "married" && rng.gen_bool(0.5) {
        (income * rng.gen_range(0.2..0.8)).round()
    } else {
        0.0
    };
    let dependents = rng.gen_range(0..=3u32);

    let property = if rng.gen_bool(0.4) { dist.property.sample(rng).round() } else { 0.0 };
    let vehicle = if rng.gen_bool(0.5) { dist.vehicle.sample(rng).round() } else { 0.0 };
    let investments = (income * rng.gen_range(0.0..12.0)).round();

    let tenor_multiple = match loan_type {
        LoanType::Home => rng.gen_range(40.0..120.0),
        LoanType::Auto | LoanType::Business => rng.gen_range(8.0..36.0),
        _ => rng.gen_range(1.0..18.0),
    };
    let applied = (income * tenor_multiple).round();
    let outstanding = (applied * rng.gen_range(0.05..1.0)).round();

    let max_tenure = f64::from(age.saturating_sub(18).clamp(1, 35));
    let employment_years = round1(rng.gen_range(0.0..max_tenure));
    let banking_years = round1(rng.gen_range(0.5..(max_tenure + 1.0)));
    let business_revenue = if employment == "self-employed" || employment == "business" {
        (income * rng.gen_range(1.2..3.0)).round()
    } else {
        0.0
    };
    let interest_rate = round1(base_rate(loan_type) + rng.gen_range(-1.5..1.5));

    // Affordability drives the latent log-odds; tenure and savings pull it down.
    let debt_to_income = outstanding / (income * 12.0);
    let expense_ratio = expenses / income;
    let savings_ratio = savings / income;
    let z = -2.1 + 1.6 * debt_to_income.min(4.0) + 2.4 * (expense_ratio - 0.6) - 2.0 * savings_ratio
        - 0.05 * employment_years.min(20.0)
        - 0.03 * banking_years.min(20.0)
        + 0.02 * (interest_rate - 12.0)
        + if property > 0.0 { -0.35 } else { 0.0 }
        + dist.noise.sample(rng);
    let pd = round4(logistic(z).clamp(PD_FLOOR, PD_CEIL));

    let date = epoch + Duration::days(rng.gen_range(0..365));

    RawRecord::new()
        .with(col::APPLICANT_ID, format!("APP-{:06}", i + 1))
        .with(col::APPLICATION_DATE, date.format("%Y-%m-%d").to_string())
        .with(col::AGE, age)
        .with(col::GENDER, *pick(&GENDERS, rng))
        .with(col::EDUCATION_LEVEL, *pick(&EDUCATION, rng))
        .with(col::EMPLOYMENT_TYPE, employment)
        .with(col::MARITAL_STATUS, marital)
        .with(col::FAMILY_SIZE, dependents + if marital == "married" { 2 } else { 1 })
        .with(col::NUMBER_OF_DEPENDENTS, dependents)
        .with(col::LOCATION_TYPE, *pick(&LOCATIONS, rng))
        .with(col::MONTHLY_INCOME, income)
        .with(col::SPOUSE_INCOME, spouse_income)
        .with(col::MONTHLY_EXPENSES, expenses)
        .with(col::MONTHLY_SAVINGS, savings)
        .with(col::UTILITY_BILLS, (income * rng.gen_range(0.03..0.08)).round())
        .with(col::PROPERTY_VALUE, property)
        .with(col::VEHICLE_VALUE, vehicle)
        .with(col::TOTAL_INVESTMENTS, investments)
        .with(col::OUTSTANDING_LOAN, outstanding)
        .with(col::LOAN_APPLIED, applied)
        .with(col::EMPLOYMENT_YEARS, employment_years)
        .with(col::BANKING_YEARS, banking_years)
        .with(col::BUSINESS_REVENUE, business_revenue)
        .with(col::DAILY_MOBILE_HOURS, round1(rng.gen_range(1.0..9.0)))
        .with(col::DIGITAL_TRANSACTIONS, rng.gen_range(0..=120u32))
        .with(col::AVG_TRANSACTION_AMOUNT, dist.ticket.sample(rng).round())
        .with(col::SOCIAL_MEDIA_ACCOUNTS, rng.gen_range(0..=6u32))
        .with(col::MOBILE_APP_USAGE, rng.gen_range(10..=95u32))
        .with(col::DIGITAL_PAYMENT_ADOPTION, rng.gen_range(10..=95u32))
        .with(col::CONSENT_STATUS, "granted")
        .with(col::CITY, *pick(&CITIES, rng))
        .with(col::LOAN_TYPE, loan_type.label())
        .with(col::INTEREST_RATE, interest_rate)
        .with(col::PROBABILITY_OF_DEFAULT, pd)
        .with(col::RISK_CATEGORY, thresholds.category_for(pd).label())
}

fn pick<'a, T>(items: &'a [T], rng: &mut StdRng) -> &'a T {
    &items[rng.gen_range(0..items.len())]
}

fn base_rate(loan_type: LoanType) -> f64 {
    match loan_type {
        LoanType::Home => 8.75,
        LoanType::Auto => 9.5,
        LoanType::Gold => 10.0,
        LoanType::Education => 11.0,
        LoanType::Business => 14.0,
        LoanType::Personal => 15.0,
        LoanType::CreditCard => 36.0,
    }
}

fn logistic(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}
