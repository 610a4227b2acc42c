//! Behavioral score imputation.
//!
//! Eight bounded indicators are synthesized from the applicant's financials when the
//! input does not carry them. Each score is:
//!
//! ```text
//! clip(trunc(base - penalty + jitter), min, max)
//! ```
//!
//! with a score-specific integer jitter drawn uniformly from `[-j, j]`.
//!
//! The RNG is an explicit parameter so a fixed seed reproduces exact values.
//! All eight jitters are drawn for every row, in `ScoreKind::ALL` order, whether or
//! not a score was supplied; the stream therefore never depends on which optional
//! columns are present.

use rand::Rng;

use crate::features::input::NormalizedInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreKind {
    Timeliness,
    RepaymentAbility,
    FinancialHealth,
    PaymentReliability,
    Stability,
    UtilityPaymentRegularity,
    LocationStability,
    MobileBankingUsage,
}

impl ScoreKind {
    pub const ALL: [ScoreKind; 8] = [
        ScoreKind::Timeliness,
        ScoreKind::RepaymentAbility,
        ScoreKind::FinancialHealth,
        ScoreKind::PaymentReliability,
        ScoreKind::Stability,
        ScoreKind::UtilityPaymentRegularity,
        ScoreKind::LocationStability,
        ScoreKind::MobileBankingUsage,
    ];

    pub fn column(self) -> &'static str {
        match self {
            ScoreKind::Timeliness => "timeliness_score",
            ScoreKind::RepaymentAbility => "repayment_ability_score",
            ScoreKind::FinancialHealth => "financial_health_score",
            ScoreKind::PaymentReliability => "payment_reliability_score",
            ScoreKind::Stability => "stability_index",
            ScoreKind::UtilityPaymentRegularity => "utility_payment_regularity_score",
            ScoreKind::LocationStability => "location_stability_score",
            ScoreKind::MobileBankingUsage => "mobile_banking_usage_score",
        }
    }

    /// Half-width of the symmetric integer jitter.
    pub fn jitter(self) -> i64 {
        match self {
            ScoreKind::Timeliness => 6,
            ScoreKind::RepaymentAbility => 5,
            ScoreKind::FinancialHealth => 8,
            ScoreKind::PaymentReliability => 6,
            ScoreKind::Stability => 10,
            ScoreKind::UtilityPaymentRegularity => 7,
            ScoreKind::LocationStability => 8,
            ScoreKind::MobileBankingUsage => 10,
        }
    }

    /// Inclusive `[min, max]` clip band.
    pub fn band(self) -> (i64, i64) {
        match self {
            ScoreKind::Timeliness => (5, 95),
            ScoreKind::RepaymentAbility => (5, 90),
            ScoreKind::FinancialHealth => (10, 95),
            ScoreKind::PaymentReliability => (10, 95),
            ScoreKind::Stability => (5, 90),
            ScoreKind::UtilityPaymentRegularity => (25, 95),
            ScoreKind::LocationStability => (30, 120),
            ScoreKind::MobileBankingUsage => (20, 95),
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_column(column: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.column() == column)
    }
}

/// Ratios the score formulas are written against.
#[derive(Debug, Clone, Copy)]
struct ScoreInputs {
    income: f64,
    age: f64,
    emp_years: f64,
    bank_years: f64,
    has_property: bool,
    dti: f64,
    app_to_income: f64,
    loan_utilization: f64,
    expense_ratio: f64,
    savings_ratio: f64,
    asset_ratio: f64,
}

impl ScoreInputs {
    fn from_input(n: &NormalizedInput) -> Self {
        let income = n.monthly_income.max(1.0);
        let annual = 12.0 * income;
        let property = n.property_value();

        Self {
            income,
            // Scores use whole years of age.
            age: n.age.trunc(),
            emp_years: n.employment_years,
            bank_years: n.banking_years,
            has_property: property > 0.0,
            dti: n.outstanding_loan / annual,
            app_to_income: n.loan_applied / annual,
            loan_utilization: n.outstanding_loan / n.loan_applied.max(1.0),
            expense_ratio: n.monthly_expenses / income,
            savings_ratio: n.monthly_savings / income,
            asset_ratio: (property + n.total_investments()) / annual.max(1.0),
        }
    }

    /// `ln(max(income, 1000) / divisor)`.
    fn log_income(&self, divisor: f64) -> f64 {
        (self.income.max(1000.0) / divisor).ln()
    }

    fn raw_score(&self, kind: ScoreKind) -> f64 {
        let s = self;
        let excess = |v: f64, floor: f64| (v - floor).max(0.0);

        match kind {
            ScoreKind::Timeliness => {
                let base = (s.emp_years * 10.0).min(45.0)
                    + (s.bank_years * 8.0).min(35.0)
                    + ((s.age - 18.0) * 1.2).min(25.0)
                    + (s.asset_ratio * 15.0).min(20.0)
                    + 5.0;
                let penalty = s.dti * 18.0
                    + excess(s.expense_ratio, 0.65) * 25.0
                    + excess(s.app_to_income, 1.2) * 12.0
                    + (1.0 - s.savings_ratio).max(0.0) * 10.0;
                base - penalty
            }
            ScoreKind::RepaymentAbility => {
                let base = (s.log_income(20000.0) * 20.0).min(35.0)
                    + (s.savings_ratio * 45.0).max(0.0)
                    + (s.emp_years * 3.0).min(25.0)
                    + (s.asset_ratio * 10.0).min(15.0)
                    + 5.0;
                let penalty = s.dti * 30.0
                    + excess(s.expense_ratio, 0.75) * 20.0
                    + excess(s.app_to_income, 1.8) * 15.0
                    + excess(s.loan_utilization, 0.85) * 12.0;
                base - penalty
            }
            ScoreKind::FinancialHealth => {
                let base = (s.log_income(15000.0) * 15.0).min(30.0)
                    + (s.asset_ratio * 25.0).min(35.0)
                    + (s.savings_ratio * 30.0).max(0.0)
                    + (s.bank_years * 2.0).min(20.0)
                    + 10.0;
                let age_penalty = if s.age < 22.0 || s.age > 65.0 { 5.0 } else { 0.0 };
                let penalty = s.dti * 25.0
                    + excess(s.expense_ratio, 0.70) * 22.0
                    + excess(s.app_to_income, 1.5) * 12.0
                    + age_penalty;
                base - penalty
            }
            ScoreKind::PaymentReliability => {
                let base = (s.emp_years * 5.0).min(40.0)
                    + ((1.2 - s.expense_ratio) * 35.0).max(0.0)
                    + s.log_income(3000.0).min(25.0)
                    + (s.bank_years * 2.0).min(15.0)
                    + 10.0;
                let penalty = s.dti * 35.0
                    + excess(s.expense_ratio, 0.80) * 30.0
                    + (s.loan_utilization - 0.65).abs() * 10.0
                    + excess(s.app_to_income, 2.0) * 8.0;
                base - penalty
            }
            ScoreKind::Stability => {
                let property_bonus = if s.has_property { 10.0 } else { 0.0 };
                let base = (s.emp_years * 4.0).min(30.0)
                    + (s.bank_years * 3.0).min(20.0)
                    + ((s.age - 18.0) * 0.8).min(25.0)
                    + (s.asset_ratio * 20.0).min(25.0)
                    + property_bonus
                    + 5.0;
                let tenure_penalty = if s.emp_years < 1.0 { 8.0 } else { 0.0 };
                let penalty = s.dti * 20.0
                    + excess(s.expense_ratio, 0.75) * 15.0
                    + excess(s.app_to_income, 2.2) * 10.0
                    + tenure_penalty;
                base - penalty
            }
            ScoreKind::UtilityPaymentRegularity => {
                90.0 - s.dti * 28.0 - excess(s.expense_ratio, 0.55) * 25.0
                    + (s.savings_ratio * 18.0).min(12.0)
                    + (s.bank_years * 1.5).min(8.0)
            }
            ScoreKind::LocationStability => {
                let property_bonus = if s.has_property { 20.0 } else { 0.0 };
                s.bank_years * 10.0
                    + s.emp_years * 6.0
                    + property_bonus
                    + ((s.age - 18.0) * 1.5).min(30.0)
                    + (s.asset_ratio * 12.0).min(15.0)
                    + 30.0
            }
            ScoreKind::MobileBankingUsage => {
                (95.0 - (s.age - 25.0) * 1.2).max(20.0)
                    + (s.emp_years * 2.0).min(15.0)
                    + (s.log_income(20000.0) * 10.0).min(15.0)
            }
        }
    }
}

/// Compute all eight scores for one applicant, consuming eight jitter draws.
pub fn impute_scores<R: Rng>(input: &NormalizedInput, rng: &mut R) -> [i64; 8] {
    let inputs = ScoreInputs::from_input(input);
    let mut out = [0i64; 8];
    for kind in ScoreKind::ALL {
        let j = kind.jitter();
        let jitter = rng.gen_range(-j..=j) as f64;
        // Truncate toward zero before clipping.
        let value = (inputs.raw_score(kind) + jitter) as i64;
        let (lo, hi) = kind.band();
        out[kind.index()] = value.clamp(lo, hi);
    }
    out
}

/// Final score vector: supplied values win, imputed values fill the gaps.
pub fn resolve_scores<R: Rng>(input: &NormalizedInput, rng: &mut R) -> ([f64; 8], [bool; 8]) {
    let imputed = impute_scores(input, rng);
    let mut values = [0.0; 8];
    let mut was_imputed = [false; 8];
    for kind in ScoreKind::ALL {
        let i = kind.index();
        match input.supplied_scores[i] {
            Some(v) => values[i] = v,
            None => {
                values[i] = imputed[i] as f64;
                was_imputed[i] = true;
            }
        }
    }
    (values, was_imputed)
}
