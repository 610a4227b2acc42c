//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - column names (`columns`)
//! - risk classes, PD thresholds and the loan-type vocabulary
//! - raw applicant rows (`RawRecord`)
//! - training configuration (`TrainConfig`, `FamilyKind`)

pub mod columns;
pub mod types;

pub use types::*;
