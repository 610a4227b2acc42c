//! Synthetic labeled applicants for bootstrapping and tests.

pub mod sample;

pub use sample::{SAMPLE_COLUMNS, generate};
