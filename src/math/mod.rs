//! Numeric utilities: feature standardization and evaluation metrics.

pub mod metrics;
pub mod scaler;

pub use metrics::*;
pub use scaler::*;
