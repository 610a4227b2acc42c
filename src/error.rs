//! Error types.
//!
//! Two layers:
//!
//! - `AppError`: what the `crisk` binary reports (message + process exit code)
//! - `ScoringError`: the scoring/ingest taxonomy, carrying enough context
//!   (row, column, stage) for operators
//!
//! Exit codes: 2 = bad input/config, 3 = model not loaded / insufficient data,
//! 4 = internal failure.

use thiserror::Error;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Pipeline stage in which an internal failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ingest,
    Project,
    Predict,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Ingest => "ingest",
            Stage::Project => "project",
            Stage::Predict => "predict",
        };
        f.write_str(name)
    }
}

/// Failures of a scoring request (or of reading a labeled training file).
///
/// Every variant fails the whole batch; there is no per-row partial success.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    #[error("Model not loaded.")]
    ModelNotLoaded,

    #[error("Invalid file type: {extension}. Supported: {supported}")]
    UnsupportedInputFormat { extension: String, supported: String },

    #[error("Empty input: no data rows found.")]
    EmptyInput,

    #[error("Missing required columns: {missing:?}. Available: {available:?}")]
    MissingRequiredColumns {
        missing: Vec<String>,
        available: Vec<String>,
    },

    #[error("Row {row}: column `{column}` has non-numeric value {value:?}.")]
    InvalidFieldValue {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Row {row}: column `{column}` must be non-zero to compute derived ratios.")]
    ZeroDivisor { row: usize, column: String },

    #[error("Row {row}: unknown risk label {label:?}.")]
    InvalidLabel { row: usize, label: String },

    #[error("Feature `{column}` missing after derivation (stage: {stage}).")]
    FeatureProjectionError { column: String, stage: Stage },

    #[error("Missing optional dependency for {format} input: {detail}")]
    OptionalDependencyMissing { format: String, detail: String },

    #[error("Processing failed during {stage}: {detail}")]
    UnclassifiedProcessingError { stage: Stage, detail: String },
}

impl ScoringError {
    /// True for errors caused by the caller's input rather than by the service.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ScoringError::UnsupportedInputFormat { .. }
                | ScoringError::EmptyInput
                | ScoringError::MissingRequiredColumns { .. }
                | ScoringError::InvalidFieldValue { .. }
                | ScoringError::ZeroDivisor { .. }
                | ScoringError::InvalidLabel { .. }
                | ScoringError::OptionalDependencyMissing { .. }
        )
    }

    /// HTTP-equivalent status code for this error.
    pub fn status(&self) -> u16 {
        match self {
            ScoringError::ModelNotLoaded => 503,
            e if e.is_input_error() => 400,
            _ => 500,
        }
    }

    /// Message safe to show to end users.
    ///
    /// Internal variants collapse to a generic message; `Display` keeps the detail.
    pub fn public_message(&self) -> String {
        match self {
            ScoringError::FeatureProjectionError { .. }
            | ScoringError::UnclassifiedProcessingError { .. } => {
                "Processing failed due to an internal error.".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<ScoringError> for AppError {
    fn from(err: ScoringError) -> Self {
        let exit_code = match &err {
            ScoringError::ModelNotLoaded => 3,
            e if e.is_input_error() => 2,
            _ => 4,
        };
        AppError::new(exit_code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_map_to_400_and_exit_2() {
        let err = ScoringError::MissingRequiredColumns {
            missing: vec!["age".to_string()],
            available: vec!["monthly_income_inr".to_string()],
        };
        assert_eq!(err.status(), 400);
        assert_eq!(AppError::from(err).exit_code(), 2);
    }

    #[test]
    fn internal_errors_hide_detail_from_users() {
        let err = ScoringError::FeatureProjectionError {
            column: "credit_score".to_string(),
            stage: Stage::Project,
        };
        assert_eq!(err.status(), 500);
        assert!(!err.public_message().contains("credit_score"));
        assert!(err.to_string().contains("credit_score"));
        assert!(err.to_string().contains("project"));
        assert_eq!(AppError::from(err).exit_code(), 4);
    }

    #[test]
    fn model_not_loaded_is_unavailable() {
        assert_eq!(ScoringError::ModelNotLoaded.status(), 503);
        assert_eq!(AppError::from(ScoringError::ModelNotLoaded).exit_code(), 3);
    }
}
