//! Error types for AutoOD operations.
//!
//! Provides rich error context for library consumers.

use thiserror::Error;

/// Main error type for AutoOD operations.
///
/// # Examples
///
/// ```
/// use autood::error::AutoOdError;
///
/// let err = AutoOdError::DimensionMismatch {
///     expected: "100x10".to_string(),
///     actual: "100x5".to_string(),
/// };
/// assert!(err.to_string().contains("dimension mismatch"));
/// ```
#[derive(Debug, Error)]
pub enum AutoOdError {
    /// Matrix/vector dimensions don't match for the operation.
    #[error("Matrix dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions description
        expected: String,
        /// Actual dimensions found
        actual: String,
    },

    /// Matrix is singular (non-invertible), even after ridge regularization.
    #[error("Singular matrix detected: {context}")]
    SingularMatrix {
        /// Where the inversion was attempted
        context: String,
    },

    /// Invalid hyperparameter value provided.
    #[error("Invalid hyperparameter: {param} = {value}, expected {constraint}")]
    InvalidHyperparameter {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// The dataset could not be turned into a feature matrix.
    #[error("Cannot load data from file {path}: {reason}")]
    DatasetLoad {
        /// Source file
        path: String,
        /// What went wrong
        reason: String,
    },

    /// A requested column is not present in the input header.
    #[error("Column '{column}' not found, available columns: {available:?}")]
    MissingColumn {
        /// Requested column
        column: String,
        /// Header of the file
        available: Vec<String>,
    },

    /// The detector layout broke an invariant (group tiling, pruning mask,
    /// or the round-2 restart).
    #[error("Detector layout invariant violated: {message}")]
    InvariantViolation {
        /// Description of the divergence
        message: String,
    },

    /// CSV reader/writer error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    /// I/O error (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with string message.
    #[error("{0}")]
    Other(String),
}

impl From<&str> for AutoOdError {
    fn from(msg: &str) -> Self {
        AutoOdError::Other(msg.to_string())
    }
}

impl From<String> for AutoOdError {
    fn from(msg: String) -> Self {
        AutoOdError::Other(msg)
    }
}

impl AutoOdError {
    /// Create a dimension mismatch error with descriptive context
    #[must_use]
    pub fn dimension_mismatch(context: &str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            expected: format!("{context}={expected}"),
            actual: format!("{actual}"),
        }
    }

    /// Create an empty input error
    #[must_use]
    pub fn empty_input(context: &str) -> Self {
        Self::Other(format!("empty input: {context}"))
    }

    /// Create an invalid hyperparameter error
    #[must_use]
    pub fn invalid_hyperparameter(param: &str, value: impl ToString, constraint: &str) -> Self {
        Self::InvalidHyperparameter {
            param: param.to_string(),
            value: value.to_string(),
            constraint: constraint.to_string(),
        }
    }

    /// Create a dataset load error
    #[must_use]
    pub fn dataset_load(path: impl AsRef<std::path::Path>, reason: impl Into<String>) -> Self {
        Self::DatasetLoad {
            path: path.as_ref().display().to_string(),
            reason: reason.into(),
        }
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, AutoOdError>;
