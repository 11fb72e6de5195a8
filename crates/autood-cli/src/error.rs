//! Error types for the autood CLI.

use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

/// Result type alias for CLI operations
pub(crate) type Result<T> = std::result::Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug)]
pub(crate) enum CliError {
    /// Input file not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// The dataset could not be loaded
    #[error("{0}")]
    Load(String),

    /// Bad command-line or config values
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Library error
    #[error("AutoOD error: {0}")]
    AutoOd(#[from] autood::AutoOdError),

    /// Result serialisation failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Get exit code for this error
    pub(crate) fn exit_code(&self) -> ExitCode {
        match self {
            Self::AutoOd(_) => ExitCode::from(1),
            Self::FileNotFound(_) => ExitCode::from(3),
            Self::Load(_) => ExitCode::from(4),
            Self::InvalidConfig(_) => ExitCode::from(5),
            Self::Io(_) => ExitCode::from(7),
            Self::Json(_) => ExitCode::from(8),
        }
    }
}
