use std::path::PathBuf;

use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Setup failed: {0}")]
    Setup(#[from] SetupError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Errors that make a project location unusable before any cycle runs.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Project location not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Project location is not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    #[error("Project location unreadable: {} ({message})", path.display())]
    Unreadable { path: PathBuf, message: String },
}

/// Failure of a single analyzer call.
///
/// Never fatal: the cycle executor turns every variant into an error result
/// with confidence 0.0.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AnalyzerFailure {
    #[error("{message}")]
    Failed { message: String },

    #[error("Timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("{tool} unavailable: {message}")]
    Unavailable { tool: String, message: String },
}

impl AnalyzerFailure {
    /// Shorthand for a plain failure message.
    pub fn failed(message: impl Into<String>) -> Self {
        AnalyzerFailure::Failed {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for AnalyzerFailure {
    fn from(err: std::io::Error) -> Self {
        AnalyzerFailure::Failed {
            message: err.to_string(),
        }
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for analyzer port calls
pub type AnalyzerResultOf<T> = Result<T, AnalyzerFailure>;
