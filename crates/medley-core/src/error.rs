//! Error types module
//!
//! All caller-visible failures are unified under [`AppError`]. The variants
//! follow the ingestion taxonomy: a user-facing error carries a message that
//! is safe to show verbatim, everything else is reported to the end user as
//! a generic failure and logged in detail for the operator.
//!
//! "This backend does not handle the input" is never an error. Backends
//! report it through explicit outcome enums and the pipeline consumes it.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like bad user input
    Debug,
    /// Warning level - for recoverable issues like flaky remote hosts
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be presented to a caller.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "UNUSABLE_INPUT")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden from the end user
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("No storage backend accepted the input")]
    UnusableInput,

    #[error("{0}")]
    UserFacing(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Configuration(format!("JSON parsing error: {}", err))
    }
}

/// Static metadata for each variant: (error_code, recoverable, sensitive, log_level).
fn app_error_static_metadata(err: &AppError) -> (&'static str, bool, bool, LogLevel) {
    match err {
        AppError::UnusableInput => ("UNUSABLE_INPUT", false, false, LogLevel::Debug),
        AppError::UserFacing(_) => ("USER_INPUT_ERROR", false, false, LogLevel::Debug),
        AppError::Configuration(_) => ("CONFIGURATION_ERROR", false, true, LogLevel::Error),
        AppError::NotFound(_) => ("NOT_FOUND", false, false, LogLevel::Debug),
        AppError::Internal(_) => ("INTERNAL_ERROR", true, true, LogLevel::Error),
        AppError::InternalWithSource { .. } => ("INTERNAL_ERROR", true, true, LogLevel::Error),
    }
}

impl AppError {
    /// True when the message may be shown to the end user verbatim.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            AppError::UnusableInput | AppError::UserFacing(_) | AppError::NotFound(_)
        )
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).1
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            AppError::UnusableInput => {
                "The file or URL you provided could not be used".to_string()
            }
            AppError::UserFacing(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::Configuration(_) => "Media storage is not configured correctly".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}
