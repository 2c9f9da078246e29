use medley_core::AppError;
use thiserror::Error;

/// Backend operation errors
///
/// `UserFacing` carries a message that may be shown to the end user as is.
/// Every other variant is an operator problem and reaches the end user as a
/// generic failure.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{0}")]
    UserFacing(String),

    #[error("Backend configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("FTP error: {0}")]
    Ftp(String),

    #[error("Internal backend error: {0}")]
    Internal(String),
}

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

impl BackendError {
    pub fn user_facing(message: impl Into<String>) -> Self {
        BackendError::UserFacing(message.into())
    }

    pub fn is_user_facing(&self) -> bool {
        matches!(self, BackendError::UserFacing(_))
    }
}

impl From<anyhow::Error> for BackendError {
    fn from(err: anyhow::Error) -> Self {
        BackendError::Internal(format!("{:#}", err))
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::UserFacing(message) => AppError::UserFacing(message),
            BackendError::Config(message) => AppError::Configuration(message),
            other => AppError::Internal(other.to_string()),
        }
    }
}
