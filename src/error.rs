//! Error types for servdesk.

use thiserror::Error;

use crate::mail::MailError;

/// Common error type for servdesk.
#[derive(Error, Debug)]
pub enum ServdeskError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant, except unique
    /// constraint violations which become [`ServdeskError::Conflict`].
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Permission denied error.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Uniqueness conflict.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Outbound mail delivery error.
    #[error("mail error: {0}")]
    Mail(#[from] MailError),
}

impl From<sqlx::Error> for ServdeskError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return ServdeskError::Conflict(db_err.message().to_string());
            }
        }
        ServdeskError::Database(e.to_string())
    }
}

/// Result type alias for servdesk operations.
pub type Result<T> = std::result::Result<T, ServdeskError>;
