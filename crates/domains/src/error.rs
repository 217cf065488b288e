//! # Error Handling
//!
//! One error enum spans every layer; adapters translate their own failures
//! into it at the boundary so services stay storage-agnostic.

use thiserror::Error;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Entity not found: (entity kind, identifier).
    #[error("{0} not found: {1}")]
    NotFound(String, String),

    /// Input failed validation before reaching any store.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing or unusable credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Uniqueness or state conflict.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Too many attempts; retry after the given number of seconds.
    #[error("Too many attempts, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Storage-layer failure.
    #[error("Database error: {0}")]
    Database(String),

    /// Anything else that should surface as a 500.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Convenience constructor for the common (kind, id) miss.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        AppError::NotFound(entity.into(), id.to_string())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    /// True when the error is caller-correctable rather than a server fault.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, AppError::Database(_) | AppError::Internal(_))
    }
}

/// Application-wide result alias.
pub type Result<T> = std::result::Result<T, AppError>;
