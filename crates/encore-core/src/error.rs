//! Error types and result handling for email event operations.
//!
//! Defines structured error taxonomy with codes for client disambiguation
//! and proper HTTP status mapping. Covers payload validation, webhook
//! authenticity, and infrastructure failures across the ingestion pipeline.

use thiserror::Error;

/// Result type alias using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type for storage operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Entity not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Constraint violation.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound("requested entity not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Self::ConstraintViolation(format!("unique constraint violation: {}", db_err))
            },
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                Self::ConstraintViolation(format!("foreign key constraint violation: {}", db_err))
            },
            sqlx::Error::Database(db_err) if db_err.is_check_violation() => {
                Self::ConstraintViolation(format!("check constraint violation: {}", db_err))
            },
            _ => Self::Database(err.to_string()),
        }
    }
}

/// Service-level errors with stable codes surfaced to HTTP clients.
#[derive(Debug, Error)]
pub enum EncoreError {
    // Request Errors (E1001-E1003)
    /// Webhook signature validation failed (E1001).
    #[error("[E1001] Invalid signature: {reason}")]
    InvalidSignature {
        /// Why the signature was rejected
        reason: String,
    },

    /// Payload exceeds configured limit (E1002).
    #[error("[E1002] Payload too large: size {size_bytes} bytes exceeds {limit_bytes} byte limit")]
    PayloadTooLarge {
        /// Size of the payload in bytes
        size_bytes: usize,
        /// Configured maximum in bytes
        limit_bytes: usize,
    },

    /// Payload could not be parsed into a provider webhook (E1003).
    #[error("[E1003] Malformed payload: {0}")]
    MalformedPayload(String),

    /// Storage layer error.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl EncoreError {
    /// Returns the error code (E1001-E1003, E9999 for storage failures).
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidSignature { .. } => "E1001",
            Self::PayloadTooLarge { .. } => "E1002",
            Self::MalformedPayload(_) => "E1003",
            Self::Core(_) => "E9999",
        }
    }
}
