use thiserror::Error;

/// Domain-level error types
#[derive(Error, Debug)]
pub enum DomainError {
    /// Configuration value unparsable or out of range
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Referenced account (or other resource) does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller-side business rule failed (bad amount, inactive target, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Storage failure, propagated from sqlx
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Failure from a lower layer that reports anyhow errors
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Result type alias for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DomainError::NotFound(_))
    }
}
