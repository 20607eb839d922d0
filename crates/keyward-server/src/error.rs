//! Error taxonomy for licensing operations.

use keyward_core::db::DatabaseError;

/// Result type alias using [`LicenseError`].
pub type LicenseResult<T> = Result<T, LicenseError>;

#[derive(Debug, thiserror::Error)]
pub enum LicenseError {
    /// Malformed or out-of-range input; the message is shown to the caller.
    #[error("{0}")]
    Validation(String),

    #[error("Credit amount must be a positive integer")]
    InvalidAmount,

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Key already exists")]
    DuplicateKey,

    #[error("Username already taken")]
    UsernameTaken,

    #[error("Invalid or used referral token")]
    InvalidToken,

    #[error("Insufficient credits")]
    InsufficientCredits,

    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),

    #[error("Internal error: {0}")]
    Internal(String),
}
