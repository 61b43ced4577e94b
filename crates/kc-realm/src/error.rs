//! Error types for the realm facades.

use kc_model::ValidationError;
use kc_storage::StorageError;
use thiserror::Error;

/// Errors returned by role, scope, and application operations.
///
/// Lookups that find nothing, or find an entity owned by someone else,
/// return `None` or `false` rather than an error.
#[derive(Debug, Error)]
pub enum RealmError {
    /// Malformed input, rejected before anything is stored.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The storage port failed. Any transaction in progress was rolled back.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<ValidationError> for RealmError {
    fn from(err: ValidationError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

/// Result type for realm operations.
pub type RealmResult<T> = Result<T, RealmError>;
