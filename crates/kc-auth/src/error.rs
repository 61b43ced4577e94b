//! Flow management error types.

use std::fmt;

use kc_model::ValidationError;
use kc_storage::StorageError;
use uuid::Uuid;

/// Flow management errors.
#[derive(Debug)]
pub enum FlowError {
    /// The execution or flow definition is malformed.
    InvalidExecution(String),
    /// No flow with this id.
    FlowNotFound(Uuid),
    /// No execution with this id.
    ExecutionNotFound(Uuid),
    /// The alias is already used by another flow of the realm.
    DuplicateAlias(String),
    /// Sub-flow references loop back to this flow.
    Cycle(Uuid),
    /// The storage port failed.
    Storage(StorageError),
}

impl fmt::Display for FlowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidExecution(msg) => write!(f, "invalid execution: {msg}"),
            Self::FlowNotFound(id) => write!(f, "authentication flow {id} not found"),
            Self::ExecutionNotFound(id) => write!(f, "authentication execution {id} not found"),
            Self::DuplicateAlias(alias) => write!(f, "flow alias '{alias}' is already in use"),
            Self::Cycle(id) => write!(f, "flow {id} references itself through its sub-flows"),
            Self::Storage(err) => write!(f, "storage error: {err}"),
        }
    }
}

impl std::error::Error for FlowError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StorageError> for FlowError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err)
    }
}

impl From<ValidationError> for FlowError {
    fn from(err: ValidationError) -> Self {
        Self::InvalidExecution(err.to_string())
    }
}

/// Result type for flow operations.
pub type FlowResult<T> = Result<T, FlowError>;
