//! SQL storage error types.

use kc_storage::StorageError;
use sqlx::Error as SqlxError;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";

/// Converts a `SQLx` error to a storage error.
#[allow(clippy::needless_pass_by_value)]
pub fn from_sqlx_error(err: SqlxError) -> StorageError {
    match err {
        SqlxError::RowNotFound => {
            // Generic internal error - callers should handle specific not-found cases
            StorageError::Internal("Row not found".to_string())
        }
        SqlxError::Database(db_err) => match db_err.code().as_deref() {
            Some(UNIQUE_VIOLATION) => {
                StorageError::constraint(format!("Duplicate entry: {}", db_err.message()))
            }
            Some(FOREIGN_KEY_VIOLATION) => {
                StorageError::constraint(format!("Reference violation: {}", db_err.message()))
            }
            Some(CHECK_VIOLATION) => StorageError::InvalidData(db_err.message().to_string()),
            _ => StorageError::Query(db_err.to_string()),
        },
        SqlxError::PoolTimedOut => StorageError::Connection("Connection pool timeout".to_string()),
        SqlxError::PoolClosed => StorageError::Connection("Connection pool closed".to_string()),
        SqlxError::ColumnDecode { .. } | SqlxError::Decode(_) => {
            StorageError::InvalidData(err.to_string())
        }
        _ => StorageError::Internal(err.to_string()),
    }
}

/// Converts an insert error, reporting unique violations as duplicates of
/// `entity_type.field = value`.
pub fn from_insert_error(
    err: SqlxError,
    entity_type: &'static str,
    field: &'static str,
    value: &str,
) -> StorageError {
    if let SqlxError::Database(db_err) = &err
        && db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
    {
        return StorageError::duplicate(entity_type, field, value);
    }
    from_sqlx_error(err)
}
