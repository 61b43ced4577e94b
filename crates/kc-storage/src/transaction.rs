//! Transaction boundaries.

use async_trait::async_trait;

use crate::error::StorageResult;

/// Transaction control for one storage session.
///
/// Cascading operations (role removal, default-role reconciliation,
/// application deregistration) call `begin`, run their steps, and then
/// `commit`, or `rollback` on the first failure. Commit is the flush point
/// after which other sessions observe the writes.
#[async_trait]
pub trait Transactional: Send + Sync {
    /// Starts a transaction.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::Transaction` if one is already active.
    async fn begin(&self) -> StorageResult<()>;

    /// Commits the active transaction.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::Transaction` if none is active.
    async fn commit(&self) -> StorageResult<()>;

    /// Discards every write since `begin`.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::Transaction` if none is active.
    async fn rollback(&self) -> StorageResult<()>;
}
