//! Transaction scoping for cascading operations.

use kc_storage::ModelStore;

use crate::error::RealmResult;

/// Commits on success, rolls back on failure.
///
/// A failed rollback is logged; the original error is returned either way.
pub async fn finish<T>(
    store: &dyn ModelStore,
    operation: &'static str,
    result: RealmResult<T>,
) -> RealmResult<T> {
    match result {
        Ok(value) => {
            store.commit().await?;
            Ok(value)
        }
        Err(err) => {
            tracing::warn!(operation, error = %err, "transaction rolled back");
            if let Err(rollback) = store.rollback().await {
                tracing::warn!(operation, error = %rollback, "rollback failed");
            }
            Err(err)
        }
    }
}
