//! Application storage provider trait.

use async_trait::async_trait;
use kc_model::Application;
use uuid::Uuid;

use crate::error::StorageResult;

/// Provider for application storage operations.
///
/// Implementations must be thread-safe and support concurrent access.
#[async_trait]
pub trait ApplicationProvider: Send + Sync {
    /// Creates a new application.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::Duplicate` if an application with the same name
    /// exists in the realm.
    async fn create_application(&self, application: &Application) -> StorageResult<()>;

    /// Updates an existing application.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` if the application doesn't exist.
    async fn update_application(&self, application: &Application) -> StorageResult<()>;

    /// Deletes an application by ID.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` if the application doesn't exist, and
    /// `StorageError::Constraint` while it still owns roles.
    async fn delete_application(&self, id: Uuid) -> StorageResult<()>;

    /// Gets an application by ID.
    async fn get_application(&self, id: Uuid) -> StorageResult<Option<Application>>;

    /// Gets an application by name within a realm.
    async fn get_application_by_name(
        &self,
        realm_id: Uuid,
        name: &str,
    ) -> StorageResult<Option<Application>>;

    /// Lists the applications of a realm, ordered by name.
    async fn list_applications(&self, realm_id: Uuid) -> StorageResult<Vec<Application>>;
}
