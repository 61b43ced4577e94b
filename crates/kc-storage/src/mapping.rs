//! Realm-wide role and scope mapping storage.

use async_trait::async_trait;
use kc_model::Role;
use uuid::Uuid;

use crate::error::StorageResult;

/// Provider for role mappings (user → role) and scope mappings
/// (client → role).
///
/// Mappings are realm-global: the returned roles may be owned by the realm
/// or by any application. Narrowing to one application is the caller's job.
#[async_trait]
pub trait RoleMappingProvider: Send + Sync {
    /// Gets every role mapped to a user.
    async fn get_role_mappings(&self, user_id: Uuid) -> StorageResult<Vec<Role>>;

    /// Gets every role in a client's scope.
    async fn get_scope_mappings(&self, client_id: Uuid) -> StorageResult<Vec<Role>>;

    /// Maps a role to a user. Existing mappings are left as they are.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::Constraint` if the role doesn't exist.
    async fn add_role_mapping(&self, user_id: Uuid, role_id: Uuid) -> StorageResult<()>;

    /// Adds a role to a client's scope. Existing mappings are left as they are.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::Constraint` if the role doesn't exist.
    async fn add_scope_mapping(&self, client_id: Uuid, role_id: Uuid) -> StorageResult<()>;

    /// Deletes every user mapping of a role. Returns the number removed.
    async fn delete_role_mappings_for_role(&self, role_id: Uuid) -> StorageResult<u64>;

    /// Deletes every scope mapping of a role. Returns the number removed.
    async fn delete_scope_mappings_for_role(&self, role_id: Uuid) -> StorageResult<u64>;

    /// Deletes every scope mapping held by a client. Returns the number removed.
    async fn delete_scope_mappings_for_client(&self, client_id: Uuid) -> StorageResult<u64>;
}
