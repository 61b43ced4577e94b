//! Role storage provider traits.

use async_trait::async_trait;
use kc_model::{Role, RoleOwner};
use uuid::Uuid;

use crate::error::StorageResult;

/// Provider for role storage operations.
///
/// Implementations must be thread-safe and support concurrent access.
#[async_trait]
pub trait RoleProvider: Send + Sync {
    /// Creates a new role.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::Duplicate` if a role with the same name exists
    /// under the same owner.
    async fn create_role(&self, role: &Role) -> StorageResult<()>;

    /// Updates an existing role.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` if the role doesn't exist.
    async fn update_role(&self, role: &Role) -> StorageResult<()>;

    /// Deletes a role by ID.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` if the role doesn't exist, and
    /// `StorageError::Constraint` while default-role links or mappings still
    /// reference it.
    async fn delete_role(&self, id: Uuid) -> StorageResult<()>;

    /// Gets a role by ID, whoever owns it.
    async fn get_role(&self, id: Uuid) -> StorageResult<Option<Role>>;

    /// Gets a role by its `(owner, name)` key.
    async fn get_role_by_name(&self, owner: RoleOwner, name: &str)
    -> StorageResult<Option<Role>>;

    /// Lists all roles of an owner, ordered by name.
    async fn list_roles(&self, owner: RoleOwner) -> StorageResult<Vec<Role>>;
}

/// Provider for default-role links.
///
/// A default role is granted to every new account. Links are keyed by the
/// owner whose default set they belong to.
#[async_trait]
pub trait DefaultRoleProvider: Send + Sync {
    /// Lists the default roles of an owner, in the order they were added.
    async fn list_default_roles(&self, owner: RoleOwner) -> StorageResult<Vec<Role>>;

    /// Links a role into an owner's default set.
    ///
    /// Returns `false` if the link already existed.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::Constraint` if the role doesn't exist.
    async fn add_default_role(&self, owner: RoleOwner, role_id: Uuid) -> StorageResult<bool>;

    /// Unlinks a role from an owner's default set.
    ///
    /// Returns `false` if there was no such link.
    async fn remove_default_role(&self, owner: RoleOwner, role_id: Uuid) -> StorageResult<bool>;

    /// Removes a role from every default set. Returns the number of links removed.
    async fn remove_from_all_defaults(&self, role_id: Uuid) -> StorageResult<u64>;

    /// Empties an owner's default set. Returns the number of links removed.
    async fn clear_default_roles(&self, owner: RoleOwner) -> StorageResult<u64>;
}
