//! Role and scope mappings seen from one application.

use std::collections::HashSet;
use std::sync::Arc;

use kc_model::{Role, RoleOwner};
use kc_storage::ModelStore;
use tracing::debug;
use uuid::Uuid;

use crate::error::RealmResult;

/// Narrows the realm-wide mapping store to one application's roles.
///
/// Nothing is cached; every call reads the store.
#[derive(Clone)]
pub struct ScopeMappingView {
    store: Arc<dyn ModelStore>,
    application_id: Uuid,
}

impl ScopeMappingView {
    /// Creates the view for an application.
    #[must_use]
    pub fn new(store: Arc<dyn ModelStore>, application_id: Uuid) -> Self {
        Self {
            store,
            application_id,
        }
    }

    /// The application this view is narrowed to.
    #[must_use]
    pub const fn application_id(&self) -> Uuid {
        self.application_id
    }

    /// Roles of this application mapped to a user.
    ///
    /// Realm roles and other applications' roles are left out.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn get_application_role_mappings(&self, user_id: Uuid) -> RealmResult<HashSet<Role>> {
        let roles = self.store.get_role_mappings(user_id).await?;
        Ok(self.owned(roles))
    }

    /// Roles of this application in a client's scope.
    ///
    /// Realm roles and other applications' roles are left out.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn get_application_scope_mappings(
        &self,
        client_id: Uuid,
    ) -> RealmResult<HashSet<Role>> {
        let roles = self.store.get_scope_mappings(client_id).await?;
        Ok(self.owned(roles))
    }

    /// Adds a role to this application's own scope.
    ///
    /// # Errors
    ///
    /// Returns a storage constraint error if the role doesn't exist.
    pub async fn add_scope(&self, role: &Role) -> RealmResult<()> {
        self.store
            .add_scope_mapping(self.application_id, role.id)
            .await?;
        debug!(application_id = %self.application_id, role_id = %role.id, "scope mapping added");
        Ok(())
    }

    fn owned(&self, roles: Vec<Role>) -> HashSet<Role> {
        let owner = RoleOwner::Application(self.application_id);
        roles.into_iter().filter(|r| r.is_owned_by(owner)).collect()
    }
}

impl std::fmt::Debug for ScopeMappingView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeMappingView")
            .field("application_id", &self.application_id)
            .finish_non_exhaustive()
    }
}
