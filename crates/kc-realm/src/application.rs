//! Applications and their authorization model.
//!
//! [`Applications`] registers and deregisters applications within a realm.
//! [`ApplicationAdapter`] bundles one application's identity with its role
//! container and scope view.

use std::collections::HashSet;
use std::sync::Arc;

use kc_model::error::require_non_blank;
use kc_model::{Application, Role, RoleOwner};
use kc_storage::ModelStore;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::RealmResult;
use crate::roles::{RoleContainer, remove_role_cascade};
use crate::scope::ScopeMappingView;
use crate::transaction::finish;

/// One application with its roles and scope.
#[derive(Debug, Clone)]
pub struct ApplicationAdapter {
    application: Application,
    roles: RoleContainer,
    scope: ScopeMappingView,
}

impl ApplicationAdapter {
    /// Wraps an application.
    #[must_use]
    pub fn new(store: Arc<dyn ModelStore>, application: Application) -> Self {
        let roles = RoleContainer::for_application(Arc::clone(&store), &application);
        let scope = ScopeMappingView::new(store, application.id);
        Self {
            application,
            roles,
            scope,
        }
    }

    /// The application's identity attributes.
    #[must_use]
    pub const fn application(&self) -> &Application {
        &self.application
    }

    /// Mutable identity attributes. Call [`Applications::update`] to persist.
    pub fn application_mut(&mut self) -> &mut Application {
        &mut self.application
    }

    /// Unwraps the identity.
    #[must_use]
    pub fn into_application(self) -> Application {
        self.application
    }

    /// Application id.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.application.id
    }

    /// Application name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.application.name
    }

    /// Checks a presented client secret.
    #[must_use]
    pub fn validate_secret(&self, candidate: &str) -> bool {
        self.application.validate_secret(candidate)
    }

    /// The application's role container.
    #[must_use]
    pub const fn roles(&self) -> &RoleContainer {
        &self.roles
    }

    /// The application's view of role and scope mappings.
    #[must_use]
    pub const fn scope(&self) -> &ScopeMappingView {
        &self.scope
    }

    // === Shorthands ===

    /// See [`RoleContainer::get_role`].
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn get_role(&self, name: &str) -> RealmResult<Option<Role>> {
        self.roles.get_role(name).await
    }

    /// See [`RoleContainer::add_role`].
    ///
    /// # Errors
    ///
    /// Returns an error for a blank name or if storage fails.
    pub async fn add_role(&self, name: &str) -> RealmResult<Role> {
        self.roles.add_role(name).await
    }

    /// See [`RoleContainer::remove_role_by_id`].
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn remove_role_by_id(&self, id: Uuid) -> RealmResult<bool> {
        self.roles.remove_role_by_id(id).await
    }

    /// See [`RoleContainer::get_roles`].
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn get_roles(&self) -> RealmResult<HashSet<Role>> {
        self.roles.get_roles().await
    }

    /// See [`RoleContainer::get_role_by_id`].
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn get_role_by_id(&self, id: Uuid) -> RealmResult<Option<Role>> {
        self.roles.get_role_by_id(id).await
    }

    /// See [`RoleContainer::get_default_roles`].
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn get_default_roles(&self) -> RealmResult<Vec<String>> {
        self.roles.get_default_roles().await
    }

    /// See [`RoleContainer::update_default_roles`].
    ///
    /// # Errors
    ///
    /// Returns an error for a blank name or if storage fails.
    pub async fn update_default_roles<S: AsRef<str>>(&self, names: &[S]) -> RealmResult<()> {
        self.roles.update_default_roles(names).await
    }

    /// See [`ScopeMappingView::get_application_role_mappings`].
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn get_application_role_mappings(&self, user_id: Uuid) -> RealmResult<HashSet<Role>> {
        self.scope.get_application_role_mappings(user_id).await
    }

    /// See [`ScopeMappingView::get_application_scope_mappings`].
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn get_application_scope_mappings(
        &self,
        client_id: Uuid,
    ) -> RealmResult<HashSet<Role>> {
        self.scope.get_application_scope_mappings(client_id).await
    }

    /// See [`ScopeMappingView::add_scope`].
    ///
    /// # Errors
    ///
    /// Returns an error if the role doesn't exist or storage fails.
    pub async fn add_scope(&self, role: &Role) -> RealmResult<()> {
        self.scope.add_scope(role).await
    }

    /// Maps a role to a user.
    ///
    /// # Errors
    ///
    /// Returns a storage constraint error if the role doesn't exist.
    pub async fn grant_role(&self, user_id: Uuid, role: &Role) -> RealmResult<()> {
        self.roles.store().add_role_mapping(user_id, role.id).await?;
        debug!(user_id = %user_id, role_id = %role.id, application_id = %self.id(), "role granted");
        Ok(())
    }
}

impl PartialEq for ApplicationAdapter {
    fn eq(&self, other: &Self) -> bool {
        self.application == other.application
    }
}

impl Eq for ApplicationAdapter {}

/// Application registration within a realm.
#[derive(Clone)]
pub struct Applications {
    store: Arc<dyn ModelStore>,
}

impl Applications {
    /// Creates the registry over a storage session.
    #[must_use]
    pub fn new(store: Arc<dyn ModelStore>) -> Self {
        Self { store }
    }

    /// Registers a new application.
    ///
    /// # Errors
    ///
    /// Returns `RealmError::InvalidArgument` for a blank name, and a storage
    /// duplicate error if the realm already has an application by that name.
    pub async fn create(&self, realm_id: Uuid, name: &str) -> RealmResult<ApplicationAdapter> {
        require_non_blank("name", name)?;

        let application = Application::new(realm_id, name);
        self.store.create_application(&application).await?;

        info!(application_id = %application.id, realm_id = %realm_id, name, "application registered");
        Ok(self.adapter(application))
    }

    /// Wraps an application for role and scope operations.
    #[must_use]
    pub fn adapter(&self, application: Application) -> ApplicationAdapter {
        ApplicationAdapter::new(Arc::clone(&self.store), application)
    }

    /// Looks an application up by id.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn get_by_id(&self, id: Uuid) -> RealmResult<Option<ApplicationAdapter>> {
        let application = self.store.get_application(id).await?;
        Ok(application.map(|a| self.adapter(a)))
    }

    /// Looks an application up by name within a realm.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn get_by_name(
        &self,
        realm_id: Uuid,
        name: &str,
    ) -> RealmResult<Option<ApplicationAdapter>> {
        let application = self.store.get_application_by_name(realm_id, name).await?;
        Ok(application.map(|a| self.adapter(a)))
    }

    /// Lists a realm's applications, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn list(&self, realm_id: Uuid) -> RealmResult<Vec<Application>> {
        Ok(self.store.list_applications(realm_id).await?)
    }

    /// Persists changed identity attributes.
    ///
    /// # Errors
    ///
    /// Returns `RealmError::InvalidArgument` for a blank name, and a storage
    /// not-found error if the application was deregistered.
    pub async fn update(&self, application: &Application) -> RealmResult<()> {
        application.validate()?;
        self.store.update_application(application).await?;
        debug!(application_id = %application.id, "application updated");
        Ok(())
    }

    /// Deregisters an application.
    ///
    /// In one transaction, every role it owns is removed with the full role
    /// cascade, its default-role links and its own scope mappings are
    /// dropped, and then the application itself. Returns `false` for an
    /// unknown id.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails; nothing is removed in that case.
    pub async fn deregister(&self, id: Uuid) -> RealmResult<bool> {
        self.store.begin().await?;
        let result = self.deregister_steps(id).await;
        let removed = finish(self.store.as_ref(), "deregister application", result).await?;

        if removed {
            info!(application_id = %id, "application deregistered");
        }
        Ok(removed)
    }

    async fn deregister_steps(&self, id: Uuid) -> RealmResult<bool> {
        if self.store.get_application(id).await?.is_none() {
            return Ok(false);
        }

        let owner = RoleOwner::Application(id);
        self.store.clear_default_roles(owner).await?;
        for role in self.store.list_roles(owner).await? {
            remove_role_cascade(self.store.as_ref(), role.id).await?;
        }
        self.store.delete_scope_mappings_for_client(id).await?;
        self.store.delete_application(id).await?;
        Ok(true)
    }
}

impl std::fmt::Debug for Applications {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Applications").finish_non_exhaustive()
    }
}
