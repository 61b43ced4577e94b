//! Role containers.
//!
//! A [`RoleContainer`] is the role graph of one owner, an application or a
//! realm. It looks roles up by name or id, creates them idempotently,
//! removes them with a cascade over every link that references them, and
//! keeps the owner's default-role set in sync with a target list.

use std::collections::HashSet;
use std::sync::Arc;

use kc_model::error::require_non_blank;
use kc_model::{Application, Role, RoleOwner};
use kc_storage::{ModelStore, StorageResult};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::RealmResult;
use crate::transaction::finish;

/// The roles and default roles of one owner.
#[derive(Clone)]
pub struct RoleContainer {
    store: Arc<dyn ModelStore>,
    realm_id: Uuid,
    owner: RoleOwner,
}

impl RoleContainer {
    /// Creates a container for an arbitrary owner.
    #[must_use]
    pub fn new(store: Arc<dyn ModelStore>, realm_id: Uuid, owner: RoleOwner) -> Self {
        Self {
            store,
            realm_id,
            owner,
        }
    }

    /// Creates the container of an application's roles.
    #[must_use]
    pub fn for_application(store: Arc<dyn ModelStore>, application: &Application) -> Self {
        Self::new(
            store,
            application.realm_id,
            RoleOwner::Application(application.id),
        )
    }

    /// Creates the container of a realm's own roles.
    #[must_use]
    pub fn for_realm(store: Arc<dyn ModelStore>, realm_id: Uuid) -> Self {
        Self::new(store, realm_id, RoleOwner::Realm(realm_id))
    }

    /// The owner of every role in this container.
    #[must_use]
    pub const fn owner(&self) -> RoleOwner {
        self.owner
    }

    /// The realm this container lives in.
    #[must_use]
    pub const fn realm_id(&self) -> Uuid {
        self.realm_id
    }

    pub(crate) fn store(&self) -> &dyn ModelStore {
        self.store.as_ref()
    }

    // === Roles ===

    /// Looks a role up by name.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn get_role(&self, name: &str) -> RealmResult<Option<Role>> {
        Ok(self.store.get_role_by_name(self.owner, name).await?)
    }

    /// Returns the role with this name, creating it if it doesn't exist.
    ///
    /// If a concurrent caller creates the same name first, the storage
    /// unique constraint rejects the insert and the winner's role is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns `RealmError::InvalidArgument` for a blank name, or an error
    /// if storage fails.
    pub async fn add_role(&self, name: &str) -> RealmResult<Role> {
        require_non_blank("name", name)?;
        Ok(self.get_or_create(name).await?)
    }

    async fn get_or_create(&self, name: &str) -> StorageResult<Role> {
        if let Some(existing) = self.store.get_role_by_name(self.owner, name).await? {
            return Ok(existing);
        }

        let role = Role::new(self.realm_id, self.owner, name);
        match self.store.create_role(&role).await {
            Ok(()) => {
                info!(role_id = %role.id, owner = %self.owner, name, "role created");
                Ok(role)
            }
            Err(err) if err.is_duplicate() => {
                debug!(owner = %self.owner, name, "role created concurrently, re-reading");
                self.store
                    .get_role_by_name(self.owner, name)
                    .await?
                    .ok_or(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Removes a role owned by this container.
    ///
    /// Returns `false` if no such role exists here, including when the id
    /// belongs to another owner. In one transaction, the role leaves every
    /// default-role set, then its scope mappings and user mappings are
    /// deleted, then the role itself. Nothing is removed on failure.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn remove_role_by_id(&self, id: Uuid) -> RealmResult<bool> {
        self.store.begin().await?;
        let result = self.remove_owned(id).await;
        let removed = finish(self.store.as_ref(), "remove role", result).await?;

        if removed {
            info!(role_id = %id, owner = %self.owner, "role removed");
        }
        Ok(removed)
    }

    async fn remove_owned(&self, id: Uuid) -> RealmResult<bool> {
        if self.owned_role(id).await?.is_none() {
            return Ok(false);
        }
        remove_role_cascade(self.store.as_ref(), id).await?;
        Ok(true)
    }

    /// Returns every role of this owner.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn get_roles(&self) -> RealmResult<HashSet<Role>> {
        Ok(self
            .store
            .list_roles(self.owner)
            .await?
            .into_iter()
            .collect())
    }

    /// Looks a role up by id.
    ///
    /// A role owned by anyone else is reported as absent.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn get_role_by_id(&self, id: Uuid) -> RealmResult<Option<Role>> {
        Ok(self.owned_role(id).await?)
    }

    /// Renames a role of this container and replaces its description.
    ///
    /// Returns `None` if no such role exists here. Links to the role are
    /// kept, since they reference it by id.
    ///
    /// # Errors
    ///
    /// Returns `RealmError::InvalidArgument` for a blank name, and a storage
    /// duplicate error if another role of this owner already has the name.
    pub async fn update_role(
        &self,
        id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> RealmResult<Option<Role>> {
        require_non_blank("name", name)?;
        let Some(mut role) = self.owned_role(id).await? else {
            return Ok(None);
        };

        role.rename(name);
        role.set_description(description.map(str::to_string));
        self.store.update_role(&role).await?;

        info!(role_id = %id, owner = %self.owner, name, "role updated");
        Ok(Some(role))
    }

    async fn owned_role(&self, id: Uuid) -> StorageResult<Option<Role>> {
        match self.store.get_role(id).await? {
            Some(role) if role.is_owned_by(self.owner) => Ok(Some(role)),
            Some(role) => {
                debug!(role_id = %id, owner = %self.owner, actual = %role.owner, "role owned elsewhere");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    // === Default roles ===

    /// Names of the default roles, in the order they were added.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn get_default_roles(&self) -> RealmResult<Vec<String>> {
        Ok(self
            .store
            .list_default_roles(self.owner)
            .await?
            .into_iter()
            .map(|role| role.name)
            .collect())
    }

    /// Makes a role default, creating it first if needed.
    ///
    /// # Errors
    ///
    /// Returns `RealmError::InvalidArgument` for a blank name, or an error
    /// if storage fails.
    pub async fn add_default_role(&self, name: &str) -> RealmResult<Role> {
        require_non_blank("name", name)?;

        self.store.begin().await?;
        let result = self.link_default(name).await;
        let role = finish(self.store.as_ref(), "add default role", result).await?;

        debug!(owner = %self.owner, name, "default role added");
        Ok(role)
    }

    async fn link_default(&self, name: &str) -> RealmResult<Role> {
        let role = self.get_or_create(name).await?;
        self.store.add_default_role(self.owner, role.id).await?;
        Ok(role)
    }

    /// Stops a role from being default. The role itself is kept.
    ///
    /// Returns `false` if the role doesn't exist or wasn't default.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn remove_default_role(&self, name: &str) -> RealmResult<bool> {
        let Some(role) = self.get_role(name).await? else {
            return Ok(false);
        };
        let removed = self.store.remove_default_role(self.owner, role.id).await?;
        if removed {
            debug!(owner = %self.owner, name, "default role removed");
        }
        Ok(removed)
    }

    /// Makes the default-role set equal to `names`.
    ///
    /// Defaults missing from `names` are unlinked first; names not yet
    /// default are then linked, creating their roles where needed. Names
    /// that are default and still requested are left alone, and repeated
    /// names count once, so calling this again with the same list changes
    /// nothing. Everything runs in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RealmError::InvalidArgument` if any name is blank, before
    /// anything is stored, or an error if storage fails.
    pub async fn update_default_roles<S: AsRef<str>>(&self, names: &[S]) -> RealmResult<()> {
        let mut seen = HashSet::new();
        let mut target = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            require_non_blank("name", name)?;
            if seen.insert(name) {
                target.push(name);
            }
        }

        self.store.begin().await?;
        let result = self.reconcile_defaults(&target).await;
        let (removed, added) = finish(self.store.as_ref(), "update default roles", result).await?;

        info!(owner = %self.owner, removed, added, "default roles updated");
        Ok(())
    }

    async fn reconcile_defaults(&self, target: &[&str]) -> RealmResult<(usize, usize)> {
        let current = self.store.list_default_roles(self.owner).await?;
        let wanted: HashSet<&str> = target.iter().copied().collect();

        let mut removed = 0;
        for role in &current {
            if !wanted.contains(role.name.as_str()) {
                self.store.remove_default_role(self.owner, role.id).await?;
                removed += 1;
            }
        }

        let existing: HashSet<&str> = current.iter().map(|r| r.name.as_str()).collect();
        let mut added = 0;
        for name in target {
            if existing.contains(name) {
                continue;
            }
            let role = self.get_or_create(name).await?;
            if self.store.add_default_role(self.owner, role.id).await? {
                added += 1;
            }
        }

        Ok((removed, added))
    }
}

/// Deletes a role and every link referencing it, in dependency order.
///
/// Must run inside a transaction.
pub(crate) async fn remove_role_cascade(store: &dyn ModelStore, role_id: Uuid) -> StorageResult<()> {
    let defaults = store.remove_from_all_defaults(role_id).await?;
    let scopes = store.delete_scope_mappings_for_role(role_id).await?;
    let mappings = store.delete_role_mappings_for_role(role_id).await?;
    store.delete_role(role_id).await?;

    debug!(role_id = %role_id, defaults, scopes, mappings, "role links removed");
    Ok(())
}

impl std::fmt::Debug for RoleContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleContainer")
            .field("realm_id", &self.realm_id)
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use kc_storage::memory::ops;
    use kc_storage::{ApplicationProvider, MemoryStore, RoleMappingProvider, RoleProvider};

    use super::*;
    use crate::RealmError;

    struct Fixture {
        store: Arc<MemoryStore>,
        application: Application,
        roles: RoleContainer,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let application = Application::new(Uuid::now_v7(), "portal");
        store.create_application(&application).await.unwrap();
        let roles = RoleContainer::for_application(store.clone(), &application);
        Fixture {
            store,
            application,
            roles,
        }
    }

    fn names(roles: &HashSet<Role>) -> HashSet<String> {
        roles.iter().map(|r| r.name.clone()).collect()
    }

    fn sorted(mut names: Vec<String>) -> Vec<String> {
        names.sort();
        names
    }

    #[tokio::test]
    async fn add_role_is_idempotent() {
        let f = fixture().await;

        let first = f.roles.add_role("admin").await.unwrap();
        let second = f.roles.add_role("admin").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(f.roles.get_roles().await.unwrap().len(), 1);
        assert_eq!(first.owner, RoleOwner::Application(f.application.id));
    }

    #[tokio::test]
    async fn add_role_rejects_blank_names_before_storage() {
        let f = fixture().await;
        f.store.fail_on(ops::ROLE_CREATE);

        assert!(matches!(
            f.roles.add_role("   ").await,
            Err(RealmError::InvalidArgument(_))
        ));
        // The storage fault was never reached.
        assert!(matches!(f.roles.add_role("x").await, Err(RealmError::Storage(_))));
    }

    #[tokio::test]
    async fn add_role_sees_roles_created_by_other_sessions() {
        let f = fixture().await;
        let winner = Role::new_application_role(f.application.realm_id, f.application.id, "auditor");
        f.store.create_role(&winner).await.unwrap();

        let other = RoleContainer::for_application(Arc::new(f.store.session()), &f.application);
        let role = other.add_role("auditor").await.unwrap();

        assert_eq!(role.id, winner.id);
        assert_eq!(other.get_roles().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn get_roles_is_empty_not_absent() {
        let f = fixture().await;
        assert!(f.roles.get_roles().await.unwrap().is_empty());
        assert!(f.roles.get_role("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn same_name_under_different_owners() {
        let f = fixture().await;
        let realm_roles = RoleContainer::for_realm(f.store.clone(), f.application.realm_id);

        let app_admin = f.roles.add_role("admin").await.unwrap();
        let realm_admin = realm_roles.add_role("admin").await.unwrap();

        assert_ne!(app_admin.id, realm_admin.id);
        assert!(realm_admin.is_realm_role());
    }

    #[tokio::test]
    async fn get_role_by_id_enforces_ownership() {
        let f = fixture().await;
        let other = Application::new(f.application.realm_id, "billing");
        f.store.create_application(&other).await.unwrap();
        let other_roles = RoleContainer::for_application(f.store.clone(), &other);
        let realm_roles = RoleContainer::for_realm(f.store.clone(), f.application.realm_id);

        let foreign = other_roles.add_role("admin").await.unwrap();
        let realm_role = realm_roles.add_role("offline_access").await.unwrap();
        let own = f.roles.add_role("admin").await.unwrap();

        assert_eq!(f.roles.get_role_by_id(own.id).await.unwrap(), Some(own));
        assert!(f.roles.get_role_by_id(foreign.id).await.unwrap().is_none());
        assert!(f.roles.get_role_by_id(realm_role.id).await.unwrap().is_none());
        assert!(f.roles.get_role_by_id(Uuid::now_v7()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn remove_role_cascades_every_link() {
        let f = fixture().await;
        let user = Uuid::now_v7();
        let client = Uuid::now_v7();

        let admin = f.roles.add_role("admin").await.unwrap();
        f.roles.add_role("user").await.unwrap();
        f.roles.update_default_roles(&["admin", "user"]).await.unwrap();
        f.store.add_role_mapping(user, admin.id).await.unwrap();
        f.store.add_scope_mapping(client, admin.id).await.unwrap();

        assert!(f.roles.remove_role_by_id(admin.id).await.unwrap());

        assert!(!names(&f.roles.get_roles().await.unwrap()).contains("admin"));
        assert_eq!(f.roles.get_default_roles().await.unwrap(), vec!["user".to_string()]);
        assert!(f.store.get_role_mappings(user).await.unwrap().is_empty());
        assert!(f.store.get_scope_mappings(client).await.unwrap().is_empty());
        assert!(f.store.get_role(admin.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn remove_role_of_another_owner_is_not_found() {
        let f = fixture().await;
        let realm_roles = RoleContainer::for_realm(f.store.clone(), f.application.realm_id);
        let realm_role = realm_roles.add_role("admin").await.unwrap();

        assert!(!f.roles.remove_role_by_id(realm_role.id).await.unwrap());
        assert!(!f.roles.remove_role_by_id(Uuid::now_v7()).await.unwrap());
        assert!(f.store.get_role(realm_role.id).await.unwrap().is_some());
        assert!(!f.store.in_transaction());
    }

    #[tokio::test]
    async fn update_role_renames_and_keeps_links() {
        let f = fixture().await;
        let user = Uuid::now_v7();
        let admin = f.roles.add_default_role("admin").await.unwrap();
        f.store.add_role_mapping(user, admin.id).await.unwrap();

        let updated = f
            .roles
            .update_role(admin.id, "administrator", Some("full access"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.id, admin.id);
        assert_eq!(updated.description.as_deref(), Some("full access"));

        assert!(f.roles.get_role("admin").await.unwrap().is_none());
        let stored = f.roles.get_role("administrator").await.unwrap().unwrap();
        assert_eq!(stored.description.as_deref(), Some("full access"));
        assert_eq!(f.roles.get_default_roles().await.unwrap(), vec!["administrator"]);
        assert_eq!(f.store.get_role_mappings(user).await.unwrap(), vec![stored]);
    }

    #[tokio::test]
    async fn update_role_respects_ownership_and_uniqueness() {
        let f = fixture().await;
        let admin = f.roles.add_role("admin").await.unwrap();
        let user = f.roles.add_role("user").await.unwrap();
        let realm_role = RoleContainer::for_realm(f.store.clone(), f.application.realm_id)
            .add_role("offline_access")
            .await
            .unwrap();

        assert!(
            f.roles
                .update_role(realm_role.id, "stolen", None)
                .await
                .unwrap()
                .is_none()
        );
        assert!(matches!(
            f.roles.update_role(user.id, "admin", None).await,
            Err(RealmError::Storage(e)) if e.is_duplicate()
        ));
        assert!(matches!(
            f.roles.update_role(admin.id, " ", None).await,
            Err(RealmError::InvalidArgument(_))
        ));

        let stored = f.store.get_role(realm_role.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "offline_access");
        assert_eq!(names(&f.roles.get_roles().await.unwrap()).len(), 2);
    }

    #[tokio::test]
    async fn failed_cascade_rolls_back() {
        let f = fixture().await;
        let user = Uuid::now_v7();
        let client = Uuid::now_v7();
        let admin = f.roles.add_default_role("admin").await.unwrap();
        f.store.add_role_mapping(user, admin.id).await.unwrap();
        f.store.add_scope_mapping(client, admin.id).await.unwrap();

        f.store.fail_on(ops::ROLE_DELETE);
        let err = f.roles.remove_role_by_id(admin.id).await.unwrap_err();
        assert!(matches!(err, RealmError::Storage(_)));
        f.store.clear_faults();

        // Every step before the failure was undone.
        assert_eq!(f.roles.get_default_roles().await.unwrap(), vec!["admin".to_string()]);
        assert_eq!(f.store.get_role_mappings(user).await.unwrap().len(), 1);
        assert_eq!(f.store.get_scope_mappings(client).await.unwrap().len(), 1);
        assert!(f.roles.get_role_by_id(admin.id).await.unwrap().is_some());
        assert!(!f.store.in_transaction());
    }

    #[tokio::test]
    async fn update_default_roles_end_to_end() {
        let f = fixture().await;
        f.roles.add_role("admin").await.unwrap();
        f.roles.add_role("user").await.unwrap();
        f.roles.update_default_roles(&["user"]).await.unwrap();

        f.roles.update_default_roles(&["admin", "editor"]).await.unwrap();

        assert_eq!(
            sorted(f.roles.get_default_roles().await.unwrap()),
            vec!["admin".to_string(), "editor".to_string()]
        );
        let all = names(&f.roles.get_roles().await.unwrap());
        assert!(all.contains("editor"));
        assert!(all.contains("user"));
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn update_default_roles_is_idempotent() {
        let f = fixture().await;
        let target = ["viewer", "editor"];

        f.roles.update_default_roles(&target).await.unwrap();
        let once = f.roles.get_default_roles().await.unwrap();
        let roles_once = f.roles.get_roles().await.unwrap();

        // A second run must not touch storage at all.
        f.store.fail_on(ops::DEFAULT_ROLE_ADD);
        f.store.fail_on(ops::DEFAULT_ROLE_REMOVE);
        f.store.fail_on(ops::ROLE_CREATE);
        f.roles.update_default_roles(&target).await.unwrap();

        assert_eq!(f.roles.get_default_roles().await.unwrap(), once);
        assert_eq!(f.roles.get_roles().await.unwrap(), roles_once);
    }

    #[tokio::test]
    async fn update_default_roles_keeps_overlap_in_place() {
        let f = fixture().await;
        f.roles.update_default_roles(&["a", "b"]).await.unwrap();

        f.store.fail_on(ops::DEFAULT_ROLE_REMOVE);
        // "b" stays default without being removed and re-added.
        f.roles.update_default_roles(&["b", "a", "c"]).await.unwrap();
        f.store.clear_faults();

        assert_eq!(
            f.roles.get_default_roles().await.unwrap(),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
    }

    #[tokio::test]
    async fn update_default_roles_creates_each_missing_role_once() {
        let f = fixture().await;

        f.roles
            .update_default_roles(&["editor", "editor", "editor"])
            .await
            .unwrap();

        let roles = f.roles.get_roles().await.unwrap();
        assert_eq!(names(&roles), HashSet::from(["editor".to_string()]));
        assert_eq!(f.roles.get_default_roles().await.unwrap(), vec!["editor".to_string()]);
    }

    #[tokio::test]
    async fn update_default_roles_to_empty() {
        let f = fixture().await;
        f.roles.update_default_roles(&["a", "b"]).await.unwrap();

        f.roles.update_default_roles::<&str>(&[]).await.unwrap();

        assert!(f.roles.get_default_roles().await.unwrap().is_empty());
        assert_eq!(f.roles.get_roles().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_default_roles_validates_before_storage() {
        let f = fixture().await;
        f.roles.update_default_roles(&["a"]).await.unwrap();

        let err = f.roles.update_default_roles(&["b", ""]).await.unwrap_err();
        assert!(matches!(err, RealmError::InvalidArgument(_)));
        assert_eq!(f.roles.get_default_roles().await.unwrap(), vec!["a".to_string()]);
        assert!(f.roles.get_role("b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_update_leaves_defaults_untouched() {
        let f = fixture().await;
        f.roles.update_default_roles(&["user"]).await.unwrap();

        f.store.fail_on(ops::DEFAULT_ROLE_ADD);
        assert!(f.roles.update_default_roles(&["admin"]).await.is_err());
        f.store.clear_faults();

        assert_eq!(f.roles.get_default_roles().await.unwrap(), vec!["user".to_string()]);
        assert!(f.roles.get_role("admin").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn default_role_add_and_remove() {
        let f = fixture().await;

        let role = f.roles.add_default_role("member").await.unwrap();
        f.roles.add_default_role("member").await.unwrap();
        assert_eq!(f.roles.get_default_roles().await.unwrap(), vec!["member".to_string()]);

        assert!(f.roles.remove_default_role("member").await.unwrap());
        assert!(!f.roles.remove_default_role("member").await.unwrap());
        assert!(!f.roles.remove_default_role("never-existed").await.unwrap());
        assert_eq!(f.roles.get_role_by_id(role.id).await.unwrap(), Some(role));
    }

    #[tokio::test]
    async fn realm_container_has_its_own_defaults() {
        let f = fixture().await;
        let realm_roles = RoleContainer::for_realm(f.store.clone(), f.application.realm_id);

        realm_roles.update_default_roles(&["offline_access"]).await.unwrap();
        f.roles.update_default_roles(&["viewer"]).await.unwrap();

        assert_eq!(
            realm_roles.get_default_roles().await.unwrap(),
            vec!["offline_access".to_string()]
        );
        assert_eq!(f.roles.get_default_roles().await.unwrap(), vec!["viewer".to_string()]);
    }
}
