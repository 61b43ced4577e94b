//! In-memory storage backend.
//!
//! [`MemoryStore`] implements every provider trait over process memory. It
//! enforces the same integrity rules as the SQL schema (unique names, no
//! dangling references) so cascade ordering bugs surface in tests.
//!
//! Each handle is one session. [`MemoryStore::session`] opens another session
//! over the same data. A transaction works on a private copy of the committed
//! data and logs its writes; `commit` replays the log against whatever is
//! committed at that point, `rollback` drops both. Other sessions never see
//! uncommitted writes. At most one transaction runs at a time across all
//! sessions, later `begin` calls wait for the active one to finish.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use kc_model::{Application, AuthenticationExecution, AuthenticationFlow, Role, RoleOwner};
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use crate::application::ApplicationProvider;
use crate::error::{StorageError, StorageResult};
use crate::flow::AuthenticationFlowProvider;
use crate::mapping::RoleMappingProvider;
use crate::role::{DefaultRoleProvider, RoleProvider};
use crate::transaction::Transactional;

/// Operation names accepted by [`MemoryStore::fail_on`].
pub mod ops {
    /// `RoleProvider::create_role`.
    pub const ROLE_CREATE: &str = "role.create";
    /// `RoleProvider::update_role`.
    pub const ROLE_UPDATE: &str = "role.update";
    /// `RoleProvider::delete_role`.
    pub const ROLE_DELETE: &str = "role.delete";
    /// `DefaultRoleProvider::add_default_role`.
    pub const DEFAULT_ROLE_ADD: &str = "default_role.add";
    /// `DefaultRoleProvider::remove_default_role`.
    pub const DEFAULT_ROLE_REMOVE: &str = "default_role.remove";
    /// `DefaultRoleProvider::remove_from_all_defaults`.
    pub const DEFAULT_ROLE_PURGE: &str = "default_role.purge";
    /// `RoleMappingProvider::add_role_mapping` and `add_scope_mapping`.
    pub const MAPPING_ADD: &str = "mapping.add";
    /// `RoleMappingProvider::delete_role_mappings_for_role`.
    pub const ROLE_MAPPING_DELETE: &str = "role_mapping.delete";
    /// `RoleMappingProvider::delete_scope_mappings_for_role` and `_for_client`.
    pub const SCOPE_MAPPING_DELETE: &str = "scope_mapping.delete";
    /// `ApplicationProvider::create_application`.
    pub const APPLICATION_CREATE: &str = "application.create";
    /// `ApplicationProvider::update_application`.
    pub const APPLICATION_UPDATE: &str = "application.update";
    /// `ApplicationProvider::delete_application`.
    pub const APPLICATION_DELETE: &str = "application.delete";
    /// `AuthenticationFlowProvider::create_flow`.
    pub const FLOW_CREATE: &str = "flow.create";
    /// `AuthenticationFlowProvider::delete_flow`.
    pub const FLOW_DELETE: &str = "flow.delete";
    /// `AuthenticationFlowProvider::create_execution`.
    pub const EXECUTION_CREATE: &str = "execution.create";
    /// `AuthenticationFlowProvider::update_execution`.
    pub const EXECUTION_UPDATE: &str = "execution.update";
    /// `AuthenticationFlowProvider::delete_execution`.
    pub const EXECUTION_DELETE: &str = "execution.delete";
}

/// One write, applied directly or buffered in a transaction log.
#[derive(Debug, Clone)]
enum Change {
    CreateRole(Role),
    UpdateRole(Role),
    DeleteRole(Uuid),
    AddDefaultRole(RoleOwner, Uuid),
    RemoveDefaultRole(RoleOwner, Uuid),
    RemoveFromAllDefaults(Uuid),
    ClearDefaultRoles(RoleOwner),
    AddRoleMapping(Uuid, Uuid),
    AddScopeMapping(Uuid, Uuid),
    DeleteRoleMappingsForRole(Uuid),
    DeleteScopeMappingsForRole(Uuid),
    DeleteScopeMappingsForClient(Uuid),
    CreateApplication(Box<Application>),
    UpdateApplication(Box<Application>),
    DeleteApplication(Uuid),
    CreateFlow(AuthenticationFlow),
    DeleteFlow(Uuid),
    CreateExecution(AuthenticationExecution),
    UpdateExecution(AuthenticationExecution),
    DeleteExecution(Uuid),
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    roles: HashMap<Uuid, Role>,
    // Insertion order is the listing order.
    default_roles: Vec<(RoleOwner, Uuid)>,
    // (user_id, role_id)
    role_mappings: BTreeSet<(Uuid, Uuid)>,
    // (client_id, role_id)
    scope_mappings: BTreeSet<(Uuid, Uuid)>,
    applications: HashMap<Uuid, Application>,
    flows: HashMap<Uuid, AuthenticationFlow>,
    executions: HashMap<Uuid, AuthenticationExecution>,
}

impl MemoryState {
    /// Applies one write and returns the number of affected rows.
    ///
    /// Every check runs before the first mutation, so a failed write leaves
    /// the state untouched.
    fn apply(&mut self, change: &Change) -> StorageResult<u64> {
        match change {
            Change::CreateRole(role) => self.create_role(role),
            Change::UpdateRole(role) => self.update_role(role),
            Change::DeleteRole(id) => self.delete_role(*id),
            Change::AddDefaultRole(owner, role_id) => self.add_default_role(*owner, *role_id),
            Change::RemoveDefaultRole(owner, role_id) => {
                let link = (*owner, *role_id);
                Ok(retain_count(&mut self.default_roles, |l| *l != link))
            }
            Change::RemoveFromAllDefaults(role_id) => Ok(retain_count(
                &mut self.default_roles,
                |(_, id)| id != role_id,
            )),
            Change::ClearDefaultRoles(owner) => {
                Ok(retain_count(&mut self.default_roles, |(o, _)| o != owner))
            }
            Change::AddRoleMapping(user_id, role_id) => {
                self.require_role(*role_id)?;
                Ok(u64::from(self.role_mappings.insert((*user_id, *role_id))))
            }
            Change::AddScopeMapping(client_id, role_id) => {
                self.require_role(*role_id)?;
                Ok(u64::from(self.scope_mappings.insert((*client_id, *role_id))))
            }
            Change::DeleteRoleMappingsForRole(role_id) => {
                Ok(retain_set_count(&mut self.role_mappings, |(_, id)| id != role_id))
            }
            Change::DeleteScopeMappingsForRole(role_id) => {
                Ok(retain_set_count(&mut self.scope_mappings, |(_, id)| id != role_id))
            }
            Change::DeleteScopeMappingsForClient(client_id) => Ok(retain_set_count(
                &mut self.scope_mappings,
                |(client, _)| client != client_id,
            )),
            Change::CreateApplication(application) => self.create_application(application),
            Change::UpdateApplication(application) => self.update_application(application),
            Change::DeleteApplication(id) => self.delete_application(*id),
            Change::CreateFlow(flow) => self.create_flow(flow),
            Change::DeleteFlow(id) => self.delete_flow(*id),
            Change::CreateExecution(execution) => self.create_execution(execution),
            Change::UpdateExecution(execution) => {
                if !self.executions.contains_key(&execution.id) {
                    return Err(StorageError::not_found(
                        "AuthenticationExecution",
                        execution.id,
                    ));
                }
                self.executions.insert(execution.id, execution.clone());
                Ok(1)
            }
            Change::DeleteExecution(id) => match self.executions.remove(id) {
                Some(_) => Ok(1),
                None => Err(StorageError::not_found("AuthenticationExecution", *id)),
            },
        }
    }

    // === Roles ===

    fn create_role(&mut self, role: &Role) -> StorageResult<u64> {
        self.require_owner(role.owner)?;
        if self
            .roles
            .values()
            .any(|r| r.owner == role.owner && r.name == role.name)
        {
            return Err(StorageError::duplicate("Role", "name", role.name.clone()));
        }

        self.roles.insert(role.id, role.clone());
        Ok(1)
    }

    fn update_role(&mut self, role: &Role) -> StorageResult<u64> {
        if !self.roles.contains_key(&role.id) {
            return Err(StorageError::not_found("Role", role.id));
        }
        if self
            .roles
            .values()
            .any(|r| r.id != role.id && r.owner == role.owner && r.name == role.name)
        {
            return Err(StorageError::duplicate("Role", "name", role.name.clone()));
        }

        self.roles.insert(role.id, role.clone());
        Ok(1)
    }

    fn delete_role(&mut self, id: Uuid) -> StorageResult<u64> {
        if !self.roles.contains_key(&id) {
            return Err(StorageError::not_found("Role", id));
        }
        let references = self.role_references(id);
        if references > 0 {
            return Err(StorageError::constraint(format!(
                "role {id} is still referenced by {references} row(s)"
            )));
        }

        self.roles.remove(&id);
        Ok(1)
    }

    fn add_default_role(&mut self, owner: RoleOwner, role_id: Uuid) -> StorageResult<u64> {
        self.require_role(role_id)?;
        self.require_owner(owner)?;
        if self.default_roles.contains(&(owner, role_id)) {
            return Ok(0);
        }

        self.default_roles.push((owner, role_id));
        Ok(1)
    }

    // === Applications ===

    fn create_application(&mut self, application: &Application) -> StorageResult<u64> {
        if self
            .applications
            .values()
            .any(|a| a.realm_id == application.realm_id && a.name == application.name)
        {
            return Err(StorageError::duplicate(
                "Application",
                "name",
                application.name.clone(),
            ));
        }

        self.applications
            .insert(application.id, application.clone());
        Ok(1)
    }

    fn update_application(&mut self, application: &Application) -> StorageResult<u64> {
        if !self.applications.contains_key(&application.id) {
            return Err(StorageError::not_found("Application", application.id));
        }
        if self.applications.values().any(|a| {
            a.id != application.id
                && a.realm_id == application.realm_id
                && a.name == application.name
        }) {
            return Err(StorageError::duplicate(
                "Application",
                "name",
                application.name.clone(),
            ));
        }

        self.applications
            .insert(application.id, application.clone());
        Ok(1)
    }

    fn delete_application(&mut self, id: Uuid) -> StorageResult<u64> {
        if !self.applications.contains_key(&id) {
            return Err(StorageError::not_found("Application", id));
        }

        let owner = RoleOwner::Application(id);
        let dangling = self.roles.values().filter(|r| r.owner == owner).count()
            + self.default_roles.iter().filter(|(o, _)| *o == owner).count()
            + self
                .scope_mappings
                .iter()
                .filter(|(client, _)| *client == id)
                .count();
        if dangling > 0 {
            return Err(StorageError::constraint(format!(
                "application {id} is still referenced by {dangling} row(s)"
            )));
        }

        self.applications.remove(&id);
        Ok(1)
    }

    // === Flows ===

    fn create_flow(&mut self, flow: &AuthenticationFlow) -> StorageResult<u64> {
        if self
            .flows
            .values()
            .any(|f| f.realm_id == flow.realm_id && f.alias == flow.alias)
        {
            return Err(StorageError::duplicate(
                "AuthenticationFlow",
                "alias",
                flow.alias.clone(),
            ));
        }

        self.flows.insert(flow.id, flow.clone());
        Ok(1)
    }

    fn delete_flow(&mut self, id: Uuid) -> StorageResult<u64> {
        if !self.flows.contains_key(&id) {
            return Err(StorageError::not_found("AuthenticationFlow", id));
        }
        let dangling = self
            .executions
            .values()
            .filter(|e| e.parent_flow == Some(id) || e.sub_flow_id() == Some(id))
            .count();
        if dangling > 0 {
            return Err(StorageError::constraint(format!(
                "flow {id} is still referenced by {dangling} execution(s)"
            )));
        }

        self.flows.remove(&id);
        Ok(1)
    }

    fn create_execution(&mut self, execution: &AuthenticationExecution) -> StorageResult<u64> {
        if let Some(parent) = execution.parent_flow {
            self.require_flow(parent)?;
        }
        if let Some(flow_id) = execution.sub_flow_id() {
            self.require_flow(flow_id)?;
        }

        self.executions.insert(execution.id, execution.clone());
        Ok(1)
    }

    // === Integrity helpers ===

    fn role_references(&self, role_id: Uuid) -> usize {
        self.default_roles.iter().filter(|(_, id)| *id == role_id).count()
            + self.role_mappings.iter().filter(|(_, id)| *id == role_id).count()
            + self.scope_mappings.iter().filter(|(_, id)| *id == role_id).count()
    }

    fn require_role(&self, role_id: Uuid) -> StorageResult<()> {
        if self.roles.contains_key(&role_id) {
            Ok(())
        } else {
            Err(StorageError::constraint(format!(
                "role {role_id} does not exist"
            )))
        }
    }

    fn require_owner(&self, owner: RoleOwner) -> StorageResult<()> {
        match owner {
            RoleOwner::Application(id) if !self.applications.contains_key(&id) => Err(
                StorageError::constraint(format!("application {id} does not exist")),
            ),
            _ => Ok(()),
        }
    }

    fn require_flow(&self, flow_id: Uuid) -> StorageResult<()> {
        if self.flows.contains_key(&flow_id) {
            Ok(())
        } else {
            Err(StorageError::constraint(format!(
                "flow {flow_id} does not exist"
            )))
        }
    }

    fn roles_by_name<'a>(&'a self, ids: impl Iterator<Item = &'a Uuid>) -> Vec<Role> {
        let mut roles: Vec<Role> = ids.filter_map(|id| self.roles.get(id)).cloned().collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        roles
    }
}

fn retain_count<T>(items: &mut Vec<T>, keep: impl FnMut(&T) -> bool) -> u64 {
    let before = items.len();
    items.retain(keep);
    (before - items.len()) as u64
}

fn retain_set_count<T: Ord>(items: &mut BTreeSet<T>, keep: impl FnMut(&T) -> bool) -> u64 {
    let before = items.len();
    items.retain(keep);
    (before - items.len()) as u64
}

struct ActiveTransaction {
    working: MemoryState,
    log: Vec<Change>,
    _gate: OwnedMutexGuard<()>,
}

/// In-memory implementation of every storage provider.
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
    gate: Arc<AsyncMutex<()>>,
    faults: Arc<Mutex<HashSet<&'static str>>>,
    tx: Mutex<Option<ActiveTransaction>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MemoryState::default())),
            gate: Arc::new(AsyncMutex::new(())),
            faults: Arc::new(Mutex::new(HashSet::new())),
            tx: Mutex::new(None),
        }
    }

    /// Opens another session over the same data.
    #[must_use]
    pub fn session(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            gate: Arc::clone(&self.gate),
            faults: Arc::clone(&self.faults),
            tx: Mutex::new(None),
        }
    }

    /// Makes every later call of `operation` fail with `StorageError::Internal`.
    ///
    /// Operation names are listed in [`ops`]. Faults are shared by all
    /// sessions of the store.
    pub fn fail_on(&self, operation: &'static str) {
        self.faults.lock().insert(operation);
    }

    /// Removes every injected fault.
    pub fn clear_faults(&self) {
        self.faults.lock().clear();
    }

    /// Whether this session has an open transaction.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.tx.lock().is_some()
    }

    fn check(&self, operation: &'static str) -> StorageResult<()> {
        if self.faults.lock().contains(operation) {
            Err(StorageError::Internal(format!(
                "injected failure in {operation}"
            )))
        } else {
            Ok(())
        }
    }

    /// Runs `f` over this session's view: the transaction copy when one is
    /// open, the committed data otherwise.
    async fn read<R>(&self, f: impl FnOnce(&MemoryState) -> R) -> R {
        {
            let tx = self.tx.lock();
            if let Some(active) = tx.as_ref() {
                return f(&active.working);
            }
        }
        f(&*self.state.read().await)
    }

    /// Applies a write to the transaction copy and logs it, or commits it
    /// directly outside a transaction.
    async fn write(&self, operation: &'static str, change: Change) -> StorageResult<u64> {
        self.check(operation)?;
        {
            let mut tx = self.tx.lock();
            if let Some(active) = tx.as_mut() {
                let affected = active.working.apply(&change)?;
                active.log.push(change);
                return Ok(affected);
            }
        }
        self.state.write().await.apply(&change)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transactional for MemoryStore {
    async fn begin(&self) -> StorageResult<()> {
        if self.in_transaction() {
            return Err(StorageError::Transaction(
                "transaction already active".to_string(),
            ));
        }

        let gate = Arc::clone(&self.gate).lock_owned().await;
        let working = self.state.read().await.clone();
        *self.tx.lock() = Some(ActiveTransaction {
            working,
            log: Vec::new(),
            _gate: gate,
        });
        tracing::trace!("memory transaction started");
        Ok(())
    }

    async fn commit(&self) -> StorageResult<()> {
        let active = self.tx.lock().take();
        let Some(active) = active else {
            return Err(StorageError::Transaction(
                "no active transaction".to_string(),
            ));
        };

        // Replay against the current committed data so writes made by other
        // sessions since `begin` survive. A conflict discards the whole log.
        let mut state = self.state.write().await;
        let mut next = state.clone();
        for change in &active.log {
            next.apply(change).map_err(|e| {
                StorageError::Transaction(format!("commit conflict, nothing applied: {e}"))
            })?;
        }
        *state = next;

        tracing::trace!(writes = active.log.len(), "memory transaction committed");
        Ok(())
    }

    async fn rollback(&self) -> StorageResult<()> {
        let active = self.tx.lock().take();
        match active {
            Some(active) => {
                tracing::trace!(
                    discarded = active.log.len(),
                    "memory transaction rolled back"
                );
                Ok(())
            }
            None => Err(StorageError::Transaction(
                "no active transaction".to_string(),
            )),
        }
    }
}

#[async_trait]
impl RoleProvider for MemoryStore {
    async fn create_role(&self, role: &Role) -> StorageResult<()> {
        self.write(ops::ROLE_CREATE, Change::CreateRole(role.clone()))
            .await?;
        Ok(())
    }

    async fn update_role(&self, role: &Role) -> StorageResult<()> {
        self.write(ops::ROLE_UPDATE, Change::UpdateRole(role.clone()))
            .await?;
        Ok(())
    }

    async fn delete_role(&self, id: Uuid) -> StorageResult<()> {
        self.write(ops::ROLE_DELETE, Change::DeleteRole(id)).await?;
        Ok(())
    }

    async fn get_role(&self, id: Uuid) -> StorageResult<Option<Role>> {
        Ok(self.read(|s| s.roles.get(&id).cloned()).await)
    }

    async fn get_role_by_name(
        &self,
        owner: RoleOwner,
        name: &str,
    ) -> StorageResult<Option<Role>> {
        Ok(self
            .read(|s| {
                s.roles
                    .values()
                    .find(|r| r.owner == owner && r.name == name)
                    .cloned()
            })
            .await)
    }

    async fn list_roles(&self, owner: RoleOwner) -> StorageResult<Vec<Role>> {
        Ok(self
            .read(|s| {
                s.roles_by_name(s.roles.values().filter(|r| r.owner == owner).map(|r| &r.id))
            })
            .await)
    }
}

#[async_trait]
impl DefaultRoleProvider for MemoryStore {
    async fn list_default_roles(&self, owner: RoleOwner) -> StorageResult<Vec<Role>> {
        Ok(self
            .read(|s| {
                s.default_roles
                    .iter()
                    .filter(|(o, _)| *o == owner)
                    .filter_map(|(_, id)| s.roles.get(id).cloned())
                    .collect()
            })
            .await)
    }

    async fn add_default_role(&self, owner: RoleOwner, role_id: Uuid) -> StorageResult<bool> {
        let added = self
            .write(ops::DEFAULT_ROLE_ADD, Change::AddDefaultRole(owner, role_id))
            .await?;
        Ok(added > 0)
    }

    async fn remove_default_role(&self, owner: RoleOwner, role_id: Uuid) -> StorageResult<bool> {
        let removed = self
            .write(
                ops::DEFAULT_ROLE_REMOVE,
                Change::RemoveDefaultRole(owner, role_id),
            )
            .await?;
        Ok(removed > 0)
    }

    async fn remove_from_all_defaults(&self, role_id: Uuid) -> StorageResult<u64> {
        self.write(ops::DEFAULT_ROLE_PURGE, Change::RemoveFromAllDefaults(role_id))
            .await
    }

    async fn clear_default_roles(&self, owner: RoleOwner) -> StorageResult<u64> {
        self.write(ops::DEFAULT_ROLE_PURGE, Change::ClearDefaultRoles(owner))
            .await
    }
}

#[async_trait]
impl RoleMappingProvider for MemoryStore {
    async fn get_role_mappings(&self, user_id: Uuid) -> StorageResult<Vec<Role>> {
        Ok(self
            .read(|s| {
                s.roles_by_name(
                    s.role_mappings
                        .iter()
                        .filter(|(user, _)| *user == user_id)
                        .map(|(_, role)| role),
                )
            })
            .await)
    }

    async fn get_scope_mappings(&self, client_id: Uuid) -> StorageResult<Vec<Role>> {
        Ok(self
            .read(|s| {
                s.roles_by_name(
                    s.scope_mappings
                        .iter()
                        .filter(|(client, _)| *client == client_id)
                        .map(|(_, role)| role),
                )
            })
            .await)
    }

    async fn add_role_mapping(&self, user_id: Uuid, role_id: Uuid) -> StorageResult<()> {
        self.write(ops::MAPPING_ADD, Change::AddRoleMapping(user_id, role_id))
            .await?;
        Ok(())
    }

    async fn add_scope_mapping(&self, client_id: Uuid, role_id: Uuid) -> StorageResult<()> {
        self.write(ops::MAPPING_ADD, Change::AddScopeMapping(client_id, role_id))
            .await?;
        Ok(())
    }

    async fn delete_role_mappings_for_role(&self, role_id: Uuid) -> StorageResult<u64> {
        self.write(
            ops::ROLE_MAPPING_DELETE,
            Change::DeleteRoleMappingsForRole(role_id),
        )
        .await
    }

    async fn delete_scope_mappings_for_role(&self, role_id: Uuid) -> StorageResult<u64> {
        self.write(
            ops::SCOPE_MAPPING_DELETE,
            Change::DeleteScopeMappingsForRole(role_id),
        )
        .await
    }

    async fn delete_scope_mappings_for_client(&self, client_id: Uuid) -> StorageResult<u64> {
        self.write(
            ops::SCOPE_MAPPING_DELETE,
            Change::DeleteScopeMappingsForClient(client_id),
        )
        .await
    }
}

#[async_trait]
impl ApplicationProvider for MemoryStore {
    async fn create_application(&self, application: &Application) -> StorageResult<()> {
        self.write(
            ops::APPLICATION_CREATE,
            Change::CreateApplication(Box::new(application.clone())),
        )
        .await?;
        Ok(())
    }

    async fn update_application(&self, application: &Application) -> StorageResult<()> {
        self.write(
            ops::APPLICATION_UPDATE,
            Change::UpdateApplication(Box::new(application.clone())),
        )
        .await?;
        Ok(())
    }

    async fn delete_application(&self, id: Uuid) -> StorageResult<()> {
        self.write(ops::APPLICATION_DELETE, Change::DeleteApplication(id))
            .await?;
        Ok(())
    }

    async fn get_application(&self, id: Uuid) -> StorageResult<Option<Application>> {
        Ok(self.read(|s| s.applications.get(&id).cloned()).await)
    }

    async fn get_application_by_name(
        &self,
        realm_id: Uuid,
        name: &str,
    ) -> StorageResult<Option<Application>> {
        Ok(self
            .read(|s| {
                s.applications
                    .values()
                    .find(|a| a.realm_id == realm_id && a.name == name)
                    .cloned()
            })
            .await)
    }

    async fn list_applications(&self, realm_id: Uuid) -> StorageResult<Vec<Application>> {
        let mut applications: Vec<Application> = self
            .read(|s| {
                s.applications
                    .values()
                    .filter(|a| a.realm_id == realm_id)
                    .cloned()
                    .collect()
            })
            .await;
        applications.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(applications)
    }
}

fn sort_executions(executions: &mut [AuthenticationExecution]) {
    executions.sort_by_key(AuthenticationExecution::ordering_key);
}

#[async_trait]
impl AuthenticationFlowProvider for MemoryStore {
    async fn create_flow(&self, flow: &AuthenticationFlow) -> StorageResult<()> {
        self.write(ops::FLOW_CREATE, Change::CreateFlow(flow.clone()))
            .await?;
        Ok(())
    }

    async fn get_flow(&self, id: Uuid) -> StorageResult<Option<AuthenticationFlow>> {
        Ok(self.read(|s| s.flows.get(&id).cloned()).await)
    }

    async fn get_flow_by_alias(
        &self,
        realm_id: Uuid,
        alias: &str,
    ) -> StorageResult<Option<AuthenticationFlow>> {
        Ok(self
            .read(|s| {
                s.flows
                    .values()
                    .find(|f| f.realm_id == realm_id && f.alias == alias)
                    .cloned()
            })
            .await)
    }

    async fn list_flows(&self, realm_id: Uuid) -> StorageResult<Vec<AuthenticationFlow>> {
        let mut flows: Vec<AuthenticationFlow> = self
            .read(|s| {
                s.flows
                    .values()
                    .filter(|f| f.realm_id == realm_id)
                    .cloned()
                    .collect()
            })
            .await;
        flows.sort_by(|a, b| a.alias.cmp(&b.alias));
        Ok(flows)
    }

    async fn delete_flow(&self, id: Uuid) -> StorageResult<()> {
        self.write(ops::FLOW_DELETE, Change::DeleteFlow(id)).await?;
        Ok(())
    }

    async fn create_execution(&self, execution: &AuthenticationExecution) -> StorageResult<()> {
        self.write(
            ops::EXECUTION_CREATE,
            Change::CreateExecution(execution.clone()),
        )
        .await?;
        Ok(())
    }

    async fn update_execution(&self, execution: &AuthenticationExecution) -> StorageResult<()> {
        self.write(
            ops::EXECUTION_UPDATE,
            Change::UpdateExecution(execution.clone()),
        )
        .await?;
        Ok(())
    }

    async fn get_execution(&self, id: Uuid) -> StorageResult<Option<AuthenticationExecution>> {
        Ok(self.read(|s| s.executions.get(&id).cloned()).await)
    }

    async fn list_executions(
        &self,
        parent_flow: Option<Uuid>,
    ) -> StorageResult<Vec<AuthenticationExecution>> {
        let mut executions: Vec<AuthenticationExecution> = self
            .read(|s| {
                s.executions
                    .values()
                    .filter(|e| e.parent_flow == parent_flow)
                    .cloned()
                    .collect()
            })
            .await;
        sort_executions(&mut executions);
        Ok(executions)
    }

    async fn list_realm_executions(
        &self,
        realm_id: Uuid,
    ) -> StorageResult<Vec<AuthenticationExecution>> {
        let mut executions: Vec<AuthenticationExecution> = self
            .read(|s| {
                s.executions
                    .values()
                    .filter(|e| e.realm_id == realm_id)
                    .cloned()
                    .collect()
            })
            .await;
        sort_executions(&mut executions);
        Ok(executions)
    }

    async fn delete_execution(&self, id: Uuid) -> StorageResult<()> {
        self.write(ops::EXECUTION_DELETE, Change::DeleteExecution(id))
            .await?;
        Ok(())
    }
}
