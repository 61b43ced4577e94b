//! Flow management operations.
//!
//! [`FlowManager`] edits flows and their executions through the storage
//! port. Changes touching more than one row run in a single transaction.

use std::collections::HashSet;
use std::sync::Arc;

use kc_model::{AuthenticationExecution, AuthenticationFlow, Requirement};
use kc_storage::{ModelStore, StorageError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{FlowError, FlowResult};
use crate::flow::FlowTree;

/// Creates, edits, and removes authentication flows.
pub struct FlowManager {
    store: Arc<dyn ModelStore>,
}

impl FlowManager {
    /// Creates a manager over a storage session.
    #[must_use]
    pub fn new(store: Arc<dyn ModelStore>) -> Self {
        Self { store }
    }

    /// Creates a top-level flow.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::InvalidExecution` for a blank alias and
    /// `FlowError::DuplicateAlias` if the realm already has the alias.
    pub async fn create_flow(
        &self,
        realm_id: Uuid,
        alias: &str,
        description: Option<&str>,
    ) -> FlowResult<AuthenticationFlow> {
        let mut flow = AuthenticationFlow::new_top_level(realm_id, alias);
        if let Some(description) = description {
            flow = flow.with_description(description);
        }
        flow.validate()?;
        self.ensure_alias_free(realm_id, alias).await?;

        self.store
            .create_flow(&flow)
            .await
            .map_err(|e| alias_error(e, alias))?;

        info!(flow_id = %flow.id, realm_id = %realm_id, alias, "authentication flow created");
        Ok(flow)
    }

    /// Lists the flows of a realm, ordered by alias.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails.
    pub async fn list_flows(&self, realm_id: Uuid) -> FlowResult<Vec<AuthenticationFlow>> {
        Ok(self.store.list_flows(realm_id).await?)
    }

    /// Appends an authenticator step to a flow.
    ///
    /// The step is placed after the current last step and starts disabled
    /// unless another requirement is given.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::FlowNotFound` for an unknown flow and
    /// `FlowError::InvalidExecution` for a blank provider id.
    pub async fn add_execution(
        &self,
        flow_id: Uuid,
        provider_id: &str,
        requirement: Requirement,
    ) -> FlowResult<AuthenticationExecution> {
        let flow = self.require_flow(flow_id).await?;
        let execution = AuthenticationExecution::authenticator(flow.realm_id, Some(flow_id), provider_id)
            .with_requirement(requirement)
            .with_priority(self.next_priority(flow_id).await?);
        execution.validate()?;

        self.store.create_execution(&execution).await?;

        info!(
            execution_id = %execution.id,
            flow_id = %flow_id,
            provider_id,
            priority = execution.priority,
            "execution added"
        );
        Ok(execution)
    }

    /// Creates a sub-flow and appends the step that runs it.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::FlowNotFound` for an unknown parent and
    /// `FlowError::DuplicateAlias` if the alias is taken. Nothing is stored
    /// on failure.
    pub async fn add_sub_flow(
        &self,
        parent_flow_id: Uuid,
        alias: &str,
        requirement: Requirement,
    ) -> FlowResult<(AuthenticationFlow, AuthenticationExecution)> {
        let parent = self.require_flow(parent_flow_id).await?;
        let flow = AuthenticationFlow::new_sub_flow(parent.realm_id, alias);
        flow.validate()?;
        self.ensure_alias_free(parent.realm_id, alias).await?;

        let execution = AuthenticationExecution::sub_flow(parent.realm_id, Some(parent_flow_id), flow.id)
            .with_requirement(requirement)
            .with_priority(self.next_priority(parent_flow_id).await?);
        execution.validate()?;

        self.store.begin().await?;
        let result = self.insert_sub_flow(&flow, &execution, alias).await;
        self.finish("add sub-flow", result).await?;

        info!(
            flow_id = %flow.id,
            parent_flow_id = %parent_flow_id,
            execution_id = %execution.id,
            alias,
            "sub-flow added"
        );
        Ok((flow, execution))
    }

    async fn insert_sub_flow(
        &self,
        flow: &AuthenticationFlow,
        execution: &AuthenticationExecution,
        alias: &str,
    ) -> FlowResult<()> {
        self.store
            .create_flow(flow)
            .await
            .map_err(|e| alias_error(e, alias))?;
        self.store.create_execution(execution).await?;
        Ok(())
    }

    /// Changes the requirement of a step.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::ExecutionNotFound` for an unknown step.
    pub async fn update_requirement(
        &self,
        execution_id: Uuid,
        requirement: Requirement,
    ) -> FlowResult<AuthenticationExecution> {
        let mut execution = self.require_execution(execution_id).await?;
        if execution.requirement == requirement {
            return Ok(execution);
        }

        let previous = execution.requirement;
        execution.requirement = requirement;
        self.store.update_execution(&execution).await?;

        info!(
            execution_id = %execution_id,
            from = %previous,
            to = %requirement,
            "execution requirement changed"
        );
        Ok(execution)
    }

    /// Allows or forbids configuring the step's authenticator during login.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::ExecutionNotFound` for an unknown step.
    pub async fn set_user_setup_allowed(
        &self,
        execution_id: Uuid,
        allowed: bool,
    ) -> FlowResult<AuthenticationExecution> {
        let mut execution = self.require_execution(execution_id).await?;
        if execution.user_setup_allowed != allowed {
            execution.user_setup_allowed = allowed;
            self.store.update_execution(&execution).await?;
            debug!(execution_id = %execution_id, allowed, "user setup flag changed");
        }
        Ok(execution)
    }

    /// Moves a step one place earlier among its siblings.
    ///
    /// Returns `false` if it already runs first.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::ExecutionNotFound` for an unknown step.
    pub async fn raise_priority(&self, execution_id: Uuid) -> FlowResult<bool> {
        self.shift(execution_id, Direction::Earlier).await
    }

    /// Moves a step one place later among its siblings.
    ///
    /// Returns `false` if it already runs last.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::ExecutionNotFound` for an unknown step.
    pub async fn lower_priority(&self, execution_id: Uuid) -> FlowResult<bool> {
        self.shift(execution_id, Direction::Later).await
    }

    async fn shift(&self, execution_id: Uuid, direction: Direction) -> FlowResult<bool> {
        let execution = self.require_execution(execution_id).await?;
        // Root steps of every realm share `parent_flow: None`.
        let mut siblings = self.store.list_executions(execution.parent_flow).await?;
        siblings.retain(|e| e.realm_id == execution.realm_id);
        let index = siblings
            .iter()
            .position(|e| e.id == execution_id)
            .ok_or(FlowError::ExecutionNotFound(execution_id))?;

        let neighbour = match direction {
            Direction::Earlier => index.checked_sub(1),
            Direction::Later => Some(index + 1).filter(|&i| i < siblings.len()),
        };
        let Some(neighbour) = neighbour else {
            return Ok(false);
        };

        // Swap positions, keep the priority slots, and bump any slot that no
        // longer sorts after its predecessor.
        let slots: Vec<i32> = siblings.iter().map(|e| e.priority).collect();
        siblings.swap(index, neighbour);

        let mut changed = Vec::new();
        let mut previous: Option<i32> = None;
        for (sibling, slot) in siblings.iter_mut().zip(slots) {
            let priority = match previous {
                Some(p) if slot <= p => p.saturating_add(1),
                _ => slot,
            };
            previous = Some(priority);
            if sibling.priority != priority {
                sibling.priority = priority;
                changed.push(sibling.clone());
            }
        }

        self.store.begin().await?;
        let result = self.update_all(&changed).await;
        self.finish("reorder executions", result).await?;

        info!(
            execution_id = %execution_id,
            direction = ?direction,
            updated = changed.len(),
            "execution moved"
        );
        Ok(true)
    }

    async fn update_all(&self, executions: &[AuthenticationExecution]) -> FlowResult<()> {
        for execution in executions {
            self.store.update_execution(execution).await?;
        }
        Ok(())
    }

    /// Removes a step.
    ///
    /// A sub-flow step also removes the flow it runs, with all of that
    /// flow's steps and nested sub-flows. A flow that another step still runs
    /// is kept. Returns `false` for an unknown id.
    ///
    /// # Errors
    ///
    /// Returns an error if storage fails; nothing is removed in that case.
    pub async fn remove_execution(&self, execution_id: Uuid) -> FlowResult<bool> {
        self.store.begin().await?;
        let result = self.remove_execution_steps(execution_id).await;
        let removed = self.finish("remove execution", result).await?;

        if removed {
            info!(execution_id = %execution_id, "execution removed");
        }
        Ok(removed)
    }

    async fn remove_execution_steps(&self, execution_id: Uuid) -> FlowResult<bool> {
        let Some(execution) = self.store.get_execution(execution_id).await? else {
            return Ok(false);
        };
        self.remove_subtree(vec![execution], Vec::new()).await?;
        Ok(true)
    }

    /// Removes a flow with all of its steps and nested sub-flows.
    ///
    /// Returns `false` for an unknown id.
    ///
    /// # Errors
    ///
    /// Returns a storage constraint error if a step outside the flow still
    /// runs it; nothing is removed in that case.
    pub async fn remove_flow(&self, flow_id: Uuid) -> FlowResult<bool> {
        self.store.begin().await?;
        let result = self.remove_flow_steps(flow_id).await;
        let removed = self.finish("remove flow", result).await?;

        if removed {
            info!(flow_id = %flow_id, "authentication flow removed");
        }
        Ok(removed)
    }

    async fn remove_flow_steps(&self, flow_id: Uuid) -> FlowResult<bool> {
        if self.store.get_flow(flow_id).await?.is_none() {
            return Ok(false);
        }
        let steps = self.store.list_executions(Some(flow_id)).await?;
        self.remove_subtree(steps, vec![flow_id]).await?;
        Ok(true)
    }

    /// Deletes `pending` steps and everything below them, then the flows.
    async fn remove_subtree(
        &self,
        mut pending: Vec<AuthenticationExecution>,
        mut flows: Vec<Uuid>,
    ) -> FlowResult<()> {
        let mut seen: HashSet<Uuid> = flows.iter().copied().collect();

        while let Some(execution) = pending.pop() {
            self.store.delete_execution(execution.id).await?;
            let Some(flow_id) = execution.sub_flow_id() else {
                continue;
            };
            if seen.contains(&flow_id) || self.is_referenced(execution.realm_id, flow_id).await? {
                continue;
            }
            seen.insert(flow_id);
            pending.extend(self.store.list_executions(Some(flow_id)).await?);
            flows.push(flow_id);
        }

        for flow_id in flows {
            self.store.delete_flow(flow_id).await?;
        }
        Ok(())
    }

    /// Whether any remaining step of the realm still runs `flow_id`.
    async fn is_referenced(&self, realm_id: Uuid, flow_id: Uuid) -> FlowResult<bool> {
        Ok(self
            .store
            .list_realm_executions(realm_id)
            .await?
            .iter()
            .any(|e| e.sub_flow_id() == Some(flow_id)))
    }

    /// Loads a flow and every flow reachable through its sub-flow steps.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::FlowNotFound` for an unknown flow.
    pub async fn load_tree(&self, flow_id: Uuid) -> FlowResult<FlowTree> {
        self.require_flow(flow_id).await?;

        let mut seen = HashSet::from([flow_id]);
        let mut queue = vec![flow_id];
        let mut executions = Vec::new();

        while let Some(current) = queue.pop() {
            let steps = self.store.list_executions(Some(current)).await?;
            for step in &steps {
                if let Some(sub) = step.sub_flow_id()
                    && seen.insert(sub)
                {
                    queue.push(sub);
                }
            }
            executions.extend(steps);
        }

        Ok(FlowTree::new(Some(flow_id), executions))
    }

    async fn require_flow(&self, flow_id: Uuid) -> FlowResult<AuthenticationFlow> {
        self.store
            .get_flow(flow_id)
            .await?
            .ok_or(FlowError::FlowNotFound(flow_id))
    }

    async fn require_execution(&self, execution_id: Uuid) -> FlowResult<AuthenticationExecution> {
        self.store
            .get_execution(execution_id)
            .await?
            .ok_or(FlowError::ExecutionNotFound(execution_id))
    }

    async fn ensure_alias_free(&self, realm_id: Uuid, alias: &str) -> FlowResult<()> {
        if self.store.get_flow_by_alias(realm_id, alias).await?.is_some() {
            return Err(FlowError::DuplicateAlias(alias.to_string()));
        }
        Ok(())
    }

    async fn next_priority(&self, flow_id: Uuid) -> FlowResult<i32> {
        let siblings = self.store.list_executions(Some(flow_id)).await?;
        Ok(siblings
            .last()
            .map_or(0, |last| last.priority.saturating_add(1)))
    }

    /// Commits on success, rolls back on failure.
    async fn finish<T>(&self, operation: &'static str, result: FlowResult<T>) -> FlowResult<T> {
        match result {
            Ok(value) => {
                self.store.commit().await?;
                Ok(value)
            }
            Err(err) => {
                warn!(operation, error = %err, "flow change rolled back");
                if let Err(rollback) = self.store.rollback().await {
                    warn!(operation, error = %rollback, "rollback failed");
                }
                Err(err)
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Earlier,
    Later,
}

fn alias_error(err: StorageError, alias: &str) -> FlowError {
    if err.is_duplicate() {
        FlowError::DuplicateAlias(alias.to_string())
    } else {
        err.into()
    }
}
