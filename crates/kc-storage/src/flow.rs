//! Authentication flow storage provider trait.

use async_trait::async_trait;
use kc_model::{AuthenticationExecution, AuthenticationFlow};
use uuid::Uuid;

use crate::error::StorageResult;

/// Provider for flows and executions.
#[async_trait]
pub trait AuthenticationFlowProvider: Send + Sync {
    /// Creates a flow.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::Duplicate` if the alias is taken in the realm.
    async fn create_flow(&self, flow: &AuthenticationFlow) -> StorageResult<()>;

    /// Gets a flow by ID.
    async fn get_flow(&self, id: Uuid) -> StorageResult<Option<AuthenticationFlow>>;

    /// Gets a flow by alias within a realm.
    async fn get_flow_by_alias(
        &self,
        realm_id: Uuid,
        alias: &str,
    ) -> StorageResult<Option<AuthenticationFlow>>;

    /// Lists the flows of a realm, ordered by alias.
    async fn list_flows(&self, realm_id: Uuid) -> StorageResult<Vec<AuthenticationFlow>>;

    /// Deletes a flow.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` if the flow doesn't exist, and
    /// `StorageError::Constraint` while executions belong to or reference it.
    async fn delete_flow(&self, id: Uuid) -> StorageResult<()>;

    /// Creates an execution.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::Constraint` if the parent flow or the referenced
    /// sub-flow doesn't exist.
    async fn create_execution(&self, execution: &AuthenticationExecution) -> StorageResult<()>;

    /// Updates an execution.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` if the execution doesn't exist.
    async fn update_execution(&self, execution: &AuthenticationExecution) -> StorageResult<()>;

    /// Gets an execution by ID.
    async fn get_execution(&self, id: Uuid) -> StorageResult<Option<AuthenticationExecution>>;

    /// Lists the executions of one parent, ordered by `(priority, id)`.
    ///
    /// `None` lists root steps, which are not scoped to a realm.
    async fn list_executions(
        &self,
        parent_flow: Option<Uuid>,
    ) -> StorageResult<Vec<AuthenticationExecution>>;

    /// Lists every execution of a realm, ordered by `(priority, id)`.
    async fn list_realm_executions(
        &self,
        realm_id: Uuid,
    ) -> StorageResult<Vec<AuthenticationExecution>>;

    /// Deletes an execution.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` if the execution doesn't exist.
    async fn delete_execution(&self, id: Uuid) -> StorageResult<()>;
}
