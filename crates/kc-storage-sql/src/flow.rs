//! `PostgreSQL` implementation of the authentication flow provider.

use async_trait::async_trait;
use kc_model::{AuthenticationExecution, AuthenticationFlow};
use kc_storage::error::StorageResult;
use kc_storage::{AuthenticationFlowProvider, StorageError};
use uuid::Uuid;

use crate::convert::collect_rows;
use crate::entities::{ExecutionRow, FlowRow};
use crate::error::{from_insert_error, from_sqlx_error};
use crate::store::{PgStore, with_executor};

#[async_trait]
impl AuthenticationFlowProvider for PgStore {
    async fn create_flow(&self, flow: &AuthenticationFlow) -> StorageResult<()> {
        with_executor!(self, |ex| {
            sqlx::query(
                r"INSERT INTO authentication_flows (
                    id, realm_id, alias, description, provider_id, top_level,
                    built_in, created_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(flow.id)
            .bind(flow.realm_id)
            .bind(&flow.alias)
            .bind(&flow.description)
            .bind(&flow.provider_id)
            .bind(flow.top_level)
            .bind(flow.built_in)
            .bind(flow.created_at)
            .execute(ex)
            .await
        })
        .map_err(|e| from_insert_error(e, "AuthenticationFlow", "alias", &flow.alias))?;

        Ok(())
    }

    async fn get_flow(&self, id: Uuid) -> StorageResult<Option<AuthenticationFlow>> {
        let row: Option<FlowRow> = with_executor!(self, |ex| {
            sqlx::query_as(
                r"SELECT id, realm_id, alias, description, provider_id, top_level,
                    built_in, created_at
                FROM authentication_flows WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(ex)
            .await
        })
        .map_err(from_sqlx_error)?;

        Ok(row.map(Into::into))
    }

    async fn get_flow_by_alias(
        &self,
        realm_id: Uuid,
        alias: &str,
    ) -> StorageResult<Option<AuthenticationFlow>> {
        let row: Option<FlowRow> = with_executor!(self, |ex| {
            sqlx::query_as(
                r"SELECT id, realm_id, alias, description, provider_id, top_level,
                    built_in, created_at
                FROM authentication_flows WHERE realm_id = $1 AND alias = $2",
            )
            .bind(realm_id)
            .bind(alias)
            .fetch_optional(ex)
            .await
        })
        .map_err(from_sqlx_error)?;

        Ok(row.map(Into::into))
    }

    async fn list_flows(&self, realm_id: Uuid) -> StorageResult<Vec<AuthenticationFlow>> {
        let rows: Vec<FlowRow> = with_executor!(self, |ex| {
            sqlx::query_as(
                r"SELECT id, realm_id, alias, description, provider_id, top_level,
                    built_in, created_at
                FROM authentication_flows WHERE realm_id = $1
                ORDER BY alias",
            )
            .bind(realm_id)
            .fetch_all(ex)
            .await
        })
        .map_err(from_sqlx_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete_flow(&self, id: Uuid) -> StorageResult<()> {
        let result = with_executor!(self, |ex| {
            sqlx::query("DELETE FROM authentication_flows WHERE id = $1")
                .bind(id)
                .execute(ex)
                .await
        })
        .map_err(from_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("AuthenticationFlow", id));
        }

        Ok(())
    }

    async fn create_execution(&self, execution: &AuthenticationExecution) -> StorageResult<()> {
        with_executor!(self, |ex| {
            sqlx::query(
                r"INSERT INTO authentication_executions (
                    id, realm_id, authenticator, authenticator_flow, requirement,
                    user_setup_allowed, priority, parent_flow, sub_flow
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(execution.id)
            .bind(execution.realm_id)
            .bind(&execution.authenticator)
            .bind(execution.authenticator_flow)
            .bind(execution.requirement.as_str())
            .bind(execution.user_setup_allowed)
            .bind(execution.priority)
            .bind(execution.parent_flow)
            .bind(execution.sub_flow_id())
            .execute(ex)
            .await
        })
        .map_err(from_sqlx_error)?;

        Ok(())
    }

    async fn update_execution(&self, execution: &AuthenticationExecution) -> StorageResult<()> {
        let result = with_executor!(self, |ex| {
            sqlx::query(
                r"UPDATE authentication_executions SET
                    authenticator = $2, authenticator_flow = $3, requirement = $4,
                    user_setup_allowed = $5, priority = $6, parent_flow = $7, sub_flow = $8
                WHERE id = $1",
            )
            .bind(execution.id)
            .bind(&execution.authenticator)
            .bind(execution.authenticator_flow)
            .bind(execution.requirement.as_str())
            .bind(execution.user_setup_allowed)
            .bind(execution.priority)
            .bind(execution.parent_flow)
            .bind(execution.sub_flow_id())
            .execute(ex)
            .await
        })
        .map_err(from_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("AuthenticationExecution", execution.id));
        }

        Ok(())
    }

    async fn get_execution(&self, id: Uuid) -> StorageResult<Option<AuthenticationExecution>> {
        let row: Option<ExecutionRow> = with_executor!(self, |ex| {
            sqlx::query_as(
                r"SELECT id, realm_id, authenticator, authenticator_flow, requirement,
                    user_setup_allowed, priority, parent_flow
                FROM authentication_executions WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(ex)
            .await
        })
        .map_err(from_sqlx_error)?;

        row.map(AuthenticationExecution::try_from).transpose()
    }

    async fn list_executions(
        &self,
        parent_flow: Option<Uuid>,
    ) -> StorageResult<Vec<AuthenticationExecution>> {
        let rows: Vec<ExecutionRow> = with_executor!(self, |ex| {
            sqlx::query_as(
                r"SELECT id, realm_id, authenticator, authenticator_flow, requirement,
                    user_setup_allowed, priority, parent_flow
                FROM authentication_executions
                WHERE parent_flow IS NOT DISTINCT FROM $1
                ORDER BY priority, id",
            )
            .bind(parent_flow)
            .fetch_all(ex)
            .await
        })
        .map_err(from_sqlx_error)?;

        collect_rows(rows)
    }

    async fn list_realm_executions(
        &self,
        realm_id: Uuid,
    ) -> StorageResult<Vec<AuthenticationExecution>> {
        let rows: Vec<ExecutionRow> = with_executor!(self, |ex| {
            sqlx::query_as(
                r"SELECT id, realm_id, authenticator, authenticator_flow, requirement,
                    user_setup_allowed, priority, parent_flow
                FROM authentication_executions WHERE realm_id = $1
                ORDER BY priority, id",
            )
            .bind(realm_id)
            .fetch_all(ex)
            .await
        })
        .map_err(from_sqlx_error)?;

        collect_rows(rows)
    }

    async fn delete_execution(&self, id: Uuid) -> StorageResult<()> {
        let result = with_executor!(self, |ex| {
            sqlx::query("DELETE FROM authentication_executions WHERE id = $1")
                .bind(id)
                .execute(ex)
                .await
        })
        .map_err(from_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("AuthenticationExecution", id));
        }

        Ok(())
    }
}
