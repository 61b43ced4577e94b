//! `PostgreSQL` implementation of the role and scope mapping provider.

use async_trait::async_trait;
use kc_model::Role;
use kc_storage::RoleMappingProvider;
use kc_storage::error::StorageResult;
use uuid::Uuid;

use crate::convert::collect_rows;
use crate::entities::RoleRow;
use crate::error::from_sqlx_error;
use crate::store::{PgStore, with_executor};

#[async_trait]
impl RoleMappingProvider for PgStore {
    async fn get_role_mappings(&self, user_id: Uuid) -> StorageResult<Vec<Role>> {
        let rows: Vec<RoleRow> = with_executor!(self, |ex| {
            sqlx::query_as(
                r"SELECT r.id, r.name, r.description, r.realm_id, r.owner_kind,
                    r.owner_id, r.created_at, r.updated_at
                FROM user_role_mappings m
                JOIN roles r ON r.id = m.role_id
                WHERE m.user_id = $1
                ORDER BY r.name, r.id",
            )
            .bind(user_id)
            .fetch_all(ex)
            .await
        })
        .map_err(from_sqlx_error)?;

        collect_rows(rows)
    }

    async fn get_scope_mappings(&self, client_id: Uuid) -> StorageResult<Vec<Role>> {
        let rows: Vec<RoleRow> = with_executor!(self, |ex| {
            sqlx::query_as(
                r"SELECT r.id, r.name, r.description, r.realm_id, r.owner_kind,
                    r.owner_id, r.created_at, r.updated_at
                FROM scope_mappings m
                JOIN roles r ON r.id = m.role_id
                WHERE m.client_id = $1
                ORDER BY r.name, r.id",
            )
            .bind(client_id)
            .fetch_all(ex)
            .await
        })
        .map_err(from_sqlx_error)?;

        collect_rows(rows)
    }

    async fn add_role_mapping(&self, user_id: Uuid, role_id: Uuid) -> StorageResult<()> {
        with_executor!(self, |ex| {
            sqlx::query(
                r"INSERT INTO user_role_mappings (user_id, role_id) VALUES ($1, $2)
                ON CONFLICT DO NOTHING",
            )
            .bind(user_id)
            .bind(role_id)
            .execute(ex)
            .await
        })
        .map_err(from_sqlx_error)?;

        Ok(())
    }

    async fn add_scope_mapping(&self, client_id: Uuid, role_id: Uuid) -> StorageResult<()> {
        with_executor!(self, |ex| {
            sqlx::query(
                r"INSERT INTO scope_mappings (client_id, role_id) VALUES ($1, $2)
                ON CONFLICT DO NOTHING",
            )
            .bind(client_id)
            .bind(role_id)
            .execute(ex)
            .await
        })
        .map_err(from_sqlx_error)?;

        Ok(())
    }

    async fn delete_role_mappings_for_role(&self, role_id: Uuid) -> StorageResult<u64> {
        let result = with_executor!(self, |ex| {
            sqlx::query("DELETE FROM user_role_mappings WHERE role_id = $1")
                .bind(role_id)
                .execute(ex)
                .await
        })
        .map_err(from_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn delete_scope_mappings_for_role(&self, role_id: Uuid) -> StorageResult<u64> {
        let result = with_executor!(self, |ex| {
            sqlx::query("DELETE FROM scope_mappings WHERE role_id = $1")
                .bind(role_id)
                .execute(ex)
                .await
        })
        .map_err(from_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn delete_scope_mappings_for_client(&self, client_id: Uuid) -> StorageResult<u64> {
        let result = with_executor!(self, |ex| {
            sqlx::query("DELETE FROM scope_mappings WHERE client_id = $1")
                .bind(client_id)
                .execute(ex)
                .await
        })
        .map_err(from_sqlx_error)?;

        Ok(result.rows_affected())
    }
}
