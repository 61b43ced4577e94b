//! `PostgreSQL` implementation of the role and default-role providers.

use async_trait::async_trait;
use kc_model::{Role, RoleOwner};
use kc_storage::error::StorageResult;
use kc_storage::{DefaultRoleProvider, RoleProvider, StorageError};
use uuid::Uuid;

use crate::convert::{collect_rows, owner_kind};
use crate::entities::RoleRow;
use crate::error::{from_insert_error, from_sqlx_error};
use crate::store::{PgStore, with_executor};

#[async_trait]
impl RoleProvider for PgStore {
    async fn create_role(&self, role: &Role) -> StorageResult<()> {
        with_executor!(self, |ex| {
            sqlx::query(
                r"INSERT INTO roles (
                    id, name, description, realm_id, owner_kind, owner_id,
                    application_id, created_at, updated_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(role.id)
            .bind(&role.name)
            .bind(&role.description)
            .bind(role.realm_id)
            .bind(owner_kind(role.owner))
            .bind(role.owner.id())
            .bind(role.owner.application_id())
            .bind(role.created_at)
            .bind(role.updated_at)
            .execute(ex)
            .await
        })
        .map_err(|e| from_insert_error(e, "Role", "name", &role.name))?;

        Ok(())
    }

    async fn update_role(&self, role: &Role) -> StorageResult<()> {
        let result = with_executor!(self, |ex| {
            sqlx::query(
                r"UPDATE roles SET name = $2, description = $3, updated_at = $4
                WHERE id = $1",
            )
            .bind(role.id)
            .bind(&role.name)
            .bind(&role.description)
            .bind(role.updated_at)
            .execute(ex)
            .await
        })
        .map_err(|e| from_insert_error(e, "Role", "name", &role.name))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("Role", role.id));
        }

        Ok(())
    }

    async fn delete_role(&self, id: Uuid) -> StorageResult<()> {
        let result = with_executor!(self, |ex| {
            sqlx::query("DELETE FROM roles WHERE id = $1")
                .bind(id)
                .execute(ex)
                .await
        })
        .map_err(from_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("Role", id));
        }

        Ok(())
    }

    async fn get_role(&self, id: Uuid) -> StorageResult<Option<Role>> {
        let row: Option<RoleRow> = with_executor!(self, |ex| {
            sqlx::query_as(
                r"SELECT id, name, description, realm_id, owner_kind, owner_id,
                    created_at, updated_at
                FROM roles WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(ex)
            .await
        })
        .map_err(from_sqlx_error)?;

        row.map(Role::try_from).transpose()
    }

    async fn get_role_by_name(
        &self,
        owner: RoleOwner,
        name: &str,
    ) -> StorageResult<Option<Role>> {
        let row: Option<RoleRow> = with_executor!(self, |ex| {
            sqlx::query_as(
                r"SELECT id, name, description, realm_id, owner_kind, owner_id,
                    created_at, updated_at
                FROM roles WHERE owner_kind = $1 AND owner_id = $2 AND name = $3",
            )
            .bind(owner_kind(owner))
            .bind(owner.id())
            .bind(name)
            .fetch_optional(ex)
            .await
        })
        .map_err(from_sqlx_error)?;

        row.map(Role::try_from).transpose()
    }

    async fn list_roles(&self, owner: RoleOwner) -> StorageResult<Vec<Role>> {
        let rows: Vec<RoleRow> = with_executor!(self, |ex| {
            sqlx::query_as(
                r"SELECT id, name, description, realm_id, owner_kind, owner_id,
                    created_at, updated_at
                FROM roles WHERE owner_kind = $1 AND owner_id = $2
                ORDER BY name",
            )
            .bind(owner_kind(owner))
            .bind(owner.id())
            .fetch_all(ex)
            .await
        })
        .map_err(from_sqlx_error)?;

        collect_rows(rows)
    }
}

#[async_trait]
impl DefaultRoleProvider for PgStore {
    async fn list_default_roles(&self, owner: RoleOwner) -> StorageResult<Vec<Role>> {
        let rows: Vec<RoleRow> = with_executor!(self, |ex| {
            sqlx::query_as(
                r"SELECT r.id, r.name, r.description, r.realm_id, r.owner_kind,
                    r.owner_id, r.created_at, r.updated_at
                FROM default_roles d
                JOIN roles r ON r.id = d.role_id
                WHERE d.owner_kind = $1 AND d.owner_id = $2
                ORDER BY d.position",
            )
            .bind(owner_kind(owner))
            .bind(owner.id())
            .fetch_all(ex)
            .await
        })
        .map_err(from_sqlx_error)?;

        collect_rows(rows)
    }

    async fn add_default_role(&self, owner: RoleOwner, role_id: Uuid) -> StorageResult<bool> {
        let result = with_executor!(self, |ex| {
            sqlx::query(
                r"INSERT INTO default_roles (owner_kind, owner_id, application_id, role_id)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT DO NOTHING",
            )
            .bind(owner_kind(owner))
            .bind(owner.id())
            .bind(owner.application_id())
            .bind(role_id)
            .execute(ex)
            .await
        })
        .map_err(from_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_default_role(&self, owner: RoleOwner, role_id: Uuid) -> StorageResult<bool> {
        let result = with_executor!(self, |ex| {
            sqlx::query(
                r"DELETE FROM default_roles
                WHERE owner_kind = $1 AND owner_id = $2 AND role_id = $3",
            )
            .bind(owner_kind(owner))
            .bind(owner.id())
            .bind(role_id)
            .execute(ex)
            .await
        })
        .map_err(from_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_from_all_defaults(&self, role_id: Uuid) -> StorageResult<u64> {
        let result = with_executor!(self, |ex| {
            sqlx::query("DELETE FROM default_roles WHERE role_id = $1")
                .bind(role_id)
                .execute(ex)
                .await
        })
        .map_err(from_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn clear_default_roles(&self, owner: RoleOwner) -> StorageResult<u64> {
        let result = with_executor!(self, |ex| {
            sqlx::query("DELETE FROM default_roles WHERE owner_kind = $1 AND owner_id = $2")
                .bind(owner_kind(owner))
                .bind(owner.id())
                .execute(ex)
                .await
        })
        .map_err(from_sqlx_error)?;

        Ok(result.rows_affected())
    }
}
