//! `PostgreSQL` implementation of the application storage provider.

use async_trait::async_trait;
use kc_model::Application;
use kc_storage::error::StorageResult;
use kc_storage::{ApplicationProvider, StorageError};
use sqlx::types::Json;
use uuid::Uuid;

use crate::convert::{claim_mask_to_column, collect_rows};
use crate::entities::ApplicationRow;
use crate::error::{from_insert_error, from_sqlx_error};
use crate::store::{PgStore, with_executor};

fn sorted(values: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut values: Vec<String> = values.into_iter().collect();
    values.sort();
    values
}

#[async_trait]
impl ApplicationProvider for PgStore {
    async fn create_application(&self, application: &Application) -> StorageResult<()> {
        let mask = claim_mask_to_column(application.allowed_claims_mask)?;
        let redirect_uris = sorted(application.redirect_uris());
        let web_origins = sorted(application.web_origins());

        with_executor!(self, |ex| {
            sqlx::query(
                r"INSERT INTO applications (
                    id, realm_id, name, enabled, allowed_claims_mask,
                    surrogate_auth_required, management_url, base_url, secret,
                    redirect_uris, web_origins, created_at, updated_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
            )
            .bind(application.id)
            .bind(application.realm_id)
            .bind(&application.name)
            .bind(application.enabled)
            .bind(mask)
            .bind(application.surrogate_auth_required)
            .bind(&application.management_url)
            .bind(&application.base_url)
            .bind(application.secret())
            .bind(Json(&redirect_uris))
            .bind(Json(&web_origins))
            .bind(application.created_at)
            .bind(application.updated_at)
            .execute(ex)
            .await
        })
        .map_err(|e| from_insert_error(e, "Application", "name", &application.name))?;

        Ok(())
    }

    async fn update_application(&self, application: &Application) -> StorageResult<()> {
        let mask = claim_mask_to_column(application.allowed_claims_mask)?;
        let redirect_uris = sorted(application.redirect_uris());
        let web_origins = sorted(application.web_origins());

        let result = with_executor!(self, |ex| {
            sqlx::query(
                r"UPDATE applications SET
                    name = $2, enabled = $3, allowed_claims_mask = $4,
                    surrogate_auth_required = $5, management_url = $6, base_url = $7,
                    secret = $8, redirect_uris = $9, web_origins = $10, updated_at = $11
                WHERE id = $1",
            )
            .bind(application.id)
            .bind(&application.name)
            .bind(application.enabled)
            .bind(mask)
            .bind(application.surrogate_auth_required)
            .bind(&application.management_url)
            .bind(&application.base_url)
            .bind(application.secret())
            .bind(Json(&redirect_uris))
            .bind(Json(&web_origins))
            .bind(application.updated_at)
            .execute(ex)
            .await
        })
        .map_err(|e| from_insert_error(e, "Application", "name", &application.name))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("Application", application.id));
        }

        Ok(())
    }

    async fn delete_application(&self, id: Uuid) -> StorageResult<()> {
        // Scope mappings are keyed by client id without a foreign key.
        let scoped: i64 = with_executor!(self, |ex| {
            sqlx::query_scalar("SELECT COUNT(*) FROM scope_mappings WHERE client_id = $1")
                .bind(id)
                .fetch_one(ex)
                .await
        })
        .map_err(from_sqlx_error)?;

        if scoped > 0 {
            return Err(StorageError::constraint(format!(
                "application {id} still holds {scoped} scope mapping(s)"
            )));
        }

        let result = with_executor!(self, |ex| {
            sqlx::query("DELETE FROM applications WHERE id = $1")
                .bind(id)
                .execute(ex)
                .await
        })
        .map_err(from_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("Application", id));
        }

        Ok(())
    }

    async fn get_application(&self, id: Uuid) -> StorageResult<Option<Application>> {
        let row: Option<ApplicationRow> = with_executor!(self, |ex| {
            sqlx::query_as(
                r"SELECT id, realm_id, name, enabled, allowed_claims_mask,
                    surrogate_auth_required, management_url, base_url, secret,
                    redirect_uris, web_origins, created_at, updated_at
                FROM applications WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(ex)
            .await
        })
        .map_err(from_sqlx_error)?;

        row.map(Application::try_from).transpose()
    }

    async fn get_application_by_name(
        &self,
        realm_id: Uuid,
        name: &str,
    ) -> StorageResult<Option<Application>> {
        let row: Option<ApplicationRow> = with_executor!(self, |ex| {
            sqlx::query_as(
                r"SELECT id, realm_id, name, enabled, allowed_claims_mask,
                    surrogate_auth_required, management_url, base_url, secret,
                    redirect_uris, web_origins, created_at, updated_at
                FROM applications WHERE realm_id = $1 AND name = $2",
            )
            .bind(realm_id)
            .bind(name)
            .fetch_optional(ex)
            .await
        })
        .map_err(from_sqlx_error)?;

        row.map(Application::try_from).transpose()
    }

    async fn list_applications(&self, realm_id: Uuid) -> StorageResult<Vec<Application>> {
        let rows: Vec<ApplicationRow> = with_executor!(self, |ex| {
            sqlx::query_as(
                r"SELECT id, realm_id, name, enabled, allowed_claims_mask,
                    surrogate_auth_required, management_url, base_url, secret,
                    redirect_uris, web_origins, created_at, updated_at
                FROM applications WHERE realm_id = $1
                ORDER BY name",
            )
            .bind(realm_id)
            .fetch_all(ex)
            .await
        })
        .map_err(from_sqlx_error)?;

        collect_rows(rows)
    }
}
