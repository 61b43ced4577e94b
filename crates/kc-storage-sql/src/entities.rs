//! Database entity types for `SQLx`.
//!
//! These types map directly to database rows and are converted
//! to domain models in [`crate::convert`].

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

/// Database row for roles.
#[derive(Debug, Clone, FromRow)]
pub struct RoleRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub realm_id: Uuid,
    pub owner_kind: String,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database row for applications.
#[derive(Debug, Clone, FromRow)]
pub struct ApplicationRow {
    pub id: Uuid,
    pub realm_id: Uuid,
    pub name: String,
    pub enabled: bool,
    pub allowed_claims_mask: i64,
    pub surrogate_auth_required: bool,
    pub management_url: Option<String>,
    pub base_url: Option<String>,
    pub secret: Option<String>,
    pub redirect_uris: Json<Vec<String>>,
    pub web_origins: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database row for authentication flows.
#[derive(Debug, Clone, FromRow)]
pub struct FlowRow {
    pub id: Uuid,
    pub realm_id: Uuid,
    pub alias: String,
    pub description: Option<String>,
    pub provider_id: String,
    pub top_level: bool,
    pub built_in: bool,
    pub created_at: DateTime<Utc>,
}

/// Database row for authentication executions.
#[derive(Debug, Clone, FromRow)]
pub struct ExecutionRow {
    pub id: Uuid,
    pub realm_id: Uuid,
    pub authenticator: String,
    pub authenticator_flow: bool,
    pub requirement: String,
    pub user_setup_allowed: bool,
    pub priority: i32,
    pub parent_flow: Option<Uuid>,
}
