//! Conversions between database rows and domain models.

use kc_model::{
    Application, AuthenticationExecution, AuthenticationFlow, ClaimMask, Role, RoleOwner,
};
use kc_storage::StorageError;

use crate::entities::{ApplicationRow, ExecutionRow, FlowRow, RoleRow};

/// Column value for a role owner kind.
pub const fn owner_kind(owner: RoleOwner) -> &'static str {
    owner.kind()
}

/// Rebuilds a role owner from its stored columns.
pub fn owner_from_columns(kind: &str, id: uuid::Uuid) -> Result<RoleOwner, StorageError> {
    match kind {
        "realm" => Ok(RoleOwner::Realm(id)),
        "application" => Ok(RoleOwner::Application(id)),
        other => Err(StorageError::InvalidData(format!(
            "unknown role owner kind '{other}'"
        ))),
    }
}

/// Column value for a claim mask.
pub fn claim_mask_to_column(mask: ClaimMask) -> Result<i64, StorageError> {
    i64::try_from(mask.bits())
        .map_err(|_| StorageError::InvalidData(format!("claim mask {mask:?} out of range")))
}

impl TryFrom<RoleRow> for Role {
    type Error = StorageError;

    fn try_from(row: RoleRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            description: row.description,
            realm_id: row.realm_id,
            owner: owner_from_columns(&row.owner_kind, row.owner_id)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<ApplicationRow> for Application {
    type Error = StorageError;

    fn try_from(row: ApplicationRow) -> Result<Self, Self::Error> {
        let mask = u64::try_from(row.allowed_claims_mask).map_err(|_| {
            StorageError::InvalidData(format!(
                "negative claim mask {} on application {}",
                row.allowed_claims_mask, row.id
            ))
        })?;

        let mut application = Self::new(row.realm_id, row.name);
        application.id = row.id;
        application.enabled = row.enabled;
        application.allowed_claims_mask = ClaimMask::from_bits(mask);
        application.surrogate_auth_required = row.surrogate_auth_required;
        application.management_url = row.management_url;
        application.base_url = row.base_url;
        application.set_secret(row.secret);
        application.set_redirect_uris(row.redirect_uris.0.into_iter().collect());
        application.set_web_origins(row.web_origins.0.into_iter().collect());
        application.created_at = row.created_at;
        // Setters above touch the timestamp; restore the stored one last.
        application.updated_at = row.updated_at;
        Ok(application)
    }
}

impl From<FlowRow> for AuthenticationFlow {
    fn from(row: FlowRow) -> Self {
        Self {
            id: row.id,
            realm_id: row.realm_id,
            alias: row.alias,
            description: row.description,
            provider_id: row.provider_id,
            top_level: row.top_level,
            built_in: row.built_in,
            created_at: row.created_at,
        }
    }
}

impl TryFrom<ExecutionRow> for AuthenticationExecution {
    type Error = StorageError;

    fn try_from(row: ExecutionRow) -> Result<Self, Self::Error> {
        let requirement = row
            .requirement
            .parse()
            .map_err(|e| StorageError::InvalidData(format!("execution {}: {e}", row.id)))?;

        Ok(Self {
            id: row.id,
            realm_id: row.realm_id,
            authenticator: row.authenticator,
            authenticator_flow: row.authenticator_flow,
            requirement,
            user_setup_allowed: row.user_setup_allowed,
            priority: row.priority,
            parent_flow: row.parent_flow,
        })
    }
}

/// Converts every row, failing on the first bad one.
pub fn collect_rows<R, T>(rows: Vec<R>) -> Result<Vec<T>, StorageError>
where
    T: TryFrom<R, Error = StorageError>,
{
    rows.into_iter().map(T::try_from).collect()
}
