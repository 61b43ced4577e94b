//! Role domain model.
//!
//! Roles are used for role-based access control (RBAC).
//! They are owned either by a realm or by one application, never both.

use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ValidationError, require_non_blank};

/// The container a role belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum RoleOwner {
    /// A realm-level role.
    Realm(Uuid),
    /// A role scoped to one application.
    Application(Uuid),
}

impl RoleOwner {
    /// Returns the owner's id regardless of kind.
    #[must_use]
    pub const fn id(self) -> Uuid {
        match self {
            Self::Realm(id) | Self::Application(id) => id,
        }
    }

    /// Returns the application id for application-owned roles.
    #[must_use]
    pub const fn application_id(self) -> Option<Uuid> {
        match self {
            Self::Application(id) => Some(id),
            Self::Realm(_) => None,
        }
    }

    /// Short label for the owner kind.
    #[must_use]
    pub const fn kind(self) -> &'static str {
        match self {
            Self::Realm(_) => "realm",
            Self::Application(_) => "application",
        }
    }
}

impl fmt::Display for RoleOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

/// A Keycloak role.
///
/// Two roles are equal when their ids are equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    // === Identity ===
    /// Unique identifier.
    pub id: Uuid,
    /// Role name (unique within its owner).
    pub name: String,
    /// Role description.
    pub description: Option<String>,

    // === Scope ===
    /// Realm this role belongs to.
    pub realm_id: Uuid,
    /// Owning container.
    pub owner: RoleOwner,

    // === Timestamps ===
    /// When the role was created.
    pub created_at: DateTime<Utc>,
    /// When the role was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Role {
    /// Creates a new role for the given owner.
    #[must_use]
    pub fn new(realm_id: Uuid, owner: RoleOwner, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            description: None,
            realm_id,
            owner,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a new realm role.
    #[must_use]
    pub fn new_realm_role(realm_id: Uuid, name: impl Into<String>) -> Self {
        Self::new(realm_id, RoleOwner::Realm(realm_id), name)
    }

    /// Creates a new application role.
    #[must_use]
    pub fn new_application_role(
        realm_id: Uuid,
        application_id: Uuid,
        name: impl Into<String>,
    ) -> Self {
        Self::new(realm_id, RoleOwner::Application(application_id), name)
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Changes the name.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.updated_at = Utc::now();
    }

    /// Replaces the description.
    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
        self.updated_at = Utc::now();
    }

    /// Checks if this is a realm role.
    #[must_use]
    pub const fn is_realm_role(&self) -> bool {
        matches!(self.owner, RoleOwner::Realm(_))
    }

    /// Checks if this is an application role.
    #[must_use]
    pub const fn is_application_role(&self) -> bool {
        matches!(self.owner, RoleOwner::Application(_))
    }

    /// Checks whether `owner` owns this role.
    #[must_use]
    pub fn is_owned_by(&self, owner: RoleOwner) -> bool {
        self.owner == owner
    }

    /// Gets the full role name (`application.role_name` for application roles).
    #[must_use]
    pub fn full_name(&self, application_name: Option<&str>) -> String {
        match (self.owner, application_name) {
            (RoleOwner::Application(_), Some(app)) => format!("{}.{}", app, self.name),
            _ => self.name.clone(),
        }
    }

    /// Validates the role before it is stored.
    ///
    /// # Errors
    ///
    /// Returns an error for a blank name, or a realm role whose owner is a
    /// different realm.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("name", &self.name)?;
        if let RoleOwner::Realm(realm_id) = self.owner
            && realm_id != self.realm_id
        {
            return Err(ValidationError::invalid(
                "owner",
                "realm role must be owned by its own realm",
            ));
        }
        Ok(())
    }
}

impl PartialEq for Role {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Role {}

impl Hash for Role {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn realm_role_creation() {
        let realm_id = Uuid::now_v7();
        let role = Role::new_realm_role(realm_id, "admin");

        assert_eq!(role.name, "admin");
        assert!(role.is_realm_role());
        assert!(!role.is_application_role());
        assert!(role.is_owned_by(RoleOwner::Realm(realm_id)));
    }

    #[test]
    fn application_role_creation() {
        let realm_id = Uuid::now_v7();
        let app_id = Uuid::now_v7();
        let role = Role::new_application_role(realm_id, app_id, "manager");

        assert!(role.is_application_role());
        assert_eq!(role.owner.application_id(), Some(app_id));
        assert!(!role.is_owned_by(RoleOwner::Application(Uuid::now_v7())));
        assert!(!role.is_owned_by(RoleOwner::Realm(realm_id)));
    }

    #[test]
    fn owner_kind_is_part_of_identity() {
        let id = Uuid::now_v7();
        assert_ne!(RoleOwner::Realm(id), RoleOwner::Application(id));
        assert_eq!(RoleOwner::Application(id).to_string(), format!("application:{id}"));
    }

    #[test]
    fn equality_is_by_id() {
        let realm_id = Uuid::now_v7();
        let role = Role::new_realm_role(realm_id, "user");
        let mut renamed = role.clone();
        renamed.name = "member".to_string();

        let set: HashSet<Role> = [role.clone(), renamed].into_iter().collect();
        assert_eq!(set.len(), 1);
        assert_ne!(role, Role::new_realm_role(realm_id, "user"));
    }

    #[test]
    fn full_name_formatting() {
        let realm_id = Uuid::now_v7();
        let app_id = Uuid::now_v7();

        let realm_role = Role::new_realm_role(realm_id, "admin");
        assert_eq!(realm_role.full_name(None), "admin");

        let app_role = Role::new_application_role(realm_id, app_id, "manager");
        assert_eq!(app_role.full_name(Some("my-app")), "my-app.manager");
    }

    #[test]
    fn validation() {
        let realm_id = Uuid::now_v7();
        assert!(Role::new_realm_role(realm_id, "").validate().is_err());
        assert!(
            Role::new(realm_id, RoleOwner::Realm(Uuid::now_v7()), "x")
                .validate()
                .is_err()
        );
        assert!(Role::new_application_role(realm_id, Uuid::now_v7(), "x").validate().is_ok());
    }

    #[test]
    fn owner_serializes_tagged() {
        let id = Uuid::nil();
        let json = serde_json::to_value(RoleOwner::Application(id)).unwrap();
        assert_eq!(json["kind"], "application");
        assert_eq!(json["id"], id.to_string());
    }
}
