//! Authentication flow domain model.
//!
//! A flow is an ordered tree of executions. Each execution either runs a
//! concrete authenticator or delegates to a sub-flow. Executions point at
//! their owning flow (`parent_flow`); children are derived, never stored.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ValidationError, require_non_blank};

/// How an execution takes part in its flow.
///
/// - `Required`: must succeed for the flow to continue.
/// - `Optional`: attempted if the user has it configured, skipped otherwise.
/// - `Alternative`: at least one alternative sibling must succeed when no
///   sibling is `Required`.
/// - `Disabled`: skipped entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Requirement {
    /// Must succeed.
    Required,
    /// Attempted when configured.
    Optional,
    /// One of the alternatives must succeed.
    Alternative,
    /// Never run.
    #[default]
    Disabled,
}

impl Requirement {
    /// All requirement values, in declaration order.
    pub const ALL: [Self; 4] = [
        Self::Required,
        Self::Optional,
        Self::Alternative,
        Self::Disabled,
    ];

    /// Returns the canonical upper-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Required => "REQUIRED",
            Self::Optional => "OPTIONAL",
            Self::Alternative => "ALTERNATIVE",
            Self::Disabled => "DISABLED",
        }
    }

    /// Checks for `Required`.
    #[must_use]
    pub const fn is_required(self) -> bool {
        matches!(self, Self::Required)
    }

    /// Checks for `Optional`.
    #[must_use]
    pub const fn is_optional(self) -> bool {
        matches!(self, Self::Optional)
    }

    /// Checks for `Alternative`.
    #[must_use]
    pub const fn is_alternative(self) -> bool {
        matches!(self, Self::Alternative)
    }

    /// Checks for `Disabled`.
    #[must_use]
    pub const fn is_disabled(self) -> bool {
        matches!(self, Self::Disabled)
    }

    /// Every requirement except `Disabled` is enabled.
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        !self.is_disabled()
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Requirement {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| ValidationError::invalid("requirement", format!("unknown value '{s}'")))
    }
}

/// Provider id of the generic flow implementation.
pub const BASIC_FLOW_PROVIDER: &str = "basic-flow";

/// An authentication flow (a named container of executions).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationFlow {
    /// Unique identifier.
    pub id: Uuid,
    /// Realm this flow belongs to.
    pub realm_id: Uuid,
    /// Alias (unique within the realm).
    pub alias: String,
    /// Description.
    pub description: Option<String>,
    /// Flow provider id.
    pub provider_id: String,
    /// Whether the flow can be bound directly (browser, direct grant, ...).
    pub top_level: bool,
    /// Whether the flow ships with the server and must not be removed.
    pub built_in: bool,
    /// When the flow was created.
    pub created_at: DateTime<Utc>,
}

impl AuthenticationFlow {
    /// Creates a new top-level flow.
    #[must_use]
    pub fn new_top_level(realm_id: Uuid, alias: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            realm_id,
            alias: alias.into(),
            description: None,
            provider_id: BASIC_FLOW_PROVIDER.to_string(),
            top_level: true,
            built_in: false,
            created_at: Utc::now(),
        }
    }

    /// Creates a new flow meant to be referenced from another flow.
    #[must_use]
    pub fn new_sub_flow(realm_id: Uuid, alias: impl Into<String>) -> Self {
        Self {
            top_level: false,
            ..Self::new_top_level(realm_id, alias)
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Validates the flow before it is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the alias or provider id is blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("alias", &self.alias)?;
        require_non_blank("provider_id", &self.provider_id)
    }
}

/// One step of an authentication flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationExecution {
    /// Unique identifier.
    pub id: Uuid,
    /// Realm this execution belongs to.
    pub realm_id: Uuid,
    /// Authenticator provider id, or the flow id when `authenticator_flow`.
    pub authenticator: String,
    /// Whether `authenticator` names a flow rather than an authenticator.
    pub authenticator_flow: bool,
    /// Requirement of this step.
    pub requirement: Requirement,
    /// Whether the user may configure this step during login.
    pub user_setup_allowed: bool,
    /// Ordering among siblings, lower first.
    pub priority: i32,
    /// Owning flow, `None` for a root step.
    pub parent_flow: Option<Uuid>,
}

impl AuthenticationExecution {
    /// Creates a step running a concrete authenticator.
    #[must_use]
    pub fn authenticator(
        realm_id: Uuid,
        parent_flow: Option<Uuid>,
        provider_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            realm_id,
            authenticator: provider_id.into(),
            authenticator_flow: false,
            requirement: Requirement::default(),
            user_setup_allowed: false,
            priority: 0,
            parent_flow,
        }
    }

    /// Creates a step delegating to another flow.
    #[must_use]
    pub fn sub_flow(realm_id: Uuid, parent_flow: Option<Uuid>, flow_id: Uuid) -> Self {
        Self {
            authenticator_flow: true,
            ..Self::authenticator(realm_id, parent_flow, flow_id.to_string())
        }
    }

    /// Sets the requirement.
    #[must_use]
    pub const fn with_requirement(mut self, requirement: Requirement) -> Self {
        self.requirement = requirement;
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Allows user setup at login.
    #[must_use]
    pub const fn with_user_setup_allowed(mut self, allowed: bool) -> Self {
        self.user_setup_allowed = allowed;
        self
    }

    /// Returns the referenced flow id for sub-flow steps.
    #[must_use]
    pub fn sub_flow_id(&self) -> Option<Uuid> {
        if self.authenticator_flow {
            Uuid::parse_str(&self.authenticator).ok()
        } else {
            None
        }
    }

    /// Sort key among siblings: priority first, id to break ties.
    #[must_use]
    pub const fn ordering_key(&self) -> (i32, Uuid) {
        (self.priority, self.id)
    }

    /// Shorthand for `self.requirement.is_required()`.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.requirement.is_required()
    }

    /// Shorthand for `self.requirement.is_optional()`.
    #[must_use]
    pub const fn is_optional(&self) -> bool {
        self.requirement.is_optional()
    }

    /// Shorthand for `self.requirement.is_alternative()`.
    #[must_use]
    pub const fn is_alternative(&self) -> bool {
        self.requirement.is_alternative()
    }

    /// Shorthand for `self.requirement.is_disabled()`.
    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        self.requirement.is_disabled()
    }

    /// Shorthand for `self.requirement.is_enabled()`.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.requirement.is_enabled()
    }

    /// Validates the step before it is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the authenticator is blank, if a sub-flow step
    /// does not reference a flow id, or if it references its own parent.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("authenticator", &self.authenticator)?;

        if self.authenticator_flow {
            let flow_id = self.sub_flow_id().ok_or_else(|| {
                ValidationError::invalid(
                    "authenticator",
                    format!("'{}' is not a flow id", self.authenticator),
                )
            })?;
            if Some(flow_id) == self.parent_flow {
                return Err(ValidationError::invalid(
                    "authenticator",
                    "a flow cannot contain itself",
                ));
            }
        }

        Ok(())
    }
}
