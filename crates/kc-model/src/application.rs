//! Application domain model.
//!
//! Applications are the registered clients that request authentication and
//! own application-scoped roles.

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ValidationError, require_non_blank};

/// Bit set of claim categories an application may receive in tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimMask(u64);

impl ClaimMask {
    /// No claims.
    pub const NONE: Self = Self(0);
    /// Full name claims.
    pub const NAME: Self = Self(0x01);
    /// Preferred username.
    pub const USERNAME: Self = Self(0x02);
    /// Profile URL.
    pub const PROFILE: Self = Self(0x04);
    /// Picture URL.
    pub const PICTURE: Self = Self(0x08);
    /// Website URL.
    pub const WEBSITE: Self = Self(0x10);
    /// Email and verification flag.
    pub const EMAIL: Self = Self(0x20);
    /// Gender.
    pub const GENDER: Self = Self(0x40);
    /// Locale.
    pub const LOCALE: Self = Self(0x80);
    /// Postal address.
    pub const ADDRESS: Self = Self(0x100);
    /// Phone number.
    pub const PHONE: Self = Self(0x200);
    /// Every claim category.
    pub const ALL: Self = Self(0x3FF);

    /// Creates a mask from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Returns the raw bits.
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Checks whether every bit of `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Sets the bits of `other`.
    pub const fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Clears the bits of `other`.
    pub const fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl Default for ClaimMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// A registered application.
///
/// Equality and hashing consider only the id. Redirect URIs and web origins
/// are handed out as copies; use the `add_*`/`remove_*`/`set_*` methods to
/// change them.
#[derive(Clone, Serialize, Deserialize)]
pub struct Application {
    // === Identity ===
    /// Unique identifier.
    pub id: Uuid,
    /// Realm this application belongs to.
    pub realm_id: Uuid,
    /// Application name (unique within the realm).
    pub name: String,
    /// Whether the application is enabled.
    pub enabled: bool,

    // === Claims ===
    /// Claim categories the application may receive.
    pub allowed_claims_mask: ClaimMask,
    /// Whether the application must authenticate on behalf of users.
    pub surrogate_auth_required: bool,

    // === URLs ===
    /// Management URL for backchannel operations.
    pub management_url: Option<String>,
    /// Base URL of the application.
    pub base_url: Option<String>,

    // === Timestamps ===
    /// When the application was created.
    pub created_at: DateTime<Utc>,
    /// When the application was last updated.
    pub updated_at: DateTime<Utc>,

    secret: Option<String>,
    redirect_uris: HashSet<String>,
    web_origins: HashSet<String>,
}

impl Application {
    /// Creates a new enabled application with no secret.
    #[must_use]
    pub fn new(realm_id: Uuid, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            realm_id,
            name: name.into(),
            enabled: true,
            allowed_claims_mask: ClaimMask::default(),
            surrogate_auth_required: false,
            management_url: None,
            base_url: None,
            created_at: now,
            updated_at: now,
            secret: None,
            redirect_uris: HashSet::new(),
            web_origins: HashSet::new(),
        }
    }

    /// Sets the secret.
    #[must_use]
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Adds a redirect URI.
    #[must_use]
    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uris.insert(uri.into());
        self
    }

    /// Adds a web origin.
    #[must_use]
    pub fn with_web_origin(mut self, origin: impl Into<String>) -> Self {
        self.web_origins.insert(origin.into());
        self
    }

    /// Returns the stored secret.
    #[must_use]
    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    /// Replaces the secret; `None` clears it.
    pub fn set_secret(&mut self, secret: Option<String>) {
        self.secret = secret;
        self.touch();
    }

    /// Checks a candidate against the stored secret.
    ///
    /// Comparison is exact and case-sensitive. Without a stored secret every
    /// candidate is rejected, including the empty string.
    #[must_use]
    pub fn validate_secret(&self, candidate: &str) -> bool {
        self.secret.as_deref().is_some_and(|secret| secret == candidate)
    }

    /// Returns a copy of the redirect URIs.
    #[must_use]
    pub fn redirect_uris(&self) -> HashSet<String> {
        self.redirect_uris.clone()
    }

    /// Replaces the redirect URIs.
    pub fn set_redirect_uris(&mut self, uris: HashSet<String>) {
        self.redirect_uris = uris;
        self.touch();
    }

    /// Adds a redirect URI.
    pub fn add_redirect_uri(&mut self, uri: impl Into<String>) {
        self.redirect_uris.insert(uri.into());
        self.touch();
    }

    /// Removes a redirect URI, returning whether it was present.
    pub fn remove_redirect_uri(&mut self, uri: &str) -> bool {
        let removed = self.redirect_uris.remove(uri);
        if removed {
            self.touch();
        }
        removed
    }

    /// Returns a copy of the web origins.
    #[must_use]
    pub fn web_origins(&self) -> HashSet<String> {
        self.web_origins.clone()
    }

    /// Replaces the web origins.
    pub fn set_web_origins(&mut self, origins: HashSet<String>) {
        self.web_origins = origins;
        self.touch();
    }

    /// Adds a web origin.
    pub fn add_web_origin(&mut self, origin: impl Into<String>) {
        self.web_origins.insert(origin.into());
        self.touch();
    }

    /// Removes a web origin, returning whether it was present.
    pub fn remove_web_origin(&mut self, origin: &str) -> bool {
        let removed = self.web_origins.remove(origin);
        if removed {
            self.touch();
        }
        removed
    }

    /// Validates the application before it is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_blank("name", &self.name)
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl PartialEq for Application {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Application {}

impl Hash for Application {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("id", &self.id)
            .field("realm_id", &self.realm_id)
            .field("name", &self.name)
            .field("enabled", &self.enabled)
            .field("allowed_claims_mask", &self.allowed_claims_mask)
            .field("surrogate_auth_required", &self.surrogate_auth_required)
            .field("management_url", &self.management_url)
            .field("base_url", &self.base_url)
            .field("secret", &self.secret.as_ref().map(|_| "***"))
            .field("redirect_uris", &self.redirect_uris)
            .field("web_origins", &self.web_origins)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_application_has_defaults() {
        let app = Application::new(Uuid::now_v7(), "my-app");

        assert_eq!(app.name, "my-app");
        assert!(app.enabled);
        assert!(app.secret().is_none());
        assert_eq!(app.allowed_claims_mask, ClaimMask::ALL);
        assert!(app.redirect_uris().is_empty());
    }

    #[test]
    fn secret_validation_is_exact() {
        let app = Application::new(Uuid::now_v7(), "backend").with_secret("s3cr3t");

        assert!(app.validate_secret("s3cr3t"));
        assert!(!app.validate_secret("S3cr3t"));
        assert!(!app.validate_secret("s3cr3t "));
        assert!(!app.validate_secret(""));
    }

    #[test]
    fn absent_secret_rejects_everything() {
        let mut app = Application::new(Uuid::now_v7(), "spa");

        assert!(!app.validate_secret(""));
        assert!(!app.validate_secret("anything"));

        app.set_secret(Some(String::new()));
        assert!(app.validate_secret(""));

        app.set_secret(None);
        assert!(!app.validate_secret(""));
    }

    #[test]
    fn redirect_uris_are_copies() {
        let mut app = Application::new(Uuid::now_v7(), "app")
            .with_redirect_uri("https://example.com/callback");

        let mut copy = app.redirect_uris();
        copy.insert("https://evil.com/callback".to_string());
        copy.clear();
        assert_eq!(app.redirect_uris().len(), 1);

        app.add_redirect_uri("https://example.com/other");
        assert!(app.remove_redirect_uri("https://example.com/callback"));
        assert!(!app.remove_redirect_uri("https://example.com/callback"));
        assert_eq!(
            app.redirect_uris(),
            HashSet::from(["https://example.com/other".to_string()])
        );
    }

    #[test]
    fn web_origins_are_copies() {
        let mut app = Application::new(Uuid::now_v7(), "app").with_web_origin("https://example.com");

        app.web_origins().insert("*".to_string());
        assert!(!app.web_origins().contains("*"));

        app.set_web_origins(HashSet::from(["https://a.example".to_string()]));
        app.add_web_origin("https://b.example");
        assert!(app.remove_web_origin("https://a.example"));
        assert_eq!(app.web_origins().len(), 1);
    }

    #[test]
    fn equality_is_by_id() {
        let app = Application::new(Uuid::now_v7(), "app");
        let mut changed = app.clone();
        changed.name = "renamed".to_string();
        changed.enabled = false;

        assert_eq!(app, changed);
        assert_ne!(app, Application::new(app.realm_id, "app"));
    }

    #[test]
    fn debug_redacts_secret() {
        let app = Application::new(Uuid::now_v7(), "app").with_secret("hunter2");
        assert!(!format!("{app:?}").contains("hunter2"));
    }

    #[test]
    fn claim_mask_bits() {
        let mut mask = ClaimMask::NONE;
        mask.insert(ClaimMask::EMAIL);
        mask.insert(ClaimMask::USERNAME);

        assert!(mask.contains(ClaimMask::EMAIL));
        assert!(!mask.contains(ClaimMask::PHONE));
        assert!(ClaimMask::ALL.contains(mask));

        mask.remove(ClaimMask::EMAIL);
        assert_eq!(mask, ClaimMask::USERNAME);
        assert_eq!(ClaimMask::from_bits(mask.bits()), mask);
    }
}
