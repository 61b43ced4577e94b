//! # kc-realm
//!
//! Authorization model facades for Keycloak Rust.
//!
//! Every type here is a thin facade over the `kc-storage` port and holds no
//! durable state of its own:
//!
//! - [`RoleContainer`] - the roles of one application or realm, their
//!   default-role set, and cascading role removal
//! - [`ScopeMappingView`] - realm-wide role and scope mappings narrowed to
//!   one application
//! - [`ApplicationAdapter`] - an application's identity bundled with its
//!   roles and scope
//! - [`Applications`] - application registration and deregistration
//!
//! ## NIST 800-53 Rev5 Controls
//!
//! - AC-2: Account Management (default roles)
//! - AC-3: Access Enforcement (ownership-checked role lookups)
//! - AC-6: Least Privilege (scope mappings)
//! - IA-5: Authenticator Management (client secret validation)

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod application;
pub mod error;
pub mod roles;
pub mod scope;
mod transaction;

pub use application::{ApplicationAdapter, Applications};
pub use error::{RealmError, RealmResult};
pub use roles::RoleContainer;
pub use scope::ScopeMappingView;
