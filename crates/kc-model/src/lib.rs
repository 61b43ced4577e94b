//! # kc-model
//!
//! Domain models for Keycloak Rust: authentication flows and their
//! executions, roles, and applications.
//!
//! These types are persistence-independent; storage backends convert them to
//! and from their own row types.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod application;
pub mod error;
pub mod flow;
pub mod role;

pub use application::{Application, ClaimMask};
pub use error::ValidationError;
pub use flow::{AuthenticationExecution, AuthenticationFlow, Requirement};
pub use role::{Role, RoleOwner};
