//! # kc-storage
//!
//! Storage abstraction traits for Keycloak Rust.
//!
//! This crate defines the storage provider interfaces that concrete backends
//! (in-memory, SQL) implement. The model facades in `kc-realm` and `kc-auth`
//! only ever talk to these traits.
//!
//! ## Provider Traits
//!
//! - [`RoleProvider`] - CRUD and indexed lookup for roles
//! - [`DefaultRoleProvider`] - default-role links per role owner
//! - [`RoleMappingProvider`] - realm-wide user-role and scope mappings
//! - [`ApplicationProvider`] - CRUD operations for applications
//! - [`AuthenticationFlowProvider`] - flows and their executions
//! - [`Transactional`] - transaction boundaries for cascading operations
//!
//! [`ModelStore`] bundles all of them.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod application;
pub mod error;
pub mod flow;
pub mod mapping;
pub mod memory;
pub mod role;
pub mod transaction;

pub use application::ApplicationProvider;
pub use error::{StorageError, StorageResult};
pub use flow::AuthenticationFlowProvider;
pub use mapping::RoleMappingProvider;
pub use memory::MemoryStore;
pub use role::{DefaultRoleProvider, RoleProvider};
pub use transaction::Transactional;

/// Every provider a model facade needs, behind one object.
pub trait ModelStore:
    RoleProvider
    + DefaultRoleProvider
    + RoleMappingProvider
    + ApplicationProvider
    + AuthenticationFlowProvider
    + Transactional
{
}

impl<T> ModelStore for T where
    T: RoleProvider
        + DefaultRoleProvider
        + RoleMappingProvider
        + ApplicationProvider
        + AuthenticationFlowProvider
        + Transactional
{
}
