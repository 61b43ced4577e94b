//! # kc-storage-sql
//!
//! SQLx-based storage implementation for Keycloak Rust.
//!
//! This crate provides [`PgStore`], a `PostgreSQL` implementation of every
//! `kc-storage` provider trait. A store is one session: it runs plain
//! statements on the pool and, between `begin` and `commit`, on a single
//! transaction.
//!
//! The schema lives in the workspace `migrations/` directory and is applied
//! with [`run_migrations`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod application;
mod convert;
mod entities;
pub mod error;
mod flow;
mod mapping;
pub mod pool;
mod role;
mod store;

pub use pool::{PoolConfig, create_pool, run_migrations};
pub use store::PgStore;
