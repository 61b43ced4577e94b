//! # kc-core
//!
//! Core utilities, configuration, and error handling for Keycloak Rust.
//!
//! This crate provides the ambient pieces shared by the model crates:
//! configuration loading and logging initialisation.
//!
//! ## NIST 800-53 Rev5 Controls
//!
//! - AU-2: Event logging framework
//! - SI-11: Error handling

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;

pub use config::{Config, DatabaseConfig, LogFormat, LoggingConfig};
pub use error::{Error, Result};
