//! # kc-auth
//!
//! Authentication flow configuration for Keycloak Rust.
//!
//! This crate models a flow as a tree of executions and manages it through
//! the storage port.
//!
//! ## Features
//!
//! - Arena-backed flow tree with ordered siblings and cycle detection
//! - Requirement grouping (`REQUIRED`, `ALTERNATIVE`, `OPTIONAL`, `DISABLED`)
//! - Transactional flow editing: sub-flows, reordering, cascading removal
//!
//! ## NIST 800-53 Rev5 Controls
//!
//! - IA-2: Identification and Authentication
//! - CM-3: Configuration Change Control
//!
//! ## Example
//!
//! ```ignore
//! use kc_auth::FlowManager;
//! use kc_model::Requirement;
//!
//! let manager = FlowManager::new(store);
//! let browser = manager.create_flow(realm_id, "browser", None).await?;
//! manager.add_execution(browser.id, "auth-cookie", Requirement::Alternative).await?;
//! let (forms, _) = manager.add_sub_flow(browser.id, "forms", Requirement::Alternative).await?;
//!
//! let tree = manager.load_tree(browser.id).await?;
//! for (depth, step) in tree.walk() {
//!     println!("{:indent$}{}", "", step.authenticator, indent = depth * 2);
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod flow;
pub mod manager;

pub use error::{FlowError, FlowResult};
pub use flow::{FlowTree, SiblingGroup};
pub use manager::FlowManager;
