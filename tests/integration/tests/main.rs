//! End-to-end integration tests.
//!
//! These tests drive the role graph, application lifecycle, and flow
//! management facades against the in-memory store and, when Docker is
//! available, against an ephemeral PostgreSQL instance.

mod flows;
mod postgres;
mod role_graph;
