//! `Warden` Core Library
//!
//! Shared functionality for `Warden` components:
//! - The closed set of access-control roles
//! - `SQLite` pool helpers and the storage error taxonomy
//! - Tracing subscriber initialisation

pub mod db;
pub mod role;
pub mod tracing_init;

pub use db::DatabaseError;
pub use role::{Role, RoleParseError};
