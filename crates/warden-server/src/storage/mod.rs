//! SQLite storage for Warden.
//!
//! Provides persistence for accounts, the endpoint policy table and the
//! audit log. Account mutations go through the connection-level functions
//! in [`queries`] so they can share one transaction.

mod db;
mod models;
pub mod queries;
mod queries_policies;


pub use db::AuthDatabase;
pub use models::*;
pub use warden_core::db::DatabaseError;
