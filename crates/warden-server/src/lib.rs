//! Warden Server Library
//!
//! Authentication and role-based access control over gRPC:
//! - JWT access/refresh tokens and argon2 password hashing
//! - Refresh-token revocation and per-user token versions (Redis or memory)
//! - Endpoint policy engine backed by SQLite
//! - Authorization layer in front of every service
//! - Transactional, audited account management

pub mod account;
pub mod app;
pub mod auth;
pub mod gate;
pub mod policy;
pub mod revocation;
pub mod server;
pub mod storage;
