//! Data models for Warden storage.

use std::collections::BTreeSet;

use warden_core::Role;

/// A stored account. `password` holds the argon2 PHC string.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub version: i64,
    pub created_at: i64,
    pub updated_at: Option<i64>,
}

/// Fields required to insert an account.
#[derive(Debug, Clone)]
pub struct NewUserParams<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
}

/// Sparse account update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges<'a> {
    pub name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub password_hash: Option<&'a str>,
    pub role: Option<Role>,
    /// Increment `version`, invalidating outstanding access tokens.
    pub bump_version: bool,
}

/// Raw row of the `policies` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PolicyRow {
    pub endpoint: String,
    pub allowed_roles: String,
}

/// An endpoint together with the roles allowed to call it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointPermission {
    pub endpoint: String,
    pub allowed_roles: BTreeSet<Role>,
}

/// One audit trail line.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuditLogEntry {
    pub id: i64,
    pub log: String,
    pub timestamp: i64,
}
