//! Account service: login, refresh and logout, plus audited account CRUD.
//!
//! Session operations talk to the token service and the revocation store and
//! never open a transaction. Account CRUD runs each call in one database
//! transaction that also carries the audit entry; dropping the transaction
//! on any error (or on cancellation) rolls it back.

mod session;
mod users;

use std::sync::Arc;

use warden_core::Role;
use warden_core::db::DatabaseError;

use crate::auth::{JwtManager, PasswordError, TokenError};
use crate::revocation::RevocationStore;
use crate::storage::AuthDatabase;

/// Why a login failed. Never exposed to callers beyond "unauthenticated".
#[derive(Debug, thiserror::Error)]
pub enum LoginFailure {
    #[error("no such user")]
    UserNotFound,

    #[error("wrong password")]
    WrongPassword,

    #[error("user lookup failed: {0}")]
    Lookup(DatabaseError),

    #[error("password check failed: {0}")]
    Password(PasswordError),

    #[error("token generation failed: {0}")]
    Token(TokenError),
}

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("Login failed: {0}")]
    Login(#[from] LoginFailure),

    #[error("Passwords do not match")]
    PasswordsMismatch,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("User name already exists")]
    UserNameExists,

    #[error("User email already exists")]
    UserEmailExists,

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Failed to create user: {0}")]
    UserCreate(String),

    #[error("Failed to read user: {0}")]
    UserRead(String),

    #[error("Failed to update user: {0}")]
    UserUpdate(String),

    #[error("Failed to delete user: {0}")]
    UserDelete(String),

    #[error("Invalid refresh token")]
    InvalidRefresh,

    #[error("Token generation failed: {0}")]
    TokenGeneration(String),

    #[error("Logout failed: {0}")]
    LogoutFailed(String),

    /// The change was committed but the cached token version could not be
    /// updated, so existing access tokens may still be honoured.
    #[error("Token version sync failed: {0}")]
    VersionSync(String),
}

/// Access and refresh token issued together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Input of [`AccountService::create_user`].
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    pub role: Role,
}

/// Sparse input of [`AccountService::update_user`]. `None` keeps the field.
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

#[derive(Clone)]
pub struct AccountService {
    db: AuthDatabase,
    jwt: Arc<JwtManager>,
    revocations: Arc<dyn RevocationStore>,
}

impl AccountService {
    pub fn new(
        db: AuthDatabase,
        jwt: Arc<JwtManager>,
        revocations: Arc<dyn RevocationStore>,
    ) -> Self {
        Self {
            db,
            jwt,
            revocations,
        }
    }
}

/// Map a store error from a write path onto the account taxonomy.
fn write_error(e: DatabaseError, fallback: fn(String) -> AccountError) -> AccountError {
    match e {
        DatabaseError::UniqueViolation { column } if column == "name" => {
            AccountError::UserNameExists
        }
        DatabaseError::UniqueViolation { column } if column == "email" => {
            AccountError::UserEmailExists
        }
        DatabaseError::NotFound(what) => AccountError::UserNotFound(what),
        other => fallback(other.to_string()),
    }
}

fn require<'a>(value: &'a str, field: &'static str) -> Result<&'a str, AccountError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AccountError::MissingField(field));
    }
    Ok(trimmed)
}
