//! JWT claims structures for Warden tokens.

use serde::{Deserialize, Serialize};
use warden_core::Role;

pub const TOKEN_TYPE_ACCESS: &str = "access";
pub const TOKEN_TYPE_REFRESH: &str = "refresh";

/// Claims embedded in access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// JWT ID (unique per token).
    pub jti: String,
    /// Subject (user ID).
    pub sub: String,
    /// Username.
    pub username: String,
    /// Role at the time of issuance.
    pub role: Role,
    /// Token version of the user at the time of issuance.
    pub ver: i64,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiration (unix timestamp).
    pub exp: i64,
    /// Always `"access"`.
    pub typ: String,
}

/// Claims embedded in refresh tokens.
///
/// Carries no role: every refresh re-reads the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub jti: String,
    /// Subject (user ID).
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    /// Always `"refresh"`.
    pub typ: String,
}

impl AccessClaims {
    pub fn is_access(&self) -> bool {
        self.typ == TOKEN_TYPE_ACCESS
    }
}

impl RefreshClaims {
    pub fn is_refresh(&self) -> bool {
        self.typ == TOKEN_TYPE_REFRESH
    }
}
