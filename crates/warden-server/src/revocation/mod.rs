//! Refresh-token revocation and per-user token versions.
//!
//! The store is a key/TTL cache. A revoked refresh token is recorded under
//! the SHA-256 of its text for the rest of its natural lifetime; a user's
//! token version is a plain counter with no expiry. Access tokens are never
//! revoked individually: bumping the version supersedes all of them.

mod memory;
mod redis_store;

use async_trait::async_trait;

use crate::auth::JwtManager;

pub use self::memory::MemoryRevocationStore;
pub use self::redis_store::RedisRevocationStore;

const KEY_PREFIX: &str = "warden";

#[derive(Debug, thiserror::Error)]
pub enum RevocationError {
    #[error("Revocation store error: {0}")]
    Backend(String),
}

/// Cache-backed revocation state.
///
/// Every call is an I/O boundary and may suspend.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Record `refresh_token` as revoked for `ttl_secs` seconds.
    ///
    /// Returns `false` if the token was already revoked. The check and the
    /// insert are a single atomic step, which is what makes refresh tokens
    /// single-use under concurrent rotation.
    async fn revoke(&self, refresh_token: &str, ttl_secs: u64) -> Result<bool, RevocationError>;

    /// Whether `refresh_token` is revoked. A missing entry is `Ok(false)`.
    async fn is_revoked(&self, refresh_token: &str) -> Result<bool, RevocationError>;

    /// Current token version of a user; `0` when none was ever stored.
    async fn get_version(&self, user_id: &str) -> Result<i64, RevocationError>;

    /// Raise a user's token version to `version`. A lower value than the one
    /// stored is ignored, so syncs landing out of order never move it back.
    async fn set_version(&self, user_id: &str, version: i64) -> Result<(), RevocationError>;
}

pub(crate) fn revoked_key(refresh_token: &str) -> String {
    format!("{KEY_PREFIX}:revoked:{}", JwtManager::hash_token(refresh_token))
}

pub(crate) fn version_key(user_id: &str) -> String {
    format!("{KEY_PREFIX}:version:{user_id}")
}
