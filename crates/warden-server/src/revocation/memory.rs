//! In-process revocation store for development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use warden_core::db::unix_timestamp;

use super::{RevocationError, RevocationStore, revoked_key, version_key};

/// Keeps revocations and versions in process memory.
///
/// Entries expire lazily: an expired revocation reads as absent and is
/// replaced on the next insert.
#[derive(Default)]
pub struct MemoryRevocationStore {
    /// Key -> expiry (unix seconds).
    revoked: RwLock<HashMap<String, i64>>,
    versions: RwLock<HashMap<String, i64>>,
}

impl MemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired revocations. Returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = unix_timestamp();
        let mut revoked = self.revoked.write().await;
        let before = revoked.len();
        revoked.retain(|_, expires_at| *expires_at > now);
        before - revoked.len()
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn revoke(&self, refresh_token: &str, ttl_secs: u64) -> Result<bool, RevocationError> {
        let now = unix_timestamp();
        let ttl = i64::try_from(ttl_secs.max(1)).unwrap_or(i64::MAX);
        let mut revoked = self.revoked.write().await;
        let key = revoked_key(refresh_token);
        if revoked.get(&key).is_some_and(|expires_at| *expires_at > now) {
            return Ok(false);
        }
        revoked.insert(key, now.saturating_add(ttl));
        Ok(true)
    }

    async fn is_revoked(&self, refresh_token: &str) -> Result<bool, RevocationError> {
        let now = unix_timestamp();
        Ok(self
            .revoked
            .read()
            .await
            .get(&revoked_key(refresh_token))
            .is_some_and(|expires_at| *expires_at > now))
    }

    async fn get_version(&self, user_id: &str) -> Result<i64, RevocationError> {
        Ok(self
            .versions
            .read()
            .await
            .get(&version_key(user_id))
            .copied()
            .unwrap_or(0))
    }

    async fn set_version(&self, user_id: &str, version: i64) -> Result<(), RevocationError> {
        self.versions
            .write()
            .await
            .entry(version_key(user_id))
            .and_modify(|current| *current = (*current).max(version))
            .or_insert(version);
        Ok(())
    }
}
