//! Redis-backed revocation store.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use tracing::{debug, info};

use super::{RevocationError, RevocationStore, revoked_key, version_key};

impl From<redis::RedisError> for RevocationError {
    fn from(e: redis::RedisError) -> Self {
        Self::Backend(e.to_string())
    }
}

/// Revocation store on a shared Redis instance.
///
/// The connection manager reconnects on its own and is cheap to clone, so
/// each call works on its own handle.
#[derive(Clone)]
pub struct RedisRevocationStore {
    conn: ConnectionManager,
    raise_version: Script,
}

/// Compare-and-raise in one server-side step. Returns 1 when the stored
/// version changed.
const RAISE_VERSION_LUA: &str = r"
local current = tonumber(redis.call('GET', KEYS[1]))
local proposed = tonumber(ARGV[1])
if current == nil or current < proposed then
    redis.call('SET', KEYS[1], ARGV[1])
    return 1
end
return 0
";

impl RedisRevocationStore {
    /// Connect to `url` (e.g. `redis://:password@cache:6379/0`).
    pub async fn connect(url: &str) -> Result<Self, RevocationError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        info!("Connected to revocation cache");
        Ok(Self {
            conn,
            raise_version: Script::new(RAISE_VERSION_LUA),
        })
    }
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn revoke(&self, refresh_token: &str, ttl_secs: u64) -> Result<bool, RevocationError> {
        let mut conn = self.conn.clone();
        // SET key 1 NX EX ttl replies OK when set and nil when the key exists.
        let reply: Option<String> = redis::cmd("SET")
            .arg(revoked_key(refresh_token))
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs.max(1))
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn is_revoked(&self, refresh_token: &str) -> Result<bool, RevocationError> {
        let mut conn = self.conn.clone();
        let value: Option<i64> = conn.get(revoked_key(refresh_token)).await?;
        Ok(value.is_some())
    }

    async fn get_version(&self, user_id: &str) -> Result<i64, RevocationError> {
        let mut conn = self.conn.clone();
        let value: Option<i64> = conn.get(version_key(user_id)).await?;
        Ok(value.unwrap_or(0))
    }

    async fn set_version(&self, user_id: &str, version: i64) -> Result<(), RevocationError> {
        let mut conn = self.conn.clone();
        let raised: i64 = self
            .raise_version
            .key(version_key(user_id))
            .arg(version)
            .invoke_async(&mut conn)
            .await?;
        if raised == 0 {
            debug!(user_id, version, "Stored token version is already newer");
        }
        Ok(())
    }
}
