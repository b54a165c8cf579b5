//! Shared test helpers for the account, policy and server test modules.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use async_trait::async_trait;
use tonic::Request;
use uuid::Uuid;
use warden_core::Role;

use crate::account::{AccountService, NewAccount};
use crate::auth::{JwtManager, hash_password};
use crate::gate::Principal;
use crate::revocation::{MemoryRevocationStore, RevocationError, RevocationStore};
use crate::storage::{AuthDatabase, NewUserParams, User, queries};

pub const TEST_SECRET: &[u8] = b"warden-test-secret-0123456789abcdef";

/// A revocation store whose backend is down.
///
/// `revoke_only` keeps reads and version writes working so a failure can be
/// injected into a single step.
pub struct FailingRevocationStore {
    reads_fail: bool,
}

impl FailingRevocationStore {
    pub const fn everything() -> Self {
        Self { reads_fail: true }
    }

    pub const fn revoke_only() -> Self {
        Self { reads_fail: false }
    }

    fn down() -> RevocationError {
        RevocationError::Backend("connection refused".into())
    }
}

#[async_trait]
impl RevocationStore for FailingRevocationStore {
    async fn revoke(&self, _refresh_token: &str, _ttl_secs: u64) -> Result<bool, RevocationError> {
        Err(Self::down())
    }

    async fn is_revoked(&self, _refresh_token: &str) -> Result<bool, RevocationError> {
        if self.reads_fail {
            return Err(Self::down());
        }
        Ok(false)
    }

    async fn get_version(&self, _user_id: &str) -> Result<i64, RevocationError> {
        if self.reads_fail {
            return Err(Self::down());
        }
        Ok(0)
    }

    async fn set_version(&self, _user_id: &str, _version: i64) -> Result<(), RevocationError> {
        if self.reads_fail {
            return Err(Self::down());
        }
        Ok(())
    }
}

pub fn test_jwt() -> Arc<JwtManager> {
    Arc::new(JwtManager::new(TEST_SECRET, 3600, 86400))
}

/// Account service over a fresh in-memory database and revocation store.
pub async fn account_service() -> (
    AccountService,
    AuthDatabase,
    Arc<JwtManager>,
    Arc<MemoryRevocationStore>,
) {
    let db = AuthDatabase::open_in_memory().await.unwrap();
    let (svc, jwt, store) = account_service_with(db.clone());
    (svc, db, jwt, store)
}

pub fn account_service_with(
    db: AuthDatabase,
) -> (AccountService, Arc<JwtManager>, Arc<MemoryRevocationStore>) {
    let jwt = test_jwt();
    let store = Arc::new(MemoryRevocationStore::new());
    let svc = AccountService::new(db, Arc::clone(&jwt), store.clone());
    (svc, jwt, store)
}

/// Insert an account directly, bypassing the service.
pub async fn seed_user(db: &AuthDatabase, name: &str, password: &str, role: Role) -> User {
    let id = Uuid::new_v4().to_string();
    let hash = hash_password(password).unwrap();
    let email = format!("{name}@example.com");
    let mut conn = db.pool().acquire().await.unwrap();
    queries::insert_user(
        &mut conn,
        &NewUserParams {
            id: &id,
            name,
            email: &email,
            password_hash: &hash,
            role,
        },
    )
    .await
    .unwrap()
}

pub fn admin_principal() -> Principal {
    Principal {
        user_id: "admin-1".into(),
        username: "root".into(),
        role: Role::Admin,
    }
}

pub fn principal_of(user: &User) -> Principal {
    Principal {
        user_id: user.id.clone(),
        username: user.name.clone(),
        role: user.role,
    }
}

/// A valid creation request for `name`, with password `secret-pw`.
pub fn new_account(name: &str, role: Role) -> NewAccount {
    NewAccount {
        name: name.into(),
        email: format!("{name}@example.com"),
        password: "secret-pw".into(),
        password_confirm: "secret-pw".into(),
        role,
    }
}

/// Wrap `inner` in a request that already passed the auth layer.
pub fn authed<T>(inner: T, principal: Principal) -> Request<T> {
    let mut req = Request::new(inner);
    req.extensions_mut().insert(principal);
    req
}
