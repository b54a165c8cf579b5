//! Request authorization pipeline.
//!
//! Every inbound call passes through [`Gatekeeper::authorize`] before it is
//! dispatched. The checks short-circuit on the first failure:
//!
//! 1. public endpoints pass without a credential
//! 2. bearer extraction from the `authorization` metadata
//! 3. access token verification
//! 4. token version check against the revocation store
//! 5. admin-only endpoints require the `ADMIN` role
//!
//! The allow-lists are static. The dynamic [`PolicyEngine`] only backs the
//! explicit `Check` RPC.
//!
//! [`PolicyEngine`]: crate::policy::PolicyEngine

mod layer;

use std::sync::Arc;

use http::HeaderMap;
use tonic::{Request, Status};
use tracing::debug;
use warden_core::Role;
use warden_proto::methods::{ADMIN_METHODS, PUBLIC_METHODS};

use crate::auth::JwtManager;
use crate::revocation::{RevocationError, RevocationStore};

pub use self::layer::{AuthLayer, AuthMiddleware};

const AUTHORIZATION_HEADER: &str = "authorization";
const BEARER_PREFIX: &str = "Bearer ";

/// The authenticated caller, attached to the request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub username: String,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Request metadata missing")]
    MetadataMissing,

    #[error("Authorization header missing")]
    AuthHeaderMissing,

    #[error("Authorization header is not a bearer credential")]
    InvalidAuthHeaderFormat,

    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Token version lookup failed: {0}")]
    VersionLookup(#[from] RevocationError),
}

pub fn is_public(endpoint: &str) -> bool {
    PUBLIC_METHODS.contains(&endpoint)
}

pub fn is_admin_only(endpoint: &str) -> bool {
    ADMIN_METHODS.contains(&endpoint)
}

/// Composes token verification, version checking and the static allow-lists.
#[derive(Clone)]
pub struct Gatekeeper {
    jwt: Arc<JwtManager>,
    revocations: Arc<dyn RevocationStore>,
}

impl Gatekeeper {
    pub fn new(jwt: Arc<JwtManager>, revocations: Arc<dyn RevocationStore>) -> Self {
        Self { jwt, revocations }
    }

    /// Authorize a call to `endpoint`.
    ///
    /// Returns `Ok(None)` for public endpoints and the caller's identity
    /// otherwise. Nothing is mutated.
    pub async fn authorize(
        &self,
        endpoint: &str,
        metadata: Option<&HeaderMap>,
    ) -> Result<Option<Principal>, AuthError> {
        if is_public(endpoint) {
            return Ok(None);
        }

        let token = bearer_token(metadata)?;
        let claims = self
            .jwt
            .verify_access(token)
            .map_err(|_| AuthError::Unauthenticated)?;

        let current = self.revocations.get_version(&claims.sub).await?;
        if claims.ver < current {
            debug!(user_id = %claims.sub, token_version = claims.ver, current, "Superseded access token");
            return Err(AuthError::Unauthenticated);
        }

        if is_admin_only(endpoint) && claims.role != Role::Admin {
            debug!(user_id = %claims.sub, endpoint, "Admin-only endpoint");
            return Err(AuthError::PermissionDenied);
        }

        Ok(Some(Principal {
            user_id: claims.sub,
            username: claims.username,
            role: claims.role,
        }))
    }
}

fn bearer_token(metadata: Option<&HeaderMap>) -> Result<&str, AuthError> {
    let headers = metadata.ok_or(AuthError::MetadataMissing)?;
    let value = headers
        .get(AUTHORIZATION_HEADER)
        .ok_or(AuthError::AuthHeaderMissing)?;
    value
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix(BEARER_PREFIX))
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidAuthHeaderFormat)
}

/// Extract the principal from a request that passed the auth layer.
#[allow(clippy::result_large_err)]
pub fn extract_principal<T>(req: &Request<T>) -> Result<&Principal, Status> {
    req.extensions()
        .get::<Principal>()
        .ok_or_else(|| Status::unauthenticated("Unauthenticated"))
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used)]
mod tests {
    use http::HeaderValue;
    use warden_proto::methods::{METHOD_CHECK, METHOD_CREATE_USER, METHOD_GET_USER, METHOD_LOGIN};

    use super::*;
    use crate::revocation::MemoryRevocationStore;
    use crate::storage::User;

    fn user(role: Role, version: i64) -> User {
        User {
            id: "u1".into(),
            name: "alice".into(),
            email: "alice@example.com".into(),
            password: String::new(),
            role,
            version,
            created_at: 0,
            updated_at: None,
        }
    }

    fn setup() -> (Gatekeeper, Arc<JwtManager>, Arc<MemoryRevocationStore>) {
        let jwt = Arc::new(JwtManager::new(b"gate-test-secret", 3600, 86400));
        let store = Arc::new(MemoryRevocationStore::new());
        let gate = Gatekeeper::new(Arc::clone(&jwt), store.clone());
        (gate, jwt, store)
    }

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION_HEADER, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn bearer(token: &str) -> HeaderMap {
        headers_with(&format!("Bearer {token}"))
    }

    #[tokio::test]
    async fn public_endpoint_needs_no_credential() {
        let (gate, _, _) = setup();
        assert_eq!(gate.authorize(METHOD_LOGIN, None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn credential_extraction_errors_are_distinct() {
        let (gate, _, _) = setup();

        assert!(matches!(
            gate.authorize(METHOD_CHECK, None).await,
            Err(AuthError::MetadataMissing)
        ));
        assert!(matches!(
            gate.authorize(METHOD_CHECK, Some(&HeaderMap::new())).await,
            Err(AuthError::AuthHeaderMissing)
        ));
        assert!(matches!(
            gate.authorize(METHOD_CHECK, Some(&headers_with("Basic abc"))).await,
            Err(AuthError::InvalidAuthHeaderFormat)
        ));
        assert!(matches!(
            gate.authorize(METHOD_CHECK, Some(&headers_with("Bearer "))).await,
            Err(AuthError::InvalidAuthHeaderFormat)
        ));
    }

    #[tokio::test]
    async fn valid_token_yields_principal() {
        let (gate, jwt, _) = setup();
        let token = jwt.issue_access_token(&user(Role::User, 0)).unwrap();

        let principal = gate
            .authorize(METHOD_GET_USER, Some(&bearer(&token)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(principal.user_id, "u1");
        assert_eq!(principal.username, "alice");
        assert_eq!(principal.role, Role::User);
    }

    #[tokio::test]
    async fn refresh_token_is_not_a_credential() {
        let (gate, jwt, _) = setup();
        let token = jwt.issue_refresh_token("u1").unwrap();

        assert!(matches!(
            gate.authorize(METHOD_GET_USER, Some(&bearer(&token))).await,
            Err(AuthError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn bumped_version_invalidates_unexpired_token() {
        let (gate, jwt, store) = setup();
        let token = jwt.issue_access_token(&user(Role::User, 2)).unwrap();

        store.set_version("u1", 2).await.unwrap();
        assert!(gate.authorize(METHOD_GET_USER, Some(&bearer(&token))).await.is_ok());

        store.set_version("u1", 3).await.unwrap();
        assert!(matches!(
            gate.authorize(METHOD_GET_USER, Some(&bearer(&token))).await,
            Err(AuthError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn admin_only_endpoint_checks_role() {
        let (gate, jwt, _) = setup();
        let user_token = jwt.issue_access_token(&user(Role::User, 0)).unwrap();
        let admin_token = jwt.issue_access_token(&user(Role::Admin, 0)).unwrap();

        assert!(matches!(
            gate.authorize(METHOD_CREATE_USER, Some(&bearer(&user_token))).await,
            Err(AuthError::PermissionDenied)
        ));
        let principal = gate
            .authorize(METHOD_CREATE_USER, Some(&bearer(&admin_token)))
            .await
            .unwrap()
            .unwrap();
        assert!(principal.is_admin());
    }

    #[test]
    fn missing_principal_is_unauthenticated() {
        let req = Request::new(());
        let err = extract_principal(&req).unwrap_err();
        assert_eq!(err.code(), tonic::Code::Unauthenticated);
    }
}
