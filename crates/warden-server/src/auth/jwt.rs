//! JWT token issuance and validation.
//!
//! Both token kinds are HMAC-signed with the same secret and distinguished by
//! their `typ` claim. Verification only accepts the HMAC family, applies no
//! expiry leeway, and reports every failure as [`TokenError::Invalid`].

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use tracing::debug;
use warden_core::db::unix_timestamp;

use super::claims::{AccessClaims, RefreshClaims, TOKEN_TYPE_ACCESS, TOKEN_TYPE_REFRESH};
use crate::storage::User;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token generation failed: {0}")]
    Generation(String),

    /// Signature, algorithm, expiry or shape check failed. The cause is
    /// deliberately not carried.
    #[error("Invalid token")]
    Invalid,
}

/// Manages JWT token creation and validation.
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl JwtManager {
    /// Create a new `JwtManager` with the given secret and token lifetimes.
    ///
    /// Lifetimes are signed so tests can mint already-expired tokens.
    pub fn new(secret: &[u8], access_ttl_secs: i64, refresh_ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl_secs,
            refresh_ttl_secs,
        }
    }

    pub const fn access_ttl_secs(&self) -> i64 {
        self.access_ttl_secs
    }

    pub const fn refresh_ttl_secs(&self) -> i64 {
        self.refresh_ttl_secs
    }

    /// Issue an access token carrying the user's role and token version.
    pub fn issue_access_token(&self, user: &User) -> Result<String, TokenError> {
        let now = unix_timestamp();
        let claims = AccessClaims {
            jti: uuid::Uuid::new_v4().to_string(),
            sub: user.id.clone(),
            username: user.name.clone(),
            role: user.role,
            ver: user.version,
            iat: now,
            exp: now + self.access_ttl_secs,
            typ: TOKEN_TYPE_ACCESS.to_string(),
        };
        self.sign(&claims)
    }

    /// Issue a refresh token for the given user ID.
    pub fn issue_refresh_token(&self, user_id: &str) -> Result<String, TokenError> {
        let now = unix_timestamp();
        let claims = RefreshClaims {
            jti: uuid::Uuid::new_v4().to_string(),
            sub: user_id.to_string(),
            iat: now,
            exp: now + self.refresh_ttl_secs,
            typ: TOKEN_TYPE_REFRESH.to_string(),
        };
        self.sign(&claims)
    }

    /// Validate an access token and return its claims.
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let claims: AccessClaims = self.decode(token)?;
        if !claims.is_access() {
            debug!(typ = %claims.typ, "Rejected non-access token");
            return Err(TokenError::Invalid);
        }
        Ok(claims)
    }

    /// Validate a refresh token and return its claims.
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        let claims: RefreshClaims = self.decode(token)?;
        if !claims.is_refresh() {
            debug!(typ = %claims.typ, "Rejected non-refresh token");
            return Err(TokenError::Invalid);
        }
        Ok(claims)
    }

    /// Hash a token for use as a storage key (raw tokens are never stored).
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String, TokenError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| TokenError::Generation(e.to_string()))
    }

    fn decode<T: DeserializeOwned + Clone>(&self, token: &str) -> Result<T, TokenError> {
        jsonwebtoken::decode::<T>(token, &self.decoding_key, &hmac_validation())
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "Token verification failed");
                TokenError::Invalid
            })
    }
}

/// Validation rules shared by both token kinds.
///
/// Restricting `algorithms` to the HMAC family rejects `none` and asymmetric
/// algorithms before any signature check runs.
fn hmac_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
    validation.leeway = 0;
    validation
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use warden_core::Role;

    // base64url of {"alg":"none","typ":"JWT"} and {"alg":"RS256","typ":"JWT"}
    const NONE_HEADER: &str = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0";
    const RS256_HEADER: &str = "eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9";

    fn test_jwt() -> JwtManager {
        JwtManager::new(b"test-secret-key-for-testing", 3600, 86400)
    }

    fn alice() -> User {
        User {
            id: "user-1".into(),
            name: "alice".into(),
            email: "alice@example.com".into(),
            password: String::new(),
            role: Role::User,
            version: 3,
            created_at: 0,
            updated_at: None,
        }
    }

    fn replace_header(token: &str, header: &str) -> String {
        let (_, rest) = token.split_once('.').unwrap();
        format!("{header}.{rest}")
    }

    #[test]
    fn issue_and_verify_access_token() {
        let jwt = test_jwt();
        let token = jwt.issue_access_token(&alice()).unwrap();

        let claims = jwt.verify_access(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, Role::User);
        assert_eq!(claims.ver, 3);
        assert_eq!(claims.exp - claims.iat, 3600);
        assert!(claims.is_access());
    }

    #[test]
    fn issue_and_verify_refresh_token() {
        let jwt = test_jwt();
        let token = jwt.issue_refresh_token("user-1").unwrap();

        let claims = jwt.verify_refresh(&token).unwrap();
        assert!(claims.is_refresh());
        assert_eq!(claims.sub, "user-1");
    }

    #[test]
    fn tokens_minted_back_to_back_differ() {
        let jwt = test_jwt();
        let a = jwt.issue_refresh_token("user-1").unwrap();
        let b = jwt.issue_refresh_token("user-1").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn token_kinds_are_not_interchangeable() {
        let jwt = test_jwt();
        let access = jwt.issue_access_token(&alice()).unwrap();
        let refresh = jwt.issue_refresh_token("user-1").unwrap();

        assert!(matches!(jwt.verify_refresh(&access), Err(TokenError::Invalid)));
        assert!(matches!(jwt.verify_access(&refresh), Err(TokenError::Invalid)));
    }

    #[test]
    fn garbage_fails_verification() {
        let jwt = test_jwt();
        assert!(matches!(
            jwt.verify_access("not-a-valid-token"),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn wrong_secret_fails_verification() {
        let jwt1 = test_jwt();
        let jwt2 = JwtManager::new(b"different-secret", 3600, 86400);

        let token = jwt1.issue_access_token(&alice()).unwrap();
        assert!(matches!(jwt2.verify_access(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn expired_token_fails_verification() {
        let jwt = JwtManager::new(b"test-secret-key-for-testing", -1, -1);

        let access = jwt.issue_access_token(&alice()).unwrap();
        let refresh = jwt.issue_refresh_token("user-1").unwrap();

        assert!(matches!(jwt.verify_access(&access), Err(TokenError::Invalid)));
        assert!(matches!(jwt.verify_refresh(&refresh), Err(TokenError::Invalid)));
    }

    #[test]
    fn any_single_character_change_is_rejected() {
        let jwt = test_jwt();
        let token = jwt.issue_access_token(&alice()).unwrap();

        for i in 0..token.len() {
            let mut bytes = token.clone().into_bytes();
            bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
            let tampered = String::from_utf8(bytes).unwrap();

            assert!(
                matches!(jwt.verify_access(&tampered), Err(TokenError::Invalid)),
                "tampering at byte {i} was accepted"
            );
        }
    }

    #[test]
    fn unsigned_token_is_rejected() {
        let jwt = test_jwt();
        let token = jwt.issue_access_token(&alice()).unwrap();

        let forged = replace_header(&token, NONE_HEADER);
        assert!(matches!(jwt.verify_access(&forged), Err(TokenError::Invalid)));

        let (unsigned, _) = forged.rsplit_once('.').unwrap();
        assert!(matches!(
            jwt.verify_access(&format!("{unsigned}.")),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn asymmetric_algorithm_header_is_rejected() {
        let jwt = test_jwt();
        let token = jwt.issue_access_token(&alice()).unwrap();

        let forged = replace_header(&token, RS256_HEADER);
        assert!(matches!(jwt.verify_access(&forged), Err(TokenError::Invalid)));
    }

    #[test]
    fn token_hash_is_deterministic() {
        let h1 = JwtManager::hash_token("same-token");
        let h2 = JwtManager::hash_token("same-token");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);

        let h3 = JwtManager::hash_token("different-token");
        assert_ne!(h1, h3);
    }
}
