//! Login, token refresh and logout.

use tracing::{debug, info, instrument, warn};
use warden_core::db::{DatabaseError, unix_timestamp};

use super::{AccountError, AccountService, LoginFailure, TokenPair};
use crate::auth::{PasswordError, verify_decoy, verify_password};

impl AccountService {
    /// Authenticate by name and password and issue a fresh token pair.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AccountError> {
        let user = match self.db.get_user_by_name(username).await {
            Ok(user) => user,
            Err(DatabaseError::NotFound(_)) => {
                verify_decoy(password);
                warn!(username, "Login for unknown user");
                return Err(LoginFailure::UserNotFound.into());
            }
            Err(e) => {
                verify_decoy(password);
                return Err(LoginFailure::Lookup(e).into());
            }
        };

        verify_password(password, &user.password).map_err(|e| match e {
            PasswordError::Mismatch => {
                warn!(username, "Failed login attempt");
                LoginFailure::WrongPassword
            }
            other => LoginFailure::Password(other),
        })?;

        let access_token = self
            .jwt
            .issue_access_token(&user)
            .map_err(LoginFailure::Token)?;
        let refresh_token = self
            .jwt
            .issue_refresh_token(&user.id)
            .map_err(LoginFailure::Token)?;

        info!(user_id = %user.id, username, "User logged in");
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Mint a new access token from a refresh token.
    ///
    /// The account is re-read so role changes and deletions take effect on
    /// the next refresh.
    pub async fn access_token(&self, refresh_token: &str) -> Result<String, AccountError> {
        let user_id = self.check_refresh(refresh_token).await?;

        let user = self.db.get_user(&user_id).await.map_err(|e| match e {
            DatabaseError::NotFound(_) => {
                debug!(user_id = %user_id, "Refresh for deleted account");
                AccountError::InvalidRefresh
            }
            other => AccountError::UserRead(other.to_string()),
        })?;

        self.jwt
            .issue_access_token(&user)
            .map_err(|e| AccountError::TokenGeneration(e.to_string()))
    }

    /// Exchange a refresh token for a new one, revoking the old token.
    ///
    /// If the old token cannot be revoked the call fails even though a new
    /// token was minted; the new token is discarded. Of two concurrent
    /// rotations of the same token, at most one succeeds.
    pub async fn rotate_refresh_token(&self, refresh_token: &str) -> Result<String, AccountError> {
        let user_id = self.check_refresh(refresh_token).await?;

        let fresh = self
            .jwt
            .issue_refresh_token(&user_id)
            .map_err(|e| AccountError::TokenGeneration(e.to_string()))?;

        let ttl = self.remaining_lifetime(refresh_token);
        match self.revocations.revoke(refresh_token, ttl).await {
            Ok(true) => Ok(fresh),
            Ok(false) => {
                warn!(user_id = %user_id, "Refresh token reused during rotation");
                Err(AccountError::InvalidRefresh)
            }
            Err(e) => Err(AccountError::TokenGeneration(format!(
                "could not revoke previous refresh token: {e}"
            ))),
        }
    }

    /// Issue a new access token and rotate the refresh token in one call.
    #[instrument(skip_all)]
    pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<TokenPair, AccountError> {
        let access_token = self.access_token(refresh_token).await?;
        let refresh_token = self.rotate_refresh_token(refresh_token).await?;
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Revoke a refresh token. Logging out twice is not an error.
    #[instrument(skip_all)]
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AccountError> {
        let claims = self
            .jwt
            .verify_refresh(refresh_token)
            .map_err(|_| AccountError::InvalidRefresh)?;

        let ttl = self.remaining_lifetime(refresh_token);
        let newly_revoked = self
            .revocations
            .revoke(refresh_token, ttl)
            .await
            .map_err(|e| AccountError::LogoutFailed(e.to_string()))?;

        if newly_revoked {
            info!(user_id = %claims.sub, "User logged out");
        } else {
            debug!(user_id = %claims.sub, "Refresh token was already revoked");
        }
        Ok(())
    }

    /// Revocation check followed by verification. Returns the subject.
    async fn check_refresh(&self, refresh_token: &str) -> Result<String, AccountError> {
        match self.revocations.is_revoked(refresh_token).await {
            Ok(false) => {}
            Ok(true) => {
                debug!("Revoked refresh token presented");
                return Err(AccountError::InvalidRefresh);
            }
            Err(e) => {
                warn!(error = %e, "Revocation check failed");
                return Err(AccountError::InvalidRefresh);
            }
        }

        self.jwt
            .verify_refresh(refresh_token)
            .map(|claims| claims.sub)
            .map_err(|_| AccountError::InvalidRefresh)
    }

    /// Seconds until `refresh_token` expires, at least one.
    fn remaining_lifetime(&self, refresh_token: &str) -> u64 {
        let exp = self
            .jwt
            .verify_refresh(refresh_token)
            .map_or_else(|_| unix_timestamp() + self.jwt.refresh_ttl_secs(), |c| c.exp);
        u64::try_from(exp - unix_timestamp()).unwrap_or(0).max(1)
    }
}
