//! Mapping of domain errors onto gRPC status codes, and proto conversions.
//!
//! Authentication failures all read "unauthenticated" without a cause.
//! Infrastructure failures are logged here and reported with a generic
//! message.

use std::collections::BTreeSet;

use tonic::Status;
use tracing::{error, warn};
use warden_core::Role;
use warden_proto::Role as ProtoRole;

use crate::account::{AccountError, LoginFailure};
use crate::gate::AuthError;
use crate::policy::PolicyError;
use crate::storage::{EndpointPermission, User};

impl From<AuthError> for Status {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MetadataMissing
            | AuthError::AuthHeaderMissing
            | AuthError::InvalidAuthHeaderFormat
            | AuthError::Unauthenticated => Self::unauthenticated("Unauthenticated"),
            AuthError::PermissionDenied => Self::permission_denied("Permission denied"),
            AuthError::VersionLookup(e) => {
                error!(error = %e, "Token version lookup failed");
                Self::unavailable("Authorization temporarily unavailable")
            }
        }
    }
}

impl From<PolicyError> for Status {
    fn from(err: PolicyError) -> Self {
        match err {
            PolicyError::EndpointNotFound(endpoint) => {
                Self::not_found(format!("Endpoint not found: {endpoint}"))
            }
            PolicyError::AccessDenied { .. } => Self::permission_denied("Permission denied"),
            PolicyError::EndpointExists(endpoint) => {
                Self::already_exists(format!("Endpoint already exists: {endpoint}"))
            }
            PolicyError::InvalidPermission(msg) => Self::invalid_argument(msg),
            PolicyError::Storage(e) => {
                error!(error = %e, "Policy storage failure");
                Self::internal("Policy operation failed")
            }
        }
    }
}

impl From<AccountError> for Status {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Login(failure) => {
                match &failure {
                    LoginFailure::UserNotFound | LoginFailure::WrongPassword => {}
                    other => error!(error = %other, "Login failed on an internal error"),
                }
                Self::unauthenticated("Invalid credentials")
            }
            AccountError::PasswordsMismatch => Self::invalid_argument("Passwords do not match"),
            AccountError::MissingField(field) => {
                Self::invalid_argument(format!("Missing required field: {field}"))
            }
            AccountError::UserNotFound(_) => Self::not_found("User not found"),
            AccountError::UserNameExists => Self::already_exists("User name already exists"),
            AccountError::UserEmailExists => Self::already_exists("User email already exists"),
            AccountError::PermissionDenied => Self::permission_denied("Permission denied"),
            AccountError::InvalidRefresh => Self::unauthenticated("Invalid refresh token"),
            AccountError::UserCreate(e) => internal("Failed to create user", &e),
            AccountError::UserRead(e) => internal("Failed to read user", &e),
            AccountError::UserUpdate(e) => internal("Failed to update user", &e),
            AccountError::UserDelete(e) => internal("Failed to delete user", &e),
            AccountError::TokenGeneration(e) => internal("Token generation failed", &e),
            AccountError::VersionSync(e) => internal("Token version sync failed", &e),
            AccountError::LogoutFailed(e) => {
                warn!(error = %e, "Logout failed");
                Self::unavailable("Logout failed")
            }
        }
    }
}

fn internal(message: &'static str, cause: &str) -> Status {
    error!(error = %cause, "{message}");
    Status::internal(message)
}

pub fn role_to_proto(role: Role) -> i32 {
    match role {
        Role::Admin => ProtoRole::Admin as i32,
        Role::User => ProtoRole::User as i32,
    }
}

/// Decode a wire role. `ROLE_UNSPECIFIED` and unknown values are rejected.
#[allow(clippy::result_large_err)]
pub fn role_from_proto(value: i32) -> Result<Role, Status> {
    match ProtoRole::try_from(value) {
        Ok(ProtoRole::Admin) => Ok(Role::Admin),
        Ok(ProtoRole::User) => Ok(Role::User),
        Ok(ProtoRole::Unspecified) | Err(_) => {
            Err(Status::invalid_argument(format!("Invalid role: {value}")))
        }
    }
}

#[allow(clippy::result_large_err)]
pub fn roles_from_proto(values: &[i32]) -> Result<BTreeSet<Role>, Status> {
    values.iter().map(|v| role_from_proto(*v)).collect()
}

pub fn user_to_proto(user: User) -> warden_proto::User {
    warden_proto::User {
        id: user.id,
        name: user.name,
        email: user.email,
        role: role_to_proto(user.role),
        created_at: user.created_at,
        updated_at: user.updated_at,
    }
}

pub fn permission_to_proto(permission: EndpointPermission) -> warden_proto::RoleEndpoint {
    warden_proto::RoleEndpoint {
        endpoint: permission.endpoint,
        allowed_roles: permission
            .allowed_roles
            .into_iter()
            .map(role_to_proto)
            .collect(),
    }
}
