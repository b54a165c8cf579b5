//! Named constants for the full gRPC paths of every Warden method.
//!
//! These strings are the endpoint identifiers used by the authorization
//! pipeline's allow-lists and by the policy table, so they must match the
//! paths tonic routes on exactly.

// ---------------------------------------------------------------------------
// AuthService
// ---------------------------------------------------------------------------

/// `AuthService/Login`
pub const METHOD_LOGIN: &str = "/warden.v1.AuthService/Login";

/// `AuthService/RefreshTokens`
pub const METHOD_REFRESH_TOKENS: &str = "/warden.v1.AuthService/RefreshTokens";

/// `AuthService/Logout`
pub const METHOD_LOGOUT: &str = "/warden.v1.AuthService/Logout";

/// `AuthService/Check`
pub const METHOD_CHECK: &str = "/warden.v1.AuthService/Check";

// ---------------------------------------------------------------------------
// UserService
// ---------------------------------------------------------------------------

/// `UserService/CreateUser`
pub const METHOD_CREATE_USER: &str = "/warden.v1.UserService/CreateUser";

/// `UserService/GetUser`
pub const METHOD_GET_USER: &str = "/warden.v1.UserService/GetUser";

/// `UserService/UpdateUser`
pub const METHOD_UPDATE_USER: &str = "/warden.v1.UserService/UpdateUser";

/// `UserService/DeleteUser`
pub const METHOD_DELETE_USER: &str = "/warden.v1.UserService/DeleteUser";

/// `UserService/RevokeSessions`
pub const METHOD_REVOKE_SESSIONS: &str = "/warden.v1.UserService/RevokeSessions";

// ---------------------------------------------------------------------------
// RoleEndpointService
// ---------------------------------------------------------------------------

/// `RoleEndpointService/AddRoleEndpoint`
pub const METHOD_ADD_ROLE_ENDPOINT: &str = "/warden.v1.RoleEndpointService/AddRoleEndpoint";

/// `RoleEndpointService/UpdateRoleEndpoint`
pub const METHOD_UPDATE_ROLE_ENDPOINT: &str = "/warden.v1.RoleEndpointService/UpdateRoleEndpoint";

/// `RoleEndpointService/DeleteRoleEndpoint`
pub const METHOD_DELETE_ROLE_ENDPOINT: &str = "/warden.v1.RoleEndpointService/DeleteRoleEndpoint";

/// `RoleEndpointService/GetRoleEndpoints`
pub const METHOD_GET_ROLE_ENDPOINTS: &str = "/warden.v1.RoleEndpointService/GetRoleEndpoints";

// ---------------------------------------------------------------------------
// grpc.health.v1.Health
// ---------------------------------------------------------------------------

/// `Health/Check`
pub const METHOD_HEALTH_CHECK: &str = "/grpc.health.v1.Health/Check";

/// `Health/Watch`
pub const METHOD_HEALTH_WATCH: &str = "/grpc.health.v1.Health/Watch";

/// Methods reachable without a credential.
pub const PUBLIC_METHODS: &[&str] = &[
    METHOD_LOGIN,
    METHOD_REFRESH_TOKENS,
    METHOD_LOGOUT,
    METHOD_HEALTH_CHECK,
    METHOD_HEALTH_WATCH,
];

/// Methods that additionally require the `ADMIN` role.
pub const ADMIN_METHODS: &[&str] = &[
    METHOD_CREATE_USER,
    METHOD_UPDATE_USER,
    METHOD_DELETE_USER,
    METHOD_REVOKE_SESSIONS,
    METHOD_ADD_ROLE_ENDPOINT,
    METHOD_UPDATE_ROLE_ENDPOINT,
    METHOD_DELETE_ROLE_ENDPOINT,
    METHOD_GET_ROLE_ENDPOINTS,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_and_admin_lists_are_disjoint() {
        for method in PUBLIC_METHODS {
            assert!(!ADMIN_METHODS.contains(method), "{method} is in both lists");
        }
    }

    #[test]
    fn every_method_is_a_full_grpc_path() {
        for method in PUBLIC_METHODS.iter().chain(ADMIN_METHODS) {
            assert!(method.starts_with('/'));
            assert_eq!(method.matches('/').count(), 2, "{method}");
        }
        assert!(METHOD_CHECK.starts_with("/warden.v1."));
        assert!(METHOD_GET_USER.starts_with("/warden.v1."));
    }
}
