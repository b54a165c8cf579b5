//! gRPC server implementations for Warden.

pub mod auth_svc;
pub mod policy_svc;
pub mod status;
pub mod user_svc;

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used)]
mod policy_svc_tests;
#[cfg(test)]
pub(crate) mod test_helpers;

pub use auth_svc::AuthServiceImpl;
pub use policy_svc::RoleEndpointServiceImpl;
pub use user_svc::UserServiceImpl;
