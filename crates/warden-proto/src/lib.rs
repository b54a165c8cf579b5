//! Warden Protocol Buffers
//!
//! Generated protobuf code for the Warden gRPC API.
//!
//! This crate contains:
//! - `AuthService` for login, token refresh, logout and delegated checks
//! - `UserService` for account lifecycle
//! - `RoleEndpointService` for the endpoint policy table

#![allow(clippy::derive_partial_eq_without_eq)]

pub mod methods;

/// Warden v1 API definitions.
///
/// All generated types and services are included here.
pub mod v1 {
    tonic::include_proto!("warden.v1");
}

// Re-export v1 as the default API version for convenience
pub use v1::*;
