//! Credential primitives for Warden.
//!
//! Provides JWT access/refresh token management and password hashing.

pub mod claims;
pub mod jwt;
pub mod password;

pub use claims::{AccessClaims, RefreshClaims};
pub use jwt::{JwtManager, TokenError};
pub use password::{PasswordError, hash_password, verify_decoy, verify_password};
