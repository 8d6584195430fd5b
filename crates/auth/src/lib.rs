//! `labstock-auth` — pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage. The core
//! trusts the identity provider: it only needs a `UserId` to stamp log
//! entries and roles to gate registry-mutating operations.

pub mod authorize;
pub mod capability;
pub mod claims;
pub mod jwt;
pub mod roles;

pub use authorize::{authorize, capabilities_for_roles, AuthzError, Principal};
pub use capability::Capability;
pub use claims::{validate_claims, JwtClaims, TokenValidationError};
pub use jwt::{Hs256JwtValidator, JwtError, JwtValidator};
pub use roles::Role;
