//! `stockpilot-auth` — authentication/authorization boundary (zero-trust).
//!
//! Claims validation and policy checks are pure; the only IO-adjacent piece
//! is HS256 token verification, kept behind the `JwtValidator` trait so the
//! HTTP layer never touches key material directly.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{authorize, AuthzError, CommandAuthorization, Principal};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use permissions::Permission;
pub use principal::{PrincipalId, TenantMembership};
pub use roles::Role;
