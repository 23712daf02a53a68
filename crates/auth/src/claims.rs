//! JWT claims model and deterministic claims validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockpilot_core::TenantId;

use crate::{PrincipalId, Role};

/// JWT claims model (transport-agnostic).
///
/// The minimal set of claims StockPilot expects once a token has been
/// decoded and its signature verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject / principal identifier.
    pub sub: PrincipalId,

    /// Tenant context for the token.
    pub tenant_id: TenantId,

    /// RBAC roles granted within the tenant context.
    pub roles: Vec<Role>,

    /// Issued-at timestamp.
    pub issued_at: DateTime<Utc>,

    /// Expiration timestamp.
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    /// Token could not be decoded or the signature did not verify.
    #[error("malformed token: {0}")]
    Malformed(String),
}

/// Deterministically validate JWT claims.
///
/// Note: this validates the *claims* only. Signature verification lives in
/// [`crate::jwt`] so the check stays pure and clock-injectable.
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn claims_for_window(issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> JwtClaims {
        JwtClaims {
            sub: PrincipalId::new(),
            tenant_id: TenantId::new(),
            roles: vec![Role::new("viewer")],
            issued_at,
            expires_at,
        }
    }

    #[test]
    fn claims_inside_the_window_validate() {
        let now = Utc::now();
        let claims = claims_for_window(now - Duration::minutes(1), now + Duration::minutes(10));
        assert!(validate_claims(&claims, now).is_ok());
    }

    #[test]
    fn expired_claims_are_rejected() {
        let now = Utc::now();
        let claims = claims_for_window(now - Duration::minutes(20), now - Duration::minutes(1));
        assert_eq!(validate_claims(&claims, now), Err(TokenValidationError::Expired));
    }

    #[test]
    fn future_issued_at_is_rejected() {
        let now = Utc::now();
        let claims = claims_for_window(now + Duration::minutes(5), now + Duration::minutes(15));
        assert_eq!(validate_claims(&claims, now), Err(TokenValidationError::NotYetValid));
    }

    #[test]
    fn inverted_window_is_rejected() {
        let now = Utc::now();
        let claims = claims_for_window(now, now - Duration::minutes(1));
        assert_eq!(
            validate_claims(&claims, now),
            Err(TokenValidationError::InvalidTimeWindow)
        );
    }
}
