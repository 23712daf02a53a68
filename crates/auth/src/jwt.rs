//! HS256 token verification behind an object-safe trait.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};

use crate::claims::{validate_claims, JwtClaims, TokenValidationError};

/// Verifies a bearer token and returns its claims.
///
/// Object-safe so the HTTP layer can hold `Arc<dyn JwtValidator>` and tests
/// can swap in their own implementation. `now` is injected to keep the time
/// checks deterministic.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError>;
}

/// HS256 validator over a shared secret.
pub struct Hs256JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: Vec<u8>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Claims carry RFC3339 timestamps rather than numeric exp/iat, so the
        // library's registered-claim checks are disabled and the time window
        // is enforced by `validate_claims` instead.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            key: DecodingKey::from_secret(&secret),
            validation,
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.key, &self.validation)
            .map_err(|e| TokenValidationError::Malformed(e.to_string()))?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use jsonwebtoken::{EncodingKey, Header};
    use stockpilot_core::TenantId;

    use crate::{PrincipalId, Role};

    fn mint(secret: &str, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> String {
        let claims = JwtClaims {
            sub: PrincipalId::new(),
            tenant_id: TenantId::new(),
            roles: vec![Role::new("admin")],
            issued_at,
            expires_at,
        };
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_round_trips() {
        let now = Utc::now();
        let token = mint("s3cret", now - Duration::minutes(1), now + Duration::minutes(5));

        let validator = Hs256JwtValidator::new(b"s3cret".to_vec());
        let claims = validator.validate(&token, now).unwrap();
        assert!(claims.roles.iter().any(|r| r.as_str() == "admin"));
    }

    #[test]
    fn wrong_secret_fails_verification() {
        let now = Utc::now();
        let token = mint("s3cret", now - Duration::minutes(1), now + Duration::minutes(5));

        let validator = Hs256JwtValidator::new(b"other".to_vec());
        match validator.validate(&token, now) {
            Err(TokenValidationError::Malformed(_)) => {}
            other => panic!("Expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn expired_token_is_rejected_after_decode() {
        let now = Utc::now();
        let token = mint("s3cret", now - Duration::minutes(10), now - Duration::minutes(1));

        let validator = Hs256JwtValidator::new(b"s3cret".to_vec());
        match validator.validate(&token, now) {
            Err(TokenValidationError::Expired) => {}
            other => panic!("Expected Expired, got {other:?}"),
        }
    }
}
