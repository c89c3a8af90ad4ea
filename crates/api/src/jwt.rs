//! HS256 implementation of the identity boundary.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};

use renolens_auth::{AuthError, BearerClaims, IdentityVerifier, validate_claims};

/// Verifies HMAC-SHA256 signed bearer tokens carrying [`BearerClaims`].
///
/// Time-window validation is done by [`validate_claims`] against the caller's
/// clock rather than jsonwebtoken's built-in `exp` handling, so claims keep
/// their RFC 3339 timestamps and verification stays deterministic in tests.
pub struct Hs256Verifier {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256Verifier {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }
}

impl IdentityVerifier for Hs256Verifier {
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<BearerClaims, AuthError> {
        let decoded = jsonwebtoken::decode::<BearerClaims>(token, &self.key, &self.validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        validate_claims(&decoded.claims, now)?;
        Ok(decoded.claims)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use jsonwebtoken::{EncodingKey, Header};

    use renolens_auth::Role;
    use renolens_core::AccountId;

    use super::*;

    fn mint(secret: &str, claims: &BearerClaims) -> String {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn claims(now: DateTime<Utc>) -> BearerClaims {
        BearerClaims {
            sub: AccountId::new(),
            roles: vec![Role::new("operator")],
            issued_at: now - Duration::minutes(1),
            expires_at: now + Duration::minutes(10),
        }
    }

    #[test]
    fn round_trip_preserves_claims() {
        let now = Utc::now();
        let claims = claims(now);
        let token = mint("secret", &claims);

        let verifier = Hs256Verifier::new(b"secret");
        assert_eq!(verifier.verify(&token, now).unwrap(), claims);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let now = Utc::now();
        let token = mint("secret", &claims(now));

        let verifier = Hs256Verifier::new(b"other-secret");
        assert!(matches!(
            verifier.verify(&token, now),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = Utc::now();
        let token = mint("secret", &claims(now));

        let verifier = Hs256Verifier::new(b"secret");
        assert!(matches!(
            verifier.verify(&token, now + Duration::hours(1)),
            Err(AuthError::InvalidClaims(_))
        ));
    }

    #[test]
    fn garbage_token_is_rejected() {
        let verifier = Hs256Verifier::new(b"secret");
        assert!(matches!(
            verifier.verify("not-a-jwt", Utc::now()),
            Err(AuthError::InvalidToken(_))
        ));
    }
}
