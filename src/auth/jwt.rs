/// Access-token signing and verification.
///
/// Tokens are compact HS256 JWTs. Verification distinguishes failure kinds
/// so callers can surface a different message for an undecodable token, a
/// bad signature, and an expired one. The time window is checked manually
/// with inclusive bounds (`iat <= now <= exp`); the library's own expiry
/// check is disabled because its default leeway would blur the boundary.

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::Claims;
use crate::configuration::SecuritySettings;
use crate::error::{AppError, AuthError};

/// A freshly signed token together with its structured payload, so callers
/// can read `exp`/`iat` for response bodies without re-parsing the string.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

/// Signs and verifies access tokens against a fixed secret and issuer.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    access_token_expiry_secs: i64,
}

impl TokenCodec {
    pub fn new(settings: &SecuritySettings) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.jwt_secret.as_bytes()),
            issuer: settings.jwt_issuer.clone(),
            access_token_expiry_secs: settings.access_token_expiry_secs,
        }
    }

    /// Issue a token for `user_id` with `iat` = current time.
    pub fn issue(&self, user_id: &str) -> Result<IssuedToken, AppError> {
        self.issue_at(user_id, Utc::now().timestamp())
    }

    /// Issue a token with an explicit clock, for deterministic expiry tests.
    pub fn issue_at(&self, user_id: &str, now: i64) -> Result<IssuedToken, AppError> {
        let claims = Claims::new(user_id, &self.issuer, now, self.access_token_expiry_secs);

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token signing failed: {}", e)))?;

        Ok(IssuedToken { token, claims })
    }

    /// Verify a token against the configured secret and issuer.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Verify with an explicit clock. A token is valid on the whole closed
    /// interval: `now == iat` and `now == exp` both pass.
    pub fn verify_at(&self, token: &str, now: i64) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    AppError::Auth(AuthError::TokenSignatureInvalid)
                }
                _ => AppError::Auth(AuthError::TokenMalformed),
            })?;

        if claims.iss != self.issuer {
            return Err(AppError::Auth(AuthError::TokenSignatureInvalid));
        }

        if now < claims.iat || now > claims.exp {
            return Err(AppError::Auth(AuthError::TokenExpired));
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const T0: i64 = 1_700_000_000;

    fn test_settings() -> SecuritySettings {
        SecuritySettings {
            jwt_secret: "test-secret-key-at-least-32-characters-long".to_string(),
            jwt_issuer: "authgate_test".to_string(),
            access_token_expiry_secs: 900,
            refresh_token_expiry_secs: 604800,
            password_bcrypt_cost: 4,
        }
    }

    fn auth_kind(err: AppError) -> AuthError {
        match err {
            AppError::Auth(e) => e,
            other => panic!("Expected auth error, got {:?}", other),
        }
    }

    #[test]
    fn issue_then_verify_round_trips_the_payload() {
        let codec = TokenCodec::new(&test_settings());
        let user_id = Uuid::new_v4().to_string();

        let issued = codec.issue_at(&user_id, T0).expect("Failed to issue token");
        let claims = codec
            .verify_at(&issued.token, T0)
            .expect("Failed to verify token");

        assert_eq!(claims, issued.claims);
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, "authgate_test");
        assert_eq!(claims.iat, T0);
        assert_eq!(claims.exp, T0 + 900);
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let codec = TokenCodec::new(&test_settings());
        let issued = codec.issue_at("user", T0).unwrap();

        // Valid on the whole closed window, including both endpoints.
        assert!(codec.verify_at(&issued.token, T0).is_ok());
        assert!(codec.verify_at(&issued.token, T0 + 900).is_ok());

        let err = codec.verify_at(&issued.token, T0 + 901).unwrap_err();
        assert_eq!(auth_kind(err), AuthError::TokenExpired);
    }

    #[test]
    fn token_used_before_issuance_is_rejected() {
        let codec = TokenCodec::new(&test_settings());
        let issued = codec.issue_at("user", T0).unwrap();

        let err = codec.verify_at(&issued.token, T0 - 1).unwrap_err();
        assert_eq!(auth_kind(err), AuthError::TokenExpired);
    }

    #[test]
    fn garbage_input_is_malformed() {
        let codec = TokenCodec::new(&test_settings());

        for garbage in ["", "not-a-token", "a.b", "a.b.c.d"] {
            let err = codec.verify_at(garbage, T0).unwrap_err();
            assert_eq!(auth_kind(err), AuthError::TokenMalformed, "input: {garbage:?}");
        }
    }

    #[test]
    fn tampered_signature_is_distinguished_from_malformed() {
        let codec = TokenCodec::new(&test_settings());
        let issued = codec.issue_at("user", T0).unwrap();

        // Flip the last signature character without breaking base64 shape.
        let mut tampered = issued.token.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == 'A' { 'B' } else { 'A' });

        let err = codec.verify_at(&tampered, T0).unwrap_err();
        assert_eq!(auth_kind(err), AuthError::TokenSignatureInvalid);
    }

    #[test]
    fn token_signed_with_other_secret_fails_signature_check() {
        let codec = TokenCodec::new(&test_settings());
        let mut other = test_settings();
        other.jwt_secret = "another-secret-key-also-32-characters!!".to_string();
        let other_codec = TokenCodec::new(&other);

        let issued = other_codec.issue_at("user", T0).unwrap();
        let err = codec.verify_at(&issued.token, T0).unwrap_err();
        assert_eq!(auth_kind(err), AuthError::TokenSignatureInvalid);
    }

    #[test]
    fn issuer_mismatch_fails_verification() {
        let codec = TokenCodec::new(&test_settings());
        let mut other = test_settings();
        other.jwt_issuer = "someone-else".to_string();
        let other_codec = TokenCodec::new(&other);

        let issued = other_codec.issue_at("user", T0).unwrap();
        let err = codec.verify_at(&issued.token, T0).unwrap_err();
        assert_eq!(auth_kind(err), AuthError::TokenSignatureInvalid);
    }
}
