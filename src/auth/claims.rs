/// Access-token payload (RFC 7519 registered claims subset).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AuthError};

/// Payload carried inside a signed access token.
///
/// Exists only inside the serialized token; never persisted server-side.
/// Invariant: `exp > iat` for any payload built through `new`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Issuer
    pub iss: String,
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Expiration time (Unix timestamp, inclusive)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

impl Claims {
    /// Build claims for `user_id` issued at `now` with the given lifetime.
    pub fn new(user_id: &str, issuer: &str, now: i64, expiry_secs: i64) -> Self {
        Self {
            iss: issuer.to_string(),
            sub: user_id.to_string(),
            exp: now + expiry_secs,
            iat: now,
        }
    }

    /// Extract the subject as a UUID.
    ///
    /// # Errors
    /// Returns `TokenMalformed` if the subject is not a valid UUID.
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::Auth(AuthError::TokenMalformed))
    }
}
