/// Refresh-token generation and the stored record shape.
///
/// Refresh tokens are opaque 64-character alphanumeric strings (~381 bits of
/// entropy). The client holds the plaintext; the server stores only the
/// SHA-256 hash, so a leaked token table cannot be replayed. Each record is
/// single-use: `used` starts false and flips to true exactly once when the
/// token is rotated.

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sha2::{Digest, Sha256};
use uuid::Uuid;

const REFRESH_TOKEN_LENGTH: usize = 64;

/// Generate a new cryptographically secure refresh token.
pub fn generate_refresh_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REFRESH_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Hash a refresh token for storage lookup. Plaintext never reaches the
/// store.
pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// A persisted refresh-token row, keyed by token hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub token_hash: String,
    pub user_id: Uuid,
    /// Unix seconds; the token is valid through this instant inclusive.
    pub expires_at: i64,
    pub used: bool,
}

impl RefreshTokenRecord {
    /// Build an unused record for a freshly generated plaintext token.
    pub fn new(token: &str, user_id: Uuid, now: i64, expiry_secs: i64) -> Self {
        Self {
            token_hash: hash_refresh_token(token),
            user_id,
            expires_at: now + expiry_secs,
            used: false,
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now > self.expires_at
    }
}
