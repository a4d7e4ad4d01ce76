/// Password hashing and verification.
///
/// Bcrypt with a configurable cost factor (low for tests, high in
/// production; the algorithm identifier in the hash stays the same). A
/// dummy hash of a fixed plaintext is computed once at construction and is
/// verified against whenever a login names an unknown email, so the
/// unknown-email and wrong-password paths take the same route through
/// bcrypt and response timing does not reveal whether an account exists.

use bcrypt::{hash, verify};

use crate::error::AppError;
use crate::validators::ValidationError;

const MIN_PASSWORD_LENGTH: usize = 8;
// Bcrypt silently truncates beyond 72 bytes; reject instead.
const MAX_PASSWORD_LENGTH: usize = 72;

const DUMMY_PLAINTEXT: &str = "";

pub struct PasswordHasher {
    cost: u32,
    dummy_hash: String,
}

impl PasswordHasher {
    /// Build a hasher with the given bcrypt cost and precompute the dummy
    /// hash used for timing equalization.
    pub fn new(cost: u32) -> Result<Self, AppError> {
        let dummy_hash = hash(DUMMY_PLAINTEXT, cost)
            .map_err(|e| AppError::Internal(format!("Dummy hash precomputation failed: {}", e)))?;
        Ok(Self { cost, dummy_hash })
    }

    /// Hash a password with a fresh random salt.
    ///
    /// # Errors
    /// Returns a validation error when the password is outside the accepted
    /// length bounds, or an internal error if bcrypt fails.
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        validate_password_length(password)?;

        hash(password, self.cost)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    }

    /// Verify a password against a stored hash.
    ///
    /// Never errors: malformed or truncated hash input verifies as `false`,
    /// the same as a wrong password.
    pub fn verify(&self, password: &str, hashed: &str) -> bool {
        verify(password, hashed).unwrap_or(false)
    }

    /// Run a verification against the precomputed dummy hash, discarding
    /// the outcome. Called on the unknown-email login path so it costs the
    /// same as a real verification.
    pub fn verify_dummy(&self, password: &str) {
        let _ = self.verify(password, &self.dummy_hash);
    }
}

fn validate_password_length(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(ValidationError::TooShort(
            "password",
            MIN_PASSWORD_LENGTH,
        )));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AppError::Validation(ValidationError::TooLong(
            "password",
            MAX_PASSWORD_LENGTH,
        )));
    }
    Ok(())
}
