/// Session lifecycle orchestration.
///
/// `SessionIssuer` turns verified credentials into a token pair;
/// `SessionRotator` exchanges a single-use refresh token for a new pair and
/// treats reuse of a consumed token as theft, revoking every session the
/// user holds. Both talk to the stores through trait objects and own no
/// state beyond configuration.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::jwt::TokenCodec;
use crate::auth::password::PasswordHasher;
use crate::auth::refresh_token::{
    generate_refresh_token, hash_refresh_token, RefreshTokenRecord,
};
use crate::error::{AppError, AuthError};
use crate::store::{RefreshTokenStore, RotationOutcome, UserStore};

/// The credential bundle returned by a successful login or rotation.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub token_type: String,
    pub access_token: String,
    pub issued_at: i64,
    pub expires_at: i64,
    pub refresh_token: String,
    pub refresh_token_expires_at: i64,
}

pub struct SessionIssuer {
    users: Arc<dyn UserStore>,
    tokens: Arc<dyn RefreshTokenStore>,
    codec: Arc<TokenCodec>,
    hasher: Arc<PasswordHasher>,
    refresh_token_expiry_secs: i64,
}

impl SessionIssuer {
    pub fn new(
        users: Arc<dyn UserStore>,
        tokens: Arc<dyn RefreshTokenStore>,
        codec: Arc<TokenCodec>,
        hasher: Arc<PasswordHasher>,
        refresh_token_expiry_secs: i64,
    ) -> Self {
        Self {
            users,
            tokens,
            codec,
            hasher,
            refresh_token_expiry_secs,
        }
    }

    /// Authenticate by email and password and mint a token pair.
    ///
    /// Unknown email and wrong password both come back as
    /// `InvalidCredentials` with the same message, and the unknown-email
    /// path burns a bcrypt verification against the dummy hash so the two
    /// cannot be told apart by response time either.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, AppError> {
        let user = self.users.find_by_email(email).await?;

        let user = match user {
            Some(user) => user,
            None => {
                let hasher = Arc::clone(&self.hasher);
                let password = password.to_string();
                tokio::task::spawn_blocking(move || hasher.verify_dummy(&password))
                    .await
                    .map_err(|e| AppError::Internal(format!("Hash task failed: {}", e)))?;
                return Err(AppError::Auth(AuthError::InvalidCredentials));
            }
        };

        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();
        let stored_hash = user.password_hash.clone();
        let password_valid =
            tokio::task::spawn_blocking(move || hasher.verify(&password, &stored_hash))
                .await
                .map_err(|e| AppError::Internal(format!("Hash task failed: {}", e)))?;

        if !password_valid {
            tracing::warn!(user_id = %user.user_id, "Invalid credentials attempt");
            return Err(AppError::Auth(AuthError::InvalidCredentials));
        }

        let now = Utc::now().timestamp();
        let issued = self.codec.issue_at(&user.user_id.to_string(), now)?;

        let refresh_plaintext = generate_refresh_token();
        let record = RefreshTokenRecord::new(
            &refresh_plaintext,
            user.user_id,
            now,
            self.refresh_token_expiry_secs,
        );
        // Single store call: the access token leaves this function only if
        // the refresh record committed.
        self.tokens.insert(&record).await?;

        tracing::info!(user_id = %user.user_id, "User logged in");

        Ok(TokenPair {
            token_type: "Bearer".to_string(),
            access_token: issued.token,
            issued_at: issued.claims.iat,
            expires_at: issued.claims.exp,
            refresh_token: refresh_plaintext,
            refresh_token_expires_at: record.expires_at,
        })
    }
}

pub struct SessionRotator {
    tokens: Arc<dyn RefreshTokenStore>,
    codec: Arc<TokenCodec>,
    refresh_token_expiry_secs: i64,
}

impl SessionRotator {
    pub fn new(
        tokens: Arc<dyn RefreshTokenStore>,
        codec: Arc<TokenCodec>,
        refresh_token_expiry_secs: i64,
    ) -> Self {
        Self {
            tokens,
            codec,
            refresh_token_expiry_secs,
        }
    }

    /// Exchange a refresh token for a new token pair.
    ///
    /// State machine over the stored record: absent is not-found, a used
    /// record is replay regardless of expiry, an expired unused record is
    /// expired, and only a live unused record rotates. The mark-and-insert
    /// step is atomic in the store, so of two concurrent rotations on the
    /// same token exactly one succeeds and the loser lands on the replay
    /// path.
    pub async fn rotate(&self, presented_token: &str) -> Result<TokenPair, AppError> {
        let presented_hash = hash_refresh_token(presented_token);

        let record = self
            .tokens
            .find_by_token_hash(&presented_hash)
            .await?
            .ok_or(AppError::Auth(AuthError::RefreshNotFound))?;

        if record.used {
            return self.revoke_for_reuse(record.user_id).await;
        }

        let now = Utc::now().timestamp();
        if record.is_expired(now) {
            return Err(AppError::Auth(AuthError::RefreshExpired));
        }

        let refresh_plaintext = generate_refresh_token();
        let new_record = RefreshTokenRecord::new(
            &refresh_plaintext,
            record.user_id,
            now,
            self.refresh_token_expiry_secs,
        );

        match self
            .tokens
            .mark_used_and_insert_new(&presented_hash, &new_record)
            .await?
        {
            RotationOutcome::AlreadyUsed => self.revoke_for_reuse(record.user_id).await,
            RotationOutcome::Rotated => {
                let issued = self.codec.issue_at(&record.user_id.to_string(), now)?;

                tracing::info!(user_id = %record.user_id, "Refresh token rotated");

                Ok(TokenPair {
                    token_type: "Bearer".to_string(),
                    access_token: issued.token,
                    issued_at: issued.claims.iat,
                    expires_at: issued.claims.exp,
                    refresh_token: refresh_plaintext,
                    refresh_token_expires_at: new_record.expires_at,
                })
            }
        }
    }

    /// Security response to a replayed token: every refresh token the user
    /// holds is deleted, forcing a full re-login on all devices.
    async fn revoke_for_reuse(&self, user_id: Uuid) -> Result<TokenPair, AppError> {
        tracing::warn!(user_id = %user_id, "Refresh token replay detected, revoking all sessions");
        self.tokens.delete_all_for_user(user_id).await?;
        Err(AppError::Auth(AuthError::RefreshReused))
    }
}
