/// Persistence collaborators.
///
/// The session core only ever talks to these traits; the Postgres
/// implementations are the production path and the in-memory ones back the
/// test suite and local runs. Both uphold the same contract, in particular
/// the atomicity of `mark_used_and_insert_new`.

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::{PgRefreshTokenStore, PgUserStore};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::RefreshTokenRecord;
use crate::error::AppError;

/// A registered account. Owned by the user store; the session core reads it
/// for authentication and writes only the password hash.
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: String, password_hash: String) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            email,
            password_hash,
            created_at: Utc::now(),
        }
    }
}

/// Result of the atomic rotate step on a refresh-token row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationOutcome {
    /// The row was unused and has been marked used; the replacement row is
    /// committed.
    Rotated,
    /// The row was already used when the update ran; nothing was written.
    /// A concurrent rotation lost the race, or the token was replayed.
    AlreadyUsed,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError>;

    /// Insert a new user. Surfaces `EmailAlreadyUsed` on a uniqueness
    /// violation.
    async fn insert(&self, user: &User) -> Result<(), AppError>;

    async fn update_password_hash(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<(), AppError>;

    /// Delete the user. Refresh-token rows cascade.
    async fn delete(&self, user_id: Uuid) -> Result<(), AppError>;
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, AppError>;

    async fn insert(&self, record: &RefreshTokenRecord) -> Result<(), AppError>;

    /// Atomically mark the old row used and insert its replacement.
    ///
    /// The read-modify-write is serialized against concurrent calls on the
    /// same token: of two racing rotations exactly one observes the row
    /// unused and gets `Rotated`; the other gets `AlreadyUsed` with no row
    /// written.
    async fn mark_used_and_insert_new(
        &self,
        old_token_hash: &str,
        new_record: &RefreshTokenRecord,
    ) -> Result<RotationOutcome, AppError>;

    /// Revoke every refresh token the user holds.
    async fn delete_all_for_user(&self, user_id: Uuid) -> Result<(), AppError>;

    /// Number of refresh-token rows for the user, used or not.
    async fn count_for_user(&self, user_id: Uuid) -> Result<u64, AppError>;
}
