/// Postgres-backed store implementations.
///
/// Schema lives under `migrations/`. The rotate step runs inside a single
/// transaction: the conditional UPDATE on `used` doubles as the row lock, so
/// of two concurrent rotations on the same token only one sees a row
/// affected and commits its replacement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::RefreshTokenRecord;
use crate::error::{AppError, AuthError, DatabaseError};
use crate::store::{RefreshTokenStore, RotationOutcome, User, UserStore};

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, (Uuid, String, String, DateTime<Utc>)>(
            "SELECT user_id, email, password_hash, created_at FROM auth_user WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(user_id, email, password_hash, created_at)| User {
            user_id,
            email,
            password_hash,
            created_at,
        }))
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, (Uuid, String, String, DateTime<Utc>)>(
            "SELECT user_id, email, password_hash, created_at FROM auth_user WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(user_id, email, password_hash, created_at)| User {
            user_id,
            email,
            password_hash,
            created_at,
        }))
    }

    async fn insert(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO auth_user (user_id, email, password_hash, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(user.user_id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let app: AppError = e.into();
            match app {
                AppError::Database(DatabaseError::UniqueConstraintViolation(_)) => {
                    AppError::Auth(AuthError::EmailAlreadyUsed)
                }
                other => other,
            }
        })?;

        Ok(())
    }

    async fn update_password_hash(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE auth_user SET password_hash = $1 WHERE user_id = $2")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Auth(AuthError::UserRemoved));
        }
        Ok(())
    }

    async fn delete(&self, user_id: Uuid) -> Result<(), AppError> {
        // auth_refresh_token rows go with the user via ON DELETE CASCADE.
        sqlx::query("DELETE FROM auth_user WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

pub struct PgRefreshTokenStore {
    pool: PgPool,
}

impl PgRefreshTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenStore {
    async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, AppError> {
        let row = sqlx::query_as::<_, (String, Uuid, i64, bool)>(
            r#"
            SELECT token_hash, user_id, expires_at, used
            FROM auth_refresh_token
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(token_hash, user_id, expires_at, used)| RefreshTokenRecord {
            token_hash,
            user_id,
            expires_at,
            used,
        }))
    }

    async fn insert(&self, record: &RefreshTokenRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO auth_refresh_token (token_hash, user_id, expires_at, used)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&record.token_hash)
        .bind(record.user_id)
        .bind(record.expires_at)
        .bind(record.used)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_used_and_insert_new(
        &self,
        old_token_hash: &str,
        new_record: &RefreshTokenRecord,
    ) -> Result<RotationOutcome, AppError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE auth_refresh_token
            SET used = true
            WHERE token_hash = $1 AND used = false
            "#,
        )
        .bind(old_token_hash)
        .execute(&mut tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(RotationOutcome::AlreadyUsed);
        }

        sqlx::query(
            r#"
            INSERT INTO auth_refresh_token (token_hash, user_id, expires_at, used)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&new_record.token_hash)
        .bind(new_record.user_id)
        .bind(new_record.expires_at)
        .bind(new_record.used)
        .execute(&mut tx)
        .await?;

        tx.commit().await?;
        Ok(RotationOutcome::Rotated)
    }

    async fn delete_all_for_user(&self, user_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM auth_refresh_token WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        tracing::info!(user_id = %user_id, "All refresh tokens revoked for user");
        Ok(())
    }

    async fn count_for_user(&self, user_id: Uuid) -> Result<u64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM auth_refresh_token WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count as u64)
    }
}
