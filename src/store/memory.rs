/// In-memory store backing the test suite and local runs.
///
/// One struct implements both store traits so user deletion can cascade to
/// refresh tokens the way the Postgres foreign key does. The single mutex
/// makes `mark_used_and_insert_new` a serialized read-modify-write, which
/// is exactly the contract the session core relies on.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::RefreshTokenRecord;
use crate::error::{AppError, AuthError};
use crate::store::{RefreshTokenStore, RotationOutcome, User, UserStore};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    // keyed by token hash
    tokens: HashMap<String, RefreshTokenRecord>,
}

#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.get(&user_id).cloned())
    }

    async fn insert(&self, user: &User) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(AppError::Auth(AuthError::EmailAlreadyUsed));
        }
        inner.users.insert(user.user_id, user.clone());
        Ok(())
    }

    async fn update_password_hash(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.users.get_mut(&user_id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                Ok(())
            }
            None => Err(AppError::Auth(AuthError::UserRemoved)),
        }
    }

    async fn delete(&self, user_id: Uuid) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        inner.users.remove(&user_id);
        inner.tokens.retain(|_, record| record.user_id != user_id);
        Ok(())
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryStore {
    async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.tokens.get(token_hash).cloned())
    }

    async fn insert(&self, record: &RefreshTokenRecord) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        inner.tokens.insert(record.token_hash.clone(), record.clone());
        Ok(())
    }

    async fn mark_used_and_insert_new(
        &self,
        old_token_hash: &str,
        new_record: &RefreshTokenRecord,
    ) -> Result<RotationOutcome, AppError> {
        let mut inner = self.inner.lock().unwrap();

        match inner.tokens.get_mut(old_token_hash) {
            Some(record) if !record.used => {
                record.used = true;
            }
            // Missing or already used: a concurrent rotation or revocation
            // got here first. Nothing is written.
            _ => return Ok(RotationOutcome::AlreadyUsed),
        }

        inner
            .tokens
            .insert(new_record.token_hash.clone(), new_record.clone());
        Ok(RotationOutcome::Rotated)
    }

    async fn delete_all_for_user(&self, user_id: Uuid) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        inner.tokens.retain(|_, record| record.user_id != user_id);
        Ok(())
    }

    async fn count_for_user(&self, user_id: Uuid) -> Result<u64, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .tokens
            .values()
            .filter(|record| record.user_id == user_id)
            .count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::generate_refresh_token;

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = InMemoryStore::new();
        let user = User::new("alice@example.com".to_string(), "hash".to_string());
        UserStore::insert(&store, &user).await.unwrap();

        let twin = User::new("alice@example.com".to_string(), "other-hash".to_string());
        let err = UserStore::insert(&store, &twin).await.unwrap_err();
        assert!(matches!(err, AppError::Auth(AuthError::EmailAlreadyUsed)));
    }

    #[tokio::test]
    async fn rotation_on_a_fresh_row_succeeds_exactly_once() {
        let store = InMemoryStore::new();
        let user_id = Uuid::new_v4();

        let old = RefreshTokenRecord::new(&generate_refresh_token(), user_id, 1_000, 500);
        RefreshTokenStore::insert(&store, &old).await.unwrap();

        let replacement = RefreshTokenRecord::new(&generate_refresh_token(), user_id, 1_000, 500);
        let first = store
            .mark_used_and_insert_new(&old.token_hash, &replacement)
            .await
            .unwrap();
        assert_eq!(first, RotationOutcome::Rotated);

        // Second attempt on the same row loses.
        let another = RefreshTokenRecord::new(&generate_refresh_token(), user_id, 1_000, 500);
        let second = store
            .mark_used_and_insert_new(&old.token_hash, &another)
            .await
            .unwrap();
        assert_eq!(second, RotationOutcome::AlreadyUsed);

        // Only the winner's replacement row exists.
        assert_eq!(store.count_for_user(user_id).await.unwrap(), 2);
        let stored_old = store.find_by_token_hash(&old.token_hash).await.unwrap().unwrap();
        assert!(stored_old.used);
    }

    #[tokio::test]
    async fn deleting_a_user_cascades_to_refresh_tokens() {
        let store = InMemoryStore::new();
        let user = User::new("alice@example.com".to_string(), "hash".to_string());
        UserStore::insert(&store, &user).await.unwrap();

        let record = RefreshTokenRecord::new(&generate_refresh_token(), user.user_id, 1_000, 500);
        RefreshTokenStore::insert(&store, &record).await.unwrap();

        UserStore::delete(&store, user.user_id).await.unwrap();

        assert!(store.find_by_id(user.user_id).await.unwrap().is_none());
        assert_eq!(store.count_for_user(user.user_id).await.unwrap(), 0);
    }
}
