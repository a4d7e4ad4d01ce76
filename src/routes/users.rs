/// User account endpoints: registration and the authenticated /users/me
/// surface. The JWT middleware has already verified the bearer token for
/// the protected handlers and injected `Claims`.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{Claims, PasswordHasher};
use crate::error::{AppError, AuthError};
use crate::store::{User, UserStore};
use crate::validators::is_valid_email;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub user_id: String,
    pub email: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id.to_string(),
            email: user.email,
        }
    }
}

async fn hash_on_worker(
    hasher: web::Data<PasswordHasher>,
    password: String,
) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(|e| AppError::Internal(format!("Hash task failed: {}", e)))?
}

/// POST /auth/register
///
/// Create a new account. Returns the created user, not a token pair; the
/// client logs in afterwards.
///
/// # Errors
/// - 400: invalid email or password length, or the email is taken
pub async fn register(
    form: web::Json<RegisterRequest>,
    users: web::Data<dyn UserStore>,
    hasher: web::Data<PasswordHasher>,
) -> Result<HttpResponse, AppError> {
    let email = is_valid_email(&form.email)?;
    let password_hash = hash_on_worker(hasher, form.password.clone()).await?;

    let user = User::new(email, password_hash);
    users.insert(&user).await?;

    tracing::info!(user_id = %user.user_id, "User registered");

    Ok(HttpResponse::Created().json(UserResponse::from(user)))
}

async fn current_user(
    claims: &Claims,
    users: &web::Data<dyn UserStore>,
) -> Result<User, AppError> {
    let user_id = claims.user_id()?;
    users
        .find_by_id(user_id)
        .await?
        .ok_or(AppError::Auth(AuthError::UserRemoved))
}

/// GET /users/me
///
/// # Errors
/// - 401: token subject no longer exists ("User removed")
pub async fn read_current_user(
    claims: web::ReqData<Claims>,
    users: web::Data<dyn UserStore>,
) -> Result<HttpResponse, AppError> {
    let user = current_user(&claims, &users).await?;

    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// POST /users/reset-password
///
/// Replace the current user's password hash.
pub async fn reset_password(
    form: web::Json<ResetPasswordRequest>,
    claims: web::ReqData<Claims>,
    users: web::Data<dyn UserStore>,
    hasher: web::Data<PasswordHasher>,
) -> Result<HttpResponse, AppError> {
    let user = current_user(&claims, &users).await?;
    let password_hash = hash_on_worker(hasher, form.password.clone()).await?;

    users.update_password_hash(user.user_id, &password_hash).await?;

    tracing::info!(user_id = %user.user_id, "Password updated");

    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// DELETE /users/me
///
/// Remove the account; refresh-token rows cascade in the store.
pub async fn delete_current_user(
    claims: web::ReqData<Claims>,
    users: web::Data<dyn UserStore>,
) -> Result<HttpResponse, AppError> {
    let user = current_user(&claims, &users).await?;
    users.delete(user.user_id).await?;

    tracing::info!(user_id = %user.user_id, "User deleted");

    Ok(HttpResponse::NoContent().finish())
}
