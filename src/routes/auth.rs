/// Session endpoints: login and refresh-token rotation.
///
/// Thin transport layer; all decisions happen in `SessionIssuer` and
/// `SessionRotator`, and errors map to status codes through `AppError`.

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::auth::{SessionIssuer, SessionRotator};
use crate::error::AppError;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// POST /auth/access-token
///
/// Authenticate with email and password; returns a token pair.
///
/// The submitted email is passed through as-is: a malformed address can
/// never match a stored account, so it falls out as the same incorrect
/// email/password response as any other unknown user. Format checks here
/// would make unknown usernames distinguishable from wrong passwords.
///
/// # Errors
/// - 400: incorrect email or password (one message for both causes)
/// - 500/503: infrastructure failure
pub async fn login(
    form: web::Json<LoginRequest>,
    issuer: web::Data<SessionIssuer>,
) -> Result<HttpResponse, AppError> {
    let pair = issuer.login(&form.email, &form.password).await?;

    Ok(HttpResponse::Ok().json(pair))
}

/// POST /auth/refresh-token
///
/// Exchange a single-use refresh token for a new token pair.
///
/// # Errors
/// - 404: no record for the presented token
/// - 400: record exists but is past expiry
/// - 403: token was already exchanged once; every session the user holds
///   has been revoked as a side effect
pub async fn refresh(
    form: web::Json<RefreshRequest>,
    rotator: web::Data<SessionRotator>,
) -> Result<HttpResponse, AppError> {
    let pair = rotator.rotate(&form.refresh_token).await?;

    Ok(HttpResponse::Ok().json(pair))
}
