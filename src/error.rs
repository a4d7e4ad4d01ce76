/// Error handling for the authentication service.
///
/// Auth failures are expected outcomes and travel as typed variants with a
/// fixed, stable message per kind; those messages are part of the external
/// contract and never carry internal detail. Store/connectivity failures are
/// kept in a separate `DatabaseError` class so infrastructure trouble is
/// never presented as an authentication verdict.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

use crate::validators::ValidationError;

/// Authentication and session-lifecycle failures.
///
/// One variant per externally observable failure kind. `InvalidCredentials`
/// deliberately covers both "unknown email" and "wrong password".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    InvalidCredentials,
    TokenMalformed,
    TokenSignatureInvalid,
    TokenExpired,
    RefreshNotFound,
    RefreshExpired,
    /// A refresh token was presented a second time after being consumed.
    /// Handling this variant revokes every session the user holds.
    RefreshReused,
    EmailAlreadyUsed,
    UserRemoved,
}

impl AuthError {
    /// Stable user-facing message for this failure kind.
    pub fn message(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "Incorrect email or password",
            AuthError::TokenMalformed => "Token malformed",
            AuthError::TokenSignatureInvalid => "Token signature invalid",
            AuthError::TokenExpired => "Token expired",
            AuthError::RefreshNotFound => "Refresh token not found",
            AuthError::RefreshExpired => "Refresh token expired",
            AuthError::RefreshReused => "Access denied",
            AuthError::EmailAlreadyUsed => "Cannot use this email address",
            AuthError::UserRemoved => "User removed",
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl StdError for AuthError {}

/// Database operation errors. These are infrastructure failures, not
/// authentication verdicts.
#[derive(Debug)]
pub enum DatabaseError {
    UniqueConstraintViolation(String),
    NotFound(String),
    QueryExecution(String),
    ConnectionPool(String),
    UnexpectedError(String),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::UniqueConstraintViolation(msg) => {
                write!(f, "Duplicate entry: {}", msg)
            }
            DatabaseError::NotFound(msg) => write!(f, "Not found: {}", msg),
            DatabaseError::QueryExecution(msg) => write!(f, "Query error: {}", msg),
            DatabaseError::ConnectionPool(msg) => write!(f, "Database connection error: {}", msg),
            DatabaseError::UnexpectedError(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl StdError for DatabaseError {}

/// Central error type that all application errors map to.
#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    Database(DatabaseError),
    Auth(AuthError),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Database(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        AppError::Database(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        let error_msg = err.to_string();

        if error_msg.contains("duplicate key") || error_msg.contains("unique constraint") {
            AppError::Database(DatabaseError::UniqueConstraintViolation(
                "row already exists".to_string(),
            ))
        } else if error_msg.contains("no rows") {
            AppError::Database(DatabaseError::NotFound("Record not found".to_string()))
        } else if error_msg.contains("pool") || error_msg.contains("connect") {
            AppError::Database(DatabaseError::ConnectionPool(error_msg))
        } else {
            AppError::Database(DatabaseError::UnexpectedError(error_msg))
        }
    }
}

/// Error response body returned by every failing endpoint.
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub error_id: String,
    pub message: String,
    pub code: String,
    pub status: u16,
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Database(DatabaseError::UniqueConstraintViolation(_)) => "DUPLICATE_ENTRY",
            AppError::Database(DatabaseError::NotFound(_)) => "NOT_FOUND",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Auth(AuthError::InvalidCredentials) => "INVALID_CREDENTIALS",
            AppError::Auth(AuthError::TokenMalformed)
            | AppError::Auth(AuthError::TokenSignatureInvalid)
            | AppError::Auth(AuthError::TokenExpired) => "TOKEN_INVALID",
            AppError::Auth(AuthError::RefreshNotFound) => "REFRESH_NOT_FOUND",
            AppError::Auth(AuthError::RefreshExpired) => "REFRESH_EXPIRED",
            AppError::Auth(AuthError::RefreshReused) => "ACCESS_DENIED",
            AppError::Auth(AuthError::EmailAlreadyUsed) => "EMAIL_ALREADY_USED",
            AppError::Auth(AuthError::UserRemoved) => "USER_REMOVED",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// External message. Auth variants use their fixed contract message;
    /// infrastructure variants are collapsed to a generic line so raw driver
    /// errors never leak to clients.
    fn public_message(&self) -> String {
        match self {
            AppError::Validation(e) => e.to_string(),
            AppError::Database(DatabaseError::UniqueConstraintViolation(_)) => {
                "Duplicate entry".to_string()
            }
            AppError::Database(DatabaseError::NotFound(_)) => "Not found".to_string(),
            AppError::Database(_) => "Database error occurred".to_string(),
            AppError::Auth(e) => e.message().to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }

    fn log(&self, error_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(error_id, error = %e, "Validation error");
            }
            AppError::Auth(AuthError::RefreshReused) => {
                tracing::warn!(error_id, "Refresh token reuse detected");
            }
            AppError::Auth(e) => {
                tracing::warn!(error_id, error = %e, "Authentication error");
            }
            AppError::Database(e) => {
                tracing::error!(error_id, error = %e, "Database error");
            }
            AppError::Internal(msg) => {
                tracing::error!(error_id, error = %msg, "Internal error");
            }
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Database(e) => match e {
                DatabaseError::UniqueConstraintViolation(_) => StatusCode::CONFLICT,
                DatabaseError::NotFound(_) => StatusCode::NOT_FOUND,
                DatabaseError::ConnectionPool(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Auth(e) => match e {
                AuthError::InvalidCredentials => StatusCode::BAD_REQUEST,
                AuthError::TokenMalformed
                | AuthError::TokenSignatureInvalid
                | AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
                AuthError::RefreshNotFound => StatusCode::NOT_FOUND,
                AuthError::RefreshExpired => StatusCode::BAD_REQUEST,
                AuthError::RefreshReused => StatusCode::FORBIDDEN,
                AuthError::EmailAlreadyUsed => StatusCode::BAD_REQUEST,
                AuthError::UserRemoved => StatusCode::UNAUTHORIZED,
            },
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error_id = uuid::Uuid::new_v4().to_string();
        self.log(&error_id);

        let status = self.status_code();
        HttpResponse::build(status).json(ErrorResponse {
            error_id,
            message: self.public_message(),
            code: self.code().to_string(),
            status: status.as_u16(),
        })
    }
}
