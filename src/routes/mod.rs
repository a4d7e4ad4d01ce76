mod auth;
mod health_check;
mod users;

pub use auth::{login, refresh, LoginRequest, RefreshRequest};
pub use health_check::health_check;
pub use users::{
    delete_current_user, read_current_user, register, reset_password, RegisterRequest,
    ResetPasswordRequest, UserResponse,
};
