use std::net::TcpListener;
use std::sync::Arc;

use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use sqlx::PgPool;

use crate::auth::{PasswordHasher, SessionIssuer, SessionRotator, TokenCodec};
use crate::configuration::SecuritySettings;
use crate::error::AppError;
use crate::middleware::JwtMiddleware;
use crate::routes::{
    delete_current_user, health_check, login, read_current_user, refresh, register,
    reset_password,
};
use crate::store::{PgRefreshTokenStore, PgUserStore, RefreshTokenStore, UserStore};

/// Everything a worker needs, built once from configuration and the store
/// handles. Cloning is cheap; all members are reference counted.
#[derive(Clone)]
pub struct AppState {
    pub issuer: web::Data<SessionIssuer>,
    pub rotator: web::Data<SessionRotator>,
    pub hasher: web::Data<PasswordHasher>,
    pub users: web::Data<dyn UserStore>,
    pub codec: Arc<TokenCodec>,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserStore>,
        tokens: Arc<dyn RefreshTokenStore>,
        security: &SecuritySettings,
    ) -> Result<Self, AppError> {
        let codec = Arc::new(TokenCodec::new(security));
        let hasher = Arc::new(PasswordHasher::new(security.password_bcrypt_cost)?);

        let issuer = SessionIssuer::new(
            Arc::clone(&users),
            Arc::clone(&tokens),
            Arc::clone(&codec),
            Arc::clone(&hasher),
            security.refresh_token_expiry_secs,
        );
        let rotator = SessionRotator::new(
            tokens,
            Arc::clone(&codec),
            security.refresh_token_expiry_secs,
        );

        Ok(Self {
            issuer: web::Data::new(issuer),
            rotator: web::Data::new(rotator),
            hasher: web::Data::from(hasher),
            users: web::Data::from(users),
            codec,
        })
    }
}

/// Route table, shared by the server below and the actix test services in
/// the integration suite.
pub fn configure_app(cfg: &mut web::ServiceConfig, state: &AppState) {
    cfg.app_data(state.issuer.clone())
        .app_data(state.rotator.clone())
        .app_data(state.hasher.clone())
        .app_data(state.users.clone())
        .route("/health_check", web::get().to(health_check))
        .service(
            web::scope("/auth")
                .route("/register", web::post().to(register))
                .route("/access-token", web::post().to(login))
                .route("/refresh-token", web::post().to(refresh)),
        )
        .service(
            web::scope("/users")
                .wrap(JwtMiddleware::new(Arc::clone(&state.codec)))
                .route("/me", web::get().to(read_current_user))
                .route("/me", web::delete().to(delete_current_user))
                .route("/reset-password", web::post().to(reset_password)),
        );
}

pub fn run(
    listener: TcpListener,
    connection: PgPool,
    security: SecuritySettings,
) -> Result<Server, std::io::Error> {
    let users = Arc::new(PgUserStore::new(connection.clone())) as Arc<dyn UserStore>;
    let tokens = Arc::new(PgRefreshTokenStore::new(connection)) as Arc<dyn RefreshTokenStore>;

    let state = AppState::new(users, tokens, &security)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .configure(|cfg| configure_app(cfg, &state))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
