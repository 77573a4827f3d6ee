use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, instrument, warn};

use crate::{
    config::{AppConfig, BootstrapUser},
    db,
    session::{
        self,
        repository::{
            InMemoryRefreshTokenRepository, PostgresRefreshTokenRepository,
            RefreshTokenRepository,
        },
        PasswordVerifier, SessionService, SessionTtl, TokenCodec,
    },
    shared::{AppError, AppState},
    user::{InMemoryUserRepository, PostgresUserRepository, UserRepository},
};

/// Builds the `/auth` routes with tracing and CORS applied
pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    let protected = Router::new()
        .route("/me", get(session::me))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session::require_auth,
        ));

    let auth = Router::new()
        .route("/login", post(session::login))
        .route("/refresh", post(session::refresh))
        .route("/logout", post(session::logout))
        .merge(protected);

    Router::new()
        .nest("/auth", auth)
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| {
            // `AllowOrigin::list` panics on a wildcard
            if origin == "*" {
                warn!("Ignoring wildcard CORS origin, credentials require explicit origins");
                return None;
            }
            match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "Ignoring unparseable CORS origin");
                    None
                }
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([ACCEPT, AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(300))
}

/// Wires repositories, codec and verifier from configuration.
///
/// Uses PostgreSQL when `DATABASE_URL` is set, in-memory storage otherwise.
#[instrument(skip(config))]
pub async fn build_state(config: &AppConfig) -> Result<AppState, AppError> {
    let (users, refresh_tokens): (
        Arc<dyn UserRepository + Send + Sync>,
        Arc<dyn RefreshTokenRepository + Send + Sync>,
    ) = match &config.database_url {
        Some(url) => {
            let pool = db::connect(url).await?;
            db::ensure_schema(&pool).await?;
            (
                Arc::new(PostgresUserRepository::new(pool.clone())),
                Arc::new(PostgresRefreshTokenRepository::new(pool)),
            )
        }
        None => {
            warn!("DATABASE_URL not set, sessions are kept in memory only");
            (
                Arc::new(InMemoryUserRepository::new()),
                Arc::new(InMemoryRefreshTokenRepository::new()),
            )
        }
    };

    let passwords = PasswordVerifier::new(config.bcrypt_cost)?;
    let codec = TokenCodec::new(&config.jwt_secret)?;

    if let Some(bootstrap) = &config.bootstrap_user {
        seed_user(users.as_ref(), &passwords, bootstrap).await?;
    }

    let service = SessionService::new(
        users,
        refresh_tokens,
        codec,
        passwords,
        SessionTtl {
            access: config.access_expiry,
            refresh: config.refresh_expiry,
        },
    );

    Ok(AppState::new(Arc::new(service), config.cookie_secure))
}

/// Creates the bootstrap user unless the email is already registered
#[instrument(skip_all, fields(email = %bootstrap.email))]
pub async fn seed_user(
    users: &(dyn UserRepository + Send + Sync),
    passwords: &PasswordVerifier,
    bootstrap: &BootstrapUser,
) -> Result<(), AppError> {
    if users.find_by_email(&bootstrap.email).await?.is_some() {
        info!("Bootstrap user already exists");
        return Ok(());
    }

    let hash = passwords.hash(&bootstrap.password).await?;
    let user = users.create(&bootstrap.email, &hash).await?;

    info!(user_id = %user.id, "Bootstrap user created");
    Ok(())
}
