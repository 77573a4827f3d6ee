use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::{info, instrument, warn};

use crate::shared::{AppError, AppState};
use crate::user::User;

/// The user resolved from a valid access token.
/// Handlers take it as `Extension(AuthenticatedUser(user))`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// Bearer authentication middleware - validates the access token and adds
/// `AuthenticatedUser` to the request.
/// Usage: .layer(middleware::from_fn_with_state(app_state.clone(), session::require_auth))
#[instrument(skip(state, req, next), fields(uri = %req.uri()))]
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| {
            warn!("Missing Authorization header in request");
            AppError::Unauthorized("missing or invalid authorization header".to_string())
        })?;

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        warn!("Invalid Authorization header format (expected Bearer token)");
        AppError::Unauthorized("missing or invalid authorization header".to_string())
    })?;

    let user = state.session_service.authenticate(token).await?;

    info!(user_id = %user.id, "Authentication successful");
    req.extensions_mut().insert(AuthenticatedUser(user));

    Ok(next.run(req).await)
}
