use axum::{
    extract::{rejection::JsonRejection, State},
    http::{
        header::{COOKIE, SET_COOKIE},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use super::{
    middleware::AuthenticatedUser,
    types::{LoginRequest, MeResponse, TokenPair, TokenResponse},
};
use crate::shared::{AppError, AppState};

pub const REFRESH_COOKIE_NAME: &str = "refresh_token";
const REFRESH_COOKIE_PATH: &str = "/auth";

/// POST /auth/login
///
/// Returns the access token in the body and the refresh token as an HttpOnly cookie.
#[instrument(name = "login", skip_all)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload.map_err(|e| {
        warn!(error = %e, "Rejected login body");
        AppError::BadRequest("invalid request body".to_string())
    })?;

    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(AppError::BadRequest(
            "email and password are required".to_string(),
        ));
    }

    let (user, pair) = state
        .session_service
        .login(&request.email, &request.password)
        .await?;

    info!(user_id = %user.id, "Issued session");
    Ok(token_response(&pair, state.cookie_secure))
}

/// POST /auth/refresh
///
/// Rotates the refresh cookie. An unauthorized outcome also clears it; a
/// storage failure leaves it in place so the client can retry.
#[instrument(name = "refresh", skip_all)]
pub async fn refresh(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(token) = read_refresh_cookie(&headers) else {
        return AppError::Unauthorized("missing refresh token".to_string()).into_response();
    };

    match state.session_service.refresh(&token).await {
        Ok(pair) => token_response(&pair, state.cookie_secure),
        Err(e) if e.is_unauthorized() => (
            [(SET_COOKIE, clear_refresh_cookie(state.cookie_secure))],
            e,
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /auth/logout
#[instrument(name = "logout", skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let token = read_refresh_cookie(&headers)
        .ok_or_else(|| AppError::Unauthorized("missing refresh token".to_string()))?;

    state.session_service.logout(&token).await?;

    Ok((
        StatusCode::NO_CONTENT,
        [(SET_COOKIE, clear_refresh_cookie(state.cookie_secure))],
    )
        .into_response())
}

/// GET /auth/me
#[instrument(name = "me", skip_all)]
pub async fn me(
    Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>,
) -> Json<MeResponse> {
    Json(MeResponse {
        id: user.id,
        email: user.email,
        created_at: user.created_at,
    })
}

fn token_response(pair: &TokenPair, secure: bool) -> Response {
    (
        [(
            SET_COOKIE,
            refresh_cookie(&pair.refresh_token, pair.refresh_expires_at, secure),
        )],
        Json(TokenResponse {
            access_token: pair.access_token.clone(),
        }),
    )
        .into_response()
}

fn refresh_cookie(token: &str, expires_at: DateTime<Utc>, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path={}; Expires={}; HttpOnly; SameSite=Strict",
        REFRESH_COOKIE_NAME,
        token,
        REFRESH_COOKIE_PATH,
        expires_at.format("%a, %d %b %Y %H:%M:%S GMT"),
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn clear_refresh_cookie(secure: bool) -> String {
    let mut cookie = format!(
        "{}=; Path={}; Max-Age=0; HttpOnly; SameSite=Strict",
        REFRESH_COOKIE_NAME, REFRESH_COOKIE_PATH,
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn read_refresh_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == REFRESH_COOKIE_NAME && !value.is_empty())
        .map(|(_, value)| value.to_string())
}
