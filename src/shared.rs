use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::session::service::SessionService;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub session_service: Arc<SessionService>,
    pub cookie_secure: bool,
}

impl AppState {
    pub fn new(session_service: Arc<SessionService>, cookie_secure: bool) -> Self {
        Self {
            session_service,
            cookie_secure,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    /// Login failed. Deliberately does not say whether the account exists.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Token failed signature, expiry, kind or store checks.
    #[error("invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal server error")]
    Internal,
}

impl AppError {
    /// True for every outcome the caller must treat as "not signed in".
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            AppError::InvalidCredentials
                | AppError::InvalidOrExpiredToken
                | AppError::Unauthorized(_)
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "invalid credentials".to_string())
            }
            AppError::InvalidOrExpiredToken => (
                StatusCode::UNAUTHORIZED,
                "invalid or expired token".to_string(),
            ),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            // Storage and configuration details stay in the logs
            AppError::DatabaseError(_) | AppError::Configuration(_) | AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}
