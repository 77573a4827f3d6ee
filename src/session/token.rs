use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::types::{Claims, TokenKind};
use crate::shared::AppError;

/// Why a token was rejected. Callers treat both as unauthorized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("invalid token")]
    Invalid,

    #[error("token expired")]
    Expired,
}

/// Stateless HS256 signer and verifier for bearer tokens
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    /// Builds a codec around the signing secret. An empty secret is a configuration error.
    pub fn new(secret: &str) -> Result<Self, AppError> {
        if secret.is_empty() {
            return Err(AppError::Configuration(
                "token signing secret is empty".to_string(),
            ));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Creates a signed token for `subject` that expires after `ttl`
    #[instrument(skip(self))]
    pub fn issue(
        &self,
        subject: &str,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now.checked_add_signed(ttl).ok_or_else(|| {
            debug!("Token expiry overflowed");
            AppError::Internal
        })?;
        let exp = expires_at.timestamp().max(0) as usize;

        let claims = Claims {
            sub: subject.to_string(),
            kind,
            jti: Uuid::new_v4().to_string(),
            exp,
            iat: now.timestamp() as usize,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            debug!(error = %e, "Failed to encode JWT token");
            AppError::Internal
        })
    }

    /// Checks signature, algorithm and expiry, and returns the claims only if all pass
    #[instrument(skip_all)]
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| {
                debug!(
                    kind = ?data.claims.kind,
                    exp = data.claims.exp,
                    "JWT token decoded successfully"
                );
                data.claims
            })
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => {
                    debug!("JWT token has expired");
                    TokenError::Expired
                }
                _ => {
                    debug!(error = %e, "Failed to decode JWT token");
                    TokenError::Invalid
                }
            })
    }
}

/// Deterministic SHA-256 fingerprint of a raw token, hex-encoded.
///
/// This is the only form of a refresh token that reaches storage.
pub fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}
