use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{
    models::RefreshTokenModel,
    password::PasswordVerifier,
    repository::RefreshTokenRepository,
    token::{hash_token, TokenCodec},
    types::{Claims, TokenKind, TokenPair},
};
use crate::{
    shared::AppError,
    user::{User, UserRepository},
};

/// Lifetimes of the two token kinds
#[derive(Debug, Clone, Copy)]
pub struct SessionTtl {
    pub access: Duration,
    pub refresh: Duration,
}

impl Default for SessionTtl {
    fn default() -> Self {
        Self {
            access: Duration::minutes(15),
            refresh: Duration::hours(168),
        }
    }
}

/// Login, refresh with rotation, logout, and access-token resolution
pub struct SessionService {
    users: Arc<dyn UserRepository + Send + Sync>,
    refresh_tokens: Arc<dyn RefreshTokenRepository + Send + Sync>,
    codec: TokenCodec,
    passwords: PasswordVerifier,
    ttl: SessionTtl,
}

impl SessionService {
    pub fn new(
        users: Arc<dyn UserRepository + Send + Sync>,
        refresh_tokens: Arc<dyn RefreshTokenRepository + Send + Sync>,
        codec: TokenCodec,
        passwords: PasswordVerifier,
        ttl: SessionTtl,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            codec,
            passwords,
            ttl,
        }
    }

    /// Verifies credentials and issues a new token pair.
    ///
    /// Unknown email and wrong password both yield `InvalidCredentials`, after
    /// a password verification of the same cost.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, TokenPair), AppError> {
        let user = match self.users.find_by_email(email).await? {
            Some(user) => user,
            None => {
                self.passwords.verify_dummy(password).await;
                warn!("Login failed");
                return Err(AppError::InvalidCredentials);
            }
        };

        if !self.passwords.verify(&user.password_hash, password).await? {
            warn!("Login failed");
            return Err(AppError::InvalidCredentials);
        }

        let (pair, record) = self.mint_pair(&user.id)?;
        self.refresh_tokens.put(&record).await?;

        info!(user_id = %user.id, "Login succeeded");
        Ok((user, pair))
    }

    /// Exchanges a live refresh token for a new pair. The presented token is
    /// consumed and can never be used again.
    #[instrument(skip_all)]
    pub async fn refresh(&self, raw_refresh_token: &str) -> Result<TokenPair, AppError> {
        let claims = self.validate_kind(raw_refresh_token, TokenKind::Refresh)?;
        let token_hash = hash_token(raw_refresh_token);

        match self.refresh_tokens.lookup(&token_hash).await? {
            Some(record) if !record.is_expired() && record.user_id == claims.sub => {}
            Some(_) => {
                warn!(user_id = %claims.sub, "Refresh token record expired or mismatched");
                return Err(AppError::InvalidOrExpiredToken);
            }
            None => {
                warn!(user_id = %claims.sub, "Refresh token not found, already used or revoked");
                return Err(AppError::InvalidOrExpiredToken);
            }
        }

        let (pair, record) = self.mint_pair(&claims.sub)?;
        if !self.refresh_tokens.rotate(&token_hash, &record).await? {
            warn!(user_id = %claims.sub, "Refresh token lost rotation race");
            return Err(AppError::InvalidOrExpiredToken);
        }

        info!(user_id = %claims.sub, "Refresh token rotated");
        Ok(pair)
    }

    /// Revokes a refresh token. Succeeds whether or not a record existed.
    ///
    /// The paired access token stays valid until it expires on its own.
    #[instrument(skip_all)]
    pub async fn logout(&self, raw_refresh_token: &str) -> Result<(), AppError> {
        let deleted = self
            .refresh_tokens
            .delete(&hash_token(raw_refresh_token))
            .await?;

        info!(deleted, "Logout completed");
        Ok(())
    }

    /// Resolves an access token to the user it was issued for
    #[instrument(skip_all)]
    pub async fn authenticate(&self, access_token: &str) -> Result<User, AppError> {
        let claims = self.validate_kind(access_token, TokenKind::Access)?;

        match self.users.find_by_id(&claims.sub).await? {
            Some(user) => Ok(user),
            None => {
                warn!(user_id = %claims.sub, "Access token subject no longer exists");
                Err(AppError::InvalidOrExpiredToken)
            }
        }
    }

    fn validate_kind(&self, token: &str, expected: TokenKind) -> Result<Claims, AppError> {
        let claims = self.codec.validate(token).map_err(|e| {
            warn!(reason = %e, "Token rejected");
            AppError::InvalidOrExpiredToken
        })?;

        if claims.kind != expected {
            warn!(expected = ?expected, actual = ?claims.kind, "Token kind mismatch");
            return Err(AppError::InvalidOrExpiredToken);
        }

        Ok(claims)
    }

    fn mint_pair(&self, user_id: &str) -> Result<(TokenPair, RefreshTokenModel), AppError> {
        let access_token = self.codec.issue(user_id, TokenKind::Access, self.ttl.access)?;
        let refresh_token = self.codec.issue(user_id, TokenKind::Refresh, self.ttl.refresh)?;
        let refresh_expires_at = Utc::now()
            .checked_add_signed(self.ttl.refresh)
            .ok_or(AppError::Internal)?;

        let record = RefreshTokenModel::new(
            user_id.to_string(),
            hash_token(&refresh_token),
            refresh_expires_at,
        );

        Ok((
            TokenPair {
                access_token,
                refresh_token,
                refresh_expires_at,
            },
            record,
        ))
    }
}
