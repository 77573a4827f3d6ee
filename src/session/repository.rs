use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::models::RefreshTokenModel;
use crate::shared::AppError;

/// Persistence for refresh token fingerprints.
///
/// Every method takes the hash of a token, never the raw token.
#[async_trait]
pub trait RefreshTokenRepository {
    /// Stores a new live record
    async fn put(&self, record: &RefreshTokenModel) -> Result<(), AppError>;

    /// Exact-match lookup. Expired records are returned as stored; callers decide.
    async fn lookup(&self, token_hash: &str) -> Result<Option<RefreshTokenModel>, AppError>;

    /// Removes the record if present. Returns whether a row was deleted.
    async fn delete(&self, token_hash: &str) -> Result<bool, AppError>;

    /// Atomically consumes the live record for `old_hash` and stores `replacement`.
    ///
    /// Returns false, storing nothing, when `old_hash` is absent or expired. Of
    /// any number of concurrent calls for the same `old_hash`, at most one
    /// returns true.
    async fn rotate(
        &self,
        old_hash: &str,
        replacement: &RefreshTokenModel,
    ) -> Result<bool, AppError>;
}

/// In-memory implementation of RefreshTokenRepository for development and testing
pub struct InMemoryRefreshTokenRepository {
    tokens: Mutex<HashMap<String, RefreshTokenModel>>,
}

impl Default for InMemoryRefreshTokenRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRefreshTokenRepository {
    pub fn new() -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Number of stored records, expired ones included
    pub fn record_count(&self) -> usize {
        self.tokens.lock().map(|t| t.len()).unwrap_or(0)
    }
}

#[async_trait]
impl RefreshTokenRepository for InMemoryRefreshTokenRepository {
    #[instrument(skip(self, record), fields(user_id = %record.user_id))]
    async fn put(&self, record: &RefreshTokenModel) -> Result<(), AppError> {
        let mut tokens = self.tokens.lock().map_err(|_| AppError::Internal)?;
        if tokens.contains_key(&record.token_hash) {
            warn!("Refresh token hash already exists in memory");
            return Err(AppError::DatabaseError(
                "Refresh token already exists".to_string(),
            ));
        }
        tokens.insert(record.token_hash.clone(), record.clone());

        debug!(expires_at = %record.expires_at, "Refresh token stored in memory");
        Ok(())
    }

    #[instrument(skip_all)]
    async fn lookup(&self, token_hash: &str) -> Result<Option<RefreshTokenModel>, AppError> {
        let tokens = self.tokens.lock().map_err(|_| AppError::Internal)?;
        let record = tokens.get(token_hash).cloned();

        debug!(found = record.is_some(), "Refresh token lookup in memory");
        Ok(record)
    }

    #[instrument(skip_all)]
    async fn delete(&self, token_hash: &str) -> Result<bool, AppError> {
        let mut tokens = self.tokens.lock().map_err(|_| AppError::Internal)?;
        let deleted = tokens.remove(token_hash).is_some();

        debug!(deleted, "Refresh token delete in memory");
        Ok(deleted)
    }

    #[instrument(skip_all, fields(user_id = %replacement.user_id))]
    async fn rotate(
        &self,
        old_hash: &str,
        replacement: &RefreshTokenModel,
    ) -> Result<bool, AppError> {
        let mut tokens = self.tokens.lock().map_err(|_| AppError::Internal)?;

        match tokens.get(old_hash) {
            Some(existing) if !existing.is_expired() => {}
            _ => {
                debug!("No live refresh token to rotate in memory");
                return Ok(false);
            }
        }

        if tokens.contains_key(&replacement.token_hash) {
            warn!("Replacement refresh token hash already exists in memory");
            return Err(AppError::DatabaseError(
                "Refresh token already exists".to_string(),
            ));
        }

        tokens.remove(old_hash);
        tokens.insert(replacement.token_hash.clone(), replacement.clone());

        debug!("Refresh token rotated in memory");
        Ok(true)
    }
}

/// PostgreSQL implementation of refresh token repository
pub struct PostgresRefreshTokenRepository {
    pool: PgPool,
}

impl PostgresRefreshTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenRepository for PostgresRefreshTokenRepository {
    #[instrument(skip(self, record), fields(user_id = %record.user_id))]
    async fn put(&self, record: &RefreshTokenModel) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO refresh_tokens (user_id, token_hash, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(&record.user_id)
        .bind(&record.token_hash)
        .bind(record.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to store refresh token in database");
            AppError::DatabaseError(e.to_string())
        })?;

        debug!(expires_at = %record.expires_at, "Refresh token stored in database");
        Ok(())
    }

    #[instrument(skip_all)]
    async fn lookup(&self, token_hash: &str) -> Result<Option<RefreshTokenModel>, AppError> {
        let record = sqlx::query_as::<_, RefreshTokenModel>(
            "SELECT user_id, token_hash, expires_at FROM refresh_tokens WHERE token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to look up refresh token in database");
            AppError::DatabaseError(e.to_string())
        })?;

        debug!(found = record.is_some(), "Refresh token lookup in database");
        Ok(record)
    }

    #[instrument(skip_all)]
    async fn delete(&self, token_hash: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to delete refresh token from database");
                AppError::DatabaseError(e.to_string())
            })?;

        let deleted = result.rows_affected() > 0;
        debug!(deleted, "Refresh token delete in database");
        Ok(deleted)
    }

    #[instrument(skip_all, fields(user_id = %replacement.user_id))]
    async fn rotate(
        &self,
        old_hash: &str,
        replacement: &RefreshTokenModel,
    ) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            warn!(error = %e, "Failed to begin rotation transaction");
            AppError::DatabaseError(e.to_string())
        })?;

        // The row lock taken by DELETE serializes concurrent rotations of the same hash
        let deleted = sqlx::query(
            "DELETE FROM refresh_tokens WHERE token_hash = $1 AND expires_at > $2",
        )
        .bind(old_hash)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to consume refresh token in database");
            AppError::DatabaseError(e.to_string())
        })?
        .rows_affected();

        if deleted == 0 {
            debug!("No live refresh token to rotate in database");
            tx.rollback().await.map_err(|e| {
                warn!(error = %e, "Failed to roll back rotation transaction");
                AppError::DatabaseError(e.to_string())
            })?;
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO refresh_tokens (user_id, token_hash, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(&replacement.user_id)
        .bind(&replacement.token_hash)
        .bind(replacement.expires_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to store rotated refresh token in database");
            AppError::DatabaseError(e.to_string())
        })?;

        tx.commit().await.map_err(|e| {
            warn!(error = %e, "Failed to commit rotation transaction");
            AppError::DatabaseError(e.to_string())
        })?;

        debug!("Refresh token rotated in database");
        Ok(true)
    }
}
