use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use sessionkeep::{
    session::{models::RefreshTokenModel, repository::RefreshTokenRepository},
    AppError,
};

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Refresh token store whose every operation fails like an unreachable database
pub struct FailingRefreshTokenRepository {
    calls: AtomicUsize,
}

impl FailingRefreshTokenRepository {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn outage(&self) -> AppError {
        self.calls.fetch_add(1, Ordering::SeqCst);
        AppError::DatabaseError("connection refused".to_string())
    }
}

#[async_trait]
impl RefreshTokenRepository for FailingRefreshTokenRepository {
    async fn put(&self, _record: &RefreshTokenModel) -> Result<(), AppError> {
        Err(self.outage())
    }

    async fn lookup(&self, _token_hash: &str) -> Result<Option<RefreshTokenModel>, AppError> {
        Err(self.outage())
    }

    async fn delete(&self, _token_hash: &str) -> Result<bool, AppError> {
        Err(self.outage())
    }

    async fn rotate(
        &self,
        _old_hash: &str,
        _replacement: &RefreshTokenModel,
    ) -> Result<bool, AppError> {
        Err(self.outage())
    }
}
