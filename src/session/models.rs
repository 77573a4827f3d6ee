use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for the refresh_tokens table.
///
/// Holds the SHA-256 of the raw token, never the token itself.
#[derive(Debug, Clone, FromRow)]
pub struct RefreshTokenModel {
    pub user_id: String,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

impl RefreshTokenModel {
    pub fn new(user_id: String, token_hash: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            token_hash,
            expires_at,
        }
    }

    /// Expired records count as absent even while still stored
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_expiry() {
        let live = RefreshTokenModel::new(
            "user".to_string(),
            "hash".to_string(),
            Utc::now() + Duration::hours(1),
        );
        assert!(!live.is_expired());

        let expired = RefreshTokenModel::new(
            "user".to_string(),
            "hash".to_string(),
            Utc::now() - Duration::seconds(1),
        );
        assert!(expired.is_expired());
    }
}
