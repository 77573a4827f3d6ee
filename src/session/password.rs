use std::sync::Arc;
use tracing::{debug, error, instrument};

use crate::shared::AppError;

/// Plaintext behind the dummy hash. Never matches a real login.
const DUMMY_PASSWORD: &str = "sessionkeep-timing-equalizer";

/// bcrypt-based password hashing and verification.
///
/// Holds a dummy hash generated with the same cost as real hashes, so the
/// unknown-user path performs a verification of equal cost.
#[derive(Clone)]
pub struct PasswordVerifier {
    cost: u32,
    dummy_hash: Arc<str>,
}

impl PasswordVerifier {
    pub fn new(cost: u32) -> Result<Self, AppError> {
        let dummy_hash = bcrypt::hash(DUMMY_PASSWORD, cost)
            .map_err(|e| AppError::Configuration(format!("invalid bcrypt cost {}: {}", cost, e)))?;

        Ok(Self {
            cost,
            dummy_hash: dummy_hash.into(),
        })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Produces a salted one-way hash for storage
    #[instrument(skip(self, password))]
    pub async fn hash(&self, password: &str) -> Result<String, AppError> {
        let password = password.to_string();
        let cost = self.cost;

        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| {
                error!(error = %e, "Password hashing task failed");
                AppError::Internal
            })?
            .map_err(|e| {
                error!(error = %e, "Failed to hash password");
                AppError::Internal
            })
    }

    /// Compares a candidate password against a stored hash.
    ///
    /// Returns `Ok(false)` on mismatch. A stored hash that cannot be parsed is
    /// a `Configuration` error, never a silent mismatch.
    #[instrument(skip_all)]
    pub async fn verify(&self, stored_hash: &str, candidate: &str) -> Result<bool, AppError> {
        let stored_hash = stored_hash.to_string();
        let candidate = candidate.to_string();

        let result = tokio::task::spawn_blocking(move || bcrypt::verify(candidate, &stored_hash))
            .await
            .map_err(|e| {
                error!(error = %e, "Password verification task failed");
                AppError::Internal
            })?;

        match result {
            Ok(matched) => {
                debug!(matched, "Password verification finished");
                Ok(matched)
            }
            Err(e) => {
                error!(error = %e, "Stored password hash is malformed");
                Err(AppError::Configuration(
                    "stored password hash is malformed".to_string(),
                ))
            }
        }
    }

    /// Burns the same CPU time as a real verification when no user was found.
    #[instrument(skip_all)]
    pub async fn verify_dummy(&self, candidate: &str) {
        let dummy_hash = Arc::clone(&self.dummy_hash);
        let candidate = candidate.to_string();

        let _ = tokio::task::spawn_blocking(move || bcrypt::verify(candidate, &dummy_hash)).await;
        debug!("Dummy password verification finished");
    }
}
