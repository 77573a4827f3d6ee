use axum::Router;
use std::sync::Arc;

use sessionkeep::{
    router,
    session::{
        repository::{InMemoryRefreshTokenRepository, RefreshTokenRepository},
        PasswordVerifier, SessionService, SessionTtl, TokenCodec,
    },
    user::InMemoryUserRepository,
    AppState, UserRepository,
};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub const TEST_SECRET: &str = "integration-test-secret";

pub struct TestSetup {
    pub app: Router,
    pub service: Arc<SessionService>,
    pub users: Arc<InMemoryUserRepository>,
    pub refresh_tokens: Arc<InMemoryRefreshTokenRepository>,
}

pub struct TestSetupBuilder {
    users: Vec<(String, String)>,
    bcrypt_cost: u32,
    ttl: SessionTtl,
    refresh_token_store: Option<Arc<dyn RefreshTokenRepository + Send + Sync>>,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            users: vec![],
            bcrypt_cost: 4,
            ttl: SessionTtl::default(),
            refresh_token_store: None,
        }
    }

    pub fn with_user(mut self, email: &str, password: &str) -> Self {
        self.users.push((email.to_string(), password.to_string()));
        self
    }

    pub fn with_default_user(self) -> Self {
        self.with_user("a@x.com", "secret123")
    }

    #[allow(dead_code)]
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    /// Replaces the in-memory refresh token store used by the service
    #[allow(dead_code)]
    pub fn with_refresh_token_store(
        mut self,
        store: Arc<dyn RefreshTokenRepository + Send + Sync>,
    ) -> Self {
        self.refresh_token_store = Some(store);
        self
    }

    pub async fn build(self) -> TestSetup {
        let users = Arc::new(InMemoryUserRepository::new());
        let refresh_tokens = Arc::new(InMemoryRefreshTokenRepository::new());
        let passwords = PasswordVerifier::new(self.bcrypt_cost).expect("valid bcrypt cost");

        for (email, password) in &self.users {
            let hash = passwords.hash(password).await.expect("hashing should succeed");
            users
                .create(email, &hash)
                .await
                .expect("user creation should succeed");
        }

        let store: Arc<dyn RefreshTokenRepository + Send + Sync> = match self.refresh_token_store {
            Some(store) => store,
            None => refresh_tokens.clone(),
        };

        let service = Arc::new(SessionService::new(
            users.clone(),
            store,
            TokenCodec::new(TEST_SECRET).expect("valid secret"),
            passwords,
            self.ttl,
        ));

        let state = AppState::new(Arc::clone(&service), true);
        let app = router(state, &["http://localhost:3000".to_string()]);

        TestSetup {
            app,
            service,
            users,
            refresh_tokens,
        }
    }
}
