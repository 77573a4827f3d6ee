// Public API - what other modules can use
pub use handlers::{login, logout, me, refresh, REFRESH_COOKIE_NAME};
pub use middleware::{require_auth, AuthenticatedUser};
pub use password::PasswordVerifier;
pub use service::{SessionService, SessionTtl};
pub use token::{hash_token, TokenCodec, TokenError};
pub use types::{Claims, TokenKind, TokenPair};

// Internal modules
mod handlers;
mod middleware;
pub mod models;
pub mod password;
pub mod repository;
pub mod service;
pub mod token;
pub mod types;
