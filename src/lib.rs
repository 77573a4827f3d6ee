// Library crate for the session credential service
// This file exposes the public API for integration tests

pub mod app;
pub mod config;
pub mod db;
pub mod session;
pub mod shared;
pub mod user;

// Re-export commonly used types for easier access in tests
pub use app::{build_state, router};
pub use config::AppConfig;
pub use session::{SessionService, SessionTtl, TokenPair};
pub use shared::{AppError, AppState};
pub use user::{User, UserRepository};
