pub mod models;
pub mod repository;

pub use models::User;
pub use repository::{InMemoryUserRepository, PostgresUserRepository, UserRepository};
