use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for the users table
#[derive(Clone, FromRow, Serialize)]
pub struct User {
    pub id: String, // UUID v4 as string, used as the token subject
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a new user with a generated ID and timestamps
    pub fn new(email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            email,
            password_hash,
            created_at: now,
            updated_at: now,
        }
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user() {
        let user = User::new("a@x.com".to_string(), "$2b$04$hash".to_string());

        assert_eq!(user.email, "a@x.com");
        assert!(Uuid::parse_str(&user.id).is_ok());
        assert_eq!(user.created_at, user.updated_at);
    }

    #[test]
    fn test_password_hash_never_exposed() {
        let user = User::new("a@x.com".to_string(), "$2b$04$secrethash".to_string());

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secrethash"));
        assert!(!json.contains("password_hash"));

        let debug = format!("{:?}", user);
        assert!(!debug.contains("secrethash"));
    }
}
