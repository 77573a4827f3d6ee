use chrono::Duration;
use tracing::debug;

use crate::shared::AppError;

const DEFAULT_PORT: u16 = 8085;
const DEFAULT_ACCESS_EXPIRY_MINUTES: i64 = 15;
const DEFAULT_REFRESH_EXPIRY_HOURS: i64 = 168;
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000";
const MAX_ACCESS_EXPIRY_MINUTES: i64 = 24 * 60;
const MAX_REFRESH_EXPIRY_HOURS: i64 = 365 * 24;

/// Optional user created at startup when it does not exist yet
#[derive(Clone)]
pub struct BootstrapUser {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for BootstrapUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapUser")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Process configuration, read once at startup
#[derive(Clone)]
pub struct AppConfig {
    pub port: u16,
    pub jwt_secret: String,
    pub access_expiry: Duration,
    pub refresh_expiry: Duration,
    pub bcrypt_cost: u32,
    pub database_url: Option<String>,
    pub allowed_origins: Vec<String>,
    pub cookie_secure: bool,
    pub bootstrap_user: Option<BootstrapUser>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("jwt_secret", &"[REDACTED]")
            .field("access_expiry", &self.access_expiry)
            .field("refresh_expiry", &self.refresh_expiry)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("allowed_origins", &self.allowed_origins)
            .field("cookie_secure", &self.cookie_secure)
            .field("bootstrap_user", &self.bootstrap_user)
            .finish()
    }
}

impl AppConfig {
    /// Loads configuration from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = get("JWT_SECRET").ok_or_else(|| {
            AppError::Configuration("JWT_SECRET must be set to a non-empty value".to_string())
        })?;

        let access_minutes = parse_or(
            get("JWT_ACCESS_EXPIRY_MINUTES"),
            "JWT_ACCESS_EXPIRY_MINUTES",
            DEFAULT_ACCESS_EXPIRY_MINUTES,
        )?;
        let access_expiry = bounded_expiry(
            "JWT_ACCESS_EXPIRY_MINUTES",
            access_minutes,
            MAX_ACCESS_EXPIRY_MINUTES,
            Duration::try_minutes,
        )?;

        let refresh_hours = parse_or(
            get("JWT_REFRESH_EXPIRY_HOURS"),
            "JWT_REFRESH_EXPIRY_HOURS",
            DEFAULT_REFRESH_EXPIRY_HOURS,
        )?;
        let refresh_expiry = bounded_expiry(
            "JWT_REFRESH_EXPIRY_HOURS",
            refresh_hours,
            MAX_REFRESH_EXPIRY_HOURS,
            Duration::try_hours,
        )?;

        let bcrypt_cost = parse_or(get("BCRYPT_COST"), "BCRYPT_COST", bcrypt::DEFAULT_COST)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(AppError::Configuration(format!(
                "BCRYPT_COST must be between 4 and 31, got {}",
                bcrypt_cost
            )));
        }

        let port = parse_or(get("PORT"), "PORT", DEFAULT_PORT)?;
        let cookie_secure = parse_or(get("COOKIE_SECURE"), "COOKIE_SECURE", true)?;

        let allowed_origins: Vec<String> = get("ALLOWED_ORIGINS")
            .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();
        // The refresh cookie needs credentialed CORS, which browsers refuse for `*`
        if allowed_origins.iter().any(|o| o == "*") {
            return Err(AppError::Configuration(
                "ALLOWED_ORIGINS must list explicit origins, `*` is not allowed".to_string(),
            ));
        }

        let bootstrap_user = match (get("BOOTSTRAP_USER_EMAIL"), get("BOOTSTRAP_USER_PASSWORD")) {
            (Some(email), Some(password)) => Some(BootstrapUser { email, password }),
            (None, None) => None,
            _ => {
                return Err(AppError::Configuration(
                    "BOOTSTRAP_USER_EMAIL and BOOTSTRAP_USER_PASSWORD must be set together"
                        .to_string(),
                ))
            }
        };

        let config = Self {
            port,
            jwt_secret,
            access_expiry,
            refresh_expiry,
            bcrypt_cost,
            database_url: get("DATABASE_URL"),
            allowed_origins,
            cookie_secure,
            bootstrap_user,
        };

        debug!(config = ?config, "Configuration loaded");
        Ok(config)
    }
}

/// Converts a positive count no larger than `max` into a duration
fn bounded_expiry(
    key: &str,
    value: i64,
    max: i64,
    to_duration: fn(i64) -> Option<Duration>,
) -> Result<Duration, AppError> {
    if value <= 0 || value > max {
        return Err(AppError::Configuration(format!(
            "{} must be between 1 and {}, got {}",
            key, max, value
        )));
    }
    to_duration(value)
        .ok_or_else(|| AppError::Configuration(format!("{} is out of range", key)))
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Configuration(format!("{} has an invalid value", key))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[("JWT_SECRET", "s3cret")])).unwrap();

        assert_eq!(config.port, 8085);
        assert_eq!(config.access_expiry, Duration::minutes(15));
        assert_eq!(config.refresh_expiry, Duration::hours(168));
        assert_eq!(config.bcrypt_cost, bcrypt::DEFAULT_COST);
        assert_eq!(config.allowed_origins, vec!["http://localhost:3000".to_string()]);
        assert!(config.database_url.is_none());
        assert!(config.cookie_secure);
        assert!(config.bootstrap_user.is_none());
    }

    #[test]
    fn test_missing_secret_is_configuration_error() {
        let result = AppConfig::from_lookup(lookup_from(&[]));
        assert!(matches!(result, Err(AppError::Configuration(_))));

        let result = AppConfig::from_lookup(lookup_from(&[("JWT_SECRET", "   ")]));
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", "s3cret"),
            ("PORT", "9000"),
            ("JWT_ACCESS_EXPIRY_MINUTES", "5"),
            ("JWT_REFRESH_EXPIRY_HOURS", "24"),
            ("BCRYPT_COST", "10"),
            ("DATABASE_URL", "postgres://localhost/sessions"),
            ("ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
            ("COOKIE_SECURE", "false"),
        ]))
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.access_expiry, Duration::minutes(5));
        assert_eq!(config.refresh_expiry, Duration::hours(24));
        assert_eq!(config.bcrypt_cost, 10);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/sessions"));
        assert_eq!(
            config.allowed_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert!(!config.cookie_secure);
    }

    #[test]
    fn test_invalid_values_rejected() {
        for (key, value) in [
            ("PORT", "not-a-port"),
            ("BCRYPT_COST", "2"),
            ("JWT_ACCESS_EXPIRY_MINUTES", "0"),
            ("JWT_REFRESH_EXPIRY_HOURS", "-1"),
        ] {
            let result =
                AppConfig::from_lookup(lookup_from(&[("JWT_SECRET", "s3cret"), (key, value)]));
            assert!(
                matches!(result, Err(AppError::Configuration(_))),
                "{}={} should be rejected",
                key,
                value
            );
        }
    }

    #[test]
    fn test_oversized_expiry_rejected() {
        for (key, value) in [
            ("JWT_REFRESH_EXPIRY_HOURS", "1000000000000"),
            ("JWT_REFRESH_EXPIRY_HOURS", "9223372036854775807"),
            ("JWT_REFRESH_EXPIRY_HOURS", "8761"),
            ("JWT_ACCESS_EXPIRY_MINUTES", "1441"),
        ] {
            let result =
                AppConfig::from_lookup(lookup_from(&[("JWT_SECRET", "s3cret"), (key, value)]));
            assert!(
                matches!(result, Err(AppError::Configuration(_))),
                "{}={} should be rejected",
                key,
                value
            );
        }

        let config = AppConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", "s3cret"),
            ("JWT_REFRESH_EXPIRY_HOURS", "8760"),
            ("JWT_ACCESS_EXPIRY_MINUTES", "1440"),
        ]))
        .unwrap();
        assert_eq!(config.refresh_expiry, Duration::hours(8760));
        assert_eq!(config.access_expiry, Duration::minutes(1440));
    }

    #[test]
    fn test_wildcard_origin_rejected() {
        for origins in ["*", "https://a.example, *"] {
            let result = AppConfig::from_lookup(lookup_from(&[
                ("JWT_SECRET", "s3cret"),
                ("ALLOWED_ORIGINS", origins),
            ]));
            assert!(matches!(result, Err(AppError::Configuration(_))));
        }
    }

    #[test]
    fn test_bootstrap_user_requires_both_fields() {
        let result = AppConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", "s3cret"),
            ("BOOTSTRAP_USER_EMAIL", "admin@x.com"),
        ]));
        assert!(matches!(result, Err(AppError::Configuration(_))));

        let config = AppConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", "s3cret"),
            ("BOOTSTRAP_USER_EMAIL", "admin@x.com"),
            ("BOOTSTRAP_USER_PASSWORD", "hunter22"),
        ]))
        .unwrap();
        let user = config.bootstrap_user.unwrap();
        assert_eq!(user.email, "admin@x.com");
        assert!(!format!("{:?}", user).contains("hunter22"));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config =
            AppConfig::from_lookup(lookup_from(&[("JWT_SECRET", "very-secret-value")])).unwrap();
        assert!(!format!("{:?}", config).contains("very-secret-value"));
    }
}
