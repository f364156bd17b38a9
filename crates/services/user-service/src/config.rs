//! User service configuration.

use std::env;

use common::DatabaseConfig;
use sea_orm::IsolationLevel;

/// User service configuration.
#[derive(Debug, Clone)]
pub struct UserServiceConfig {
    /// Store connection settings
    pub database: DatabaseConfig,
    /// Isolation level for write transactions; `None` keeps the engine default
    pub isolation_level: Option<IsolationLevel>,
}

impl UserServiceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = DatabaseConfig::default();

        Self {
            database: DatabaseConfig {
                url: env::var("USER_SERVICE_DATABASE_URL")
                    .or_else(|_| env::var("DATABASE_URL"))
                    .unwrap_or(defaults.url),
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or(defaults.max_connections),
                min_connections: parse_env("DATABASE_MIN_CONNECTIONS")
                    .unwrap_or(defaults.min_connections),
                connect_timeout_secs: parse_env("DATABASE_CONNECT_TIMEOUT_SECS")
                    .unwrap_or(defaults.connect_timeout_secs),
                sqlx_logging: parse_env("DATABASE_SQLX_LOGGING").unwrap_or(defaults.sqlx_logging),
            },
            isolation_level: env::var("USER_SERVICE_ISOLATION_LEVEL")
                .ok()
                .map(|v| parse_isolation_level(&v))
                .unwrap_or(Some(IsolationLevel::ReadCommitted)),
        }
    }

    /// Configuration for tests: in-memory SQLite, engine-default isolation.
    pub fn in_memory() -> Self {
        Self {
            database: DatabaseConfig::in_memory(),
            isolation_level: None,
        }
    }
}

impl Default for UserServiceConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            isolation_level: Some(IsolationLevel::ReadCommitted),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Unknown values fall back to READ COMMITTED.
fn parse_isolation_level(value: &str) -> Option<IsolationLevel> {
    match value.trim().to_lowercase().replace('_', "-").as_str() {
        "default" | "none" => None,
        "read-uncommitted" => Some(IsolationLevel::ReadUncommitted),
        "repeatable-read" => Some(IsolationLevel::RepeatableRead),
        "serializable" => Some(IsolationLevel::Serializable),
        "read-committed" => Some(IsolationLevel::ReadCommitted),
        other => {
            tracing::warn!("Unknown isolation level '{}', using read-committed", other);
            Some(IsolationLevel::ReadCommitted)
        }
    }
}
