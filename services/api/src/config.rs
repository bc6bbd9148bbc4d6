//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;
use uuid::Uuid;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Where the service keeps its data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres { url: String, max_connections: u32 },
    /// Volatile store, lost on restart.
    Memory,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub storage: StorageBackend,
    pub log_level: Level,
    pub storage_timeout: Duration,
    pub play_cooldown_secs: i64,
    pub cors_origins: Vec<String>,
    /// `(token, user_id)` pairs loaded into the in-memory store at startup.
    pub dev_sessions: Vec<(String, Uuid)>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server and Storage Settings ---
        let bind_address_str = lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:9000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;
        let max_connections = parse_number::<u32>(&lookup, "DB_MAX_CONNECTIONS", 5)?;
        let storage = if database_url.trim().eq_ignore_ascii_case("memory") {
            StorageBackend::Memory
        } else {
            StorageBackend::Postgres {
                url: database_url,
                max_connections,
            }
        };

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Behavior ---
        let timeout_secs = parse_number::<u64>(&lookup, "STORAGE_TIMEOUT_SECS", 5)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "STORAGE_TIMEOUT_SECS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let play_cooldown_secs = parse_number::<i64>(&lookup, "PLAY_COOLDOWN_SECS", 10)?;
        if play_cooldown_secs < 0 {
            return Err(ConfigError::InvalidValue(
                "PLAY_COOLDOWN_SECS".to_string(),
                "must not be negative".to_string(),
            ));
        }

        let cors_origins = lookup("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|origins| !origins.is_empty())
            .unwrap_or_else(|| vec!["http://localhost:5173".to_string()]);

        let dev_sessions = match lookup("DEV_SESSIONS") {
            Some(raw) => parse_dev_sessions(&raw)?,
            None => Vec::new(),
        };

        Ok(Self {
            bind_address,
            storage,
            log_level,
            storage_timeout: Duration::from_secs(timeout_secs),
            play_cooldown_secs,
            cors_origins,
            dev_sessions,
        })
    }
}

fn parse_number<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
    }
}

/// Parses `token:uuid` pairs separated by commas.
fn parse_dev_sessions(raw: &str) -> Result<Vec<(String, Uuid)>, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue("DEV_SESSIONS".to_string(), reason);
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (token, user) = entry
                .split_once(':')
                .ok_or_else(|| invalid(format!("'{}' is not token:user_id", entry)))?;
            let token = token.trim();
            if token.is_empty() {
                return Err(invalid(format!("'{}' has an empty token", entry)));
            }
            let user_id = user
                .trim()
                .parse::<Uuid>()
                .map_err(|e| invalid(format!("'{}': {}", entry, e)))?;
            Ok((token.to_string(), user_id))
        })
        .collect()
}
