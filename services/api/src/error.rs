//! services/api/src/error.rs
//!
//! Startup failures of the `api` binary: everything that can stop the server
//! before it begins accepting requests.

use crate::config::ConfigError;

/// Returned from `main`. Request-time failures never reach this type; handlers
/// turn them into JSON error responses instead.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// An environment variable was missing or could not be parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The PostgreSQL pool could not be opened.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// The embedded schema migrations did not apply.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Binding the listen socket or serving on it failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A configured value was rejected while building a layer, such as a CORS origin.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_failures_name_the_variable() {
        let err: ApiError = ConfigError::MissingVar("DATABASE_URL".to_string()).into();
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing the environment variable DATABASE_URL"
        );
    }
}
