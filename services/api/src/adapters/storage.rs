//! services/api/src/adapters/storage.rs
//!
//! Opens the configured storage backend behind the `DatabaseService` port.

use crate::adapters::DbAdapter;
use crate::config::{Config, StorageBackend};
use crate::error::ApiError;
use chrono::{Duration, Utc};
use soundwave_core::{DatabaseService, InMemoryDatabase, TimedDatabase};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{info, warn};

/// Lifetime given to sessions loaded from `DEV_SESSIONS`.
const DEV_SESSION_DAYS: i64 = 3650;

/// Opens the configured store and wraps it in the storage timeout.
pub async fn connect_storage(config: &Config) -> Result<Arc<dyn DatabaseService>, ApiError> {
    let store: Arc<dyn DatabaseService> = match &config.storage {
        StorageBackend::Postgres {
            url,
            max_connections,
        } => {
            if !config.dev_sessions.is_empty() {
                warn!("DEV_SESSIONS is ignored with PostgreSQL storage; sessions come from auth_sessions.");
            }
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(*max_connections)
                .acquire_timeout(config.storage_timeout)
                .connect(url)
                .await?;
            let db_adapter = DbAdapter::new(db_pool);
            info!("Running database migrations...");
            db_adapter.run_migrations().await?;
            info!("Database migrations complete.");
            Arc::new(db_adapter)
        }
        StorageBackend::Memory => {
            warn!("Using the in-memory store; all data is lost on shutdown.");
            let memory = InMemoryDatabase::new();
            let expires_at = Utc::now() + Duration::days(DEV_SESSION_DAYS);
            for (token, user_id) in &config.dev_sessions {
                memory.insert_auth_session(token, *user_id, expires_at).await;
                info!(%user_id, "Loaded development session");
            }
            Arc::new(memory)
        }
    };
    Ok(Arc::new(TimedDatabase::new(store, config.storage_timeout)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use soundwave_core::PortError;
    use uuid::Uuid;

    #[tokio::test]
    async fn memory_store_accepts_configured_dev_sessions() {
        let listener = Uuid::new_v4();
        let sessions = format!("listener-dev:{}", listener);
        let config = Config::from_lookup(|name| match name {
            "DATABASE_URL" => Some("memory".to_string()),
            "DEV_SESSIONS" => Some(sessions.clone()),
            _ => None,
        })
        .unwrap();

        let db = connect_storage(&config).await.unwrap();
        assert_eq!(db.validate_auth_session("listener-dev").await.unwrap(), listener);
        assert_eq!(
            db.validate_auth_session("someone-else").await,
            Err(PortError::Unauthorized)
        );
    }
}
