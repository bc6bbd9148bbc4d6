//! services/api/src/web/state.rs
//!
//! Defines the application state shared by every handler.

use crate::config::Config;
use soundwave_core::{DatabaseService, HistoryStore, PlayRecorder, StatsAggregator};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub recorder: PlayRecorder,
    pub history: HistoryStore,
    pub stats: StatsAggregator,
}

impl AppState {
    /// Wires the history and stats components onto one storage handle.
    pub fn new(db: Arc<dyn DatabaseService>, config: Arc<Config>) -> Self {
        let cooldown = chrono::Duration::seconds(config.play_cooldown_secs);
        Self {
            recorder: PlayRecorder::new(db.clone(), cooldown),
            history: HistoryStore::new(db.clone()),
            stats: StatsAggregator::new(db.clone()),
            db,
            config,
        }
    }
}
