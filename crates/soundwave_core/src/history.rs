//! crates/soundwave_core/src/history.rs
//!
//! Play history: the per-user store facade and the recorder that decides
//! whether a playback counts.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::{HistoryEntry, Song};
use crate::ports::{DatabaseService, PortError, PortResult};

/// Upper bound on entries returned by a recent-history listing.
pub const RECENT_HISTORY_LIMIT: i64 = 50;

/// Seconds within which a replay of the same song is not counted again.
pub const DEFAULT_PLAY_COOLDOWN_SECS: i64 = 10;

//=========================================================================================
// History Store
//=========================================================================================

/// Per-user play log that retains at most one entry per (user, song) pair.
#[derive(Clone)]
pub struct HistoryStore {
    db: Arc<dyn DatabaseService>,
}

impl HistoryStore {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    /// Replaces any prior entry for the entry's pair with this one.
    pub async fn append_or_replace(&self, entry: HistoryEntry) -> PortResult<()> {
        let removed = self
            .db
            .delete_history_for_pair(entry.user_id, entry.song_id)
            .await?;
        if removed > 0 {
            debug!(user_id = %entry.user_id, song_id = %entry.song_id, removed, "Superseded history entry");
        }
        self.db.insert_history(entry).await
    }

    /// Newest first, capped at `limit` (and never above `RECENT_HISTORY_LIMIT`).
    pub async fn list_recent(&self, user_id: Uuid, limit: i64) -> PortResult<Vec<HistoryEntry>> {
        let limit = limit.clamp(0, RECENT_HISTORY_LIMIT);
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.db.list_recent_history(user_id, limit).await
    }

    pub async fn last_played(&self, user_id: Uuid) -> PortResult<Option<HistoryEntry>> {
        let mut recent = self.db.list_recent_history(user_id, 1).await?;
        Ok(recent.pop())
    }

    /// Idempotent: clearing an empty history is not an error.
    pub async fn clear_all(&self, user_id: Uuid) -> PortResult<u64> {
        self.db.clear_history(user_id).await
    }

    pub async fn count_recent(
        &self,
        user_id: Uuid,
        song_id: Uuid,
        since: DateTime<Utc>,
    ) -> PortResult<i64> {
        self.db.count_recent_plays(user_id, song_id, since).await
    }
}

//=========================================================================================
// Play Recorder
//=========================================================================================

/// State of the play-counter increment that follows a recorded play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterUpdate {
    /// The play was not recorded, so no increment was attempted.
    NotAttempted,
    Applied,
    /// The history write committed but the increment did not.
    Failed(PortError),
}

/// Effects of one `record_play` call. `recorded` is the primary effect;
/// `counters` is the secondary one and may have failed independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayOutcome {
    pub recorded: bool,
    pub counters: CounterUpdate,
}

impl PlayOutcome {
    fn within_cooldown() -> Self {
        Self {
            recorded: false,
            counters: CounterUpdate::NotAttempted,
        }
    }

    pub fn counters_applied(&self) -> bool {
        self.counters == CounterUpdate::Applied
    }
}

#[derive(Clone)]
pub struct PlayRecorder {
    history: HistoryStore,
    db: Arc<dyn DatabaseService>,
    cooldown: Duration,
}

impl PlayRecorder {
    pub fn new(db: Arc<dyn DatabaseService>, cooldown: Duration) -> Self {
        Self {
            history: HistoryStore::new(db.clone()),
            db,
            cooldown,
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Records that `user_id` played `song` at `now`.
    ///
    /// A replay inside the cooldown window changes nothing. Otherwise the prior
    /// entry for the pair is replaced and both play counters are incremented.
    /// A failed increment is logged and reported in the outcome; it does not
    /// undo the history write.
    pub async fn record_play(
        &self,
        user_id: Uuid,
        song: &Song,
        now: DateTime<Utc>,
    ) -> PortResult<PlayOutcome> {
        let since = now - self.cooldown;
        let recent = self.history.count_recent(user_id, song.id, since).await?;
        if recent > 0 {
            debug!(%user_id, song_id = %song.id, "Replay inside cooldown window; not counted");
            return Ok(PlayOutcome::within_cooldown());
        }

        let entry = HistoryEntry::new(user_id, song.id, now, song.duration_secs);
        self.history.append_or_replace(entry).await?;

        let counters = match self.db.increment_play_count(song.id, user_id).await {
            Ok(()) => CounterUpdate::Applied,
            Err(e) => {
                warn!(%user_id, song_id = %song.id, error = %e, "Play recorded but counter update failed");
                CounterUpdate::Failed(e)
            }
        };

        Ok(PlayOutcome {
            recorded: true,
            counters,
        })
    }
}
