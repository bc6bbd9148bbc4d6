//! crates/soundwave_core/src/timeout.rs
//!
//! A `DatabaseService` decorator that bounds every storage call in time, so a
//! slow backend surfaces as `PortError::Timeout` instead of a hung request.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

use crate::domain::{
    Artist, ArtistUpdate, Conversation, HistoryEntry, Message, NewArtist, NewMessage, NewPlaylist,
    NewSong, Playlist, PlaylistUpdate, SearchField, Song,
};
use crate::ports::{DatabaseService, PortError, PortResult};

/// Awaits `call`, failing with `PortError::Timeout` once `limit` elapses.
/// The call is dropped on timeout; it is not retried.
pub async fn bounded<T, F>(limit: Duration, operation: &'static str, call: F) -> PortResult<T>
where
    F: Future<Output = PortResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            warn!(operation, limit_ms = limit.as_millis() as u64, "Storage call timed out");
            Err(PortError::Timeout(format!(
                "{} exceeded {}ms",
                operation,
                limit.as_millis()
            )))
        }
    }
}

#[derive(Clone)]
pub struct TimedDatabase {
    inner: Arc<dyn DatabaseService>,
    limit: Duration,
}

impl TimedDatabase {
    pub fn new(inner: Arc<dyn DatabaseService>, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

#[async_trait]
impl DatabaseService for TimedDatabase {
    async fn validate_auth_session(&self, token: &str) -> PortResult<Uuid> {
        bounded(self.limit, "validate_auth_session", self.inner.validate_auth_session(token)).await
    }

    async fn create_song(&self, song: NewSong) -> PortResult<Song> {
        bounded(self.limit, "create_song", self.inner.create_song(song)).await
    }

    async fn get_song(&self, song_id: Uuid) -> PortResult<Song> {
        bounded(self.limit, "get_song", self.inner.get_song(song_id)).await
    }

    async fn get_songs_by_ids(&self, song_ids: &[Uuid]) -> PortResult<Vec<Song>> {
        bounded(self.limit, "get_songs_by_ids", self.inner.get_songs_by_ids(song_ids)).await
    }

    async fn list_songs(&self) -> PortResult<Vec<Song>> {
        bounded(self.limit, "list_songs", self.inner.list_songs()).await
    }

    async fn search_songs(&self, field: SearchField, terms: &[String]) -> PortResult<Vec<Song>> {
        bounded(self.limit, "search_songs", self.inner.search_songs(field, terms)).await
    }

    async fn songs_uploaded_by(&self, user_id: Uuid) -> PortResult<Vec<Song>> {
        bounded(self.limit, "songs_uploaded_by", self.inner.songs_uploaded_by(user_id)).await
    }

    async fn songs_liked_by(&self, user_id: Uuid) -> PortResult<Vec<Song>> {
        bounded(self.limit, "songs_liked_by", self.inner.songs_liked_by(user_id)).await
    }

    async fn songs_saved_by(&self, user_id: Uuid) -> PortResult<Vec<Song>> {
        bounded(self.limit, "songs_saved_by", self.inner.songs_saved_by(user_id)).await
    }

    async fn songs_by_artist(&self, name: &str) -> PortResult<Vec<Song>> {
        bounded(self.limit, "songs_by_artist", self.inner.songs_by_artist(name)).await
    }

    async fn most_liked_songs(&self, limit: i64) -> PortResult<Vec<Song>> {
        bounded(self.limit, "most_liked_songs", self.inner.most_liked_songs(limit)).await
    }

    async fn most_saved_songs(&self, limit: i64) -> PortResult<Vec<Song>> {
        bounded(self.limit, "most_saved_songs", self.inner.most_saved_songs(limit)).await
    }

    async fn most_played_by(&self, user_id: Uuid, limit: i64) -> PortResult<Vec<Song>> {
        bounded(self.limit, "most_played_by", self.inner.most_played_by(user_id, limit)).await
    }

    async fn toggle_song_like(&self, song_id: Uuid, user_id: Uuid) -> PortResult<bool> {
        bounded(self.limit, "toggle_song_like", self.inner.toggle_song_like(song_id, user_id)).await
    }

    async fn toggle_song_save(&self, song_id: Uuid, user_id: Uuid) -> PortResult<bool> {
        bounded(self.limit, "toggle_song_save", self.inner.toggle_song_save(song_id, user_id)).await
    }

    async fn increment_play_count(&self, song_id: Uuid, user_id: Uuid) -> PortResult<()> {
        bounded(
            self.limit,
            "increment_play_count",
            self.inner.increment_play_count(song_id, user_id),
        )
        .await
    }

    async fn delete_history_for_pair(&self, user_id: Uuid, song_id: Uuid) -> PortResult<u64> {
        bounded(
            self.limit,
            "delete_history_for_pair",
            self.inner.delete_history_for_pair(user_id, song_id),
        )
        .await
    }

    async fn insert_history(&self, entry: HistoryEntry) -> PortResult<()> {
        bounded(self.limit, "insert_history", self.inner.insert_history(entry)).await
    }

    async fn list_recent_history(&self, user_id: Uuid, limit: i64) -> PortResult<Vec<HistoryEntry>> {
        bounded(
            self.limit,
            "list_recent_history",
            self.inner.list_recent_history(user_id, limit),
        )
        .await
    }

    async fn clear_history(&self, user_id: Uuid) -> PortResult<u64> {
        bounded(self.limit, "clear_history", self.inner.clear_history(user_id)).await
    }

    async fn count_recent_plays(
        &self,
        user_id: Uuid,
        song_id: Uuid,
        since: DateTime<Utc>,
    ) -> PortResult<i64> {
        bounded(
            self.limit,
            "count_recent_plays",
            self.inner.count_recent_plays(user_id, song_id, since),
        )
        .await
    }

    async fn history_between(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> PortResult<Vec<HistoryEntry>> {
        bounded(self.limit, "history_between", self.inner.history_between(user_id, from, to)).await
    }

    async fn create_playlist(&self, playlist: NewPlaylist) -> PortResult<Playlist> {
        bounded(self.limit, "create_playlist", self.inner.create_playlist(playlist)).await
    }

    async fn get_playlist(&self, playlist_id: Uuid) -> PortResult<Playlist> {
        bounded(self.limit, "get_playlist", self.inner.get_playlist(playlist_id)).await
    }

    async fn list_public_playlists(&self) -> PortResult<Vec<Playlist>> {
        bounded(self.limit, "list_public_playlists", self.inner.list_public_playlists()).await
    }

    async fn playlists_created_by(&self, user_id: Uuid) -> PortResult<Vec<Playlist>> {
        bounded(self.limit, "playlists_created_by", self.inner.playlists_created_by(user_id)).await
    }

    async fn update_playlist(&self, playlist_id: Uuid, update: PlaylistUpdate) -> PortResult<Playlist> {
        bounded(
            self.limit,
            "update_playlist",
            self.inner.update_playlist(playlist_id, update),
        )
        .await
    }

    async fn delete_playlist(&self, playlist_id: Uuid) -> PortResult<()> {
        bounded(self.limit, "delete_playlist", self.inner.delete_playlist(playlist_id)).await
    }

    async fn add_song_to_playlist(&self, playlist_id: Uuid, song_id: Uuid) -> PortResult<()> {
        bounded(
            self.limit,
            "add_song_to_playlist",
            self.inner.add_song_to_playlist(playlist_id, song_id),
        )
        .await
    }

    async fn remove_song_from_playlist(&self, playlist_id: Uuid, song_id: Uuid) -> PortResult<bool> {
        bounded(
            self.limit,
            "remove_song_from_playlist",
            self.inner.remove_song_from_playlist(playlist_id, song_id),
        )
        .await
    }

    async fn create_artist(&self, artist: NewArtist) -> PortResult<Artist> {
        bounded(self.limit, "create_artist", self.inner.create_artist(artist)).await
    }

    async fn get_artist(&self, artist_id: Uuid) -> PortResult<Artist> {
        bounded(self.limit, "get_artist", self.inner.get_artist(artist_id)).await
    }

    async fn list_artists(&self) -> PortResult<Vec<Artist>> {
        bounded(self.limit, "list_artists", self.inner.list_artists()).await
    }

    async fn update_artist(&self, artist_id: Uuid, update: ArtistUpdate) -> PortResult<Artist> {
        bounded(self.limit, "update_artist", self.inner.update_artist(artist_id, update)).await
    }

    async fn delete_artist(&self, artist_id: Uuid) -> PortResult<()> {
        bounded(self.limit, "delete_artist", self.inner.delete_artist(artist_id)).await
    }

    async fn follow_artist(&self, artist_id: Uuid, user_id: Uuid) -> PortResult<bool> {
        bounded(self.limit, "follow_artist", self.inner.follow_artist(artist_id, user_id)).await
    }

    async fn unfollow_artist(&self, artist_id: Uuid, user_id: Uuid) -> PortResult<bool> {
        bounded(self.limit, "unfollow_artist", self.inner.unfollow_artist(artist_id, user_id)).await
    }

    async fn artists_followed_by(&self, user_id: Uuid) -> PortResult<Vec<Artist>> {
        bounded(self.limit, "artists_followed_by", self.inner.artists_followed_by(user_id)).await
    }

    async fn send_message(&self, message: NewMessage) -> PortResult<Message> {
        bounded(self.limit, "send_message", self.inner.send_message(message)).await
    }

    async fn find_conversation(&self, a: Uuid, b: Uuid) -> PortResult<Option<Conversation>> {
        bounded(self.limit, "find_conversation", self.inner.find_conversation(a, b)).await
    }

    async fn conversation_messages(&self, conversation_id: Uuid) -> PortResult<Vec<Message>> {
        bounded(
            self.limit,
            "conversation_messages",
            self.inner.conversation_messages(conversation_id),
        )
        .await
    }

    async fn get_message(&self, message_id: Uuid) -> PortResult<Message> {
        bounded(self.limit, "get_message", self.inner.get_message(message_id)).await
    }

    async fn delete_message(&self, message_id: Uuid) -> PortResult<()> {
        bounded(self.limit, "delete_message", self.inner.delete_message(message_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryDatabase;

    #[tokio::test]
    async fn slow_call_reports_timeout() {
        let slow = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, PortError>(1)
        };
        let result = bounded(Duration::from_millis(10), "slow_lookup", slow).await;
        match result {
            Err(e @ PortError::Timeout(_)) => assert!(e.is_transient()),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn fast_call_passes_through_errors_and_values() {
        let limit = Duration::from_secs(1);
        assert_eq!(bounded(limit, "ok", async { Ok::<_, PortError>(7) }).await, Ok(7));

        let db = TimedDatabase::new(Arc::new(InMemoryDatabase::new()), limit);
        let missing = db.get_song(Uuid::new_v4()).await;
        assert!(matches!(missing, Err(PortError::NotFound(_))));
        assert!(db.list_recent_history(Uuid::new_v4(), 50).await.unwrap().is_empty());
    }
}
