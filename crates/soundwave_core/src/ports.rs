//! crates/soundwave_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of a specific storage backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Artist, ArtistUpdate, Conversation, HistoryEntry, Message, NewArtist, NewMessage, NewPlaylist,
    NewSong, Playlist, PlaylistUpdate, SearchField, Song,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Storage call timed out: {0}")]
    Timeout(String),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    /// Transient backend failures. Nothing in the core retries them.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Unavailable(_))
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Storage Port
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Auth Sessions ---

    /// Resolves an externally issued session token to its user.
    /// Unknown or expired tokens yield `PortError::Unauthorized`.
    async fn validate_auth_session(&self, token: &str) -> PortResult<Uuid>;

    // --- Songs ---
    async fn create_song(&self, song: NewSong) -> PortResult<Song>;

    async fn get_song(&self, song_id: Uuid) -> PortResult<Song>;

    /// Songs for the given ids that exist; missing ids are skipped.
    async fn get_songs_by_ids(&self, song_ids: &[Uuid]) -> PortResult<Vec<Song>>;

    async fn list_songs(&self) -> PortResult<Vec<Song>>;

    /// Songs whose `field` contains every term, case-insensitively.
    async fn search_songs(&self, field: SearchField, terms: &[String]) -> PortResult<Vec<Song>>;

    async fn songs_uploaded_by(&self, user_id: Uuid) -> PortResult<Vec<Song>>;

    async fn songs_liked_by(&self, user_id: Uuid) -> PortResult<Vec<Song>>;

    async fn songs_saved_by(&self, user_id: Uuid) -> PortResult<Vec<Song>>;

    /// Songs whose artist field equals `name` exactly, newest first.
    async fn songs_by_artist(&self, name: &str) -> PortResult<Vec<Song>>;

    async fn most_liked_songs(&self, limit: i64) -> PortResult<Vec<Song>>;

    async fn most_saved_songs(&self, limit: i64) -> PortResult<Vec<Song>>;

    /// Songs the user has played, ordered by the user's play counter descending.
    async fn most_played_by(&self, user_id: Uuid, limit: i64) -> PortResult<Vec<Song>>;

    /// Returns whether the user likes the song after the toggle.
    async fn toggle_song_like(&self, song_id: Uuid, user_id: Uuid) -> PortResult<bool>;

    /// Returns whether the user has the song saved after the toggle.
    async fn toggle_song_save(&self, song_id: Uuid, user_id: Uuid) -> PortResult<bool>;

    /// Adds one to the song's total counter and to the user's counter.
    async fn increment_play_count(&self, song_id: Uuid, user_id: Uuid) -> PortResult<()>;

    // --- Play History ---

    /// Deletes every entry for the pair; returns how many were removed.
    async fn delete_history_for_pair(&self, user_id: Uuid, song_id: Uuid) -> PortResult<u64>;

    async fn insert_history(&self, entry: HistoryEntry) -> PortResult<()>;

    /// Most recent first, at most `limit` entries.
    async fn list_recent_history(&self, user_id: Uuid, limit: i64) -> PortResult<Vec<HistoryEntry>>;

    /// Deletes every entry owned by the user; returns how many were removed.
    async fn clear_history(&self, user_id: Uuid) -> PortResult<u64>;

    /// Number of entries for the pair with `played_at >= since`.
    async fn count_recent_plays(
        &self,
        user_id: Uuid,
        song_id: Uuid,
        since: DateTime<Utc>,
    ) -> PortResult<i64>;

    /// Entries with `from <= played_at <= to`, oldest first.
    async fn history_between(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> PortResult<Vec<HistoryEntry>>;

    // --- Playlists ---
    async fn create_playlist(&self, playlist: NewPlaylist) -> PortResult<Playlist>;

    async fn get_playlist(&self, playlist_id: Uuid) -> PortResult<Playlist>;

    async fn list_public_playlists(&self) -> PortResult<Vec<Playlist>>;

    /// User-kind playlists created by the user.
    async fn playlists_created_by(&self, user_id: Uuid) -> PortResult<Vec<Playlist>>;

    async fn update_playlist(&self, playlist_id: Uuid, update: PlaylistUpdate) -> PortResult<Playlist>;

    async fn delete_playlist(&self, playlist_id: Uuid) -> PortResult<()>;

    /// Appends the song; `PortError::InvalidInput` when it is already present.
    async fn add_song_to_playlist(&self, playlist_id: Uuid, song_id: Uuid) -> PortResult<()>;

    /// Returns false when the song was not in the playlist.
    async fn remove_song_from_playlist(&self, playlist_id: Uuid, song_id: Uuid) -> PortResult<bool>;

    // --- Artists ---
    async fn create_artist(&self, artist: NewArtist) -> PortResult<Artist>;

    async fn get_artist(&self, artist_id: Uuid) -> PortResult<Artist>;

    async fn list_artists(&self) -> PortResult<Vec<Artist>>;

    async fn update_artist(&self, artist_id: Uuid, update: ArtistUpdate) -> PortResult<Artist>;

    async fn delete_artist(&self, artist_id: Uuid) -> PortResult<()>;

    /// Adds the follower; returns false when the user already follows.
    async fn follow_artist(&self, artist_id: Uuid, user_id: Uuid) -> PortResult<bool>;

    /// Removes the follower; returns false when the user was not following.
    async fn unfollow_artist(&self, artist_id: Uuid, user_id: Uuid) -> PortResult<bool>;

    async fn artists_followed_by(&self, user_id: Uuid) -> PortResult<Vec<Artist>>;

    // --- Direct Messages ---

    /// Stores the message in the pair's conversation, opening the
    /// conversation when this is the first message between them.
    async fn send_message(&self, message: NewMessage) -> PortResult<Message>;

    async fn find_conversation(&self, a: Uuid, b: Uuid) -> PortResult<Option<Conversation>>;

    /// Oldest first.
    async fn conversation_messages(&self, conversation_id: Uuid) -> PortResult<Vec<Message>>;

    async fn get_message(&self, message_id: Uuid) -> PortResult<Message>;

    async fn delete_message(&self, message_id: Uuid) -> PortResult<()>;
}
