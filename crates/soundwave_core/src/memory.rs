//! crates/soundwave_core/src/memory.rs
//!
//! An in-memory implementation of the `DatabaseService` port. Backs the test
//! suites and local runs started with `DATABASE_URL=memory`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{
    Artist, ArtistUpdate, Conversation, HistoryEntry, Message, NewArtist, NewMessage, NewPlaylist,
    NewSong, Playlist, PlaylistKind, PlaylistUpdate, SearchField, Song,
};
use crate::ports::{DatabaseService, PortError, PortResult};

#[derive(Default)]
struct Collections {
    auth_sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
    // Vectors keep insertion order, which listings preserve.
    songs: Vec<Song>,
    history: Vec<HistoryEntry>,
    playlists: Vec<Playlist>,
    artists: Vec<Artist>,
    conversations: Vec<Conversation>,
    messages: Vec<Message>,
}

impl Collections {
    fn song_mut(&mut self, song_id: Uuid) -> PortResult<&mut Song> {
        self.songs
            .iter_mut()
            .find(|s| s.id == song_id)
            .ok_or_else(|| PortError::NotFound(format!("Song {} not found", song_id)))
    }

    fn playlist_mut(&mut self, playlist_id: Uuid) -> PortResult<&mut Playlist> {
        self.playlists
            .iter_mut()
            .find(|p| p.id == playlist_id)
            .ok_or_else(|| PortError::NotFound(format!("Playlist {} not found", playlist_id)))
    }

    fn artist_mut(&mut self, artist_id: Uuid) -> PortResult<&mut Artist> {
        self.artists
            .iter_mut()
            .find(|a| a.id == artist_id)
            .ok_or_else(|| PortError::NotFound(format!("Artist {} not found", artist_id)))
    }

    fn conversation_between(&self, a: Uuid, b: Uuid) -> Option<&Conversation> {
        let key = Conversation::key(a, b);
        self.conversations.iter().find(|c| c.participants == key)
    }

    fn songs_where(&self, keep: impl Fn(&Song) -> bool) -> Vec<Song> {
        self.songs.iter().filter(|s| keep(s)).cloned().collect()
    }

    fn top_songs_by(&self, limit: i64, score: impl Fn(&Song) -> i64) -> Vec<Song> {
        let mut songs = self.songs.clone();
        // Stable sort: equal scores keep insertion order.
        songs.sort_by_key(|s| std::cmp::Reverse(score(s)));
        songs.truncate(limit.max(0) as usize);
        songs
    }
}

#[derive(Default)]
pub struct InMemoryDatabase {
    inner: RwLock<Collections>,
    failures: Mutex<HashMap<&'static str, PortError>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session token issued elsewhere.
    pub async fn insert_auth_session(&self, token: &str, user_id: Uuid, expires_at: DateTime<Utc>) {
        self.inner
            .write()
            .await
            .auth_sessions
            .insert(token.to_string(), (user_id, expires_at));
    }

    /// Makes every later call of the named port method fail with `error`
    /// until `restore` is called. Used to simulate a degraded backend.
    pub fn fail_operation(&self, operation: &'static str, error: PortError) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(operation, error);
        }
    }

    pub fn restore(&self, operation: &str) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.remove(operation);
        }
    }

    fn injected(&self, operation: &str) -> PortResult<()> {
        match self.failures.lock() {
            Ok(failures) => match failures.get(operation) {
                Some(error) => Err(error.clone()),
                None => Ok(()),
            },
            Err(_) => Ok(()),
        }
    }
}

#[async_trait]
impl DatabaseService for InMemoryDatabase {
    async fn validate_auth_session(&self, token: &str) -> PortResult<Uuid> {
        self.injected("validate_auth_session")?;
        let store = self.inner.read().await;
        match store.auth_sessions.get(token) {
            Some((user_id, expires_at)) if *expires_at > Utc::now() => Ok(*user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    // --- Songs ---

    async fn create_song(&self, song: NewSong) -> PortResult<Song> {
        self.injected("create_song")?;
        let song = song.into_song(Utc::now());
        self.inner.write().await.songs.push(song.clone());
        Ok(song)
    }

    async fn get_song(&self, song_id: Uuid) -> PortResult<Song> {
        self.injected("get_song")?;
        self.inner
            .read()
            .await
            .songs
            .iter()
            .find(|s| s.id == song_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Song {} not found", song_id)))
    }

    async fn get_songs_by_ids(&self, song_ids: &[Uuid]) -> PortResult<Vec<Song>> {
        self.injected("get_songs_by_ids")?;
        Ok(self.inner.read().await.songs_where(|s| song_ids.contains(&s.id)))
    }

    async fn list_songs(&self) -> PortResult<Vec<Song>> {
        self.injected("list_songs")?;
        Ok(self.inner.read().await.songs.clone())
    }

    async fn search_songs(&self, field: SearchField, terms: &[String]) -> PortResult<Vec<Song>> {
        self.injected("search_songs")?;
        let terms: Vec<String> = terms.iter().map(|t| t.to_lowercase()).collect();
        Ok(self.inner.read().await.songs_where(|s| {
            let value = field.value_of(s).to_lowercase();
            terms.iter().all(|t| value.contains(t.as_str()))
        }))
    }

    async fn songs_uploaded_by(&self, user_id: Uuid) -> PortResult<Vec<Song>> {
        self.injected("songs_uploaded_by")?;
        Ok(self.inner.read().await.songs_where(|s| s.uploaded_by == user_id))
    }

    async fn songs_liked_by(&self, user_id: Uuid) -> PortResult<Vec<Song>> {
        self.injected("songs_liked_by")?;
        Ok(self.inner.read().await.songs_where(|s| s.likes.contains(&user_id)))
    }

    async fn songs_saved_by(&self, user_id: Uuid) -> PortResult<Vec<Song>> {
        self.injected("songs_saved_by")?;
        Ok(self.inner.read().await.songs_where(|s| s.saves.contains(&user_id)))
    }

    async fn songs_by_artist(&self, name: &str) -> PortResult<Vec<Song>> {
        self.injected("songs_by_artist")?;
        let mut songs = self.inner.read().await.songs_where(|s| s.artist == name);
        songs.reverse();
        Ok(songs)
    }

    async fn most_liked_songs(&self, limit: i64) -> PortResult<Vec<Song>> {
        self.injected("most_liked_songs")?;
        Ok(self.inner.read().await.top_songs_by(limit, |s| s.likes.len() as i64))
    }

    async fn most_saved_songs(&self, limit: i64) -> PortResult<Vec<Song>> {
        self.injected("most_saved_songs")?;
        Ok(self.inner.read().await.top_songs_by(limit, |s| s.saves.len() as i64))
    }

    async fn most_played_by(&self, user_id: Uuid, limit: i64) -> PortResult<Vec<Song>> {
        self.injected("most_played_by")?;
        let store = self.inner.read().await;
        let mut songs = store.top_songs_by(i64::MAX, |s| s.plays_by(user_id));
        songs.retain(|s| s.plays_by(user_id) > 0);
        songs.truncate(limit.max(0) as usize);
        Ok(songs)
    }

    async fn toggle_song_like(&self, song_id: Uuid, user_id: Uuid) -> PortResult<bool> {
        self.injected("toggle_song_like")?;
        let mut store = self.inner.write().await;
        let song = store.song_mut(song_id)?;
        Ok(toggle_member(&mut song.likes, user_id))
    }

    async fn toggle_song_save(&self, song_id: Uuid, user_id: Uuid) -> PortResult<bool> {
        self.injected("toggle_song_save")?;
        let mut store = self.inner.write().await;
        let song = store.song_mut(song_id)?;
        Ok(toggle_member(&mut song.saves, user_id))
    }

    async fn increment_play_count(&self, song_id: Uuid, user_id: Uuid) -> PortResult<()> {
        self.injected("increment_play_count")?;
        let mut store = self.inner.write().await;
        store.song_mut(song_id)?.count_play(user_id);
        Ok(())
    }

    // --- Play History ---

    async fn delete_history_for_pair(&self, user_id: Uuid, song_id: Uuid) -> PortResult<u64> {
        self.injected("delete_history_for_pair")?;
        let mut store = self.inner.write().await;
        let before = store.history.len();
        store
            .history
            .retain(|e| !(e.user_id == user_id && e.song_id == song_id));
        Ok((before - store.history.len()) as u64)
    }

    async fn insert_history(&self, entry: HistoryEntry) -> PortResult<()> {
        self.injected("insert_history")?;
        self.inner.write().await.history.push(entry);
        Ok(())
    }

    async fn list_recent_history(&self, user_id: Uuid, limit: i64) -> PortResult<Vec<HistoryEntry>> {
        self.injected("list_recent_history")?;
        let store = self.inner.read().await;
        let mut entries: Vec<HistoryEntry> = store
            .history
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.played_at.cmp(&a.played_at));
        entries.truncate(limit.max(0) as usize);
        Ok(entries)
    }

    async fn clear_history(&self, user_id: Uuid) -> PortResult<u64> {
        self.injected("clear_history")?;
        let mut store = self.inner.write().await;
        let before = store.history.len();
        store.history.retain(|e| e.user_id != user_id);
        Ok((before - store.history.len()) as u64)
    }

    async fn count_recent_plays(
        &self,
        user_id: Uuid,
        song_id: Uuid,
        since: DateTime<Utc>,
    ) -> PortResult<i64> {
        self.injected("count_recent_plays")?;
        let store = self.inner.read().await;
        let count = store
            .history
            .iter()
            .filter(|e| e.user_id == user_id && e.song_id == song_id && e.played_at >= since)
            .count();
        Ok(count as i64)
    }

    async fn history_between(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> PortResult<Vec<HistoryEntry>> {
        self.injected("history_between")?;
        let store = self.inner.read().await;
        let mut entries: Vec<HistoryEntry> = store
            .history
            .iter()
            .filter(|e| e.user_id == user_id && e.played_at >= from && e.played_at <= to)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.played_at);
        Ok(entries)
    }

    // --- Playlists ---

    async fn create_playlist(&self, playlist: NewPlaylist) -> PortResult<Playlist> {
        self.injected("create_playlist")?;
        let playlist = playlist.into_playlist(Utc::now());
        self.inner.write().await.playlists.push(playlist.clone());
        Ok(playlist)
    }

    async fn get_playlist(&self, playlist_id: Uuid) -> PortResult<Playlist> {
        self.injected("get_playlist")?;
        self.inner
            .read()
            .await
            .playlists
            .iter()
            .find(|p| p.id == playlist_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Playlist {} not found", playlist_id)))
    }

    async fn list_public_playlists(&self) -> PortResult<Vec<Playlist>> {
        self.injected("list_public_playlists")?;
        let store = self.inner.read().await;
        Ok(store.playlists.iter().filter(|p| p.is_public).cloned().collect())
    }

    async fn playlists_created_by(&self, user_id: Uuid) -> PortResult<Vec<Playlist>> {
        self.injected("playlists_created_by")?;
        let store = self.inner.read().await;
        Ok(store
            .playlists
            .iter()
            .filter(|p| p.kind == PlaylistKind::User && p.is_owned_by(user_id))
            .cloned()
            .collect())
    }

    async fn update_playlist(&self, playlist_id: Uuid, update: PlaylistUpdate) -> PortResult<Playlist> {
        self.injected("update_playlist")?;
        let mut store = self.inner.write().await;
        let playlist = store.playlist_mut(playlist_id)?;
        update.apply_to(playlist, Utc::now());
        Ok(playlist.clone())
    }

    async fn delete_playlist(&self, playlist_id: Uuid) -> PortResult<()> {
        self.injected("delete_playlist")?;
        let mut store = self.inner.write().await;
        let before = store.playlists.len();
        store.playlists.retain(|p| p.id != playlist_id);
        if store.playlists.len() == before {
            return Err(PortError::NotFound(format!("Playlist {} not found", playlist_id)));
        }
        Ok(())
    }

    async fn add_song_to_playlist(&self, playlist_id: Uuid, song_id: Uuid) -> PortResult<()> {
        self.injected("add_song_to_playlist")?;
        let mut store = self.inner.write().await;
        let playlist = store.playlist_mut(playlist_id)?;
        if playlist.song_ids.contains(&song_id) {
            return Err(PortError::InvalidInput("Song already exists in playlist".to_string()));
        }
        playlist.song_ids.push(song_id);
        playlist.updated_at = Utc::now();
        Ok(())
    }

    async fn remove_song_from_playlist(&self, playlist_id: Uuid, song_id: Uuid) -> PortResult<bool> {
        self.injected("remove_song_from_playlist")?;
        let mut store = self.inner.write().await;
        let playlist = store.playlist_mut(playlist_id)?;
        let before = playlist.song_ids.len();
        playlist.song_ids.retain(|id| *id != song_id);
        let removed = playlist.song_ids.len() != before;
        if removed {
            playlist.updated_at = Utc::now();
        }
        Ok(removed)
    }

    // --- Artists ---

    async fn create_artist(&self, artist: NewArtist) -> PortResult<Artist> {
        self.injected("create_artist")?;
        let artist = artist.into_artist(Utc::now());
        self.inner.write().await.artists.push(artist.clone());
        Ok(artist)
    }

    async fn get_artist(&self, artist_id: Uuid) -> PortResult<Artist> {
        self.injected("get_artist")?;
        self.inner
            .read()
            .await
            .artists
            .iter()
            .find(|a| a.id == artist_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Artist {} not found", artist_id)))
    }

    async fn list_artists(&self) -> PortResult<Vec<Artist>> {
        self.injected("list_artists")?;
        Ok(self.inner.read().await.artists.clone())
    }

    async fn update_artist(&self, artist_id: Uuid, update: ArtistUpdate) -> PortResult<Artist> {
        self.injected("update_artist")?;
        let mut store = self.inner.write().await;
        let artist = store.artist_mut(artist_id)?;
        update.apply_to(artist, Utc::now());
        Ok(artist.clone())
    }

    async fn delete_artist(&self, artist_id: Uuid) -> PortResult<()> {
        self.injected("delete_artist")?;
        let mut store = self.inner.write().await;
        let before = store.artists.len();
        store.artists.retain(|a| a.id != artist_id);
        if store.artists.len() == before {
            return Err(PortError::NotFound(format!("Artist {} not found", artist_id)));
        }
        Ok(())
    }

    async fn follow_artist(&self, artist_id: Uuid, user_id: Uuid) -> PortResult<bool> {
        self.injected("follow_artist")?;
        let mut store = self.inner.write().await;
        let artist = store.artist_mut(artist_id)?;
        if artist.is_followed_by(user_id) {
            return Ok(false);
        }
        artist.followers.push(user_id);
        artist.updated_at = Utc::now();
        Ok(true)
    }

    async fn unfollow_artist(&self, artist_id: Uuid, user_id: Uuid) -> PortResult<bool> {
        self.injected("unfollow_artist")?;
        let mut store = self.inner.write().await;
        let artist = store.artist_mut(artist_id)?;
        if !artist.is_followed_by(user_id) {
            return Ok(false);
        }
        artist.followers.retain(|id| *id != user_id);
        artist.updated_at = Utc::now();
        Ok(true)
    }

    async fn artists_followed_by(&self, user_id: Uuid) -> PortResult<Vec<Artist>> {
        self.injected("artists_followed_by")?;
        let store = self.inner.read().await;
        Ok(store
            .artists
            .iter()
            .filter(|a| a.is_followed_by(user_id))
            .cloned()
            .collect())
    }

    // --- Direct Messages ---

    async fn send_message(&self, message: NewMessage) -> PortResult<Message> {
        self.injected("send_message")?;
        let now = Utc::now();
        let mut store = self.inner.write().await;
        let key = Conversation::key(message.sender_id, message.receiver_id);
        let conversation_id = match store.conversations.iter_mut().find(|c| c.participants == key) {
            Some(conversation) => {
                conversation.updated_at = now;
                conversation.id
            }
            None => {
                let conversation = Conversation::between(message.sender_id, message.receiver_id, now);
                let id = conversation.id;
                store.conversations.push(conversation);
                id
            }
        };
        let message = message.into_message(conversation_id, now);
        store.messages.push(message.clone());
        Ok(message)
    }

    async fn find_conversation(&self, a: Uuid, b: Uuid) -> PortResult<Option<Conversation>> {
        self.injected("find_conversation")?;
        Ok(self.inner.read().await.conversation_between(a, b).cloned())
    }

    async fn conversation_messages(&self, conversation_id: Uuid) -> PortResult<Vec<Message>> {
        self.injected("conversation_messages")?;
        let store = self.inner.read().await;
        let mut messages: Vec<Message> = store
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.sent_at);
        Ok(messages)
    }

    async fn get_message(&self, message_id: Uuid) -> PortResult<Message> {
        self.injected("get_message")?;
        self.inner
            .read()
            .await
            .messages
            .iter()
            .find(|m| m.id == message_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Message {} not found", message_id)))
    }

    async fn delete_message(&self, message_id: Uuid) -> PortResult<()> {
        self.injected("delete_message")?;
        let mut store = self.inner.write().await;
        let before = store.messages.len();
        store.messages.retain(|m| m.id != message_id);
        if store.messages.len() == before {
            return Err(PortError::NotFound(format!("Message {} not found", message_id)));
        }
        Ok(())
    }
}

/// Adds `user_id` when absent and removes it when present; returns membership after.
fn toggle_member(members: &mut Vec<Uuid>, user_id: Uuid) -> bool {
    if let Some(pos) = members.iter().position(|id| *id == user_id) {
        members.remove(pos);
        false
    } else {
        members.push(user_id);
        true
    }
}
