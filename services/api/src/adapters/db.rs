//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use soundwave_core::domain::{
    Artist, ArtistUpdate, Conversation, HistoryEntry, Message, NewArtist, NewMessage, NewPlaylist,
    NewSong, Playlist, PlaylistKind, PlaylistUpdate, SearchField, SocialLinks, Song,
};
use soundwave_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use std::collections::BTreeMap;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn playlist_exists(&self, playlist_id: Uuid) -> PortResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM playlists WHERE id = $1)")
            .bind(playlist_id)
            .fetch_one(&self.pool)
            .await
            .map_err(storage_error)
    }

    async fn artist_exists(&self, artist_id: Uuid) -> PortResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM artists WHERE id = $1)")
            .bind(artist_id)
            .fetch_one(&self.pool)
            .await
            .map_err(storage_error)
    }

    async fn songs_matching(&self, filter: &str, user_id: Uuid) -> PortResult<Vec<Song>> {
        let sql = format!(
            "SELECT {} FROM songs WHERE {} ORDER BY created_at ASC",
            SONG_COLUMNS, filter
        );
        let records = sqlx::query_as::<_, SongRecord>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(records.into_iter().map(SongRecord::to_domain).collect())
    }

    async fn top_songs_by(&self, order: &str, limit: i64) -> PortResult<Vec<Song>> {
        let sql = format!(
            "SELECT {} FROM songs ORDER BY {} DESC, created_at ASC LIMIT $1",
            SONG_COLUMNS, order
        );
        let records = sqlx::query_as::<_, SongRecord>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(records.into_iter().map(SongRecord::to_domain).collect())
    }

    async fn toggle_membership(&self, column: &str, song_id: Uuid, user_id: Uuid) -> PortResult<bool> {
        let sql = format!(
            "UPDATE songs SET {col} = CASE WHEN $2 = ANY({col}) THEN array_remove({col}, $2) \
             ELSE array_append({col}, $2) END, updated_at = NOW() \
             WHERE id = $1 RETURNING $2 = ANY({col})",
            col = column
        );
        sqlx::query_scalar::<_, bool>(&sql)
            .bind(song_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| PortError::NotFound(format!("Song {} not found", song_id)))
    }
}

/// Maps driver errors onto the port taxonomy.
fn storage_error(e: sqlx::Error) -> PortError {
    match &e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            PortError::Unavailable(e.to_string())
        }
        _ => PortError::Unexpected(e.to_string()),
    }
}

/// Escapes LIKE wildcards so user terms match literally.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const SONG_COLUMNS: &str = "id, title, artist, album, genre, language, info, file_url, image_url, \
    duration_secs, uploaded_by, likes, saves, play_count, user_play_counts, release_date, \
    created_at, updated_at";

#[derive(FromRow)]
struct SongRecord {
    id: Uuid,
    title: String,
    artist: String,
    album: Option<String>,
    genre: Option<String>,
    language: Option<String>,
    info: Option<String>,
    file_url: String,
    image_url: Option<String>,
    duration_secs: Option<i32>,
    uploaded_by: Uuid,
    likes: Vec<Uuid>,
    saves: Vec<Uuid>,
    play_count: i64,
    user_play_counts: Json<BTreeMap<Uuid, i64>>,
    release_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl SongRecord {
    fn to_domain(self) -> Song {
        Song {
            id: self.id,
            title: self.title,
            artist: self.artist,
            album: self.album,
            genre: self.genre,
            language: self.language,
            info: self.info,
            file_url: self.file_url,
            image_url: self.image_url,
            duration_secs: self.duration_secs,
            uploaded_by: self.uploaded_by,
            likes: self.likes,
            saves: self.saves,
            play_count: self.play_count,
            user_play_counts: self.user_play_counts.0,
            release_date: self.release_date,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct HistoryRecord {
    id: Uuid,
    user_id: Uuid,
    song_id: Uuid,
    played_at: DateTime<Utc>,
    duration: Option<i32>,
}
impl HistoryRecord {
    fn to_domain(self) -> HistoryEntry {
        HistoryEntry {
            id: self.id,
            user_id: self.user_id,
            song_id: self.song_id,
            played_at: self.played_at,
            duration: self.duration,
        }
    }
}

const PLAYLIST_COLUMNS: &str = "id, name, description, cover_image, creator_id, kind, tags, \
    song_ids, is_public, is_seeded, play_count, created_at, updated_at";

#[derive(FromRow)]
struct PlaylistRecord {
    id: Uuid,
    name: String,
    description: String,
    cover_image: Option<String>,
    creator_id: Option<Uuid>,
    kind: String,
    tags: Vec<String>,
    song_ids: Vec<Uuid>,
    is_public: bool,
    is_seeded: bool,
    play_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl PlaylistRecord {
    fn to_domain(self) -> PortResult<Playlist> {
        let kind = PlaylistKind::parse(&self.kind).ok_or_else(|| {
            PortError::Unexpected(format!("Playlist {} has unknown kind '{}'", self.id, self.kind))
        })?;
        Ok(Playlist {
            id: self.id,
            name: self.name,
            description: self.description,
            cover_image: self.cover_image,
            creator_id: self.creator_id,
            kind,
            tags: self.tags,
            song_ids: self.song_ids,
            is_public: self.is_public,
            is_seeded: self.is_seeded,
            play_count: self.play_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const ARTIST_COLUMNS: &str = "id, name, bio, genres, image_url, followers, verified, instagram, \
    twitter, facebook, website, created_at, updated_at";

#[derive(FromRow)]
struct ArtistRecord {
    id: Uuid,
    name: String,
    bio: Option<String>,
    genres: Vec<String>,
    image_url: Option<String>,
    followers: Vec<Uuid>,
    verified: bool,
    instagram: Option<String>,
    twitter: Option<String>,
    facebook: Option<String>,
    website: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl ArtistRecord {
    fn to_domain(self) -> Artist {
        Artist {
            id: self.id,
            name: self.name,
            bio: self.bio,
            genres: self.genres,
            image_url: self.image_url,
            followers: self.followers,
            verified: self.verified,
            social_links: SocialLinks {
                instagram: self.instagram,
                twitter: self.twitter,
                facebook: self.facebook,
                website: self.website,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct ConversationRecord {
    id: Uuid,
    participant_a: Uuid,
    participant_b: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl ConversationRecord {
    fn to_domain(self) -> Conversation {
        Conversation {
            id: self.id,
            participants: (self.participant_a, self.participant_b),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const MESSAGE_COLUMNS: &str =
    "id, conversation_id, sender_id, receiver_id, message_text, photo_url, sent_at";

#[derive(FromRow)]
struct MessageRecord {
    id: Uuid,
    conversation_id: Uuid,
    sender_id: Uuid,
    receiver_id: Uuid,
    message_text: Option<String>,
    photo_url: Option<String>,
    sent_at: DateTime<Utc>,
}
impl MessageRecord {
    fn to_domain(self) -> Message {
        Message {
            id: self.id,
            conversation_id: self.conversation_id,
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            text: self.message_text,
            photo_url: self.photo_url,
            sent_at: self.sent_at,
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn validate_auth_session(&self, token: &str) -> PortResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?
        .ok_or(PortError::Unauthorized)
    }

    // --- Songs ---

    async fn create_song(&self, song: NewSong) -> PortResult<Song> {
        let song = song.into_song(Utc::now());
        sqlx::query(
            "INSERT INTO songs (id, title, artist, album, genre, language, info, file_url, image_url, \
             duration_secs, uploaded_by, release_date, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(song.id)
        .bind(&song.title)
        .bind(&song.artist)
        .bind(&song.album)
        .bind(&song.genre)
        .bind(&song.language)
        .bind(&song.info)
        .bind(&song.file_url)
        .bind(&song.image_url)
        .bind(song.duration_secs)
        .bind(song.uploaded_by)
        .bind(song.release_date)
        .bind(song.created_at)
        .bind(song.updated_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(song)
    }

    async fn get_song(&self, song_id: Uuid) -> PortResult<Song> {
        let sql = format!("SELECT {} FROM songs WHERE id = $1", SONG_COLUMNS);
        let record = sqlx::query_as::<_, SongRecord>(&sql)
            .bind(song_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => PortError::NotFound(format!("Song {} not found", song_id)),
                other => storage_error(other),
            })?;
        Ok(record.to_domain())
    }

    async fn get_songs_by_ids(&self, song_ids: &[Uuid]) -> PortResult<Vec<Song>> {
        let sql = format!("SELECT {} FROM songs WHERE id = ANY($1)", SONG_COLUMNS);
        let records = sqlx::query_as::<_, SongRecord>(&sql)
            .bind(song_ids.to_vec())
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(records.into_iter().map(SongRecord::to_domain).collect())
    }

    async fn list_songs(&self) -> PortResult<Vec<Song>> {
        let sql = format!("SELECT {} FROM songs ORDER BY created_at ASC", SONG_COLUMNS);
        let records = sqlx::query_as::<_, SongRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(records.into_iter().map(SongRecord::to_domain).collect())
    }

    async fn search_songs(&self, field: SearchField, terms: &[String]) -> PortResult<Vec<Song>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM songs WHERE TRUE", SONG_COLUMNS));
        for term in terms {
            builder
                .push(" AND COALESCE(")
                .push(field.column())
                .push(", '') ILIKE ")
                .push_bind(like_pattern(term));
        }
        builder.push(" ORDER BY created_at ASC");

        let records = builder
            .build_query_as::<SongRecord>()
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(records.into_iter().map(SongRecord::to_domain).collect())
    }

    async fn songs_uploaded_by(&self, user_id: Uuid) -> PortResult<Vec<Song>> {
        self.songs_matching("uploaded_by = $1", user_id).await
    }

    async fn songs_liked_by(&self, user_id: Uuid) -> PortResult<Vec<Song>> {
        self.songs_matching("$1 = ANY(likes)", user_id).await
    }

    async fn songs_saved_by(&self, user_id: Uuid) -> PortResult<Vec<Song>> {
        self.songs_matching("$1 = ANY(saves)", user_id).await
    }

    async fn songs_by_artist(&self, name: &str) -> PortResult<Vec<Song>> {
        let sql = format!(
            "SELECT {} FROM songs WHERE artist = $1 ORDER BY created_at DESC",
            SONG_COLUMNS
        );
        let records = sqlx::query_as::<_, SongRecord>(&sql)
            .bind(name)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(records.into_iter().map(SongRecord::to_domain).collect())
    }

    async fn most_liked_songs(&self, limit: i64) -> PortResult<Vec<Song>> {
        self.top_songs_by("cardinality(likes)", limit).await
    }

    async fn most_saved_songs(&self, limit: i64) -> PortResult<Vec<Song>> {
        self.top_songs_by("cardinality(saves)", limit).await
    }

    async fn most_played_by(&self, user_id: Uuid, limit: i64) -> PortResult<Vec<Song>> {
        let sql = format!(
            "SELECT {} FROM songs WHERE (user_play_counts ->> $1) IS NOT NULL \
             ORDER BY (user_play_counts ->> $1)::bigint DESC, created_at ASC LIMIT $2",
            SONG_COLUMNS
        );
        let records = sqlx::query_as::<_, SongRecord>(&sql)
            .bind(user_id.to_string())
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(records.into_iter().map(SongRecord::to_domain).collect())
    }

    async fn toggle_song_like(&self, song_id: Uuid, user_id: Uuid) -> PortResult<bool> {
        self.toggle_membership("likes", song_id, user_id).await
    }

    async fn toggle_song_save(&self, song_id: Uuid, user_id: Uuid) -> PortResult<bool> {
        self.toggle_membership("saves", song_id, user_id).await
    }

    async fn increment_play_count(&self, song_id: Uuid, user_id: Uuid) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE songs SET play_count = play_count + 1, \
             user_play_counts = jsonb_set(user_play_counts, ARRAY[$2], \
                 to_jsonb(COALESCE((user_play_counts ->> $2)::bigint, 0) + 1)), \
             updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(song_id)
        .bind(user_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Song {} not found", song_id)));
        }
        Ok(())
    }

    // --- Play History ---

    async fn delete_history_for_pair(&self, user_id: Uuid, song_id: Uuid) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM history WHERE user_id = $1 AND song_id = $2")
            .bind(user_id)
            .bind(song_id)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(result.rows_affected())
    }

    async fn insert_history(&self, entry: HistoryEntry) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO history (id, user_id, song_id, played_at, duration) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(entry.id)
        .bind(entry.user_id)
        .bind(entry.song_id)
        .bind(entry.played_at)
        .bind(entry.duration)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }

    async fn list_recent_history(&self, user_id: Uuid, limit: i64) -> PortResult<Vec<HistoryEntry>> {
        let records = sqlx::query_as::<_, HistoryRecord>(
            "SELECT id, user_id, song_id, played_at, duration FROM history \
             WHERE user_id = $1 ORDER BY played_at DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(records.into_iter().map(HistoryRecord::to_domain).collect())
    }

    async fn clear_history(&self, user_id: Uuid) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM history WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(result.rows_affected())
    }

    async fn count_recent_plays(
        &self,
        user_id: Uuid,
        song_id: Uuid,
        since: DateTime<Utc>,
    ) -> PortResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM history WHERE user_id = $1 AND song_id = $2 AND played_at >= $3",
        )
        .bind(user_id)
        .bind(song_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error)
    }

    async fn history_between(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> PortResult<Vec<HistoryEntry>> {
        let records = sqlx::query_as::<_, HistoryRecord>(
            "SELECT id, user_id, song_id, played_at, duration FROM history \
             WHERE user_id = $1 AND played_at >= $2 AND played_at <= $3 ORDER BY played_at ASC",
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(records.into_iter().map(HistoryRecord::to_domain).collect())
    }

    // --- Playlists ---

    async fn create_playlist(&self, playlist: NewPlaylist) -> PortResult<Playlist> {
        let playlist = playlist.into_playlist(Utc::now());
        sqlx::query(
            "INSERT INTO playlists (id, name, description, cover_image, creator_id, kind, tags, \
             song_ids, is_public, is_seeded, play_count, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(playlist.id)
        .bind(&playlist.name)
        .bind(&playlist.description)
        .bind(&playlist.cover_image)
        .bind(playlist.creator_id)
        .bind(playlist.kind.as_str())
        .bind(&playlist.tags)
        .bind(&playlist.song_ids)
        .bind(playlist.is_public)
        .bind(playlist.is_seeded)
        .bind(playlist.play_count)
        .bind(playlist.created_at)
        .bind(playlist.updated_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(playlist)
    }

    async fn get_playlist(&self, playlist_id: Uuid) -> PortResult<Playlist> {
        let sql = format!("SELECT {} FROM playlists WHERE id = $1", PLAYLIST_COLUMNS);
        sqlx::query_as::<_, PlaylistRecord>(&sql)
            .bind(playlist_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    PortError::NotFound(format!("Playlist {} not found", playlist_id))
                }
                other => storage_error(other),
            })?
            .to_domain()
    }

    async fn list_public_playlists(&self) -> PortResult<Vec<Playlist>> {
        let sql = format!(
            "SELECT {} FROM playlists WHERE is_public ORDER BY created_at ASC",
            PLAYLIST_COLUMNS
        );
        sqlx::query_as::<_, PlaylistRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?
            .into_iter()
            .map(PlaylistRecord::to_domain)
            .collect()
    }

    async fn playlists_created_by(&self, user_id: Uuid) -> PortResult<Vec<Playlist>> {
        let sql = format!(
            "SELECT {} FROM playlists WHERE creator_id = $1 AND kind = 'user' ORDER BY created_at ASC",
            PLAYLIST_COLUMNS
        );
        sqlx::query_as::<_, PlaylistRecord>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?
            .into_iter()
            .map(PlaylistRecord::to_domain)
            .collect()
    }

    async fn update_playlist(&self, playlist_id: Uuid, update: PlaylistUpdate) -> PortResult<Playlist> {
        let sql = format!(
            "UPDATE playlists SET name = COALESCE($2, name), \
             description = COALESCE($3, description), \
             cover_image = COALESCE($4, cover_image), \
             tags = COALESCE($5, tags), \
             is_public = COALESCE($6, is_public), \
             updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            PLAYLIST_COLUMNS
        );
        sqlx::query_as::<_, PlaylistRecord>(&sql)
            .bind(playlist_id)
            .bind(update.name)
            .bind(update.description)
            .bind(update.cover_image)
            .bind(update.tags)
            .bind(update.is_public)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| PortError::NotFound(format!("Playlist {} not found", playlist_id)))?
            .to_domain()
    }

    async fn delete_playlist(&self, playlist_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM playlists WHERE id = $1")
            .bind(playlist_id)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Playlist {} not found", playlist_id)));
        }
        Ok(())
    }

    async fn add_song_to_playlist(&self, playlist_id: Uuid, song_id: Uuid) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE playlists SET song_ids = array_append(song_ids, $2), updated_at = NOW() \
             WHERE id = $1 AND NOT ($2 = ANY(song_ids))",
        )
        .bind(playlist_id)
        .bind(song_id)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        if result.rows_affected() > 0 {
            return Ok(());
        }
        if self.playlist_exists(playlist_id).await? {
            Err(PortError::InvalidInput("Song already exists in playlist".to_string()))
        } else {
            Err(PortError::NotFound(format!("Playlist {} not found", playlist_id)))
        }
    }

    async fn remove_song_from_playlist(&self, playlist_id: Uuid, song_id: Uuid) -> PortResult<bool> {
        let result = sqlx::query(
            "UPDATE playlists SET song_ids = array_remove(song_ids, $2), updated_at = NOW() \
             WHERE id = $1 AND $2 = ANY(song_ids)",
        )
        .bind(playlist_id)
        .bind(song_id)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }
        if self.playlist_exists(playlist_id).await? {
            Ok(false)
        } else {
            Err(PortError::NotFound(format!("Playlist {} not found", playlist_id)))
        }
    }

    // --- Artists ---

    async fn create_artist(&self, artist: NewArtist) -> PortResult<Artist> {
        let artist = artist.into_artist(Utc::now());
        sqlx::query(
            "INSERT INTO artists (id, name, bio, genres, image_url, followers, verified, instagram, \
             twitter, facebook, website, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(artist.id)
        .bind(&artist.name)
        .bind(&artist.bio)
        .bind(&artist.genres)
        .bind(&artist.image_url)
        .bind(&artist.followers)
        .bind(artist.verified)
        .bind(&artist.social_links.instagram)
        .bind(&artist.social_links.twitter)
        .bind(&artist.social_links.facebook)
        .bind(&artist.social_links.website)
        .bind(artist.created_at)
        .bind(artist.updated_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(artist)
    }

    async fn get_artist(&self, artist_id: Uuid) -> PortResult<Artist> {
        let sql = format!("SELECT {} FROM artists WHERE id = $1", ARTIST_COLUMNS);
        let record = sqlx::query_as::<_, ArtistRecord>(&sql)
            .bind(artist_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    PortError::NotFound(format!("Artist {} not found", artist_id))
                }
                other => storage_error(other),
            })?;
        Ok(record.to_domain())
    }

    async fn list_artists(&self) -> PortResult<Vec<Artist>> {
        let sql = format!("SELECT {} FROM artists ORDER BY created_at ASC", ARTIST_COLUMNS);
        let records = sqlx::query_as::<_, ArtistRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(records.into_iter().map(ArtistRecord::to_domain).collect())
    }

    async fn update_artist(&self, artist_id: Uuid, update: ArtistUpdate) -> PortResult<Artist> {
        // Social links are replaced as a group when present.
        let replace_links = update.social_links.is_some();
        let links = update.social_links.unwrap_or_default();
        let sql = format!(
            "UPDATE artists SET name = COALESCE($2, name), \
             bio = COALESCE($3, bio), \
             genres = COALESCE($4, genres), \
             image_url = COALESCE($5, image_url), \
             verified = COALESCE($6, verified), \
             instagram = CASE WHEN $7 THEN $8 ELSE instagram END, \
             twitter = CASE WHEN $7 THEN $9 ELSE twitter END, \
             facebook = CASE WHEN $7 THEN $10 ELSE facebook END, \
             website = CASE WHEN $7 THEN $11 ELSE website END, \
             updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            ARTIST_COLUMNS
        );
        sqlx::query_as::<_, ArtistRecord>(&sql)
            .bind(artist_id)
            .bind(update.name)
            .bind(update.bio)
            .bind(update.genres)
            .bind(update.image_url)
            .bind(update.verified)
            .bind(replace_links)
            .bind(links.instagram)
            .bind(links.twitter)
            .bind(links.facebook)
            .bind(links.website)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?
            .map(ArtistRecord::to_domain)
            .ok_or_else(|| PortError::NotFound(format!("Artist {} not found", artist_id)))
    }

    async fn delete_artist(&self, artist_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM artists WHERE id = $1")
            .bind(artist_id)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Artist {} not found", artist_id)));
        }
        Ok(())
    }

    async fn follow_artist(&self, artist_id: Uuid, user_id: Uuid) -> PortResult<bool> {
        let result = sqlx::query(
            "UPDATE artists SET followers = array_append(followers, $2), updated_at = NOW() \
             WHERE id = $1 AND NOT ($2 = ANY(followers))",
        )
        .bind(artist_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }
        if self.artist_exists(artist_id).await? {
            Ok(false)
        } else {
            Err(PortError::NotFound(format!("Artist {} not found", artist_id)))
        }
    }

    async fn unfollow_artist(&self, artist_id: Uuid, user_id: Uuid) -> PortResult<bool> {
        let result = sqlx::query(
            "UPDATE artists SET followers = array_remove(followers, $2), updated_at = NOW() \
             WHERE id = $1 AND $2 = ANY(followers)",
        )
        .bind(artist_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }
        if self.artist_exists(artist_id).await? {
            Ok(false)
        } else {
            Err(PortError::NotFound(format!("Artist {} not found", artist_id)))
        }
    }

    async fn artists_followed_by(&self, user_id: Uuid) -> PortResult<Vec<Artist>> {
        let sql = format!(
            "SELECT {} FROM artists WHERE $1 = ANY(followers) ORDER BY created_at ASC",
            ARTIST_COLUMNS
        );
        let records = sqlx::query_as::<_, ArtistRecord>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(records.into_iter().map(ArtistRecord::to_domain).collect())
    }

    // --- Direct Messages ---

    async fn send_message(&self, message: NewMessage) -> PortResult<Message> {
        let now = Utc::now();
        let candidate = Conversation::between(message.sender_id, message.receiver_id, now);
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        let conversation_id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO conversations (id, participant_a, participant_b, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $4) \
             ON CONFLICT (participant_a, participant_b) DO UPDATE SET updated_at = EXCLUDED.updated_at \
             RETURNING id",
        )
        .bind(candidate.id)
        .bind(candidate.participants.0)
        .bind(candidate.participants.1)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(storage_error)?;

        let message = message.into_message(conversation_id, now);
        sqlx::query(
            "INSERT INTO messages (id, conversation_id, sender_id, receiver_id, message_text, \
             photo_url, sent_at) VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(message.id)
        .bind(message.conversation_id)
        .bind(message.sender_id)
        .bind(message.receiver_id)
        .bind(&message.text)
        .bind(&message.photo_url)
        .bind(message.sent_at)
        .execute(&mut *tx)
        .await
        .map_err(storage_error)?;

        tx.commit().await.map_err(storage_error)?;
        Ok(message)
    }

    async fn find_conversation(&self, a: Uuid, b: Uuid) -> PortResult<Option<Conversation>> {
        let (first, second) = Conversation::key(a, b);
        let record = sqlx::query_as::<_, ConversationRecord>(
            "SELECT id, participant_a, participant_b, created_at, updated_at FROM conversations \
             WHERE participant_a = $1 AND participant_b = $2",
        )
        .bind(first)
        .bind(second)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(record.map(ConversationRecord::to_domain))
    }

    async fn conversation_messages(&self, conversation_id: Uuid) -> PortResult<Vec<Message>> {
        let sql = format!(
            "SELECT {} FROM messages WHERE conversation_id = $1 ORDER BY sent_at ASC",
            MESSAGE_COLUMNS
        );
        let records = sqlx::query_as::<_, MessageRecord>(&sql)
            .bind(conversation_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(records.into_iter().map(MessageRecord::to_domain).collect())
    }

    async fn get_message(&self, message_id: Uuid) -> PortResult<Message> {
        let sql = format!("SELECT {} FROM messages WHERE id = $1", MESSAGE_COLUMNS);
        let record = sqlx::query_as::<_, MessageRecord>(&sql)
            .bind(message_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    PortError::NotFound(format!("Message {} not found", message_id))
                }
                other => storage_error(other),
            })?;
        Ok(record.to_domain())
    }

    async fn delete_message(&self, message_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(message_id)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Message {} not found", message_id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("raga"), "%raga%");
    }
}
