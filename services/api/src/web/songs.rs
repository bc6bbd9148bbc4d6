//! services/api/src/web/songs.rs
//!
//! Song catalogue endpoints. `GET /song/{song_id}` is also where plays are
//! recorded for authenticated listeners.

use crate::web::middleware::AuthUser;
use crate::web::rest::{bounded_text, port_failure, reject, ErrorBody, HandlerResult, PathId};
use crate::web::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use soundwave_core::{NewSong, SearchField, Song};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Songs returned by the top, saved and most-played listings.
const LIST_LIMIT: i64 = 10;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema, Debug)]
pub struct SongDto {
    pub id: Uuid,
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub language: Option<String>,
    pub info: Option<String>,
    pub file_url: String,
    pub image_url: Option<String>,
    pub duration_secs: Option<i32>,
    pub uploaded_by: Uuid,
    pub likes: Vec<Uuid>,
    pub saves: Vec<Uuid>,
    pub play_count: i64,
    /// Plays per listener, keyed by user id.
    pub user_play_counts: BTreeMap<String, i64>,
    /// The caller's own play count, present for authenticated callers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_plays: Option<i64>,
    pub release_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SongDto {
    pub fn for_viewer(song: Song, viewer: Option<Uuid>) -> Self {
        let my_plays = viewer.map(|id| song.plays_by(id));
        Self {
            id: song.id,
            title: song.title,
            artist: song.artist,
            album: song.album,
            genre: song.genre,
            language: song.language,
            info: song.info,
            file_url: song.file_url,
            image_url: song.image_url,
            duration_secs: song.duration_secs,
            uploaded_by: song.uploaded_by,
            likes: song.likes,
            saves: song.saves,
            play_count: song.play_count,
            user_play_counts: song
                .user_play_counts
                .into_iter()
                .map(|(user, plays)| (user.to_string(), plays))
                .collect(),
            my_plays,
            release_date: song.release_date,
            created_at: song.created_at,
            updated_at: song.updated_at,
        }
    }
}

impl From<Song> for SongDto {
    fn from(song: Song) -> Self {
        Self::for_viewer(song, None)
    }
}

#[derive(Serialize, ToSchema)]
pub struct SongResponse {
    pub song: SongDto,
    /// Whether this request counted as a new play.
    pub recorded: bool,
}

#[derive(Serialize, ToSchema)]
pub struct SongListResponse {
    pub songs: Vec<SongDto>,
    pub count: usize,
}

impl SongListResponse {
    pub(crate) fn of(songs: Vec<Song>, viewer: Option<Uuid>) -> Json<Self> {
        let songs: Vec<SongDto> = songs
            .into_iter()
            .map(|s| SongDto::for_viewer(s, viewer))
            .collect();
        Json(Self {
            count: songs.len(),
            songs,
        })
    }
}

#[derive(Serialize, ToSchema)]
pub struct SearchResponse {
    pub songs: Vec<SongDto>,
    #[serde(rename = "type")]
    pub search_type: String,
    pub count: usize,
}

#[derive(Serialize, ToSchema)]
pub struct SongCreatedResponse {
    pub message: String,
    pub song: SongDto,
}

#[derive(Serialize, ToSchema)]
pub struct LikeToggleResponse {
    pub message: String,
    pub liked: bool,
}

#[derive(Serialize, ToSchema)]
pub struct SaveToggleResponse {
    pub message: String,
    pub saved: bool,
}

/// Song metadata; the audio itself is already hosted at `file_url`.
#[derive(Deserialize, ToSchema)]
pub struct NewSongRequest {
    pub title: String,
    pub artist: String,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub language: Option<String>,
    pub info: Option<String>,
    pub file_url: String,
    pub image_url: Option<String>,
    pub duration_secs: Option<i32>,
    pub release_date: Option<DateTime<Utc>>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Whitespace-separated terms; all must match.
    pub q: Option<String>,
    /// One of `title`, `artist`, `genre`, `info`.
    #[serde(rename = "type")]
    pub search_type: Option<String>,
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Fetch one song.
///
/// When the caller is authenticated the request counts as a play, unless the
/// same song was played within the cooldown window. A history write that
/// fails is reported as 500; a failed counter update is not.
#[utoipa::path(
    get,
    path = "/song/{song_id}",
    params(("song_id" = Uuid, Path, description = "The song to fetch.")),
    responses(
        (status = 200, description = "The song with its play counters", body = SongResponse),
        (status = 404, description = "No such song", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn get_song_handler(
    State(state): State<Arc<AppState>>,
    auth: Option<Extension<AuthUser>>,
    PathId(song_id): PathId,
) -> HandlerResult<Json<SongResponse>> {
    let viewer = auth.map(|Extension(AuthUser(id))| id);
    let mut song = state
        .db
        .get_song(song_id)
        .await
        .map_err(|e| port_failure("fetch song", e))?;

    let mut recorded = false;
    if let Some(user_id) = viewer {
        let outcome = state
            .recorder
            .record_play(user_id, &song, Utc::now())
            .await
            .map_err(|e| port_failure("record play", e))?;
        recorded = outcome.recorded;
        if outcome.counters_applied() {
            song.count_play(user_id);
        }
    }

    Ok(Json(SongResponse {
        song: SongDto::for_viewer(song, viewer),
        recorded,
    }))
}

/// Register a song whose audio is already hosted.
#[utoipa::path(
    post,
    path = "/music/addsong",
    request_body = NewSongRequest,
    responses(
        (status = 201, description = "Song created", body = SongCreatedResponse),
        (status = 400, description = "Invalid metadata", body = ErrorBody),
        (status = 401, description = "Authentication required", body = ErrorBody)
    )
)]
pub async fn add_song_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(payload): Json<NewSongRequest>,
) -> HandlerResult<(StatusCode, Json<SongCreatedResponse>)> {
    let title = bounded_text("title", &payload.title, 2, 100)?;
    let artist = bounded_text("artist", &payload.artist, 2, 100)?;
    let file_url = payload.file_url.trim().to_string();
    if file_url.is_empty() {
        return Err(reject(StatusCode::BAD_REQUEST, "file_url is required"));
    }
    if matches!(payload.duration_secs, Some(secs) if secs <= 0) {
        return Err(reject(StatusCode::BAD_REQUEST, "duration_secs must be positive"));
    }

    let new_song = NewSong {
        title,
        artist,
        album: optional_text(payload.album),
        genre: optional_text(payload.genre),
        language: optional_text(payload.language),
        info: optional_text(payload.info),
        file_url,
        image_url: optional_text(payload.image_url),
        duration_secs: payload.duration_secs,
        uploaded_by: user_id,
        release_date: payload.release_date,
    };
    let song = state
        .db
        .create_song(new_song)
        .await
        .map_err(|e| port_failure("save song", e))?;
    info!(%user_id, song_id = %song.id, "Song added");

    Ok((
        StatusCode::CREATED,
        Json(SongCreatedResponse {
            message: "Song uploaded successfully".to_string(),
            song: song.into(),
        }),
    ))
}

/// List every song, oldest first.
#[utoipa::path(
    get,
    path = "/allsongs",
    responses((status = 200, description = "All songs", body = SongListResponse))
)]
pub async fn all_songs_handler(
    State(state): State<Arc<AppState>>,
) -> HandlerResult<Json<SongListResponse>> {
    let songs = state
        .db
        .list_songs()
        .await
        .map_err(|e| port_failure("fetch songs", e))?;
    Ok(SongListResponse::of(songs, None))
}

/// Case-insensitive substring search on one song field.
#[utoipa::path(
    get,
    path = "/music/searchsong",
    params(SearchParams),
    responses(
        (status = 200, description = "Matching songs", body = SearchResponse),
        (status = 400, description = "Missing or unknown query parameters", body = ErrorBody)
    )
)]
pub async fn search_songs_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> HandlerResult<Json<SearchResponse>> {
    let terms: Vec<String> = params
        .q
        .as_deref()
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_string)
        .collect();
    if terms.is_empty() {
        return Err(reject(StatusCode::BAD_REQUEST, "query parameter 'q' is required"));
    }
    let raw_type = params.search_type.unwrap_or_default();
    let field = SearchField::parse(&raw_type).ok_or_else(|| {
        reject(
            StatusCode::BAD_REQUEST,
            "query parameter 'type' is required (title, artist, genre, info)",
        )
    })?;

    let songs: Vec<SongDto> = state
        .db
        .search_songs(field, &terms)
        .await
        .map_err(|e| port_failure("search songs", e))?
        .into_iter()
        .map(SongDto::from)
        .collect();

    Ok(Json(SearchResponse {
        count: songs.len(),
        search_type: field.column().to_string(),
        songs,
    }))
}

/// The most liked songs.
#[utoipa::path(
    get,
    path = "/music/topsongs",
    responses((status = 200, description = "Up to 10 songs by like count", body = SongListResponse))
)]
pub async fn top_songs_handler(
    State(state): State<Arc<AppState>>,
) -> HandlerResult<Json<SongListResponse>> {
    let songs = state
        .db
        .most_liked_songs(LIST_LIMIT)
        .await
        .map_err(|e| port_failure("fetch songs", e))?;
    Ok(SongListResponse::of(songs, None))
}

/// The most saved songs.
#[utoipa::path(
    get,
    path = "/music/saved",
    responses((status = 200, description = "Up to 10 songs by save count", body = SongListResponse))
)]
pub async fn most_saved_handler(
    State(state): State<Arc<AppState>>,
) -> HandlerResult<Json<SongListResponse>> {
    let songs = state
        .db
        .most_saved_songs(LIST_LIMIT)
        .await
        .map_err(|e| port_failure("fetch songs", e))?;
    Ok(SongListResponse::of(songs, None))
}

#[utoipa::path(
    get,
    path = "/music/mysongs",
    responses(
        (status = 200, description = "Songs uploaded by the caller", body = SongListResponse),
        (status = 401, description = "Authentication required", body = ErrorBody)
    )
)]
pub async fn my_songs_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> HandlerResult<Json<SongListResponse>> {
    let songs = state
        .db
        .songs_uploaded_by(user_id)
        .await
        .map_err(|e| port_failure("fetch songs", e))?;
    Ok(SongListResponse::of(songs, Some(user_id)))
}

/// Like the song, or remove an existing like.
#[utoipa::path(
    patch,
    path = "/music/like/{song_id}",
    params(("song_id" = Uuid, Path, description = "The song to like or unlike.")),
    responses(
        (status = 200, description = "The new like state", body = LikeToggleResponse),
        (status = 404, description = "No such song", body = ErrorBody)
    )
)]
pub async fn toggle_like_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    PathId(song_id): PathId,
) -> HandlerResult<Json<LikeToggleResponse>> {
    let liked = state
        .db
        .toggle_song_like(song_id, user_id)
        .await
        .map_err(|e| port_failure("update like", e))?;
    Ok(Json(LikeToggleResponse {
        message: "Like updated".to_string(),
        liked,
    }))
}

/// Save the song, or remove an existing save.
#[utoipa::path(
    patch,
    path = "/music/save/{song_id}",
    params(("song_id" = Uuid, Path, description = "The song to save or unsave.")),
    responses(
        (status = 200, description = "The new save state", body = SaveToggleResponse),
        (status = 404, description = "No such song", body = ErrorBody)
    )
)]
pub async fn toggle_save_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    PathId(song_id): PathId,
) -> HandlerResult<Json<SaveToggleResponse>> {
    let saved = state
        .db
        .toggle_song_save(song_id, user_id)
        .await
        .map_err(|e| port_failure("update save", e))?;
    Ok(Json(SaveToggleResponse {
        message: "Save updated".to_string(),
        saved,
    }))
}

#[utoipa::path(
    get,
    path = "/music/mylikedsongs",
    responses((status = 200, description = "Songs the caller liked", body = SongListResponse))
)]
pub async fn my_liked_songs_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> HandlerResult<Json<SongListResponse>> {
    let songs = state
        .db
        .songs_liked_by(user_id)
        .await
        .map_err(|e| port_failure("fetch songs", e))?;
    Ok(SongListResponse::of(songs, Some(user_id)))
}

#[utoipa::path(
    get,
    path = "/music/mysavedsongs",
    responses((status = 200, description = "Songs the caller saved", body = SongListResponse))
)]
pub async fn my_saved_songs_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> HandlerResult<Json<SongListResponse>> {
    let songs = state
        .db
        .songs_saved_by(user_id)
        .await
        .map_err(|e| port_failure("fetch songs", e))?;
    Ok(SongListResponse::of(songs, Some(user_id)))
}

/// The caller's most played songs, each carrying `my_plays`.
#[utoipa::path(
    get,
    path = "/music/mymostplayed",
    responses((status = 200, description = "Up to 10 songs by the caller's play count", body = SongListResponse))
)]
pub async fn my_most_played_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> HandlerResult<Json<SongListResponse>> {
    let songs = state
        .db
        .most_played_by(user_id, LIST_LIMIT)
        .await
        .map_err(|e| port_failure("fetch most played songs", e))?;
    Ok(SongListResponse::of(songs, Some(user_id)))
}
