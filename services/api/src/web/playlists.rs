//! services/api/src/web/playlists.rs
//!
//! Playlist endpoints. Only the creator of a user playlist may change it;
//! system playlists have no creator and are read-only over HTTP.

use crate::web::middleware::AuthUser;
use crate::web::rest::{
    bounded_text, clean_list, port_failure, reject, ErrorBody, HandlerResult, MessageResponse,
    PathId,
};
use crate::web::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    Extension,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use soundwave_core::{NewPlaylist, Playlist, PlaylistKind, PlaylistUpdate};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema, Debug)]
pub struct PlaylistDto {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub cover_image: Option<String>,
    pub creator_id: Option<Uuid>,
    /// `user` or `system`.
    #[serde(rename = "type")]
    pub kind: String,
    pub tags: Vec<String>,
    pub song_ids: Vec<Uuid>,
    pub is_public: bool,
    pub is_seeded: bool,
    pub play_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Playlist> for PlaylistDto {
    fn from(p: Playlist) -> Self {
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            cover_image: p.cover_image,
            creator_id: p.creator_id,
            kind: p.kind.as_str().to_string(),
            tags: p.tags,
            song_ids: p.song_ids,
            is_public: p.is_public,
            is_seeded: p.is_seeded,
            play_count: p.play_count,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PlaylistResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub playlist: PlaylistDto,
}

#[derive(Serialize, ToSchema)]
pub struct PlaylistListResponse {
    pub playlists: Vec<PlaylistDto>,
    pub count: usize,
}

impl PlaylistListResponse {
    fn of(playlists: Vec<Playlist>) -> Json<Self> {
        let playlists: Vec<PlaylistDto> = playlists.into_iter().map(PlaylistDto::from).collect();
        Json(Self {
            count: playlists.len(),
            playlists,
        })
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreatePlaylistRequest {
    pub name: String,
    pub description: String,
    /// `user` or `system`.
    #[serde(rename = "type")]
    pub kind: String,
    pub cover_image: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub song_ids: Vec<Uuid>,
}

/// Fields left out are not changed.
#[derive(Deserialize, ToSchema, Default)]
pub struct UpdatePlaylistRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
}

#[derive(Deserialize, ToSchema)]
pub struct PlaylistSongRequest {
    pub song_id: Uuid,
}

const NAME_BOUNDS: (usize, usize) = (2, 100);
const DESCRIPTION_BOUNDS: (usize, usize) = (2, 500);

/// Loads a playlist and checks that `user_id` created it.
async fn owned_playlist(
    state: &AppState,
    playlist_id: Uuid,
    user_id: Uuid,
    action: &str,
) -> HandlerResult<Playlist> {
    let playlist = state
        .db
        .get_playlist(playlist_id)
        .await
        .map_err(|e| port_failure(action, e))?;
    if !playlist.is_owned_by(user_id) {
        return Err(reject(
            StatusCode::FORBIDDEN,
            "You don't have permission to modify this playlist",
        ));
    }
    Ok(playlist)
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Create a playlist.
///
/// `user` playlists belong to the caller. `system` playlists are seeded and
/// have no creator.
#[utoipa::path(
    post,
    path = "/playlist/create",
    request_body = CreatePlaylistRequest,
    responses(
        (status = 201, description = "Playlist created", body = PlaylistResponse),
        (status = 400, description = "Invalid name, description or type", body = ErrorBody),
        (status = 401, description = "Authentication required", body = ErrorBody)
    )
)]
pub async fn create_playlist_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(payload): Json<CreatePlaylistRequest>,
) -> HandlerResult<(StatusCode, Json<PlaylistResponse>)> {
    let name = bounded_text("name", &payload.name, NAME_BOUNDS.0, NAME_BOUNDS.1)?;
    let description = bounded_text(
        "description",
        &payload.description,
        DESCRIPTION_BOUNDS.0,
        DESCRIPTION_BOUNDS.1,
    )?;
    let kind = PlaylistKind::parse(&payload.kind)
        .ok_or_else(|| reject(StatusCode::BAD_REQUEST, "Invalid playlist type"))?;

    let creator_id = match kind {
        PlaylistKind::User => Some(user_id),
        PlaylistKind::System => None,
    };
    let new_playlist = NewPlaylist {
        name,
        description,
        cover_image: payload.cover_image.filter(|c| !c.trim().is_empty()),
        creator_id,
        kind,
        tags: clean_list(payload.tags),
        song_ids: payload.song_ids,
    };
    let playlist = state
        .db
        .create_playlist(new_playlist)
        .await
        .map_err(|e| port_failure("create playlist", e))?;
    info!(%user_id, playlist_id = %playlist.id, kind = kind.as_str(), "Playlist created");

    Ok((
        StatusCode::CREATED,
        Json(PlaylistResponse {
            message: Some("Playlist created successfully".to_string()),
            playlist: playlist.into(),
        }),
    ))
}

/// Every public playlist.
#[utoipa::path(
    get,
    path = "/playlists",
    responses((status = 200, description = "Public playlists", body = PlaylistListResponse))
)]
pub async fn public_playlists_handler(
    State(state): State<Arc<AppState>>,
) -> HandlerResult<Json<PlaylistListResponse>> {
    let playlists = state
        .db
        .list_public_playlists()
        .await
        .map_err(|e| port_failure("fetch playlists", e))?;
    Ok(PlaylistListResponse::of(playlists))
}

#[utoipa::path(
    get,
    path = "/playlist/myplaylists",
    responses(
        (status = 200, description = "The caller's playlists", body = PlaylistListResponse),
        (status = 401, description = "Authentication required", body = ErrorBody)
    )
)]
pub async fn my_playlists_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> HandlerResult<Json<PlaylistListResponse>> {
    let playlists = state
        .db
        .playlists_created_by(user_id)
        .await
        .map_err(|e| port_failure("fetch playlists", e))?;
    Ok(PlaylistListResponse::of(playlists))
}

/// Fetch one playlist. Private playlists are only visible to their creator.
#[utoipa::path(
    get,
    path = "/playlist/{id}",
    params(("id" = Uuid, Path, description = "The playlist to fetch.")),
    responses(
        (status = 200, description = "The playlist", body = PlaylistResponse),
        (status = 403, description = "Private playlist of another user", body = ErrorBody),
        (status = 404, description = "No such playlist", body = ErrorBody)
    )
)]
pub async fn get_playlist_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    PathId(playlist_id): PathId,
) -> HandlerResult<Json<PlaylistResponse>> {
    let playlist = state
        .db
        .get_playlist(playlist_id)
        .await
        .map_err(|e| port_failure("fetch playlist", e))?;
    if !playlist.is_visible_to(Some(user_id)) {
        return Err(reject(StatusCode::FORBIDDEN, "This playlist is private"));
    }
    Ok(Json(PlaylistResponse {
        message: None,
        playlist: playlist.into(),
    }))
}

#[utoipa::path(
    put,
    path = "/playlist/update/{id}",
    params(("id" = Uuid, Path, description = "The playlist to update.")),
    request_body = UpdatePlaylistRequest,
    responses(
        (status = 200, description = "Playlist updated", body = PlaylistResponse),
        (status = 400, description = "No or invalid fields", body = ErrorBody),
        (status = 403, description = "Not the creator", body = ErrorBody),
        (status = 404, description = "No such playlist", body = ErrorBody)
    )
)]
pub async fn update_playlist_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    PathId(playlist_id): PathId,
    Json(payload): Json<UpdatePlaylistRequest>,
) -> HandlerResult<Json<PlaylistResponse>> {
    let update = PlaylistUpdate {
        name: payload
            .name
            .map(|n| bounded_text("name", &n, NAME_BOUNDS.0, NAME_BOUNDS.1))
            .transpose()?,
        description: payload
            .description
            .map(|d| bounded_text("description", &d, DESCRIPTION_BOUNDS.0, DESCRIPTION_BOUNDS.1))
            .transpose()?,
        cover_image: payload.cover_image,
        tags: payload.tags.map(clean_list),
        is_public: payload.is_public,
    };
    if update.is_empty() {
        return Err(reject(StatusCode::BAD_REQUEST, "No valid fields to update"));
    }

    owned_playlist(&state, playlist_id, user_id, "update playlist").await?;
    let playlist = state
        .db
        .update_playlist(playlist_id, update)
        .await
        .map_err(|e| port_failure("update playlist", e))?;

    Ok(Json(PlaylistResponse {
        message: Some("Playlist updated successfully".to_string()),
        playlist: playlist.into(),
    }))
}

#[utoipa::path(
    delete,
    path = "/playlist/delete/{id}",
    params(("id" = Uuid, Path, description = "The playlist to delete.")),
    responses(
        (status = 200, description = "Playlist deleted", body = MessageResponse),
        (status = 403, description = "Not the creator", body = ErrorBody),
        (status = 404, description = "No such playlist", body = ErrorBody)
    )
)]
pub async fn delete_playlist_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    PathId(playlist_id): PathId,
) -> HandlerResult<Json<MessageResponse>> {
    owned_playlist(&state, playlist_id, user_id, "delete playlist").await?;
    state
        .db
        .delete_playlist(playlist_id)
        .await
        .map_err(|e| port_failure("delete playlist", e))?;
    info!(%user_id, %playlist_id, "Playlist deleted");
    Ok(MessageResponse::new("Playlist deleted successfully"))
}

#[utoipa::path(
    post,
    path = "/playlist/{id}/addsong",
    params(("id" = Uuid, Path, description = "The playlist to extend.")),
    request_body = PlaylistSongRequest,
    responses(
        (status = 200, description = "Song added", body = MessageResponse),
        (status = 400, description = "Song already in the playlist", body = ErrorBody),
        (status = 403, description = "Not the creator", body = ErrorBody),
        (status = 404, description = "No such playlist or song", body = ErrorBody)
    )
)]
pub async fn add_song_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    PathId(playlist_id): PathId,
    Json(payload): Json<PlaylistSongRequest>,
) -> HandlerResult<Json<MessageResponse>> {
    owned_playlist(&state, playlist_id, user_id, "add song to playlist").await?;
    state
        .db
        .get_song(payload.song_id)
        .await
        .map_err(|e| port_failure("fetch song", e))?;
    state
        .db
        .add_song_to_playlist(playlist_id, payload.song_id)
        .await
        .map_err(|e| port_failure("add song to playlist", e))?;
    Ok(MessageResponse::new("Song added to playlist successfully"))
}

#[utoipa::path(
    delete,
    path = "/playlist/{id}/remove-song",
    params(("id" = Uuid, Path, description = "The playlist to shrink.")),
    request_body = PlaylistSongRequest,
    responses(
        (status = 200, description = "Song removed", body = MessageResponse),
        (status = 403, description = "Not the creator", body = ErrorBody),
        (status = 404, description = "No such playlist, or the song is not in it", body = ErrorBody)
    )
)]
pub async fn remove_song_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    PathId(playlist_id): PathId,
    Json(payload): Json<PlaylistSongRequest>,
) -> HandlerResult<Json<MessageResponse>> {
    owned_playlist(&state, playlist_id, user_id, "remove song from playlist").await?;
    let removed = state
        .db
        .remove_song_from_playlist(playlist_id, payload.song_id)
        .await
        .map_err(|e| port_failure("remove song from playlist", e))?;
    if !removed {
        return Err(reject(StatusCode::NOT_FOUND, "Song not found in playlist"));
    }
    Ok(MessageResponse::new("Song removed from playlist successfully"))
}
