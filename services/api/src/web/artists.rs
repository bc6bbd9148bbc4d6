//! services/api/src/web/artists.rs
//!
//! Artist profiles and following. Browsing is public; changing a profile or
//! following one needs a session.

use crate::web::middleware::AuthUser;
use crate::web::rest::{
    bounded_text, clean_list, port_failure, reject, ErrorBody, HandlerError, HandlerResult,
    MessageResponse, PathId,
};
use crate::web::songs::SongListResponse;
use crate::web::state::AppState;
use axum::{extract::State, http::StatusCode, response::Json, Extension};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use soundwave_core::{Artist, ArtistUpdate, NewArtist, PortError, SocialLinks};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

const NAME_BOUNDS: (usize, usize) = (2, 100);

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, Deserialize, ToSchema, Debug, Default)]
pub struct SocialLinksDto {
    pub instagram: Option<String>,
    pub twitter: Option<String>,
    pub facebook: Option<String>,
    pub website: Option<String>,
}

impl From<SocialLinks> for SocialLinksDto {
    fn from(links: SocialLinks) -> Self {
        Self {
            instagram: links.instagram,
            twitter: links.twitter,
            facebook: links.facebook,
            website: links.website,
        }
    }
}

impl From<SocialLinksDto> for SocialLinks {
    fn from(links: SocialLinksDto) -> Self {
        let keep = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Self {
            instagram: keep(links.instagram),
            twitter: keep(links.twitter),
            facebook: keep(links.facebook),
            website: keep(links.website),
        }
    }
}

#[derive(Serialize, ToSchema, Debug)]
pub struct ArtistDto {
    pub id: Uuid,
    pub name: String,
    pub bio: Option<String>,
    pub genres: Vec<String>,
    pub image_url: Option<String>,
    pub follower_count: usize,
    pub followers: Vec<Uuid>,
    pub verified: bool,
    pub social_links: SocialLinksDto,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Artist> for ArtistDto {
    fn from(a: Artist) -> Self {
        Self {
            id: a.id,
            follower_count: a.follower_count(),
            name: a.name,
            bio: a.bio,
            genres: a.genres,
            image_url: a.image_url,
            followers: a.followers,
            verified: a.verified,
            social_links: a.social_links.into(),
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ArtistResponse {
    pub message: String,
    pub artist: ArtistDto,
}

#[derive(Serialize, ToSchema)]
pub struct ArtistListResponse {
    pub artists: Vec<ArtistDto>,
    pub count: usize,
}

impl ArtistListResponse {
    fn of(artists: Vec<Artist>) -> Json<Self> {
        let artists: Vec<ArtistDto> = artists.into_iter().map(ArtistDto::from).collect();
        Json(Self {
            count: artists.len(),
            artists,
        })
    }
}

#[derive(Serialize, ToSchema)]
pub struct FollowingResponse {
    pub is_following: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateArtistRequest {
    pub name: String,
    pub bio: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub verified: bool,
    pub social_links: Option<SocialLinksDto>,
}

/// Fields left out are not changed.
#[derive(Deserialize, ToSchema, Default)]
pub struct UpdateArtistRequest {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub genres: Option<Vec<String>>,
    pub image_url: Option<String>,
    pub verified: Option<bool>,
    pub social_links: Option<SocialLinksDto>,
}

/// Like `port_failure`, but a missing artist reads "Artist not found".
fn artist_failure(action: &str, e: PortError) -> HandlerError {
    match e {
        PortError::NotFound(_) => reject(StatusCode::NOT_FOUND, "Artist not found"),
        e => port_failure(action, e),
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/artists",
    responses((status = 200, description = "Every artist", body = ArtistListResponse))
)]
pub async fn list_artists_handler(
    State(state): State<Arc<AppState>>,
) -> HandlerResult<Json<ArtistListResponse>> {
    let artists = state
        .db
        .list_artists()
        .await
        .map_err(|e| port_failure("fetch artists", e))?;
    Ok(ArtistListResponse::of(artists))
}

#[utoipa::path(
    get,
    path = "/artists/{artist_id}",
    params(("artist_id" = Uuid, Path, description = "The artist to fetch.")),
    responses(
        (status = 200, description = "The artist profile", body = ArtistDto),
        (status = 400, description = "Malformed id", body = ErrorBody),
        (status = 404, description = "No such artist", body = ErrorBody)
    )
)]
pub async fn get_artist_handler(
    State(state): State<Arc<AppState>>,
    PathId(artist_id): PathId,
) -> HandlerResult<Json<ArtistDto>> {
    let artist = state
        .db
        .get_artist(artist_id)
        .await
        .map_err(|e| artist_failure("fetch artist", e))?;
    Ok(Json(artist.into()))
}

/// Songs credited to the artist's name, newest first.
#[utoipa::path(
    get,
    path = "/artists/{artist_id}/songs",
    params(("artist_id" = Uuid, Path, description = "The artist whose songs to list.")),
    responses(
        (status = 200, description = "The artist's songs", body = SongListResponse),
        (status = 404, description = "No such artist", body = ErrorBody)
    )
)]
pub async fn artist_songs_handler(
    State(state): State<Arc<AppState>>,
    PathId(artist_id): PathId,
) -> HandlerResult<Json<SongListResponse>> {
    let artist = state
        .db
        .get_artist(artist_id)
        .await
        .map_err(|e| artist_failure("fetch artist", e))?;
    let songs = state
        .db
        .songs_by_artist(&artist.name)
        .await
        .map_err(|e| port_failure("fetch songs", e))?;
    Ok(SongListResponse::of(songs, None))
}

#[utoipa::path(
    post,
    path = "/createartists",
    request_body = CreateArtistRequest,
    responses(
        (status = 201, description = "Artist created", body = ArtistResponse),
        (status = 400, description = "Invalid name", body = ErrorBody),
        (status = 401, description = "Authentication required", body = ErrorBody)
    )
)]
pub async fn create_artist_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Json(payload): Json<CreateArtistRequest>,
) -> HandlerResult<(StatusCode, Json<ArtistResponse>)> {
    let name = bounded_text("name", &payload.name, NAME_BOUNDS.0, NAME_BOUNDS.1)?;
    let new_artist = NewArtist {
        name,
        bio: payload.bio.map(|b| b.trim().to_string()).filter(|b| !b.is_empty()),
        genres: clean_list(payload.genres),
        image_url: payload.image_url.filter(|u| !u.trim().is_empty()),
        verified: payload.verified,
        social_links: payload.social_links.map(SocialLinks::from).unwrap_or_default(),
    };
    let artist = state
        .db
        .create_artist(new_artist)
        .await
        .map_err(|e| port_failure("create artist", e))?;
    info!(%user_id, artist_id = %artist.id, "Artist created");

    Ok((
        StatusCode::CREATED,
        Json(ArtistResponse {
            message: "Artist created successfully".to_string(),
            artist: artist.into(),
        }),
    ))
}

#[utoipa::path(
    put,
    path = "/updateartists/{artist_id}",
    params(("artist_id" = Uuid, Path, description = "The artist to update.")),
    request_body = UpdateArtistRequest,
    responses(
        (status = 200, description = "Artist updated", body = ArtistResponse),
        (status = 400, description = "No or invalid fields", body = ErrorBody),
        (status = 404, description = "No such artist", body = ErrorBody)
    )
)]
pub async fn update_artist_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    PathId(artist_id): PathId,
    Json(payload): Json<UpdateArtistRequest>,
) -> HandlerResult<Json<ArtistResponse>> {
    let update = ArtistUpdate {
        name: payload
            .name
            .map(|n| bounded_text("name", &n, NAME_BOUNDS.0, NAME_BOUNDS.1))
            .transpose()?,
        bio: payload.bio,
        genres: payload.genres.map(clean_list),
        image_url: payload.image_url,
        verified: payload.verified,
        social_links: payload.social_links.map(SocialLinks::from),
    };
    if update.is_empty() {
        return Err(reject(StatusCode::BAD_REQUEST, "No valid fields to update"));
    }

    let artist = state
        .db
        .update_artist(artist_id, update)
        .await
        .map_err(|e| artist_failure("update artist", e))?;
    info!(%user_id, %artist_id, "Artist updated");

    Ok(Json(ArtistResponse {
        message: "Artist updated successfully".to_string(),
        artist: artist.into(),
    }))
}

#[utoipa::path(
    delete,
    path = "/artists/{artist_id}",
    params(("artist_id" = Uuid, Path, description = "The artist to delete.")),
    responses(
        (status = 200, description = "Artist deleted", body = MessageResponse),
        (status = 404, description = "No such artist", body = ErrorBody)
    )
)]
pub async fn delete_artist_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    PathId(artist_id): PathId,
) -> HandlerResult<Json<MessageResponse>> {
    state
        .db
        .delete_artist(artist_id)
        .await
        .map_err(|e| artist_failure("delete artist", e))?;
    info!(%user_id, %artist_id, "Artist deleted");
    Ok(MessageResponse::new("Artist deleted successfully"))
}

#[utoipa::path(
    post,
    path = "/artists/follow/{artist_id}",
    params(("artist_id" = Uuid, Path, description = "The artist to follow.")),
    responses(
        (status = 200, description = "Now following", body = MessageResponse),
        (status = 400, description = "Already following", body = ErrorBody),
        (status = 404, description = "No such artist", body = ErrorBody)
    )
)]
pub async fn follow_artist_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    PathId(artist_id): PathId,
) -> HandlerResult<Json<MessageResponse>> {
    let followed = state
        .db
        .follow_artist(artist_id, user_id)
        .await
        .map_err(|e| artist_failure("follow artist", e))?;
    if !followed {
        return Err(reject(StatusCode::BAD_REQUEST, "Already following this artist"));
    }
    Ok(MessageResponse::new("Successfully followed artist"))
}

#[utoipa::path(
    post,
    path = "/artists/unfollow/{artist_id}",
    params(("artist_id" = Uuid, Path, description = "The artist to unfollow.")),
    responses(
        (status = 200, description = "No longer following", body = MessageResponse),
        (status = 404, description = "No such artist, or not following it", body = ErrorBody)
    )
)]
pub async fn unfollow_artist_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    PathId(artist_id): PathId,
) -> HandlerResult<Json<MessageResponse>> {
    let not_following = || reject(StatusCode::NOT_FOUND, "Artist not found or not following");
    let unfollowed = state
        .db
        .unfollow_artist(artist_id, user_id)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => not_following(),
            e => port_failure("unfollow artist", e),
        })?;
    if !unfollowed {
        return Err(not_following());
    }
    Ok(MessageResponse::new("Successfully unfollowed artist"))
}

#[utoipa::path(
    get,
    path = "/artists/followed/me",
    responses(
        (status = 200, description = "Artists the caller follows", body = ArtistListResponse),
        (status = 401, description = "Authentication required", body = ErrorBody)
    )
)]
pub async fn followed_artists_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> HandlerResult<Json<ArtistListResponse>> {
    let artists = state
        .db
        .artists_followed_by(user_id)
        .await
        .map_err(|e| port_failure("fetch artists", e))?;
    Ok(ArtistListResponse::of(artists))
}

#[utoipa::path(
    get,
    path = "/artists/check-following/{artist_id}",
    params(("artist_id" = Uuid, Path, description = "The artist to check.")),
    responses(
        (status = 200, description = "Whether the caller follows the artist", body = FollowingResponse),
        (status = 404, description = "No such artist", body = ErrorBody)
    )
)]
pub async fn check_following_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    PathId(artist_id): PathId,
) -> HandlerResult<Json<FollowingResponse>> {
    let artist = state
        .db
        .get_artist(artist_id)
        .await
        .map_err(|e| artist_failure("fetch artist", e))?;
    Ok(Json(FollowingResponse {
        is_following: artist.is_followed_by(user_id),
    }))
}
