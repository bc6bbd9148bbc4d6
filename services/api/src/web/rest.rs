//! services/api/src/web/rest.rs
//!
//! Shared pieces of the REST layer: the master definition for the OpenAPI
//! specification, the JSON error body and the mapping from port errors to
//! HTTP responses.

use crate::web::{artists, history, messages, playlists, songs, stats};
use axum::{
    extract::{FromRequestParts, Path},
    http::{request::Parts, StatusCode},
    response::Json,
};
use serde::Serialize;
use soundwave_core::PortError;
use tracing::{error, warn};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        history::my_history_handler,
        history::clear_history_handler,
        history::last_played_handler,
        stats::my_stats_handler,
        songs::get_song_handler,
        songs::add_song_handler,
        songs::all_songs_handler,
        songs::search_songs_handler,
        songs::top_songs_handler,
        songs::most_saved_handler,
        songs::my_songs_handler,
        songs::toggle_like_handler,
        songs::toggle_save_handler,
        songs::my_liked_songs_handler,
        songs::my_saved_songs_handler,
        songs::my_most_played_handler,
        playlists::create_playlist_handler,
        playlists::public_playlists_handler,
        playlists::my_playlists_handler,
        playlists::get_playlist_handler,
        playlists::update_playlist_handler,
        playlists::delete_playlist_handler,
        playlists::add_song_handler,
        playlists::remove_song_handler,
        artists::list_artists_handler,
        artists::get_artist_handler,
        artists::artist_songs_handler,
        artists::create_artist_handler,
        artists::update_artist_handler,
        artists::delete_artist_handler,
        artists::follow_artist_handler,
        artists::unfollow_artist_handler,
        artists::followed_artists_handler,
        artists::check_following_handler,
        messages::send_message_handler,
        messages::conversation_handler,
        messages::delete_message_handler,
    ),
    components(
        schemas(
            ErrorBody,
            MessageResponse,
            HealthResponse,
            history::HistoryEntryDto,
            history::HistoryListResponse,
            history::LastPlayedResponse,
            stats::StatsResponse,
            songs::SongDto,
            songs::SongResponse,
            songs::SongListResponse,
            songs::NewSongRequest,
            playlists::PlaylistDto,
            playlists::CreatePlaylistRequest,
            playlists::UpdatePlaylistRequest,
            playlists::PlaylistSongRequest,
            artists::SocialLinksDto,
            artists::ArtistDto,
            artists::ArtistResponse,
            artists::ArtistListResponse,
            artists::FollowingResponse,
            artists::CreateArtistRequest,
            artists::UpdateArtistRequest,
            messages::MessageDto,
            messages::SendMessageRequest,
            messages::MessageSentResponse,
            messages::ConversationResponse,
        )
    ),
    tags(
        (name = "Soundwave API", description = "Songs, playlists, artists, messages, play history and listening statistics.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Shared Response Structs
//=========================================================================================

/// The body of every non-2xx response.
#[derive(Serialize, ToSchema, Debug)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// A plain confirmation message.
#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
}

pub type HandlerError = (StatusCode, Json<ErrorBody>);
pub type HandlerResult<T> = Result<T, HandlerError>;

pub fn reject(status: StatusCode, message: impl Into<String>) -> HandlerError {
    (status, Json(ErrorBody::new(message)))
}

/// Trims `value` and checks its length in characters against `min..=max`.
pub fn bounded_text(field: &str, value: &str, min: usize, max: usize) -> HandlerResult<String> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len < min || len > max {
        return Err(reject(
            StatusCode::BAD_REQUEST,
            format!("{} must be between {} and {} characters", field, min, max),
        ));
    }
    Ok(trimmed.to_string())
}

/// Trims each entry and drops the empty ones.
pub fn clean_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

/// A UUID path segment. Malformed ids are rejected with the JSON error body
/// instead of axum's plain-text rejection.
#[derive(Debug, Clone, Copy)]
pub struct PathId(pub Uuid);

impl<S> FromRequestParts<S> for PathId
where
    S: Send + Sync,
{
    type Rejection = HandlerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<Uuid>::from_request_parts(parts, state).await {
            Ok(Path(id)) => Ok(Self(id)),
            Err(rejection) => Err(reject(rejection.status(), rejection.body_text())),
        }
    }
}

/// Maps a port error onto a response. Storage failures are logged with their
/// detail and reported to the client as `failed to <action>`.
pub fn port_failure(action: &str, e: PortError) -> HandlerError {
    match e {
        PortError::NotFound(msg) => reject(StatusCode::NOT_FOUND, msg),
        PortError::Unauthorized => reject(StatusCode::UNAUTHORIZED, "Authentication required"),
        PortError::Forbidden(msg) => reject(StatusCode::FORBIDDEN, msg),
        PortError::InvalidInput(msg) => reject(StatusCode::BAD_REQUEST, msg),
        e if e.is_transient() => {
            warn!("Storage unavailable while trying to {}: {:?}", action, e);
            reject(StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to {}", action))
        }
        e => {
            error!("Failed to {}: {:?}", action, e);
            reject(StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to {}", action))
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Liveness check.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_failures_hide_their_detail() {
        let (status, Json(body)) =
            port_failure("fetch history", PortError::Unavailable("pool closed at 10.0.0.3".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Failed to fetch history");

        let (status, _) = port_failure("fetch history", PortError::Timeout("list_recent_history".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn client_errors_keep_their_message() {
        let (status, Json(body)) = port_failure("fetch song", PortError::NotFound("Song not found".into()));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "Song not found");

        let (status, _) = port_failure("update playlist", PortError::Forbidden("not yours".into()));
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = port_failure("add song", PortError::InvalidInput("duplicate".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn openapi_document_lists_every_route_group() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/history/my"));
        assert!(doc.paths.paths.contains_key("/stats/my"));
        assert!(doc.paths.paths.contains_key("/song/{song_id}"));
        assert!(doc.paths.paths.contains_key("/artists/{artist_id}"));
        assert!(doc.paths.paths.contains_key("/messages/send/{receiver_id}"));
    }
}
