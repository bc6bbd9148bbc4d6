//! services/api/src/web/history.rs
//!
//! Play history endpoints. History is always scoped to the authenticated caller.

use crate::web::middleware::AuthUser;
use crate::web::rest::{port_failure, reject, ErrorBody, HandlerResult, MessageResponse};
use crate::web::songs::SongDto;
use crate::web::state::AppState;
use axum::{extract::State, http::StatusCode, response::Json, Extension};
use chrono::{DateTime, Utc};
use serde::Serialize;
use soundwave_core::{HistoryEntry, PortError, RECENT_HISTORY_LIMIT};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Serialize, ToSchema, Debug)]
pub struct HistoryEntryDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub song_id: Uuid,
    pub played_at: DateTime<Utc>,
    pub duration: Option<i32>,
}

impl From<HistoryEntry> for HistoryEntryDto {
    fn from(entry: HistoryEntry) -> Self {
        Self {
            id: entry.id,
            user_id: entry.user_id,
            song_id: entry.song_id,
            played_at: entry.played_at,
            duration: entry.duration,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct HistoryListResponse {
    pub count: usize,
    pub history: Vec<HistoryEntryDto>,
}

#[derive(Serialize, ToSchema)]
pub struct LastPlayedResponse {
    pub history: HistoryEntryDto,
    pub song: SongDto,
}

/// The caller's most recent plays, newest first.
#[utoipa::path(
    get,
    path = "/history/my",
    responses(
        (status = 200, description = "Up to 50 history entries", body = HistoryListResponse),
        (status = 401, description = "Authentication required", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn my_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> HandlerResult<Json<HistoryListResponse>> {
    let history: Vec<HistoryEntryDto> = state
        .history
        .list_recent(user_id, RECENT_HISTORY_LIMIT)
        .await
        .map_err(|e| port_failure("fetch history", e))?
        .into_iter()
        .map(HistoryEntryDto::from)
        .collect();

    Ok(Json(HistoryListResponse {
        count: history.len(),
        history,
    }))
}

/// Delete every history entry of the caller.
#[utoipa::path(
    delete,
    path = "/history/clear",
    responses(
        (status = 200, description = "History cleared", body = MessageResponse),
        (status = 401, description = "Authentication required", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn clear_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> HandlerResult<Json<MessageResponse>> {
    let removed = state
        .history
        .clear_all(user_id)
        .await
        .map_err(|e| port_failure("clear history", e))?;
    info!(%user_id, removed, "History cleared");
    Ok(MessageResponse::new("History cleared successfully"))
}

/// The caller's latest play together with the song.
#[utoipa::path(
    get,
    path = "/history/lastplayed",
    responses(
        (status = 200, description = "The most recent play", body = LastPlayedResponse),
        (status = 404, description = "No history yet", body = ErrorBody),
        (status = 401, description = "Authentication required", body = ErrorBody)
    )
)]
pub async fn last_played_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> HandlerResult<Json<LastPlayedResponse>> {
    let entry = state
        .history
        .last_played(user_id)
        .await
        .map_err(|e| port_failure("fetch history", e))?
        .ok_or_else(|| reject(StatusCode::NOT_FOUND, "No history found"))?;

    let song = state.db.get_song(entry.song_id).await.map_err(|e| match e {
        PortError::NotFound(_) => reject(StatusCode::NOT_FOUND, "Song not found"),
        other => port_failure("fetch song", other),
    })?;

    Ok(Json(LastPlayedResponse {
        history: entry.into(),
        song: SongDto::for_viewer(song, Some(user_id)),
    }))
}
