//! services/api/src/web/stats.rs
//!
//! Listening statistics for the authenticated caller.

use crate::web::middleware::AuthUser;
use crate::web::rest::{port_failure, ErrorBody, HandlerResult};
use crate::web::state::AppState;
use axum::{
    extract::{Query, State},
    response::Json,
    Extension,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use soundwave_core::{StatsRange, StatsResult, TopArtist, TopSong};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatsParams {
    /// `weekly` (default) or `monthly`; anything else is treated as weekly.
    pub range: Option<String>,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct TopSongDto {
    pub song_id: Uuid,
    pub title: String,
    pub artist: String,
    pub image: Option<String>,
    pub plays: u32,
}

impl From<TopSong> for TopSongDto {
    fn from(top: TopSong) -> Self {
        Self {
            song_id: top.song_id,
            title: top.title,
            artist: top.artist,
            image: top.image,
            plays: top.plays,
        }
    }
}

#[derive(Serialize, ToSchema, Debug)]
pub struct TopArtistDto {
    pub name: String,
    pub plays: u32,
}

impl From<TopArtist> for TopArtistDto {
    fn from(top: TopArtist) -> Self {
        Self {
            name: top.name,
            plays: top.plays,
        }
    }
}

#[derive(Serialize, ToSchema, Debug)]
pub struct StatsResponse {
    pub range: String,
    pub minutes_listened: i64,
    pub top_song: Option<TopSongDto>,
    pub top_artist: Option<TopArtistDto>,
}

impl From<StatsResult> for StatsResponse {
    fn from(result: StatsResult) -> Self {
        Self {
            range: result.range.as_str().to_string(),
            minutes_listened: result.minutes_listened,
            top_song: result.top_song.map(TopSongDto::from),
            top_artist: result.top_artist.map(TopArtistDto::from),
        }
    }
}

/// Minutes listened, top song and top artist over the last week or month.
#[utoipa::path(
    get,
    path = "/stats/my",
    params(StatsParams),
    responses(
        (status = 200, description = "Listening statistics", body = StatsResponse),
        (status = 401, description = "Authentication required", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn my_stats_handler(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Query(params): Query<StatsParams>,
) -> HandlerResult<Json<StatsResponse>> {
    let range = StatsRange::parse_or_weekly(params.range.as_deref());
    let result = state
        .stats
        .compute(user_id, range, Utc::now())
        .await
        .map_err(|e| port_failure("compute stats", e))?;
    Ok(Json(result.into()))
}
