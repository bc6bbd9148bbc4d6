pub mod artists;
pub mod history;
pub mod messages;
pub mod middleware;
pub mod playlists;
pub mod rest;
pub mod songs;
pub mod state;
pub mod stats;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use std::sync::Arc;

pub use middleware::{optional_auth, require_auth, AuthUser};
pub use state::AppState;

/// Builds every API route with its auth layer. Cross-cutting layers (CORS,
/// tracing, Swagger UI) are added by the binary.
///
/// `/artists/{artist_id}` is split across groups: GET is public, DELETE is
/// protected. Merging keeps each method behind its own layer.
pub fn router(state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(rest::health_handler))
        .route("/allsongs", get(songs::all_songs_handler))
        .route("/music/allsongs", get(songs::all_songs_handler))
        .route("/music/searchsong", get(songs::search_songs_handler))
        .route("/music/topsongs", get(songs::top_songs_handler))
        .route("/music/saved", get(songs::most_saved_handler))
        .route("/playlists", get(playlists::public_playlists_handler))
        .route("/artists", get(artists::list_artists_handler))
        .route("/artists/{artist_id}", get(artists::get_artist_handler))
        .route("/artists/{artist_id}/songs", get(artists::artist_songs_handler));

    // Identity is used when present
    let optional_routes = Router::new()
        .route("/song/{song_id}", get(songs::get_song_handler))
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), optional_auth));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/history/my", get(history::my_history_handler))
        .route("/history/clear", delete(history::clear_history_handler))
        .route("/history/lastplayed", get(history::last_played_handler))
        .route("/stats/my", get(stats::my_stats_handler))
        .route("/music/addsong", post(songs::add_song_handler))
        .route("/music/mysongs", get(songs::my_songs_handler))
        .route("/music/like/{song_id}", patch(songs::toggle_like_handler))
        .route("/music/save/{song_id}", patch(songs::toggle_save_handler))
        .route("/music/mylikedsongs", get(songs::my_liked_songs_handler))
        .route("/music/mysavedsongs", get(songs::my_saved_songs_handler))
        .route("/music/mymostplayed", get(songs::my_most_played_handler))
        .route("/playlist/create", post(playlists::create_playlist_handler))
        .route("/playlist/myplaylists", get(playlists::my_playlists_handler))
        .route("/playlist/{id}", get(playlists::get_playlist_handler))
        .route("/playlist/update/{id}", put(playlists::update_playlist_handler))
        .route("/playlist/delete/{id}", delete(playlists::delete_playlist_handler))
        .route("/playlist/{id}/addsong", post(playlists::add_song_handler))
        .route("/playlist/{id}/remove-song", delete(playlists::remove_song_handler))
        .route("/createartists", post(artists::create_artist_handler))
        .route("/updateartists/{artist_id}", put(artists::update_artist_handler))
        .route("/artists/{artist_id}", delete(artists::delete_artist_handler))
        .route("/artists/follow/{artist_id}", post(artists::follow_artist_handler))
        .route("/artists/unfollow/{artist_id}", post(artists::unfollow_artist_handler))
        .route("/artists/followed/me", get(artists::followed_artists_handler))
        .route("/artists/check-following/{artist_id}", get(artists::check_following_handler))
        .route("/messages/send/{receiver_id}", post(messages::send_message_handler))
        .route("/messages/conversation/{receiver_id}", get(messages::conversation_handler))
        .route("/messages/delete/{message_id}", delete(messages::delete_message_handler))
        .route_layer(axum_middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(optional_routes)
        .merge(protected_routes)
        .with_state(state)
}
