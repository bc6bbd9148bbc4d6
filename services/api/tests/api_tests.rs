//! Integration tests for the REST API, driven through the real router against
//! the in-memory store.

use api_lib::config::Config;
use api_lib::web::{router, AppState};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use soundwave_core::{DatabaseService, InMemoryDatabase, NewSong, PortError, Song};
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot` method
use uuid::Uuid;

const ALICE: &str = "alice-token";
const BOB: &str = "bob-token";

struct TestApp {
    db: Arc<InMemoryDatabase>,
    state: Arc<AppState>,
    alice: Uuid,
    bob: Uuid,
}

impl TestApp {
    async fn new() -> Self {
        let db = Arc::new(InMemoryDatabase::new());
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let expires = Utc::now() + Duration::hours(1);
        db.insert_auth_session(ALICE, alice, expires).await;
        db.insert_auth_session(BOB, bob, expires).await;
        db.insert_auth_session("expired-token", alice, Utc::now() - Duration::hours(1))
            .await;

        let config = Config::from_lookup(|name| match name {
            "DATABASE_URL" => Some("memory".to_string()),
            _ => None,
        })
        .expect("test config");
        let state = Arc::new(AppState::new(db.clone(), Arc::new(config)));
        Self {
            db,
            state,
            alice,
            bob,
        }
    }

    fn app(&self) -> Router {
        router(self.state.clone())
    }

    async fn song(&self, title: &str, artist: &str, duration_secs: Option<i32>) -> Song {
        self.db
            .create_song(NewSong {
                title: title.to_string(),
                artist: artist.to_string(),
                album: None,
                genre: Some("Lo-fi".to_string()),
                language: None,
                info: None,
                file_url: format!("https://cdn.example/{}.mp3", title),
                image_url: None,
                duration_secs,
                uploaded_by: self.bob,
                release_date: None,
            })
            .await
            .expect("create song")
    }

    async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Should read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send("GET", uri, token, None).await
    }
}

// =============================================================================
// Health and Authentication
// =============================================================================

#[tokio::test]
async fn health_needs_no_auth() {
    let t = TestApp::new().await;
    let (status, body) = t.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn protected_routes_reject_missing_or_expired_tokens() {
    let t = TestApp::new().await;
    for uri in ["/history/my", "/stats/my", "/history/lastplayed", "/playlist/myplaylists"] {
        let (status, body) = t.get(uri, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert!(body["error"].is_string());
    }
    let (status, _) = t.get("/history/my", Some("expired-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = t.send("DELETE", "/history/clear", Some("nonsense"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn session_cookie_is_accepted() {
    let t = TestApp::new().await;
    let request = Request::builder()
        .uri("/history/my")
        .header(header::COOKIE, format!("session={}", ALICE))
        .body(Body::empty())
        .unwrap();
    let response = t.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Song Lookup and Play Recording
// =============================================================================

#[tokio::test]
async fn anonymous_song_fetch_records_nothing() {
    let t = TestApp::new().await;
    let song = t.song("Night Drive", "Ria", Some(200)).await;

    let (status, body) = t.get(&format!("/song/{}", song.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recorded"], false);
    assert_eq!(body["song"]["play_count"], 0);
    assert!(body["song"].get("my_plays").is_none());

    assert_eq!(t.db.get_song(song.id).await.unwrap().play_count, 0);
}

#[tokio::test]
async fn invalid_token_on_song_fetch_is_treated_as_anonymous() {
    let t = TestApp::new().await;
    let song = t.song("Night Drive", "Ria", Some(200)).await;
    let (status, body) = t.get(&format!("/song/{}", song.id), Some("expired-token")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recorded"], false);
}

#[tokio::test]
async fn authenticated_fetch_counts_once_inside_cooldown() {
    let t = TestApp::new().await;
    let song = t.song("Night Drive", "Ria", Some(200)).await;
    let uri = format!("/song/{}", song.id);

    let (status, body) = t.get(&uri, Some(ALICE)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recorded"], true);
    assert_eq!(body["song"]["play_count"], 1);
    assert_eq!(body["song"]["my_plays"], 1);
    assert_eq!(body["song"]["user_play_counts"][t.alice.to_string()], 1);

    // Immediate replay falls inside the 10 second window.
    let (_, body) = t.get(&uri, Some(ALICE)).await;
    assert_eq!(body["recorded"], false);
    assert_eq!(body["song"]["play_count"], 1);

    // Another listener is not affected by Alice's cooldown.
    let (_, body) = t.get(&uri, Some(BOB)).await;
    assert_eq!(body["recorded"], true);
    assert_eq!(body["song"]["play_count"], 2);
    assert_eq!(body["song"]["my_plays"], 1);

    let (_, history) = t.get("/history/my", Some(ALICE)).await;
    assert_eq!(history["count"], 1);
    assert_eq!(history["history"][0]["song_id"], song.id.to_string());
    assert_eq!(history["history"][0]["duration"], 200);
}

#[tokio::test]
async fn unknown_song_is_404() {
    let t = TestApp::new().await;
    let (status, body) = t.get(&format!("/song/{}", Uuid::new_v4()), Some(ALICE)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (_, history) = t.get("/history/my", Some(ALICE)).await;
    assert_eq!(history["count"], 0);
}

// =============================================================================
// History
// =============================================================================

#[tokio::test]
async fn history_is_newest_first_and_scoped_to_the_caller() {
    let t = TestApp::new().await;
    let first = t.song("First", "Ria", None).await;
    let second = t.song("Second", "Ota", None).await;

    t.get(&format!("/song/{}", first.id), Some(ALICE)).await;
    t.get(&format!("/song/{}", second.id), Some(ALICE)).await;

    let (status, body) = t.get("/history/my", Some(ALICE)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["history"][0]["song_id"], second.id.to_string());
    assert_eq!(body["history"][1]["song_id"], first.id.to_string());
    assert_eq!(body["history"][0]["user_id"], t.alice.to_string());

    let (_, body) = t.get("/history/my", Some(BOB)).await;
    assert_eq!(body["count"], 0);
    assert_eq!(body["history"], json!([]));
}

#[tokio::test]
async fn clearing_history_twice_is_fine() {
    let t = TestApp::new().await;
    let song = t.song("Loop", "Ria", None).await;
    t.get(&format!("/song/{}", song.id), Some(ALICE)).await;

    for _ in 0..2 {
        let (status, body) = t.send("DELETE", "/history/clear", Some(ALICE), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "History cleared successfully");
        let (_, history) = t.get("/history/my", Some(ALICE)).await;
        assert_eq!(history["count"], 0);
    }

    // Counters are never decremented.
    assert_eq!(t.db.get_song(song.id).await.unwrap().play_count, 1);
}

#[tokio::test]
async fn last_played_returns_entry_and_song() {
    let t = TestApp::new().await;
    let (status, _) = t.get("/history/lastplayed", Some(ALICE)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let song = t.song("Latest", "Ria", Some(90)).await;
    t.get(&format!("/song/{}", song.id), Some(ALICE)).await;

    let (status, body) = t.get("/history/lastplayed", Some(ALICE)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["history"]["song_id"], song.id.to_string());
    assert_eq!(body["song"]["title"], "Latest");
    assert_eq!(body["song"]["my_plays"], 1);
}

// =============================================================================
// Stats
// =============================================================================

#[tokio::test]
async fn stats_with_no_history_are_zero_and_null() {
    let t = TestApp::new().await;
    let (status, body) = t.get("/stats/my?range=monthly", Some(ALICE)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["range"], "monthly");
    assert_eq!(body["minutes_listened"], 0);
    assert!(body["top_song"].is_null());
    assert!(body["top_artist"].is_null());
}

#[tokio::test]
async fn stats_reflect_recorded_plays() {
    let t = TestApp::new().await;
    let long = t.song("Long", "Ria", Some(240)).await;
    let short = t.song("Short", "Ota", Some(120)).await;
    let untimed = t.song("Untimed", "Ria", None).await;

    for song in [&long, &short, &untimed] {
        t.get(&format!("/song/{}", song.id), Some(ALICE)).await;
    }

    let (status, body) = t.get("/stats/my?range=yearly", Some(ALICE)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["range"], "weekly");
    // 240 + 120 + 180 default seconds.
    assert_eq!(body["minutes_listened"], 9);
    assert_eq!(body["top_song"]["song_id"], long.id.to_string());
    assert_eq!(body["top_song"]["title"], "Long");
    assert_eq!(body["top_song"]["plays"], 1);
    assert_eq!(body["top_artist"]["name"], "Ria");
    assert_eq!(body["top_artist"]["plays"], 2);

    let (_, body) = t.get("/stats/my", Some(BOB)).await;
    assert_eq!(body["minutes_listened"], 0);
}

// =============================================================================
// Songs
// =============================================================================

#[tokio::test]
async fn add_song_validates_metadata() {
    let t = TestApp::new().await;
    let (status, _) = t
        .send(
            "POST",
            "/music/addsong",
            Some(ALICE),
            Some(json!({"title": "X", "artist": "Ria", "file_url": "https://cdn.example/x.mp3"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = t
        .send(
            "POST",
            "/music/addsong",
            Some(ALICE),
            Some(json!({
                "title": "Harbour Lights",
                "artist": "Ria",
                "genre": "Ambient",
                "file_url": "https://cdn.example/harbour.mp3",
                "duration_secs": 215
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["song"]["uploaded_by"], t.alice.to_string());
    assert_eq!(body["song"]["play_count"], 0);

    let (_, mine) = t.get("/music/mysongs", Some(ALICE)).await;
    assert_eq!(mine["count"], 1);
    let (_, all) = t.get("/music/allsongs", None).await;
    assert_eq!(all["songs"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn search_requires_query_and_known_type() {
    let t = TestApp::new().await;
    t.song("Blue Moon Rising", "Ria", None).await;
    t.song("Moonlight", "Ota", None).await;

    let (status, _) = t.get("/music/searchsong?type=title", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = t.get("/music/searchsong?q=moon&type=mood", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = t.get("/music/searchsong?q=MOON&type=title", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "title");
    assert_eq!(body["count"], 2);

    let (_, body) = t.get("/music/searchsong?q=blue%20moon&type=title", None).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["songs"][0]["title"], "Blue Moon Rising");
}

#[tokio::test]
async fn like_and_save_toggle() {
    let t = TestApp::new().await;
    let song = t.song("Toggle", "Ria", None).await;
    let like_uri = format!("/music/like/{}", song.id);

    let (status, body) = t.send("PATCH", &like_uri, Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["liked"], true);
    let (_, liked) = t.get("/music/mylikedsongs", Some(ALICE)).await;
    assert_eq!(liked["count"], 1);
    let (_, top) = t.get("/music/topsongs", None).await;
    assert_eq!(top["songs"][0]["likes"][0], t.alice.to_string());

    let (_, body) = t.send("PATCH", &like_uri, Some(ALICE), None).await;
    assert_eq!(body["liked"], false);

    let (_, body) = t.send("PATCH", &format!("/music/save/{}", song.id), Some(ALICE), None).await;
    assert_eq!(body["saved"], true);
    let (_, saved) = t.get("/music/mysavedsongs", Some(ALICE)).await;
    assert_eq!(saved["count"], 1);

    let (status, _) = t
        .send("PATCH", &format!("/music/like/{}", Uuid::new_v4()), Some(ALICE), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn most_played_carries_my_plays() {
    let t = TestApp::new().await;
    let played = t.song("Played", "Ria", None).await;
    t.song("Never Played", "Ota", None).await;
    t.get(&format!("/song/{}", played.id), Some(ALICE)).await;

    let (status, body) = t.get("/music/mymostplayed", Some(ALICE)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["songs"][0]["id"], played.id.to_string());
    assert_eq!(body["songs"][0]["my_plays"], 1);
}

// =============================================================================
// Playlists
// =============================================================================

async fn create_playlist(t: &TestApp, token: &str, kind: &str) -> (StatusCode, Value) {
    t.send(
        "POST",
        "/playlist/create",
        Some(token),
        Some(json!({"name": "Evening", "description": "Slow songs", "type": kind, "tags": ["calm", " "]})),
    )
    .await
}

#[tokio::test]
async fn playlist_creation_rules() {
    let t = TestApp::new().await;
    let (status, _) = create_playlist(&t, ALICE, "radio").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = create_playlist(&t, ALICE, "user").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["playlist"]["creator_id"], t.alice.to_string());
    assert_eq!(body["playlist"]["is_seeded"], false);
    assert_eq!(body["playlist"]["tags"], json!(["calm"]));

    let (_, body) = create_playlist(&t, ALICE, "system").await;
    assert!(body["playlist"]["creator_id"].is_null());
    assert_eq!(body["playlist"]["is_seeded"], true);

    let (_, mine) = t.get("/playlist/myplaylists", Some(ALICE)).await;
    assert_eq!(mine["count"], 1);
    let (_, public) = t.get("/playlists", None).await;
    assert_eq!(public["count"], 2);
}

#[tokio::test]
async fn only_the_creator_can_modify_a_playlist() {
    let t = TestApp::new().await;
    let song = t.song("Track", "Ria", None).await;
    let (_, body) = create_playlist(&t, ALICE, "user").await;
    let id = body["playlist"]["id"].as_str().unwrap().to_string();

    let (status, _) = t
        .send("PUT", &format!("/playlist/update/{}", id), Some(BOB), Some(json!({"name": "Mine now"})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = t.send("DELETE", &format!("/playlist/delete/{}", id), Some(BOB), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = t
        .send("PUT", &format!("/playlist/update/{}", id), Some(ALICE), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = t
        .send(
            "PUT",
            &format!("/playlist/update/{}", id),
            Some(ALICE),
            Some(json!({"is_public": false})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["playlist"]["is_public"], false);

    // Private now: Bob may not even look at it.
    let (status, _) = t.get(&format!("/playlist/{}", id), Some(BOB)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = t.get(&format!("/playlist/{}", id), Some(ALICE)).await;
    assert_eq!(status, StatusCode::OK);

    let add_uri = format!("/playlist/{}/addsong", id);
    let song_body = json!({"song_id": song.id});
    let (status, _) = t.send("POST", &add_uri, Some(ALICE), Some(song_body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = t.send("POST", &add_uri, Some(ALICE), Some(song_body.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let remove_uri = format!("/playlist/{}/remove-song", id);
    let (status, _) = t.send("DELETE", &remove_uri, Some(ALICE), Some(song_body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = t.send("DELETE", &remove_uri, Some(ALICE), Some(song_body)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = t.send("DELETE", &format!("/playlist/delete/{}", id), Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = t.get(&format!("/playlist/{}", id), Some(ALICE)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Storage Failures and Malformed Input
// =============================================================================

#[tokio::test]
async fn session_store_failure_is_a_server_error() {
    let t = TestApp::new().await;
    let song = t.song("Drift", "Ria", Some(200)).await;
    t.db
        .fail_operation("validate_auth_session", PortError::Timeout("validate_auth_session".into()));

    let (status, body) = t.get("/history/my", Some(ALICE)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to validate session");

    let (status, body) = t.get(&format!("/song/{}", song.id), Some(ALICE)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());

    // Without a token there is nothing to validate.
    let (status, _) = t.get(&format!("/song/{}", song.id), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn failed_history_write_surfaces_on_song_fetch() {
    let t = TestApp::new().await;
    let song = t.song("Drift", "Ria", Some(200)).await;
    t.db
        .fail_operation("insert_history", PortError::Unavailable("connection reset".into()));

    let (status, body) = t.get(&format!("/song/{}", song.id), Some(ALICE)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to record play");

    let (status, body) = t.get(&format!("/song/{}", song.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recorded"], false);

    t.db.restore("insert_history");
    let (status, body) = t.get(&format!("/song/{}", song.id), Some(ALICE)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recorded"], true);
}

#[tokio::test]
async fn malformed_ids_get_a_json_error() {
    let t = TestApp::new().await;

    let (status, body) = t.get("/song/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = t.send("DELETE", "/playlist/delete/42", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

// =============================================================================
// Artists
// =============================================================================

#[tokio::test]
async fn artist_profile_lifecycle() {
    let t = TestApp::new().await;
    t.song("Drift", "Ria", Some(200)).await;
    t.song("Other", "Someone Else", Some(200)).await;

    let (status, _) = t.send("POST", "/createartists", None, Some(json!({"name": "Ria"}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = t.send("POST", "/createartists", Some(ALICE), Some(json!({"name": "R"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = t
        .send(
            "POST",
            "/createartists",
            Some(ALICE),
            Some(json!({
                "name": "  Ria ",
                "genres": ["Lo-fi", " "],
                "social_links": {"website": "https://ria.example", "twitter": ""}
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Artist created successfully");
    assert_eq!(body["artist"]["name"], "Ria");
    assert_eq!(body["artist"]["genres"], json!(["Lo-fi"]));
    assert_eq!(body["artist"]["social_links"]["website"], "https://ria.example");
    assert!(body["artist"]["social_links"]["twitter"].is_null());
    let id = body["artist"]["id"].as_str().unwrap().to_string();

    let (status, body) = t.get(&format!("/artists/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["follower_count"], 0);

    let (status, body) = t.get(&format!("/artists/{}/songs", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["songs"][0]["title"], "Drift");

    let (_, body) = t.get("/artists", None).await;
    assert_eq!(body["count"], 1);

    let (status, _) = t
        .send("PUT", &format!("/updateartists/{}", id), Some(ALICE), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = t
        .send(
            "PUT",
            &format!("/updateartists/{}", id),
            Some(ALICE),
            Some(json!({"bio": "Tape loops", "verified": true})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["artist"]["bio"], "Tape loops");
    assert_eq!(body["artist"]["verified"], true);
    assert_eq!(body["artist"]["name"], "Ria");

    let (status, _) = t.send("DELETE", &format!("/artists/{}", id), Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = t.get(&format!("/artists/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Artist not found");
    let (status, _) = t.send("DELETE", &format!("/artists/{}", id), Some(ALICE), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn following_an_artist() {
    let t = TestApp::new().await;
    let (_, body) = t
        .send("POST", "/createartists", Some(BOB), Some(json!({"name": "Ria"})))
        .await;
    let id = body["artist"]["id"].as_str().unwrap().to_string();
    let follow = format!("/artists/follow/{}", id);
    let unfollow = format!("/artists/unfollow/{}", id);
    let check = format!("/artists/check-following/{}", id);

    let (_, body) = t.get(&check, Some(ALICE)).await;
    assert_eq!(body["is_following"], false);

    let (status, body) = t.send("POST", &follow, Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Successfully followed artist");
    let (status, body) = t.send("POST", &follow, Some(ALICE), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Already following this artist");

    let (_, body) = t.get(&check, Some(ALICE)).await;
    assert_eq!(body["is_following"], true);
    let (_, body) = t.get(&check, Some(BOB)).await;
    assert_eq!(body["is_following"], false);

    let (_, body) = t.get("/artists/followed/me", Some(ALICE)).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["artists"][0]["follower_count"], 1);
    let (_, body) = t.get("/artists/followed/me", Some(BOB)).await;
    assert_eq!(body["count"], 0);

    let (status, _) = t.send("POST", &unfollow, Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = t.send("POST", &unfollow, Some(ALICE), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Artist not found or not following");

    let missing = format!("/artists/follow/{}", Uuid::new_v4());
    let (status, _) = t.send("POST", &missing, Some(ALICE), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Direct Messages
// =============================================================================

#[tokio::test]
async fn messages_share_one_conversation_per_pair() {
    let t = TestApp::new().await;
    let to_bob = format!("/messages/send/{}", t.bob);
    let to_alice = format!("/messages/send/{}", t.alice);

    let (status, body) = t
        .send("POST", &to_bob, Some(ALICE), Some(json!({"message_text": "   "})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Either message_text or photo_url is required");

    let (status, first) = t
        .send("POST", &to_bob, Some(ALICE), Some(json!({"message_text": "hey"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["message"], "Message sent successfully");
    assert_eq!(first["data"]["sender_id"], t.alice.to_string());
    let (_, reply) = t
        .send(
            "POST",
            &to_alice,
            Some(BOB),
            Some(json!({"photo_url": "https://cdn.example/cat.png"})),
        )
        .await;
    assert_eq!(reply["data"]["conversation_id"], first["data"]["conversation_id"]);
    assert!(reply["data"]["message_text"].is_null());

    let (_, from_alice) = t.get(&format!("/messages/conversation/{}", t.bob), Some(ALICE)).await;
    let (_, from_bob) = t.get(&format!("/messages/conversation/{}", t.alice), Some(BOB)).await;
    assert_eq!(from_alice["conversation_id"], first["data"]["conversation_id"]);
    assert_eq!(from_alice, from_bob);
    assert_eq!(from_alice["messages"].as_array().map(Vec::len), Some(2));
    assert_eq!(from_alice["messages"][0]["message_text"], "hey");

    let stranger = Uuid::new_v4();
    let (status, body) = t
        .get(&format!("/messages/conversation/{}", stranger), Some(ALICE))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["conversation_id"].is_null());
    assert_eq!(body["messages"], json!([]));
}

#[tokio::test]
async fn only_the_sender_can_delete_a_message() {
    let t = TestApp::new().await;
    let (_, sent) = t
        .send(
            "POST",
            &format!("/messages/send/{}", t.bob),
            Some(ALICE),
            Some(json!({"message_text": "oops"})),
        )
        .await;
    let delete = format!("/messages/delete/{}", sent["data"]["id"].as_str().unwrap());

    let (status, body) = t.send("DELETE", &delete, Some(BOB), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "You can only delete messages you sent");

    let (status, body) = t.send("DELETE", &delete, Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Message deleted successfully");
    let (status, body) = t.send("DELETE", &delete, Some(ALICE), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Message not found");

    let (_, body) = t.get(&format!("/messages/conversation/{}", t.bob), Some(ALICE)).await;
    assert_eq!(body["messages"], json!([]));
}
