//! crates/soundwave_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Duration, Months, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Duration assumed for a history entry that carries none.
pub const DEFAULT_PLAY_SECONDS: i64 = 180;

/// One recorded playback event for a (user, song) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub song_id: Uuid,
    pub played_at: DateTime<Utc>,
    /// Length of the playback in seconds, when known.
    pub duration: Option<i32>,
}

impl HistoryEntry {
    pub fn new(user_id: Uuid, song_id: Uuid, played_at: DateTime<Utc>, duration: Option<i32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            song_id,
            played_at,
            duration,
        }
    }

    /// Seconds this entry contributes to listening time.
    pub fn listened_seconds(&self) -> i64 {
        self.duration.map(i64::from).unwrap_or(DEFAULT_PLAY_SECONDS)
    }
}

/// A song record, including its play counters.
#[derive(Debug, Clone, PartialEq)]
pub struct Song {
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
    /// Total number of counted plays across all users. Never decremented.
    pub play_count: i64,
    /// Counted plays per user. Never decremented.
    pub user_play_counts: BTreeMap<Uuid, i64>,
    pub release_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Song {
    pub fn plays_by(&self, user_id: Uuid) -> i64 {
        self.user_play_counts.get(&user_id).copied().unwrap_or(0)
    }

    /// Applies one counted play to the in-hand copy, mirroring what storage did.
    pub fn count_play(&mut self, user_id: Uuid) {
        self.play_count += 1;
        *self.user_play_counts.entry(user_id).or_insert(0) += 1;
    }
}

/// The data needed to register a song whose audio is already hosted.
#[derive(Debug, Clone)]
pub struct NewSong {
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
    pub release_date: Option<DateTime<Utc>>,
}

impl NewSong {
    pub fn into_song(self, now: DateTime<Utc>) -> Song {
        Song {
            id: Uuid::new_v4(),
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
            likes: Vec::new(),
            saves: Vec::new(),
            play_count: 0,
            user_play_counts: BTreeMap::new(),
            release_date: self.release_date,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The song field a text search runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Title,
    Artist,
    Genre,
    Info,
}

impl SearchField {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "title" => Some(Self::Title),
            "artist" => Some(Self::Artist),
            "genre" => Some(Self::Genre),
            "info" => Some(Self::Info),
            _ => None,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Artist => "artist",
            Self::Genre => "genre",
            Self::Info => "info",
        }
    }

    /// The value of this field on a song, empty when unset.
    pub fn value_of(self, song: &Song) -> &str {
        match self {
            Self::Title => &song.title,
            Self::Artist => &song.artist,
            Self::Genre => song.genre.as_deref().unwrap_or(""),
            Self::Info => song.info.as_deref().unwrap_or(""),
        }
    }
}

//=========================================================================================
// Playlists
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistKind {
    User,
    System,
}

impl PlaylistKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "system" => Some(Self::System),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::System => "system",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Playlist {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub cover_image: Option<String>,
    pub creator_id: Option<Uuid>,
    pub kind: PlaylistKind,
    pub tags: Vec<String>,
    pub song_ids: Vec<Uuid>,
    pub is_public: bool,
    pub is_seeded: bool,
    pub play_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Playlist {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.creator_id == Some(user_id)
    }

    /// Public playlists are visible to everyone, private ones only to their creator.
    pub fn is_visible_to(&self, user_id: Option<Uuid>) -> bool {
        self.is_public || user_id.is_some_and(|id| self.is_owned_by(id))
    }
}

#[derive(Debug, Clone)]
pub struct NewPlaylist {
    pub name: String,
    pub description: String,
    pub cover_image: Option<String>,
    pub creator_id: Option<Uuid>,
    pub kind: PlaylistKind,
    pub tags: Vec<String>,
    pub song_ids: Vec<Uuid>,
}

impl NewPlaylist {
    pub fn into_playlist(self, now: DateTime<Utc>) -> Playlist {
        Playlist {
            id: Uuid::new_v4(),
            name: self.name,
            description: self.description,
            cover_image: self.cover_image,
            creator_id: self.creator_id,
            kind: self.kind,
            tags: self.tags,
            song_ids: self.song_ids,
            is_public: true,
            is_seeded: self.kind == PlaylistKind::System,
            play_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Owner-editable playlist fields; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct PlaylistUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
}

impl PlaylistUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.cover_image.is_none()
            && self.tags.is_none()
            && self.is_public.is_none()
    }

    pub fn apply_to(self, playlist: &mut Playlist, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            playlist.name = name;
        }
        if let Some(description) = self.description {
            playlist.description = description;
        }
        if let Some(cover_image) = self.cover_image {
            playlist.cover_image = Some(cover_image);
        }
        if let Some(tags) = self.tags {
            playlist.tags = tags;
        }
        if let Some(is_public) = self.is_public {
            playlist.is_public = is_public;
        }
        playlist.updated_at = now;
    }
}

//=========================================================================================
// Artists
//=========================================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SocialLinks {
    pub instagram: Option<String>,
    pub twitter: Option<String>,
    pub facebook: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Artist {
    pub id: Uuid,
    pub name: String,
    pub bio: Option<String>,
    pub genres: Vec<String>,
    pub image_url: Option<String>,
    pub followers: Vec<Uuid>,
    pub verified: bool,
    pub social_links: SocialLinks,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Artist {
    pub fn follower_count(&self) -> usize {
        self.followers.len()
    }

    pub fn is_followed_by(&self, user_id: Uuid) -> bool {
        self.followers.contains(&user_id)
    }
}

#[derive(Debug, Clone)]
pub struct NewArtist {
    pub name: String,
    pub bio: Option<String>,
    pub genres: Vec<String>,
    pub image_url: Option<String>,
    pub verified: bool,
    pub social_links: SocialLinks,
}

impl NewArtist {
    pub fn into_artist(self, now: DateTime<Utc>) -> Artist {
        Artist {
            id: Uuid::new_v4(),
            name: self.name,
            bio: self.bio,
            genres: self.genres,
            image_url: self.image_url,
            followers: Vec::new(),
            verified: self.verified,
            social_links: self.social_links,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Editable artist fields; `None` leaves a field untouched. Followers are
/// only changed through follow and unfollow.
#[derive(Debug, Clone, Default)]
pub struct ArtistUpdate {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub genres: Option<Vec<String>>,
    pub image_url: Option<String>,
    pub verified: Option<bool>,
    pub social_links: Option<SocialLinks>,
}

impl ArtistUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.bio.is_none()
            && self.genres.is_none()
            && self.image_url.is_none()
            && self.verified.is_none()
            && self.social_links.is_none()
    }

    pub fn apply_to(self, artist: &mut Artist, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            artist.name = name;
        }
        if let Some(bio) = self.bio {
            artist.bio = Some(bio);
        }
        if let Some(genres) = self.genres {
            artist.genres = genres;
        }
        if let Some(image_url) = self.image_url {
            artist.image_url = Some(image_url);
        }
        if let Some(verified) = self.verified {
            artist.verified = verified;
        }
        if let Some(links) = self.social_links {
            artist.social_links = links;
        }
        artist.updated_at = now;
    }
}

//=========================================================================================
// Direct Messages
//=========================================================================================

/// The thread between two users. Participants are stored in ascending order,
/// so each pair has exactly one conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: Uuid,
    pub participants: (Uuid, Uuid),
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// The participant key for a pair, independent of who sent first.
    pub fn key(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    pub fn between(a: Uuid, b: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            participants: Self::key(a, b),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn includes(&self, user_id: Uuid) -> bool {
        self.participants.0 == user_id || self.participants.1 == user_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub text: Option<String>,
    pub photo_url: Option<String>,
    pub sent_at: DateTime<Utc>,
}

/// A message to send. At least one of `text` and `photo_url` is set.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub text: Option<String>,
    pub photo_url: Option<String>,
}

impl NewMessage {
    pub fn into_message(self, conversation_id: Uuid, now: DateTime<Utc>) -> Message {
        Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            text: self.text,
            photo_url: self.photo_url,
            sent_at: now,
        }
    }
}

//=========================================================================================
// Listening Statistics
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsRange {
    Weekly,
    Monthly,
}

impl StatsRange {
    /// Unrecognized or missing values fall back to weekly.
    pub fn parse_or_weekly(value: Option<&str>) -> Self {
        match value {
            Some("monthly") => Self::Monthly,
            _ => Self::Weekly,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    pub fn window_ending_at(self, now: DateTime<Utc>) -> StatsWindow {
        let from = match self {
            Self::Weekly => now - Duration::days(7),
            Self::Monthly => now
                .checked_sub_months(Months::new(1))
                .unwrap_or_else(|| now - Duration::days(30)),
        };
        StatsWindow {
            range: self,
            from,
            to: now,
        }
    }
}

/// The closed interval `[from, to]` over which statistics are aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsWindow {
    pub range: StatsRange,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl StatsWindow {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from <= at && at <= self.to
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopSong {
    pub song_id: Uuid,
    pub title: String,
    pub artist: String,
    pub image: Option<String>,
    pub plays: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopArtist {
    pub name: String,
    pub plays: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsResult {
    pub range: StatsRange,
    pub minutes_listened: i64,
    pub top_song: Option<TopSong>,
    pub top_artist: Option<TopArtist>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn unknown_range_falls_back_to_weekly() {
        assert_eq!(StatsRange::parse_or_weekly(None), StatsRange::Weekly);
        assert_eq!(StatsRange::parse_or_weekly(Some("yearly")), StatsRange::Weekly);
        assert_eq!(StatsRange::parse_or_weekly(Some("monthly")), StatsRange::Monthly);
    }

    #[test]
    fn weekly_window_has_inclusive_lower_bound() {
        let now = Utc.with_ymd_and_hms(2024, 1, 8, 12, 0, 0).unwrap();
        let window = StatsRange::Weekly.window_ending_at(now);

        assert!(window.contains(now - Duration::days(7)));
        assert!(!window.contains(now - Duration::days(7) - Duration::seconds(1)));
        assert!(window.contains(now));
        assert!(!window.contains(now + Duration::seconds(1)));
    }

    #[test]
    fn monthly_window_steps_back_one_calendar_month() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap();
        let window = StatsRange::Monthly.window_ending_at(now);
        assert_eq!(window.from, Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap());
    }

    #[test]
    fn missing_duration_counts_three_minutes() {
        let entry = HistoryEntry::new(Uuid::new_v4(), Uuid::new_v4(), Utc::now(), None);
        assert_eq!(entry.listened_seconds(), 180);
    }

    #[test]
    fn private_playlist_is_only_visible_to_creator() {
        let owner = Uuid::new_v4();
        let mut playlist = NewPlaylist {
            name: "Late night".into(),
            description: "Slow songs".into(),
            cover_image: None,
            creator_id: Some(owner),
            kind: PlaylistKind::User,
            tags: vec![],
            song_ids: vec![],
        }
        .into_playlist(Utc::now());
        playlist.is_public = false;

        assert!(playlist.is_visible_to(Some(owner)));
        assert!(!playlist.is_visible_to(Some(Uuid::new_v4())));
        assert!(!playlist.is_visible_to(None));
    }

    #[test]
    fn conversation_key_ignores_direction() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(Conversation::key(a, b), Conversation::key(b, a));

        let convo = Conversation::between(b, a, Utc::now());
        assert!(convo.includes(a) && convo.includes(b));
        assert!(!convo.includes(Uuid::new_v4()));
    }

    #[test]
    fn artist_update_keeps_followers() {
        let fan = Uuid::new_v4();
        let mut artist = NewArtist {
            name: "Ria".into(),
            bio: None,
            genres: vec!["Lo-fi".into()],
            image_url: None,
            verified: false,
            social_links: SocialLinks::default(),
        }
        .into_artist(Utc::now());
        artist.followers.push(fan);

        let update = ArtistUpdate {
            verified: Some(true),
            genres: Some(vec![]),
            ..Default::default()
        };
        assert!(!update.is_empty());
        update.apply_to(&mut artist, Utc::now());

        assert!(artist.verified);
        assert!(artist.genres.is_empty());
        assert_eq!(artist.name, "Ria");
        assert!(artist.is_followed_by(fan));
        assert_eq!(artist.follower_count(), 1);
    }
}
