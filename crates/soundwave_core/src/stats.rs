//! crates/soundwave_core/src/stats.rs
//!
//! Listening statistics over a weekly or monthly window.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{HistoryEntry, Song, StatsRange, StatsResult, StatsWindow, TopArtist, TopSong};
use crate::ports::{DatabaseService, PortResult};

#[derive(Clone)]
pub struct StatsAggregator {
    db: Arc<dyn DatabaseService>,
}

impl StatsAggregator {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    pub async fn compute(
        &self,
        user_id: Uuid,
        range: StatsRange,
        now: DateTime<Utc>,
    ) -> PortResult<StatsResult> {
        let window = range.window_ending_at(now);
        let entries = self.db.history_between(user_id, window.from, window.to).await?;

        let song_ids = Tally::of_songs(&entries).keys();
        let songs = if song_ids.is_empty() {
            Vec::new()
        } else {
            self.db.get_songs_by_ids(&song_ids).await?
        };

        let result = summarize(&window, &entries, &songs);
        debug!(
            %user_id,
            range = range.as_str(),
            entries = entries.len(),
            minutes = result.minutes_listened,
            "Computed listening stats"
        );
        Ok(result)
    }
}

/// Play counts keyed in first-encountered order, so ties resolve to the
/// earliest key.
struct Tally<K> {
    order: Vec<(K, u32)>,
    index: HashMap<K, usize>,
}

impl<K: Clone + Eq + std::hash::Hash> Tally<K> {
    fn new() -> Self {
        Self {
            order: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn add(&mut self, key: K, plays: u32) {
        match self.index.get(&key) {
            Some(&i) => self.order[i].1 += plays,
            None => {
                self.index.insert(key.clone(), self.order.len());
                self.order.push((key, plays));
            }
        }
    }

    fn keys(&self) -> Vec<K> {
        self.order.iter().map(|(k, _)| k.clone()).collect()
    }

    /// Keys by descending count; ties keep first-encountered order.
    fn ranked(&self) -> Vec<(&K, u32)> {
        let mut ranked: Vec<(&K, u32)> = self.order.iter().map(|(k, plays)| (k, *plays)).collect();
        ranked.sort_by_key(|(_, plays)| std::cmp::Reverse(*plays));
        ranked
    }

    /// Highest count; the first key encountered wins a tie.
    fn leader(&self) -> Option<(&K, u32)> {
        let mut best: Option<(&K, u32)> = None;
        for (key, plays) in &self.order {
            if best.map_or(true, |(_, top)| *plays > top) {
                best = Some((key, *plays));
            }
        }
        best
    }
}

impl Tally<Uuid> {
    fn of_songs(entries: &[HistoryEntry]) -> Self {
        let mut tally = Self::new();
        for entry in entries {
            tally.add(entry.song_id, 1);
        }
        tally
    }
}

/// Computes the statistics for `window` from history entries and the songs
/// they reference. Entries outside the window are ignored; songs that are not
/// supplied are treated as unresolvable.
pub fn summarize(window: &StatsWindow, entries: &[HistoryEntry], songs: &[Song]) -> StatsResult {
    let mut in_window: Vec<&HistoryEntry> =
        entries.iter().filter(|e| window.contains(e.played_at)).collect();
    in_window.sort_by_key(|e| e.played_at);

    let total_seconds: i64 = in_window.iter().map(|e| e.listened_seconds()).sum();

    let mut song_tally = Tally::new();
    for entry in &in_window {
        song_tally.add(entry.song_id, 1);
    }

    let by_id: HashMap<Uuid, &Song> = songs.iter().map(|s| (s.id, s)).collect();

    // A deleted song cannot be displayed, so the best one that resolves wins.
    let top_song = song_tally.ranked().into_iter().find_map(|(song_id, plays)| {
        by_id.get(song_id).map(|song| TopSong {
            song_id: *song_id,
            title: song.title.clone(),
            artist: song.artist.clone(),
            image: song.image_url.clone(),
            plays,
        })
    });

    let mut artist_tally = Tally::new();
    for (song_id, plays) in &song_tally.order {
        if let Some(song) = by_id.get(song_id) {
            let artist = song.artist.trim();
            if !artist.is_empty() {
                artist_tally.add(artist.to_string(), *plays);
            }
        }
    }
    let top_artist = artist_tally.leader().map(|(name, plays)| TopArtist {
        name: name.clone(),
        plays,
    });

    StatsResult {
        range: window.range,
        minutes_listened: total_seconds / 60,
        top_song,
        top_artist,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewSong, DEFAULT_PLAY_SECONDS};
    use crate::history::PlayRecorder;
    use crate::memory::InMemoryDatabase;
    use chrono::{Duration, TimeZone};

    fn song(artist: &str, duration_secs: Option<i32>) -> Song {
        NewSong {
            title: format!("{artist} track"),
            artist: artist.to_string(),
            album: None,
            genre: None,
            language: None,
            info: None,
            file_url: "https://cdn.example/a.mp3".into(),
            image_url: Some("https://cdn.example/a.jpg".into()),
            duration_secs,
            uploaded_by: Uuid::new_v4(),
            release_date: None,
        }
        .into_song(Utc::now())
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap()
    }

    #[test]
    fn empty_window_has_no_leaders() {
        let window = StatsRange::Weekly.window_ending_at(now());
        let result = summarize(&window, &[], &[]);
        assert_eq!(result.minutes_listened, 0);
        assert!(result.top_song.is_none());
        assert!(result.top_artist.is_none());
    }

    #[test]
    fn lower_bound_is_inclusive() {
        let user = Uuid::new_v4();
        let s = song("Ria", Some(120));
        let window = StatsRange::Weekly.window_ending_at(now());
        let on_edge = HistoryEntry::new(user, s.id, now() - Duration::days(7), Some(120));
        let past_edge = HistoryEntry::new(
            user,
            Uuid::new_v4(),
            now() - Duration::days(7) - Duration::seconds(1),
            Some(600),
        );

        let result = summarize(&window, &[on_edge, past_edge], &[s]);
        assert_eq!(result.minutes_listened, 2);
        assert_eq!(result.top_song.unwrap().plays, 1);
    }

    #[test]
    fn missing_duration_defaults_to_three_minutes() {
        let user = Uuid::new_v4();
        let s = song("Ria", None);
        let window = StatsRange::Weekly.window_ending_at(now());
        let entry = HistoryEntry::new(user, s.id, now() - Duration::hours(1), None);

        let result = summarize(&window, &[entry], &[s]);
        assert_eq!(result.minutes_listened, DEFAULT_PLAY_SECONDS / 60);
    }

    #[test]
    fn minutes_divide_the_summed_seconds() {
        let user = Uuid::new_v4();
        let window = StatsRange::Weekly.window_ending_at(now());
        let entries = vec![
            HistoryEntry::new(user, Uuid::new_v4(), now() - Duration::hours(2), Some(90)),
            HistoryEntry::new(user, Uuid::new_v4(), now() - Duration::hours(1), Some(90)),
        ];
        assert_eq!(summarize(&window, &entries, &[]).minutes_listened, 3);
    }

    #[test]
    fn artist_plays_sum_across_songs() {
        let user = Uuid::new_v4();
        let solo = song("Ria", Some(60));
        let mut duo_a = song("Arjun", Some(60));
        let mut duo_b = song("Arjun", Some(60));
        duo_a.title = "First".into();
        duo_b.title = "Second".into();
        let window = StatsRange::Weekly.window_ending_at(now());
        let entries = vec![
            HistoryEntry::new(user, solo.id, now() - Duration::hours(3), None),
            HistoryEntry::new(user, duo_a.id, now() - Duration::hours(2), None),
            HistoryEntry::new(user, duo_b.id, now() - Duration::hours(1), None),
        ];

        let result = summarize(&window, &entries, &[solo.clone(), duo_a, duo_b]);
        let artist = result.top_artist.unwrap();
        assert_eq!(artist.name, "Arjun");
        assert_eq!(artist.plays, 2);
        // All songs tie at one play; the earliest played wins.
        assert_eq!(result.top_song.unwrap().song_id, solo.id);
    }

    #[test]
    fn unresolved_songs_yield_no_artist() {
        let user = Uuid::new_v4();
        let window = StatsRange::Monthly.window_ending_at(now());
        let entries = vec![HistoryEntry::new(user, Uuid::new_v4(), now(), Some(60))];

        let result = summarize(&window, &entries, &[]);
        assert_eq!(result.minutes_listened, 1);
        assert!(result.top_song.is_none());
        assert!(result.top_artist.is_none());
        assert_eq!(result.range, StatsRange::Monthly);
    }

    #[test]
    fn unresolved_leader_gives_way_to_next_song() {
        let user = Uuid::new_v4();
        let kept = song("Ria", Some(60));
        let deleted = Uuid::new_v4();
        let window = StatsRange::Weekly.window_ending_at(now());
        let entries = vec![
            HistoryEntry::new(user, deleted, now() - Duration::hours(3), None),
            HistoryEntry::new(user, deleted, now() - Duration::hours(2), None),
            HistoryEntry::new(user, kept.id, now() - Duration::hours(1), None),
        ];

        let result = summarize(&window, &entries, &[kept.clone()]);
        let top = result.top_song.unwrap();
        assert_eq!(top.song_id, kept.id);
        assert_eq!(top.plays, 1);
        assert_eq!(result.top_artist.unwrap().name, "Ria");
    }

    #[tokio::test]
    async fn end_to_end_listening_session() {
        let db = Arc::new(InMemoryDatabase::new());
        let recorder = PlayRecorder::new(db.clone(), Duration::seconds(10));
        let stats = StatsAggregator::new(db.clone());
        let u1 = Uuid::new_v4();

        let new_song = |title: &str, artist: &str, secs| NewSong {
            title: title.to_string(),
            artist: artist.to_string(),
            album: None,
            genre: None,
            language: None,
            info: None,
            file_url: format!("https://cdn.example/{title}.mp3"),
            image_url: None,
            duration_secs: Some(secs),
            uploaded_by: Uuid::new_v4(),
            release_date: None,
        };
        let s1 = db.create_song(new_song("s1", "Ria", 240)).await.unwrap();
        let s2 = db.create_song(new_song("s2", "Arjun", 120)).await.unwrap();

        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(recorder.record_play(u1, &s1, start).await.unwrap().recorded);
        assert!(recorder
            .record_play(u1, &s2, start + Duration::seconds(10))
            .await
            .unwrap()
            .recorded);
        assert!(recorder
            .record_play(u1, &s2, start + Duration::seconds(30))
            .await
            .unwrap()
            .recorded);

        let history = db.list_recent_history(u1, 50).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(db.get_song(s1.id).await.unwrap().play_count, 1);
        assert_eq!(db.get_song(s2.id).await.unwrap().play_count, 2);

        let now = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let result = stats.compute(u1, StatsRange::Weekly, now).await.unwrap();
        assert_eq!(result.minutes_listened, 6);

        // One retained entry per song: a tie, won by the song played first.
        let top = result.top_song.unwrap();
        assert_eq!(top.song_id, s1.id);
        assert_eq!(top.plays, 1);
        assert_eq!(top.title, "s1");
        assert_eq!(result.top_artist.unwrap().name, "Ria");
    }
}
