pub mod domain;
pub mod history;
pub mod memory;
pub mod ports;
pub mod stats;
pub mod timeout;

pub use domain::{
    Artist, ArtistUpdate, Conversation, HistoryEntry, Message, NewArtist, NewMessage, NewPlaylist,
    NewSong, Playlist, PlaylistKind, PlaylistUpdate, SearchField, SocialLinks, Song, StatsRange,
    StatsResult, StatsWindow, TopArtist, TopSong,
};
pub use history::{CounterUpdate, HistoryStore, PlayOutcome, PlayRecorder, RECENT_HISTORY_LIMIT};
pub use memory::InMemoryDatabase;
pub use ports::{DatabaseService, PortError, PortResult};
pub use stats::StatsAggregator;
pub use timeout::TimedDatabase;
