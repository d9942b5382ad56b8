//! Core types for playback management

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::duration::parse_server_duration;
use crate::error::{PlaybackError, Result};

/// Path prefix the catalog server serves audio files from
const MUSIC_FILES_PATH: &str = "/api/files/music/";

/// Track information as delivered by the catalog server
///
/// Field names follow the server's camelCase song JSON so a track can be
/// deserialized straight from an API response. Tracks are never mutated once
/// they are part of a [`TrackList`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// Catalog identifier
    pub id: i64,

    /// Track title
    pub title: String,

    /// Artist identifier (optional)
    pub artist_id: Option<i64>,

    /// Artist name (optional)
    pub artist_name: Option<String>,

    /// Album identifier (optional)
    pub album_id: Option<i64>,

    /// Album title (optional)
    pub album_title: Option<String>,

    /// Server-declared duration, formatted `"M:SS"`
    pub duration: Option<String>,

    /// Duration measured locally by a previous decode, in milliseconds
    pub local_duration_ms: Option<u64>,

    /// Stored file location, either an absolute URL or a server-side path
    pub file_url: Option<String>,

    /// Server play counter
    #[serde(default)]
    pub play_count: u64,
}

impl Track {
    /// Create a track with only an id and a title
    pub fn new(id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            artist_id: None,
            artist_name: None,
            album_id: None,
            album_title: None,
            duration: None,
            local_duration_ms: None,
            file_url: None,
            play_count: 0,
        }
    }

    /// Server-declared duration in milliseconds, if present and well formed
    pub fn server_duration_ms(&self) -> Option<u64> {
        self.duration.as_deref().and_then(parse_server_duration)
    }

    /// Resolve the URL the media backend should open for this track
    ///
    /// Absolute `http(s)` URLs are used as-is. Anything else is treated as a
    /// server-side path: only its file name is kept and it is served from the
    /// catalog's music file endpoint under `api_base`.
    pub fn stream_url(&self, api_base: &str) -> Result<String> {
        let file_url = self
            .file_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or(PlaybackError::MissingStreamUrl { track_id: self.id })?;

        if file_url.starts_with("http://") || file_url.starts_with("https://") {
            return Ok(file_url.to_string());
        }

        let file_name = file_url.rsplit('/').next().unwrap_or(file_url);
        Ok(format!(
            "{}{}{}",
            api_base.trim_end_matches('/'),
            MUSIC_FILES_PATH,
            file_name
        ))
    }
}

/// Ordered track list with an optional selected row
///
/// Several lists can exist at once (catalog view, playlist view). Which one
/// drives navigation is decided by the [`PlaybackController`](crate::PlaybackController).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackList {
    tracks: Vec<Track>,
    current: Option<usize>,
}

impl TrackList {
    /// Create a list with no selected row
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            tracks,
            current: None,
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// Selected row, `None` when nothing is selected
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Track at the selected row
    pub fn current_track(&self) -> Option<&Track> {
        self.current.and_then(|index| self.tracks.get(index))
    }

    /// Select a row and return its track
    pub fn select(&mut self, index: usize) -> Result<&Track> {
        let len = self.tracks.len();
        if index >= len {
            return Err(PlaybackError::IndexOutOfBounds { index, len });
        }
        self.current = Some(index);
        Ok(&self.tracks[index])
    }

    pub fn clear_selection(&mut self) {
        self.current = None;
    }
}

impl From<Vec<Track>> for TrackList {
    fn from(tracks: Vec<Track>) -> Self {
        Self::new(tracks)
    }
}

/// Play mode governing next/previous/auto-advance selection
///
/// Persisted by the settings collaborator as a small integer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayMode {
    /// Play through the list once, then stop
    #[default]
    Normal,

    /// Wrap around to the start of the list
    ListLoop,

    /// Pick a random track other than the current one
    Shuffle,

    /// Repeat the current track
    SingleLoop,
}

impl PlayMode {
    /// Decode the persisted integer form; unknown values fall back to `Normal`
    pub fn from_setting(value: i32) -> Self {
        match value {
            1 => PlayMode::ListLoop,
            2 => PlayMode::Shuffle,
            3 => PlayMode::SingleLoop,
            _ => PlayMode::Normal,
        }
    }

    /// Integer form used by the settings collaborator
    pub fn to_setting(self) -> i32 {
        match self {
            PlayMode::Normal => 0,
            PlayMode::ListLoop => 1,
            PlayMode::Shuffle => 2,
            PlayMode::SingleLoop => 3,
        }
    }
}

/// Playback status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackStatus {
    /// Nothing playing (also the state after a track finished)
    #[default]
    Stopped,

    /// Currently playing
    Playing,

    /// Paused mid-track
    Paused,
}

impl PlaybackStatus {
    pub fn is_playing(self) -> bool {
        self == PlaybackStatus::Playing
    }
}

/// Provenance of the authoritative track duration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DurationSource {
    /// Declared by the catalog server
    ServerDeclared,

    /// Measured by the media backend while decoding
    LocallyMeasured,

    /// Not known yet
    #[default]
    Unknown,
}

/// What an explicit "next" does while in [`PlayMode::SingleLoop`]
///
/// Auto-advance after completion always repeats the current track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SingleLoopSkip {
    /// Reselect the current track
    #[default]
    Repeat,

    /// Step to the following track, stopping at the end of the list
    Advance,
}

/// Configuration for the playback engine and controller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Initial volume (0-100, default: 80)
    pub volume: u8,

    /// Initial play mode (default: Normal)
    pub play_mode: PlayMode,

    /// Position polling period in milliseconds (default: 1000)
    pub poll_interval_ms: u64,

    /// Smallest change of locally measured length, in milliseconds, that may
    /// replace an established duration (default: 1000)
    pub duration_jitter_ms: u64,

    /// Explicit skip behaviour in single-loop mode (default: Repeat)
    pub single_loop_skip: SingleLoopSkip,
}

impl PlaybackConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            volume: 80,
            play_mode: PlayMode::Normal,
            poll_interval_ms: 1000,
            duration_jitter_ms: 1000,
            single_loop_skip: SingleLoopSkip::Repeat,
        }
    }
}
