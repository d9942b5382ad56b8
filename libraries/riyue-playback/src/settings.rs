//! Settings collaborator seam
//!
//! Play mode and volume are persisted outside the core as plain integers.
//! The core reads them once at startup and writes them back on change.

/// Persisted playback preferences
pub trait PlaybackSettings: Send {
    /// Persisted play mode code (see [`PlayMode::from_setting`](crate::PlayMode::from_setting))
    fn play_mode(&self) -> i32;

    fn set_play_mode(&mut self, mode: i32);

    /// Persisted volume (0-100)
    fn volume(&self) -> i32;

    fn set_volume(&mut self, volume: i32);

    /// Remember the last track that started playing
    fn set_last_played(&mut self, _track_id: i64) {}
}

/// Settings kept in memory only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySettings {
    pub play_mode: i32,
    pub volume: i32,
    pub last_played: Option<i64>,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            play_mode: 0,
            volume: 80,
            last_played: None,
        }
    }
}

impl PlaybackSettings for MemorySettings {
    fn play_mode(&self) -> i32 {
        self.play_mode
    }

    fn set_play_mode(&mut self, mode: i32) {
        self.play_mode = mode;
    }

    fn volume(&self) -> i32 {
        self.volume
    }

    fn set_volume(&mut self, volume: i32) {
        self.volume = volume.clamp(0, 100);
    }

    fn set_last_played(&mut self, track_id: i64) {
        self.last_played = Some(track_id);
    }
}
