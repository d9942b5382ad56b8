//! Playback session state owned by the engine

use serde::{Deserialize, Serialize};

use crate::types::{DurationSource, PlaybackStatus, Track};

/// Load generation token
///
/// Incremented on every load and on every stop that supersedes a load.
/// Backend notices carry the generation they were issued for; notices from
/// an older generation are discarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Generation(u64);

impl Generation {
    pub fn value(self) -> u64 {
        self.0
    }

    pub(crate) fn next(self) -> Self {
        Generation(self.0.wrapping_add(1))
    }
}

/// What is playing, where, and for how long
///
/// One session exists per engine and is mutated in place; only the engine
/// writes to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackSession {
    pub(crate) track: Option<Track>,
    pub(crate) url: Option<String>,
    pub(crate) status: PlaybackStatus,
    pub(crate) position_ms: u64,
    pub(crate) duration_ms: u64,
    pub(crate) duration_source: DurationSource,
    pub(crate) generation: Generation,
}

impl PlaybackSession {
    pub fn track(&self) -> Option<&Track> {
        self.track.as_ref()
    }

    /// URL the current track was opened from
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    /// Last polled position, never beyond a known duration
    pub fn position_ms(&self) -> u64 {
        self.position_ms
    }

    /// Authoritative duration, 0 when unknown
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn duration_source(&self) -> DurationSource {
        self.duration_source
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub(crate) fn clear_track(&mut self) {
        self.track = None;
        self.url = None;
        self.position_ms = 0;
        self.duration_ms = 0;
        self.duration_source = DurationSource::Unknown;
    }

    /// Clamp a raw backend position against the known duration
    pub(crate) fn clamp_position(&self, position_ms: u64) -> u64 {
        if self.duration_ms > 0 {
            position_ms.min(self.duration_ms)
        } else {
            position_ms
        }
    }
}
