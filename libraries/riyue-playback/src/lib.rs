//! RiYue - Local Playback
//!
//! Playback core for the RiYue music client.
//!
//! This crate provides:
//! - A playback engine owning the current session (track, status, position,
//!   duration) with duration reconciliation and idempotent completion
//! - A play queue navigator for next/previous across four play modes
//!   (normal, list loop, shuffle, single loop)
//! - A controller tying track views, navigation and persisted preferences
//!   to the engine
//! - A playback service running the controller on its own thread
//!
//! # Architecture
//!
//! `riyue-playback` does no decoding and no audio output. Both are delegated
//! to a [`MediaBackend`] supplied by the platform (VLC, GStreamer, ...).
//! Settings persistence is behind [`PlaybackSettings`].
//!
//! # Example
//!
//! ```rust
//! use riyue_playback::{
//!     BackendError, BackendNotifier, ListView, MediaBackend, MemorySettings,
//!     NavOutcome, NextTrigger, PlaybackConfig, PlaybackController, Track, TrackList,
//! };
//!
//! // Implement MediaBackend for your platform
//! struct SilentBackend;
//!
//! impl MediaBackend for SilentBackend {
//!     fn open(&mut self, _url: &str, _notifier: BackendNotifier) -> Result<(), BackendError> {
//!         Ok(())
//!     }
//!     fn play(&mut self) -> Result<(), BackendError> {
//!         Ok(())
//!     }
//!     fn pause(&mut self) {}
//!     fn stop(&mut self) {}
//!     fn seek(&mut self, _position_ms: u64) {}
//!     fn set_volume(&mut self, _level: u8) {}
//!     fn volume(&self) -> u8 {
//!         80
//!     }
//!     fn position(&self) -> u64 {
//!         0
//!     }
//! }
//!
//! let mut controller = PlaybackController::new(
//!     Box::new(SilentBackend),
//!     Box::new(MemorySettings::default()),
//!     PlaybackConfig::default(),
//!     "http://localhost:8080",
//! );
//!
//! let tracks: TrackList = (1..=3)
//!     .map(|id| Track {
//!         file_url: Some(format!("/uploads/{id}.mp3")),
//!         ..Track::new(id, format!("Song {id}"))
//!     })
//!     .collect::<Vec<_>>()
//!     .into();
//! controller.set_catalog(tracks);
//!
//! controller.play_at(ListView::Catalog, 0).unwrap();
//! assert_eq!(
//!     controller.next(NextTrigger::Explicit).unwrap(),
//!     NavOutcome::Play(1)
//! );
//! ```

mod backend;
mod controller;
mod duration;
mod engine;
mod error;
mod events;
mod navigator;
mod service;
mod session;
mod settings;
pub mod types;
mod volume;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Public exports
pub use backend::{BackendNotice, BackendNotifier, MediaBackend, TaggedNotice};
pub use controller::{Advance, ListView, PlaybackController};
pub use duration::{format_duration, parse_server_duration};
pub use engine::{Completion, PlaybackEngine};
pub use error::{BackendError, PlaybackError, Result};
pub use events::{EventEmitter, PlaybackEvent, PlaybackListener, SubscriptionId};
pub use navigator::{NavOutcome, NextTrigger, PlayQueueNavigator};
pub use service::{
    PlaybackCommand, PlaybackHandle, PlaybackSender, PlaybackService, PlaybackSnapshot,
    ServiceEvent,
};
pub use session::{Generation, PlaybackSession};
pub use settings::{MemorySettings, PlaybackSettings};
pub use types::{
    DurationSource, PlayMode, PlaybackConfig, PlaybackStatus, SingleLoopSkip, Track, TrackList,
};
pub use volume::Volume;
