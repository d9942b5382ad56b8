//! Media backend seam
//!
//! Decoding and audio output are delegated to an external media backend
//! (VLC, GStreamer, a Symphonia/CPAL pipeline, ...). The engine only issues
//! transport commands and consumes two asynchronous notices: the decoded
//! length and end of stream.

use crossbeam_channel::Sender;

use crate::error::BackendError;
use crate::session::Generation;

/// Asynchronous notice raised by a media backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendNotice {
    /// Decoder determined (or revised) the stream length
    LengthChanged(u64),

    /// Stream played to its end
    EndReached,
}

/// A backend notice tagged with the load generation it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaggedNotice {
    pub generation: Generation,
    pub notice: BackendNotice,
}

/// Handle a backend uses to report notices for one opened stream
///
/// Notices may be sent from any thread. They are queued and applied on the
/// engine's thread, where notices from a superseded load are dropped.
#[derive(Debug, Clone)]
pub struct BackendNotifier {
    generation: Generation,
    tx: Sender<TaggedNotice>,
}

impl BackendNotifier {
    pub(crate) fn new(generation: Generation, tx: Sender<TaggedNotice>) -> Self {
        Self { generation, tx }
    }

    /// Generation of the load this notifier was issued for
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Report the decoded stream length in milliseconds
    pub fn length_changed(&self, length_ms: u64) {
        self.send(BackendNotice::LengthChanged(length_ms));
    }

    /// Report that the stream reached its end
    pub fn end_reached(&self) {
        self.send(BackendNotice::EndReached);
    }

    fn send(&self, notice: BackendNotice) {
        // The engine may already be gone during shutdown.
        let _ = self.tx.send(TaggedNotice {
            generation: self.generation,
            notice,
        });
    }
}

/// Platform media backend
///
/// Commands are fire-and-forget except `open` and `play`, whose failures are
/// surfaced to the caller of [`PlaybackEngine::load`](crate::PlaybackEngine::load).
#[cfg_attr(test, mockall::automock)]
pub trait MediaBackend: Send {
    /// Open a stream by URL
    ///
    /// The backend keeps `notifier` and reports length and end-of-stream
    /// through it for as long as this stream is open.
    fn open(&mut self, url: &str, notifier: BackendNotifier) -> Result<(), BackendError>;

    /// Start or resume output
    fn play(&mut self) -> Result<(), BackendError>;

    fn pause(&mut self);

    /// Stop output and release the current stream
    fn stop(&mut self);

    /// Seek to a position in milliseconds
    fn seek(&mut self, position_ms: u64);

    /// Set output volume (0-100)
    fn set_volume(&mut self, level: u8);

    /// Current output volume (0-100)
    fn volume(&self) -> u8;

    /// Current playback position in milliseconds
    fn position(&self) -> u64;
}
