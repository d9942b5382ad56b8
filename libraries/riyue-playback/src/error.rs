//! Error types for playback management

use thiserror::Error;

/// Errors reported by a [`MediaBackend`](crate::MediaBackend) command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The stream or file behind the URL does not exist
    #[error("Media not found: {0}")]
    NotFound(String),

    /// The backend could not open or decode the stream
    #[error("Failed to open media: {0}")]
    Open(String),

    /// A transport command (play, seek, ...) was rejected
    #[error("Backend command failed: {0}")]
    Command(String),
}

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The media backend failed to open or start a stream
    #[error("Backend failed for {url}: {source}")]
    Backend {
        /// URL that was being loaded
        url: String,
        #[source]
        source: BackendError,
    },

    /// No track is currently loaded
    #[error("No track loaded")]
    NoTrackLoaded,

    /// Track has no file URL to stream from
    #[error("Track {track_id} has no stream URL")]
    MissingStreamUrl {
        /// Catalog id of the track
        track_id: i64,
    },

    /// Index outside the track list
    #[error("Index {index} out of bounds for list of {len} tracks")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Neither a playlist view nor a catalog view is available
    #[error("No active track list")]
    NoActiveList,

    /// The playback service thread has exited
    #[error("Playback service stopped")]
    ServiceStopped,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
