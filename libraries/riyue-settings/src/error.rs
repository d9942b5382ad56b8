//! Error types for settings persistence

use thiserror::Error;

/// Settings errors
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Reading or writing the settings file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings could not be serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Layered settings sources could not be read or merged
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// No home directory to put the default settings file in
    #[error("Home directory not found")]
    NoHomeDirectory,
}

/// Result type for settings operations
pub type Result<T> = std::result::Result<T, SettingsError>;
