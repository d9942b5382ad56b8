//! RiYue - Client Settings
//!
//! Plain key-value settings for the RiYue music client, persisted as one
//! JSON object (by default `~/.music_client.json`).
//!
//! Values are read through the `config` crate: the settings file, if
//! present, layered with `RIYUE_*` environment overrides. Every change is
//! written back immediately.
//!
//! [`ClientSettings`] implements [`PlaybackSettings`], so it can be handed to
//! a [`PlaybackController`](riyue_playback::PlaybackController) directly.

mod error;

use std::fs;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use riyue_playback::PlaybackSettings;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use error::{Result, SettingsError};

/// File name of the settings file in the home directory
pub const SETTINGS_FILE_NAME: &str = ".music_client.json";

/// Prefix of environment variables overriding file values
pub const ENV_PREFIX: &str = "RIYUE";

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_THEME: &str = "light";
pub const DEFAULT_VOLUME: i32 = 80;

/// Stored settings values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsData {
    /// Base URL of the catalog server
    pub api_url: String,

    /// Session token, `None` when logged out
    pub token: Option<String>,

    /// Volume (0-100)
    pub volume: i32,

    pub last_played_song_id: Option<i64>,

    /// UI theme name
    pub theme: String,

    /// Play mode code, see [`riyue_playback::PlayMode::from_setting`]
    pub play_mode: i32,
}

impl Default for SettingsData {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            volume: DEFAULT_VOLUME,
            last_played_song_id: None,
            theme: DEFAULT_THEME.to_string(),
            play_mode: 0,
        }
    }
}

impl SettingsData {
    /// Read the settings file (if any) layered with environment overrides
    pub fn load(path: &Path, env: Environment) -> Result<Self> {
        let layered = Config::builder()
            .add_source(File::from(path).format(FileFormat::Json).required(false))
            .add_source(env.try_parsing(true))
            .build()?;
        Ok(layered.try_deserialize()?)
    }
}

/// Client settings bound to a settings file
#[derive(Debug, Clone)]
pub struct ClientSettings {
    path: PathBuf,
    data: SettingsData,
}

impl ClientSettings {
    /// `~/.music_client.json`
    pub fn default_path() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(SETTINGS_FILE_NAME))
            .ok_or(SettingsError::NoHomeDirectory)
    }

    /// Open the settings file in the home directory
    pub fn open_default() -> Result<Self> {
        Ok(Self::open(Self::default_path()?))
    }

    /// Open a settings file with `RIYUE_*` environment overrides
    ///
    /// A missing file yields defaults. An unreadable or corrupt one also
    /// yields defaults, with a warning; it is overwritten on the next change.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::open_with_env(path, Environment::with_prefix(ENV_PREFIX))
    }

    /// Open a settings file with a custom environment source
    pub fn open_with_env(path: impl Into<PathBuf>, env: Environment) -> Self {
        let path = path.into();
        let data = match SettingsData::load(&path, env) {
            Ok(data) => data,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to read settings, using defaults"
                );
                SettingsData::default()
            }
        };
        debug!(path = %path.display(), "Settings loaded");
        Self { path, data }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data(&self) -> &SettingsData {
        &self.data
    }

    /// Write all values to the settings file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.data)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    /// Change values and persist them
    pub fn update(&mut self, apply: impl FnOnce(&mut SettingsData)) -> Result<()> {
        apply(&mut self.data);
        self.save()
    }

    /// Change values and persist them, logging instead of failing
    fn update_logged(&mut self, key: &str, apply: impl FnOnce(&mut SettingsData)) {
        if let Err(e) = self.update(apply) {
            warn!(key, path = %self.path.display(), error = %e, "Failed to persist setting");
        }
    }

    pub fn api_url(&self) -> &str {
        &self.data.api_url
    }

    pub fn set_api_url(&mut self, url: impl Into<String>) -> Result<()> {
        let url = url.into();
        self.update(|data| data.api_url = url)
    }

    pub fn token(&self) -> Option<&str> {
        self.data.token.as_deref()
    }

    /// Set or clear (`None`) the session token
    pub fn set_token(&mut self, token: Option<String>) -> Result<()> {
        self.update(|data| data.token = token)
    }

    pub fn theme(&self) -> &str {
        &self.data.theme
    }

    pub fn set_theme(&mut self, theme: impl Into<String>) -> Result<()> {
        let theme = theme.into();
        self.update(|data| data.theme = theme)
    }

    pub fn last_played_song_id(&self) -> Option<i64> {
        self.data.last_played_song_id
    }
}

impl PlaybackSettings for ClientSettings {
    fn play_mode(&self) -> i32 {
        self.data.play_mode
    }

    fn set_play_mode(&mut self, mode: i32) {
        self.update_logged("play_mode", |data| data.play_mode = mode);
    }

    fn volume(&self) -> i32 {
        self.data.volume
    }

    fn set_volume(&mut self, volume: i32) {
        self.update_logged("volume", |data| data.volume = volume.clamp(0, 100));
    }

    fn set_last_played(&mut self, track_id: i64) {
        self.update_logged("last_played_song_id", |data| {
            data.last_played_song_id = Some(track_id);
        });
    }
}
