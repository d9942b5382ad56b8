//! Playback controller - glue between track lists, navigation and the engine
//!
//! The controller owns the engine, the navigator and the two track views a
//! client shows: the playlist view (when a playlist is open) and the catalog
//! view. It decides which list drives navigation, turns a navigation outcome
//! into a load, and reacts to completion by repeating or advancing.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::backend::{MediaBackend, TaggedNotice};
use crate::engine::{Completion, PlaybackEngine};
use crate::error::{PlaybackError, Result};
use crate::navigator::{NavOutcome, NextTrigger, PlayQueueNavigator};
use crate::session::Generation;
use crate::settings::PlaybackSettings;
use crate::types::{PlayMode, PlaybackConfig, Track, TrackList};

/// Which track view a request refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListView {
    /// Tracks of the open playlist
    Playlist,

    /// Full catalog listing
    Catalog,
}

/// What happened after a track finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Single-loop: the finished track was reloaded
    Repeated,

    /// The active list was consulted
    Navigated(NavOutcome),
}

/// Playback controller
pub struct PlaybackController<R = StdRng> {
    engine: PlaybackEngine,
    navigator: PlayQueueNavigator<R>,
    settings: Box<dyn PlaybackSettings>,
    config: PlaybackConfig,
    api_base: String,
    playlist: Option<TrackList>,
    catalog: Option<TrackList>,
    catalog_focused: bool,
}

impl PlaybackController<StdRng> {
    /// Create a controller with an entropy-seeded navigator
    pub fn new(
        backend: Box<dyn MediaBackend>,
        settings: Box<dyn PlaybackSettings>,
        config: PlaybackConfig,
        api_base: impl Into<String>,
    ) -> Self {
        Self::with_navigator(backend, settings, config, api_base, PlayQueueNavigator::new())
    }
}

impl<R: Rng> PlaybackController<R> {
    /// Create a controller with a caller-supplied navigator
    ///
    /// Persisted play mode and volume override the ones in `config`.
    pub fn with_navigator(
        backend: Box<dyn MediaBackend>,
        settings: Box<dyn PlaybackSettings>,
        mut config: PlaybackConfig,
        api_base: impl Into<String>,
        mut navigator: PlayQueueNavigator<R>,
    ) -> Self {
        config.play_mode = PlayMode::from_setting(settings.play_mode());
        config.volume = u8::try_from(settings.volume().clamp(0, 100)).unwrap_or(config.volume);
        navigator.set_single_loop_skip(config.single_loop_skip);

        let engine = PlaybackEngine::new(backend, &config);
        let api_base = api_base.into();

        info!(
            play_mode = ?config.play_mode,
            volume = config.volume,
            %api_base,
            "Playback controller ready"
        );

        Self {
            engine,
            navigator,
            settings,
            config,
            api_base,
            playlist: None,
            catalog: None,
            catalog_focused: true,
        }
    }

    pub fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }

    /// Mutable engine access, mainly for subscribing listeners
    pub fn engine_mut(&mut self) -> &mut PlaybackEngine {
        &mut self.engine
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn set_api_base(&mut self, api_base: impl Into<String>) {
        self.api_base = api_base.into();
    }

    // ===== Track views =====

    /// Show a playlist; it takes over navigation until closed
    pub fn open_playlist(&mut self, tracks: TrackList) {
        debug!(tracks = tracks.len(), "Playlist view opened");
        self.playlist = Some(tracks);
    }

    pub fn close_playlist(&mut self) {
        if self.playlist.take().is_some() {
            debug!("Playlist view closed");
        }
    }

    /// Replace the catalog listing (e.g. after a search or reload)
    pub fn set_catalog(&mut self, tracks: TrackList) {
        debug!(tracks = tracks.len(), "Catalog view replaced");
        self.catalog = Some(tracks);
    }

    /// Whether the catalog view is the one on screen
    pub fn focus_catalog(&mut self, focused: bool) {
        self.catalog_focused = focused;
    }

    pub fn playlist(&self) -> Option<&TrackList> {
        self.playlist.as_ref()
    }

    pub fn catalog(&self) -> Option<&TrackList> {
        self.catalog.as_ref()
    }

    pub fn view(&self, view: ListView) -> Option<&TrackList> {
        match view {
            ListView::Playlist => self.playlist.as_ref(),
            ListView::Catalog => self.catalog.as_ref(),
        }
    }

    fn view_mut(&mut self, view: ListView) -> Option<&mut TrackList> {
        match view {
            ListView::Playlist => self.playlist.as_mut(),
            ListView::Catalog => self.catalog.as_mut(),
        }
    }

    /// View that drives next/previous
    ///
    /// An open playlist always wins. Otherwise the catalog applies, but only
    /// while it is focused.
    pub fn active_view(&self) -> Option<ListView> {
        if self.playlist.is_some() {
            Some(ListView::Playlist)
        } else if self.catalog.is_some() && self.catalog_focused {
            Some(ListView::Catalog)
        } else {
            None
        }
    }

    pub fn active_list(&self) -> Option<&TrackList> {
        self.active_view().and_then(|view| self.view(view))
    }

    // ===== Transport =====

    /// Select a row in a view and start playing it
    pub fn play_at(&mut self, view: ListView, index: usize) -> Result<Generation> {
        let list = self.view_mut(view).ok_or(PlaybackError::NoActiveList)?;
        let track: Track = list.select(index)?.clone();
        let url = track.stream_url(&self.api_base)?;
        let track_id = track.id;

        info!(?view, index, track_id, title = %track.title, "Playing track");
        let generation = self.engine.load(track, url)?;
        self.settings.set_last_played(track_id);
        Ok(generation)
    }

    /// Move to the next track of the active list
    ///
    /// `EndOfList` after an auto-advance stops playback; after an explicit
    /// request the current track keeps playing. `NothingToPlay` changes
    /// nothing.
    pub fn next(&mut self, trigger: NextTrigger) -> Result<NavOutcome> {
        let Some(view) = self.active_view() else {
            debug!(?trigger, "Next requested without an active list");
            return Ok(NavOutcome::NothingToPlay);
        };
        let (len, current) = self.position_in(view);
        let outcome = self
            .navigator
            .next(len, current, self.engine.play_mode(), trigger);

        match outcome {
            NavOutcome::Play(index) => {
                self.play_at(view, index)?;
            }
            NavOutcome::EndOfList => {
                debug!(?view, ?trigger, "Reached end of list");
                if trigger == NextTrigger::AutoAdvance {
                    self.engine.stop();
                }
            }
            NavOutcome::NothingToPlay => {}
        }
        Ok(outcome)
    }

    /// Move to the previous track of the active list
    pub fn previous(&mut self) -> Result<NavOutcome> {
        let Some(view) = self.active_view() else {
            debug!("Previous requested without an active list");
            return Ok(NavOutcome::NothingToPlay);
        };
        let (len, current) = self.position_in(view);
        let outcome = self.navigator.previous(len, current, self.engine.play_mode());

        if let NavOutcome::Play(index) = outcome {
            self.play_at(view, index)?;
        }
        Ok(outcome)
    }

    fn position_in(&self, view: ListView) -> (usize, Option<usize>) {
        self.view(view)
            .map_or((0, None), |list| (list.len(), list.current_index()))
    }

    pub fn pause(&mut self) {
        self.engine.pause();
    }

    pub fn resume(&mut self) -> Result<()> {
        self.engine.resume()
    }

    pub fn toggle_play_pause(&mut self) -> Result<()> {
        self.engine.toggle_play_pause()
    }

    pub fn stop(&mut self) {
        self.engine.stop();
    }

    pub fn seek(&mut self, position_ms: u64) -> Option<u64> {
        self.engine.seek(position_ms)
    }

    // ===== Preferences =====

    /// Set and persist the play mode
    pub fn set_play_mode(&mut self, mode: PlayMode) {
        self.engine.set_play_mode(mode);
        self.settings.set_play_mode(mode.to_setting());
        debug!(?mode, "Play mode changed");
    }

    pub fn play_mode(&self) -> PlayMode {
        self.engine.play_mode()
    }

    /// Set and persist the volume (0-100)
    pub fn set_volume(&mut self, level: u8) {
        self.engine.set_volume(level);
        self.settings.set_volume(i32::from(self.engine.volume()));
    }

    pub fn volume(&self) -> u8 {
        self.engine.volume()
    }

    /// Toggle mute; the persisted volume is left alone
    pub fn toggle_mute(&mut self) -> bool {
        self.engine.toggle_mute()
    }

    // ===== Notices & polling =====

    /// Polling tick; handles completion if the track ran out
    pub fn tick(&mut self) -> Result<Option<Advance>> {
        match self.engine.tick() {
            Some(completion) => self.on_completion(completion).map(Some),
            None => Ok(None),
        }
    }

    /// Apply queued backend notices; handles completion if one finished the track
    pub fn process_pending_notices(&mut self) -> Result<Option<Advance>> {
        match self.engine.process_pending_notices() {
            Some(completion) => self.on_completion(completion).map(Some),
            None => Ok(None),
        }
    }

    /// Apply one backend notice received by the host
    pub fn handle_notice(&mut self, notice: TaggedNotice) -> Result<Option<Advance>> {
        match self.engine.handle_notice(notice) {
            Some(completion) => self.on_completion(completion).map(Some),
            None => Ok(None),
        }
    }

    fn on_completion(&mut self, completion: Completion) -> Result<Advance> {
        if completion.repeat_current {
            debug!(generation = completion.generation.value(), "Repeating finished track");
            return match self.engine.reload_current() {
                Ok(_) => Ok(Advance::Repeated),
                Err(e) => {
                    warn!(error = %e, "Failed to repeat track");
                    Err(e)
                }
            };
        }

        let outcome = self.next(NextTrigger::AutoAdvance)?;
        if outcome == NavOutcome::NothingToPlay {
            self.engine.stop();
        }
        Ok(Advance::Navigated(outcome))
    }
}

impl<R> std::fmt::Debug for PlaybackController<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackController")
            .field("engine", &self.engine)
            .field("api_base", &self.api_base)
            .field("playlist", &self.playlist.as_ref().map(TrackList::len))
            .field("catalog", &self.catalog.as_ref().map(TrackList::len))
            .field("catalog_focused", &self.catalog_focused)
            .finish_non_exhaustive()
    }
}
