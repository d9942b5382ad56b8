//! Playback engine - single source of truth for the current track
//!
//! Owns the [`PlaybackSession`] and reconciles three event sources into one
//! order on the caller's thread:
//! - backend notices (queued through [`BackendNotifier`], applied by
//!   [`PlaybackEngine::process_pending_notices`])
//! - polling ticks ([`PlaybackEngine::tick`])
//! - direct commands (load, pause, seek, ...)
//!
//! Completion can be detected twice (end-of-stream notice and a tick that
//! sees position ≥ duration). Whichever arrives first wins; the second finds
//! the session already stopped and is ignored.

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, trace, warn};

use crate::backend::{BackendNotice, BackendNotifier, MediaBackend, TaggedNotice};
use crate::error::{PlaybackError, Result};
use crate::events::{EventEmitter, PlaybackEvent, PlaybackListener, SubscriptionId};
use crate::session::{Generation, PlaybackSession};
use crate::types::{DurationSource, PlayMode, PlaybackConfig, PlaybackStatus, Track};
use crate::volume::Volume;

/// A track finished playing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    /// Generation of the load that finished
    pub generation: Generation,

    /// Play mode was single-loop when the track finished
    pub repeat_current: bool,
}

/// Local playback engine
pub struct PlaybackEngine {
    backend: Box<dyn MediaBackend>,
    session: PlaybackSession,
    play_mode: PlayMode,
    volume: Volume,
    duration_jitter_ms: u64,
    emitter: EventEmitter,
    notice_tx: Sender<TaggedNotice>,
    notice_rx: Receiver<TaggedNotice>,
}

impl PlaybackEngine {
    /// Create an engine around a media backend
    ///
    /// The configured volume is forwarded to the backend immediately.
    pub fn new(mut backend: Box<dyn MediaBackend>, config: &PlaybackConfig) -> Self {
        let volume = Volume::new(config.volume);
        backend.set_volume(volume.effective());

        let (notice_tx, notice_rx) = unbounded();

        Self {
            backend,
            session: PlaybackSession::default(),
            play_mode: config.play_mode,
            volume,
            duration_jitter_ms: config.duration_jitter_ms,
            emitter: EventEmitter::new(),
            notice_tx,
            notice_rx,
        }
    }

    // ===== Events =====

    pub fn subscribe(&mut self, listener: impl PlaybackListener + 'static) -> SubscriptionId {
        self.emitter.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.emitter.unsubscribe(id)
    }

    fn emit(&mut self, event: PlaybackEvent) {
        self.emitter.emit(&event);
    }

    // ===== Transport =====

    /// Load a track and start playing it
    ///
    /// Any current playback is stopped first. On backend failure the session
    /// is left stopped with no track and the error is returned.
    pub fn load(&mut self, track: Track, url: impl Into<String>) -> Result<Generation> {
        let url = url.into();
        let was_playing = self.session.status.is_playing();

        if self.has_stream() {
            self.backend.stop();
        }

        let generation = self.session.generation.next();
        self.session.generation = generation;
        self.session.clear_track();
        self.session.status = PlaybackStatus::Stopped;

        debug!(track_id = track.id, %url, generation = generation.value(), "Loading track");

        let notifier = BackendNotifier::new(generation, self.notice_tx.clone());
        let started = match self.backend.open(&url, notifier) {
            Ok(()) => self.backend.play(),
            Err(e) => Err(e),
        };

        if let Err(source) = started {
            warn!(track_id = track.id, %url, error = %source, "Backend failed to start track");
            self.backend.stop();
            if was_playing {
                self.emit(PlaybackEvent::StatusChanged { is_playing: false });
            }
            return Err(PlaybackError::Backend { url, source });
        }

        // A zero length is no more usable than a malformed one
        let declared = track.server_duration_ms().filter(|&ms| ms > 0);
        if declared.is_none() && track.duration.is_some() {
            debug!(
                track_id = track.id,
                duration = ?track.duration,
                "Ignoring unusable server duration"
            );
        }

        let initial_duration = declared
            .map(|ms| (ms, DurationSource::ServerDeclared))
            .or_else(|| {
                track
                    .local_duration_ms
                    .filter(|&ms| ms > 0)
                    .map(|ms| (ms, DurationSource::LocallyMeasured))
            });

        self.session.track = Some(track);
        self.session.url = Some(url);
        self.session.position_ms = 0;

        if let Some((duration_ms, source)) = initial_duration {
            self.session.duration_ms = duration_ms;
            self.session.duration_source = source;
            self.emit(PlaybackEvent::DurationChanged {
                duration_ms,
                source,
            });
        }

        self.session.status = PlaybackStatus::Playing;
        self.emit(PlaybackEvent::StatusChanged { is_playing: true });

        Ok(generation)
    }

    /// Reload the current (or just finished) track from its URL
    pub fn reload_current(&mut self) -> Result<Generation> {
        let (track, url) = match (&self.session.track, &self.session.url) {
            (Some(track), Some(url)) => (track.clone(), url.clone()),
            _ => return Err(PlaybackError::NoTrackLoaded),
        };
        self.load(track, url)
    }

    /// Pause playback; no-op unless playing
    pub fn pause(&mut self) {
        if self.session.status != PlaybackStatus::Playing {
            return;
        }
        self.backend.pause();
        self.session.status = PlaybackStatus::Paused;
        self.emit(PlaybackEvent::StatusChanged { is_playing: false });
    }

    /// Resume playback; no-op unless paused
    pub fn resume(&mut self) -> Result<()> {
        if self.session.status != PlaybackStatus::Paused {
            return Ok(());
        }

        if let Err(source) = self.backend.play() {
            warn!(error = %source, "Backend failed to resume");
            let url = self.session.url.clone().unwrap_or_default();
            self.backend.stop();
            self.reset_to_stopped();
            return Err(PlaybackError::Backend { url, source });
        }

        self.session.status = PlaybackStatus::Playing;
        self.emit(PlaybackEvent::StatusChanged { is_playing: true });
        Ok(())
    }

    /// Pause when playing, resume when paused
    pub fn toggle_play_pause(&mut self) -> Result<()> {
        match self.session.status {
            PlaybackStatus::Playing => {
                self.pause();
                Ok(())
            }
            PlaybackStatus::Paused => self.resume(),
            PlaybackStatus::Stopped => Ok(()),
        }
    }

    /// Stop playback and clear the current track
    ///
    /// Idempotent. Supersedes the current load, so late notices for it are
    /// discarded.
    pub fn stop(&mut self) {
        if !self.has_stream() && self.session.track.is_none() {
            return;
        }

        let was_active = self.has_stream();
        if was_active {
            self.backend.stop();
        }

        self.reset_to_stopped();
        debug!(generation = self.session.generation.value(), "Playback stopped");

        if was_active {
            self.emit(PlaybackEvent::StatusChanged { is_playing: false });
        }
    }

    fn reset_to_stopped(&mut self) {
        self.session.generation = self.session.generation.next();
        self.session.clear_track();
        self.session.status = PlaybackStatus::Stopped;
    }

    /// Playing or paused: the backend holds an open stream
    fn has_stream(&self) -> bool {
        self.session.status != PlaybackStatus::Stopped
    }

    /// Seek within the current track
    ///
    /// The request is clamped to the known duration. Returns the position
    /// sent to the backend, or `None` when nothing is playing. The session
    /// position is updated by the next tick, not here.
    pub fn seek(&mut self, position_ms: u64) -> Option<u64> {
        if !self.has_stream() {
            trace!(position_ms, "Ignoring seek without an active track");
            return None;
        }
        let target = self.session.clamp_position(position_ms);
        self.backend.seek(target);
        Some(target)
    }

    // ===== Volume =====

    /// Set volume (0-100, larger values are clamped)
    pub fn set_volume(&mut self, level: u8) {
        self.volume.set_level(level);
        self.backend.set_volume(self.volume.effective());
        trace!(
            level = self.volume.level(),
            backend = self.backend.volume(),
            "Volume set"
        );
    }

    /// Get current volume level (0-100)
    pub fn volume(&self) -> u8 {
        self.volume.level()
    }

    /// Toggle mute; returns the new mute state
    pub fn toggle_mute(&mut self) -> bool {
        self.volume.toggle_mute();
        self.backend.set_volume(self.volume.effective());
        self.volume.is_muted()
    }

    pub fn is_muted(&self) -> bool {
        self.volume.is_muted()
    }

    // ===== Play mode =====

    pub fn set_play_mode(&mut self, mode: PlayMode) {
        self.play_mode = mode;
    }

    pub fn play_mode(&self) -> PlayMode {
        self.play_mode
    }

    // ===== Backend notices & polling =====

    /// Receiver of queued backend notices, for hosts that wait on it
    pub fn notice_receiver(&self) -> Receiver<TaggedNotice> {
        self.notice_rx.clone()
    }

    /// Apply every queued backend notice in arrival order
    pub fn process_pending_notices(&mut self) -> Option<Completion> {
        let mut completion = None;
        while let Ok(notice) = self.notice_rx.try_recv() {
            if let Some(done) = self.handle_notice(notice) {
                completion = Some(done);
            }
        }
        completion
    }

    /// Apply one backend notice
    pub fn handle_notice(&mut self, tagged: TaggedNotice) -> Option<Completion> {
        if tagged.generation != self.session.generation {
            trace!(
                notice = ?tagged.notice,
                stale = tagged.generation.value(),
                current = self.session.generation.value(),
                "Discarding notice from superseded load"
            );
            return None;
        }

        match tagged.notice {
            BackendNotice::LengthChanged(length_ms) => {
                self.on_length_reported(length_ms);
                None
            }
            BackendNotice::EndReached => self.complete("end of stream"),
        }
    }

    /// Reconcile a locally measured length with the current duration
    ///
    /// An unknown duration takes the first reported value. An established
    /// duration only changes when the new length differs by more than the
    /// jitter threshold.
    fn on_length_reported(&mut self, length_ms: u64) {
        if length_ms == 0 || self.session.track.is_none() {
            return;
        }

        let accept = match self.session.duration_source {
            DurationSource::Unknown => true,
            DurationSource::ServerDeclared | DurationSource::LocallyMeasured => {
                self.session.duration_ms.abs_diff(length_ms) > self.duration_jitter_ms
            }
        };

        if !accept {
            trace!(
                length_ms,
                duration_ms = self.session.duration_ms,
                "Ignoring small length fluctuation"
            );
            return;
        }

        debug!(
            length_ms,
            previous_ms = self.session.duration_ms,
            previous_source = ?self.session.duration_source,
            "Duration updated from decoder"
        );
        self.session.duration_ms = length_ms;
        self.session.duration_source = DurationSource::LocallyMeasured;
        self.session.position_ms = self.session.clamp_position(self.session.position_ms);
        self.emit(PlaybackEvent::DurationChanged {
            duration_ms: length_ms,
            source: DurationSource::LocallyMeasured,
        });
    }

    /// Polling tick: publish position and detect completion
    ///
    /// Does nothing unless playing.
    pub fn tick(&mut self) -> Option<Completion> {
        if self.session.status != PlaybackStatus::Playing {
            return None;
        }

        let raw = self.backend.position();
        let position_ms = self.session.clamp_position(raw);
        self.session.position_ms = position_ms;
        self.emit(PlaybackEvent::PositionChanged { position_ms });

        let duration_ms = self.session.duration_ms;
        if duration_ms > 0 && raw >= duration_ms {
            return self.complete("position reached duration");
        }
        None
    }

    fn complete(&mut self, reason: &str) -> Option<Completion> {
        if self.session.status == PlaybackStatus::Stopped {
            trace!(reason, "Ignoring completion of a stopped session");
            return None;
        }

        self.backend.stop();
        self.session.status = PlaybackStatus::Stopped;
        if self.session.duration_ms > 0 {
            self.session.position_ms = self.session.duration_ms;
        }

        let repeat_current = self.play_mode == PlayMode::SingleLoop;
        debug!(
            reason,
            generation = self.session.generation.value(),
            repeat_current,
            "Track finished"
        );

        self.emit(PlaybackEvent::StatusChanged { is_playing: false });
        self.emit(PlaybackEvent::Finished { repeat_current });

        Some(Completion {
            generation: self.session.generation,
            repeat_current,
        })
    }

    // ===== State Queries =====

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn status(&self) -> PlaybackStatus {
        self.session.status
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.session.track.as_ref()
    }

    /// Whether polling ticks currently do anything
    pub fn is_polling(&self) -> bool {
        self.session.status == PlaybackStatus::Playing
    }
}

impl std::fmt::Debug for PlaybackEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackEngine")
            .field("session", &self.session)
            .field("play_mode", &self.play_mode)
            .field("volume", &self.volume)
            .finish_non_exhaustive()
    }
}
