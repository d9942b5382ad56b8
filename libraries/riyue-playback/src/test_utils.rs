//! Test utilities for playback testing
//!
//! [`ScriptedBackend`] stands in for a platform media backend: it records
//! every command and lets a test drive position, failures and notices.
//! [`EventRecorder`] collects emitted events.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::backend::{BackendNotifier, MediaBackend};
use crate::engine::PlaybackEngine;
use crate::error::BackendError;
use crate::events::{PlaybackEvent, SubscriptionId};

/// Command received by a [`ScriptedBackend`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCommand {
    Open(String),
    Play,
    Pause,
    Stop,
    Seek(u64),
    SetVolume(u8),
}

#[derive(Debug, Default)]
struct ScriptedState {
    commands: Vec<BackendCommand>,
    position_ms: u64,
    volume: u8,
    fail_open: Option<BackendError>,
    fail_play: Option<BackendError>,
    notifier: Option<BackendNotifier>,
}

/// Scriptable in-memory media backend
///
/// Clones share state, so a test keeps one clone and hands another (boxed)
/// to the engine.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBackend {
    state: Arc<Mutex<ScriptedState>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A boxed clone sharing this backend's state
    pub fn boxed(&self) -> Box<dyn MediaBackend> {
        Box::new(self.clone())
    }

    fn state(&self) -> MutexGuard<'_, ScriptedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every command received so far
    pub fn commands(&self) -> Vec<BackendCommand> {
        self.state().commands.clone()
    }

    pub fn clear_commands(&self) {
        self.state().commands.clear();
    }

    /// URLs passed to `open`, in order
    pub fn opened_urls(&self) -> Vec<String> {
        self.state()
            .commands
            .iter()
            .filter_map(|command| match command {
                BackendCommand::Open(url) => Some(url.clone()),
                _ => None,
            })
            .collect()
    }

    /// Position reported to the next poll
    pub fn set_position(&self, position_ms: u64) {
        self.state().position_ms = position_ms;
    }

    /// Make the next `open` fail
    pub fn fail_next_open(&self, error: BackendError) {
        self.state().fail_open = Some(error);
    }

    /// Make the next `play` fail
    pub fn fail_next_play(&self, error: BackendError) {
        self.state().fail_play = Some(error);
    }

    /// Notifier of the most recently opened stream
    pub fn notifier(&self) -> Option<BackendNotifier> {
        self.state().notifier.clone()
    }

    /// Report a decoded length for the current stream
    ///
    /// Returns false when no stream was ever opened.
    pub fn report_length(&self, length_ms: u64) -> bool {
        let Some(notifier) = self.notifier() else {
            return false;
        };
        notifier.length_changed(length_ms);
        true
    }

    /// Report end of stream for the current stream
    pub fn report_end(&self) -> bool {
        let Some(notifier) = self.notifier() else {
            return false;
        };
        notifier.end_reached();
        true
    }

    /// Last volume set by the engine
    pub fn current_volume(&self) -> u8 {
        self.state().volume
    }
}

impl MediaBackend for ScriptedBackend {
    fn open(&mut self, url: &str, notifier: BackendNotifier) -> Result<(), BackendError> {
        let mut state = self.state();
        state.commands.push(BackendCommand::Open(url.to_string()));
        if let Some(error) = state.fail_open.take() {
            return Err(error);
        }
        state.position_ms = 0;
        state.notifier = Some(notifier);
        Ok(())
    }

    fn play(&mut self) -> Result<(), BackendError> {
        let mut state = self.state();
        state.commands.push(BackendCommand::Play);
        match state.fail_play.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn pause(&mut self) {
        self.state().commands.push(BackendCommand::Pause);
    }

    fn stop(&mut self) {
        self.state().commands.push(BackendCommand::Stop);
    }

    fn seek(&mut self, position_ms: u64) {
        let mut state = self.state();
        state.commands.push(BackendCommand::Seek(position_ms));
        state.position_ms = position_ms;
    }

    fn set_volume(&mut self, level: u8) {
        let mut state = self.state();
        state.commands.push(BackendCommand::SetVolume(level));
        state.volume = level;
    }

    fn volume(&self) -> u8 {
        self.state().volume
    }

    fn position(&self) -> u64 {
        self.state().position_ms
    }
}

/// Collects every event an engine emits
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<PlaybackEvent>>>,
}

impl EventRecorder {
    /// Subscribe a new recorder to `engine`
    pub fn attach(engine: &mut PlaybackEngine) -> (Self, SubscriptionId) {
        let recorder = Self::default();
        let sink = Arc::clone(&recorder.events);
        let id = engine.subscribe(move |event: &PlaybackEvent| {
            sink.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event.clone());
        });
        (recorder, id)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PlaybackEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn events(&self) -> Vec<PlaybackEvent> {
        self.lock().clone()
    }

    /// Drain recorded events
    pub fn take(&self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut *self.lock())
    }

    pub fn count(&self, predicate: impl Fn(&PlaybackEvent) -> bool) -> usize {
        self.lock().iter().filter(|event| predicate(event)).count()
    }

    pub fn finished_count(&self) -> usize {
        self.count(|event| matches!(event, PlaybackEvent::Finished { .. }))
    }

    /// Recorded `DurationChanged` values
    pub fn durations(&self) -> Vec<u64> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                PlaybackEvent::DurationChanged { duration_ms, .. } => Some(*duration_ms),
                _ => None,
            })
            .collect()
    }
}
