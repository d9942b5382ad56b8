//! Playback service - runs a controller on its own thread
//!
//! Backend notices, polling ticks and commands from the UI all arrive on
//! channels and are applied one at a time by a single thread, so the engine
//! never sees two of them interleaved.

use std::ops::Deref;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, tick, Receiver, RecvTimeoutError, Sender, TrySendError};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::controller::{Advance, ListView, PlaybackController};
use crate::error::{PlaybackError, Result};
use crate::events::PlaybackEvent;
use crate::navigator::{NavOutcome, NextTrigger};
use crate::session::PlaybackSession;
use crate::types::{PlayMode, TrackList};

const COMMAND_CAPACITY: usize = 32;
const EVENT_CAPACITY: usize = 256;

/// Commands sent to the playback thread
#[derive(Debug, Clone)]
pub enum PlaybackCommand {
    /// Select a row and play it
    PlayAt { view: ListView, index: usize },

    Pause,

    Resume,

    TogglePlayPause,

    Stop,

    /// Skip to next track of the active list
    Next,

    /// Go to previous track of the active list
    Previous,

    /// Seek to position (in milliseconds)
    Seek(u64),

    /// Set volume (0-100)
    SetVolume(u8),

    ToggleMute,

    SetPlayMode(PlayMode),

    OpenPlaylist(TrackList),

    ClosePlaylist,

    /// Replace the catalog view
    SetCatalog(TrackList),

    FocusCatalog(bool),

    /// Reply with the current state
    Snapshot(Sender<PlaybackSnapshot>),

    /// Stop playback and end the thread
    Shutdown,
}

/// Events sent from the playback thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceEvent {
    /// Event emitted by the engine
    Playback(PlaybackEvent),

    /// Outcome of next/previous/play-at or of an auto-advance
    Navigated(NavOutcome),

    /// A finished track was started again (single-loop)
    Repeated,

    /// A command failed
    Error(String),
}

/// Point-in-time view of the playback thread's state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackSnapshot {
    pub session: PlaybackSession,
    pub play_mode: PlayMode,
    pub volume: u8,
    pub muted: bool,
    pub active_view: Option<ListView>,
}

impl PlaybackSnapshot {
    fn capture<R: Rng>(controller: &PlaybackController<R>) -> Self {
        let engine = controller.engine();
        Self {
            session: engine.session().clone(),
            play_mode: engine.play_mode(),
            volume: engine.volume(),
            muted: engine.is_muted(),
            active_view: controller.active_view(),
        }
    }
}

/// Cloneable command sender for a running [`PlaybackService`]
///
/// Any number of UI components may hold one. Events are not received here;
/// they go to the single [`PlaybackHandle`].
#[derive(Debug, Clone)]
pub struct PlaybackSender {
    command_tx: Sender<PlaybackCommand>,
}

/// Receiving end of a [`PlaybackService`]
///
/// There is exactly one handle per service, so every [`ServiceEvent`] reaches
/// the same consumer. Commands can be sent through it directly (it derefs to
/// [`PlaybackSender`]) or through clones from [`PlaybackHandle::sender`].
#[derive(Debug)]
pub struct PlaybackHandle {
    sender: PlaybackSender,
    event_rx: Receiver<ServiceEvent>,
}

impl PlaybackHandle {
    /// A new command sender for another component
    pub fn sender(&self) -> PlaybackSender {
        self.sender.clone()
    }

    /// Try to receive next event (non-blocking)
    pub fn try_recv_event(&self) -> Option<ServiceEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Receive next event, waiting at most `timeout`
    pub fn recv_event_timeout(&self, timeout: Duration) -> Option<ServiceEvent> {
        match self.event_rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl Deref for PlaybackHandle {
    type Target = PlaybackSender;

    fn deref(&self) -> &PlaybackSender {
        &self.sender
    }
}

impl PlaybackSender {
    /// Send command to the playback thread
    pub fn send_command(&self, command: PlaybackCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| PlaybackError::ServiceStopped)
    }

    /// Current state, as seen by the playback thread
    pub fn snapshot(&self) -> Result<PlaybackSnapshot> {
        let (reply_tx, reply_rx) = bounded(1);
        self.send_command(PlaybackCommand::Snapshot(reply_tx))?;
        reply_rx.recv().map_err(|_| PlaybackError::ServiceStopped)
    }

    pub fn play_at(&self, view: ListView, index: usize) -> Result<()> {
        self.send_command(PlaybackCommand::PlayAt { view, index })
    }

    pub fn next(&self) -> Result<()> {
        self.send_command(PlaybackCommand::Next)
    }

    pub fn previous(&self) -> Result<()> {
        self.send_command(PlaybackCommand::Previous)
    }

    pub fn pause(&self) -> Result<()> {
        self.send_command(PlaybackCommand::Pause)
    }

    pub fn resume(&self) -> Result<()> {
        self.send_command(PlaybackCommand::Resume)
    }

    pub fn toggle_play_pause(&self) -> Result<()> {
        self.send_command(PlaybackCommand::TogglePlayPause)
    }

    pub fn stop(&self) -> Result<()> {
        self.send_command(PlaybackCommand::Stop)
    }

    pub fn seek(&self, position_ms: u64) -> Result<()> {
        self.send_command(PlaybackCommand::Seek(position_ms))
    }

    pub fn set_volume(&self, level: u8) -> Result<()> {
        self.send_command(PlaybackCommand::SetVolume(level))
    }

    pub fn toggle_mute(&self) -> Result<()> {
        self.send_command(PlaybackCommand::ToggleMute)
    }

    pub fn set_play_mode(&self, mode: PlayMode) -> Result<()> {
        self.send_command(PlaybackCommand::SetPlayMode(mode))
    }

    pub fn open_playlist(&self, tracks: TrackList) -> Result<()> {
        self.send_command(PlaybackCommand::OpenPlaylist(tracks))
    }

    pub fn close_playlist(&self) -> Result<()> {
        self.send_command(PlaybackCommand::ClosePlaylist)
    }

    pub fn set_catalog(&self, tracks: TrackList) -> Result<()> {
        self.send_command(PlaybackCommand::SetCatalog(tracks))
    }

    pub fn focus_catalog(&self, focused: bool) -> Result<()> {
        self.send_command(PlaybackCommand::FocusCatalog(focused))
    }
}

/// Playback thread owning a [`PlaybackController`]
///
/// Dropping the service shuts the thread down and waits for it.
#[derive(Debug)]
pub struct PlaybackService {
    sender: PlaybackSender,
    thread: Option<JoinHandle<()>>,
}

impl PlaybackService {
    /// Move `controller` onto a new playback thread
    ///
    /// Returns the service, which owns the thread, and the one handle that
    /// receives its events.
    pub fn spawn<R>(mut controller: PlaybackController<R>) -> Result<(Self, PlaybackHandle)>
    where
        R: Rng + Send + 'static,
    {
        let (command_tx, command_rx) = bounded(COMMAND_CAPACITY);
        let (event_tx, event_rx) = bounded(EVENT_CAPACITY);

        let engine_events = event_tx.clone();
        controller
            .engine_mut()
            .subscribe(move |event: &PlaybackEvent| {
                forward(&engine_events, ServiceEvent::Playback(event.clone()));
            });

        let thread = thread::Builder::new()
            .name("riyue-playback".to_string())
            .spawn(move || run(controller, &command_rx, &event_tx))?;

        let sender = PlaybackSender { command_tx };
        let service = Self {
            sender: sender.clone(),
            thread: Some(thread),
        };
        Ok((service, PlaybackHandle { sender, event_rx }))
    }

    pub fn sender(&self) -> PlaybackSender {
        self.sender.clone()
    }

    /// Stop playback and wait for the thread to exit
    pub fn shutdown(mut self) -> Result<()> {
        self.join()
    }

    fn join(&mut self) -> Result<()> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        // The thread may already be gone.
        let _ = self.sender.command_tx.send(PlaybackCommand::Shutdown);
        thread.join().map_err(|_| {
            error!("Playback thread panicked");
            PlaybackError::ServiceStopped
        })
    }
}

impl Drop for PlaybackService {
    fn drop(&mut self) {
        if let Err(e) = self.join() {
            warn!(error = %e, "Playback service did not shut down cleanly");
        }
    }
}

fn run<R: Rng>(
    mut controller: PlaybackController<R>,
    commands: &Receiver<PlaybackCommand>,
    events: &Sender<ServiceEvent>,
) {
    let notices = controller.engine().notice_receiver();
    let ticker = tick(controller.config().poll_interval());
    info!(poll_interval = ?controller.config().poll_interval(), "Playback thread started");

    loop {
        select! {
            recv(commands) -> command => match command {
                Ok(PlaybackCommand::Shutdown) | Err(_) => break,
                Ok(command) => process_command(&mut controller, command, events),
            },
            recv(notices) -> notice => {
                if let Ok(notice) = notice {
                    report_advance(events, controller.handle_notice(notice));
                }
            },
            recv(ticker) -> _ => report_advance(events, controller.tick()),
        }
    }

    controller.stop();
    info!("Playback thread stopped");
}

fn process_command<R: Rng>(
    controller: &mut PlaybackController<R>,
    command: PlaybackCommand,
    events: &Sender<ServiceEvent>,
) {
    debug!(?command, "Processing playback command");

    let result = match command {
        PlaybackCommand::PlayAt { view, index } => controller
            .play_at(view, index)
            .map(|_| Some(ServiceEvent::Navigated(NavOutcome::Play(index)))),
        PlaybackCommand::Next => controller
            .next(NextTrigger::Explicit)
            .map(|outcome| Some(ServiceEvent::Navigated(outcome))),
        PlaybackCommand::Previous => controller
            .previous()
            .map(|outcome| Some(ServiceEvent::Navigated(outcome))),
        PlaybackCommand::Pause => {
            controller.pause();
            Ok(None)
        }
        PlaybackCommand::Resume => controller.resume().map(|()| None),
        PlaybackCommand::TogglePlayPause => controller.toggle_play_pause().map(|()| None),
        PlaybackCommand::Stop => {
            controller.stop();
            Ok(None)
        }
        PlaybackCommand::Seek(position_ms) => {
            controller.seek(position_ms);
            Ok(None)
        }
        PlaybackCommand::SetVolume(level) => {
            controller.set_volume(level);
            Ok(None)
        }
        PlaybackCommand::ToggleMute => {
            controller.toggle_mute();
            Ok(None)
        }
        PlaybackCommand::SetPlayMode(mode) => {
            controller.set_play_mode(mode);
            Ok(None)
        }
        PlaybackCommand::OpenPlaylist(tracks) => {
            controller.open_playlist(tracks);
            Ok(None)
        }
        PlaybackCommand::ClosePlaylist => {
            controller.close_playlist();
            Ok(None)
        }
        PlaybackCommand::SetCatalog(tracks) => {
            controller.set_catalog(tracks);
            Ok(None)
        }
        PlaybackCommand::FocusCatalog(focused) => {
            controller.focus_catalog(focused);
            Ok(None)
        }
        PlaybackCommand::Snapshot(reply) => {
            // Requester may have given up waiting.
            let _ = reply.send(PlaybackSnapshot::capture(controller));
            Ok(None)
        }
        PlaybackCommand::Shutdown => Ok(None),
    };

    match result {
        Ok(Some(event)) => forward(events, event),
        Ok(None) => {}
        Err(e) => report_error(events, &e),
    }
}

fn report_advance(events: &Sender<ServiceEvent>, advance: Result<Option<Advance>>) {
    match advance {
        Ok(Some(Advance::Repeated)) => forward(events, ServiceEvent::Repeated),
        Ok(Some(Advance::Navigated(outcome))) => forward(events, ServiceEvent::Navigated(outcome)),
        Ok(None) => {}
        Err(e) => report_error(events, &e),
    }
}

fn report_error(events: &Sender<ServiceEvent>, e: &PlaybackError) {
    warn!(error = %e, "Playback command failed");
    forward(events, ServiceEvent::Error(e.to_string()));
}

/// Queue an event for the UI without ever blocking the playback thread
fn forward(events: &Sender<ServiceEvent>, event: ServiceEvent) {
    match events.try_send(event) {
        Ok(()) | Err(TrySendError::Disconnected(_)) => {}
        Err(TrySendError::Full(event)) => {
            warn!(?event, "Event queue full, dropping event");
        }
    }
}
