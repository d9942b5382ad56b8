//! Playback Events
//!
//! Typed observer interface between the engine and the UI layer.
//! Events are emitted at key points:
//! - Status changes (playing or not)
//! - Duration changes (server-declared or locally measured)
//! - Position updates (every polling tick)
//! - Track completion

use serde::{Deserialize, Serialize};

use crate::types::DurationSource;

/// Events emitted by the playback engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackEvent {
    /// Position update from a polling tick
    PositionChanged {
        /// Current position, never beyond a known duration
        position_ms: u64,
    },

    /// Authoritative duration changed
    DurationChanged {
        duration_ms: u64,
        /// Where the new value came from
        source: DurationSource,
    },

    /// Playback started or stopped being active
    StatusChanged { is_playing: bool },

    /// The current track played to its end
    Finished {
        /// Play mode was single-loop: reload the same track instead of
        /// navigating
        repeat_current: bool,
    },
}

/// Receiver of playback events
pub trait PlaybackListener: Send {
    fn on_event(&mut self, event: &PlaybackEvent);
}

impl<F> PlaybackListener for F
where
    F: FnMut(&PlaybackEvent) + Send,
{
    fn on_event(&mut self, event: &PlaybackEvent) {
        self(event);
    }
}

/// Handle returned by [`EventEmitter::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Fan-out of events to subscribed listeners, in subscription order
#[derive(Default)]
pub struct EventEmitter {
    listeners: Vec<(SubscriptionId, Box<dyn PlaybackListener>)>,
    next_id: u64,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl PlaybackListener + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener; returns false if it was not subscribed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn emit(&mut self, event: &PlaybackEvent) {
        for (_, listener) in &mut self.listeners {
            listener.on_event(event);
        }
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
