//! Event types for the jukebot event system
//!
//! Session loops emit `SessionEvent`s through an `EventBus`
//! (tokio::broadcast). The HTTP layer streams them to SSE clients, and the
//! chat glue subscribes to turn them into user-visible messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::track::Track;

/// Why a session was torn down
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DestroyReason {
    /// Queue stayed empty past the idle timeout
    Idle,
    /// Explicit teardown request (leave/disconnect command)
    Requested,
}

impl std::fmt::Display for DestroyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DestroyReason::Idle => write!(f, "idle"),
            DestroyReason::Requested => write!(f, "requested"),
        }
    }
}

/// Jukebot event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// A track was handed to the playback sink
    TrackStarted {
        session_id: String,
        track: Track,
        timestamp: DateTime<Utc>,
    },

    /// The sink signalled completion for the current track
    TrackFinished {
        session_id: String,
        track_id: String,
        errored: bool,
        timestamp: DateTime<Utc>,
    },

    /// Queue contents changed (enqueue, play-now, stop, autoplay feed)
    QueueChanged {
        session_id: String,
        timestamp: DateTime<Utc>,
    },

    /// A raw request could not be resolved to a playable track
    ResolutionFailed {
        session_id: String,
        query: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// Autoplay found no candidate this cycle
    AutoplayExhausted {
        session_id: String,
        timestamp: DateTime<Utc>,
    },

    /// Autoplay flag toggled
    AutoplayChanged {
        session_id: String,
        enabled: bool,
        timestamp: DateTime<Utc>,
    },

    /// Session volume changed (user-facing 1-100 scale)
    VolumeChanged {
        session_id: String,
        volume: u8,
        timestamp: DateTime<Utc>,
    },

    /// Session removed from the registry
    SessionDestroyed {
        session_id: String,
        reason: DestroyReason,
        timestamp: DateTime<Utc>,
    },
}

impl SessionEvent {
    /// Get event type as string for SSE event names and filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::TrackStarted { .. } => "TrackStarted",
            SessionEvent::TrackFinished { .. } => "TrackFinished",
            SessionEvent::QueueChanged { .. } => "QueueChanged",
            SessionEvent::ResolutionFailed { .. } => "ResolutionFailed",
            SessionEvent::AutoplayExhausted { .. } => "AutoplayExhausted",
            SessionEvent::AutoplayChanged { .. } => "AutoplayChanged",
            SessionEvent::VolumeChanged { .. } => "VolumeChanged",
            SessionEvent::SessionDestroyed { .. } => "SessionDestroyed",
        }
    }

    /// Session this event belongs to
    pub fn session_id(&self) -> &str {
        match self {
            SessionEvent::TrackStarted { session_id, .. }
            | SessionEvent::TrackFinished { session_id, .. }
            | SessionEvent::QueueChanged { session_id, .. }
            | SessionEvent::ResolutionFailed { session_id, .. }
            | SessionEvent::AutoplayExhausted { session_id, .. }
            | SessionEvent::AutoplayChanged { session_id, .. }
            | SessionEvent::VolumeChanged { session_id, .. }
            | SessionEvent::SessionDestroyed { session_id, .. } => session_id,
        }
    }
}

/// One-to-many event broadcaster
///
/// Thin wrapper over `tokio::sync::broadcast` so every component emits and
/// subscribes through the same type. Events emitted before subscription are
/// not received; slow subscribers may lag and drop old events.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)`, or `Err` when no subscriber is
    /// listening.
    pub fn emit(
        &self,
        event: SessionEvent,
    ) -> Result<usize, broadcast::error::SendError<SessionEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the no-subscribers case
    ///
    /// Session loops use this for every emission: it is acceptable for no
    /// chat glue or SSE client to be connected.
    pub fn emit_lossy(&self, event: SessionEvent) {
        if self.tx.send(event).is_err() {
            debug!("event emitted with no subscribers");
        }
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
