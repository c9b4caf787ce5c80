//! Event types and event bus
//!
//! All scheduler notifications flow through the central [`WradEvent`] enum,
//! broadcast via [`EventBus`] and serialized as-is for SSE transmission.
//! The engine is the only emitter; subscribers are the HTTP event stream and
//! in-process observers (tests, startup logging).

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::warn;

use crate::model::{SchedulerState, TrackInfo};

/// Default broadcast channel capacity when none is configured.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Classifies [`WradEvent::SchedulerError`] traffic for subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// Credentials rejected by the content source; requires reconfiguration.
    Auth,
    /// Transient content-source failure; retried at the next natural trigger.
    Source,
    /// Playback backend command failed; scheduler stops.
    Backend,
    /// Internal invariant violation.
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Auth => write!(f, "auth"),
            ErrorKind::Source => write!(f, "source"),
            ErrorKind::Backend => write!(f, "backend"),
            ErrorKind::Internal => write!(f, "internal"),
        }
    }
}

/// WRAD event types
///
/// Events are broadcast via [`EventBus`] and serialized for SSE transmission.
/// Every variant carries the wall-clock time at which it was emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WradEvent {
    /// Scheduler state changed, including track advancement while `playing`.
    ///
    /// Emitted on every transition and on every advancement so UI layers can
    /// mirror `{state, current_track}` without polling.
    StateChanged {
        state: SchedulerState,
        /// Track now at the queue head, if any.
        current_track: Option<TrackInfo>,
        /// When the transition happened
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A station was selected and its initial batch fetch started.
    StationSelected {
        station_id: String,
        station_name: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The backend was told to play a new queue head.
    TrackStarted {
        track: TrackInfo,
        /// Queue length including the track that just started.
        queue_len: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A fetched batch was appended to the queue.
    QueueRefilled {
        appended: usize,
        queue_len: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An adapter or internal failure, tagged as an error rather than a
    /// state transition.
    SchedulerError {
        /// Operation that failed ("select_station", "prefetch", "pause", ...).
        operation: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        station_id: Option<String>,
        message: String,
        kind: ErrorKind,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl WradEvent {
    /// Event type name for SSE event tagging and log fields.
    pub fn event_type(&self) -> &str {
        match self {
            WradEvent::StateChanged { .. } => "StateChanged",
            WradEvent::StationSelected { .. } => "StationSelected",
            WradEvent::TrackStarted { .. } => "TrackStarted",
            WradEvent::QueueRefilled { .. } => "QueueRefilled",
            WradEvent::SchedulerError { .. } => "SchedulerError",
        }
    }
}

/// Broadcast fan-out for [`WradEvent`].
///
/// Thin wrapper over `tokio::sync::broadcast` so emitters do not handle
/// channel plumbing directly. Cloning shares the underlying channel.
///
/// # Examples
///
/// ```
/// use wrad_common::events::EventBus;
///
/// let bus = EventBus::new(256);
/// let mut rx = bus.subscribe();
/// assert_eq!(bus.subscriber_count(), 1);
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<WradEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per
    /// subscriber before old events are dropped.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events.
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<WradEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers.
    ///
    /// Returns `Ok(subscriber_count)`. A send with no live subscriber is
    /// logged at warn level and surfaced as `Err` for callers that react
    /// beyond the log line.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: WradEvent,
    ) -> Result<usize, broadcast::error::SendError<WradEvent>> {
        match self.tx.send(event) {
            Ok(count) => Ok(count),
            Err(err) => {
                warn!(
                    event_type = err.0.event_type(),
                    "Event emitted with no subscribers"
                );
                Err(err)
            }
        }
    }

    /// Emit an event, ignoring whether anyone is listening.
    ///
    /// Used for traffic where a momentarily absent subscriber is acceptable
    /// (the SSE layer may simply have no clients connected).
    pub fn emit_lossy(&self, event: WradEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
