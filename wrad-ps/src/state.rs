//! Shared scheduler state
//!
//! Read-mostly mirror of the engine's state for the HTTP surface. The engine
//! task is the only writer; API handlers read without round-tripping the
//! command channel.

use tokio::sync::{broadcast, RwLock};

use wrad_common::events::{EventBus, WradEvent};
use wrad_common::model::{SchedulerState, Station, TrackInfo};

/// Shared state accessible by the engine and the API layer.
///
/// Uses RwLock for concurrent read access with rare writes.
pub struct SharedState {
    /// Current scheduler state
    scheduler_state: RwLock<SchedulerState>,

    /// Track at the queue head (None outside Loading/Playing/Paused)
    current_track: RwLock<Option<TrackInfo>>,

    /// Currently selected station
    current_station: RwLock<Option<Station>>,

    /// Station list cached from the source (primed at startup)
    stations: RwLock<Vec<Station>>,

    /// Event broadcaster shared with SSE subscribers
    pub events: EventBus,
}

impl SharedState {
    pub fn new(events: EventBus) -> Self {
        Self {
            scheduler_state: RwLock::new(SchedulerState::Idle),
            current_track: RwLock::new(None),
            current_station: RwLock::new(None),
            stations: RwLock::new(Vec::new()),
            events,
        }
    }

    /// Broadcast an event; no subscribers is fine.
    pub fn broadcast_event(&self, event: WradEvent) {
        self.events.emit_lossy(event);
    }

    /// Subscribe to the event stream (SSE, tests).
    pub fn subscribe_events(&self) -> broadcast::Receiver<WradEvent> {
        self.events.subscribe()
    }

    pub async fn scheduler_state(&self) -> SchedulerState {
        *self.scheduler_state.read().await
    }

    pub async fn set_scheduler_state(&self, state: SchedulerState) {
        *self.scheduler_state.write().await = state;
    }

    pub async fn current_track(&self) -> Option<TrackInfo> {
        self.current_track.read().await.clone()
    }

    pub async fn set_current_track(&self, track: Option<TrackInfo>) {
        *self.current_track.write().await = track;
    }

    pub async fn current_station(&self) -> Option<Station> {
        self.current_station.read().await.clone()
    }

    pub async fn set_current_station(&self, station: Option<Station>) {
        *self.current_station.write().await = station;
    }

    pub async fn stations(&self) -> Vec<Station> {
        self.stations.read().await.clone()
    }

    pub async fn set_stations(&self, stations: Vec<Station>) {
        *self.stations.write().await = stations;
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new(EventBus::default())
    }
}
