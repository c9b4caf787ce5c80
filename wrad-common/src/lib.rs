//! # WRAD Common Library
//!
//! Shared code for the WRAD services including:
//! - Scheduling model types (tracks, stations, scheduler state)
//! - Event types (WradEvent enum)
//! - Event bus (broadcast fan-out to in-process and SSE subscribers)

pub mod events;
pub mod model;

pub use events::{EventBus, WradEvent};
pub use model::{AudioQuality, SchedulerState, Station, TrackDescriptor, TrackInfo};
