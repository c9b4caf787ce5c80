//! Continuous playback scheduling
//!
//! Three pieces: the FIFO look-ahead queue ([`queue`]), the pausable advance
//! timer that decides when a track is over ([`timer`]), and the engine task
//! that owns both and drives the source and backend adapters ([`engine`]).

pub mod engine;
pub mod queue;
pub mod timer;

pub use engine::{SchedulerEngine, SchedulerHandle, SchedulerSettings};
pub use queue::PlayQueue;
pub use timer::{AdvanceTimer, TimerState};
