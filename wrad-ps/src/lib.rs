//! # WRAD Playback Scheduler (wrad-ps)
//!
//! Continuous internet-radio playback against a dumb audio daemon.
//!
//! **Purpose:** Pull ordered track batches from a remote content source,
//! feed them to the playback backend one track at a time, and decide when
//! each track is over with a duration-based advance timer. The daemon never
//! reports end-of-track; the scheduler's clock is the only authority.
//!
//! **Architecture:** A single engine task owns the queue and timer; the
//! HTTP/SSE surface and all adapter I/O talk to it through channels.

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod source;
pub mod state;

pub use error::{Error, Result};
pub use state::SharedState;
