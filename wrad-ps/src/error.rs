//! Error types for wrad-ps
//!
//! Defines service-level error types using thiserror for clear error
//! propagation. Adapter layers carry their own taxonomies
//! ([`crate::source::SourceError`], [`crate::backend::BackendError`]) and are
//! wrapped here when they cross into the scheduler or the HTTP surface.

use thiserror::Error;

use crate::backend::BackendError;
use crate::source::SourceError;

/// Main error type for the wrad-ps service
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Content source failures (network, auth, quota)
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Playback backend command failures
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Advancement attempted with nothing queued.
    ///
    /// The prefetch trigger keeps the queue non-empty during playback, so
    /// observing this is an internal invariant failure, not a user error.
    #[error("Playback queue is empty")]
    EmptyQueue,

    /// Operation not valid in the current scheduler state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using wrad-ps Error
pub type Result<T> = std::result::Result<T, Error>;
