//! Playback backend adapter boundary
//!
//! The scheduler treats audio output as a remote queue it keeps in lockstep:
//! enqueue the head, play, pause, resume, stop, clear. All operations are
//! point operations; failures surface as [`BackendError`] and the scheduler
//! stops rather than retrying against a broken backend.

pub mod mpd;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use mpd::MpdBackend;

/// Playback backend command errors
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend connection closed mid-exchange.
    #[error("Connection closed by backend")]
    Disconnected,

    /// Backend rejected a command (protocol-level failure).
    #[error("Backend rejected command: {0}")]
    Protocol(String),

    #[error("Unexpected backend response: {0}")]
    UnexpectedResponse(String),
}

/// Coarse transport state reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendPlayState {
    Play,
    Pause,
    Stop,
}

/// Minimal status snapshot from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackendStatus {
    pub state: BackendPlayState,
    /// Seconds into the current item, when the backend reports one.
    pub elapsed_secs: Option<u32>,
}

/// Command surface of the audio output path.
///
/// Implementations own their transport (connection lifecycle, reconnects,
/// wire quirks); the scheduler only sequences calls.
#[async_trait]
pub trait PlaybackBackend: Send + Sync {
    /// Append a locator to the backend's own playback list.
    async fn enqueue(&self, locator: &str) -> Result<(), BackendError>;

    /// Start (or restart) playback of the backend's current list position.
    async fn play(&self) -> Result<(), BackendError>;

    /// Suspend output, keeping position.
    async fn pause(&self) -> Result<(), BackendError>;

    /// Resume suspended output.
    async fn resume(&self) -> Result<(), BackendError>;

    /// Halt output.
    async fn stop(&self) -> Result<(), BackendError>;

    /// Drop every entry from the backend's playback list.
    async fn clear_queue(&self) -> Result<(), BackendError>;

    /// Transport state and position.
    async fn status(&self) -> Result<BackendStatus, BackendError>;
}
