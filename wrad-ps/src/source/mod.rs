//! Track source adapter boundary
//!
//! The scheduler pulls ordered batches of track descriptors from a remote
//! content source. Everything source-specific (login protocol, session
//! lifetime, playlist wire format) stays behind [`TrackSource`]; the engine
//! only sees stations and descriptors.

pub mod http;

use async_trait::async_trait;
use thiserror::Error;

use wrad_common::model::{Station, TrackDescriptor};

pub use http::HttpTrackSource;

/// Content source errors
#[derive(Debug, Error)]
pub enum SourceError {
    /// Credentials rejected. Terminal: retrying without reconfiguration is
    /// pointless, so the scheduler surfaces this instead of rescheduling.
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    /// Authentication trouble other than bad credentials (expired session
    /// that could not be renewed, auth service unavailable).
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(String),

    /// The source declined service on usage grounds.
    #[error("Quota exceeded")]
    Quota,

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    /// Station id not present in the source's station list.
    #[error("Unknown station: {0}")]
    UnknownStation(String),
}

impl SourceError {
    /// True for failures that reconfiguration, not retry, must fix.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SourceError::InvalidCredential(_))
    }
}

/// Ordered-batch track provider for a given station.
///
/// Implementations must be safe to call from spawned tasks; the engine
/// invokes `fetch_playlist` concurrently with ongoing playback (prefetch) and
/// discards results that outlive their station selection.
#[async_trait]
pub trait TrackSource: Send + Sync {
    /// Establish (or re-establish) a session with the source.
    async fn authenticate(&self) -> Result<(), SourceError>;

    /// Ordered list of stations available to the configured account.
    async fn list_stations(&self) -> Result<Vec<Station>, SourceError>;

    /// Fetch up to `count` tracks for `station_id`, in play order.
    ///
    /// The source decides actual batch size; fewer than `count` tracks is a
    /// valid response, an empty batch is not an error at this boundary.
    async fn fetch_playlist(
        &self,
        station_id: &str,
        count: usize,
    ) -> Result<Vec<TrackDescriptor>, SourceError>;
}
