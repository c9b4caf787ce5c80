//! Scheduling model types
//!
//! Shared between the scheduler engine, the HTTP API, and the event stream.

use serde::{Deserialize, Serialize};

/// Fixed audio-quality metadata reported for every track.
///
/// The content source delivers a single stream format and does not vary
/// sample rate, bit depth, or channel count per track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioQuality {
    pub sample_rate_hz: u32,
    pub bit_depth: u8,
    pub channels: u8,
}

impl Default for AudioQuality {
    fn default() -> Self {
        Self {
            sample_rate_hz: 44_100,
            bit_depth: 16,
            channels: 2,
        }
    }
}

/// One playable item as delivered by the content source.
///
/// Immutable once fetched. Owned by the playback queue that currently holds
/// it; advancement moves the descriptor out of the queue rather than sharing
/// it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Album-art reference, if the source provided one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_art_url: Option<String>,
    /// Audio locator handed to the playback backend.
    pub audio_url: String,
    /// Duration in whole seconds, as reported by the source (±1 s).
    pub duration_secs: u32,
    #[serde(default)]
    pub quality: AudioQuality,
}

impl TrackDescriptor {
    /// Display summary for events and API responses.
    pub fn info(&self) -> TrackInfo {
        TrackInfo {
            title: self.title.clone(),
            artist: self.artist.clone(),
            album: self.album.clone(),
            album_art_url: self.album_art_url.clone(),
            duration_secs: self.duration_secs,
        }
    }
}

/// Track summary carried in events and API responses (no audio locator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub title: String,
    pub artist: String,
    pub album: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_art_url: Option<String>,
    pub duration_secs: u32,
}

/// A named content channel on the remote source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    pub id: String,
    pub name: String,
}

/// Scheduler state enumeration
///
/// - `Idle`: no station selected since startup
/// - `Loading`: initial batch fetch in flight, no timer armed
/// - `Playing`: advance timer armed, backend outputting the queue head
/// - `Paused`: timer suspended with remaining time retained, backend suspended
/// - `Stopped`: queue cleared; terminal until a station is selected again
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    Idle,
    Loading,
    Playing,
    Paused,
    Stopped,
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulerState::Idle => write!(f, "idle"),
            SchedulerState::Loading => write!(f, "loading"),
            SchedulerState::Playing => write!(f, "playing"),
            SchedulerState::Paused => write!(f, "paused"),
            SchedulerState::Stopped => write!(f, "stopped"),
        }
    }
}
