//! HTTP content-source client
//!
//! Speaks the source's JSON API: session login, station list, per-station
//! playlist batches. Sessions expire server-side between fetches, so every
//! authorized request transparently renews the session once on rejection
//! before giving up.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use wrad_common::model::{Station, TrackDescriptor};

use super::{SourceError, TrackSource};

const USER_AGENT: &str = concat!("wrad-ps/", env!("CARGO_PKG_VERSION"));
const SESSION_HEADER: &str = "x-session-id";

/// Login request body
#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Login response body
#[derive(Debug, Deserialize)]
struct LoginResponse {
    session_id: String,
}

/// Station list response body
#[derive(Debug, Deserialize)]
struct StationListResponse {
    stations: Vec<StationEntry>,
}

#[derive(Debug, Deserialize)]
struct StationEntry {
    id: String,
    name: String,
}

/// Playlist response body
#[derive(Debug, Deserialize)]
struct PlaylistResponse {
    tracks: Vec<TrackEntry>,
}

#[derive(Debug, Deserialize)]
struct TrackEntry {
    title: String,
    artist: String,
    album: String,
    #[serde(rename = "albumArtUrl")]
    album_art_url: Option<String>,
    #[serde(rename = "audioUrl")]
    audio_url: String,
    #[serde(rename = "durationSecs")]
    duration_secs: u32,
}

impl TrackEntry {
    fn into_descriptor(self) -> TrackDescriptor {
        TrackDescriptor {
            title: self.title,
            artist: self.artist,
            album: self.album,
            album_art_url: self.album_art_url,
            audio_url: self.audio_url,
            duration_secs: self.duration_secs,
            // The source delivers one fixed stream format.
            quality: Default::default(),
        }
    }
}

/// HTTP implementation of [`TrackSource`].
pub struct HttpTrackSource {
    http_client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    /// Current session token, if a login succeeded and has not been rejected.
    session: Mutex<Option<String>>,
}

impl HttpTrackSource {
    pub fn new(
        base_url: &str,
        username: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
            session: Mutex::new(None),
        })
    }

    /// Log in and return the fresh session token.
    async fn login(&self) -> Result<String, SourceError> {
        let url = format!("{}/auth/login", self.base_url);

        tracing::debug!(username = %self.username, "Logging in to content source");

        let response = self
            .http_client
            .post(&url)
            .json(&LoginRequest {
                username: &self.username,
                password: &self.password,
            })
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SourceError::InvalidCredential(error_text));
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SourceError::Api(status.as_u16(), error_text));
        }

        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        tracing::info!(username = %self.username, "Authenticated with content source");

        Ok(body.session_id)
    }

    /// Current session token, logging in first if none is held.
    async fn ensure_session(&self) -> Result<String, SourceError> {
        let mut session = self.session.lock().await;
        if let Some(token) = session.as_ref() {
            return Ok(token.clone());
        }
        let token = self.login().await?;
        *session = Some(token.clone());
        Ok(token)
    }

    /// GET `path` with the session header, renewing the session once if the
    /// source rejects the current token.
    async fn authorized_get(&self, path: &str) -> Result<reqwest::Response, SourceError> {
        let url = format!("{}{}", self.base_url, path);
        let mut renewed = false;

        loop {
            let token = self.ensure_session().await?;
            let response = self
                .http_client
                .get(&url)
                .header(SESSION_HEADER, &token)
                .send()
                .await
                .map_err(|e| SourceError::Network(e.to_string()))?;

            if response.status() == reqwest::StatusCode::UNAUTHORIZED && !renewed {
                tracing::debug!(path = %path, "Session rejected, renewing once");
                self.session.lock().await.take();
                renewed = true;
                continue;
            }

            return Ok(response);
        }
    }

    /// Map a non-success response to the common error cases.
    async fn api_error(response: reqwest::Response) -> SourceError {
        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return SourceError::Quota;
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return SourceError::Auth("session renewal failed".to_string());
        }
        let error_text = response.text().await.unwrap_or_default();
        SourceError::Api(status.as_u16(), error_text)
    }
}

#[async_trait]
impl TrackSource for HttpTrackSource {
    async fn authenticate(&self) -> Result<(), SourceError> {
        let token = self.login().await?;
        *self.session.lock().await = Some(token);
        Ok(())
    }

    async fn list_stations(&self) -> Result<Vec<Station>, SourceError> {
        let response = self.authorized_get("/stations").await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let body: StationListResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        let stations: Vec<Station> = body
            .stations
            .into_iter()
            .map(|s| Station { id: s.id, name: s.name })
            .collect();

        tracing::debug!(count = stations.len(), "Retrieved station list");

        Ok(stations)
    }

    async fn fetch_playlist(
        &self,
        station_id: &str,
        count: usize,
    ) -> Result<Vec<TrackDescriptor>, SourceError> {
        let path = format!("/stations/{}/playlist?count={}", station_id, count);
        let response = self.authorized_get(&path).await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::UnknownStation(station_id.to_string()));
        }

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let body: PlaylistResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        let tracks: Vec<TrackDescriptor> = body
            .tracks
            .into_iter()
            .map(TrackEntry::into_descriptor)
            .collect();

        tracing::debug!(
            station_id = %station_id,
            requested = count,
            received = tracks.len(),
            "Fetched playlist batch"
        );

        Ok(tracks)
    }
}
