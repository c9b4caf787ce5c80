//! HTTP request handlers
//!
//! Control requests are forwarded to the scheduler engine and its reply is
//! mapped onto HTTP status codes: rejected operations (wrong state) become
//! 409, adapter failures become 502.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info};

use wrad_common::model::{SchedulerState, Station, TrackInfo};

use crate::api::AppContext;
use crate::error::Error;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

#[derive(Debug, Serialize)]
pub struct StateResponse {
    state: SchedulerState,
    #[serde(skip_serializing_if = "Option::is_none")]
    station: Option<Station>,
    #[serde(skip_serializing_if = "Option::is_none")]
    track: Option<TrackInfo>,
    /// Elapsed seconds into the current track, when the backend reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    position_secs: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct StationsResponse {
    stations: Vec<Station>,
}

#[derive(Debug, Deserialize)]
pub struct StationsQuery {
    #[serde(default)]
    refresh: bool,
}

#[derive(Debug, Deserialize)]
pub struct SelectStationRequest {
    station_id: String,
}

fn ok_response() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
    })
}

fn map_error(err: Error) -> (StatusCode, Json<StatusResponse>) {
    let code = match &err {
        Error::InvalidState(_) => StatusCode::CONFLICT,
        Error::Source(_) | Error::Backend(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        code,
        Json(StatusResponse {
            status: format!("error: {}", err),
        }),
    )
}

// ============================================================================
// Health Endpoint
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health(State(ctx): State<AppContext>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "module": "wrad-ps",
        "version": env!("CARGO_PKG_VERSION"),
        "port": ctx.port,
    }))
}

// ============================================================================
// State Inspection
// ============================================================================

/// GET /state - Scheduler state, current station and track
pub async fn get_state(State(ctx): State<AppContext>) -> Json<StateResponse> {
    let state = ctx.state.scheduler_state().await;
    let station = ctx.state.current_station().await;
    let track = ctx.state.current_track().await;

    // Position comes from the backend and is best-effort only.
    let position_secs = match state {
        SchedulerState::Playing | SchedulerState::Paused => match ctx.backend.status().await {
            Ok(status) => status.elapsed_secs,
            Err(e) => {
                debug!("Backend status unavailable: {}", e);
                None
            }
        },
        _ => None,
    };

    Json(StateResponse {
        state,
        station,
        track,
        position_secs,
    })
}

/// GET /stations - Station list, cached unless `?refresh=true`
pub async fn list_stations(
    State(ctx): State<AppContext>,
    Query(query): Query<StationsQuery>,
) -> Result<Json<StationsResponse>, (StatusCode, Json<StatusResponse>)> {
    let cached = ctx.state.stations().await;
    if !query.refresh && !cached.is_empty() {
        return Ok(Json(StationsResponse { stations: cached }));
    }

    match ctx.source.list_stations().await {
        Ok(stations) => {
            ctx.state.set_stations(stations.clone()).await;
            info!("Station list refreshed: {} stations", stations.len());
            Ok(Json(StationsResponse { stations }))
        }
        Err(e) => {
            error!("Failed to list stations: {}", e);
            Err(map_error(Error::Source(e)))
        }
    }
}

// ============================================================================
// Scheduler Control
// ============================================================================

/// POST /station - Select a station and start playing it
pub async fn select_station(
    State(ctx): State<AppContext>,
    Json(req): Json<SelectStationRequest>,
) -> Result<Json<StatusResponse>, (StatusCode, Json<StatusResponse>)> {
    info!("Select station request: {}", req.station_id);

    match ctx.scheduler.select_station(&req.station_id).await {
        Ok(()) => Ok(ok_response()),
        Err(e) => {
            error!("Select station failed: {}", e);
            Err(map_error(e))
        }
    }
}

/// POST /next - Skip: replace the whole look-ahead with a fresh batch
pub async fn next_track(
    State(ctx): State<AppContext>,
) -> Result<Json<StatusResponse>, (StatusCode, Json<StatusResponse>)> {
    info!("Skip request");

    match ctx.scheduler.next().await {
        Ok(()) => Ok(ok_response()),
        Err(e) => {
            error!("Skip failed: {}", e);
            Err(map_error(e))
        }
    }
}

/// POST /pause - Freeze playback and the advance countdown
pub async fn pause(
    State(ctx): State<AppContext>,
) -> Result<Json<StatusResponse>, (StatusCode, Json<StatusResponse>)> {
    info!("Pause request");

    match ctx.scheduler.pause().await {
        Ok(()) => Ok(ok_response()),
        Err(e) => {
            error!("Pause failed: {}", e);
            Err(map_error(e))
        }
    }
}

/// POST /resume - Continue a paused track with its remaining time
pub async fn resume(
    State(ctx): State<AppContext>,
) -> Result<Json<StatusResponse>, (StatusCode, Json<StatusResponse>)> {
    info!("Resume request");

    match ctx.scheduler.resume().await {
        Ok(()) => Ok(ok_response()),
        Err(e) => {
            error!("Resume failed: {}", e);
            Err(map_error(e))
        }
    }
}

/// POST /stop - Stop playback and clear all scheduling state
pub async fn stop(
    State(ctx): State<AppContext>,
) -> Result<Json<StatusResponse>, (StatusCode, Json<StatusResponse>)> {
    info!("Stop request");

    match ctx.scheduler.stop().await {
        Ok(()) => Ok(ok_response()),
        Err(e) => {
            error!("Stop failed: {}", e);
            Err(map_error(e))
        }
    }
}
