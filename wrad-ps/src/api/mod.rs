//! HTTP control surface
//!
//! Axum router exposing scheduler control, state inspection, and the SSE
//! event stream. All handlers go through [`AppContext`]; playback decisions
//! stay in the scheduler engine and only travel here as results.

pub mod handlers;
pub mod sse;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::backend::PlaybackBackend;
use crate::scheduler::SchedulerHandle;
use crate::source::TrackSource;
use crate::state::SharedState;

/// Shared application context passed to all handlers
///
/// AppContext implements Clone, which gives us `FromRef<AppContext>` for free
/// via Axum's blanket implementation.
#[derive(Clone)]
pub struct AppContext {
    pub state: Arc<SharedState>,
    pub scheduler: SchedulerHandle,
    pub source: Arc<dyn TrackSource>,
    pub backend: Arc<dyn PlaybackBackend>,
    pub port: u16,
}

/// Build the router with all routes attached.
pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        // Health endpoint
        .route("/health", get(handlers::health))

        // State inspection
        .route("/state", get(handlers::get_state))
        .route("/stations", get(handlers::list_stations))

        // Scheduler control
        .route("/station", post(handlers::select_station))
        .route("/next", post(handlers::next_track))
        .route("/pause", post(handlers::pause))
        .route("/resume", post(handlers::resume))
        .route("/stop", post(handlers::stop))

        // SSE event stream
        .route("/events", get(sse::event_stream))

        // Attach application context
        .with_state(ctx)

        // Enable CORS for local access
        .layer(CorsLayer::permissive())
}
