//! WRAD Playback Scheduler (wrad-ps) - Main entry point
//!
//! Wires the content source and playback backend adapters to the scheduler
//! engine and serves the HTTP/SSE control surface.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wrad_common::events::{EventBus, DEFAULT_EVENT_CAPACITY};
use wrad_ps::api::{self, AppContext};
use wrad_ps::backend::{mpd::MpdBackend, PlaybackBackend};
use wrad_ps::config::{Config, ConfigOverrides};
use wrad_ps::scheduler::SchedulerEngine;
use wrad_ps::source::{HttpTrackSource, TrackSource};
use wrad_ps::SharedState;

/// Command-line arguments for wrad-ps
#[derive(Parser, Debug)]
#[command(name = "wrad-ps")]
#[command(about = "Playback scheduler for WRAD internet radio")]
#[command(version)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "WRAD_PS_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides the configuration file)
    #[arg(short, long, env = "WRAD_PS_PORT")]
    port: Option<u16>,

    /// Playback daemon address (overrides the configuration file)
    #[arg(long, env = "WRAD_PS_BACKEND")]
    backend_addr: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wrad_ps=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = Config::load(
        args.config.as_deref(),
        ConfigOverrides {
            port: args.port,
            backend_addr: args.backend_addr,
        },
    )
    .context("Failed to load configuration")?;

    info!("Starting WRAD playback scheduler on port {}", config.server.port);
    info!("Playback backend: {}", config.backend.addr);

    let events = EventBus::new(DEFAULT_EVENT_CAPACITY);
    let state = Arc::new(SharedState::new(events));

    let source: Arc<dyn TrackSource> = Arc::new(
        HttpTrackSource::new(
            &config.source.base_url,
            &config.source.username,
            &config.source.password,
            config.source.timeout(),
        )
        .context("Failed to initialize content source")?,
    );
    let backend: Arc<dyn PlaybackBackend> = Arc::new(MpdBackend::new(
        &config.backend.addr,
        config.backend.resume_rewind,
    ));

    // Prime the source so the first selection is fast. Failures are logged,
    // not fatal; selection performs its own login.
    match source.authenticate().await {
        Ok(()) => match source.list_stations().await {
            Ok(stations) => {
                info!("Source ready: {} stations available", stations.len());
                state.set_stations(stations).await;
            }
            Err(e) => warn!("Could not prime station list: {}", e),
        },
        Err(e) => warn!("Source authentication failed at startup: {}", e),
    }

    let engine = SchedulerEngine::new(
        config.scheduler.settings(),
        Arc::clone(&source),
        Arc::clone(&backend),
        Arc::clone(&state),
    );
    let scheduler = engine.start();
    info!("Scheduler engine initialized");

    let ctx = AppContext {
        state,
        scheduler: scheduler.clone(),
        source,
        backend,
        port: config.server.port,
    };
    let app = api::build_router(ctx);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid listen address")?;
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Silence the daemon before exiting; nothing would advance it afterwards.
    if let Err(e) = scheduler.stop().await {
        warn!("Could not stop playback during shutdown: {}", e);
    }
    scheduler.shutdown();

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
