//! Integration tests for the scheduler engine
//!
//! Drives the engine through scripted source and backend doubles and asserts
//! the externally observable contract:
//! - selection, advancement, skip, pause/resume, stop
//! - prefetch refill and starvation recovery
//! - stale-batch discard after reselection
//! - error classification on the event channel

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::time::timeout;

use wrad_common::events::{ErrorKind, EventBus, WradEvent};
use wrad_common::model::{AudioQuality, SchedulerState, Station, TrackDescriptor};
use wrad_ps::backend::{BackendError, BackendPlayState, BackendStatus, PlaybackBackend};
use wrad_ps::scheduler::{SchedulerEngine, SchedulerHandle, SchedulerSettings};
use wrad_ps::source::{SourceError, TrackSource};
use wrad_ps::state::SharedState;
use wrad_ps::Error;

// ============================================================================
// Test doubles
// ============================================================================

/// Source returning pre-scripted playlist batches per station, in order.
/// An unscripted fetch fails loudly so a mis-scripted test cannot pass by
/// accident.
struct ScriptedSource {
    stations: Vec<Station>,
    playlists: Mutex<HashMap<String, VecDeque<Result<Vec<TrackDescriptor>, SourceError>>>>,
    fetch_log: Mutex<Vec<String>>,
    delay: Duration,
}

impl ScriptedSource {
    fn new(stations: Vec<Station>) -> Self {
        Self {
            stations,
            playlists: Mutex::new(HashMap::new()),
            fetch_log: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn push_batch(&self, station_id: &str, tracks: Vec<TrackDescriptor>) {
        self.playlists
            .lock()
            .unwrap()
            .entry(station_id.to_string())
            .or_default()
            .push_back(Ok(tracks));
    }

    fn push_error(&self, station_id: &str, err: SourceError) {
        self.playlists
            .lock()
            .unwrap()
            .entry(station_id.to_string())
            .or_default()
            .push_back(Err(err));
    }

    fn fetch_log(&self) -> Vec<String> {
        self.fetch_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl TrackSource for ScriptedSource {
    async fn authenticate(&self) -> Result<(), SourceError> {
        Ok(())
    }

    async fn list_stations(&self) -> Result<Vec<Station>, SourceError> {
        Ok(self.stations.clone())
    }

    async fn fetch_playlist(
        &self,
        station_id: &str,
        _count: usize,
    ) -> Result<Vec<TrackDescriptor>, SourceError> {
        if self.delay > Duration::ZERO {
            tokio::time::sleep(self.delay).await;
        }
        self.fetch_log.lock().unwrap().push(station_id.to_string());
        self.playlists
            .lock()
            .unwrap()
            .get_mut(station_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(SourceError::Network("playlist script exhausted".to_string())))
    }
}

/// Backend recording every command; individual commands can be made to fail.
struct MockBackend {
    calls: Mutex<Vec<String>>,
    fail_commands: Mutex<HashSet<&'static str>>,
    status: Mutex<BackendStatus>,
}

impl MockBackend {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_commands: Mutex::new(HashSet::new()),
            status: Mutex::new(BackendStatus {
                state: BackendPlayState::Stop,
                elapsed_secs: None,
            }),
        }
    }

    fn fail_on(&self, command: &'static str) {
        self.fail_commands.lock().unwrap().insert(command);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String, name: &'static str) -> Result<(), BackendError> {
        self.calls.lock().unwrap().push(call);
        if self.fail_commands.lock().unwrap().contains(name) {
            return Err(BackendError::Disconnected);
        }
        Ok(())
    }
}

#[async_trait]
impl PlaybackBackend for MockBackend {
    async fn enqueue(&self, locator: &str) -> Result<(), BackendError> {
        self.record(format!("enqueue {}", locator), "enqueue")
    }

    async fn play(&self) -> Result<(), BackendError> {
        self.record("play".to_string(), "play")
    }

    async fn pause(&self) -> Result<(), BackendError> {
        self.record("pause".to_string(), "pause")
    }

    async fn resume(&self) -> Result<(), BackendError> {
        self.record("resume".to_string(), "resume")
    }

    async fn stop(&self) -> Result<(), BackendError> {
        self.record("stop".to_string(), "stop")
    }

    async fn clear_queue(&self) -> Result<(), BackendError> {
        self.record("clear".to_string(), "clear")
    }

    async fn status(&self) -> Result<BackendStatus, BackendError> {
        Ok(*self.status.lock().unwrap())
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    scheduler: SchedulerHandle,
    state: Arc<SharedState>,
    events: broadcast::Receiver<WradEvent>,
}

fn start_engine(
    source: &Arc<ScriptedSource>,
    backend: &Arc<MockBackend>,
    settings: SchedulerSettings,
) -> Harness {
    let state = Arc::new(SharedState::new(EventBus::new(64)));
    let events = state.subscribe_events();
    let scheduler = SchedulerEngine::new(
        settings,
        Arc::clone(source) as Arc<dyn TrackSource>,
        Arc::clone(backend) as Arc<dyn PlaybackBackend>,
        Arc::clone(&state),
    )
    .start();
    Harness {
        scheduler,
        state,
        events,
    }
}

fn fast_settings() -> SchedulerSettings {
    SchedulerSettings {
        look_ahead: 4,
        advance_margin: Duration::from_millis(50),
    }
}

fn make_station(id: &str, name: &str) -> Station {
    Station {
        id: id.to_string(),
        name: name.to_string(),
    }
}

fn make_track(title: &str, duration_secs: u32) -> TrackDescriptor {
    TrackDescriptor {
        title: title.to_string(),
        artist: "Artist".to_string(),
        album: "Album".to_string(),
        album_art_url: None,
        audio_url: format!("http://audio.test/{}.aac", title),
        duration_secs,
        quality: AudioQuality::default(),
    }
}

async fn recv_event(rx: &mut broadcast::Receiver<WradEvent>) -> WradEvent {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

/// Collect events until one matches the predicate; the match is included.
async fn collect_until<F>(rx: &mut broadcast::Receiver<WradEvent>, pred: F) -> Vec<WradEvent>
where
    F: Fn(&WradEvent) -> bool,
{
    let mut seen = Vec::new();
    loop {
        let event = recv_event(rx).await;
        let done = pred(&event);
        seen.push(event);
        if done {
            return seen;
        }
    }
}

fn started_title(event: &WradEvent) -> Option<&str> {
    match event {
        WradEvent::TrackStarted { track, .. } => Some(track.title.as_str()),
        _ => None,
    }
}

// ============================================================================
// Selection
// ============================================================================

#[tokio::test]
async fn test_select_station_starts_playback() {
    let source = Arc::new(ScriptedSource::new(vec![make_station("st-1", "Cool Jazz")]));
    source.push_batch(
        "st-1",
        vec![
            make_track("alpha", 300),
            make_track("beta", 300),
            make_track("gamma", 300),
        ],
    );
    let backend = Arc::new(MockBackend::new());
    let mut h = start_engine(&source, &backend, SchedulerSettings::default());

    h.scheduler
        .select_station("st-1")
        .await
        .expect("selection should be accepted");

    let seen = collect_until(&mut h.events, |e| {
        matches!(
            e,
            WradEvent::StateChanged {
                state: SchedulerState::Playing,
                ..
            }
        )
    })
    .await;

    assert!(seen.iter().any(
        |e| matches!(e, WradEvent::StationSelected { station_id, .. } if station_id == "st-1")
    ));
    assert!(seen.iter().any(|e| matches!(
        e,
        WradEvent::StateChanged {
            state: SchedulerState::Loading,
            ..
        }
    )));
    assert!(seen.iter().any(|e| matches!(
        e,
        WradEvent::TrackStarted { track, queue_len: 3, .. } if track.title == "alpha"
    )));

    assert_eq!(h.state.scheduler_state().await, SchedulerState::Playing);
    assert_eq!(
        h.state.current_track().await.map(|t| t.title),
        Some("alpha".to_string())
    );
    assert_eq!(
        h.state.current_station().await.map(|s| s.name),
        Some("Cool Jazz".to_string())
    );

    // A fresh station rebuilds the backend list, then plays exactly the head.
    assert_eq!(
        backend.calls(),
        vec!["stop", "clear", "enqueue http://audio.test/alpha.aac", "play"]
    );
}

#[tokio::test]
async fn test_unknown_station_reports_and_stops() {
    let source = Arc::new(ScriptedSource::new(vec![make_station("st-1", "Cool Jazz")]));
    let backend = Arc::new(MockBackend::new());
    let mut h = start_engine(&source, &backend, SchedulerSettings::default());

    // Accepted up front; the failure arrives on the event channel.
    h.scheduler
        .select_station("st-404")
        .await
        .expect("selection is accepted before resolution");

    let seen = collect_until(&mut h.events, |e| {
        matches!(
            e,
            WradEvent::StateChanged {
                state: SchedulerState::Stopped,
                ..
            }
        )
    })
    .await;

    assert!(seen.iter().any(|e| matches!(
        e,
        WradEvent::SchedulerError {
            kind: ErrorKind::Source,
            operation,
            ..
        } if operation == "select_station"
    )));
    assert_eq!(h.state.scheduler_state().await, SchedulerState::Stopped);
}

#[tokio::test]
async fn test_invalid_credentials_reported_as_auth() {
    let source = Arc::new(ScriptedSource::new(vec![make_station("st-1", "Cool Jazz")]));
    source.push_error(
        "st-1",
        SourceError::InvalidCredential("bad password".to_string()),
    );
    let backend = Arc::new(MockBackend::new());
    let mut h = start_engine(&source, &backend, SchedulerSettings::default());

    h.scheduler
        .select_station("st-1")
        .await
        .expect("selection should be accepted");

    let seen = collect_until(&mut h.events, |e| {
        matches!(
            e,
            WradEvent::StateChanged {
                state: SchedulerState::Stopped,
                ..
            }
        )
    })
    .await;

    assert!(seen.iter().any(|e| matches!(
        e,
        WradEvent::SchedulerError {
            kind: ErrorKind::Auth,
            ..
        }
    )));
}

// ============================================================================
// Advancement and prefetch
// ============================================================================

#[tokio::test]
async fn test_advancement_plays_next_without_rebuild() {
    let source = Arc::new(ScriptedSource::new(vec![make_station("st-1", "Cool Jazz")]));
    source.push_batch(
        "st-1",
        vec![make_track("alpha", 0), make_track("beta", 300)],
    );
    // Refill requested once the queue is down to beta alone.
    source.push_batch(
        "st-1",
        vec![
            make_track("gamma", 300),
            make_track("delta", 300),
            make_track("epsilon", 300),
            make_track("zeta", 300),
        ],
    );
    let backend = Arc::new(MockBackend::new());
    let mut h = start_engine(&source, &backend, fast_settings());

    h.scheduler
        .select_station("st-1")
        .await
        .expect("selection should be accepted");

    let seen = collect_until(&mut h.events, |e| started_title(e) == Some("beta")).await;

    assert!(seen.iter().any(|e| matches!(
        e,
        WradEvent::TrackStarted { track, queue_len: 2, .. } if track.title == "alpha"
    )));
    assert!(seen.iter().any(|e| matches!(
        e,
        WradEvent::TrackStarted { track, queue_len: 1, .. } if track.title == "beta"
    )));

    // Advancement enqueues and plays; no stop/clear between tracks.
    assert_eq!(
        backend.calls(),
        vec![
            "stop",
            "clear",
            "enqueue http://audio.test/alpha.aac",
            "play",
            "enqueue http://audio.test/beta.aac",
            "play",
        ]
    );
}

#[tokio::test]
async fn test_prefetch_refills_behind_playing_track() {
    let source = Arc::new(ScriptedSource::new(vec![make_station("st-1", "Cool Jazz")]));
    source.push_batch(
        "st-1",
        vec![make_track("alpha", 0), make_track("beta", 300)],
    );
    source.push_batch(
        "st-1",
        vec![
            make_track("gamma", 300),
            make_track("delta", 300),
            make_track("epsilon", 300),
            make_track("zeta", 300),
        ],
    );
    let backend = Arc::new(MockBackend::new());
    let mut h = start_engine(&source, &backend, fast_settings());

    h.scheduler
        .select_station("st-1")
        .await
        .expect("selection should be accepted");

    let seen = collect_until(&mut h.events, |e| {
        matches!(e, WradEvent::QueueRefilled { .. })
    })
    .await;

    assert!(seen.iter().any(|e| matches!(
        e,
        WradEvent::QueueRefilled {
            appended: 4,
            queue_len: 5,
            ..
        }
    )));
    // Selection batch plus exactly one prefetch.
    assert_eq!(source.fetch_log(), vec!["st-1", "st-1"]);
}

#[tokio::test]
async fn test_starvation_stalls_then_recovers() {
    let source = Arc::new(
        ScriptedSource::new(vec![make_station("st-1", "Cool Jazz")])
            .with_delay(Duration::from_millis(300)),
    );
    // One-track batch: the queue hits length 1 immediately, and the prefetch
    // is still in flight when alpha's countdown expires.
    source.push_batch("st-1", vec![make_track("alpha", 0)]);
    source.push_batch("st-1", vec![make_track("beta", 300)]);
    let backend = Arc::new(MockBackend::new());
    let settings = SchedulerSettings {
        look_ahead: 1,
        advance_margin: Duration::from_millis(50),
    };
    let mut h = start_engine(&source, &backend, settings);

    h.scheduler
        .select_station("st-1")
        .await
        .expect("selection should be accepted");

    let seen = collect_until(&mut h.events, |e| started_title(e) == Some("beta")).await;

    // The stall is visible: still playing, but with no current track.
    assert!(seen.iter().any(|e| matches!(
        e,
        WradEvent::StateChanged {
            state: SchedulerState::Playing,
            current_track: None,
            ..
        }
    )));
    // The stall never tips into stopped.
    assert!(!seen.iter().any(|e| matches!(
        e,
        WradEvent::StateChanged {
            state: SchedulerState::Stopped,
            ..
        }
    )));

    assert_eq!(h.state.scheduler_state().await, SchedulerState::Playing);
    assert_eq!(
        h.state.current_track().await.map(|t| t.title),
        Some("beta".to_string())
    );
}

#[tokio::test]
async fn test_failed_prefetch_retries_paced_and_recovers() {
    let source = Arc::new(
        ScriptedSource::new(vec![make_station("st-1", "Cool Jazz")])
            .with_delay(Duration::from_millis(300)),
    );
    // The refill in flight at the stall fails; the engine must come back for
    // another batch on its own, paced rather than immediately.
    source.push_batch("st-1", vec![make_track("alpha", 0)]);
    source.push_error(
        "st-1",
        SourceError::Network("playlist service hiccup".to_string()),
    );
    source.push_batch("st-1", vec![make_track("beta", 300)]);
    let backend = Arc::new(MockBackend::new());
    let settings = SchedulerSettings {
        look_ahead: 1,
        advance_margin: Duration::from_millis(50),
    };
    let mut h = start_engine(&source, &backend, settings);

    h.scheduler
        .select_station("st-1")
        .await
        .expect("selection should be accepted");

    let seen = collect_until(&mut h.events, |e| {
        matches!(e, WradEvent::SchedulerError { operation, .. } if operation == "prefetch")
    })
    .await;
    // The stall was already visible when the refill failed.
    assert!(seen.iter().any(|e| matches!(
        e,
        WradEvent::StateChanged {
            state: SchedulerState::Playing,
            current_track: None,
            ..
        }
    )));

    let errored_at = Instant::now();
    let seen = collect_until(&mut h.events, |e| started_title(e) == Some("beta")).await;
    let waited = errored_at.elapsed();

    // The follow-up is paced, not a hot loop on the failing source.
    assert!(
        waited >= Duration::from_millis(1000),
        "retry came too soon after the failed refill: {:?}",
        waited
    );
    assert!(!seen.iter().any(|e| matches!(
        e,
        WradEvent::StateChanged {
            state: SchedulerState::Stopped,
            ..
        }
    )));

    // Selection batch, failed refill, paced retry.
    assert_eq!(source.fetch_log(), vec!["st-1", "st-1", "st-1"]);
    assert_eq!(h.state.scheduler_state().await, SchedulerState::Playing);
    assert_eq!(
        h.state.current_track().await.map(|t| t.title),
        Some("beta".to_string())
    );
}

#[tokio::test]
async fn test_resume_from_starved_pause_restarts_refill() {
    let source = Arc::new(
        ScriptedSource::new(vec![make_station("st-1", "Cool Jazz")])
            .with_delay(Duration::from_millis(300)),
    );
    // The refill in flight at the stall fails while playback is paused, so
    // no paced retry runs (those only run while Playing). Resume has to
    // notice the dead stall and fetch again itself.
    source.push_batch("st-1", vec![make_track("alpha", 0)]);
    source.push_error(
        "st-1",
        SourceError::Network("playlist service hiccup".to_string()),
    );
    source.push_batch("st-1", vec![make_track("beta", 300)]);
    let backend = Arc::new(MockBackend::new());
    let settings = SchedulerSettings {
        look_ahead: 1,
        advance_margin: Duration::from_millis(50),
    };
    let mut h = start_engine(&source, &backend, settings);

    h.scheduler
        .select_station("st-1")
        .await
        .expect("selection should be accepted");
    collect_until(&mut h.events, |e| {
        matches!(
            e,
            WradEvent::StateChanged {
                state: SchedulerState::Playing,
                current_track: None,
                ..
            }
        )
    })
    .await;

    // Pause during the stall, before the in-flight refill fails.
    h.scheduler.pause().await.expect("pause should succeed");
    assert_eq!(h.state.scheduler_state().await, SchedulerState::Paused);

    // The refill error lands while paused and must not be retried here.
    collect_until(&mut h.events, |e| {
        matches!(e, WradEvent::SchedulerError { operation, .. } if operation == "prefetch")
    })
    .await;
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(source.fetch_log(), vec!["st-1", "st-1"]);
    assert_eq!(h.state.scheduler_state().await, SchedulerState::Paused);

    h.scheduler.resume().await.expect("resume should succeed");

    // Resume spawned a fresh fetch; beta plays once it lands.
    collect_until(&mut h.events, |e| started_title(e) == Some("beta")).await;
    assert_eq!(source.fetch_log(), vec!["st-1", "st-1", "st-1"]);
    assert_eq!(h.state.scheduler_state().await, SchedulerState::Playing);
    assert_eq!(
        h.state.current_track().await.map(|t| t.title),
        Some("beta".to_string())
    );
}

// ============================================================================
// Skip
// ============================================================================

#[tokio::test]
async fn test_skip_replaces_entire_queue() {
    let source = Arc::new(ScriptedSource::new(vec![make_station("st-1", "Cool Jazz")]));
    source.push_batch(
        "st-1",
        vec![
            make_track("alpha", 300),
            make_track("beta", 300),
            make_track("gamma", 300),
        ],
    );
    source.push_batch(
        "st-1",
        vec![make_track("delta", 300), make_track("epsilon", 300)],
    );
    let backend = Arc::new(MockBackend::new());
    let mut h = start_engine(&source, &backend, SchedulerSettings::default());

    h.scheduler
        .select_station("st-1")
        .await
        .expect("selection should be accepted");
    collect_until(&mut h.events, |e| started_title(e) == Some("alpha")).await;

    h.scheduler.next().await.expect("skip should be accepted");

    let seen = collect_until(&mut h.events, |e| started_title(e) == Some("delta")).await;

    // Queue length proves wholesale replacement: two leftover tracks from
    // the first batch would have made this 4.
    assert!(seen.iter().any(|e| matches!(
        e,
        WradEvent::TrackStarted { track, queue_len: 2, .. } if track.title == "delta"
    )));
    assert!(seen.iter().any(|e| matches!(
        e,
        WradEvent::StateChanged {
            state: SchedulerState::Loading,
            ..
        }
    )));

    let calls = backend.calls();
    assert_eq!(
        &calls[calls.len() - 4..],
        &[
            "stop",
            "clear",
            "enqueue http://audio.test/delta.aac",
            "play",
        ]
    );
}

#[tokio::test]
async fn test_next_requires_station() {
    let source = Arc::new(ScriptedSource::new(vec![make_station("st-1", "Cool Jazz")]));
    let backend = Arc::new(MockBackend::new());
    let h = start_engine(&source, &backend, SchedulerSettings::default());

    let err = h
        .scheduler
        .next()
        .await
        .expect_err("skip without a station must be rejected");
    assert!(matches!(err, Error::InvalidState(_)));
}

// ============================================================================
// Reselection and staleness
// ============================================================================

#[tokio::test]
async fn test_reselection_discards_stale_batch() {
    let source = Arc::new(
        ScriptedSource::new(vec![
            make_station("st-1", "Cool Jazz"),
            make_station("st-2", "Hard Bop"),
        ])
        .with_delay(Duration::from_millis(150)),
    );
    source.push_batch("st-1", vec![make_track("alpha", 300)]);
    source.push_batch("st-2", vec![make_track("omega", 300)]);
    let backend = Arc::new(MockBackend::new());
    let mut h = start_engine(&source, &backend, SchedulerSettings::default());

    // Reselect while the first fetch is still in flight.
    h.scheduler
        .select_station("st-1")
        .await
        .expect("first selection should be accepted");
    h.scheduler
        .select_station("st-2")
        .await
        .expect("second selection should be accepted");

    let seen =
        collect_until(&mut h.events, |e| matches!(e, WradEvent::TrackStarted { .. })).await;
    assert!(seen
        .iter()
        .any(|e| started_title(e) == Some("omega")));

    // Give the stale batch time to land, then check it went nowhere.
    tokio::time::sleep(Duration::from_millis(400)).await;
    while let Ok(event) = h.events.try_recv() {
        assert_ne!(started_title(&event), Some("alpha"), "stale batch must not start");
    }

    assert_eq!(
        h.state.current_station().await.map(|s| s.id),
        Some("st-2".to_string())
    );
    let enqueues: Vec<String> = backend
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("enqueue"))
        .collect();
    assert_eq!(enqueues, vec!["enqueue http://audio.test/omega.aac"]);
}

// ============================================================================
// Pause and resume
// ============================================================================

#[tokio::test]
async fn test_pause_freezes_countdown_and_resume_continues() {
    let source = Arc::new(ScriptedSource::new(vec![make_station("st-1", "Cool Jazz")]));
    source.push_batch(
        "st-1",
        vec![make_track("alpha", 1), make_track("beta", 300)],
    );
    source.push_batch(
        "st-1",
        vec![make_track("gamma", 300), make_track("delta", 300)],
    );
    let backend = Arc::new(MockBackend::new());
    let settings = SchedulerSettings {
        look_ahead: 4,
        advance_margin: Duration::from_millis(100),
    };
    let mut h = start_engine(&source, &backend, settings);

    h.scheduler
        .select_station("st-1")
        .await
        .expect("selection should be accepted");
    collect_until(&mut h.events, |e| started_title(e) == Some("alpha")).await;

    // Pause ~700ms into a 1s track: ~300ms remain on the countdown.
    tokio::time::sleep(Duration::from_millis(700)).await;
    h.scheduler.pause().await.expect("pause should succeed");
    assert_eq!(h.state.scheduler_state().await, SchedulerState::Paused);
    assert!(backend.calls().contains(&"pause".to_string()));

    // Hold the pause for longer than the whole track. A running countdown
    // would have fired in here.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    while let Ok(event) = h.events.try_recv() {
        assert_ne!(
            started_title(&event),
            Some("beta"),
            "countdown must not run while paused"
        );
    }
    assert_eq!(h.state.scheduler_state().await, SchedulerState::Paused);

    let resumed_at = Instant::now();
    h.scheduler.resume().await.expect("resume should succeed");
    collect_until(&mut h.events, |e| started_title(e) == Some("beta")).await;
    let waited = resumed_at.elapsed();

    // Remaining ~300ms plus the 100ms margin. A full restart of the countdown
    // would be ~1100ms; an immediate fire would be ~0.
    assert!(
        waited >= Duration::from_millis(150),
        "advance came too soon after resume: {:?}",
        waited
    );
    assert!(
        waited <= Duration::from_millis(900),
        "advance too late after resume, countdown was likely restarted: {:?}",
        waited
    );
}

#[tokio::test]
async fn test_pause_rejected_outside_playing() {
    let source = Arc::new(ScriptedSource::new(vec![make_station("st-1", "Cool Jazz")]));
    let backend = Arc::new(MockBackend::new());
    let h = start_engine(&source, &backend, SchedulerSettings::default());

    let err = h
        .scheduler
        .pause()
        .await
        .expect_err("pause while idle must be rejected");
    assert!(matches!(err, Error::InvalidState(_)));

    let err = h
        .scheduler
        .resume()
        .await
        .expect_err("resume while idle must be rejected");
    assert!(matches!(err, Error::InvalidState(_)));

    assert_eq!(h.state.scheduler_state().await, SchedulerState::Idle);
    assert!(backend.calls().is_empty());
}

// ============================================================================
// Stop
// ============================================================================

#[tokio::test]
async fn test_stop_is_idempotent_and_cancels_advancement() {
    let source = Arc::new(ScriptedSource::new(vec![make_station("st-1", "Cool Jazz")]));
    source.push_batch(
        "st-1",
        vec![make_track("alpha", 0), make_track("beta", 300)],
    );
    let backend = Arc::new(MockBackend::new());
    let settings = SchedulerSettings {
        look_ahead: 4,
        advance_margin: Duration::from_millis(200),
    };
    let mut h = start_engine(&source, &backend, settings);

    h.scheduler
        .select_station("st-1")
        .await
        .expect("selection should be accepted");
    collect_until(&mut h.events, |e| started_title(e) == Some("alpha")).await;

    // Stop before alpha's countdown (0s + 200ms margin) can fire.
    h.scheduler.stop().await.expect("stop should succeed");
    assert_eq!(h.state.scheduler_state().await, SchedulerState::Stopped);

    // Wait out the countdown; the cancelled timer must not advance anything.
    tokio::time::sleep(Duration::from_millis(500)).await;
    while let Ok(event) = h.events.try_recv() {
        assert_ne!(
            started_title(&event),
            Some("beta"),
            "cancelled countdown must not advance"
        );
    }

    // Second stop is a no-op that still succeeds.
    h.scheduler.stop().await.expect("repeat stop should succeed");
    assert_eq!(h.state.scheduler_state().await, SchedulerState::Stopped);

    let calls = backend.calls();
    assert_eq!(&calls[calls.len() - 2..], &["stop", "clear"]);
}

#[tokio::test]
async fn test_resume_after_stop_restarts_station() {
    let source = Arc::new(ScriptedSource::new(vec![make_station("st-1", "Cool Jazz")]));
    source.push_batch(
        "st-1",
        vec![make_track("alpha", 300), make_track("beta", 300)],
    );
    source.push_batch(
        "st-1",
        vec![make_track("gamma", 300), make_track("delta", 300)],
    );
    let backend = Arc::new(MockBackend::new());
    let mut h = start_engine(&source, &backend, SchedulerSettings::default());

    h.scheduler
        .select_station("st-1")
        .await
        .expect("selection should be accepted");
    collect_until(&mut h.events, |e| started_title(e) == Some("alpha")).await;

    h.scheduler.stop().await.expect("stop should succeed");

    // The station is retained; resume restarts it with a fresh batch.
    h.scheduler
        .resume()
        .await
        .expect("resume from stopped should restart");
    collect_until(&mut h.events, |e| started_title(e) == Some("gamma")).await;

    assert_eq!(h.state.scheduler_state().await, SchedulerState::Playing);
    assert_eq!(
        h.state.current_station().await.map(|s| s.id),
        Some("st-1".to_string())
    );
    assert_eq!(source.fetch_log(), vec!["st-1", "st-1"]);
}

// ============================================================================
// Backend failures
// ============================================================================

#[tokio::test]
async fn test_backend_failure_stops_scheduler() {
    let source = Arc::new(ScriptedSource::new(vec![make_station("st-1", "Cool Jazz")]));
    source.push_batch(
        "st-1",
        vec![make_track("alpha", 300), make_track("beta", 300)],
    );
    let backend = Arc::new(MockBackend::new());
    backend.fail_on("play");
    let mut h = start_engine(&source, &backend, SchedulerSettings::default());

    h.scheduler
        .select_station("st-1")
        .await
        .expect("selection should be accepted");

    let seen = collect_until(&mut h.events, |e| {
        matches!(
            e,
            WradEvent::StateChanged {
                state: SchedulerState::Stopped,
                ..
            }
        )
    })
    .await;

    assert!(seen.iter().any(|e| matches!(
        e,
        WradEvent::SchedulerError {
            kind: ErrorKind::Backend,
            ..
        }
    )));
    assert_eq!(h.state.scheduler_state().await, SchedulerState::Stopped);
}
