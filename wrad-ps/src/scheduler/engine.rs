//! Scheduler engine
//!
//! The single serialized owner of all mutable scheduling state. External
//! requests (select/next/pause/resume/stop), advance-timer fires, and fetch
//! completions all arrive as messages on one mpsc channel and are processed
//! strictly in order by the engine task, so no operation can observe a
//! half-updated queue or timer.
//!
//! Network fetches never run on the engine task: selection, skip, and
//! prefetch each spawn a task that posts its batch back as a message.
//! Every async result carries the generation it was started under and is
//! discarded if a station change or stop has bumped the counter since.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use wrad_common::events::{ErrorKind, WradEvent};
use wrad_common::model::{SchedulerState, Station, TrackDescriptor, TrackInfo};

use crate::backend::PlaybackBackend;
use crate::error::{Error, Result};
use crate::source::{SourceError, TrackSource};
use crate::state::SharedState;

use super::queue::PlayQueue;
use super::timer::AdvanceTimer;

/// Pacing for prefetch retries while playback is stalled on an empty queue.
/// Starvation is the retry trigger; the delay just keeps a failing source
/// from being hammered.
const STARVATION_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Engine tuning, taken from the service configuration.
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// Batch size requested from the source (look-ahead depth).
    pub look_ahead: usize,
    /// Safety pad added to every advance countdown.
    pub advance_margin: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            look_ahead: 4,
            advance_margin: Duration::from_millis(1000),
        }
    }
}

/// Why a batch was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchPurpose {
    /// New station: the arriving batch replaces everything.
    Selection,
    /// Skip: same station, but the whole look-ahead is replaced.
    Skip,
    /// Queue refill behind an ongoing track.
    Prefetch,
}

/// A resolved batch: the station it belongs to plus its tracks.
#[derive(Debug)]
struct FetchedBatch {
    station: Station,
    tracks: Vec<TrackDescriptor>,
}

/// Messages into the engine task.
enum Command {
    SelectStation {
        station_id: String,
        reply: oneshot::Sender<Result<()>>,
    },
    Next {
        reply: oneshot::Sender<Result<()>>,
    },
    Pause {
        reply: oneshot::Sender<Result<()>>,
    },
    Resume {
        reply: oneshot::Sender<Result<()>>,
    },
    Stop {
        reply: oneshot::Sender<Result<()>>,
    },
    /// Advance timer countdown expired.
    TimerFired { epoch: u64 },
    /// A spawned fetch task completed.
    BatchFetched {
        generation: u64,
        purpose: FetchPurpose,
        station_id: String,
        outcome: std::result::Result<FetchedBatch, SourceError>,
    },
    Shutdown,
}

/// Cloneable front door to the engine task.
#[derive(Clone)]
pub struct SchedulerHandle {
    cmd_tx: mpsc::UnboundedSender<Command>,
    state: Arc<SharedState>,
}

impl SchedulerHandle {
    pub async fn select_station(&self, station_id: &str) -> Result<()> {
        let station_id = station_id.to_string();
        self.request(|reply| Command::SelectStation { station_id, reply })
            .await
    }

    pub async fn next(&self) -> Result<()> {
        self.request(|reply| Command::Next { reply }).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.request(|reply| Command::Pause { reply }).await
    }

    pub async fn resume(&self) -> Result<()> {
        self.request(|reply| Command::Resume { reply }).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.request(|reply| Command::Stop { reply }).await
    }

    /// Current scheduler state, read from the shared mirror without a
    /// command-loop round trip.
    pub async fn current_state(&self) -> SchedulerState {
        self.state.scheduler_state().await
    }

    /// Ask the engine task to exit after draining queued commands.
    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(Command::Shutdown);
    }

    async fn request<F>(&self, make: F) -> Result<()>
    where
        F: FnOnce(oneshot::Sender<Result<()>>) -> Command,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(make(reply_tx))
            .map_err(|_| Error::Internal("scheduler engine is not running".to_string()))?;
        reply_rx
            .await
            .map_err(|_| Error::Internal("scheduler engine dropped the request".to_string()))?
    }
}

/// The scheduling state machine. Owns the playback queue and advance timer;
/// runs as a single spawned task.
pub struct SchedulerEngine {
    settings: SchedulerSettings,
    source: Arc<dyn TrackSource>,
    backend: Arc<dyn PlaybackBackend>,
    state: Arc<SharedState>,

    queue: PlayQueue,
    timer: AdvanceTimer,
    scheduler_state: SchedulerState,
    station: Option<Station>,
    /// Bumped on select/next/stop; stale async results are discarded.
    generation: u64,
    prefetch_inflight: bool,
    /// Playback stalled on an empty queue; the next landed batch (or
    /// resume, if paused meanwhile) owes a head start.
    starved: bool,

    cmd_tx: mpsc::UnboundedSender<Command>,
    cmd_rx: mpsc::UnboundedReceiver<Command>,
}

impl SchedulerEngine {
    pub fn new(
        settings: SchedulerSettings,
        source: Arc<dyn TrackSource>,
        backend: Arc<dyn PlaybackBackend>,
        state: Arc<SharedState>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let timer = AdvanceTimer::new(settings.advance_margin);
        Self {
            settings,
            source,
            backend,
            state,
            queue: PlayQueue::new(),
            timer,
            scheduler_state: SchedulerState::Idle,
            station: None,
            generation: 0,
            prefetch_inflight: false,
            starved: false,
            cmd_tx,
            cmd_rx,
        }
    }

    /// Spawn the engine task and return the handle callers use.
    pub fn start(self) -> SchedulerHandle {
        let handle = SchedulerHandle {
            cmd_tx: self.cmd_tx.clone(),
            state: Arc::clone(&self.state),
        };
        tokio::spawn(self.run());
        handle
    }

    async fn run(mut self) {
        info!(
            look_ahead = self.settings.look_ahead,
            margin_ms = self.settings.advance_margin.as_millis() as u64,
            "Scheduler engine started"
        );

        while let Some(cmd) = self.cmd_rx.recv().await {
            match cmd {
                Command::SelectStation { station_id, reply } => {
                    let result = self.select_station(station_id).await;
                    let _ = reply.send(result);
                }
                Command::Next { reply } => {
                    let result = self.next().await;
                    let _ = reply.send(result);
                }
                Command::Pause { reply } => {
                    let result = self.pause().await;
                    let _ = reply.send(result);
                }
                Command::Resume { reply } => {
                    let result = self.resume().await;
                    let _ = reply.send(result);
                }
                Command::Stop { reply } => {
                    let result = self.stop().await;
                    let _ = reply.send(result);
                }
                Command::TimerFired { epoch } => self.on_timer_fired(epoch).await,
                Command::BatchFetched {
                    generation,
                    purpose,
                    station_id,
                    outcome,
                } => {
                    self.on_batch_fetched(generation, purpose, station_id, outcome)
                        .await
                }
                Command::Shutdown => break,
            }
        }

        self.timer.cancel();
        info!("Scheduler engine stopped");
    }

    // ------------------------------------------------------------------
    // Public operations
    // ------------------------------------------------------------------

    /// Any state → Loading; the arriving batch replaces everything.
    async fn select_station(&mut self, station_id: String) -> Result<()> {
        info!(station_id = %station_id, "Station selected");

        self.invalidate();
        // The old station is no longer a restart target; the new one becomes
        // authoritative when its batch lands.
        self.station = None;
        self.state.set_current_station(None).await;

        // Display name from the cache when we have it; the fetch task
        // resolves authoritatively.
        let cached_name = self
            .state
            .stations()
            .await
            .into_iter()
            .find(|s| s.id == station_id)
            .map(|s| s.name);
        self.state.broadcast_event(WradEvent::StationSelected {
            station_id: station_id.clone(),
            station_name: cached_name.unwrap_or_else(|| station_id.clone()),
            timestamp: Utc::now(),
        });

        self.set_state(SchedulerState::Loading, None).await;
        self.spawn_fetch(FetchPurpose::Selection, station_id, None, Duration::ZERO);
        Ok(())
    }

    /// Skip: discard the current look-ahead and fetch a fresh batch for the
    /// retained station.
    async fn next(&mut self) -> Result<()> {
        let station = self
            .station
            .clone()
            .ok_or_else(|| Error::InvalidState("no station selected".to_string()))?;

        match self.scheduler_state {
            SchedulerState::Playing | SchedulerState::Paused | SchedulerState::Stopped => {}
            other => {
                return Err(Error::InvalidState(format!(
                    "cannot skip while {}",
                    other
                )))
            }
        }

        info!(station_id = %station.id, "Skip requested, replacing look-ahead");
        self.invalidate();
        self.set_state(SchedulerState::Loading, None).await;
        self.spawn_fetch(
            FetchPurpose::Skip,
            station.id.clone(),
            Some(station),
            Duration::ZERO,
        );
        Ok(())
    }

    async fn pause(&mut self) -> Result<()> {
        if self.scheduler_state != SchedulerState::Playing {
            return Err(Error::InvalidState(format!(
                "cannot pause while {}",
                self.scheduler_state
            )));
        }

        if self.starved {
            // Nothing is audibly playing; just hold the stall.
            info!("Paused while awaiting tracks");
            let current = self.state.current_track().await;
            self.set_state(SchedulerState::Paused, current).await;
            return Ok(());
        }

        self.timer.pause()?;
        if let Err(err) = self.backend.pause().await {
            let err = Error::from(err);
            error!(error = %err, "Backend pause failed");
            self.report_failure("pause", self.station_id(), &err).await;
            self.enter_stopped().await;
            return Err(err);
        }

        let current = self.queue.peek_head().map(|t| t.info());
        info!("Playback paused");
        self.set_state(SchedulerState::Paused, current).await;
        Ok(())
    }

    async fn resume(&mut self) -> Result<()> {
        match self.scheduler_state {
            SchedulerState::Paused => {}
            // A stopped station restarts through the skip path.
            SchedulerState::Stopped if self.station.is_some() => {
                info!("Resume from stopped, restarting station");
                return self.next().await;
            }
            other => {
                return Err(Error::InvalidState(format!(
                    "cannot resume while {}",
                    other
                )))
            }
        }

        if self.starved {
            info!("Resumed while awaiting tracks");
            self.starved = false;
            if self.queue.is_empty() {
                // Still empty. A refill that failed while paused scheduled
                // no retry (retries only run while Playing), so re-enter the
                // stall through the path that re-spawns the fetch when none
                // is pending.
                self.enter_starved().await;
                return Ok(());
            }
            // A batch landed during the pause; start its head fresh.
            match self.start_head(true).await {
                Ok(info) => {
                    self.maybe_prefetch();
                    self.set_state(SchedulerState::Playing, Some(info)).await;
                    return Ok(());
                }
                Err(err) => {
                    self.report_failure("resume", self.station_id(), &err).await;
                    self.enter_stopped().await;
                    return Err(err);
                }
            }
        }

        let tx = self.cmd_tx.clone();
        self.timer.resume(move |epoch| {
            let _ = tx.send(Command::TimerFired { epoch });
        })?;
        if let Err(err) = self.backend.resume().await {
            let err = Error::from(err);
            error!(error = %err, "Backend resume failed");
            self.report_failure("resume", self.station_id(), &err).await;
            self.enter_stopped().await;
            return Err(err);
        }

        let current = self.queue.peek_head().map(|t| t.info());
        info!("Playback resumed");
        self.set_state(SchedulerState::Playing, current).await;
        Ok(())
    }

    /// Any state → Stopped. Idempotent; backend trouble is reported but
    /// never keeps the engine out of the terminal state.
    async fn stop(&mut self) -> Result<()> {
        info!("Stop requested");
        self.enter_stopped().await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Timer and fetch completions
    // ------------------------------------------------------------------

    async fn on_timer_fired(&mut self, epoch: u64) {
        if !self.timer.acknowledge_fire(epoch) {
            return;
        }
        if self.scheduler_state != SchedulerState::Playing {
            warn!(state = %self.scheduler_state, "Timer fire outside playing, ignoring");
            return;
        }
        self.advance().await;
    }

    /// Track N finished: pop it, start the new head, trigger prefetch if the
    /// look-ahead is down to its last track.
    async fn advance(&mut self) {
        match self.queue.pop_head() {
            Ok(finished) => {
                debug!(title = %finished.title, "Track complete");
            }
            Err(_) => {
                // The prefetch invariant keeps the head present until its
                // timer fires; an empty queue here means the invariant broke.
                error!("Advancement with empty queue, stopping");
                self.emit_error(
                    "advance",
                    self.station_id(),
                    ErrorKind::Internal,
                    Error::EmptyQueue.to_string(),
                );
                self.enter_stopped().await;
                return;
            }
        }

        if self.queue.is_empty() {
            self.enter_starved().await;
            return;
        }

        match self.start_head(false).await {
            Ok(info) => {
                self.maybe_prefetch();
                self.set_state(SchedulerState::Playing, Some(info)).await;
            }
            Err(err) => {
                error!(error = %err, "Failed to start next track");
                self.report_failure("advance", self.station_id(), &err).await;
                self.enter_stopped().await;
            }
        }
    }

    async fn on_batch_fetched(
        &mut self,
        generation: u64,
        purpose: FetchPurpose,
        station_id: String,
        outcome: std::result::Result<FetchedBatch, SourceError>,
    ) {
        if generation != self.generation {
            debug!(
                stale = generation,
                current = self.generation,
                ?purpose,
                "Discarding batch from a previous generation"
            );
            return;
        }

        match purpose {
            FetchPurpose::Selection | FetchPurpose::Skip => {
                self.on_initial_batch(purpose, station_id, outcome).await
            }
            FetchPurpose::Prefetch => self.on_prefetch_batch(station_id, outcome).await,
        }
    }

    /// Batch for a selection or skip: replaces the queue wholesale and
    /// rebuilds the backend list.
    async fn on_initial_batch(
        &mut self,
        purpose: FetchPurpose,
        station_id: String,
        outcome: std::result::Result<FetchedBatch, SourceError>,
    ) {
        let operation = match purpose {
            FetchPurpose::Skip => "next",
            _ => "select_station",
        };
        let batch = match outcome {
            Ok(batch) => batch,
            Err(err) => {
                warn!(station_id = %station_id, error = %err, "Station batch fetch failed");
                self.emit_error(
                    operation,
                    Some(station_id),
                    source_error_kind(&err),
                    err.to_string(),
                );
                self.enter_stopped().await;
                return;
            }
        };

        if batch.tracks.is_empty() {
            warn!(station_id = %station_id, "Source returned an empty batch for selection");
            self.emit_error(
                operation,
                Some(station_id),
                ErrorKind::Source,
                "source returned no tracks".to_string(),
            );
            self.enter_stopped().await;
            return;
        }

        self.station = Some(batch.station.clone());
        self.state.set_current_station(Some(batch.station)).await;
        self.queue.append(batch.tracks);

        match self.start_head(true).await {
            Ok(info) => {
                self.maybe_prefetch();
                self.set_state(SchedulerState::Playing, Some(info)).await;
            }
            Err(err) => {
                error!(error = %err, "Failed to start station head");
                self.report_failure(operation, self.station_id(), &err).await;
                self.enter_stopped().await;
            }
        }
    }

    /// Prefetched batch: appended behind the running timer. If playback was
    /// stalled on an empty queue, the landed batch (re)starts it.
    async fn on_prefetch_batch(
        &mut self,
        station_id: String,
        outcome: std::result::Result<FetchedBatch, SourceError>,
    ) {
        self.prefetch_inflight = false;

        match outcome {
            Ok(batch) => {
                let appended = batch.tracks.len();
                if appended == 0 {
                    warn!(station_id = %station_id, "Prefetch returned no tracks");
                } else {
                    self.queue.append(batch.tracks);
                    debug!(
                        appended,
                        queue_len = self.queue.len(),
                        "Prefetch batch appended"
                    );
                    self.state.broadcast_event(WradEvent::QueueRefilled {
                        appended,
                        queue_len: self.queue.len(),
                        timestamp: Utc::now(),
                    });
                }
            }
            Err(err) => {
                warn!(station_id = %station_id, error = %err, "Prefetch failed");
                self.emit_error(
                    "prefetch",
                    Some(station_id),
                    source_error_kind(&err),
                    err.to_string(),
                );
                if err.is_terminal() && self.starved {
                    // Credentials are gone and nothing is queued; a retry
                    // loop cannot fix that.
                    self.enter_stopped().await;
                    return;
                }
            }
        }

        if self.starved && self.scheduler_state == SchedulerState::Playing {
            if self.queue.is_empty() {
                // Starvation persists; it remains the retry trigger, paced.
                self.retry_prefetch_after_delay();
                return;
            }
            self.starved = false;
            match self.start_head(true).await {
                Ok(info) => {
                    info!("Playback recovered from starvation");
                    self.maybe_prefetch();
                    self.set_state(SchedulerState::Playing, Some(info)).await;
                }
                Err(err) => {
                    error!(error = %err, "Failed to restart after starvation");
                    self.report_failure("prefetch", self.station_id(), &err).await;
                    self.enter_stopped().await;
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Start playback of the current queue head and arm its countdown.
    /// `rebuild` additionally resets the backend's own list first (station
    /// change, skip, starvation recovery); plain advancement relies on
    /// consumed entries leaving it naturally.
    async fn start_head(&mut self, rebuild: bool) -> Result<TrackInfo> {
        let head = self
            .queue
            .peek_head()
            .cloned()
            .ok_or(Error::EmptyQueue)?;

        if rebuild {
            self.backend.stop().await.map_err(Error::from)?;
            self.backend.clear_queue().await.map_err(Error::from)?;
        }
        self.backend
            .enqueue(&head.audio_url)
            .await
            .map_err(Error::from)?;
        self.backend.play().await.map_err(Error::from)?;

        let tx = self.cmd_tx.clone();
        self.timer.arm(
            Duration::from_secs(u64::from(head.duration_secs)),
            move |epoch| {
                let _ = tx.send(Command::TimerFired { epoch });
            },
        )?;

        info!(
            title = %head.title,
            artist = %head.artist,
            duration_secs = head.duration_secs,
            queue_len = self.queue.len(),
            "Track started"
        );
        self.state.broadcast_event(WradEvent::TrackStarted {
            track: head.info(),
            queue_len: self.queue.len(),
            timestamp: Utc::now(),
        });

        Ok(head.info())
    }

    /// Stall in `Playing` on an empty queue until a batch lands, spawning a
    /// refill first if none is pending.
    async fn enter_starved(&mut self) {
        if !self.prefetch_inflight {
            // The previous prefetch failed (already reported); starvation is
            // the trigger that retries it.
            if let Some(station) = self.station.clone() {
                self.prefetch_inflight = true;
                self.spawn_fetch(
                    FetchPurpose::Prefetch,
                    station.id.clone(),
                    Some(station),
                    Duration::ZERO,
                );
            } else {
                error!("Starved with no station, stopping");
                self.enter_stopped().await;
                return;
            }
        }
        warn!("Playback queue starved, stalling until the next batch lands");
        self.starved = true;
        self.set_state(SchedulerState::Playing, None).await;
    }

    /// Trigger a refill when the look-ahead is down to its last track.
    fn maybe_prefetch(&mut self) {
        if self.queue.len() != 1 || self.prefetch_inflight {
            return;
        }
        let Some(station) = self.station.clone() else {
            return;
        };
        debug!(station_id = %station.id, "Queue down to last track, prefetching");
        self.prefetch_inflight = true;
        self.spawn_fetch(
            FetchPurpose::Prefetch,
            station.id.clone(),
            Some(station),
            Duration::ZERO,
        );
    }

    fn retry_prefetch_after_delay(&mut self) {
        let Some(station) = self.station.clone() else {
            return;
        };
        debug!(
            delay_ms = STARVATION_RETRY_DELAY.as_millis() as u64,
            "Still starved, scheduling prefetch retry"
        );
        self.prefetch_inflight = true;
        self.spawn_fetch(
            FetchPurpose::Prefetch,
            station.id.clone(),
            Some(station),
            STARVATION_RETRY_DELAY,
        );
    }

    /// Run a batch fetch off the engine task and post the result back.
    fn spawn_fetch(
        &mut self,
        purpose: FetchPurpose,
        station_id: String,
        known_station: Option<Station>,
        delay: Duration,
    ) {
        let source = Arc::clone(&self.source);
        let state = Arc::clone(&self.state);
        let tx = self.cmd_tx.clone();
        let generation = self.generation;
        let count = self.settings.look_ahead;

        debug!(station_id = %station_id, ?purpose, generation, "Requesting track batch");
        tokio::spawn(async move {
            if delay > Duration::ZERO {
                tokio::time::sleep(delay).await;
            }
            let outcome = fetch_batch(
                source.as_ref(),
                state.as_ref(),
                &station_id,
                count,
                known_station,
            )
            .await;
            let _ = tx.send(Command::BatchFetched {
                generation,
                purpose,
                station_id,
                outcome,
            });
        });
    }

    /// Invalidate every in-flight async result and drop queued tracks.
    fn invalidate(&mut self) {
        self.generation += 1;
        self.timer.cancel();
        self.queue.clear();
        self.prefetch_inflight = false;
        self.starved = false;
    }

    /// Terminal until the next selection: invalidate, quiesce the backend,
    /// publish Stopped. The selected station is retained so `next`/`resume`
    /// can restart it.
    async fn enter_stopped(&mut self) {
        self.invalidate();

        if let Err(err) = self.backend.stop().await {
            warn!(error = %err, "Backend stop failed while entering stopped");
        } else if let Err(err) = self.backend.clear_queue().await {
            warn!(error = %err, "Backend clear failed while entering stopped");
        }

        self.set_state(SchedulerState::Stopped, None).await;
    }

    /// Update the authoritative state, mirror it, and notify subscribers.
    /// Also called for `Playing` → `Playing` on advancement so the channel
    /// reports every track change.
    async fn set_state(&mut self, state: SchedulerState, track: Option<TrackInfo>) {
        self.scheduler_state = state;
        self.state.set_scheduler_state(state).await;
        self.state.set_current_track(track.clone()).await;
        self.state.broadcast_event(WradEvent::StateChanged {
            state,
            current_track: track,
            timestamp: Utc::now(),
        });
        debug!(state = %state, "Scheduler state updated");
    }

    fn station_id(&self) -> Option<String> {
        self.station.as_ref().map(|s| s.id.clone())
    }

    fn emit_error(
        &self,
        operation: &str,
        station_id: Option<String>,
        kind: ErrorKind,
        message: String,
    ) {
        self.state.broadcast_event(WradEvent::SchedulerError {
            operation: operation.to_string(),
            station_id,
            message,
            kind,
            timestamp: Utc::now(),
        });
    }

    async fn report_failure(&self, operation: &str, station_id: Option<String>, err: &Error) {
        let kind = match err {
            Error::Backend(_) => ErrorKind::Backend,
            Error::Source(source_err) => source_error_kind(source_err),
            _ => ErrorKind::Internal,
        };
        self.emit_error(operation, station_id, kind, err.to_string());
    }
}

fn source_error_kind(err: &SourceError) -> ErrorKind {
    match err {
        SourceError::InvalidCredential(_) | SourceError::Auth(_) => ErrorKind::Auth,
        _ => ErrorKind::Source,
    }
}

/// Resolve the station (cache first, then a refreshed list) and fetch its
/// next batch. Runs on a spawned task, never on the engine loop.
async fn fetch_batch(
    source: &dyn TrackSource,
    state: &SharedState,
    station_id: &str,
    count: usize,
    known_station: Option<Station>,
) -> std::result::Result<FetchedBatch, SourceError> {
    let station = match known_station {
        Some(station) => station,
        None => {
            let cached = state
                .stations()
                .await
                .into_iter()
                .find(|s| s.id == station_id);
            match cached {
                Some(station) => station,
                None => {
                    let stations = source.list_stations().await?;
                    state.set_stations(stations.clone()).await;
                    stations
                        .into_iter()
                        .find(|s| s.id == station_id)
                        .ok_or_else(|| SourceError::UnknownStation(station_id.to_string()))?
                }
            }
        }
    };

    let tracks = source.fetch_playlist(station_id, count).await?;
    Ok(FetchedBatch { station, tracks })
}
