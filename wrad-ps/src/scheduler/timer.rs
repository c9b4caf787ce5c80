//! Advance timer
//!
//! One pending "fire after duration" event per playing track, with
//! pause/resume. The countdown itself is a spawned sleep task; pause and
//! cancel abort the task and all remaining-time bookkeeping is done from
//! wall-clock deltas, never by suspending a timer in place.
//!
//! Source-reported durations carry ±1 s of measurement error, so every
//! countdown is padded by a fixed safety margin. The margin is counted once
//! per track: pause books only real elapsed time against the base duration,
//! so repeated pause/resume cycles do not accumulate extra padding.
//!
//! Race closure: the sleep task can deliver its fire notification in the
//! same instant a pause/cancel lands. Every arm bumps an epoch and the
//! notification carries the epoch it was armed under; the engine must pass
//! it back through [`AdvanceTimer::acknowledge_fire`], which rejects
//! anything but the current epoch of a currently armed countdown.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{Error, Result};

/// Timer lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// No countdown has been armed yet.
    Idle,
    /// Countdown running; a fire notification will be delivered.
    Armed,
    /// Countdown released with remaining time retained.
    Paused,
    /// Countdown expired and the fire was acknowledged.
    Fired,
    /// Countdown invalidated; pending notifications are stale.
    Cancelled,
}

/// Pausable one-shot countdown driving track advancement.
pub struct AdvanceTimer {
    state: TimerState,
    /// Bumped on every arm/pause/cancel; stale fires carry an older value.
    epoch: u64,
    margin: Duration,
    /// Base duration of the current countdown, margin excluded.
    duration: Duration,
    armed_at: Option<Instant>,
    /// Valid while `Paused`.
    remaining: Duration,
    task: Option<JoinHandle<()>>,
}

impl AdvanceTimer {
    pub fn new(margin: Duration) -> Self {
        Self {
            state: TimerState::Idle,
            epoch: 0,
            margin,
            duration: Duration::ZERO,
            armed_at: None,
            remaining: Duration::ZERO,
            task: None,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Time left on the current countdown, margin excluded.
    pub fn remaining(&self) -> Option<Duration> {
        match self.state {
            TimerState::Armed => self
                .armed_at
                .map(|armed_at| self.duration.saturating_sub(armed_at.elapsed())),
            TimerState::Paused => Some(self.remaining),
            _ => None,
        }
    }

    /// Start a countdown of `duration` (+ margin) for a new track.
    ///
    /// Valid from `Idle`, `Fired`, and `Cancelled`; an armed or paused timer
    /// must be cancelled first.
    pub fn arm<F>(&mut self, duration: Duration, notify: F) -> Result<()>
    where
        F: FnOnce(u64) + Send + 'static,
    {
        match self.state {
            TimerState::Idle | TimerState::Fired | TimerState::Cancelled => {}
            other => {
                return Err(Error::InvalidState(format!(
                    "cannot arm advance timer from {:?}",
                    other
                )))
            }
        }
        self.start_countdown(duration, notify);
        Ok(())
    }

    /// Release the countdown, retaining `duration − elapsed` (clamped to 0).
    pub fn pause(&mut self) -> Result<Duration> {
        if self.state != TimerState::Armed {
            return Err(Error::InvalidState(format!(
                "cannot pause advance timer from {:?}",
                self.state
            )));
        }

        self.abort_task();
        self.epoch += 1;

        let elapsed = self
            .armed_at
            .map(|armed_at| armed_at.elapsed())
            .unwrap_or_default();
        self.remaining = self.duration.saturating_sub(elapsed);
        self.armed_at = None;
        self.state = TimerState::Paused;

        debug!(
            remaining_ms = self.remaining.as_millis() as u64,
            "Advance timer paused"
        );
        Ok(self.remaining)
    }

    /// Re-arm a fresh countdown for exactly the retained remaining time.
    pub fn resume<F>(&mut self, notify: F) -> Result<Duration>
    where
        F: FnOnce(u64) + Send + 'static,
    {
        if self.state != TimerState::Paused {
            return Err(Error::InvalidState(format!(
                "cannot resume advance timer from {:?}",
                self.state
            )));
        }

        let remaining = self.remaining;
        self.start_countdown(remaining, notify);
        debug!(
            remaining_ms = remaining.as_millis() as u64,
            "Advance timer resumed"
        );
        Ok(remaining)
    }

    /// Invalidate the countdown and any notification already in flight.
    ///
    /// Safe to call in any state; idempotent.
    pub fn cancel(&mut self) {
        self.abort_task();
        self.epoch += 1;
        self.armed_at = None;
        self.state = TimerState::Cancelled;
    }

    /// Validate a delivered fire notification.
    ///
    /// Returns true and transitions to `Fired` only when the timer is still
    /// armed under the delivered epoch. A false return means the countdown
    /// was paused, cancelled, or re-armed after the notification was sent
    /// and the fire must be ignored.
    pub fn acknowledge_fire(&mut self, epoch: u64) -> bool {
        if self.state == TimerState::Armed && epoch == self.epoch {
            self.task = None;
            self.armed_at = None;
            self.state = TimerState::Fired;
            true
        } else {
            debug!(
                delivered_epoch = epoch,
                current_epoch = self.epoch,
                state = ?self.state,
                "Ignoring stale advance timer fire"
            );
            false
        }
    }

    fn start_countdown<F>(&mut self, duration: Duration, notify: F)
    where
        F: FnOnce(u64) + Send + 'static,
    {
        self.abort_task();
        self.epoch += 1;
        let epoch = self.epoch;
        let delay = duration + self.margin;

        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            notify(epoch);
        }));
        self.duration = duration;
        self.armed_at = Some(Instant::now());
        self.state = TimerState::Armed;

        debug!(
            duration_ms = duration.as_millis() as u64,
            delay_ms = delay.as_millis() as u64,
            epoch,
            "Advance timer armed"
        );
    }

    fn abort_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for AdvanceTimer {
    fn drop(&mut self) {
        self.abort_task();
    }
}
