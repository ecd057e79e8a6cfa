//! Wall-clock-anchored countdown timer.
//!
//! A [`Countdown`] is anchored to a server-issued start timestamp and
//! recomputes its remaining time from clock deltas once per second, so a
//! stalled or throttled client cannot drift from the server's notion of
//! elapsed time. The expiry callback fires exactly once per anchor.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Countdown timing parameters.
#[derive(Debug, Clone, Copy)]
pub struct TimerConfig {
    /// Full countdown length in seconds.
    pub duration_secs: u64,
    /// Remaining seconds at or below which the countdown is in the warning
    /// band.
    pub warning_below_secs: u64,
    /// Remaining seconds at or below which the countdown is critical.
    pub critical_below_secs: u64,
}

impl TimerConfig {
    /// A config with the given duration and the standard urgency bands.
    pub fn new(duration_secs: u64) -> Self {
        Self {
            duration_secs,
            warning_below_secs: 30,
            critical_below_secs: 10,
        }
    }

    fn urgency(&self, remaining_secs: u64) -> Urgency {
        if remaining_secs <= self.critical_below_secs {
            Urgency::Critical
        } else if remaining_secs <= self.warning_below_secs {
            Urgency::Warning
        } else {
            Urgency::Normal
        }
    }
}

/// How close the countdown is to expiry, for presentation use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Normal,
    Warning,
    Critical,
}

/// One observable moment of a countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSnapshot {
    /// Whole seconds left until expiry.
    pub remaining_secs: u64,
    pub urgency: Urgency,
    /// Whether the countdown is live. Inert and expired countdowns are not
    /// armed.
    pub armed: bool,
}

/// A cancellable countdown that publishes [`TimerSnapshot`]s at 1 Hz.
///
/// Starts inert (`remaining = duration`, nothing scheduled). [`arm`] anchors
/// it to a start timestamp and schedules the expiry callback; [`disarm`] or
/// dropping the countdown cancels everything.
///
/// [`arm`]: Countdown::arm
/// [`disarm`]: Countdown::disarm
pub struct Countdown {
    config: TimerConfig,
    state: Arc<watch::Sender<TimerSnapshot>>,
    task: Option<JoinHandle<()>>,
}

impl Countdown {
    pub fn new(config: TimerConfig) -> Self {
        let inert = TimerSnapshot {
            remaining_secs: config.duration_secs,
            urgency: config.urgency(config.duration_secs),
            armed: false,
        };
        let (tx, _rx) = watch::channel(inert);
        Self {
            config,
            state: Arc::new(tx),
            task: None,
        }
    }

    pub fn config(&self) -> TimerConfig {
        self.config
    }

    /// Subscribe to snapshot updates. Identical consecutive snapshots are
    /// not re-published, so a band transition is observable exactly once per
    /// anchor period.
    pub fn subscribe(&self) -> watch::Receiver<TimerSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        *self.state.borrow()
    }

    /// Anchor the countdown to `anchor` and schedule `on_expiry`.
    ///
    /// Time already elapsed since the anchor counts against the duration; an
    /// anchor past the deadline fires the callback immediately. Re-arming a
    /// live countdown cancels the previous schedule first, so exactly one
    /// future callback is armed at any time.
    pub fn arm<F>(&mut self, anchor: DateTime<Utc>, on_expiry: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel_task();

        let config = self.config;
        let already_elapsed = Utc::now()
            .signed_duration_since(anchor)
            .num_seconds()
            .max(0) as u64;
        let remaining = config.duration_secs.saturating_sub(already_elapsed);

        if remaining == 0 {
            publish(&self.state, config, 0, false);
            on_expiry();
            return;
        }

        publish(&self.state, config, remaining, true);
        let state = Arc::clone(&self.state);
        self.task = Some(tokio::spawn(run_ticks(
            state,
            config,
            already_elapsed,
            on_expiry,
        )));
    }

    /// Cancel the schedule and return to the inert state.
    pub fn disarm(&mut self) {
        self.cancel_task();
        publish(&self.state, self.config, self.config.duration_secs, false);
    }

    fn cancel_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.cancel_task();
    }
}

fn publish(
    state: &watch::Sender<TimerSnapshot>,
    config: TimerConfig,
    remaining_secs: u64,
    armed: bool,
) {
    let next = TimerSnapshot {
        remaining_secs,
        urgency: config.urgency(remaining_secs),
        armed,
    };
    state.send_if_modified(|snapshot| {
        if *snapshot == next {
            false
        } else {
            *snapshot = next;
            true
        }
    });
}

async fn run_ticks<F>(
    state: Arc<watch::Sender<TimerSnapshot>>,
    config: TimerConfig,
    already_elapsed: u64,
    on_expiry: F,
) where
    F: FnOnce() + Send + 'static,
{
    let started = tokio::time::Instant::now();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let elapsed = already_elapsed + started.elapsed().as_secs();
        let remaining = config.duration_secs.saturating_sub(elapsed);
        if remaining == 0 {
            publish(&state, config, 0, false);
            on_expiry();
            return;
        }
        publish(&state, config, remaining, true);
    }
}
