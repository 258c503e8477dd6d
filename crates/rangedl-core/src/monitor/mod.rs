//! Progress notification and stall detection for one run.
//!
//! All state here is per run and is only touched from the scheduler's control
//! loop. Time is passed in by the caller so the throttling and stall rules can
//! be exercised without sleeping.

mod gauge;
mod stats;

pub use gauge::StreamGauge;
pub use stats::ProgressStats;

use std::time::{Duration, Instant};

use crate::error::DownloadError;
use crate::transport::Flow;

/// Upper bound on a single multiplexed wait, so stalls and aborts are noticed
/// promptly even with a long network timeout.
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Receives `(done_bytes, total_bytes)` at most once per callback period.
/// Returning `Flow::Stop` aborts the run gracefully.
pub trait ProgressObserver {
    fn on_progress(&mut self, done_bytes: u64, total_bytes: u64) -> Flow;
}

impl<F> ProgressObserver for F
where
    F: FnMut(u64, u64) -> Flow,
{
    fn on_progress(&mut self, done_bytes: u64, total_bytes: u64) -> Flow {
        self(done_bytes, total_bytes)
    }
}

/// Per-run progress and activity bookkeeping.
pub struct Monitor<'a> {
    total_bytes: u64,
    done_bytes: u64,
    min_callback_period: Duration,
    network_timeout: Duration,
    last_activity: Instant,
    last_notify: Option<Instant>,
    aborted: bool,
    in_flight: usize,
    gauge: Option<StreamGauge>,
    observer: Option<&'a mut dyn ProgressObserver>,
}

impl<'a> Monitor<'a> {
    pub fn new(total_bytes: u64, min_callback_period: Duration, network_timeout: Duration) -> Self {
        Self {
            total_bytes,
            done_bytes: 0,
            min_callback_period,
            network_timeout,
            last_activity: Instant::now(),
            last_notify: None,
            aborted: false,
            in_flight: 0,
            gauge: None,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: &'a mut dyn ProgressObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Publish the in-flight count to `gauge` as it changes.
    pub fn with_gauge(mut self, gauge: StreamGauge) -> Self {
        gauge.set(self.in_flight);
        self.gauge = Some(gauge);
        self
    }

    /// Record how many transfers are open right now.
    pub fn set_in_flight(&mut self, n: usize) {
        self.in_flight = n;
        if let Some(gauge) = &self.gauge {
            gauge.set(n);
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Reset the activity clock; called when the run starts transferring.
    pub fn start(&mut self, now: Instant) {
        self.last_activity = now;
    }

    /// Account for `n` freshly written bytes and notify the observer if the
    /// callback period has elapsed. Returns `Flow::Stop` once aborted.
    pub fn record(&mut self, n: u64, now: Instant) -> Flow {
        self.done_bytes += n;
        debug_assert!(self.done_bytes <= self.total_bytes);
        self.last_activity = now;

        if self.aborted {
            return Flow::Stop;
        }
        let due = self
            .last_notify
            .map_or(true, |t| now.saturating_duration_since(t) >= self.min_callback_period);
        if !due {
            return Flow::Continue;
        }
        if let Some(observer) = self.observer.as_mut() {
            if observer.on_progress(self.done_bytes, self.total_bytes) == Flow::Stop {
                tracing::info!(done = self.done_bytes, "observer requested stop");
                self.aborted = true;
                return Flow::Stop;
            }
            self.last_notify = Some(now);
        }
        Flow::Continue
    }

    /// Mark activity without new bytes (e.g. a transfer completing).
    pub fn touch(&mut self, now: Instant) {
        self.last_activity = now;
    }

    /// Fails with `Stalled` when nothing happened for longer than the network timeout.
    pub fn check_stall(&self, now: Instant) -> Result<(), DownloadError> {
        let idle = now.saturating_duration_since(self.last_activity);
        if idle > self.network_timeout {
            return Err(DownloadError::Stalled { idle });
        }
        Ok(())
    }

    /// Bound for one multiplexed wait.
    pub fn poll_interval(&self) -> Duration {
        self.network_timeout.min(MAX_POLL_INTERVAL)
    }

    pub fn done_bytes(&self) -> u64 {
        self.done_bytes
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }
}
