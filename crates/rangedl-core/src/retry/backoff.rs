use std::time::Duration;

use crate::config::RetryConfig;

/// Why a download attempt failed, as far as retrying is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No bytes arrived for `network_timeout`. The next attempt starts over.
    Stalled,
    /// 429 or 503: the server wants fewer requests.
    Throttled,
    /// Connect failure, reset, timeout or a short body.
    Network,
    /// Any other 5xx.
    ServerError,
    /// Local, input or protocol errors; never retried.
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    NoRetry,
    RetryAfter(Duration),
}

/// Doublings stop here so the shift never overflows.
const MAX_DOUBLINGS: u32 = 8;

/// Throttled runs open `max_parallel` connections again, so they back off harder.
const THROTTLE_FACTOR: u32 = 4;

impl RetryConfig {
    /// Backoff before attempt `attempt + 1`, or `NoRetry` once `max_attempts`
    /// attempts have been made. `attempt` is 1-based.
    ///
    /// A stall waits a flat `base_delay`: the whole run restarts anyway, and a
    /// stalled server is usually a dead connection rather than an overloaded one.
    /// Network and 5xx failures double each time. Throttling starts at
    /// four times the base and doubles from there. All delays cap at `max_delay`.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::NoRetry;
        }
        let base = self.base_delay();
        let doubling = 1u32 << attempt.saturating_sub(1).min(MAX_DOUBLINGS);
        let delay = match kind {
            ErrorKind::Other => return RetryDecision::NoRetry,
            ErrorKind::Stalled => base,
            ErrorKind::Network | ErrorKind::ServerError => base.saturating_mul(doubling),
            ErrorKind::Throttled => base.saturating_mul(THROTTLE_FACTOR * doubling),
        };
        RetryDecision::RetryAfter(delay.min(self.max_delay()))
    }
}
