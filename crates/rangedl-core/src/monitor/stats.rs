//! Rate and ETA derived from progress notifications (CLI display).

use std::time::Duration;

/// Snapshot of download progress.
#[derive(Debug, Clone)]
pub struct ProgressStats {
    /// Bytes written so far.
    pub bytes_done: u64,
    /// Total file size in bytes.
    pub total_bytes: u64,
    /// Time since the download started.
    pub elapsed: Duration,
    /// Range requests open at the time of the snapshot.
    pub streams: usize,
}

impl ProgressStats {
    /// Average download rate in bytes per second (0 if no time has elapsed).
    pub fn bytes_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.bytes_done as f64 / secs
    }

    /// Estimated seconds remaining (None if the rate is still 0).
    pub fn eta_secs(&self) -> Option<f64> {
        let remaining = self.total_bytes.saturating_sub(self.bytes_done);
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.bytes_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(remaining as f64 / rate)
    }

    /// Fraction complete in [0.0, 1.0].
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 1.0;
        }
        (self.bytes_done as f64 / self.total_bytes as f64).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_eta_fraction() {
        let s = ProgressStats {
            bytes_done: 500,
            total_bytes: 1000,
            elapsed: Duration::from_secs(5),
            streams: 4,
        };
        assert_eq!(s.bytes_per_sec(), 100.0);
        assert_eq!(s.eta_secs(), Some(5.0));
        assert_eq!(s.fraction(), 0.5);
    }

    #[test]
    fn no_elapsed_time_has_no_eta() {
        let s = ProgressStats {
            bytes_done: 0,
            total_bytes: 1000,
            elapsed: Duration::ZERO,
            streams: 0,
        };
        assert_eq!(s.bytes_per_sec(), 0.0);
        assert_eq!(s.eta_secs(), None);
    }
}
