use super::backoff::RetryDecision;
use super::classify;
use crate::config::RetryConfig;
use crate::error::DownloadError;

/// Calls `f(attempt)` until it succeeds or `retry` gives up, sleeping between attempts.
pub fn run_with_retry<T, F>(retry: &RetryConfig, mut f: F) -> Result<T, DownloadError>
where
    F: FnMut(u32) -> Result<T, DownloadError>,
{
    let mut attempt = 1u32;
    loop {
        match f(attempt) {
            Ok(v) => return Ok(v),
            Err(e) => {
                let kind = classify::classify(&e);
                match retry.decide(attempt, kind) {
                    RetryDecision::NoRetry => return Err(e),
                    RetryDecision::RetryAfter(d) => {
                        tracing::warn!(attempt, ?kind, delay = ?d, "download failed, retrying: {}", e);
                        std::thread::sleep(d);
                        attempt += 1;
                    }
                }
            }
        }
    }
}
