//! Caller-level retry and backoff.
//!
//! A failed download is retried as a whole: the engine itself never retries a
//! chunk. `classify` sorts a `DownloadError` into an `ErrorKind`, and
//! `RetryConfig::decide` turns the kind and attempt number into a delay.

mod backoff;
mod classify;
mod run;

pub use backoff::{ErrorKind, RetryDecision};
pub use classify::{classify, classify_http_status};
pub use run::run_with_retry;
