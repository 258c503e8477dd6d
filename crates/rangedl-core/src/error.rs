//! Error taxonomy for a download run.
//!
//! `DownloadError` is what the engine surfaces to callers. `TransferFailure` is
//! the cause attached to a single chunk; `SizeError` covers size discovery.

use std::time::Duration;
use thiserror::Error;

/// Coarse class of a network-level failure, filled in by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    /// Connect or low-speed timeout.
    Timeout,
    /// Connection refused/reset, DNS failure, short read.
    Connection,
    Other,
}

/// Why a single chunk transfer failed.
#[derive(Debug, Error)]
pub enum TransferFailure {
    /// The request could not be issued at all.
    #[error("request setup: {0}")]
    Request(String),
    /// Final response status was outside the 2xx class.
    #[error("HTTP {0}")]
    Http(u32),
    /// Server answered with a 2xx status but not with the requested byte range.
    #[error("unexpected range response (HTTP {status}, Content-Range {content_range:?})")]
    BadRange {
        status: u32,
        content_range: Option<String>,
    },
    /// Server sent more bytes than the chunk's declared length.
    #[error("response overruns chunk: {received} bytes for a {expected}-byte range")]
    Overrun { expected: u64, received: u64 },
    /// Transfer ended cleanly but short of the declared length.
    #[error("partial transfer: expected {expected} bytes, got {received}")]
    PartialTransfer { expected: u64, received: u64 },
    /// Transport-level failure (connection reset, timeout, DNS, ...).
    #[error("network: {message}")]
    Network {
        kind: NetworkErrorKind,
        message: String,
    },
    /// Writing the received bytes to the output file failed.
    #[error("storage: {0}")]
    Storage(#[source] std::io::Error),
}

/// Size discovery failure.
#[derive(Debug, Error)]
pub enum SizeError {
    #[error("HEAD request failed: {0}")]
    Request(String),
    #[error("HEAD returned HTTP {0}")]
    Http(u32),
    #[error("response carries no usable Content-Length")]
    MissingLength,
}

/// Terminal error of a download run. An observer-requested abort is not an
/// error; see `RunOutcome::Aborted`.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Rejected before any network activity (zero chunk size, zero parallelism, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("size discovery failed: {0}")]
    Size(#[from] SizeError),
    #[error("chunk {index} failed: {cause}")]
    Transfer {
        index: usize,
        #[source]
        cause: TransferFailure,
    },
    /// Local file could not be opened, preallocated or closed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no network activity for {idle:?}")]
    Stalled { idle: Duration },
    /// The transport itself (not one chunk) failed, e.g. the multi handle.
    #[error("transport error: {0}")]
    Transport(String),
}

impl DownloadError {
    /// Index of the failed chunk, when the error belongs to one.
    pub fn chunk_index(&self) -> Option<usize> {
        match self {
            DownloadError::Transfer { index, .. } => Some(*index),
            _ => None,
        }
    }
}
