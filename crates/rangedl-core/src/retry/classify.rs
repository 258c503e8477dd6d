use super::backoff::ErrorKind;
use crate::error::{DownloadError, NetworkErrorKind, SizeError, TransferFailure};

/// Classify an HTTP status code for retry decisions.
pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        429 | 503 => ErrorKind::Throttled,
        500..=599 => ErrorKind::ServerError,
        _ => ErrorKind::Other,
    }
}

fn classify_network(kind: NetworkErrorKind) -> ErrorKind {
    match kind {
        NetworkErrorKind::Timeout | NetworkErrorKind::Connection => ErrorKind::Network,
        NetworkErrorKind::Other => ErrorKind::Other,
    }
}

fn classify_transfer(cause: &TransferFailure) -> ErrorKind {
    match cause {
        TransferFailure::Http(code) => classify_http_status(*code),
        TransferFailure::Network { kind, .. } => classify_network(*kind),
        // Server closed early; worth another attempt.
        TransferFailure::PartialTransfer { .. } => ErrorKind::Network,
        TransferFailure::Request(_)
        | TransferFailure::BadRange { .. }
        | TransferFailure::Overrun { .. }
        | TransferFailure::Storage(_) => ErrorKind::Other,
    }
}

/// Classify a failed download. Input, local I/O and protocol violations are never retried.
pub fn classify(e: &DownloadError) -> ErrorKind {
    match e {
        DownloadError::Transfer { cause, .. } => classify_transfer(cause),
        DownloadError::Stalled { .. } => ErrorKind::Stalled,
        DownloadError::Size(SizeError::Http(code)) => classify_http_status(*code),
        DownloadError::Size(SizeError::Request(_)) => ErrorKind::Network,
        DownloadError::Size(SizeError::MissingLength)
        | DownloadError::InvalidInput(_)
        | DownloadError::Io(_)
        | DownloadError::Transport(_) => ErrorKind::Other,
    }
}
