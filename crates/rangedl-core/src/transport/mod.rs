//! Transport seam between the scheduler and the HTTP client.
//!
//! A transport opens range requests and exposes one multiplexed wait
//! (`poll`) that delivers body bytes and terminal results for all open
//! requests through a single handler, on the caller's thread. The scheduler
//! never blocks anywhere else.

mod curl;

pub use self::curl::{CurlOptions, CurlTransport};

use std::time::Duration;

use crate::error::{DownloadError, TransferFailure};
use crate::planner::ChunkDescriptor;

/// One range request: bytes `[start, start + length)` for chunk `index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeRequest {
    pub index: usize,
    pub start: u64,
    pub length: u64,
}

impl From<&ChunkDescriptor> for RangeRequest {
    fn from(c: &ChunkDescriptor) -> Self {
        Self {
            index: c.index,
            start: c.start,
            length: c.length,
        }
    }
}

impl RangeRequest {
    /// libcurl range spec: `start-last`, inclusive, without the `bytes=` prefix.
    pub fn range_spec(&self) -> String {
        format!("{}-{}", self.start, self.start + self.length - 1)
    }
}

/// Something that happened to an open request during `poll`.
#[derive(Debug)]
pub enum TransportEvent<'a> {
    /// Next span of the body, in order, for chunk `index`.
    Data { index: usize, bytes: &'a [u8] },
    /// The request ended. No more events follow for `index`.
    Finished {
        index: usize,
        outcome: Result<(), TransferFailure>,
    },
}

/// Returned by event handlers: keep delivering, or stop this poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// HTTP range transport driven by a single control loop.
pub trait Transport {
    /// Issue the range request. Events for it arrive through later `poll` calls.
    /// A failure here belongs to the request's chunk.
    fn open(&mut self, request: &RangeRequest) -> Result<(), TransferFailure>;

    /// Wait at most `timeout` for activity on any open request, then deliver
    /// every available event to `handler`. Returns the number of events
    /// delivered. Once `handler` returns `Flow::Stop` no further events are
    /// delivered in this call; undelivered data stays with the transport.
    fn poll(
        &mut self,
        timeout: Duration,
        handler: &mut dyn FnMut(TransportEvent<'_>) -> Flow,
    ) -> Result<usize, DownloadError>;

    /// Best-effort cancellation of an open request. No events follow for it.
    fn cancel(&mut self, index: usize);
}
