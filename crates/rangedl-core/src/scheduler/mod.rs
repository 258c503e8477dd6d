//! Transfer scheduler.
//!
//! Admits chunks in plan order up to the parallelism bound, drives them through
//! one multiplexed transport wait, writes delivered bytes through the sink and
//! reaps completions. The first failed chunk fails the whole run; an observer
//! stop ends it with a partial result.

mod state;

use std::collections::VecDeque;
use std::time::Instant;

use crate::error::DownloadError;
use crate::monitor::Monitor;
use crate::planner::ChunkDescriptor;
use crate::sink::OutputSink;
use crate::transport::{Flow, RangeRequest, Transport, TransportEvent};

use state::TransferState;

/// How a run that did not fail ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every chunk was transferred; carries the total bytes written.
    Completed(u64),
    /// The progress observer asked to stop; carries the bytes written so far.
    Aborted(u64),
}

impl RunOutcome {
    pub fn done_bytes(&self) -> u64 {
        match *self {
            RunOutcome::Completed(n) | RunOutcome::Aborted(n) => n,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, RunOutcome::Aborted(_))
    }
}

/// Download every chunk of `plan` with at most `max_parallel` transfers in flight.
///
/// All in-flight transfers are cancelled before returning, whatever the outcome.
pub fn run<T>(
    plan: &[ChunkDescriptor],
    max_parallel: usize,
    transport: &mut T,
    sink: &mut OutputSink,
    monitor: &mut Monitor<'_>,
) -> Result<RunOutcome, DownloadError>
where
    T: Transport + ?Sized,
{
    let effective = max_parallel.min(plan.len());
    if effective == 0 {
        return Ok(RunOutcome::Completed(0));
    }

    let slots = plan.iter().map(|c| c.index + 1).max().unwrap_or(0);
    let mut arena: Vec<Option<TransferState>> = std::iter::repeat_with(|| None).take(slots).collect();

    let result = drive(plan, effective, &mut arena, transport, sink, monitor);

    let mut cancelled = 0usize;
    for state in arena.iter_mut().filter_map(Option::take) {
        transport.cancel(state.descriptor.index);
        cancelled += 1;
    }
    if cancelled > 0 {
        tracing::debug!(cancelled, "cancelled in-flight transfers");
    }
    monitor.set_in_flight(0);
    result
}

fn drive<T>(
    plan: &[ChunkDescriptor],
    effective: usize,
    arena: &mut [Option<TransferState>],
    transport: &mut T,
    sink: &mut OutputSink,
    monitor: &mut Monitor<'_>,
) -> Result<RunOutcome, DownloadError>
where
    T: Transport + ?Sized,
{
    let mut pending: VecDeque<&ChunkDescriptor> = plan.iter().collect();
    let mut in_flight = 0usize;
    monitor.start(Instant::now());

    while (!pending.is_empty() || in_flight > 0) && !monitor.is_aborted() {
        while in_flight < effective {
            let Some(chunk) = pending.pop_front() else {
                break;
            };
            transport
                .open(&RangeRequest::from(chunk))
                .map_err(|cause| DownloadError::Transfer {
                    index: chunk.index,
                    cause,
                })?;
            arena[chunk.index] = Some(TransferState::new(*chunk));
            in_flight += 1;
            tracing::trace!(index = chunk.index, start = chunk.start, length = chunk.length, "admitted chunk");
        }
        monitor.set_in_flight(in_flight);

        let mut failure: Option<DownloadError> = None;
        transport.poll(monitor.poll_interval(), &mut |event| match event {
            TransportEvent::Data { index, bytes } => {
                // Late data for a slot that is already gone is dropped.
                let Some(state) = arena.get_mut(index).and_then(Option::as_mut) else {
                    return Flow::Continue;
                };
                match state.accept(bytes, sink) {
                    Ok(n) => monitor.record(n, Instant::now()),
                    Err(cause) => {
                        failure = Some(DownloadError::Transfer { index, cause });
                        Flow::Stop
                    }
                }
            }
            TransportEvent::Finished { index, outcome } => {
                let Some(state) = arena.get_mut(index).and_then(Option::take) else {
                    return Flow::Continue;
                };
                in_flight -= 1;
                monitor.set_in_flight(in_flight);
                monitor.touch(Instant::now());
                match outcome.and_then(|()| state.finish()) {
                    Ok(()) => {
                        tracing::trace!(index, bytes = state.bytes_written(), "chunk complete");
                        Flow::Continue
                    }
                    Err(cause) => {
                        failure = Some(DownloadError::Transfer { index, cause });
                        Flow::Stop
                    }
                }
            }
        })?;

        if let Some(e) = failure {
            return Err(e);
        }
        if !pending.is_empty() || in_flight > 0 {
            monitor.check_stall(Instant::now())?;
        }
    }

    let done = monitor.done_bytes();
    if monitor.is_aborted() {
        tracing::info!(done, pending = pending.len(), in_flight, "run aborted by observer");
        Ok(RunOutcome::Aborted(done))
    } else {
        Ok(RunOutcome::Completed(done))
    }
}
