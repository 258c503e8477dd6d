//! Scripted in-memory transport serving slices of a byte buffer.
//!
//! Each `poll` advances every open transfer by at most `step` bytes, in
//! admission order, and finishes transfers that reached their length. Knobs
//! make individual chunks fail to open, fail, stop short or overrun, or make
//! the whole transport go silent.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use rangedl_core::error::{DownloadError, TransferFailure};
use rangedl_core::transport::{Flow, RangeRequest, Transport, TransportEvent};

/// Shared record of what happened, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Opened(usize),
    Finished(usize),
    Cancelled(usize),
    /// Pushed by test observers.
    Note(&'static str),
}

pub type Journal = Rc<RefCell<Vec<Entry>>>;

struct Open {
    request: RangeRequest,
    sent: u64,
}

pub struct MemoryTransport {
    source: Vec<u8>,
    step: usize,
    open: Vec<Open>,
    pub journal: Journal,
    pub peak_in_flight: usize,
    /// Refuse to open this chunk.
    pub refuse_index: Option<usize>,
    /// Finish this chunk with HTTP 500 on its first poll.
    pub fail_index: Option<usize>,
    /// Finish this chunk successfully after half of its bytes.
    pub short_index: Option<usize>,
    /// Send one byte past this chunk's end before finishing it.
    pub overrun_index: Option<usize>,
    /// Never deliver anything; each poll just waits out its timeout.
    pub silent: bool,
}

impl MemoryTransport {
    pub fn new(source: Vec<u8>, step: usize) -> Self {
        Self {
            source,
            step,
            open: Vec::new(),
            journal: Rc::new(RefCell::new(Vec::new())),
            peak_in_flight: 0,
            refuse_index: None,
            fail_index: None,
            short_index: None,
            overrun_index: None,
            silent: false,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.open.len()
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.journal.borrow().clone()
    }

    pub fn opened(&self) -> Vec<usize> {
        self.entries()
            .into_iter()
            .filter_map(|e| match e {
                Entry::Opened(i) => Some(i),
                _ => None,
            })
            .collect()
    }

    pub fn cancelled(&self) -> Vec<usize> {
        let mut v: Vec<usize> = self
            .entries()
            .into_iter()
            .filter_map(|e| match e {
                Entry::Cancelled(i) => Some(i),
                _ => None,
            })
            .collect();
        v.sort_unstable();
        v
    }

    fn finish(
        &mut self,
        pos: usize,
        outcome: Result<(), TransferFailure>,
        handler: &mut dyn FnMut(TransportEvent<'_>) -> Flow,
    ) -> Flow {
        let t = self.open.remove(pos);
        let index = t.request.index;
        self.journal.borrow_mut().push(Entry::Finished(index));
        handler(TransportEvent::Finished { index, outcome })
    }
}

impl Transport for MemoryTransport {
    fn open(&mut self, request: &RangeRequest) -> Result<(), TransferFailure> {
        if self.refuse_index == Some(request.index) {
            return Err(TransferFailure::Request("refused".into()));
        }
        self.open.push(Open {
            request: *request,
            sent: 0,
        });
        self.peak_in_flight = self.peak_in_flight.max(self.open.len());
        self.journal.borrow_mut().push(Entry::Opened(request.index));
        Ok(())
    }

    fn poll(
        &mut self,
        timeout: Duration,
        handler: &mut dyn FnMut(TransportEvent<'_>) -> Flow,
    ) -> Result<usize, DownloadError> {
        if self.silent || self.open.is_empty() {
            std::thread::sleep(timeout);
            return Ok(0);
        }

        let mut delivered = 0usize;
        let mut pos = 0usize;
        while pos < self.open.len() {
            let index = self.open[pos].request.index;
            if self.fail_index == Some(index) {
                delivered += 1;
                if self.finish(pos, Err(TransferFailure::Http(500)), handler) == Flow::Stop {
                    return Ok(delivered);
                }
                continue;
            }

            let t = &mut self.open[pos];
            let target = if self.short_index == Some(index) {
                t.request.length / 2
            } else {
                t.request.length
            };
            let n = (self.step as u64).min(target - t.sent);
            if n > 0 {
                let from = (t.request.start + t.sent) as usize;
                t.sent += n;
                let bytes = &self.source[from..from + n as usize];
                delivered += 1;
                if handler(TransportEvent::Data { index, bytes }) == Flow::Stop {
                    return Ok(delivered);
                }
            }

            if self.open[pos].sent == target {
                if self.overrun_index == Some(index) {
                    delivered += 1;
                    if handler(TransportEvent::Data { index, bytes: &[0xAA] }) == Flow::Stop {
                        return Ok(delivered);
                    }
                }
                delivered += 1;
                if self.finish(pos, Ok(()), handler) == Flow::Stop {
                    return Ok(delivered);
                }
            } else {
                pos += 1;
            }
        }
        Ok(delivered)
    }

    fn cancel(&mut self, index: usize) {
        if let Some(pos) = self.open.iter().position(|t| t.request.index == index) {
            self.open.remove(pos);
            self.journal.borrow_mut().push(Entry::Cancelled(index));
        }
    }
}
