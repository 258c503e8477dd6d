//! Cooperative stop requests from outside the control loop.
//!
//! A `StopFlag` is shared with e.g. a Ctrl-C handler; wrapping the progress
//! observer with it turns a pending request into `Flow::Stop` at the next
//! progress notification.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::monitor::ProgressObserver;
use crate::transport::Flow;

/// Shared, set-once stop request.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Observer that forwards to `inner` and stops once the flag is set.
    pub fn guard<O: ProgressObserver>(&self, inner: O) -> StopOnRequest<O> {
        StopOnRequest {
            flag: self.clone(),
            inner,
        }
    }
}

/// See [`StopFlag::guard`].
pub struct StopOnRequest<O> {
    flag: StopFlag,
    inner: O,
}

impl<O: ProgressObserver> ProgressObserver for StopOnRequest<O> {
    fn on_progress(&mut self, done_bytes: u64, total_bytes: u64) -> Flow {
        let flow = self.inner.on_progress(done_bytes, total_bytes);
        if self.flag.is_requested() {
            return Flow::Stop;
        }
        flow
    }
}
