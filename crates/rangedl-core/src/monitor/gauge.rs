use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Number of range requests currently open, shared with whoever draws progress.
///
/// The scheduler stores into it from the control loop; clones read it from
/// anywhere, typically from inside a progress observer.
#[derive(Debug, Clone, Default)]
pub struct StreamGauge(Arc<AtomicUsize>);

impl StreamGauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }

    pub(crate) fn set(&self, n: usize) {
        self.0.store(n, Ordering::Relaxed);
    }
}
