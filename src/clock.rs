//! Uptime sources used to name captured assets.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Monotonically non-decreasing millisecond counter since some fixed start.
pub trait UptimeClock: Send + Sync {
    fn uptime_millis(&self) -> u64;
}

/// Milliseconds since the clock was created.
#[derive(Debug)]
pub struct MonotonicUptime {
    started: Instant,
}

impl MonotonicUptime {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for MonotonicUptime {
    fn default() -> Self {
        Self::new()
    }
}

impl UptimeClock for MonotonicUptime {
    fn uptime_millis(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualUptime {
    millis: AtomicU64,
}

impl ManualUptime {
    pub fn new(millis: u64) -> Self {
        Self {
            millis: AtomicU64::new(millis),
        }
    }

    /// Moves the clock to `millis`; going backwards is ignored.
    pub fn set(&self, millis: u64) {
        self.millis.fetch_max(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: u64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl UptimeClock for ManualUptime {
    fn uptime_millis(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}
