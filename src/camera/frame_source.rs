//! Scoped, mutually exclusive access to the camera.
//!
//! [`FrameSource`] is the only way the rest of the crate reaches a
//! [`CameraDriver`]. Every successful [`FrameSource::acquire`] returns a
//! [`FrameGuard`] that holds the driver lock for as long as the frame is alive
//! and hands the buffer back when dropped, so:
//! - at most one frame is outstanding at any time, whichever thread asked for it;
//! - a frame is released exactly once, on every exit path (return, `?`, panic).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, warn};

use super::driver::{CameraDriver, FrameBuffer};
use crate::configuration::types::CameraConfig;
use crate::error_handling::types::CameraError;

/// Acquisition counters. `acquired == released` whenever no guard is alive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameSourceStats {
    pub acquired: u64,
    pub released: u64,
    pub failed: u64,
}

impl FrameSourceStats {
    pub fn outstanding(&self) -> u64 {
        self.acquired.saturating_sub(self.released)
    }
}

#[derive(Debug, Default)]
struct Counters {
    acquired: AtomicU64,
    released: AtomicU64,
    failed: AtomicU64,
}

pub struct FrameSource {
    driver: Mutex<Box<dyn CameraDriver>>,
    counters: Counters,
}

impl FrameSource {
    /// Wraps an already configured driver.
    pub fn new(driver: Box<dyn CameraDriver>) -> Self {
        Self {
            driver: Mutex::new(driver),
            counters: Counters::default(),
        }
    }

    /// Configures `driver` and wraps it.
    pub fn with_config(
        mut driver: Box<dyn CameraDriver>,
        config: &CameraConfig,
    ) -> Result<Self, CameraError> {
        driver.configure(config)?;
        Ok(Self::new(driver))
    }

    /// Blocks until the driver hands out a frame.
    ///
    /// Callers on other threads wait here until the current guard is dropped.
    pub fn acquire(&self) -> Result<FrameGuard<'_>, CameraError> {
        let mut driver = self.lock_driver();
        match driver.acquire() {
            Ok(frame) => {
                self.counters.acquired.fetch_add(1, Ordering::SeqCst);
                debug!(
                    "Acquired frame #{} ({} bytes, slot {}, exposed at {:?})",
                    frame.sequence(),
                    frame.len(),
                    frame.slot(),
                    frame.captured_at()
                );
                Ok(FrameGuard {
                    driver,
                    frame: Some(frame),
                    released: &self.counters.released,
                })
            }
            Err(e) => {
                self.counters.failed.fetch_add(1, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    /// Snapshot of the counters, taken without the driver lock.
    pub fn stats(&self) -> FrameSourceStats {
        // A release is always counted after its acquire, so reading `released`
        // first keeps `released <= acquired` in the snapshot.
        let released = self.counters.released.load(Ordering::SeqCst);
        FrameSourceStats {
            acquired: self.counters.acquired.load(Ordering::SeqCst),
            released,
            failed: self.counters.failed.load(Ordering::SeqCst),
        }
    }

    // A panic while a guard is alive still runs the guard's Drop, so the
    // driver is consistent again by the time the poison is observed.
    fn lock_driver(&self) -> MutexGuard<'_, Box<dyn CameraDriver>> {
        self.driver.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
            warn!("Camera lock was poisoned by a panicking holder; recovering");
            poisoned.into_inner()
        })
    }
}

/// A frame on loan from the camera. Dropping it releases the frame.
pub struct FrameGuard<'a> {
    driver: MutexGuard<'a, Box<dyn CameraDriver>>,
    frame: Option<FrameBuffer>,
    released: &'a AtomicU64,
}

impl FrameGuard<'_> {
    pub fn data(&self) -> &[u8] {
        match &self.frame {
            Some(frame) => frame.data(),
            None => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.data().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data().is_empty()
    }

    pub fn sequence(&self) -> u64 {
        self.frame.as_ref().map_or(0, |frame| frame.sequence())
    }
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        if let Some(frame) = self.frame.take() {
            let sequence = frame.sequence();
            self.driver.release(frame);
            self.released.fetch_add(1, Ordering::SeqCst);
            debug!("Released frame #{}", sequence);
        }
    }
}
