//! Camera peripheral driver contract.
//!
//! A driver owns a finite pool of frame buffers. `acquire` lends one buffer out,
//! `release` takes it back. Nothing here stops a caller from leaking a buffer or
//! calling into the driver from two threads at once; that discipline lives in
//! [`FrameSource`](super::frame_source::FrameSource).

use std::time::{Duration, Instant};

use crate::configuration::types::{CameraConfig, GrabMode};
use crate::error_handling::types::CameraError;

/// One captured JPEG payload lent out by a driver.
///
/// Deliberately not `Clone`: a buffer has exactly one owner until it is handed
/// back through [`CameraDriver::release`].
#[derive(Debug)]
pub struct FrameBuffer {
    slot: usize,
    sequence: u64,
    data: Vec<u8>,
    captured_at: Duration,
}

impl FrameBuffer {
    pub fn new(slot: usize, sequence: u64, data: Vec<u8>, captured_at: Duration) -> Self {
        Self {
            slot,
            sequence,
            data,
            captured_at,
        }
    }

    /// Pool slot the buffer belongs to.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Exposure index assigned by the driver.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Time since the driver was configured at which the exposure completed.
    pub fn captured_at(&self) -> Duration {
        self.captured_at
    }

    /// Gives the backing allocation back, so a pool can reuse it.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// The camera peripheral as seen by the core.
pub trait CameraDriver: Send {
    /// Applies sensor and pool settings. Must be called before the first `acquire`.
    fn configure(&mut self, config: &CameraConfig) -> Result<(), CameraError>;

    /// Blocks until a frame is ready or the driver's own timeout elapses.
    fn acquire(&mut self) -> Result<FrameBuffer, CameraError>;

    /// Returns a buffer obtained from `acquire` to the pool.
    fn release(&mut self, frame: FrameBuffer);
}

/// Fixed set of reusable frame allocations.
#[derive(Debug, Default)]
pub struct FramePool {
    slots: Vec<Option<Vec<u8>>>,
}

impl FramePool {
    pub fn new(count: usize) -> Self {
        Self {
            slots: (0..count).map(|_| Some(Vec::new())).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn outstanding(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_none()).count()
    }

    /// Lends the first free slot, with its allocation cleared.
    pub fn checkout(&mut self) -> Option<(usize, Vec<u8>)> {
        let index = self.slots.iter().position(|slot| slot.is_some())?;
        let mut buffer = self.slots[index].take()?;
        buffer.clear();
        Some((index, buffer))
    }

    /// Puts a slot back. Returns `false` when the slot was not lent out.
    pub fn checkin(&mut self, slot: usize, buffer: Vec<u8>) -> bool {
        match self.slots.get_mut(slot) {
            Some(entry) if entry.is_none() => {
                *entry = Some(buffer);
                true
            }
            _ => false,
        }
    }
}

/// A completed exposure picked by [`ExposureClock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exposure {
    pub index: u64,
    /// Completed exposures passed over to reach this one
    pub skipped: u64,
    pub completed_at: Duration,
}

/// Simulated sensor timing: exposure `k` completes at `(k + 1) * interval`
/// after the clock starts.
#[derive(Debug)]
pub struct ExposureClock {
    started: Instant,
    interval: Duration,
    mode: GrabMode,
    last_delivered: Option<u64>,
    // Exposures completed when the last one was delivered.
    completed_at_delivery: u64,
}

impl ExposureClock {
    pub fn new(fps: u32, mode: GrabMode) -> Self {
        let interval = Duration::from_micros(1_000_000 / u64::from(fps.max(1)));
        Self {
            started: Instant::now(),
            interval,
            mode,
            last_delivered: None,
            completed_at_delivery: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Index to deliver given how many exposures have completed so far, or
    /// `None` when nothing newer than the last delivered one exists yet.
    ///
    /// `WhenEmpty` buffers a single exposure: the first one completed while
    /// the buffer was empty is kept, everything after it is dropped until the
    /// buffer is taken. `Latest` always overwrites with the newest exposure.
    pub fn select(&self, completed: u64) -> Option<u64> {
        let next = self.next_candidate();
        if completed <= next {
            return None;
        }
        match self.mode {
            GrabMode::Latest => Some(completed - 1),
            GrabMode::WhenEmpty => Some(next),
        }
    }

    fn next_candidate(&self) -> u64 {
        let after_last = self.last_delivered.map_or(0, |last| last + 1);
        match self.mode {
            GrabMode::Latest => after_last,
            GrabMode::WhenEmpty => after_last.max(self.completed_at_delivery),
        }
    }

    fn mark_delivered(&mut self, index: u64, completed: u64) {
        self.last_delivered = Some(index);
        self.completed_at_delivery = completed;
    }

    /// Waits for the next deliverable exposure, giving up after `timeout`.
    pub fn next_exposure(&mut self, timeout: Duration) -> Option<Exposure> {
        let deadline = Instant::now() + timeout;
        loop {
            let elapsed = self.started.elapsed();
            let completed = self.completed_by(elapsed);
            if let Some(index) = self.select(completed) {
                let expected = self.last_delivered.map_or(0, |last| last + 1);
                self.mark_delivered(index, completed);
                return Some(Exposure {
                    index,
                    skipped: index - expected,
                    completed_at: self.completion_time(index),
                });
            }

            let ready_at = self.started + self.completion_time(self.next_candidate());
            let now = Instant::now();
            if ready_at > deadline {
                if now < deadline {
                    std::thread::sleep(deadline - now);
                }
                return None;
            }
            if ready_at > now {
                std::thread::sleep(ready_at - now);
            }
        }
    }

    fn completion_time(&self, index: u64) -> Duration {
        let count = u32::try_from(index + 1).unwrap_or(u32::MAX);
        self.interval.saturating_mul(count)
    }

    fn completed_by(&self, elapsed: Duration) -> u64 {
        let interval = self.interval.as_nanos().max(1);
        (elapsed.as_nanos() / interval) as u64
    }
}
