//! Instrumented driver shared by the crate's tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::driver::{CameraDriver, FrameBuffer};
use crate::configuration::types::CameraConfig;
use crate::error_handling::types::CameraError;

#[derive(Debug, Default)]
pub(crate) struct CameraProbe {
    acquired: AtomicU64,
    released: AtomicU64,
    outstanding: AtomicI64,
    max_outstanding: AtomicI64,
}

impl CameraProbe {
    pub(crate) fn acquired(&self) -> u64 {
        self.acquired.load(Ordering::SeqCst)
    }

    pub(crate) fn released(&self) -> u64 {
        self.released.load(Ordering::SeqCst)
    }

    pub(crate) fn outstanding(&self) -> i64 {
        self.outstanding.load(Ordering::SeqCst)
    }

    pub(crate) fn max_outstanding(&self) -> i64 {
        self.max_outstanding.load(Ordering::SeqCst)
    }
}

/// Hands out the same payload every time, unless a scripted error is queued.
pub(crate) struct ScriptedCamera {
    payload: Vec<u8>,
    script: VecDeque<Result<(), CameraError>>,
    probe: Arc<CameraProbe>,
    sequence: u64,
}

impl ScriptedCamera {
    pub(crate) fn new(payload: Vec<u8>) -> (Self, Arc<CameraProbe>) {
        let probe = Arc::new(CameraProbe::default());
        let camera = Self {
            payload,
            script: VecDeque::new(),
            probe: Arc::clone(&probe),
            sequence: 0,
        };
        (camera, probe)
    }

    /// Queues per-call outcomes; `Ok(())` means "deliver the payload".
    pub(crate) fn with_script(mut self, steps: Vec<Result<(), CameraError>>) -> Self {
        self.script = steps.into();
        self
    }
}

impl CameraDriver for ScriptedCamera {
    fn configure(&mut self, _config: &CameraConfig) -> Result<(), CameraError> {
        Ok(())
    }

    fn acquire(&mut self) -> Result<FrameBuffer, CameraError> {
        if let Some(Err(e)) = self.script.pop_front() {
            return Err(e);
        }
        self.sequence += 1;
        self.probe.acquired.fetch_add(1, Ordering::SeqCst);
        let now = self.probe.outstanding.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe.max_outstanding.fetch_max(now, Ordering::SeqCst);
        Ok(FrameBuffer::new(
            0,
            self.sequence,
            self.payload.clone(),
            Duration::from_millis(self.sequence),
        ))
    }

    fn release(&mut self, _frame: FrameBuffer) {
        self.probe.released.fetch_add(1, Ordering::SeqCst);
        self.probe.outstanding.fetch_sub(1, Ordering::SeqCst);
    }
}
