//! Per-connection stream state.

use std::time::Instant;

use log::{info, trace, warn};
use uuid::Uuid;

use super::encoder::StreamEncoder;
use crate::error_handling::types::CameraError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingPull,
    Emitting,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    /// A complete part of this many bytes is at the front of the buffer.
    Part(usize),
    /// Nothing to send this time; pull again later.
    Empty,
    /// The session is over; no more pulls will produce data.
    Closed,
}

/// One viewer of the MJPEG stream.
///
/// The session owns no frame between pulls; every part is produced from a
/// freshly acquired frame.
pub struct StreamSession {
    id: Uuid,
    encoder: StreamEncoder,
    state: SessionState,
    parts_sent: u64,
    bytes_sent: u64,
    empty_pulls: u64,
    opened_at: Instant,
}

impl StreamSession {
    pub fn new(encoder: StreamEncoder) -> Self {
        let id = Uuid::new_v4();
        info!("Stream session {} opened", id);
        Self {
            id,
            encoder,
            state: SessionState::AwaitingPull,
            parts_sent: 0,
            bytes_sent: 0,
            empty_pulls: 0,
            opened_at: Instant::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn parts_sent(&self) -> u64 {
        self.parts_sent
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    pub fn pull(&mut self, out: &mut [u8]) -> PullOutcome {
        if self.state == SessionState::Closed {
            return PullOutcome::Closed;
        }

        self.state = SessionState::Emitting;
        let outcome = match self.encoder.pull(out) {
            Ok(0) => {
                self.empty_pulls += 1;
                PullOutcome::Empty
            }
            Ok(written) => {
                self.parts_sent += 1;
                self.bytes_sent += written as u64;
                trace!("[{}] sent part of {} bytes", self.id, written);
                PullOutcome::Part(written)
            }
            Err(e) => {
                self.fail(&e);
                return PullOutcome::Closed;
            }
        };
        self.state = SessionState::AwaitingPull;
        outcome
    }

    pub fn close(&mut self) {
        if self.state != SessionState::Closed {
            self.state = SessionState::Closed;
            info!(
                "Stream session {} closed after {} part(s), {} bytes, {} empty pull(s) in {:.1}s",
                self.id,
                self.parts_sent,
                self.bytes_sent,
                self.empty_pulls,
                self.opened_at.elapsed().as_secs_f32()
            );
        }
    }

    fn fail(&mut self, error: &CameraError) {
        warn!("Stream session {} ending: {}", self.id, error);
        self.close();
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.close();
    }
}
