//! Multipart part encoder for the MJPEG stream.
//!
//! One part on the wire:
//!
//! ```text
//! --frame\r\n
//! Content-Type: image/jpeg\r\n
//! Content-Length: <len, right-aligned in 10 columns>\r\n
//! \r\n
//! <payload>\r\n
//! ```
//!
//! The length field has a fixed width, so a part is always exactly
//! `payload.len() + PART_OVERHEAD` bytes and the encoder can decide up front
//! whether a part fits the space the transport offers. A part is written whole
//! or not at all.

use std::sync::Arc;

use log::{debug, warn};

use crate::camera::FrameSource;
use crate::error_handling::types::CameraError;

/// Content type of the stream response.
pub const STREAM_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

const PART_HEAD: &[u8] = b"--frame\r\nContent-Type: image/jpeg\r\nContent-Length: ";
const LENGTH_FIELD_WIDTH: usize = 10;
const HEADER_END: &[u8] = b"\r\n\r\n";
const PART_END: &[u8] = b"\r\n";

/// Bytes a part adds on top of its payload.
pub const PART_OVERHEAD: usize =
    PART_HEAD.len() + LENGTH_FIELD_WIDTH + HEADER_END.len() + PART_END.len();

/// Largest payload whose length fits the fixed-width length field.
pub const MAX_PAYLOAD_LEN: u64 = 9_999_999_999;

/// Space a part for a payload of `payload_len` bytes takes.
pub fn required_capacity(payload_len: usize) -> usize {
    payload_len.saturating_add(PART_OVERHEAD)
}

/// Writes one complete part for `payload` at the start of `out`.
///
/// Returns the number of bytes written, or `None` (with `out` untouched) when
/// the part does not fit.
pub fn encode_part(payload: &[u8], out: &mut [u8]) -> Option<usize> {
    let required = required_capacity(payload.len());
    if out.len() < required || payload.len() as u64 > MAX_PAYLOAD_LEN {
        return None;
    }

    let length_field = format!("{:>width$}", payload.len(), width = LENGTH_FIELD_WIDTH);
    let pieces: [&[u8]; 5] = [PART_HEAD, length_field.as_bytes(), HEADER_END, payload, PART_END];
    let mut at = 0;
    for piece in pieces {
        out[at..at + piece.len()].copy_from_slice(piece);
        at += piece.len();
    }
    debug_assert_eq!(at, required);
    Some(at)
}

/// Pull-side producer: each call grabs a fresh frame and offers it as one part.
///
/// Holds no stream state between calls.
#[derive(Clone)]
pub struct StreamEncoder {
    source: Arc<FrameSource>,
}

impl StreamEncoder {
    pub fn new(source: Arc<FrameSource>) -> Self {
        Self { source }
    }

    /// Fills `out` with one part and returns its length.
    ///
    /// `Ok(0)` means there is nothing to send this time: either the camera had
    /// no frame, or the frame does not fit `out`. Only failures after which the
    /// camera will never produce again are returned as errors. The frame is back
    /// in the driver pool by the time this returns, whatever the outcome.
    pub fn pull(&self, out: &mut [u8]) -> Result<usize, CameraError> {
        let frame = match self.source.acquire() {
            Ok(frame) => frame,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Camera capture failed: {}", e);
                return Ok(0);
            }
        };

        match encode_part(frame.data(), out) {
            Some(written) => Ok(written),
            None => {
                debug!(
                    "Frame #{} needs {} bytes but the pull offered {}; skipping",
                    frame.sequence(),
                    required_capacity(frame.len()),
                    out.len()
                );
                Ok(0)
            }
        }
    }
}
