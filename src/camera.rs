//! Camera subsystem
//!
//! Components:
//! - `driver`: the peripheral contract (`CameraDriver`), frame buffers and pool, exposure pacing.
//! - `frame_source`: scoped, mutually exclusive acquisition on top of a driver.
//! - `synthetic`: a test-pattern sensor that encodes JPEG frames.
//! - `replay`: a sensor that replays JPEG files from a directory.

pub mod driver;
pub mod frame_source;
pub mod replay;
pub mod synthetic;

#[cfg(test)]
pub(crate) mod testing;

pub use driver::{CameraDriver, FrameBuffer};
pub use frame_source::{FrameGuard, FrameSource, FrameSourceStats};
pub use replay::ReplayCamera;
pub use synthetic::SyntheticCamera;

use crate::configuration::types::{CameraConfig, CameraSource};

/// Builds the (unconfigured) driver selected by `config.source`.
pub fn driver_for(config: &CameraConfig) -> Box<dyn CameraDriver> {
    match config.source {
        CameraSource::Synthetic => Box::new(SyntheticCamera::new()),
        CameraSource::Replay => Box::new(ReplayCamera::new()),
    }
}
