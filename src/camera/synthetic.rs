//! Test-pattern camera.
//!
//! Renders a gradient with a sweeping bar whose position follows the exposure
//! index, and encodes it as a baseline JPEG. It stands in for the sensor when
//! no hardware is attached and behaves like one: a finite buffer pool, paced
//! exposures, latest-frame delivery.

use std::io::Cursor;
use std::time::Duration;

use image::codecs::jpeg::JpegEncoder;
use image::{imageops, Rgb, RgbImage};
use log::{error, info, trace};

use super::driver::{CameraDriver, ExposureClock, FrameBuffer, FramePool};
use crate::configuration::types::CameraConfig;
use crate::error_handling::types::CameraError;

/// Highest (worst) value of the sensor's quality scale.
pub const MAX_SENSOR_QUALITY: u8 = 63;

#[derive(Debug)]
struct SensorSettings {
    width: u32,
    height: u32,
    encoder_quality: u8,
    vflip: bool,
    hmirror: bool,
    timeout: Duration,
}

#[derive(Debug, Default)]
pub struct SyntheticCamera {
    settings: Option<SensorSettings>,
    pool: FramePool,
    exposure: Option<ExposureClock>,
}

impl SyntheticCamera {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Maps the sensor scale (0 best .. 63 worst) onto the encoder scale (100 best .. 1 worst).
pub fn encoder_quality(sensor_quality: u8) -> u8 {
    let q = u32::from(sensor_quality.min(MAX_SENSOR_QUALITY));
    (100 - q * 99 / u32::from(MAX_SENSOR_QUALITY)) as u8
}

fn render(width: u32, height: u32, index: u64) -> RgbImage {
    let bar_width = (width / 16).max(1);
    let bar_x = ((index * 8) % u64::from(width)) as u32;
    let shade = (index % 256) as u8;
    RgbImage::from_fn(width, height, |x, y| {
        if x >= bar_x && x < bar_x + bar_width {
            return Rgb([255, 255, 255]);
        }
        let r = (x * 255 / width.max(1)) as u8;
        let g = (y * 255 / height.max(1)) as u8;
        Rgb([r, g, shade])
    })
}

impl CameraDriver for SyntheticCamera {
    fn configure(&mut self, config: &CameraConfig) -> Result<(), CameraError> {
        if config.fb_count == 0 {
            return Err(CameraError::InitFailed(
                "frame buffer count must be at least 1".to_string(),
            ));
        }
        if config.jpeg_quality > MAX_SENSOR_QUALITY {
            return Err(CameraError::InitFailed(format!(
                "jpeg quality {} is outside 0..={}",
                config.jpeg_quality, MAX_SENSOR_QUALITY
            )));
        }
        let (width, height) = config.frame_size.dimensions();
        self.settings = Some(SensorSettings {
            width,
            height,
            encoder_quality: encoder_quality(config.jpeg_quality),
            vflip: config.vflip,
            hmirror: config.hmirror,
            timeout: Duration::from_millis(config.acquire_timeout_ms),
        });
        self.pool = FramePool::new(config.fb_count);
        self.exposure = Some(ExposureClock::new(config.fps, config.grab_mode));
        info!(
            "Synthetic camera configured: {}x{}, quality {}, {} frame buffer(s), {} fps",
            width, height, config.jpeg_quality, config.fb_count, config.fps
        );
        Ok(())
    }

    fn acquire(&mut self) -> Result<FrameBuffer, CameraError> {
        let (Some(settings), Some(exposure)) = (self.settings.as_ref(), self.exposure.as_mut())
        else {
            return Err(CameraError::DriverFault(
                "synthetic camera used before configure".to_string(),
            ));
        };

        let shot = exposure
            .next_exposure(settings.timeout)
            .ok_or(CameraError::CaptureUnavailable)?;
        if shot.skipped > 0 {
            trace!("Discarded {} stale exposure(s)", shot.skipped);
        }

        let (slot, buffer) = self.pool.checkout().ok_or(CameraError::PoolExhausted)?;

        let mut image = render(settings.width, settings.height, shot.index);
        if settings.vflip {
            imageops::flip_vertical_in_place(&mut image);
        }
        if settings.hmirror {
            imageops::flip_horizontal_in_place(&mut image);
        }

        let mut cursor = Cursor::new(buffer);
        let encoded = JpegEncoder::new_with_quality(&mut cursor, settings.encoder_quality)
            .encode_image(&image);
        let buffer = cursor.into_inner();
        if let Err(e) = encoded {
            error!("Failed to encode synthetic frame #{}: {}", shot.index, e);
            self.pool.checkin(slot, buffer);
            return Err(CameraError::DriverFault(e.to_string()));
        }

        Ok(FrameBuffer::new(slot, shot.index, buffer, shot.completed_at))
    }

    fn release(&mut self, frame: FrameBuffer) {
        let slot = frame.slot();
        if !self.pool.checkin(slot, frame.into_data()) {
            error!("Frame buffer slot {} returned twice or never lent", slot);
        }
    }
}
