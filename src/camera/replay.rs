//! Directory replay camera.
//!
//! Loads every `*.jpg`/`*.jpeg` file of a directory at configure time and plays
//! them back in name order, looping, at the configured frame rate. Frames that
//! complete while nobody is acquiring are skipped, as on the real sensor.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{error, info, trace};

use super::driver::{CameraDriver, ExposureClock, FrameBuffer, FramePool};
use crate::configuration::types::CameraConfig;
use crate::error_handling::types::CameraError;

#[derive(Debug, Default)]
pub struct ReplayCamera {
    frames: Vec<Vec<u8>>,
    pool: FramePool,
    exposure: Option<ExposureClock>,
    timeout: Duration,
}

impl ReplayCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
        .unwrap_or(false)
}

fn load_frames(dir: &Path) -> Result<Vec<Vec<u8>>, CameraError> {
    let entries = fs::read_dir(dir).map_err(|e| {
        error!("Failed to read replay directory {}: {}", dir.display(), e);
        CameraError::InitFailed(format!("cannot read {}: {}", dir.display(), e))
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.is_file() && is_jpeg(path))
        .collect();
    paths.sort();

    let mut frames = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = fs::read(&path).map_err(|e| {
            error!("Failed to read replay frame {}: {}", path.display(), e);
            CameraError::InitFailed(format!("cannot read {}: {}", path.display(), e))
        })?;
        frames.push(bytes);
    }
    Ok(frames)
}

impl CameraDriver for ReplayCamera {
    fn configure(&mut self, config: &CameraConfig) -> Result<(), CameraError> {
        let dir = config.replay_dir.as_ref().ok_or_else(|| {
            CameraError::InitFailed("replay camera needs a replay directory".to_string())
        })?;
        if config.fb_count == 0 {
            return Err(CameraError::InitFailed(
                "frame buffer count must be at least 1".to_string(),
            ));
        }

        let frames = load_frames(dir)?;
        if frames.is_empty() {
            return Err(CameraError::InitFailed(format!(
                "no JPEG files in {}",
                dir.display()
            )));
        }

        info!(
            "Replay camera configured: {} frame(s) from {} at {} fps",
            frames.len(),
            dir.display(),
            config.fps
        );
        self.frames = frames;
        self.pool = FramePool::new(config.fb_count);
        self.exposure = Some(ExposureClock::new(config.fps, config.grab_mode));
        self.timeout = Duration::from_millis(config.acquire_timeout_ms);
        Ok(())
    }

    fn acquire(&mut self) -> Result<FrameBuffer, CameraError> {
        let exposure = self.exposure.as_mut().ok_or_else(|| {
            CameraError::DriverFault("replay camera used before configure".to_string())
        })?;
        let shot = exposure
            .next_exposure(self.timeout)
            .ok_or(CameraError::CaptureUnavailable)?;
        if shot.skipped > 0 {
            trace!("Discarded {} stale exposure(s)", shot.skipped);
        }

        let (slot, mut buffer) = self.pool.checkout().ok_or(CameraError::PoolExhausted)?;
        let source = &self.frames[(shot.index % self.frames.len() as u64) as usize];
        buffer.extend_from_slice(source);
        Ok(FrameBuffer::new(slot, shot.index, buffer, shot.completed_at))
    }

    fn release(&mut self, frame: FrameBuffer) {
        let slot = frame.slot();
        if !self.pool.checkin(slot, frame.into_data()) {
            error!("Frame buffer slot {} returned twice or never lent", slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::types::{CameraSource, GrabMode};
    use tempfile::TempDir;

    fn replay_config(dir: &Path) -> CameraConfig {
        CameraConfig {
            source: CameraSource::Replay,
            replay_dir: Some(dir.to_path_buf()),
            fps: 1_000,
            grab_mode: GrabMode::WhenEmpty,
            ..CameraConfig::default()
        }
    }

    #[test]
    fn replays_files_in_name_order() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.jpg"), b"second").unwrap();
        fs::write(dir.path().join("a.JPG"), b"first").unwrap();
        fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let mut camera = ReplayCamera::new();
        camera.configure(&replay_config(dir.path())).unwrap();
        assert_eq!(camera.frame_count(), 2);

        let expected: [&[u8]; 2] = [b"first", b"second"];
        let mut last_sequence = None;
        for _ in 0..4 {
            let frame = camera.acquire().unwrap();
            assert_eq!(frame.data(), expected[(frame.sequence() % 2) as usize]);
            assert!(last_sequence < Some(frame.sequence()));
            last_sequence = Some(frame.sequence());
            camera.release(frame);
        }
    }

    #[test]
    fn empty_directory_fails_to_configure() {
        let dir = TempDir::new().unwrap();
        let mut camera = ReplayCamera::new();
        assert!(matches!(
            camera.configure(&replay_config(dir.path())),
            Err(CameraError::InitFailed(_))
        ));
    }

    #[test]
    fn missing_directory_fails_to_configure() {
        let dir = TempDir::new().unwrap();
        let mut camera = ReplayCamera::new();
        let config = replay_config(&dir.path().join("absent"));
        assert!(matches!(
            camera.configure(&config),
            Err(CameraError::InitFailed(_))
        ));
    }

    #[test]
    fn requires_a_directory() {
        let mut camera = ReplayCamera::new();
        assert!(matches!(
            camera.configure(&CameraConfig::default()),
            Err(CameraError::InitFailed(_))
        ));
    }
}
