use clap::ValueEnum;
use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 80;
pub const DEFAULT_STORAGE_ROOT: &str = "photos";
pub const DEFAULT_JPEG_QUALITY: u8 = 10;
pub const DEFAULT_FB_COUNT: usize = 2;
pub const DEFAULT_FPS: u32 = 15;
pub const DEFAULT_ACQUIRE_TIMEOUT_MS: u64 = 2_000;
pub const DEFAULT_PULL_BUFFER_SIZE: usize = 512 * 1024;
pub const DEFAULT_EMPTY_PULL_BACKOFF_MS: u64 = 20;

#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory standing in for the root of the removable card
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_STORAGE_ROOT),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CameraSource {
    Synthetic,
    Replay,
}

/// Sensor output resolutions, named after the OV2640 frame sizes.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameSize {
    Qqvga,
    Qvga,
    Cif,
    Vga,
    Svga,
    Xga,
    Sxga,
    Uxga,
    Qxga,
}

impl FrameSize {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            FrameSize::Qqvga => (160, 120),
            FrameSize::Qvga => (320, 240),
            FrameSize::Cif => (400, 296),
            FrameSize::Vga => (640, 480),
            FrameSize::Svga => (800, 600),
            FrameSize::Xga => (1024, 768),
            FrameSize::Sxga => (1280, 1024),
            FrameSize::Uxga => (1600, 1200),
            FrameSize::Qxga => (2048, 1536),
        }
    }
}

/// How the driver picks the frame handed to `acquire`.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrabMode {
    /// Always hand out the most recently completed exposure, discarding older ones.
    Latest,
    /// Hand out exposures in order, waiting for the next one when none is pending.
    WhenEmpty,
}

#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub source: CameraSource,
    /// Directory of `*.jpg` files, required by the replay source
    pub replay_dir: Option<PathBuf>,
    pub frame_size: FrameSize,
    /// 0-63, lower means higher quality
    pub jpeg_quality: u8,
    /// Number of frame buffers in the driver pool
    pub fb_count: usize,
    pub grab_mode: GrabMode,
    pub fps: u32,
    pub acquire_timeout_ms: u64,
    pub vflip: bool,
    pub hmirror: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            source: CameraSource::Synthetic,
            replay_dir: None,
            frame_size: FrameSize::Vga,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            fb_count: DEFAULT_FB_COUNT,
            grab_mode: GrabMode::Latest,
            fps: DEFAULT_FPS,
            acquire_timeout_ms: DEFAULT_ACQUIRE_TIMEOUT_MS,
            vflip: true,
            hmirror: true,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Capacity offered to the encoder on every pull. Must exceed the largest
    /// expected frame plus the part overhead, otherwise every pull comes back empty.
    pub pull_buffer_size: usize,
    /// Pause before the next pull after an empty one
    pub empty_pull_backoff_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            pull_buffer_size: DEFAULT_PULL_BUFFER_SIZE,
            empty_pull_backoff_ms: DEFAULT_EMPTY_PULL_BACKOFF_MS,
        }
    }
}
