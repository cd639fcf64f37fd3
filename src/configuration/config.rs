use super::types::*;
use crate::error_handling::types::ConfigError;
use crate::streaming::PART_OVERHEAD;
use clap::Parser;
use log::{info, warn};
use serde::Deserialize;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

/// Environment variable overriding the storage root.
pub const STORAGE_DIR_ENV: &str = "CAMSERVE_STORAGE_DIR";

/// Application configuration.
///
/// Loaded from an optional TOML file where every section and key may be
/// omitted, then overridden by the environment and finally by command-line
/// flags.
///
/// ```toml
/// [server]
/// bind_address = "0.0.0.0"
/// port = 8080
///
/// [storage]
/// root = "/var/lib/camserve/photos"
///
/// [camera]
/// source = "replay"
/// replay_dir = "/var/lib/camserve/frames"
/// frame_size = "svga"
/// jpeg_quality = 12
///
/// [stream]
/// pull_buffer_size = 262144
/// ```
#[derive(Debug, PartialEq, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub camera: CameraConfig,
    pub stream: StreamConfig,
}

/// Command-line interface.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "camserve")]
#[command(version)]
#[command(about = "Live MJPEG camera server with snapshot storage")]
pub struct CliArgs {
    /// TOML configuration file
    pub config_file: Option<PathBuf>,

    /// Address to bind the HTTP server to
    #[arg(long)]
    pub bind_address: Option<String>,

    /// Port to bind the HTTP server to
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where captured photos are stored
    #[arg(long)]
    pub storage_path: Option<PathBuf>,

    /// Frame producer
    #[arg(long, value_enum)]
    pub camera_source: Option<CameraSource>,

    /// Directory of JPEG files for the replay camera
    #[arg(long)]
    pub replay_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Config, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Config, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::TomlError(e.to_string()))
    }

    /// File (or defaults), then environment, then flags; validated.
    pub fn load(args: &CliArgs) -> Result<Config, ConfigError> {
        let mut config = match &args.config_file {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                Self::from_file(path)?
            }
            None => {
                info!("No configuration file given, using defaults");
                Config::default()
            }
        };
        config.apply_env();
        config.apply_overrides(args);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var(STORAGE_DIR_ENV) {
            if dir.is_empty() {
                warn!("{} is set but empty, ignoring", STORAGE_DIR_ENV);
            } else {
                info!("Using storage root from {}: {}", STORAGE_DIR_ENV, dir);
                self.storage.root = PathBuf::from(dir);
            }
        }
    }

    pub fn apply_overrides(&mut self, args: &CliArgs) {
        if let Some(bind_address) = &args.bind_address {
            self.server.bind_address = bind_address.clone();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if let Some(storage_path) = &args.storage_path {
            self.storage.root = storage_path.clone();
        }
        if let Some(source) = args.camera_source {
            self.camera.source = source;
        }
        if let Some(replay_dir) = &args.replay_dir {
            self.camera.replay_dir = Some(replay_dir.clone());
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server
            .bind_address
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::BadIPFormatting(self.server.bind_address.clone()))?;

        if self.camera.jpeg_quality > 63 {
            return Err(ConfigError::NotInRange(format!(
                "camera.jpeg_quality = {} (expected 0..=63)",
                self.camera.jpeg_quality
            )));
        }
        if self.camera.fb_count == 0 {
            return Err(ConfigError::NotInRange(
                "camera.fb_count must be at least 1".to_string(),
            ));
        }
        if self.camera.fps == 0 {
            return Err(ConfigError::NotInRange(
                "camera.fps must be at least 1".to_string(),
            ));
        }
        if self.stream.pull_buffer_size <= PART_OVERHEAD {
            return Err(ConfigError::NotInRange(format!(
                "stream.pull_buffer_size = {} (must exceed {})",
                self.stream.pull_buffer_size, PART_OVERHEAD
            )));
        }
        if self.camera.source == CameraSource::Replay {
            match &self.camera.replay_dir {
                Some(dir) if dir.is_dir() => {}
                Some(dir) => {
                    return Err(ConfigError::DirectoryDoesNotExist(
                        dir.display().to_string(),
                    ))
                }
                None => {
                    return Err(ConfigError::DirectoryDoesNotExist(
                        "camera.replay_dir is required for the replay source".to_string(),
                    ))
                }
            }
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = self
            .server
            .bind_address
            .parse::<IpAddr>()
            .map_err(|_| ConfigError::BadIPFormatting(self.server.bind_address.clone()))?;
        Ok(SocketAddr::new(ip, self.server.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.server.port, 80);
        assert_eq!(config.camera.jpeg_quality, 10);
        assert_eq!(config.camera.fb_count, 2);
        assert_eq!(config.camera.grab_mode, GrabMode::Latest);
        assert!(config.camera.vflip && config.camera.hmirror);
    }

    #[test]
    fn test_partial_file() {
        let config = Config::from_toml_str(
            r#"
            [server]
            port = 8080

            [camera]
            frame_size = "qxga"
            grab_mode = "when_empty"
            vflip = false
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert_eq!(config.camera.frame_size, FrameSize::Qxga);
        assert_eq!(config.camera.grab_mode, GrabMode::WhenEmpty);
        assert!(!config.camera.vflip);
        assert!(config.camera.hmirror);
        assert_eq!(config.stream, StreamConfig::default());
    }

    #[test]
    fn test_malformed_file() {
        assert!(matches!(
            Config::from_toml_str("[server]\nport = \"eighty\""),
            Err(ConfigError::TomlError(_))
        ));
        assert!(matches!(
            Config::from_toml_str("[camera]\nsource = \"webcam\""),
            Err(ConfigError::TomlError(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::from_file(&dir.path().join("absent.toml")),
            Err(ConfigError::IoError(_))
        ));
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.camera.jpeg_quality = 64;
        assert!(matches!(config.validate(), Err(ConfigError::NotInRange(_))));
        config.camera.jpeg_quality = 63;

        config.stream.pull_buffer_size = PART_OVERHEAD;
        assert!(matches!(config.validate(), Err(ConfigError::NotInRange(_))));
        config.stream.pull_buffer_size = DEFAULT_PULL_BUFFER_SIZE;

        config.server.bind_address = "camera.local".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BadIPFormatting(_))
        ));
        config.server.bind_address = "127.0.0.1".to_string();

        config.camera.source = CameraSource::Replay;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DirectoryDoesNotExist(_))
        ));
        let dir = TempDir::new().unwrap();
        config.camera.replay_dir = Some(dir.path().to_path_buf());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_args() {
        let args = CliArgs::try_parse_from([
            "camserve",
            "camserve.toml",
            "--bind-address",
            "127.0.0.1",
            "--port",
            "8080",
            "--storage-path",
            "/tmp/photos",
            "--camera-source",
            "replay",
            "--replay-dir",
            "/tmp/frames",
        ])
        .unwrap_or_else(|e| panic!("{}", e));

        assert_eq!(args.config_file, Some(PathBuf::from("camserve.toml")));

        let mut config = Config::default();
        config.apply_overrides(&args);
        assert_eq!(config.server.bind_address, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.root, PathBuf::from("/tmp/photos"));
        assert_eq!(config.camera.source, CameraSource::Replay);
        assert_eq!(config.camera.replay_dir, Some(PathBuf::from("/tmp/frames")));
        assert_eq!(
            config.socket_addr().unwrap(),
            "127.0.0.1:8080".parse().unwrap()
        );
    }

    #[test]
    #[serial]
    fn test_env_overrides_file_and_flags_override_env() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("camserve.toml");
        fs::write(&file, "[storage]\nroot = \"/from/file\"\n").unwrap();

        std::env::set_var(STORAGE_DIR_ENV, "/from/env");
        let args = CliArgs {
            config_file: Some(file.clone()),
            ..CliArgs::default()
        };
        let config = Config::load(&args).unwrap();
        assert_eq!(config.storage.root, PathBuf::from("/from/env"));

        let args = CliArgs {
            config_file: Some(file),
            storage_path: Some(PathBuf::from("/from/flag")),
            ..CliArgs::default()
        };
        let config = Config::load(&args).unwrap();
        assert_eq!(config.storage.root, PathBuf::from("/from/flag"));
        std::env::remove_var(STORAGE_DIR_ENV);
    }

    #[test]
    #[serial]
    fn test_load_without_file() {
        std::env::remove_var(STORAGE_DIR_ENV);
        let config = Config::load(&CliArgs::default()).unwrap();
        assert_eq!(config, Config::default());
    }
}
