use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    BadIPFormatting(String),
    DirectoryDoesNotExist(String),
    NotInRange(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::BadIPFormatting(e) => write!(f, "IP formatting error: {}", e),
            ConfigError::DirectoryDoesNotExist(e) => write!(f, "Directory error: {}", e),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

/// Failures reported by the camera peripheral or the frame source wrapping it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    /// No frame became ready within the driver's own retry policy.
    CaptureUnavailable,
    /// Every buffer of the driver's pool is currently handed out.
    PoolExhausted,
    /// The peripheral is gone; no further frame will ever be produced.
    DeviceLost(String),
    /// The driver rejected its configuration.
    InitFailed(String),
    /// Internal driver state is inconsistent, e.g. use before configure.
    DriverFault(String),
}

impl CameraError {
    /// Whether the failure ends a stream session instead of producing an empty pull.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CameraError::DeviceLost(_) | CameraError::DriverFault(_))
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::CaptureUnavailable => write!(f, "Camera capture unavailable"),
            CameraError::PoolExhausted => write!(f, "Camera frame buffer pool exhausted"),
            CameraError::DeviceLost(e) => write!(f, "Camera device lost: {}", e),
            CameraError::InitFailed(e) => write!(f, "Camera initialization failed: {}", e),
            CameraError::DriverFault(e) => write!(f, "Camera driver fault: {}", e),
        }
    }
}

impl std::error::Error for CameraError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    RootUnavailable,
    OpenFailed,
    WriteFailed,
    ReadFailed,
    NotFound,
    AlreadyExists,
    InvalidName(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::RootUnavailable => write!(f, "Storage root unavailable"),
            StorageError::OpenFailed => write!(f, "Storage open failed"),
            StorageError::WriteFailed => write!(f, "Storage write failed"),
            StorageError::ReadFailed => write!(f, "Storage read failed"),
            StorageError::NotFound => write!(f, "File not found"),
            StorageError::AlreadyExists => write!(f, "File already exists"),
            StorageError::InvalidName(name) => write!(f, "Invalid file name: {}", name),
        }
    }
}

impl std::error::Error for StorageError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    Camera(CameraError),
    Storage(StorageError),
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::Camera(e) => write!(f, "Camera error: {}", e),
            AssetError::Storage(e) => write!(f, "Storage error: {}", e),
        }
    }
}

impl std::error::Error for AssetError {}

impl From<CameraError> for AssetError {
    fn from(err: CameraError) -> Self {
        AssetError::Camera(err)
    }
}

impl From<StorageError> for AssetError {
    fn from(err: StorageError) -> Self {
        AssetError::Storage(err)
    }
}

#[derive(Debug)]
pub enum WebError {
    BindFailed(String),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::BindFailed(e) => write!(f, "Web server bind failed: {}", e),
        }
    }
}

impl std::error::Error for WebError {}

#[derive(Debug)]
pub enum ControllerError {
    ConfigurationError(ConfigError),
    CameraError(CameraError),
    WebError(WebError),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::ConfigurationError(e) => write!(f, "Configuration error: {}", e),
            ControllerError::CameraError(e) => write!(f, "Camera error: {}", e),
            ControllerError::WebError(e) => write!(f, "Web error: {}", e),
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<ConfigError> for ControllerError {
    fn from(err: ConfigError) -> Self {
        ControllerError::ConfigurationError(err)
    }
}

impl From<CameraError> for ControllerError {
    fn from(err: CameraError) -> Self {
        ControllerError::CameraError(err)
    }
}

impl From<WebError> for ControllerError {
    fn from(err: WebError) -> Self {
        ControllerError::WebError(err)
    }
}
