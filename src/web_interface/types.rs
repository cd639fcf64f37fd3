use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::camera::FrameSource;
use crate::configuration::types::StreamConfig;
use crate::storage::AssetStore;

/// Response header carrying the storage name of a captured photo.
pub const X_FILENAME: &str = "X-Filename";

pub const CAPTURE_DISPOSITION: &str = "inline; filename=capture.jpg";

/// Chunk size used when streaming a stored file.
pub const DOWNLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// JSON error payload
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

/// `?file=` query of the download and delete endpoints
#[derive(Debug, Default, Deserialize)]
pub struct FileQuery {
    pub file: Option<String>,
}

impl FileQuery {
    /// The requested name, if one was given and is not blank.
    pub fn name(&self) -> Option<&str> {
        self.file.as_deref().filter(|name| !name.trim().is_empty())
    }
}

/// Everything the handlers share.
#[derive(Clone)]
pub struct AppState {
    pub frames: Arc<FrameSource>,
    pub assets: AssetStore,
    pub stream: StreamConfig,
}
