use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// One row of the file listing, as served by `/files`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetEntry {
    pub name: String,
    pub size: u64,
}

/// Raw directory entry reported by a block storage backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEntry {
    pub name: String,
    pub size: u64,
    pub is_dir: bool,
}

/// A frame that was written to storage, with a copy of its bytes for the caller.
#[derive(Debug, Clone)]
pub struct CapturedAsset {
    pub name: String,
    pub data: Bytes,
}
