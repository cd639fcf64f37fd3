use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};

use crate::error_handling::types::StorageError;
use crate::storage::block_storage::{normalize_name, BlockStorage, StorageEntries, WriteHandle};
use crate::storage::types::StorageEntry;

/// Directory-rooted block storage. `/photo_1.jpg` lives at `<root>/photo_1.jpg`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Uses `root`, creating it if needed.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| {
            error!("Failed to create storage root {}: {}", root.display(), e);
            StorageError::RootUnavailable
        })?;
        info!("FileStorage initialized at {}", root.display());
        Ok(Self { root })
    }

    /// Uses `root` as is. Operations fail per call while it is missing.
    pub fn at<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, StorageError> {
        let name = normalize_name(name)?;
        Ok(self.root.join(&name[1..]))
    }
}

struct FileWriteHandle {
    file: File,
    path: PathBuf,
}

impl Write for FileWriteHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl WriteHandle for FileWriteHandle {
    fn close(mut self: Box<Self>) -> Result<(), StorageError> {
        self.file
            .flush()
            .and_then(|_| self.file.sync_all())
            .map_err(|e| {
                error!("Failed to sync {}: {}", self.path.display(), e);
                StorageError::WriteFailed
            })
    }
}

impl BlockStorage for FileStorage {
    fn create_new(&self, name: &str) -> Result<Box<dyn WriteHandle>, StorageError> {
        let path = self.path_for(name)?;
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => StorageError::AlreadyExists,
                _ => {
                    error!("Failed to create {}: {}", path.display(), e);
                    StorageError::OpenFailed
                }
            })?;
        Ok(Box::new(FileWriteHandle { file, path }))
    }

    fn open_read(&self, name: &str) -> Result<(Box<dyn Read + Send>, u64), StorageError> {
        let path = self.path_for(name)?;
        let file = File::open(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound,
            _ => {
                error!("Failed to open {}: {}", path.display(), e);
                StorageError::OpenFailed
            }
        })?;
        let metadata = file.metadata().map_err(|e| {
            error!("Failed to stat {}: {}", path.display(), e);
            StorageError::ReadFailed
        })?;
        if metadata.is_dir() {
            return Err(StorageError::NotFound);
        }
        debug!("Opened {} ({} bytes)", path.display(), metadata.len());
        Ok((Box::new(file), metadata.len()))
    }

    fn entries(&self) -> Result<StorageEntries, StorageError> {
        let dir = fs::read_dir(&self.root).map_err(|e| {
            error!("Failed to read storage root {}: {}", self.root.display(), e);
            StorageError::RootUnavailable
        })?;
        let entries = dir.filter_map(|entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable directory entry: {}", e);
                    return None;
                }
            };
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                warn!("Skipping non UTF-8 file name {:?}", entry.file_name());
                return None;
            };
            let name = match normalize_name(file_name) {
                Ok(name) => name,
                Err(_) => {
                    warn!("Skipping unaddressable file name {:?}", file_name);
                    return None;
                }
            };
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!("Skipping {}: {}", file_name, e);
                    return None;
                }
            };
            Some(StorageEntry {
                name,
                size: metadata.len(),
                is_dir: metadata.is_dir(),
            })
        });
        Ok(Box::new(entries))
    }

    fn exists(&self, name: &str) -> bool {
        self.path_for(name).map(|path| path.is_file()).unwrap_or(false)
    }

    fn remove(&self, name: &str) -> Result<(), StorageError> {
        let path = self.path_for(name)?;
        if path.is_dir() {
            return Err(StorageError::NotFound);
        }
        fs::remove_file(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound,
            _ => {
                error!("Failed to remove {}: {}", path.display(), e);
                StorageError::WriteFailed
            }
        })
    }
}
