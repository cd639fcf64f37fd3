//! Named JPEG assets on block storage.
//!
//! Captured frames are stored as `/photo_<uptime millis>.jpg`. The uptime
//! counter never goes backwards, and names are created with create-new
//! semantics, so an existing asset is never overwritten: a second capture in
//! the same millisecond gets a `_1`, `_2`, ... suffix instead.

use std::io::{Read, Write};
use std::sync::Arc;

use bytes::Bytes;
use log::{debug, error, info, warn};

use crate::camera::FrameSource;
use crate::clock::UptimeClock;
use crate::error_handling::types::{AssetError, StorageError};
use crate::storage::block_storage::{normalize_name, BlockStorage, WriteHandle};
use crate::storage::types::{AssetEntry, CapturedAsset};

pub const NAME_PREFIX: &str = "/photo_";
pub const NAME_EXTENSION: &str = ".jpg";
const MAX_NAME_ATTEMPTS: u32 = 100;

/// An open asset ready to be streamed to a client.
pub struct AssetReader {
    pub name: String,
    pub size: u64,
    pub reader: Box<dyn Read + Send>,
}

#[derive(Clone)]
pub struct AssetStore {
    storage: Arc<dyn BlockStorage>,
    frames: Arc<FrameSource>,
    clock: Arc<dyn UptimeClock>,
}

impl AssetStore {
    pub fn new(
        storage: Arc<dyn BlockStorage>,
        frames: Arc<FrameSource>,
        clock: Arc<dyn UptimeClock>,
    ) -> Self {
        Self {
            storage,
            frames,
            clock,
        }
    }

    /// Grabs one frame and writes it under a fresh name.
    ///
    /// The frame is released before this returns, on success and on every
    /// failure path.
    pub fn capture_and_store(&self) -> Result<CapturedAsset, AssetError> {
        let frame = self.frames.acquire().map_err(|e| {
            error!("Camera capture failed: {}", e);
            e
        })?;

        let millis = self.clock.uptime_millis();
        let (name, mut handle) = self.create_unique(millis)?;

        if let Err(e) = handle.write_all(frame.data()) {
            error!("Failed to write {}: {}", name, e);
            drop(handle);
            self.discard_partial(&name);
            return Err(StorageError::WriteFailed.into());
        }
        if let Err(e) = handle.close() {
            self.discard_partial(&name);
            return Err(e.into());
        }

        let data = Bytes::copy_from_slice(frame.data());
        drop(frame);
        info!("Photo saved: {} ({} bytes)", name, data.len());
        Ok(CapturedAsset { name, data })
    }

    /// Lists regular files at the storage root.
    pub fn list(&self) -> Result<impl Iterator<Item = AssetEntry> + Send, StorageError> {
        let entries = self.storage.entries()?;
        Ok(entries
            .filter(|entry| !entry.is_dir)
            .map(|entry| AssetEntry {
                name: entry.name,
                size: entry.size,
            }))
    }

    pub fn read(&self, name: &str) -> Result<AssetReader, StorageError> {
        let name = normalize_name(name)?;
        if !self.storage.exists(&name) {
            debug!("Requested {} does not exist", name);
            return Err(StorageError::NotFound);
        }
        let (reader, size) = self.storage.open_read(&name)?;
        debug!("Reading {} ({} bytes)", name, size);
        Ok(AssetReader { name, size, reader })
    }

    pub fn delete(&self, name: &str) -> Result<(), StorageError> {
        let name = normalize_name(name)?;
        if !self.storage.exists(&name) {
            return Err(StorageError::NotFound);
        }
        self.storage.remove(&name)?;
        info!("Deleted {}", name);
        Ok(())
    }

    fn create_unique(&self, millis: u64) -> Result<(String, Box<dyn WriteHandle>), StorageError> {
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = asset_name(millis, attempt);
            match self.storage.create_new(&name) {
                Ok(handle) => return Ok((name, handle)),
                Err(StorageError::AlreadyExists) => {
                    debug!("{} already taken", name);
                }
                Err(e) => return Err(e),
            }
        }
        error!(
            "No free asset name for uptime {} after {} attempts",
            millis, MAX_NAME_ATTEMPTS
        );
        Err(StorageError::OpenFailed)
    }

    fn discard_partial(&self, name: &str) {
        if let Err(e) = self.storage.remove(name) {
            warn!("Could not remove partial file {}: {}", name, e);
        }
    }
}

fn asset_name(millis: u64, attempt: u32) -> String {
    if attempt == 0 {
        format!("{}{}{}", NAME_PREFIX, millis, NAME_EXTENSION)
    } else {
        format!("{}{}_{}{}", NAME_PREFIX, millis, attempt, NAME_EXTENSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::testing::{CameraProbe, ScriptedCamera};
    use crate::clock::ManualUptime;
    use crate::error_handling::types::CameraError;
    use crate::storage::file_storage::FileStorage;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        root: std::path::PathBuf,
        store: AssetStore,
        clock: Arc<ManualUptime>,
        probe: Arc<CameraProbe>,
    }

    fn fixture_with(camera: ScriptedCamera, probe: Arc<CameraProbe>) -> Fixture {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_path_buf();
        let clock = Arc::new(ManualUptime::new(1500));
        let store = AssetStore::new(
            Arc::new(FileStorage::open(&root).unwrap()),
            Arc::new(FrameSource::new(Box::new(camera))),
            clock.clone(),
        );
        Fixture {
            _dir: dir,
            root,
            store,
            clock,
            probe,
        }
    }

    fn fixture() -> Fixture {
        let (camera, probe) = ScriptedCamera::new(b"\xFF\xD8jpeg\xFF\xD9".to_vec());
        fixture_with(camera, probe)
    }

    #[test]
    fn capture_names_asset_after_uptime() {
        let fx = fixture();
        let asset = fx.store.capture_and_store().unwrap();

        assert_eq!(asset.name, "/photo_1500.jpg");
        assert_eq!(&asset.data[..], b"\xFF\xD8jpeg\xFF\xD9");
        assert_eq!(
            fs::read(fx.root.join("photo_1500.jpg")).unwrap(),
            b"\xFF\xD8jpeg\xFF\xD9"
        );
        assert_eq!(fx.probe.released(), 1);
    }

    #[test]
    fn same_millisecond_never_overwrites() {
        let fx = fixture();
        let first = fx.store.capture_and_store().unwrap();
        let second = fx.store.capture_and_store().unwrap();
        fx.clock.advance(1);
        let third = fx.store.capture_and_store().unwrap();

        assert_eq!(first.name, "/photo_1500.jpg");
        assert_eq!(second.name, "/photo_1500_1.jpg");
        assert_eq!(third.name, "/photo_1501.jpg");
        assert_eq!(fx.store.list().unwrap().count(), 3);
    }

    #[test]
    fn captured_asset_is_listed_and_readable() {
        let fx = fixture();
        let asset = fx.store.capture_and_store().unwrap();

        let listed: Vec<_> = fx.store.list().unwrap().collect();
        assert_eq!(
            listed,
            vec![AssetEntry {
                name: asset.name.clone(),
                size: asset.data.len() as u64,
            }]
        );

        let mut opened = fx.store.read(asset.name.trim_start_matches('/')).unwrap();
        assert_eq!(opened.name, asset.name);
        assert_eq!(opened.size, asset.data.len() as u64);
        let mut content = Vec::new();
        opened.reader.read_to_end(&mut content).unwrap();
        assert_eq!(content, asset.data.to_vec());
    }

    #[test]
    fn list_skips_directories() {
        let fx = fixture();
        fs::create_dir(fx.root.join("DCIM")).unwrap();
        fx.store.capture_and_store().unwrap();

        let names: Vec<_> = fx.store.list().unwrap().map(|e| e.name).collect();
        assert_eq!(names, vec!["/photo_1500.jpg".to_string()]);
    }

    #[test]
    fn deleted_asset_disappears() {
        let fx = fixture();
        let asset = fx.store.capture_and_store().unwrap();

        fx.store.delete(&asset.name).unwrap();
        assert_eq!(fx.store.list().unwrap().count(), 0);
        assert!(matches!(fx.store.read(&asset.name), Err(StorageError::NotFound)));
        assert_eq!(fx.store.delete(&asset.name), Err(StorageError::NotFound));
    }

    #[test]
    fn every_listed_file_can_be_read_and_deleted() {
        let fx = fixture();
        fs::write(fx.root.join("my photo.jpg"), b"spaced").unwrap();
        fs::write(fx.root.join(".hidden.jpg"), b"dotted").unwrap();

        let listed: Vec<_> = fx.store.list().unwrap().collect();
        assert_eq!(listed.len(), 2);
        for entry in listed {
            let mut opened = fx.store.read(&entry.name).unwrap();
            let mut content = Vec::new();
            opened.reader.read_to_end(&mut content).unwrap();
            assert_eq!(content.len() as u64, entry.size);

            fx.store.delete(&entry.name).unwrap();
        }
        assert_eq!(fx.store.list().unwrap().count(), 0);
    }

    #[test]
    fn bad_names_are_rejected() {
        let fx = fixture();
        assert!(matches!(
            fx.store.read("../secret"),
            Err(StorageError::InvalidName(_))
        ));
        assert!(matches!(
            fx.store.delete("a/b.jpg"),
            Err(StorageError::InvalidName(_))
        ));
    }

    #[test]
    fn camera_failure_writes_nothing() {
        let (camera, probe) = ScriptedCamera::new(b"jpeg".to_vec());
        let camera = camera.with_script(vec![Err(CameraError::CaptureUnavailable)]);
        let fx = fixture_with(camera, probe);

        assert!(matches!(
            fx.store.capture_and_store(),
            Err(AssetError::Camera(CameraError::CaptureUnavailable))
        ));
        assert_eq!(fx.store.list().unwrap().count(), 0);
    }

    #[test]
    fn storage_failure_still_releases_frame() {
        let fx = fixture();
        fs::remove_dir_all(&fx.root).unwrap();

        assert!(matches!(
            fx.store.capture_and_store(),
            Err(AssetError::Storage(StorageError::OpenFailed))
        ));
        assert_eq!(fx.probe.acquired(), 1);
        assert_eq!(fx.probe.released(), 1);
        assert_eq!(fx.probe.outstanding(), 0);
    }

    #[test]
    fn missing_root_fails_listing() {
        let fx = fixture();
        fs::remove_dir_all(&fx.root).unwrap();
        assert!(matches!(
            fx.store.list().map(|entries| entries.count()),
            Err(StorageError::RootUnavailable)
        ));
    }
}
