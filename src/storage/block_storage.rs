//! Block Storage Trait
//!
//! The interface the asset store expects from removable storage: a flat root
//! of named files that can be created (never overwritten), read, enumerated
//! and removed. Names are absolute within the root and start with `/`.

use std::io::{Read, Write};
use std::sync::OnceLock;

use regex::Regex;

use crate::error_handling::types::StorageError;
use crate::storage::types::StorageEntry;

/// Lazy, finite, single-pass view of the storage root.
pub type StorageEntries = Box<dyn Iterator<Item = StorageEntry> + Send>;

/// Write side of a newly created file.
pub trait WriteHandle: Write + Send {
    /// Flushes and makes the content durable. Dropping without closing leaves
    /// the file in whatever state the last write left it.
    fn close(self: Box<Self>) -> Result<(), StorageError>;
}

pub trait BlockStorage: Send + Sync {
    /// Creates `name` for writing. Fails with `AlreadyExists` if it is taken.
    fn create_new(&self, name: &str) -> Result<Box<dyn WriteHandle>, StorageError>;

    /// Opens `name` for reading and returns it with its size in bytes.
    fn open_read(&self, name: &str) -> Result<(Box<dyn Read + Send>, u64), StorageError>;

    /// Enumerates the root as it is at call time.
    fn entries(&self) -> Result<StorageEntries, StorageError>;

    fn exists(&self, name: &str) -> bool;

    fn remove(&self, name: &str) -> Result<(), StorageError>;
}

/// Longest accepted name in bytes, leading `/` excluded.
pub const MAX_NAME_LEN: usize = 255;

// One path component: no separators, no NUL.
fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^/[^/\\\x00]+$").expect("valid storage name regex"))
}

/// Brings a user-supplied name to root addressing (`photo.jpg` -> `/photo.jpg`).
///
/// Any single file name is accepted, spaces and leading dots included. Names
/// with a separator, NUL, `.` or `..` are rejected, so nothing can escape the
/// root.
pub fn normalize_name(raw: &str) -> Result<String, StorageError> {
    let name = if raw.starts_with('/') {
        raw.to_string()
    } else {
        format!("/{}", raw)
    };
    let component = &name[1..];
    if component.len() > MAX_NAME_LEN
        || component == "."
        || component == ".."
        || !name_pattern().is_match(&name)
    {
        return Err(StorageError::InvalidName(raw.to_string()));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_leading_separator() {
        assert_eq!(normalize_name("photo_1.jpg").unwrap(), "/photo_1.jpg");
        assert_eq!(normalize_name("/photo_1.jpg").unwrap(), "/photo_1.jpg");
    }

    #[test]
    fn accepts_any_single_file_name() {
        for good in ["my photo.jpg", "/.hidden.jpg", "/été.jpg", "/..jpg", "/a:b (1).jpg"] {
            let name = normalize_name(good).unwrap();
            assert!(name.starts_with('/'));
            assert_eq!(name.trim_start_matches('/'), good.trim_start_matches('/'));
        }
    }

    #[test]
    fn rejects_paths_outside_root() {
        let too_long = "a".repeat(MAX_NAME_LEN + 1);
        for bad in [
            "",
            "/",
            ".",
            "/.",
            "..",
            "/..",
            "../etc/passwd",
            "a/b.jpg",
            "/a/b.jpg",
            "a\\b.jpg",
            "..\\b.jpg",
            "a\0b.jpg",
            too_long.as_str(),
        ] {
            assert!(
                matches!(normalize_name(bad), Err(StorageError::InvalidName(_))),
                "{bad:?} should be rejected"
            );
        }
    }
}
