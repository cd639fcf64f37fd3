//! Storage subsystem
//!
//! Persists captured frames as named files and serves them back.
//!
//! Components:
//! - `block_storage`: the BlockStorage trait and name normalization.
//! - `file_storage`: directory-backed BlockStorage.
//! - `asset_store`: capture-to-file, listing, reading and deleting assets.
//! - `types`: shared data types.

pub mod asset_store;
pub mod block_storage;
pub mod file_storage;
pub mod types;

pub use asset_store::{AssetReader, AssetStore};
pub use block_storage::{normalize_name, BlockStorage};
pub use file_storage::FileStorage;
