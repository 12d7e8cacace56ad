//! Storage Node Module
//!
//! The listing engine never reads object data. All it needs from a
//! storage node is the entries directly under a directory, plus a cheap
//! existence check used by the leaf predicates.

mod leaf;
mod memory;
mod posix;

pub use leaf::{
    leaf_for_layout, marker_file_leaf, plain_object_leaf, IsLeafFn, UPLOADS_FILE, XL_META_FILE,
};
pub use memory::MemoryDisk;
pub use posix::PosixDisk;

use async_trait::async_trait;

use crate::error::StorageError;

/// Directory separator used in keys and listings
pub const SLASH_SEPARATOR: &str = "/";

/// Capability exposed by a single storage node
#[async_trait]
pub trait StorageApi: Send + Sync {
    /// Identifier used in log output
    fn id(&self) -> &str;

    /// List the entries directly under `dir_path` in `volume`.
    ///
    /// Directories carry a trailing `/`, files do not. No ordering is
    /// promised.
    async fn list_dir(&self, volume: &str, dir_path: &str) -> Result<Vec<String>, StorageError>;

    /// Whether a regular file exists at `path` in `volume`
    fn has_file(&self, volume: &str, path: &str) -> bool;
}
