//! Local disk storage node

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::trace;

use super::StorageApi;
use crate::error::StorageError;

/// A storage node backed by a local directory.
///
/// Volumes (buckets) are the top-level directories under `root`.
pub struct PosixDisk {
    id: String,
    root: PathBuf,
}

impl PosixDisk {
    /// Create a node rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            id: root.display().to_string(),
            root,
        }
    }

    async fn volume_dir(&self, volume: &str) -> Result<PathBuf, StorageError> {
        match fs::metadata(&self.root).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(StorageError::DiskNotFound),
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StorageError::DiskNotFound),
            Err(e) => return Err(e.into()),
        }

        let volume_dir = self.root.join(volume);
        match fs::metadata(&volume_dir).await {
            Ok(meta) if meta.is_dir() => Ok(volume_dir),
            Ok(_) => Err(StorageError::VolumeNotFound),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::VolumeNotFound),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl StorageApi for PosixDisk {
    fn id(&self) -> &str {
        &self.id
    }

    async fn list_dir(&self, volume: &str, dir_path: &str) -> Result<Vec<String>, StorageError> {
        let volume_dir = self.volume_dir(volume).await?;
        let dir = volume_dir.join(dir_path);

        let mut read_dir = match fs::read_dir(&dir).await {
            Ok(rd) => rd,
            // A path component that is a file rather than a directory
            Err(e) if e.kind() == ErrorKind::NotADirectory => {
                return Err(StorageError::FileNotFound)
            }
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue,
            };

            let mut file_type = entry.file_type().await?;
            if file_type.is_symlink() {
                file_type = match fs::metadata(entry.path()).await {
                    Ok(meta) => meta.file_type(),
                    // Dangling link
                    Err(_) => continue,
                };
            }

            if file_type.is_dir() {
                entries.push(format!("{}/", name));
            } else if file_type.is_file() {
                entries.push(name);
            }
        }

        trace!("{} listed {}/{}: {} entries", self.id, volume, dir_path, entries.len());
        Ok(entries)
    }

    /// Blocking `stat`. Leaf predicates call this once per entry from the
    /// walk task, so on a multi-thread runtime the worker is handed off
    /// with `block_in_place` first.
    fn has_file(&self, volume: &str, path: &str) -> bool {
        let file = self.root.join(volume).join(path);
        let stat = || {
            std::fs::metadata(&file)
                .map(|meta| meta.is_file())
                .unwrap_or(false)
        };
        match Handle::try_current().map(|h| h.runtime_flavor()) {
            Ok(RuntimeFlavor::MultiThread) => tokio::task::block_in_place(stat),
            _ => stat(),
        }
    }
}
