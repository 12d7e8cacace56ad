//! In-memory storage node

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use super::StorageApi;
use crate::error::StorageError;

/// A storage node holding file keys in memory.
///
/// Directories are implied by the keys: `a/b/c` makes `a/` and `a/b/`
/// exist. A fault can be injected so every listing fails with a given
/// error, which is how node outages are simulated.
pub struct MemoryDisk {
    id: String,
    volumes: RwLock<BTreeMap<String, BTreeSet<String>>>,
    fault: RwLock<Option<StorageError>>,
    list_calls: AtomicUsize,
}

impl MemoryDisk {
    /// Create an empty node
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            volumes: RwLock::new(BTreeMap::new()),
            fault: RwLock::new(None),
            list_calls: AtomicUsize::new(0),
        }
    }

    /// Create a node with one volume holding `keys`
    pub fn with_keys<I, S>(id: impl Into<String>, volume: &str, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let disk = Self::new(id);
        disk.make_volume(volume);
        for key in keys {
            disk.put(volume, key);
        }
        disk
    }

    /// Create an empty volume
    pub fn make_volume(&self, volume: &str) {
        if let Ok(mut volumes) = self.volumes.write() {
            volumes.entry(volume.to_string()).or_default();
        }
    }

    /// Store a file key, creating the volume if needed
    pub fn put(&self, volume: &str, key: impl Into<String>) {
        if let Ok(mut volumes) = self.volumes.write() {
            volumes.entry(volume.to_string()).or_default().insert(key.into());
        }
    }

    /// Make every listing fail with `fault`, or clear it with `None`
    pub fn set_fault(&self, fault: Option<StorageError>) {
        if let Ok(mut current) = self.fault.write() {
            *current = fault;
        }
    }

    /// Number of `list_dir` calls served or refused so far
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageApi for MemoryDisk {
    fn id(&self) -> &str {
        &self.id
    }

    async fn list_dir(&self, volume: &str, dir_path: &str) -> Result<Vec<String>, StorageError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(fault) = self.fault.read().ok().and_then(|f| f.clone()) {
            return Err(fault);
        }

        let volumes = self
            .volumes
            .read()
            .map_err(|_| StorageError::FaultyDisk)?;
        let keys = volumes.get(volume).ok_or(StorageError::VolumeNotFound)?;

        let mut children = BTreeSet::new();
        for key in keys.range(dir_path.to_string()..) {
            let Some(rest) = key.strip_prefix(dir_path) else {
                break;
            };
            if rest.is_empty() {
                continue;
            }
            match rest.find('/') {
                Some(idx) => children.insert(rest[..=idx].to_string()),
                None => children.insert(rest.to_string()),
            };
        }

        if children.is_empty() && !dir_path.is_empty() {
            return Err(StorageError::FileNotFound);
        }

        Ok(children.into_iter().collect())
    }

    fn has_file(&self, volume: &str, path: &str) -> bool {
        self.volumes
            .read()
            .map(|volumes| volumes.get(volume).is_some_and(|keys| keys.contains(path)))
            .unwrap_or(false)
    }
}
