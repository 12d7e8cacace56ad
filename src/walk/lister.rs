//! Directory Lister
//!
//! Lists one directory level across a set of storage nodes, failing over
//! between them, and returns a sorted, prefix-filtered batch.

use std::sync::Arc;

use tracing::{debug, warn};

use super::filter::{delay_is_leaf_check, filter_matching_prefix, path_join};
use crate::error::{ListingError, StorageError};
use crate::storage::{IsLeafFn, StorageApi, SLASH_SEPARATOR};

/// Lists directories across storage nodes tried in a fixed order
pub struct DirectoryLister {
    /// Leaf predicate used when classification cannot be deferred
    is_leaf: IsLeafFn,
    /// Storage nodes; `None` marks an offline node
    disks: Vec<Option<Arc<dyn StorageApi>>>,
}

impl DirectoryLister {
    /// Create a lister over `disks`
    pub fn new(is_leaf: IsLeafFn, disks: Vec<Option<Arc<dyn StorageApi>>>) -> Self {
        Self { is_leaf, disks }
    }

    /// List the entries of `prefix_dir` starting with `prefix_entry`.
    ///
    /// Returns the sorted batch and whether leaf classification was
    /// deferred. When it was not, leaves already have their trailing `/`
    /// removed and the batch has been re-sorted.
    pub async fn list(
        &self,
        bucket: &str,
        prefix_dir: &str,
        prefix_entry: &str,
    ) -> Result<(Vec<String>, bool), ListingError> {
        let mut last_err = StorageError::DiskNotFound;

        for disk in self.disks.iter().flatten() {
            let mut entries = match disk.list_dir(bucket, prefix_dir).await {
                Ok(entries) => entries,
                Err(e) if e.is_walk_ignorable() => {
                    debug!(
                        "Disk {} cannot list {}/{}: {}, trying next disk",
                        disk.id(),
                        bucket,
                        prefix_dir,
                        e
                    );
                    last_err = e;
                    continue;
                }
                Err(e) => {
                    warn!("Disk {} failed listing {}/{}: {}", disk.id(), bucket, prefix_dir, e);
                    last_err = e;
                    break;
                }
            };

            entries.sort();
            let mut entries = filter_matching_prefix(&entries, prefix_entry).to_vec();

            let delay_is_leaf = delay_is_leaf_check(&entries);
            if delay_is_leaf {
                return Ok((entries, true));
            }

            for entry in entries.iter_mut() {
                if (self.is_leaf)(bucket, &path_join(prefix_dir, entry)) {
                    if let Some(stripped) = entry.strip_suffix(SLASH_SEPARATOR) {
                        *entry = stripped.to_string();
                    }
                }
            }
            // Stripping can change the relative order
            entries.sort();
            return Ok((entries, false));
        }

        Err(ListingError {
            bucket: bucket.to_string(),
            path: prefix_dir.to_string(),
            source: last_err,
        })
    }
}
