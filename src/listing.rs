//! Paginated Object Listing
//!
//! Drains tree walks into bounded pages and parks unfinished walks in a
//! pool so the following page picks up where this one stopped.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{ListingConfig, WolfListConfig};
use crate::error::{Error, Result, StorageError};
use crate::storage::{leaf_for_layout, IsLeafFn, PosixDisk, StorageApi, SLASH_SEPARATOR};
use crate::walk::{start_tree_walk, DirectoryLister, ListParams, TreeWalk, TreeWalkPool, TreeWalkResult};

/// One page of a bucket listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListObjectsInfo {
    /// More results exist after this page
    pub is_truncated: bool,
    /// Marker to pass for the next page, set when truncated
    pub next_marker: Option<String>,
    /// Object keys in this page
    pub objects: Vec<String>,
    /// Common prefixes (directories) in this page, delimited listings only
    pub prefixes: Vec<String>,
}

/// Listing entry point over a fixed set of storage nodes
pub struct ListingEngine {
    lister: Arc<DirectoryLister>,
    is_leaf: IsLeafFn,
    pool: TreeWalkPool,
    page_size: usize,
}

impl ListingEngine {
    /// Create an engine over `disks`, tried in order
    pub fn new(
        disks: Vec<Option<Arc<dyn StorageApi>>>,
        is_leaf: IsLeafFn,
        config: &ListingConfig,
    ) -> Self {
        Self {
            lister: Arc::new(DirectoryLister::new(is_leaf.clone(), disks)),
            is_leaf,
            pool: TreeWalkPool::new(config.pool_timeout()),
            page_size: config.page_size.max(1),
        }
    }

    /// Create an engine over the local disks named in `config`
    pub fn from_config(config: &WolfListConfig) -> Self {
        let disks: Vec<Option<Arc<dyn StorageApi>>> = config
            .storage
            .disks
            .iter()
            .map(|root| Some(Arc::new(PosixDisk::new(root)) as Arc<dyn StorageApi>))
            .collect();
        let is_leaf = leaf_for_layout(config.storage.layout, config.storage.kind, disks.clone());
        Self::new(disks, is_leaf, &config.listing)
    }

    /// The pool of parked walks
    pub fn pool(&self) -> &TreeWalkPool {
        &self.pool
    }

    /// Start a raw walk without pagination
    pub fn walk(&self, bucket: &str, prefix: &str, marker: &str, recursive: bool) -> TreeWalk {
        start_tree_walk(
            bucket,
            prefix,
            marker,
            recursive,
            Arc::clone(&self.lister),
            self.is_leaf.clone(),
            self.page_size,
        )
    }

    /// List up to `max_keys` entries of `bucket` under `prefix` after `marker`.
    ///
    /// `delimiter` is `""` for a recursive listing or `"/"` to stop at the
    /// first level and report directories as prefixes. A negative or
    /// oversized `max_keys` is clamped to the page size.
    pub async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        marker: &str,
        delimiter: &str,
        max_keys: i64,
    ) -> Result<ListObjectsInfo> {
        if !delimiter.is_empty() && delimiter != SLASH_SEPARATOR {
            return Err(Error::UnsupportedDelimiter(delimiter.to_string()));
        }
        if !marker.is_empty() && !marker.starts_with(prefix) {
            return Err(Error::InvalidMarkerPrefix {
                marker: marker.to_string(),
                prefix: prefix.to_string(),
            });
        }
        if max_keys == 0 {
            return Ok(ListObjectsInfo::default());
        }
        // Nothing can live under a bare separator
        if delimiter == SLASH_SEPARATOR && prefix == SLASH_SEPARATOR {
            return Ok(ListObjectsInfo::default());
        }

        let max_keys = match usize::try_from(max_keys) {
            Ok(n) if n <= self.page_size => n,
            _ => self.page_size,
        };
        let recursive = delimiter != SLASH_SEPARATOR;

        let params = ListParams {
            bucket: bucket.to_string(),
            recursive,
            marker: marker.to_string(),
            prefix: prefix.to_string(),
        };
        let mut walk = match self.pool.release(&params).await {
            Some(walk) => {
                debug!("Resuming parked walk of {} after {:?}", bucket, marker);
                walk
            }
            None => self.walk(bucket, prefix, marker, recursive),
        };

        let mut entries = Vec::with_capacity(max_keys);
        let mut eof = false;
        while entries.len() < max_keys {
            match walk.next().await {
                None => {
                    eof = true;
                    break;
                }
                Some(TreeWalkResult::Error(e)) => {
                    return match e.source {
                        // A prefix directory that does not exist lists as empty
                        StorageError::FileNotFound => Ok(ListObjectsInfo::default()),
                        StorageError::VolumeNotFound => Err(Error::BucketNotFound(bucket.to_string())),
                        _ => Err(e.into()),
                    };
                }
                Some(TreeWalkResult::Entry { entry, end }) => {
                    entries.push(entry);
                    if end {
                        eof = true;
                        break;
                    }
                }
            }
        }

        let mut result = ListObjectsInfo {
            is_truncated: !eof,
            ..Default::default()
        };
        if !eof {
            if let Some(last) = entries.last() {
                result.next_marker = Some(last.clone());
                let next = ListParams {
                    marker: last.clone(),
                    ..params
                };
                self.pool.set(next, walk).await;
            }
        }

        for entry in entries {
            if entry.ends_with(SLASH_SEPARATOR) {
                result.prefixes.push(entry);
            } else {
                result.objects.push(entry);
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{marker_file_leaf, plain_object_leaf, MemoryDisk, XL_META_FILE};

    fn config(page_size: usize) -> ListingConfig {
        ListingConfig {
            page_size,
            pool_timeout_secs: 60,
        }
    }

    fn engine(keys: &[&str], page_size: usize) -> (ListingEngine, Arc<MemoryDisk>) {
        let disk = Arc::new(MemoryDisk::with_keys("m1", "photos", keys.iter().copied()));
        let disks = vec![Some(Arc::clone(&disk) as Arc<dyn StorageApi>)];
        (ListingEngine::new(disks, plain_object_leaf(), &config(page_size)), disk)
    }

    #[tokio::test]
    async fn test_delimited_listing() {
        let (engine, _) = engine(&["a", "a-b/x", "b", "c/d/e"], 1000);
        let page = engine.list_objects("photos", "", "", "/", 1000).await.unwrap();

        assert!(!page.is_truncated);
        assert_eq!(page.next_marker, None);
        assert_eq!(page.objects, vec!["a", "b"]);
        assert_eq!(page.prefixes, vec!["a-b/", "c/"]);
    }

    #[tokio::test]
    async fn test_pagination_reuses_parked_walk() {
        let keys: Vec<String> = (0..25).map(|i| format!("dir{}/obj{:02}", i % 3, i)).collect();
        let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        let (engine, disk) = engine(&key_refs, 1000);

        let mut all = Vec::new();
        let mut marker = String::new();
        loop {
            let page = engine.list_objects("photos", "", &marker, "", 10).await.unwrap();
            all.extend(page.objects.clone());
            match page.next_marker {
                Some(next) if page.is_truncated => marker = next,
                _ => break,
            }
        }

        let mut expected = keys.clone();
        expected.sort();
        assert_eq!(all, expected);
        // One listing for the root and one per directory, never repeated
        assert_eq!(disk.list_calls(), 4);
        assert!(engine.pool().is_empty().await);
    }

    #[tokio::test]
    async fn test_fresh_walk_when_nothing_parked() {
        let (engine, _) = engine(&["a", "b", "c", "d"], 1000);
        let page = engine.list_objects("photos", "", "b", "", 1000).await.unwrap();
        assert_eq!(page.objects, vec!["c", "d"]);
        assert!(!page.is_truncated);
    }

    #[tokio::test]
    async fn test_max_keys_clamped_to_page_size() {
        let (engine, _) = engine(&["a", "b", "c", "d", "e"], 2);

        let page = engine.list_objects("photos", "", "", "", -1).await.unwrap();
        assert_eq!(page.objects, vec!["a", "b"]);
        assert!(page.is_truncated);
        assert_eq!(page.next_marker.as_deref(), Some("b"));

        let page = engine.list_objects("photos", "", "b", "", 500).await.unwrap();
        assert_eq!(page.objects, vec!["c", "d"]);
    }

    #[tokio::test]
    async fn test_argument_validation() {
        let (engine, _) = engine(&["a"], 1000);

        assert!(matches!(
            engine.list_objects("photos", "", "", ",", 10).await,
            Err(Error::UnsupportedDelimiter(_))
        ));
        assert!(matches!(
            engine.list_objects("photos", "x/", "a", "", 10).await,
            Err(Error::InvalidMarkerPrefix { .. })
        ));
        assert_eq!(
            engine.list_objects("photos", "", "", "", 0).await.unwrap(),
            ListObjectsInfo::default()
        );
        assert_eq!(
            engine.list_objects("photos", "/", "", "/", 10).await.unwrap(),
            ListObjectsInfo::default()
        );
    }

    #[tokio::test]
    async fn test_error_mapping() {
        let (engine, disk) = engine(&["a"], 1000);

        assert!(matches!(
            engine.list_objects("missing", "", "", "", 10).await,
            Err(Error::BucketNotFound(ref b)) if b == "missing"
        ));
        assert_eq!(
            engine.list_objects("photos", "nope/", "", "", 10).await.unwrap(),
            ListObjectsInfo::default()
        );

        disk.set_fault(Some(StorageError::Io("controller reset".into())));
        let err = engine.list_objects("photos", "", "", "", 10).await.unwrap_err();
        assert_eq!(err.storage_cause(), Some(&StorageError::Io("controller reset".into())));
    }

    #[tokio::test]
    async fn test_xl_layout_listing() {
        let disk: Arc<dyn StorageApi> = Arc::new(MemoryDisk::with_keys(
            "m1",
            "photos",
            ["a/xl.json", "a-b/xl.json", "c/d/xl.json"],
        ));
        let disks = vec![Some(disk)];
        let is_leaf = marker_file_leaf(disks.clone(), XL_META_FILE);
        let engine = ListingEngine::new(disks, is_leaf, &config(1000));

        let page = engine.list_objects("photos", "", "", "", 1000).await.unwrap();
        assert_eq!(page.objects, vec!["a", "a-b", "c/d"]);

        let page = engine.list_objects("photos", "", "", "/", 1000).await.unwrap();
        assert_eq!(page.objects, vec!["a", "a-b"]);
        assert_eq!(page.prefixes, vec!["c/"]);
    }
}
