//! Tree Walker
//!
//! Depth-first, marker-resumable walk over one bucket. Every directory
//! level lists its entries once, skips what a previous page already
//! delivered, and either emits entries or recurses into sub-directories.

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::filter::{path_join, split_marker};
use super::lister::DirectoryLister;
use crate::error::{Error, ListingError, Result};
use crate::storage::{IsLeafFn, SLASH_SEPARATOR};

/// One message on a walk's result stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeWalkResult {
    /// A key, with `end` set on the last key of the whole walk
    Entry { entry: String, end: bool },
    /// The walk failed; nothing follows this message
    Error(ListingError),
}

impl TreeWalkResult {
    /// The emitted key, if this is an entry
    pub fn entry(&self) -> Option<&str> {
        match self {
            TreeWalkResult::Entry { entry, .. } => Some(entry),
            TreeWalkResult::Error(_) => None,
        }
    }

    /// Whether this result closes the walk
    pub fn is_end(&self) -> bool {
        matches!(self, TreeWalkResult::Entry { end: true, .. })
    }
}

/// State shared by every recursion level of one walk
pub(crate) struct TreeWalker {
    pub(crate) bucket: String,
    pub(crate) recursive: bool,
    pub(crate) lister: Arc<DirectoryLister>,
    pub(crate) is_leaf: IsLeafFn,
    pub(crate) results: mpsc::Sender<TreeWalkResult>,
    pub(crate) cancel: CancellationToken,
}

impl TreeWalker {
    /// Walk `prefix_dir`, resuming after `marker`.
    ///
    /// If `prefix_dir` is `"one/two/three/"` and `marker` is
    /// `"four/five.txt"`, the walk recurses into `"one/two/three/four/"`
    /// with marker `"five.txt"`. `is_end` tells this level whether its
    /// parent has nothing after it, so the last emitted key can carry
    /// `end = true`.
    pub(crate) fn walk<'a>(
        &'a self,
        prefix_dir: String,
        entry_prefix_match: String,
        marker: String,
        is_end: bool,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            let (marker_dir, marker_base) = split_marker(&marker);

            if self.cancel.is_cancelled() {
                return Err(Error::WalkAborted);
            }

            let (entries, delay_is_leaf) = match self
                .lister
                .list(&self.bucket, &prefix_dir, &entry_prefix_match)
                .await
            {
                Ok(listed) => listed,
                Err(e) => {
                    self.send(TreeWalkResult::Error(e.clone())).await?;
                    return Err(e.into());
                }
            };

            // Everything sorting before the marker directory was delivered
            // by an earlier page.
            let skip = entries.partition_point(|e| e.as_str() < marker_dir.as_str());
            let entries = &entries[skip..];
            let last = entries.len().saturating_sub(1);

            for (i, entry) in entries.iter().enumerate() {
                let mut entry = entry.as_str();
                if delay_is_leaf && (self.is_leaf)(&self.bucket, &path_join(&prefix_dir, entry)) {
                    entry = entry.strip_suffix(SLASH_SEPARATOR).unwrap_or(entry);
                }
                let is_dir = entry.ends_with(SLASH_SEPARATOR);

                if i == 0 && entry == marker_dir {
                    // A non-recursive walk already listed the marker itself,
                    // and so did a recursive walk when the marker is a file.
                    // A directory marker still has to be walked into.
                    if !self.recursive || !is_dir {
                        continue;
                    }
                }

                if self.recursive && is_dir {
                    let marker_arg = if entry == marker_dir {
                        marker_base.clone()
                    } else {
                        String::new()
                    };
                    let mark_is_end = i == last && is_end;
                    self.walk(
                        path_join(&prefix_dir, entry),
                        String::new(),
                        marker_arg,
                        mark_is_end,
                    )
                    .await?;
                    continue;
                }

                let end = i == last && is_end;
                self.send(TreeWalkResult::Entry {
                    entry: path_join(&prefix_dir, entry),
                    end,
                })
                .await?;
            }

            Ok(())
        }
        .boxed()
    }

    /// Send one result, giving up if the walk is cancelled first
    async fn send(&self, result: TreeWalkResult) -> Result<()> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                trace!("Walk of {} cancelled", self.bucket);
                Err(Error::WalkAborted)
            }
            sent = self.results.send(result) => {
                // A dropped receiver means nobody is listening any more
                sent.map_err(|_| Error::WalkAborted)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::storage::{plain_object_leaf, MemoryDisk, StorageApi};
    use async_trait::async_trait;

    /// Node whose listing is interrupted by a cancel and then fails
    struct CancellingDisk {
        cancel: CancellationToken,
    }

    #[async_trait]
    impl StorageApi for CancellingDisk {
        fn id(&self) -> &str {
            "cancelling"
        }

        async fn list_dir(
            &self,
            _volume: &str,
            _dir_path: &str,
        ) -> std::result::Result<Vec<String>, StorageError> {
            self.cancel.cancel();
            Err(StorageError::Io("connection reset".into()))
        }

        fn has_file(&self, _volume: &str, _path: &str) -> bool {
            false
        }
    }

    fn walker(
        keys: &[&str],
        recursive: bool,
        capacity: usize,
    ) -> (TreeWalker, mpsc::Receiver<TreeWalkResult>) {
        let disk: Arc<dyn StorageApi> =
            Arc::new(MemoryDisk::with_keys("m1", "bucket", keys.iter().copied()));
        let is_leaf = plain_object_leaf();
        let (tx, rx) = mpsc::channel(capacity);
        let walker = TreeWalker {
            bucket: "bucket".to_string(),
            recursive,
            lister: Arc::new(DirectoryLister::new(is_leaf.clone(), vec![Some(disk)])),
            is_leaf,
            results: tx,
            cancel: CancellationToken::new(),
        };
        (walker, rx)
    }

    async fn drain(mut rx: mpsc::Receiver<TreeWalkResult>) -> Vec<TreeWalkResult> {
        let mut out = Vec::new();
        while let Some(result) = rx.recv().await {
            out.push(result);
        }
        out
    }

    fn entry(name: &str, end: bool) -> TreeWalkResult {
        TreeWalkResult::Entry {
            entry: name.to_string(),
            end,
        }
    }

    #[tokio::test]
    async fn test_walk_non_recursive() {
        let (walker, rx) = walker(&["a", "a-b/x", "b"], false, 100);
        walker
            .walk(String::new(), String::new(), String::new(), true)
            .await
            .unwrap();
        drop(walker);

        assert_eq!(
            drain(rx).await,
            vec![entry("a", false), entry("a-b/", false), entry("b", true)]
        );
    }

    #[tokio::test]
    async fn test_walk_recursive_resumes_inside_marker_dir() {
        let (walker, rx) = walker(&["one/a", "one/b/c", "one/b/d", "one/e", "two"], true, 100);
        walker
            .walk(String::new(), String::new(), "one/b/c".to_string(), true)
            .await
            .unwrap();
        drop(walker);

        assert_eq!(
            drain(rx).await,
            vec![entry("one/b/d", false), entry("one/e", false), entry("two", true)]
        );
    }

    #[tokio::test]
    async fn test_walk_sends_error_result() {
        let (walker, rx) = walker(&["a"], true, 100);
        let err = walker
            .walk("missing/".to_string(), String::new(), String::new(), true)
            .await
            .unwrap_err();
        drop(walker);

        assert!(matches!(err, Error::Listing(ref e) if e.source == StorageError::FileNotFound));
        let results = drain(rx).await;
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], TreeWalkResult::Error(_)));
    }

    #[tokio::test]
    async fn test_walk_aborts_when_cancelled() {
        let (walker, rx) = walker(&["a", "b", "c"], false, 1);
        walker.cancel.cancel();
        let err = walker
            .walk(String::new(), String::new(), String::new(), true)
            .await
            .unwrap_err();
        drop(walker);

        assert!(err.is_aborted());
        assert!(drain(rx).await.is_empty());
    }

    #[tokio::test]
    async fn test_walk_aborts_when_receiver_dropped() {
        let (walker, rx) = walker(&["a", "b", "c"], false, 1);
        drop(rx);
        let err = walker
            .walk(String::new(), String::new(), String::new(), true)
            .await
            .unwrap_err();
        assert!(err.is_aborted());
    }

    #[tokio::test]
    async fn test_error_dropped_when_cancelled_during_listing() {
        let cancel = CancellationToken::new();
        let disk: Arc<dyn StorageApi> = Arc::new(CancellingDisk {
            cancel: cancel.clone(),
        });
        let is_leaf = plain_object_leaf();
        let (tx, rx) = mpsc::channel(100);
        let walker = TreeWalker {
            bucket: "bucket".to_string(),
            recursive: true,
            lister: Arc::new(DirectoryLister::new(is_leaf.clone(), vec![Some(disk)])),
            is_leaf,
            results: tx,
            cancel,
        };

        let err = walker
            .walk(String::new(), String::new(), String::new(), true)
            .await
            .unwrap_err();
        drop(walker);

        assert!(err.is_aborted());
        assert!(drain(rx).await.is_empty());
    }
}
