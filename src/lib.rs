//! WolfList - Distributed Object Listing Engine
//!
//! Enumerates the keys of a bucket in lexicographic order, optionally
//! recursing into nested directories, and streams them through a bounded
//! channel so a caller can serve paginated listings without holding the
//! whole key set in memory.
//!
//! # Architecture
//!
//! Keys live as nested directory entries on one or more storage nodes.
//! A walk runs as one producer task that lists a directory level at a
//! time, failing over between nodes, and emits keys depth-first in sorted
//! order. The consumer drains pages from the stream and can cancel the
//! walk at any point.
//!
//! # Features
//!
//! - Marker-resumable recursive and delimited listings
//! - Failover across storage nodes on node-unavailable errors
//! - Pluggable leaf detection for plain and sharded layouts
//! - Deferred leaf classification when it cannot change sort order
//! - Pooling of unfinished walks between pages

pub mod config;
pub mod error;
pub mod listing;
pub mod storage;
pub mod walk;

pub use config::WolfListConfig;
pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::WolfListConfig;
    pub use crate::error::{Error, ListingError, Result, StorageError};
    pub use crate::listing::{ListObjectsInfo, ListingEngine};
    pub use crate::storage::{IsLeafFn, MemoryDisk, PosixDisk, StorageApi};
    pub use crate::walk::{start_tree_walk, DirectoryLister, TreeWalk, TreeWalkResult};
}
