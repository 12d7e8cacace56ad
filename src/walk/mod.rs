//! Tree Walk Module
//!
//! Lexicographic, marker-resumable enumeration of keys stored as nested
//! directory entries across one or more storage nodes.
//!
//! A walk runs as a single producer task feeding a bounded channel:
//!
//! - [`DirectoryLister`] lists one level with node failover
//! - [`start_tree_walk`] splits prefix and marker and spawns the producer
//! - [`TreeWalk`] is the consumer handle with cancellation
//! - [`TreeWalkPool`] parks unfinished walks between pages

mod filter;
mod lister;
mod pool;
mod session;
mod tree;

pub use filter::{delay_is_leaf_check, filter_matching_prefix, path_join, split_marker};
pub use lister::DirectoryLister;
pub use pool::{ListParams, TreeWalkPool, DEFAULT_POOL_TIMEOUT};
pub use session::{start_tree_walk, TreeWalk};
pub use tree::TreeWalkResult;
