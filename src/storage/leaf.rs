//! Leaf predicates
//!
//! A leaf is an entry that is a stored object rather than a directory of
//! further entries. What marks a leaf depends on the backend:
//!
//! - fs object listing: the entry is a plain file (no trailing `/`)
//! - fs multipart listing: the entry is a directory holding `uploads.json`
//! - xl object listing: the entry is a directory holding `xl.json`
//! - xl multipart listing: the entry is a directory holding `uploads.json`

use std::sync::Arc;

use super::{StorageApi, SLASH_SEPARATOR};
use crate::config::{Layout, ListingKind};

/// Metadata file marking an object directory in the xl layout
pub const XL_META_FILE: &str = "xl.json";

/// Metadata file marking a multipart upload directory
pub const UPLOADS_FILE: &str = "uploads.json";

/// Decides whether `(bucket, path)` names a leaf
pub type IsLeafFn = Arc<dyn Fn(&str, &str) -> bool + Send + Sync>;

/// Leaf predicate for plain file layouts
pub fn plain_object_leaf() -> IsLeafFn {
    Arc::new(|_bucket: &str, path: &str| !path.ends_with(SLASH_SEPARATOR))
}

/// Leaf predicate for directories carrying a metadata file.
///
/// The file is looked up on every online node in order; one hit is enough.
pub fn marker_file_leaf(disks: Vec<Option<Arc<dyn StorageApi>>>, marker: &str) -> IsLeafFn {
    let marker = marker.to_string();
    Arc::new(move |bucket: &str, path: &str| {
        if !path.ends_with(SLASH_SEPARATOR) {
            return false;
        }
        let meta_path = format!("{}{}", path, marker);
        disks
            .iter()
            .flatten()
            .any(|disk| disk.has_file(bucket, &meta_path))
    })
}

/// Pick the leaf predicate for a layout and listing target
pub fn leaf_for_layout(
    layout: Layout,
    kind: ListingKind,
    disks: Vec<Option<Arc<dyn StorageApi>>>,
) -> IsLeafFn {
    match (layout, kind) {
        (Layout::Fs, ListingKind::Objects) => plain_object_leaf(),
        (Layout::Xl, ListingKind::Objects) => marker_file_leaf(disks, XL_META_FILE),
        (_, ListingKind::Uploads) => marker_file_leaf(disks, UPLOADS_FILE),
    }
}
