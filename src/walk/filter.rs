//! Entry batch helpers
//!
//! Pure functions over sorted directory listings: prefix trimming, the
//! deferred leaf check, marker splitting and path joining.

use crate::storage::SLASH_SEPARATOR;

const SLASH: u8 = b'/';

/// Return the run of `entries` starting with `prefix_entry`.
///
/// `entries` must be sorted so that matches are contiguous. The scan moves
/// inward from both ends; an empty prefix matches the whole slice.
pub fn filter_matching_prefix<'a>(entries: &'a [String], prefix_entry: &str) -> &'a [String] {
    let mut start = 0;
    let mut end = entries.len();

    while start < end && !entries[start].starts_with(prefix_entry) {
        start += 1;
    }
    while start < end && !entries[end - 1].starts_with(prefix_entry) {
        end -= 1;
    }

    &entries[start..end]
}

/// Whether leaf classification can wait until an entry is emitted.
///
/// Listings mark directories with a trailing `/`, and stripping it from
/// leaves can reorder a batch. With `["a-b/", "a/"]` both objects, the
/// sorted order after stripping is `["a", "a-b"]`. That only happens when
/// some byte below `/` in one entry lines up with a `/` in the next entry,
/// so if no adjacent pair has that shape the current order already holds.
pub fn delay_is_leaf_check(entries: &[String]) -> bool {
    entries.windows(2).all(|pair| {
        let (current, next) = (pair[0].as_bytes(), pair[1].as_bytes());
        !current
            .iter()
            .enumerate()
            .any(|(j, &b)| b < SLASH && next.get(j) == Some(&SLASH))
    })
}

/// Split a marker into its first path segment and the remainder.
///
/// `"four/five.txt"` becomes `("four/", "five.txt")`; a marker without a
/// separator is all directory part with an empty base.
pub fn split_marker(marker: &str) -> (String, String) {
    match marker.split_once(SLASH_SEPARATOR) {
        Some((dir, base)) => (format!("{}{}", dir, SLASH_SEPARATOR), base.to_string()),
        None => (marker.to_string(), String::new()),
    }
}

/// Join a directory (empty or ending in `/`) with an entry name
pub fn path_join(dir: &str, entry: &str) -> String {
    if dir.is_empty() {
        entry.to_string()
    } else if dir.ends_with(SLASH_SEPARATOR) {
        format!("{}{}", dir, entry)
    } else {
        format!("{}{}{}", dir, SLASH_SEPARATOR, entry)
    }
}
