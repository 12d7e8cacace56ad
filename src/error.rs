//! WolfList Error Types

use thiserror::Error;

/// Result type alias for WolfList operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by a single storage node
///
/// This is a closed set of kinds; failover decisions are made on the
/// variant, never on the message text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("file not found")]
    FileNotFound,

    #[error("volume not found")]
    VolumeNotFound,

    #[error("disk not found")]
    DiskNotFound,

    #[error("disk access denied")]
    DiskAccessDenied,

    #[error("disk is faulty")]
    FaultyDisk,

    #[error("I/O error: {0}")]
    Io(String),
}

impl StorageError {
    /// Check if a tree walk may skip this node and try the next one
    pub fn is_walk_ignorable(&self) -> bool {
        matches!(
            self,
            StorageError::FileNotFound
                | StorageError::VolumeNotFound
                | StorageError::DiskNotFound
                | StorageError::DiskAccessDenied
                | StorageError::FaultyDisk
        )
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::FileNotFound,
            std::io::ErrorKind::PermissionDenied => StorageError::DiskAccessDenied,
            _ => StorageError::Io(e.to_string()),
        }
    }
}

/// A directory listing that could not be served by any node
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("listing {bucket}/{path} failed: {source}")]
pub struct ListingError {
    pub bucket: String,
    pub path: String,
    #[source]
    pub source: StorageError,
}

/// WolfList error types
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    // Listing errors
    #[error(transparent)]
    Listing(#[from] ListingError),

    #[error("Tree walk aborted")]
    WalkAborted,

    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    #[error("Unsupported delimiter: {0:?}")]
    UnsupportedDelimiter(String),

    #[error("Marker {marker:?} does not start with prefix {prefix:?}")]
    InvalidMarkerPrefix { marker: String, prefix: String },

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Check if this error was caused by cancellation rather than a failure
    pub fn is_aborted(&self) -> bool {
        matches!(self, Error::WalkAborted)
    }

    /// The storage error underneath a failed listing, if any
    pub fn storage_cause(&self) -> Option<&StorageError> {
        match self {
            Error::Listing(e) => Some(&e.source),
            _ => None,
        }
    }
}
