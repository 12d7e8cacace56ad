//! WolfList Configuration
//!
//! This module provides configuration structures for the WolfList
//! listing engine and its command line front end.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default number of entries per listing page
pub const MAX_OBJECT_LIST: usize = 1000;

/// Main WolfList configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WolfListConfig {
    /// Node-specific configuration
    pub node: NodeConfig,

    /// Storage node configuration
    pub storage: StorageConfig,

    /// Listing behaviour
    #[serde(default)]
    pub listing: ListingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Node-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Unique node identifier
    pub id: String,
}

/// On-disk layout of the storage nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// Plain files, one file per object
    Fs,
    /// Sharded layout, one directory per object holding a metadata file
    Xl,
}

/// What the listing enumerates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    /// Stored objects
    Objects,
    /// In-progress multipart uploads
    Uploads,
}

/// Storage node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Disk roots, tried in this order when listing
    pub disks: Vec<PathBuf>,

    /// Layout of data on the disks
    #[serde(default = "default_layout")]
    pub layout: Layout,

    /// Listing target
    #[serde(default = "default_kind")]
    pub kind: ListingKind,
}

/// Listing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Maximum entries per page, also the walk channel capacity
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Seconds a paused walk is kept for the next page
    #[serde(default = "default_pool_timeout_secs")]
    pub pool_timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (pretty, compact)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_layout() -> Layout {
    Layout::Fs
}

fn default_kind() -> ListingKind {
    ListingKind::Objects
}

fn default_page_size() -> usize {
    MAX_OBJECT_LIST
}

fn default_pool_timeout_secs() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            pool_timeout_secs: default_pool_timeout_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl ListingConfig {
    /// Get the pool timeout as Duration
    pub fn pool_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_timeout_secs)
    }
}

impl WolfListConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> crate::Result<Self> {
        let config: WolfListConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.node.id.is_empty() {
            return Err(crate::Error::Config("node.id cannot be empty".into()));
        }

        if self.storage.disks.is_empty() {
            return Err(crate::Error::Config("storage.disks cannot be empty".into()));
        }

        if self.listing.page_size == 0 {
            return Err(crate::Error::Config("listing.page_size must be positive".into()));
        }

        match self.logging.format.as_str() {
            "pretty" | "compact" => {}
            other => {
                return Err(crate::Error::Config(format!(
                    "logging.format must be pretty or compact, got {}",
                    other
                )))
            }
        }

        Ok(())
    }
}
