//! HTTP cache settings handed to the transport

use imgbind_types::CachePolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings for caching downloaded images
///
/// The cache itself belongs to the HTTP layer; these values only describe
/// how it should be sized and consulted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity_bytes: u64,
    #[serde(default = "default_disk_capacity")]
    pub disk_capacity_bytes: u64,
    #[serde(default)]
    pub request_cache_policy: CachePolicy,
    /// Subdirectory of the user cache directory holding the on-disk cache
    #[serde(default = "default_disk_path")]
    pub disk_path: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_capacity_bytes: default_memory_capacity(),
            disk_capacity_bytes: default_disk_capacity(),
            request_cache_policy: CachePolicy::default(),
            disk_path: default_disk_path(),
        }
    }
}

impl CacheConfig {
    /// Absolute directory for the on-disk cache
    ///
    /// Falls back to the temp directory when the platform has no cache dir.
    #[must_use]
    pub fn disk_cache_dir(&self) -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(&self.disk_path)
    }
}

fn default_memory_capacity() -> u64 {
    20 * 1024 * 1024 // 20 MiB
}

fn default_disk_capacity() -> u64 {
    100 * 1024 * 1024 // 100 MiB
}

fn default_disk_path() -> String {
    "imgbind".to_string()
}
