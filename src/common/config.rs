//! Configuration for flatdoc.
//!
//! # Example
//!
//! ```
//! use flatdoc::Config;
//!
//! // Explicit data root (tests, embedding)
//! let config = Config::with_data_root("/tmp/flatdoc-example");
//! assert_eq!(config.cache_size, flatdoc::common::config::DEFAULT_CACHE_SIZE);
//!
//! // Resolved from FLATDOC_DATA, falling back to ~/.flatdoc/data
//! let _config = Config::from_env();
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Environment variable naming the data root directory.
pub const DATA_ROOT_ENV: &str = "FLATDOC_DATA";

/// Default number of documents cached per type.
pub const DEFAULT_CACHE_SIZE: usize = 100;

/// Default storage engine name.
pub const DEFAULT_ENGINE: &str = "json";

/// Default cache provider name.
pub const DEFAULT_CACHE_PROVIDER: &str = "lru";

/// Directory holding a type's document files.
pub const DOCUMENTS_DIR: &str = "documents";

/// Directory holding a type's index files.
pub const INDEXES_DIR: &str = "indexes";

/// File extension of index files.
pub const INDEX_EXTENSION: &str = "index";

/// Engine-wide configuration.
///
/// Engine, cache provider and cache size are defaults; each document type may
/// override them in its schema. Names are parsed when a type is registered,
/// so a bad name surfaces as a configuration error before any document exists.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Root directory for all document types.
    #[serde(default = "default_data_root")]
    pub data_root: PathBuf,

    /// Storage engine name (`json`, `json-pretty`, `yaml`).
    #[serde(default = "default_engine")]
    pub engine: String,

    /// Cache provider name (`lru`, `rr`, `none`).
    #[serde(default = "default_cache_provider")]
    pub cache_provider: String,

    /// Maximum number of cached documents per type.
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,

    /// fsync document and index files after every write.
    #[serde(default)]
    pub sync_writes: bool,
}

fn default_data_root() -> PathBuf {
    if let Some(root) = std::env::var_os(DATA_ROOT_ENV) {
        return PathBuf::from(root);
    }
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".flatdoc")
        .join("data")
}

fn default_engine() -> String {
    DEFAULT_ENGINE.to_string()
}

fn default_cache_provider() -> String {
    DEFAULT_CACHE_PROVIDER.to_string()
}

fn default_cache_size() -> usize {
    DEFAULT_CACHE_SIZE
}

impl Config {
    /// Configuration with the data root resolved from the environment.
    pub fn from_env() -> Self {
        Self::with_data_root(default_data_root())
    }

    /// Configuration rooted at an explicit directory.
    pub fn with_data_root<P: AsRef<Path>>(data_root: P) -> Self {
        Self {
            data_root: data_root.as_ref().to_path_buf(),
            engine: default_engine(),
            cache_provider: default_cache_provider(),
            cache_size: DEFAULT_CACHE_SIZE,
            sync_writes: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_data_root() {
        let config = Config::with_data_root("/var/lib/flatdoc");
        assert_eq!(config.data_root, PathBuf::from("/var/lib/flatdoc"));
        assert_eq!(config.engine, "json");
        assert_eq!(config.cache_provider, "lru");
        assert_eq!(config.cache_size, 100);
        assert!(!config.sync_writes);
    }

    #[test]
    fn test_deserialize_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"data_root": "/srv/docs", "cache_size": 8}"#).unwrap();
        assert_eq!(config.data_root, PathBuf::from("/srv/docs"));
        assert_eq!(config.cache_size, 8);
        assert_eq!(config.engine, DEFAULT_ENGINE);
    }
}
