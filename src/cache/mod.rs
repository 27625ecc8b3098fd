//! Cache engine.
//!
//! A bounded, per-type document cache in front of durable storage. The
//! cache is an optimization only: every storage operation is correct with
//! caching disabled, and a miss is never an error.
//!
//! # Components
//! - [`Cache`] - bounded store with shared recency bookkeeping
//! - [`policy`] - eviction strategies (LRU, random replacement)
//! - [`CacheStats`] - hit/miss/eviction counters
//! - [`CacheProvider`] - named provider selection for schemas and config

#[allow(clippy::module_inception)]
mod cache;
pub mod policy;
mod stats;

use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

pub use cache::Cache;
pub use stats::{CacheStats, CacheStatsSnapshot};

use crate::common::{Error, Result};

/// Which cache implementation a document type uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheProvider {
    /// Least-recently-used eviction.
    Lru,
    /// Uniformly random eviction.
    RandomReplacement,
    /// No caching; every retrieve reads durable storage.
    Disabled,
}

impl CacheProvider {
    /// Build a cache for this provider, or `None` when caching is disabled.
    ///
    /// # Errors
    /// `Error::InvalidCacheSize` if `max_size` is 0.
    pub fn build<K, V>(self, max_size: usize) -> Result<Option<Cache<K, V>>>
    where
        K: Eq + Hash + Clone + fmt::Debug + Send + 'static,
        V: Clone,
    {
        match self {
            CacheProvider::Lru => Cache::lru(max_size).map(Some),
            CacheProvider::RandomReplacement => Cache::random(max_size).map(Some),
            CacheProvider::Disabled => Ok(None),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CacheProvider::Lru => "lru",
            CacheProvider::RandomReplacement => "rr",
            CacheProvider::Disabled => "none",
        }
    }
}

impl FromStr for CacheProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "lru" => Ok(CacheProvider::Lru),
            "rr" | "random" => Ok(CacheProvider::RandomReplacement),
            "none" | "disabled" => Ok(CacheProvider::Disabled),
            _ => Err(Error::InvalidCacheProvider(s.to_string())),
        }
    }
}

impl fmt::Display for CacheProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
