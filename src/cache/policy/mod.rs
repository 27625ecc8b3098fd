//! Eviction policy implementations.
//!
//! A policy only decides *which* key leaves the cache when a new key needs
//! room. Recency bookkeeping, counters and storage are shared by every
//! policy and live in [`crate::cache::Cache`].
//!
//! - [`LruPolicy`] - evicts the least recently touched key
//! - [`RandomPolicy`] - evicts a uniformly random key

mod lru;
mod random;

use std::collections::VecDeque;

pub use lru::LruPolicy;
pub use random::RandomPolicy;

/// Strategy for choosing an eviction victim.
///
/// `keys` is ordered from least to most recently touched. Implementations
/// return the position of the victim, or `None` when `keys` is empty.
pub trait EvictionPolicy<K>: Send {
    /// Short policy name for logging.
    fn name(&self) -> &'static str;

    /// Pick the position in `keys` of the entry to evict.
    fn select_victim(&mut self, keys: &VecDeque<K>) -> Option<usize>;
}
