//! Storage layer - durable documents and per-type bookkeeping.
//!
//! - [`StorageEngine`] - registry, locking, persistence, id allocation
//! - [`Codec`] / [`EngineKind`] - pluggable document encodings
//! - [`StorageStats`] - I/O counters

mod codec;
mod engine;
pub(crate) mod registry;
mod stats;

pub use codec::{Codec, EngineKind, JsonCodec, YamlCodec};
pub use engine::StorageEngine;
pub use registry::{CacheSlot, DocumentCache};
pub use stats::{StorageStats, StorageStatsSnapshot};
