//! Per-type state owned by the storage engine.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::cache::{Cache, CacheProvider};
use crate::common::config::{DOCUMENTS_DIR, INDEXES_DIR};
use crate::common::{AttributeMap, DocumentId, Result};
use crate::index::Index;
use crate::schema::Schema;
use crate::storage::Codec;

/// Cache type used for documents: id to attribute map.
pub type DocumentCache = Cache<DocumentId, AttributeMap>;

/// The cache slot of one type: provider, size and the live instance.
#[derive(Debug)]
pub struct CacheSlot {
    provider: CacheProvider,
    max_size: usize,
    cache: Option<DocumentCache>,
}

impl CacheSlot {
    pub(crate) fn new(provider: CacheProvider, max_size: usize) -> Result<Self> {
        Ok(Self {
            provider,
            max_size,
            cache: provider.build(max_size)?,
        })
    }

    pub fn provider(&self) -> CacheProvider {
        self.provider
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// The live cache, or `None` when caching is disabled.
    pub fn cache(&self) -> Option<&DocumentCache> {
        self.cache.as_ref()
    }

    pub fn cache_mut(&mut self) -> Option<&mut DocumentCache> {
        self.cache.as_mut()
    }
}

/// Everything the engine keeps for one registered type.
///
/// # Locks
/// ```text
/// write_lock ──▶ read_lock        writers always take both, in this order
///                read_lock        readers (retrieve, list, index lookups)
/// high_water, cache, indexes      short inner locks, never held across I/O
///                                 of another type
/// ```
/// Both type locks are exclusive, so at most one store/retrieve/id
/// allocation per type runs at a time.
pub(crate) struct TypeState {
    pub(crate) schema: Schema,
    pub(crate) codec: Box<dyn Codec>,
    pub(crate) root: PathBuf,
    pub(crate) read_lock: Mutex<()>,
    pub(crate) write_lock: Mutex<()>,
    /// Highest id handed out or seen on disk; `None` until the first scan.
    pub(crate) high_water: Mutex<Option<u64>>,
    pub(crate) cache: Mutex<CacheSlot>,
    pub(crate) indexes: Mutex<HashMap<String, Arc<Mutex<Index>>>>,
}

impl TypeState {
    pub(crate) fn new(
        schema: Schema,
        codec: Box<dyn Codec>,
        data_root: &std::path::Path,
        cache: CacheSlot,
    ) -> Self {
        let root = data_root.join(schema.dir_name());
        Self {
            schema,
            codec,
            root,
            read_lock: Mutex::new(()),
            write_lock: Mutex::new(()),
            high_water: Mutex::new(None),
            cache: Mutex::new(cache),
            indexes: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn name(&self) -> &str {
        self.schema.name()
    }

    pub(crate) fn documents_dir(&self) -> PathBuf {
        self.root.join(DOCUMENTS_DIR)
    }

    pub(crate) fn indexes_dir(&self) -> PathBuf {
        self.root.join(INDEXES_DIR)
    }

    pub(crate) fn lock_cache(&self) -> MutexGuard<'_, CacheSlot> {
        self.cache.lock()
    }
}
