//! Storage engine - persistence, id allocation, cache and index upkeep.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, trace};

use crate::cache::CacheProvider;
use crate::common::config::INDEX_EXTENSION;
use crate::common::{AttributeMap, Config, DocumentId, Error, Result, Value};
use crate::document::DocumentType;
use crate::index::Index;
use crate::query::Operator;
use crate::schema::Schema;
use crate::storage::registry::{CacheSlot, TypeState};
use crate::storage::StorageStats;

/// The registry and persistence layer for every document type.
///
/// # Architecture
/// ```text
/// ┌───────────────────────────────────────────────────────────────┐
/// │                        StorageEngine                          │
/// │  types: name ──▶ TypeState                                    │
/// │  ┌─────────────────────────────────────────────────────────┐  │
/// │  │ TypeState                                               │  │
/// │  │  read_lock / write_lock     codec     high_water        │  │
/// │  │  cache: CacheSlot           indexes: column ──▶ Index   │  │
/// │  └─────────────────────────────────────────────────────────┘  │
/// └───────────────────────────────────────────────────────────────┘
///
/// <data-root>/<type>/documents/<id>.<ext>
/// <data-root>/<type>/indexes/<column>.index
/// ```
///
/// # Thread Safety
/// Cloning is cheap and every clone shares the same registry. Operations
/// on one type are serialized by that type's locks; different types never
/// block each other. A `retrieve` refills the cache after releasing the
/// read lock, so a read racing a concurrent `store` may briefly re-cache
/// the older copy.
#[derive(Clone)]
pub struct StorageEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    config: Config,
    types: RwLock<HashMap<String, Arc<TypeState>>>,
    stats: StorageStats,
}

impl StorageEngine {
    /// Create an engine rooted at `config.data_root`.
    ///
    /// Nothing touches the disk until a document or index is written.
    pub fn new(config: Config) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                config,
                types: RwLock::new(HashMap::new()),
                stats: StorageStats::new(),
            }),
        }
    }

    /// Engine configured from the environment (see [`Config::from_env`]).
    pub fn from_env() -> Self {
        Self::new(Config::from_env())
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn stats(&self) -> &StorageStats {
        &self.inner.stats
    }

    // ========================================================================
    // Type registry
    // ========================================================================

    /// Register a document type.
    ///
    /// Engine and cache settings missing from the schema are taken from the
    /// engine's [`Config`].
    ///
    /// # Errors
    /// - `Error::DuplicateType` if the name is already registered
    /// - `Error::InvalidEngine` / `Error::InvalidCacheProvider` /
    ///   `Error::InvalidCacheSize` for bad configuration values
    pub fn register(&self, schema: Schema) -> Result<DocumentType> {
        let config = &self.inner.config;
        let engine = match schema.engine() {
            Some(kind) => kind,
            None => config.engine.parse()?,
        };
        let provider = match schema.cache_provider() {
            Some(provider) => provider,
            None => config.cache_provider.parse()?,
        };
        let cache_size = schema.cache_size().unwrap_or(config.cache_size);
        let slot = CacheSlot::new(provider, cache_size)?;

        let mut types = self.inner.types.write();
        if types.contains_key(schema.name()) {
            return Err(Error::DuplicateType(schema.name().to_string()));
        }

        info!(
            doc_type = %schema.name(),
            engine = %engine,
            cache = %provider,
            cache_size,
            "registered document type"
        );
        let name = schema.name().to_string();
        let state = Arc::new(TypeState::new(schema, engine.codec(), &config.data_root, slot));
        types.insert(name, Arc::clone(&state));

        Ok(DocumentType::new(self.clone(), state))
    }

    /// Handle for an already registered type.
    pub fn doc_type(&self, name: &str) -> Option<DocumentType> {
        let types = self.inner.types.read();
        types
            .get(name)
            .map(|state| DocumentType::new(self.clone(), Arc::clone(state)))
    }

    /// Names of all registered types, sorted.
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.types.read().keys().cloned().collect();
        names.sort();
        names
    }

    // ========================================================================
    // Documents
    // ========================================================================

    /// Canonical path of a (possibly not yet written) document. No I/O.
    pub fn file_path(&self, ty: &DocumentType, id: DocumentId) -> PathBuf {
        let state = ty.state();
        state
            .documents_dir()
            .join(format!("{}.{}", id, state.codec.extension()))
    }

    /// Whether a persisted record exists for `id`.
    pub fn exists(&self, ty: &DocumentType, id: DocumentId) -> bool {
        self.file_path(ty, id).is_file()
    }

    /// Persist `data` as document `id`, update every indexed column and
    /// refresh the cache entry. Runs under the type's write lock.
    ///
    /// Storing an id above the type's high-water mark raises the mark, so
    /// [`StorageEngine::next_id`] never hands that id out again.
    ///
    /// # Errors
    /// Codec and I/O errors. On error the cache is left untouched.
    pub fn store(&self, ty: &DocumentType, id: DocumentId, data: &AttributeMap) -> Result<()> {
        let state = ty.state();
        let path = self.file_path(ty, id);
        let bytes = state.codec.encode(data)?;

        let _write = state.write_lock.lock();
        let _read = state.read_lock.lock();

        self.write_document(&path, &bytes)?;
        self.inner.stats.documents_written.fetch_add(1, Ordering::Relaxed);
        {
            // Unscanned types pick the new file up on their first scan
            let mut high_water = state.high_water.lock();
            if let Some(current) = *high_water {
                *high_water = Some(current.max(id.0));
            }
        }

        for (column, _) in state.schema.indexed_columns() {
            self.reassign_locked(ty, column, id, data.get(column))?;
        }

        let mut slot = state.lock_cache();
        if let Some(cache) = slot.cache_mut() {
            cache.store(id, data.clone());
        }

        debug!(doc_type = %state.name(), id = %id, bytes = bytes.len(), "stored document");
        Ok(())
    }

    /// Load document `id`, from cache when `use_cache` allows it.
    ///
    /// The result is always an independent copy; mutating it never affects
    /// the cached entry. A read from durable storage refills the cache.
    ///
    /// # Errors
    /// - `Error::NoSuchDocument` if no file exists for `id`
    /// - `Error::CorruptDocument` if the file cannot be decoded
    /// - `Error::Io` for other read failures
    pub fn retrieve(
        &self,
        ty: &DocumentType,
        id: DocumentId,
        use_cache: bool,
    ) -> Result<AttributeMap> {
        let state = ty.state();

        if use_cache {
            let mut slot = state.lock_cache();
            if let Some(hit) = slot.cache_mut().and_then(|cache| cache.retrieve(&id)) {
                trace!(doc_type = %state.name(), id = %id, "cache hit");
                return Ok(hit);
            }
        }

        let data = {
            let _read = state.read_lock.lock();
            self.read_document(ty, id)?
        };

        let mut slot = state.lock_cache();
        if let Some(cache) = slot.cache_mut() {
            cache.store(id, data.clone());
        }
        Ok(data)
    }

    /// Remove document `id` with its cache entry and index associations.
    ///
    /// # Errors
    /// `Error::NoSuchDocument` if nothing is persisted for `id`.
    pub fn delete(&self, ty: &DocumentType, id: DocumentId) -> Result<()> {
        let state = ty.state();
        let path = self.file_path(ty, id);

        let _write = state.write_lock.lock();
        let _read = state.read_lock.lock();

        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::NoSuchDocument {
                    doc_type: state.name().to_string(),
                    id,
                });
            }
            Err(e) => return Err(e.into()),
        }
        self.inner.stats.documents_deleted.fetch_add(1, Ordering::Relaxed);

        for (column, _) in state.schema.indexed_columns() {
            self.reassign_locked(ty, column, id, None)?;
        }
        if let Some(cache) = state.lock_cache().cache_mut() {
            cache.invalidate(&id);
        }

        debug!(doc_type = %state.name(), id = %id, "deleted document");
        Ok(())
    }

    /// Allocate the next id for a type.
    ///
    /// The first call scans durable storage for the highest id; later calls
    /// continue from the in-memory high-water mark, so ids are never reused
    /// even if files are removed behind the engine's back.
    pub fn next_id(&self, ty: &DocumentType) -> Result<DocumentId> {
        let state = ty.state();

        let _write = state.write_lock.lock();
        let _read = state.read_lock.lock();

        let mut high_water = state.high_water.lock();
        let current = match *high_water {
            Some(current) => current,
            None => self
                .scan_ids(state)?
                .last()
                .map_or(0, |highest| highest.0),
        };
        let next = DocumentId::new(current).next();
        *high_water = Some(next.0);

        self.inner.stats.ids_allocated.fetch_add(1, Ordering::Relaxed);
        debug!(doc_type = %state.name(), id = %next, "allocated id");
        Ok(next)
    }

    /// Every persisted id of a type, ascending. Reads the whole directory.
    pub fn list_all(&self, ty: &DocumentType) -> Result<Vec<DocumentId>> {
        let state = ty.state();
        let _read = state.read_lock.lock();
        self.scan_ids(state)
    }

    // ========================================================================
    // Cache administration
    // ========================================================================

    /// Swap the cache implementation of a type, keeping its size.
    /// The previous cache contents are discarded.
    pub fn set_cache_provider(&self, ty: &DocumentType, provider: CacheProvider) -> Result<()> {
        let mut slot = ty.state().lock_cache();
        let size = slot.max_size();
        *slot = CacheSlot::new(provider, size)?;
        Ok(())
    }

    /// Resize the cache of a type, keeping its provider.
    /// The previous cache contents are discarded.
    pub fn set_cache_size(&self, ty: &DocumentType, size: usize) -> Result<()> {
        let mut slot = ty.state().lock_cache();
        let provider = slot.provider();
        *slot = CacheSlot::new(provider, size)?;
        Ok(())
    }

    // ========================================================================
    // Indexes
    // ========================================================================

    /// The index for `column`, opened (and created) on first use.
    ///
    /// # Errors
    /// `Error::InvalidInput` if `column` is not a declared attribute.
    pub fn index(&self, ty: &DocumentType, column: &str) -> Result<Arc<Mutex<Index>>> {
        let state = ty.state();
        if !state.schema.has_attribute(column) {
            return Err(Error::InvalidInput(format!(
                "'{}' has no attribute '{}'",
                state.name(),
                column
            )));
        }

        let mut indexes = state.indexes.lock();
        if let Some(index) = indexes.get(column) {
            return Ok(Arc::clone(index));
        }

        let path = state
            .indexes_dir()
            .join(format!("{}.{}", column, INDEX_EXTENSION));
        let index = Index::open(&path, column, self.inner.config.sync_writes)?;
        debug!(doc_type = %state.name(), column, path = %path.display(), "opened index");

        let index = Arc::new(Mutex::new(index));
        indexes.insert(column.to_string(), Arc::clone(&index));
        Ok(index)
    }

    /// Associate `id` with `value` in the column's index (or with nothing).
    pub fn index_update(
        &self,
        ty: &DocumentType,
        column: &str,
        id: DocumentId,
        value: Option<&Value>,
    ) -> Result<()> {
        let state = ty.state();
        let _write = state.write_lock.lock();
        let _read = state.read_lock.lock();
        self.reassign_locked(ty, column, id, value)
    }

    /// Ids whose `column` value satisfies `<op> value`.
    pub fn index_lookup(
        &self,
        ty: &DocumentType,
        column: &str,
        value: &Value,
        op: Operator,
    ) -> Result<Vec<DocumentId>> {
        let index = self.index(ty, column)?;
        let _read = ty.state().read_lock.lock();
        let ids = index.lock().query(value, op)?;
        Ok(ids)
    }

    /// Prune every indexed column of a type. Returns the keys removed.
    pub fn prune_indexes(&self, ty: &DocumentType) -> Result<usize> {
        let state = ty.state();
        let _write = state.write_lock.lock();
        let _read = state.read_lock.lock();

        let mut pruned = 0;
        for (column, _) in state.schema.indexed_columns() {
            pruned += self.index(ty, column)?.lock().prune()?;
        }
        Ok(pruned)
    }

    // ========================================================================
    // Internal helpers (callers hold the type locks)
    // ========================================================================

    fn reassign_locked(
        &self,
        ty: &DocumentType,
        column: &str,
        id: DocumentId,
        value: Option<&Value>,
    ) -> Result<()> {
        let index = self.index(ty, column)?;
        index.lock().reassign(id, value)?;
        self.inner.stats.index_updates.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn write_document(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        if self.inner.config.sync_writes {
            file.sync_all()?;
        }
        drop(file);
        fs::rename(&tmp, path)?;
        Ok(())
    }

    fn read_document(&self, ty: &DocumentType, id: DocumentId) -> Result<AttributeMap> {
        let state = ty.state();
        let path = self.file_path(ty, id);

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::NoSuchDocument {
                    doc_type: state.name().to_string(),
                    id,
                });
            }
            Err(e) => return Err(e.into()),
        };
        self.inner.stats.documents_read.fetch_add(1, Ordering::Relaxed);

        let data = state
            .codec
            .decode(&bytes)
            .map_err(|e| Error::CorruptDocument {
                doc_type: state.name().to_string(),
                id,
                reason: e.to_string(),
            })?;
        trace!(doc_type = %state.name(), id = %id, "read document from disk");
        Ok(data)
    }

    fn scan_ids(&self, state: &TypeState) -> Result<Vec<DocumentId>> {
        let dir = state.documents_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let extension = state.codec.extension();
        let mut ids = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(extension) {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<DocumentId>().ok())
            {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

impl std::fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine")
            .field("data_root", &self.inner.config.data_root)
            .field("types", &self.type_names())
            .finish()
    }
}
