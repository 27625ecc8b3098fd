//! Handle for a registered document type.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::cache::{CacheProvider, CacheStatsSnapshot};
use crate::common::{DocumentId, Result, Value};
use crate::document::{Document, DocumentCollection, LoadMode};
use crate::index::Index;
use crate::query::Operator;
use crate::schema::Schema;
use crate::storage::registry::TypeState;
use crate::storage::{CacheSlot, StorageEngine};

/// A registered document type: its schema plus the engine that stores it.
///
/// Cheap to clone; every clone refers to the same per-type state.
///
/// # Example
/// ```no_run
/// use flatdoc::schema::{Attribute, Schema};
/// use flatdoc::{Config, StorageEngine};
///
/// let engine = StorageEngine::new(Config::from_env());
/// let users = engine
///     .register(
///         Schema::builder("users")
///             .attribute("email", Attribute::string().unique().indexed())
///             .build()
///             .unwrap(),
///     )
///     .unwrap();
///
/// let user = users.create().unwrap();
/// user.set("email", "ada@example.com").unwrap(); // indexed: commits immediately
/// let found = users.filter("email", "ada@example.com", "==").unwrap();
/// assert_eq!(found.ids(), vec![user.id()]);
/// ```
#[derive(Clone)]
pub struct DocumentType {
    engine: StorageEngine,
    state: Arc<TypeState>,
}

impl DocumentType {
    pub(crate) fn new(engine: StorageEngine, state: Arc<TypeState>) -> Self {
        Self { engine, state }
    }

    pub(crate) fn state(&self) -> &TypeState {
        &self.state
    }

    pub fn name(&self) -> &str {
        self.state.schema.name()
    }

    pub fn schema(&self) -> &Schema {
        &self.state.schema
    }

    pub fn storage(&self) -> &StorageEngine {
        &self.engine
    }

    /// A new, uncommitted document with a freshly allocated id.
    pub fn create(&self) -> Result<Document> {
        Document::create(self)
    }

    /// An existing document, loaded on first attribute access.
    pub fn load(&self, id: DocumentId) -> Result<Document> {
        Document::open(self, id, LoadMode::Lazy)
    }

    /// Alias for [`DocumentType::load`].
    pub fn get(&self, id: DocumentId) -> Result<Document> {
        self.load(id)
    }

    /// An existing document, read from durable storage right away.
    pub fn load_eager(&self, id: DocumentId) -> Result<Document> {
        Document::open(self, id, LoadMode::Eager)
    }

    /// Every persisted document of this type, lazily loaded, in id order.
    pub fn all(&self) -> Result<DocumentCollection> {
        let ids = self.engine.list_all(self)?;
        DocumentCollection::from_ids(self, ids)
    }

    /// Documents whose `attribute` satisfies `<op> value`.
    ///
    /// Indexed attributes are answered by the index without loading every
    /// document; others fall back to [`DocumentCollection::filter`] over
    /// [`DocumentType::all`].
    ///
    /// # Errors
    /// `Error::InvalidWhereQuery` for an unsupported operator.
    pub fn filter<V: Into<Value>>(
        &self,
        attribute: &str,
        value: V,
        op: &str,
    ) -> Result<DocumentCollection> {
        let op: Operator = op.parse()?;
        let value = value.into();

        let indexed = self
            .schema()
            .attribute(attribute)
            .is_some_and(|d| d.is_indexed());
        if indexed && op.is_indexable() {
            let ids = self.engine.index_lookup(self, attribute, &value, op)?;
            return DocumentCollection::from_ids(self, ids);
        }
        self.all()?.filter_with(attribute, &value, op)
    }

    /// Lock and inspect this type's cache slot.
    pub fn cache(&self) -> MutexGuard<'_, CacheSlot> {
        self.state.lock_cache()
    }

    /// Counters of the cache, or `None` when caching is disabled.
    pub fn cache_stats(&self) -> Option<CacheStatsSnapshot> {
        self.cache().cache().map(|c| c.stats().snapshot())
    }

    pub fn set_cache_provider(&self, provider: CacheProvider) -> Result<()> {
        self.engine.set_cache_provider(self, provider)
    }

    pub fn set_cache_size(&self, size: usize) -> Result<()> {
        self.engine.set_cache_size(self, size)
    }

    /// The persistent index of `column`.
    pub fn index(&self, column: &str) -> Result<Arc<Mutex<Index>>> {
        self.engine.index(self, column)
    }

    /// Drop empty index keys for every indexed column.
    pub fn prune_indexes(&self) -> Result<usize> {
        self.engine.prune_indexes(self)
    }
}

impl PartialEq for DocumentType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl fmt::Debug for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentType")
            .field("name", &self.name())
            .field("root", &self.state.root)
            .finish()
    }
}
