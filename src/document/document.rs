//! Document - one schema-validated record.

use std::fmt;
use std::path::PathBuf;

use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::common::{key_text, AttributeMap, DocumentId, Error, Result, Value};
use crate::document::DocumentType;
use crate::query::Operator;
use crate::schema::AttributeDescriptor;

/// How an existing document is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Verify the file exists; read it on first attribute access.
    #[default]
    Lazy,
    /// Read the file immediately.
    Eager,
}

/// Where a document is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Id allocated, nothing written yet.
    New,
    /// Persisted, attribute data not read yet.
    Lazy,
    /// In memory and matching durable storage.
    Loaded,
    /// In memory with uncommitted edits.
    Dirty,
}

struct DocState {
    data: AttributeMap,
    /// In-memory data matches the last persisted bytes.
    saved: bool,
    /// Data not read yet.
    lazy: bool,
    /// A file exists for this id (as far as this instance knows).
    persisted: bool,
}

/// A document instance.
///
/// # Lifecycle
/// ```text
///  create() ──▶ New ──set──▶ Dirty ──commit──▶ Loaded ◀──reload/refresh──┐
///                              ▲                 │                       │
///                              └──────set────────┘                       │
///  open(Lazy) ──▶ Lazy ──first get/set (reads disk once)──▶ Loaded ──────┘
///  open(Eager) ──▶ Loaded
/// ```
///
/// # Write pipeline
/// `set` checks, in order: declared attribute, value kind, format pattern,
/// uniqueness, validators. The first failure returns an error and leaves the
/// document unchanged. Only then is a lazy document loaded and the value
/// written. Writing an indexed attribute commits immediately so the index
/// always matches durable storage; edits to indexed attributes can never
/// be batched with other pending edits.
///
/// # Thread Safety
/// A document can be shared across threads. Attribute data sits behind an
/// `RwLock`; `commit`, `reload` and `refresh` are serialized per instance by
/// a separate mutex. Two instances for the same id are only serialized by
/// the storage engine's type lock during the actual write.
pub struct Document {
    doc_type: DocumentType,
    id: DocumentId,
    state: RwLock<DocState>,
    io_lock: Mutex<()>,
}

impl Document {
    /// A new document with a freshly allocated id and no attributes.
    pub fn create(doc_type: &DocumentType) -> Result<Self> {
        let id = doc_type.storage().next_id(doc_type)?;
        Ok(Self::with_state(
            doc_type,
            id,
            DocState {
                data: AttributeMap::new(),
                saved: false,
                lazy: false,
                persisted: false,
            },
        ))
    }

    /// Open an existing document.
    ///
    /// # Errors
    /// `Error::NoSuchDocument` if nothing is persisted for `id`.
    pub fn open(doc_type: &DocumentType, id: DocumentId, mode: LoadMode) -> Result<Self> {
        if !doc_type.storage().exists(doc_type, id) {
            return Err(Error::NoSuchDocument {
                doc_type: doc_type.name().to_string(),
                id,
            });
        }

        let doc = Self::with_state(
            doc_type,
            id,
            DocState {
                data: AttributeMap::new(),
                saved: true,
                lazy: true,
                persisted: true,
            },
        );
        if mode == LoadMode::Eager {
            doc.reload(true)?;
        }
        Ok(doc)
    }

    fn with_state(doc_type: &DocumentType, id: DocumentId, state: DocState) -> Self {
        Self {
            doc_type: doc_type.clone(),
            id,
            state: RwLock::new(state),
            io_lock: Mutex::new(()),
        }
    }

    #[inline]
    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn doc_type(&self) -> &DocumentType {
        &self.doc_type
    }

    /// Where this document lives (or will live) on disk.
    pub fn file_path(&self) -> PathBuf {
        self.doc_type.storage().file_path(&self.doc_type, self.id)
    }

    /// Does in-memory data match durable storage?
    pub fn is_committed(&self) -> bool {
        self.state.read().saved
    }

    /// Has attribute data yet to be read?
    pub fn is_lazy(&self) -> bool {
        self.state.read().lazy
    }

    pub fn lifecycle(&self) -> Lifecycle {
        let st = self.state.read();
        match (st.lazy, st.saved, st.persisted) {
            (true, true, _) => Lifecycle::Lazy,
            (_, true, _) => Lifecycle::Loaded,
            (_, false, false) if st.data.is_empty() => Lifecycle::New,
            _ => Lifecycle::Dirty,
        }
    }

    // ========================================================================
    // Attribute access
    // ========================================================================

    /// Current value of `attribute`, or `None` if never set.
    ///
    /// # Errors
    /// `Error::InvalidInput` if the schema doesn't declare `attribute`.
    pub fn get(&self, attribute: &str) -> Result<Option<Value>> {
        self.descriptor(attribute)?;
        self.ensure_loaded()?;
        Ok(self.state.read().data.get(attribute).cloned())
    }

    /// Current value of `attribute`, deserialized into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, attribute: &str) -> Result<Option<T>> {
        match self.get(attribute)? {
            Some(value) => serde_json::from_value(value).map(Some).map_err(|e| {
                Error::InvalidInput(format!("'{}' cannot be read as requested: {}", attribute, e))
            }),
            None => Ok(None),
        }
    }

    /// Validate and write `attribute`.
    ///
    /// # Errors
    /// - `Error::InvalidInput` for undeclared attributes, kind or format mismatches
    /// - `Error::NotUnique` if a unique value is held by another document
    /// - `Error::FailedValidation` if a validator rejects the value
    pub fn set<V: Into<Value>>(&self, attribute: &str, value: V) -> Result<()> {
        let value = value.into();
        let descriptor = self.descriptor(attribute)?;

        descriptor.check_shape(attribute, &value)?;
        if descriptor.is_unique() {
            self.check_unique(attribute, descriptor, &value)?;
        }
        descriptor.run_validators(attribute, &value)?;

        self.ensure_loaded()?;
        {
            let mut st = self.state.write();
            st.data.insert(attribute.to_string(), value);
            st.saved = false;
        }

        if descriptor.is_indexed() {
            self.commit()?;
        }
        Ok(())
    }

    /// A copy of every attribute currently held.
    pub fn to_map(&self) -> Result<AttributeMap> {
        self.ensure_loaded()?;
        Ok(self.state.read().data.clone())
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Persist the document if it has uncommitted changes.
    pub fn commit(&self) -> Result<()> {
        let _io = self.io_lock.lock();

        let snapshot = {
            let st = self.state.read();
            if st.saved {
                return Ok(());
            }
            st.data.clone()
        };

        self.doc_type
            .storage()
            .store(&self.doc_type, self.id, &snapshot)?;

        let mut st = self.state.write();
        st.persisted = true;
        // A concurrent `set` may have landed after the snapshot was taken
        if st.data == snapshot {
            st.saved = true;
        }
        debug!(doc_type = %self.doc_type.name(), id = %self.id, "committed document");
        Ok(())
    }

    /// Alias for [`Document::commit`].
    pub fn save(&self) -> Result<()> {
        self.commit()
    }

    /// Replace attribute data from durable storage, never from cache.
    ///
    /// # Errors
    /// `Error::PendingChanges` if there are uncommitted edits and `force` is false.
    pub fn reload(&self, force: bool) -> Result<()> {
        let _io = self.io_lock.lock();
        if !force && !self.state.read().saved {
            return Err(Error::PendingChanges {
                doc_type: self.doc_type.name().to_string(),
                id: self.id,
            });
        }
        self.load_locked(false)
    }

    /// Replace attribute data, accepting a cached copy.
    ///
    /// Unlike [`Document::reload`] this discards uncommitted edits without
    /// complaint and may return data older than what another thread just
    /// stored.
    pub fn refresh(&self) -> Result<()> {
        let _io = self.io_lock.lock();
        self.load_locked(true)
    }

    /// Delete the persisted record. The instance stays usable and keeps its
    /// data (a lazy instance is loaded first): committing it again writes
    /// the same attributes back under the same id.
    pub fn delete(&self) -> Result<()> {
        let _io = self.io_lock.lock();
        if self.needs_load() {
            self.load_locked(false)?;
        }
        self.doc_type.storage().delete(&self.doc_type, self.id)?;
        let mut st = self.state.write();
        st.persisted = false;
        st.saved = false;
        st.lazy = false;
        Ok(())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn descriptor(&self, attribute: &str) -> Result<&AttributeDescriptor> {
        self.doc_type.schema().attribute(attribute).ok_or_else(|| {
            Error::InvalidInput(format!(
                "'{}' has no attribute '{}'",
                self.doc_type.name(),
                attribute
            ))
        })
    }

    /// Read the document once if it was opened lazily.
    fn ensure_loaded(&self) -> Result<()> {
        if !self.needs_load() {
            return Ok(());
        }
        let _io = self.io_lock.lock();
        // Another thread may have loaded it while we waited
        if !self.needs_load() {
            return Ok(());
        }
        self.load_locked(false)
    }

    fn needs_load(&self) -> bool {
        let st = self.state.read();
        st.lazy && st.saved
    }

    /// Caller holds `io_lock`.
    fn load_locked(&self, use_cache: bool) -> Result<()> {
        let data = self
            .doc_type
            .storage()
            .retrieve(&self.doc_type, self.id, use_cache)?;
        let mut st = self.state.write();
        st.data = data;
        st.saved = true;
        st.lazy = false;
        st.persisted = true;
        Ok(())
    }

    /// Fail if any *other* document of the type already holds `value`.
    fn check_unique(
        &self,
        attribute: &str,
        descriptor: &AttributeDescriptor,
        value: &Value,
    ) -> Result<()> {
        let storage = self.doc_type.storage();
        let holders = if descriptor.is_indexed() {
            storage.index_lookup(&self.doc_type, attribute, value, Operator::Eq)?
        } else {
            let mut holders = Vec::new();
            for id in storage.list_all(&self.doc_type)? {
                if id == self.id {
                    continue;
                }
                let data = match storage.retrieve(&self.doc_type, id, true) {
                    Ok(data) => data,
                    // Deleted since the listing
                    Err(Error::NoSuchDocument { .. }) => continue,
                    Err(e) => return Err(e),
                };
                if let Some(existing) = data.get(attribute) {
                    if Operator::Eq.evaluate(existing, value)? {
                        holders.push(id);
                    }
                }
            }
            holders
        };

        if holders.iter().any(|&id| id != self.id) {
            return Err(Error::NotUnique {
                attribute: attribute.to_string(),
                value: key_text(value),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("type", &self.doc_type.name())
            .field("id", &self.id)
            .field("lifecycle", &self.lifecycle())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, Schema};
    use crate::{Config, StorageEngine};
    use serde_json::json;
    use tempfile::tempdir;

    fn people() -> (DocumentType, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let engine = StorageEngine::new(Config::with_data_root(dir.path()));
        let ty = engine
            .register(
                Schema::builder("people")
                    .attribute("name", Attribute::string())
                    .attribute("age", Attribute::integer().validate("adult", |v| {
                        v.as_i64().is_some_and(|n| n >= 18)
                    }))
                    .attribute("zip", Attribute::any().format(r"^\d{5}$"))
                    .attribute("tags", Attribute::new(crate::ValueKind::Array))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        (ty, dir)
    }

    #[test]
    fn test_create_is_new() {
        let (ty, _dir) = people();
        let doc = ty.create().unwrap();
        assert_eq!(doc.id(), DocumentId(1));
        assert_eq!(doc.lifecycle(), Lifecycle::New);
        assert!(!doc.is_committed());
        assert!(!doc.file_path().exists());
    }

    #[test]
    fn test_set_commit_load() {
        let (ty, _dir) = people();
        let doc = ty.create().unwrap();
        doc.set("name", "Ada").unwrap();
        doc.set("age", 36).unwrap();
        assert_eq!(doc.lifecycle(), Lifecycle::Dirty);

        doc.commit().unwrap();
        assert_eq!(doc.lifecycle(), Lifecycle::Loaded);
        assert!(doc.file_path().exists());

        let loaded = ty.load(doc.id()).unwrap();
        assert_eq!(loaded.lifecycle(), Lifecycle::Lazy);
        assert_eq!(loaded.get_as::<String>("name").unwrap().as_deref(), Some("Ada"));
        assert_eq!(loaded.get_as::<i64>("age").unwrap(), Some(36));
        assert_eq!(loaded.lifecycle(), Lifecycle::Loaded);
    }

    #[test]
    fn test_open_missing_fails() {
        let (ty, _dir) = people();
        assert!(matches!(
            ty.load(DocumentId(99)),
            Err(Error::NoSuchDocument { .. })
        ));
        assert!(matches!(
            ty.load_eager(DocumentId(99)),
            Err(Error::NoSuchDocument { .. })
        ));
    }

    #[test]
    fn test_validation_leaves_document_unchanged() {
        let (ty, _dir) = people();
        let doc = ty.create().unwrap();
        doc.set("age", 30).unwrap();

        assert!(matches!(doc.set("age", "old"), Err(Error::InvalidInput(_))));
        assert!(matches!(
            doc.set("age", 12),
            Err(Error::FailedValidation { .. })
        ));
        assert!(matches!(doc.set("zip", "1234"), Err(Error::InvalidInput(_))));
        assert!(matches!(doc.set("nope", 1), Err(Error::InvalidInput(_))));

        assert_eq!(doc.get("age").unwrap(), Some(json!(30)));
        assert_eq!(doc.get("zip").unwrap(), None);
        doc.set("zip", 12345).unwrap();
    }

    #[test]
    fn test_unknown_attribute_read() {
        let (ty, _dir) = people();
        let doc = ty.create().unwrap();
        assert!(matches!(doc.get("salary"), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_commit_when_saved_is_noop() {
        let (ty, _dir) = people();
        let doc = ty.create().unwrap();
        doc.set("name", "x").unwrap();
        doc.commit().unwrap();

        let written = ty.storage().stats().snapshot().documents_written;
        doc.commit().unwrap();
        assert_eq!(ty.storage().stats().snapshot().documents_written, written);
    }

    #[test]
    fn test_reload_guards_pending_changes() {
        let (ty, _dir) = people();
        let doc = ty.create().unwrap();
        doc.set("name", "before").unwrap();
        doc.commit().unwrap();

        doc.set("name", "after").unwrap();
        assert!(matches!(
            doc.reload(false),
            Err(Error::PendingChanges { .. })
        ));

        doc.reload(true).unwrap();
        assert_eq!(doc.get("name").unwrap(), Some(json!("before")));
        assert!(doc.is_committed());
    }

    #[test]
    fn test_reload_new_document_without_force() {
        let (ty, _dir) = people();
        let doc = ty.create().unwrap();
        assert!(matches!(
            doc.reload(false),
            Err(Error::PendingChanges { .. })
        ));
        assert!(matches!(doc.reload(true), Err(Error::NoSuchDocument { .. })));
    }

    #[test]
    fn test_write_on_lazy_merges_onto_disk_state() {
        let (ty, _dir) = people();
        let doc = ty.create().unwrap();
        doc.set("name", "Grace").unwrap();
        doc.set("age", 40).unwrap();
        doc.commit().unwrap();

        let lazy = ty.load(doc.id()).unwrap();
        lazy.set("age", 41).unwrap();
        let map = lazy.to_map().unwrap();
        assert_eq!(map["name"], json!("Grace"));
        assert_eq!(map["age"], json!(41));
    }

    #[test]
    fn test_refresh_discards_edits() {
        let (ty, _dir) = people();
        let doc = ty.create().unwrap();
        doc.set("name", "a").unwrap();
        doc.commit().unwrap();
        doc.set("name", "b").unwrap();

        doc.refresh().unwrap();
        assert_eq!(doc.get("name").unwrap(), Some(json!("a")));
        assert_eq!(doc.lifecycle(), Lifecycle::Loaded);
    }

    #[test]
    fn test_delete_then_recommit() {
        let (ty, _dir) = people();
        let doc = ty.create().unwrap();
        doc.set("name", "temp").unwrap();
        doc.commit().unwrap();

        doc.delete().unwrap();
        assert!(!doc.file_path().exists());
        assert_eq!(doc.lifecycle(), Lifecycle::Dirty);

        doc.commit().unwrap();
        assert!(doc.file_path().exists());
    }

    #[test]
    fn test_delete_lazy_keeps_data_for_recommit() {
        let (ty, _dir) = people();
        let doc = ty.create().unwrap();
        doc.set("name", "Kept").unwrap();
        doc.set("age", 50).unwrap();
        doc.commit().unwrap();

        let lazy = ty.load(doc.id()).unwrap();
        lazy.delete().unwrap();
        assert!(!lazy.file_path().exists());
        assert_eq!(lazy.get("name").unwrap(), Some(json!("Kept")));

        lazy.commit().unwrap();
        let back = ty.load_eager(doc.id()).unwrap();
        assert_eq!(back.to_map().unwrap(), doc.to_map().unwrap());
    }

    #[test]
    fn test_get_as_type_mismatch() {
        let (ty, _dir) = people();
        let doc = ty.create().unwrap();
        doc.set("tags", json!(["a", "b"])).unwrap();
        assert_eq!(
            doc.get_as::<Vec<String>>("tags").unwrap(),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert!(matches!(
            doc.get_as::<i64>("tags"),
            Err(Error::InvalidInput(_))
        ));
    }
}
