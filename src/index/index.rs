//! Column index: attribute value to the ids of documents holding it.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::common::{DocumentId, Error, Result, Value};
use crate::index::id_list;
use crate::index::kv_file::{KeyValueFile, LogFile};
use crate::query::{compare_values, Operator};

/// A persistent `value -> {ids}` map for one `(type, column)` pair.
///
/// Keys are stored as compact JSON, so they keep the value's kind: the
/// string `"10"` and the number `10` are different keys. Range queries
/// compare decoded keys with [`compare_values`], which orders numbers
/// numerically (exactly, for whole numbers) and strings lexically, and
/// never matches values of different kinds. An index therefore answers
/// every indexable operator the same way a full scan would.
///
/// The index does no locking of its own; the storage engine serializes
/// writers under the type's write lock.
pub struct Index {
    column: String,
    path: PathBuf,
    store: Box<dyn KeyValueFile>,
}

impl Index {
    /// Open the index file at `path`, creating it if absent.
    pub fn open<P: AsRef<Path>>(path: P, column: &str, sync_writes: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let store = LogFile::open(&path, sync_writes)?;
        Ok(Self::with_store(path, column, Box::new(store)))
    }

    /// Wrap an already-open key-value store.
    pub fn with_store(path: PathBuf, column: &str, store: Box<dyn KeyValueFile>) -> Self {
        Self {
            column: column.to_string(),
            path,
            store,
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ids stored under `value`; empty if the value was never seen.
    pub fn get(&self, value: &Value) -> Result<BTreeSet<DocumentId>> {
        match self.store.get(&encode_key(value))? {
            Some(bytes) => self.decode(&bytes),
            None => Ok(BTreeSet::new()),
        }
    }

    /// Add `id` under `value`.
    pub fn put(&mut self, value: &Value, id: DocumentId) -> Result<()> {
        let mut ids = self.get(value)?;
        if ids.insert(id) {
            self.store.put(&encode_key(value), &id_list::encode(&ids))?;
        }
        Ok(())
    }

    /// Remove `id` from `value`. The key stays, possibly with an empty set.
    pub fn delete(&mut self, value: &Value, id: DocumentId) -> Result<()> {
        let mut ids = self.get(value)?;
        if ids.remove(&id) {
            self.store.put(&encode_key(value), &id_list::encode(&ids))?;
        }
        Ok(())
    }

    /// Remove `value` and every id under it.
    pub fn truncate(&mut self, value: &Value) -> Result<()> {
        self.store.delete(&encode_key(value))?;
        Ok(())
    }

    /// Every value currently present, including values with empty sets.
    pub fn keys(&self) -> Result<Vec<Value>> {
        self.store
            .keys()?
            .iter()
            .map(|key| self.decode_key(key))
            .collect()
    }

    /// Union of the ids under every stored value `v` where `v <op> target` holds.
    ///
    /// # Errors
    /// `Error::InvalidWhereQuery` for operators an index cannot answer.
    pub fn query(&self, target: &Value, op: Operator) -> Result<Vec<DocumentId>> {
        if !op.is_indexable() {
            return Err(Error::InvalidWhereQuery(op.symbol().to_string()));
        }

        let mut matched = BTreeSet::new();
        for (key, bytes) in self.store.entries()? {
            let stored = self.decode_key(&key)?;
            let holds = compare_values(&stored, target).is_some_and(|ord| op.holds(ord));
            if holds {
                matched.extend(self.decode(&bytes)?);
            }
        }
        Ok(matched.into_iter().collect())
    }

    /// Re-associate `id` with `value` (or with nothing, for `None`).
    ///
    /// Scans every key for `id` and removes it before adding the new
    /// association, so an id sits under at most one key afterwards even if
    /// the index was previously inconsistent.
    pub fn reassign(&mut self, id: DocumentId, value: Option<&Value>) -> Result<()> {
        let target = value.map(encode_key);
        let mut removed = 0usize;
        for (old_key, bytes) in self.store.entries()? {
            if target.as_deref() == Some(old_key.as_str()) {
                continue;
            }
            let mut ids = self.decode(&bytes)?;
            if ids.remove(&id) {
                self.store.put(&old_key, &id_list::encode(&ids))?;
                removed += 1;
            }
        }
        if let Some(value) = value {
            self.put(value, id)?;
        }
        debug!(column = %self.column, id = %id, key = ?target, removed, "index updated");
        Ok(())
    }

    /// Drop keys whose id set is empty and reclaim file space.
    ///
    /// Returns the number of keys removed.
    pub fn prune(&mut self) -> Result<usize> {
        let mut pruned = 0;
        for (key, bytes) in self.store.entries()? {
            if self.decode(&bytes)?.is_empty() {
                self.store.delete(&key)?;
                pruned += 1;
            }
        }
        self.store.compact()?;
        debug!(column = %self.column, pruned, "index pruned");
        Ok(pruned)
    }

    fn decode(&self, bytes: &[u8]) -> Result<BTreeSet<DocumentId>> {
        id_list::decode(bytes).map_err(|reason| Error::CorruptIndex {
            path: self.path.clone(),
            reason,
        })
    }

    fn decode_key(&self, key: &str) -> Result<Value> {
        serde_json::from_str(key).map_err(|e| Error::CorruptIndex {
            path: self.path.clone(),
            reason: format!("bad key {:?}: {}", key, e),
        })
    }
}

/// Stored form of an index key: the value as compact JSON.
fn encode_key(value: &Value) -> String {
    value.to_string()
}
