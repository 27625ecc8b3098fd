//! Ordered collections of documents of one type.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use std::ops::{Add, Range, Sub};
use std::slice;
use std::sync::Arc;

use crate::common::{DocumentId, Error, Result, Value};
use crate::document::{Document, DocumentType, LoadMode};
use crate::query::{compare_values, Operator};

/// An ordered sequence of documents of a single type.
///
/// Documents are shared (`Arc`), so two collections built from each other
/// hold the same instances. Set operations compare documents by id.
///
/// ```text
///   a + b      concatenation, duplicates kept
///   a - b      everything in a whose id is not in b
///   a.merge(b) union by id, one freshly loaded instance per id
/// ```
#[derive(Debug, Clone)]
pub struct DocumentCollection {
    doc_type: DocumentType,
    items: Vec<Arc<Document>>,
}

impl DocumentCollection {
    pub fn new(doc_type: &DocumentType, items: Vec<Arc<Document>>) -> Self {
        Self {
            doc_type: doc_type.clone(),
            items,
        }
    }

    /// Lazily open every id in order.
    ///
    /// # Errors
    /// `Error::NoSuchDocument` if an id has no persisted record.
    pub fn from_ids(doc_type: &DocumentType, ids: Vec<DocumentId>) -> Result<Self> {
        let items = ids
            .into_iter()
            .map(|id| Document::open(doc_type, id, LoadMode::Lazy).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(doc_type, items))
    }

    pub fn doc_type(&self) -> &DocumentType {
        &self.doc_type
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, Arc<Document>> {
        self.items.iter()
    }

    pub fn first(&self) -> Option<&Arc<Document>> {
        self.items.first()
    }

    pub fn last(&self) -> Option<&Arc<Document>> {
        self.items.last()
    }

    pub fn get(&self, position: usize) -> Option<&Arc<Document>> {
        self.items.get(position)
    }

    /// A sub-collection sharing the same instances. Out-of-range bounds are clamped.
    pub fn slice(&self, range: Range<usize>) -> Self {
        let end = range.end.min(self.items.len());
        let start = range.start.min(end);
        Self::new(&self.doc_type, self.items[start..end].to_vec())
    }

    /// Ids in collection order.
    pub fn ids(&self) -> Vec<DocumentId> {
        self.items.iter().map(|d| d.id()).collect()
    }

    // ========================================================================
    // Ordering
    // ========================================================================

    /// Sort in place by id.
    pub fn sort(&mut self) {
        self.items.sort_by_key(|d| d.id());
    }

    /// Sort in place with a comparator.
    pub fn sort_by<F>(&mut self, compare: F)
    where
        F: FnMut(&Arc<Document>, &Arc<Document>) -> Ordering,
    {
        self.items.sort_by(compare);
    }

    /// Sort in place by an attribute. Missing values sort first, values of
    /// mismatched kinds keep their relative order.
    pub fn sort_by_attribute(&mut self, attribute: &str) -> Result<()> {
        let mut keyed = self
            .items
            .iter()
            .map(|doc| Ok((doc.get(attribute)?.unwrap_or(Value::Null), Arc::clone(doc))))
            .collect::<Result<Vec<_>>>()?;
        keyed.sort_by(|(a, _), (b, _)| match (a.is_null(), b.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => compare_values(a, b).unwrap_or(Ordering::Equal),
        });
        self.items = keyed.into_iter().map(|(_, doc)| doc).collect();
        Ok(())
    }

    // ========================================================================
    // Filtering
    // ========================================================================

    /// Documents whose `attribute` satisfies `<op> value`.
    ///
    /// # Errors
    /// `Error::InvalidWhereQuery` for an unsupported operator.
    pub fn filter<V: Into<Value>>(&self, attribute: &str, value: V, op: &str) -> Result<Self> {
        let op: Operator = op.parse()?;
        self.filter_with(attribute, &value.into(), op)
    }

    /// [`DocumentCollection::filter`] with a parsed operator.
    ///
    /// Indexed attributes are answered from the index, restricted to this
    /// collection's ids; matching documents are returned as freshly loaded
    /// instances. Otherwise every document is read and compared, with a
    /// missing attribute compared as null.
    pub fn filter_with(&self, attribute: &str, value: &Value, op: Operator) -> Result<Self> {
        let descriptor = self.doc_type.schema().attribute(attribute).ok_or_else(|| {
            Error::InvalidInput(format!(
                "'{}' has no attribute '{}'",
                self.doc_type.name(),
                attribute
            ))
        })?;

        if descriptor.is_indexed() && op.is_indexable() {
            let matching: HashSet<DocumentId> = self
                .doc_type
                .storage()
                .index_lookup(&self.doc_type, attribute, value, op)?
                .into_iter()
                .collect();
            let mut seen = HashSet::new();
            let ids = self
                .items
                .iter()
                .map(|d| d.id())
                .filter(|id| matching.contains(id) && seen.insert(*id))
                .collect();
            return Self::from_ids(&self.doc_type, ids);
        }

        let mut items = Vec::new();
        for doc in &self.items {
            let stored = doc.get(attribute)?.unwrap_or(Value::Null);
            if op.evaluate(&stored, value)? {
                items.push(Arc::clone(doc));
            }
        }
        Ok(Self::new(&self.doc_type, items))
    }

    // ========================================================================
    // Set algebra
    // ========================================================================

    /// Concatenation; duplicates are kept.
    pub fn union(&self, other: &Self) -> Self {
        let mut items = self.items.clone();
        items.extend(other.items.iter().cloned());
        Self::new(&self.doc_type, items)
    }

    /// Everything in `self` whose id does not occur in `other`.
    pub fn difference(&self, other: &Self) -> Self {
        let exclude: HashSet<DocumentId> = other.items.iter().map(|d| d.id()).collect();
        let items = self
            .items
            .iter()
            .filter(|d| !exclude.contains(&d.id()))
            .cloned()
            .collect();
        Self::new(&self.doc_type, items)
    }

    /// Union by id, ascending, each id represented by a freshly loaded instance.
    pub fn merge(&self, other: &Self) -> Result<Self> {
        let ids: BTreeSet<DocumentId> = self.items.iter().chain(&other.items).map(|d| d.id()).collect();
        Self::from_ids(&self.doc_type, ids.into_iter().collect())
    }
}

impl Add for DocumentCollection {
    type Output = DocumentCollection;

    fn add(self, other: Self) -> Self::Output {
        self.union(&other)
    }
}

impl Sub for DocumentCollection {
    type Output = DocumentCollection;

    fn sub(self, other: Self) -> Self::Output {
        self.difference(&other)
    }
}

/// Same type and the same set of ids, regardless of order or multiplicity.
impl PartialEq for DocumentCollection {
    fn eq(&self, other: &Self) -> bool {
        if self.doc_type.name() != other.doc_type.name() {
            return false;
        }
        let ours: BTreeSet<DocumentId> = self.items.iter().map(|d| d.id()).collect();
        let theirs: BTreeSet<DocumentId> = other.items.iter().map(|d| d.id()).collect();
        ours == theirs
    }
}

impl IntoIterator for DocumentCollection {
    type Item = Arc<Document>;
    type IntoIter = std::vec::IntoIter<Arc<Document>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a DocumentCollection {
    type Item = &'a Arc<Document>;
    type IntoIter = slice::Iter<'a, Arc<Document>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
