//! Documents, document types and collections.

mod collection;
mod doc_type;
#[allow(clippy::module_inception)]
mod document;

pub use collection::DocumentCollection;
pub use doc_type::DocumentType;
pub use document::{Document, LoadMode, Lifecycle};
