//! flatdoc - An embedded flat-file document store with schema validation,
//! pluggable caching and persistent secondary indexes.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            flatdoc                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Documents (document/)                       │   │
//! │  │   DocumentType → Document (lazy/eager) → Collection      │   │
//! │  │        validation pipeline, filters, set algebra         │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Storage Engine (storage/)                      │   │
//! │  │   registry, per-type read/write locks, id allocation     │   │
//! │  │        codecs: json | json-pretty | yaml                 │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                 ↓                           ↓                   │
//! │  ┌────────────────────────────┐  ┌────────────────────────┐    │
//! │  │   Cache (cache/)           │  │   Indexes (index/)     │    │
//! │  │   LRU | Random Replacement │  │   value → id set       │    │
//! │  │   per type, swappable      │  │   append-only log file │    │
//! │  └────────────────────────────┘  └────────────────────────┘    │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │  <data-root>/<type>/documents/<id>.{json,yml}            │   │
//! │  │  <data-root>/<type>/indexes/<column>.index               │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (DocumentId, Value, Error, config)
//! - [`schema`] - Attribute declarations and type schemas
//! - [`document`] - Document types, instances and collections
//! - [`storage`] - Registry, persistence and codecs
//! - [`cache`] - Bounded caches and eviction policies
//! - [`index`] - Persistent secondary indexes
//! - [`query`] - Comparison operators
//!
//! # Quick Start
//! ```no_run
//! use flatdoc::schema::{Attribute, Schema};
//! use flatdoc::{Config, StorageEngine};
//!
//! let engine = StorageEngine::new(Config::with_data_root("/tmp/flatdoc"));
//! let books = engine
//!     .register(
//!         Schema::builder("books")
//!             .attribute("title", Attribute::string())
//!             .attribute("isbn", Attribute::string().unique().indexed())
//!             .attribute("pages", Attribute::integer())
//!             .build()
//!             .unwrap(),
//!     )
//!     .unwrap();
//!
//! let book = books.create().unwrap();
//! book.set("title", "Dune").unwrap();
//! book.set("pages", 412).unwrap();
//! book.commit().unwrap();
//!
//! let long = books.filter("pages", 400, ">").unwrap();
//! ```

pub mod cache;
pub mod common;
pub mod document;
pub mod index;
pub mod query;
pub mod schema;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::{key_text, AttributeMap, Config, DocumentId, Error, Result, Value, ValueKind};

pub use cache::{Cache, CacheProvider, CacheStats, CacheStatsSnapshot};
pub use document::{Document, DocumentCollection, DocumentType, Lifecycle, LoadMode};
pub use query::Operator;
pub use schema::{Attribute, Schema};
pub use storage::{EngineKind, StorageEngine, StorageStats, StorageStatsSnapshot};
