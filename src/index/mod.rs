//! Index engine.
//!
//! Persistent secondary indexes mapping an attribute value to the ids of
//! the documents currently holding it, one file per `(type, column)`:
//! `<data-root>/<type>/indexes/<column>.index`.
//!
//! # Components
//! - [`Index`] - value to id-set map with range queries
//! - [`KeyValueFile`] / [`LogFile`] - the persistent store underneath
//! - [`id_list`] - id-set payload encoding

pub mod id_list;
#[allow(clippy::module_inception)]
mod index;
mod kv_file;

pub use index::Index;
pub use kv_file::{KeyValueFile, LogFile};
