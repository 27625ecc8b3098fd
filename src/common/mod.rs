//! Common types and utilities shared across flatdoc.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration
//! - Error types
//! - Document identifiers
//! - Attribute values and kinds

pub mod config;
pub mod error;
mod document_id;
mod value;

pub use config::Config;
pub use error::{Error, Result};
pub use document_id::DocumentId;
pub use value::{key_text, AttributeMap, Value, ValueKind};
