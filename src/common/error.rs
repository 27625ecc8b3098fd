//! Error types for flatdoc.

use std::path::PathBuf;

use thiserror::Error;

use crate::common::DocumentId;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in flatdoc.
///
/// Validation errors leave the document untouched. Configuration errors
/// (engine, cache provider, cache size, schema) are raised when a type is
/// defined, before any instance exists.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from document or index file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No persisted record exists for this id.
    #[error("no document {id} of type '{doc_type}'")]
    NoSuchDocument { doc_type: String, id: DocumentId },

    /// A non-forced reload was requested while edits are uncommitted.
    #[error("document {id} of type '{doc_type}' has uncommitted changes")]
    PendingChanges { doc_type: String, id: DocumentId },

    /// Unknown attribute, kind mismatch, format mismatch or malformed filter input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A configured validator rejected the candidate value.
    #[error("validator '{validator}' rejected value for '{attribute}'")]
    FailedValidation { attribute: String, validator: String },

    /// Another document of the same type already holds this value.
    #[error("value {value} for '{attribute}' is not unique")]
    NotUnique { attribute: String, value: String },

    /// The named storage engine does not exist.
    #[error("invalid storage engine '{0}'")]
    InvalidEngine(String),

    /// The named cache provider does not exist.
    #[error("invalid cache provider '{0}'")]
    InvalidCacheProvider(String),

    /// Cache sizes must be at least one entry.
    #[error("invalid cache size {0}")]
    InvalidCacheSize(usize),

    /// Unsupported comparison operator in a filter.
    #[error("unsupported comparison operator '{0}'")]
    InvalidWhereQuery(String),

    /// Malformed type or attribute definition.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// A type with this name is already registered on the engine.
    #[error("document type '{0}' is already registered")]
    DuplicateType(String),

    /// Encoding or decoding through a codec failed.
    #[error("codec error: {0}")]
    Codec(String),

    /// A persisted document exists but cannot be decoded.
    #[error("document {id} of type '{doc_type}' is corrupt: {reason}")]
    CorruptDocument {
        doc_type: String,
        id: DocumentId,
        reason: String,
    },

    /// An index file or id-list payload failed its integrity checks.
    #[error("index {} is corrupt: {reason}", path.display())]
    CorruptIndex { path: PathBuf, reason: String },
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Codec(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NoSuchDocument {
            doc_type: "users".into(),
            id: DocumentId::new(42),
        };
        assert_eq!(format!("{}", err), "no document 42 of type 'users'");

        let err = Error::InvalidWhereQuery("~=".into());
        assert_eq!(format!("{}", err), "unsupported comparison operator '~='");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        match err {
            Error::Io(_) => {} // Success
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Codec(_)));
    }
}
