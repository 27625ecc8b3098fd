//! Document identifier type.

use std::fmt;
use std::str::FromStr;

/// Identifies a document within its type.
///
/// Ids are allocated monotonically per type, starting at 1. The value is
/// also the stem of the document's file name (`<id>.<ext>`), so parsing a
/// file stem back into an id is the inverse of [`fmt::Display`].
///
/// # Example
/// ```
/// use flatdoc::DocumentId;
///
/// let id = DocumentId::new(42);
/// assert_eq!(id.0, 42);
/// assert_eq!(id.to_string(), "42");
/// assert_eq!("42".parse::<DocumentId>().unwrap(), id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(pub u64);

impl DocumentId {
    /// Create a new DocumentId.
    #[inline]
    pub fn new(id: u64) -> Self {
        DocumentId(id)
    }

    /// The id following this one.
    #[inline]
    pub fn next(self) -> Self {
        DocumentId(self.0 + 1)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DocumentId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(DocumentId)
    }
}

impl From<u64> for DocumentId {
    fn from(id: u64) -> Self {
        DocumentId(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_ordering() {
        assert!(DocumentId::new(1) < DocumentId::new(2));
        assert_eq!(DocumentId::new(1).next(), DocumentId::new(2));
    }

    #[test]
    fn test_document_id_parse() {
        assert_eq!("7".parse::<DocumentId>().unwrap(), DocumentId::new(7));
        assert!("7.json".parse::<DocumentId>().is_err());
        assert!("-1".parse::<DocumentId>().is_err());
    }
}
