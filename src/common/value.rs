//! Attribute values and their declared kinds.

use std::fmt;

/// A single attribute value. Codec-native scalars and collections.
pub use serde_json::Value;

/// A document's attribute map: attribute name to value.
///
/// Schema-less on disk; the schema is enforced on write through
/// [`crate::Document::set`].
pub type AttributeMap = serde_json::Map<String, Value>;

/// The kind of value an attribute accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Any value, including null.
    Any,
    Bool,
    /// Whole numbers (signed or unsigned 64-bit).
    Integer,
    /// Any number, whole or fractional.
    Float,
    String,
    Array,
    Object,
}

impl ValueKind {
    /// Does `value` belong to this kind?
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ValueKind::Any => true,
            ValueKind::Bool => value.is_boolean(),
            ValueKind::Integer => value.is_i64() || value.is_u64(),
            ValueKind::Float => value.is_number(),
            ValueKind::String => value.is_string(),
            ValueKind::Array => value.is_array(),
            ValueKind::Object => value.is_object(),
        }
    }

    /// Numeric kinds order index keys numerically instead of lexically.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueKind::Integer | ValueKind::Float)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Any => "any",
            ValueKind::Bool => "bool",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Textual form of a value, used for format patterns, index keys and `match`.
///
/// Strings are taken verbatim; everything else is rendered as compact JSON.
pub fn key_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_accepts() {
        assert!(ValueKind::Integer.accepts(&json!(3)));
        assert!(!ValueKind::Integer.accepts(&json!(3.5)));
        assert!(ValueKind::Float.accepts(&json!(3)));
        assert!(ValueKind::Float.accepts(&json!(3.5)));
        assert!(ValueKind::String.accepts(&json!("x")));
        assert!(!ValueKind::String.accepts(&json!(null)));
        assert!(ValueKind::Any.accepts(&json!(null)));
    }

    #[test]
    fn test_key_text() {
        assert_eq!(key_text(&json!("a@b.com")), "a@b.com");
        assert_eq!(key_text(&json!(42)), "42");
        assert_eq!(key_text(&json!(true)), "true");
        assert_eq!(key_text(&json!([1, 2])), "[1,2]");
    }
}
