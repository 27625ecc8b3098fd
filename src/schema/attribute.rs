//! Attribute declarations and their validation pipeline.

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::common::{key_text, Error, Result, Value, ValueKind};

/// Predicate run against a candidate value before it is written.
pub type ValidatorFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// A named validator.
#[derive(Clone)]
pub struct Validator {
    name: String,
    check: ValidatorFn,
}

impl Validator {
    pub fn new<F>(name: &str, check: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            check: Arc::new(check),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn accepts(&self, value: &Value) -> bool {
        (self.check)(value)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Validator").field(&self.name).finish()
    }
}

/// Declaration of one attribute, as written in a schema builder.
///
/// # Example
/// ```
/// use flatdoc::schema::Attribute;
///
/// let email = Attribute::string()
///     .format(r"^[^@\s]+@[^@\s]+$")
///     .validate("short", |v| v.as_str().map_or(false, |s| s.len() < 255))
///     .unique()
///     .indexed();
/// ```
#[derive(Debug, Clone)]
pub struct Attribute {
    pub(crate) kind: ValueKind,
    pub(crate) format: Option<String>,
    pub(crate) validators: Vec<Validator>,
    pub(crate) unique: bool,
    pub(crate) indexed: bool,
}

impl Attribute {
    pub fn new(kind: ValueKind) -> Self {
        Self {
            kind,
            format: None,
            validators: Vec::new(),
            unique: false,
            indexed: false,
        }
    }

    pub fn any() -> Self {
        Self::new(ValueKind::Any)
    }

    pub fn string() -> Self {
        Self::new(ValueKind::String)
    }

    pub fn integer() -> Self {
        Self::new(ValueKind::Integer)
    }

    pub fn float() -> Self {
        Self::new(ValueKind::Float)
    }

    pub fn boolean() -> Self {
        Self::new(ValueKind::Bool)
    }

    /// Require the value's text form to match `pattern`.
    pub fn format(mut self, pattern: &str) -> Self {
        self.format = Some(pattern.to_string());
        self
    }

    /// Append a validator; validators run in declaration order.
    pub fn validate<F>(mut self, name: &str, check: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.validators.push(Validator::new(name, check));
        self
    }

    /// No two documents of the type may hold the same value.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Maintain a persistent index for this attribute.
    ///
    /// Writes to an indexed attribute commit the document immediately, so
    /// the index never disagrees with what is on disk.
    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    pub(crate) fn compile(self, name: &str) -> Result<AttributeDescriptor> {
        let format = match self.format {
            Some(pattern) => Some(Regex::new(&pattern).map_err(|e| {
                Error::InvalidSchema(format!("bad format for '{}': {}", name, e))
            })?),
            None => None,
        };
        Ok(AttributeDescriptor {
            kind: self.kind,
            format,
            validators: self.validators,
            unique: self.unique,
            indexed: self.indexed,
        })
    }
}

/// A compiled attribute declaration held by a [`crate::Schema`].
#[derive(Debug, Clone)]
pub struct AttributeDescriptor {
    kind: ValueKind,
    format: Option<Regex>,
    validators: Vec<Validator>,
    unique: bool,
    indexed: bool,
}

impl AttributeDescriptor {
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn format(&self) -> Option<&Regex> {
        self.format.as_ref()
    }

    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    /// Kind and format checks.
    ///
    /// # Errors
    /// `Error::InvalidInput` on a kind or format mismatch.
    pub fn check_shape(&self, attribute: &str, value: &Value) -> Result<()> {
        if !self.kind.accepts(value) {
            return Err(Error::InvalidInput(format!(
                "'{}' expects {}, got {}",
                attribute, self.kind, value
            )));
        }
        if let Some(format) = &self.format {
            if !format.is_match(&key_text(value)) {
                return Err(Error::InvalidInput(format!(
                    "'{}' does not match format {}",
                    attribute,
                    format.as_str()
                )));
            }
        }
        Ok(())
    }

    /// Run validators in order, stopping at the first rejection.
    ///
    /// # Errors
    /// `Error::FailedValidation` naming the rejecting validator.
    pub fn run_validators(&self, attribute: &str, value: &Value) -> Result<()> {
        match self.validators.iter().find(|v| !v.accepts(value)) {
            Some(rejecting) => Err(Error::FailedValidation {
                attribute: attribute.to_string(),
                validator: rejecting.name().to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_mismatch() {
        let desc = Attribute::integer().compile("age").unwrap();
        assert!(desc.check_shape("age", &json!(30)).is_ok());
        assert!(matches!(
            desc.check_shape("age", &json!("thirty")),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_format_uses_text_form() {
        let desc = Attribute::any().format(r"^\d{3}$").compile("code").unwrap();
        assert!(desc.check_shape("code", &json!(123)).is_ok());
        assert!(desc.check_shape("code", &json!("123")).is_ok());
        assert!(desc.check_shape("code", &json!(1234)).is_err());
    }

    #[test]
    fn test_bad_format_rejected_at_compile() {
        let result = Attribute::string().format("(").compile("broken");
        assert!(matches!(result, Err(Error::InvalidSchema(_))));
    }

    #[test]
    fn test_validators_run_in_order() {
        let desc = Attribute::integer()
            .validate("positive", |v| v.as_i64().is_some_and(|n| n > 0))
            .validate("even", |v| v.as_i64().is_some_and(|n| n % 2 == 0))
            .compile("n")
            .unwrap();

        assert!(desc.run_validators("n", &json!(4)).is_ok());
        match desc.run_validators("n", &json!(-3)) {
            Err(Error::FailedValidation { validator, .. }) => assert_eq!(validator, "positive"),
            other => panic!("unexpected {:?}", other),
        }
        match desc.run_validators("n", &json!(3)) {
            Err(Error::FailedValidation { validator, .. }) => assert_eq!(validator, "even"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
