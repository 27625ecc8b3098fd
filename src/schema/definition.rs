//! Per-type schema definition.

use tracing::debug;

use crate::cache::CacheProvider;
use crate::common::{Error, Result};
use crate::schema::attribute::{Attribute, AttributeDescriptor};
use crate::storage::EngineKind;

/// The immutable schema of one document type.
///
/// Attribute order is declaration order. Engine and cache settings left
/// unset fall back to the engine-wide [`crate::Config`] when the type is
/// registered.
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    attributes: Vec<(String, AttributeDescriptor)>,
    engine: Option<EngineKind>,
    cache_provider: Option<CacheProvider>,
    cache_size: Option<usize>,
}

impl Schema {
    pub fn builder(name: &str) -> SchemaBuilder {
        SchemaBuilder {
            name: name.to_string(),
            attributes: Vec::new(),
            engine: None,
            cache_provider: None,
            cache_size: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the type's directory under the data root.
    pub fn dir_name(&self) -> String {
        self.name.replace("::", "__")
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, desc)| desc)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &AttributeDescriptor)> {
        self.attributes.iter().map(|(n, d)| (n.as_str(), d))
    }

    /// Attributes maintained by a persistent index.
    pub fn indexed_columns(&self) -> impl Iterator<Item = (&str, &AttributeDescriptor)> {
        self.attributes().filter(|(_, d)| d.is_indexed())
    }

    pub fn engine(&self) -> Option<EngineKind> {
        self.engine
    }

    pub fn cache_provider(&self) -> Option<CacheProvider> {
        self.cache_provider
    }

    pub fn cache_size(&self) -> Option<usize> {
        self.cache_size
    }
}

/// Builder for [`Schema`]. Every check happens in [`SchemaBuilder::build`].
///
/// # Example
/// ```
/// use flatdoc::schema::{Attribute, Schema};
///
/// let schema = Schema::builder("users")
///     .attribute("name", Attribute::string())
///     .attribute("email", Attribute::string().unique().indexed())
///     .engine("json-pretty")
///     .cache("rr", 50)
///     .build()
///     .unwrap();
/// assert_eq!(schema.indexed_columns().count(), 1);
/// ```
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    attributes: Vec<(String, Attribute)>,
    engine: Option<String>,
    cache_provider: Option<String>,
    cache_size: Option<usize>,
}

impl SchemaBuilder {
    pub fn attribute(mut self, name: &str, attribute: Attribute) -> Self {
        self.attributes.push((name.to_string(), attribute));
        self
    }

    /// Storage engine by name (`json`, `json-pretty`).
    pub fn engine(mut self, name: &str) -> Self {
        self.engine = Some(name.to_string());
        self
    }

    /// Cache provider by name (`lru`, `rr`, `none`) and size.
    pub fn cache(mut self, provider: &str, size: usize) -> Self {
        self.cache_provider = Some(provider.to_string());
        self.cache_size = Some(size);
        self
    }

    pub fn cache_provider(mut self, provider: &str) -> Self {
        self.cache_provider = Some(provider.to_string());
        self
    }

    pub fn cache_size(mut self, size: usize) -> Self {
        self.cache_size = Some(size);
        self
    }

    /// Validate and compile the schema.
    ///
    /// # Errors
    /// - `Error::InvalidSchema` for bad names, duplicate attributes or bad formats
    /// - `Error::InvalidEngine` / `Error::InvalidCacheProvider` for unknown names
    /// - `Error::InvalidCacheSize` for a size of 0
    pub fn build(self) -> Result<Schema> {
        validate_type_name(&self.name)?;

        let engine = self
            .engine
            .as_deref()
            .map(str::parse::<EngineKind>)
            .transpose()?;
        let cache_provider = self
            .cache_provider
            .as_deref()
            .map(str::parse::<CacheProvider>)
            .transpose()?;
        if let Some(0) = self.cache_size {
            return Err(Error::InvalidCacheSize(0));
        }

        let mut attributes: Vec<(String, AttributeDescriptor)> = Vec::new();
        for (name, attribute) in self.attributes {
            validate_attribute_name(&name)?;
            if attributes.iter().any(|(n, _)| *n == name) {
                return Err(Error::InvalidSchema(format!(
                    "attribute '{}' declared twice",
                    name
                )));
            }
            let descriptor = attribute.compile(&name)?;
            attributes.push((name, descriptor));
        }

        debug!(doc_type = %self.name, attributes = attributes.len(), "schema built");
        Ok(Schema {
            name: self.name,
            attributes,
            engine,
            cache_provider,
            cache_size: self.cache_size,
        })
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn validate_type_name(name: &str) -> Result<()> {
    let ok = !name.is_empty()
        && name
            .split("::")
            .all(|part| !part.is_empty() && part.chars().all(is_name_char));
    if ok {
        Ok(())
    } else {
        Err(Error::InvalidSchema(format!("bad type name '{}'", name)))
    }
}

fn validate_attribute_name(name: &str) -> Result<()> {
    if !name.is_empty() && name.chars().all(is_name_char) {
        Ok(())
    } else {
        Err(Error::InvalidSchema(format!("bad attribute name '{}'", name)))
    }
}
