//! Document schemas.
//!
//! A schema is defined once per document type and never changes after the
//! type is registered. It maps attribute names to descriptors (expected
//! kind, optional format pattern, validators, unique and indexed flags) and
//! carries optional per-type engine and cache overrides.

mod attribute;
mod definition;

pub use attribute::{Attribute, AttributeDescriptor, Validator, ValidatorFn};
pub use definition::{Schema, SchemaBuilder};
