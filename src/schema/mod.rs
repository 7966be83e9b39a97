//! Declared search schemas
//!
//! A schema is the explicit map of what a document scope looks like to the
//! query compiler: logical field name → kind + physical path + value
//! transforms, and nested-scope name → nested schema. It is built once
//! through [`SchemaBuilder`] and shared immutably by every condition and
//! clause derived from it.

mod field_kind;

pub use field_kind::FieldKind;

use std::fmt;
use std::sync::Arc;

use crate::condition::context::{QueryMode, SearchContext};
use crate::condition::transform::ValueTransform;
use crate::error::{CuttleError, Result};

/// One declared field of a schema
#[derive(Clone)]
pub struct FieldDef {
    /// Logical name used by callers
    pub name: String,
    /// Physical path in the index (defaults to the logical name)
    pub path: String,
    /// Field kind
    pub kind: FieldKind,
    /// Value transform pipeline applied at compile time
    pub transforms: Vec<Arc<dyn ValueTransform>>,
}

impl FieldDef {
    /// Declare a field whose physical path equals its logical name
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        Self {
            path: name.clone(),
            name,
            kind,
            transforms: Vec::new(),
        }
    }

    /// Override the physical path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Append a value transform to the pipeline
    pub fn with_transform(mut self, transform: Arc<dyn ValueTransform>) -> Self {
        self.transforms.push(transform);
        self
    }
}

impl fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("transforms", &self.transforms.len())
            .finish()
    }
}

/// One declared nested sub-document scope
#[derive(Clone, Debug)]
pub struct NestedDef {
    /// Logical name (also the physical sub-document path)
    pub name: String,
    /// Schema of the sub-documents
    pub schema: Schema,
}

#[derive(Debug)]
struct SchemaInner {
    name: String,
    fields: Vec<FieldDef>,
    nested: Vec<NestedDef>,
}

/// Immutable handle to a declared schema
///
/// Cheap to clone; all conditions derived from one schema share the same
/// underlying declaration.
#[derive(Clone, Debug)]
pub struct Schema {
    inner: Arc<SchemaInner>,
}

impl Schema {
    /// Name of the schema (usually the index or content-type name)
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Declared fields, in declaration order
    pub fn fields(&self) -> &[FieldDef] {
        &self.inner.fields
    }

    /// Declared nested scopes, in declaration order
    pub fn nested(&self) -> &[NestedDef] {
        &self.inner.nested
    }

    /// Look up a field by logical name
    pub fn field(&self, name: &str) -> Result<&FieldDef> {
        self.inner
            .fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| CuttleError::UnknownField(name.to_string()))
    }

    /// Look up a nested scope by name
    pub fn nested_scope(&self, name: &str) -> Result<&NestedDef> {
        self.inner
            .nested
            .iter()
            .find(|n| n.name == name)
            .ok_or_else(|| CuttleError::UnknownScope(name.to_string()))
    }

    /// Create a search context over this schema
    ///
    /// The context fixes the boolean occurrence (filter vs. query) for every
    /// condition set derived from it.
    pub fn context(&self, mode: QueryMode) -> SearchContext {
        SearchContext::new(self.clone(), mode)
    }
}

/// Builder for [`Schema`]
///
/// # Example
///
/// ```
/// use cuttle::schema::{FieldKind, SchemaBuilder};
///
/// let variants = SchemaBuilder::new("variants")
///     .field("color", FieldKind::Keyword)
///     .build();
/// let products = SchemaBuilder::new("products")
///     .field("title", FieldKind::Text)
///     .field("rating", FieldKind::Double)
///     .nested("variants", variants)
///     .build();
/// ```
#[derive(Clone, Debug)]
pub struct SchemaBuilder {
    name: String,
    fields: Vec<FieldDef>,
    nested: Vec<NestedDef>,
}

impl SchemaBuilder {
    /// Start a schema with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            nested: Vec::new(),
        }
    }

    /// Declare a field whose physical path equals its logical name
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldDef::new(name, kind));
        self
    }

    /// Declare a field with explicit path/transforms
    pub fn field_def(mut self, def: FieldDef) -> Self {
        self.fields.push(def);
        self
    }

    /// Declare a nested sub-document scope
    pub fn nested(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.nested.push(NestedDef {
            name: name.into(),
            schema,
        });
        self
    }

    /// Finish the declaration
    pub fn build(self) -> Schema {
        Schema {
            inner: Arc::new(SchemaInner {
                name: self.name,
                fields: self.fields,
                nested: self.nested,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_lookup() {
        let schema = SchemaBuilder::new("movies")
            .field("title", FieldKind::Text)
            .field_def(FieldDef::new("genre", FieldKind::Keyword).with_path("genre.raw"))
            .build();

        assert_eq!(schema.field("title").unwrap().path, "title");
        assert_eq!(schema.field("genre").unwrap().path, "genre.raw");
        assert!(matches!(
            schema.field("missing"),
            Err(CuttleError::UnknownField(_))
        ));
    }

    #[test]
    fn test_nested_lookup() {
        let variants = SchemaBuilder::new("variants")
            .field("color", FieldKind::Keyword)
            .build();
        let schema = SchemaBuilder::new("products")
            .nested("variants", variants)
            .build();

        assert_eq!(schema.nested_scope("variants").unwrap().name, "variants");
        assert!(matches!(
            schema.nested_scope("parts"),
            Err(CuttleError::UnknownScope(_))
        ));
    }

    #[test]
    fn test_declaration_order_preserved() {
        let schema = SchemaBuilder::new("s")
            .field("b", FieldKind::Keyword)
            .field("a", FieldKind::Keyword)
            .build();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
