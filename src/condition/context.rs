//! Per-request search context
//!
//! The context is the owning-scope backreference carried by every condition:
//! it resolves logical field names to physical paths, applies the nested-path
//! prefix inside sub-document scopes, and fixes whether compiled fragments
//! land in the scoring or non-scoring boolean occurrence.

use serde::{Deserialize, Serialize};

use crate::condition::field::FieldCondition;
use crate::error::Result;
use crate::schema::Schema;

/// Boolean occurrence for a compiled condition set
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// Non-scoring occurrence; matching documents are filtered only
    #[default]
    Filter,
    /// Scoring occurrence; matching clauses contribute to relevance
    Query,
}

impl QueryMode {
    /// The bool-query key this mode compiles into
    pub fn key(&self) -> &'static str {
        match self {
            QueryMode::Filter => "filter",
            QueryMode::Query => "must",
        }
    }
}

/// Resolution context shared by all conditions of one request scope
#[derive(Clone, Debug)]
pub struct SearchContext {
    schema: Schema,
    mode: QueryMode,
    nested_path: Option<String>,
}

impl SearchContext {
    /// Create a root context over a schema
    pub fn new(schema: Schema, mode: QueryMode) -> Self {
        Self {
            schema,
            mode,
            nested_path: None,
        }
    }

    /// Derive the context of a nested sub-document scope
    ///
    /// Paths resolved through the derived context are prefixed with the full
    /// nested path.
    pub fn enter_nested(&self, name: &str) -> Result<SearchContext> {
        let def = self.schema.nested_scope(name)?;
        let path = match &self.nested_path {
            Some(prefix) => format!("{}.{}", prefix, name),
            None => name.to_string(),
        };
        Ok(SearchContext {
            schema: def.schema.clone(),
            mode: self.mode,
            nested_path: Some(path),
        })
    }

    /// The schema this context resolves against
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The boolean occurrence of this scope
    pub fn mode(&self) -> QueryMode {
        self.mode
    }

    /// Full nested path of this scope, if it is a sub-document scope
    pub fn nested_path(&self) -> Option<&str> {
        self.nested_path.as_deref()
    }

    /// Resolve a logical field name to its physical path
    pub fn resolve(&self, name: &str) -> Result<String> {
        let def = self.schema.field(name)?;
        Ok(match &self.nested_path {
            Some(prefix) => format!("{}.{}", prefix, def.path),
            None => def.path.clone(),
        })
    }

    /// Create a fresh condition for a field of this scope
    pub fn condition(&self, name: &str) -> Result<FieldCondition> {
        let def = self.schema.field(name)?;
        let path = match &self.nested_path {
            Some(prefix) => format!("{}.{}", prefix, def.path),
            None => def.path.clone(),
        };
        Ok(FieldCondition::new(
            def.name.clone(),
            path,
            self.clone(),
            def.transforms.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldKind, SchemaBuilder};

    fn schema() -> Schema {
        let variants = SchemaBuilder::new("variants")
            .field("color", FieldKind::Keyword)
            .build();
        SchemaBuilder::new("products")
            .field("title", FieldKind::Text)
            .nested("variants", variants)
            .build()
    }

    #[test]
    fn test_mode_keys() {
        assert_eq!(QueryMode::Filter.key(), "filter");
        assert_eq!(QueryMode::Query.key(), "must");
    }

    #[test]
    fn test_root_resolution() {
        let ctx = schema().context(QueryMode::Filter);
        assert_eq!(ctx.resolve("title").unwrap(), "title");
        assert!(ctx.resolve("color").is_err());
    }

    #[test]
    fn test_nested_prefixing() {
        let ctx = schema().context(QueryMode::Filter);
        let nested = ctx.enter_nested("variants").unwrap();
        assert_eq!(nested.nested_path(), Some("variants"));
        assert_eq!(nested.resolve("color").unwrap(), "variants.color");
    }
}
