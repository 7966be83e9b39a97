//! Nested aggregation - buckets over a sub-document scope

use serde_json::{json, Map, Value};

use super::calculation::Calculation;
use super::{push_calculation, sub_aggs, Aggregations, BucketAggregation};
use crate::error::Result;

/// Steps the aggregation context into a sub-document array field
///
/// Children of this aggregation see the nested documents; their fields must
/// use the full nested path.
#[derive(Clone, Debug)]
pub struct NestedAggregation {
    name: String,
    path: String,
    calculations: Vec<Calculation>,
    source_fields: Option<Vec<String>>,
    children: Aggregations,
}

impl NestedAggregation {
    /// Create a nested aggregation over a sub-document path
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            calculations: Vec::new(),
            source_fields: None,
            children: Aggregations::new(),
        }
    }

    /// Name of the aggregation
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sub-document path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Add a sum calculation over the nested documents
    pub fn sum(mut self, field: impl Into<String>) -> Self {
        push_calculation(&mut self.calculations, Calculation::sum(field));
        self
    }

    /// Add an average calculation over the nested documents
    pub fn avg(mut self, field: impl Into<String>) -> Self {
        push_calculation(&mut self.calculations, Calculation::avg(field));
        self
    }

    /// Enrich the bucket with the given fields of its top document
    pub fn with_source_fields(mut self, fields: Vec<String>) -> Self {
        self.source_fields = Some(fields);
        self
    }

    /// Add a child aggregation
    pub fn child(mut self, aggregation: impl Into<BucketAggregation>) -> Self {
        self.children.add(aggregation);
        self
    }

    /// Child aggregations
    pub fn children(&self) -> &Aggregations {
        &self.children
    }

    /// Calculations of this level
    pub fn calculations(&self) -> &[Calculation] {
        &self.calculations
    }

    /// Compile to the engine aggregation object
    pub async fn to_elastic(&self) -> Result<Value> {
        let mut agg = Map::new();
        agg.insert("nested".to_string(), json!({ "path": self.path }));
        if let Some(aggs) = sub_aggs(
            &self.calculations,
            self.source_fields.as_deref(),
            &self.children,
        )
        .await?
        {
            agg.insert("aggs".to_string(), aggs);
        }
        Ok(Value::Object(agg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::TermsAggregation;
    use futures::executor::block_on;

    #[test]
    fn test_nested_with_child_terms() {
        let agg = NestedAggregation::new("variants", "variants")
            .child(TermsAggregation::new("colors", "variants.color").size(10));
        let compiled = block_on(agg.to_elastic()).unwrap();
        assert_eq!(compiled["nested"], json!({ "path": "variants" }));
        assert_eq!(
            compiled["aggs"]["colors"]["terms"],
            json!({ "field": "variants.color", "size": 10 })
        );
    }
}
