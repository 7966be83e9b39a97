//! Filter aggregation - one bucket restricted by a condition set

use serde_json::{json, Map, Value};

use super::calculation::Calculation;
use super::{push_calculation, sub_aggs, Aggregations, BucketAggregation};
use crate::condition::ConditionSet;
use crate::error::Result;

/// Buckets the documents matching a condition set
///
/// The content is an ordinary [`ConditionSet`] compiled in place; an empty
/// set buckets every document (`match_all`).
#[derive(Clone, Debug)]
pub struct FilterAggregation {
    name: String,
    content: ConditionSet,
    calculations: Vec<Calculation>,
    source_fields: Option<Vec<String>>,
    children: Aggregations,
}

impl FilterAggregation {
    /// Create a filter aggregation over a condition set
    pub fn new(name: impl Into<String>, content: ConditionSet) -> Self {
        Self {
            name: name.into(),
            content,
            calculations: Vec::new(),
            source_fields: None,
            children: Aggregations::new(),
        }
    }

    /// Name of the aggregation
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a sum calculation per bucket
    pub fn sum(mut self, field: impl Into<String>) -> Self {
        push_calculation(&mut self.calculations, Calculation::sum(field));
        self
    }

    /// Add an average calculation per bucket
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
        let filter = if self.content.is_empty() {
            json!({ "match_all": {} })
        } else {
            self.content.build_query().await?
        };
        let mut agg = Map::new();
        agg.insert("filter".to_string(), filter);
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
