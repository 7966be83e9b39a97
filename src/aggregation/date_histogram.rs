//! Date-histogram aggregation - buckets per calendar interval

use serde_json::{json, Map, Value};

use super::calculation::Calculation;
use super::{push_calculation, sub_aggs, Aggregations, BucketAggregation};
use crate::error::Result;

/// Buckets documents of a date field per calendar interval
///
/// The interval is engine-native (`"day"`, `"week"`, `"month"`, `"1h"`, …).
/// When a format is set, bucket keys additionally carry a formatted string
/// which the parser prefers over the epoch key.
#[derive(Clone, Debug)]
pub struct DateHistogramAggregation {
    name: String,
    field: String,
    interval: String,
    format: Option<String>,
    min_doc_count: Option<u64>,
    calculations: Vec<Calculation>,
    source_fields: Option<Vec<String>>,
    children: Aggregations,
}

impl DateHistogramAggregation {
    /// Create a date histogram over a physical field
    pub fn new(
        name: impl Into<String>,
        field: impl Into<String>,
        interval: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
            interval: interval.into(),
            format: None,
            min_doc_count: None,
            calculations: Vec::new(),
            source_fields: None,
            children: Aggregations::new(),
        }
    }

    /// Name of the aggregation
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the key format (engine-native date pattern)
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Only return buckets with at least this many documents
    pub fn min_doc_count(mut self, count: u64) -> Self {
        self.min_doc_count = Some(count);
        self
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

    /// Enrich each bucket with the given fields of its top document
    pub fn with_source_fields(mut self, fields: Vec<String>) -> Self {
        self.source_fields = Some(fields);
        self
    }

    /// Add a child aggregation per bucket
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
        let mut histogram = Map::new();
        histogram.insert("field".to_string(), json!(self.field));
        histogram.insert("calendar_interval".to_string(), json!(self.interval));
        if let Some(format) = &self.format {
            histogram.insert("format".to_string(), json!(format));
        }
        if let Some(count) = self.min_doc_count {
            histogram.insert("min_doc_count".to_string(), json!(count));
        }
        let mut agg = Map::new();
        agg.insert("date_histogram".to_string(), Value::Object(histogram));
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
    use futures::executor::block_on;

    #[test]
    fn test_compiles_interval_and_format() {
        let agg = DateHistogramAggregation::new("by_month", "released_at", "month")
            .format("yyyy-MM")
            .min_doc_count(1)
            .sum("revenue");
        let compiled = block_on(agg.to_elastic()).unwrap();
        assert_eq!(
            compiled["date_histogram"],
            json!({
                "field": "released_at",
                "calendar_interval": "month",
                "format": "yyyy-MM",
                "min_doc_count": 1,
            })
        );
        assert_eq!(
            compiled["aggs"]["calc_sum_revenue"],
            json!({ "sum": { "field": "revenue" } })
        );
    }
}
