//! Terms aggregation - buckets per distinct field value

use serde_json::{json, Map, Value};

use super::calculation::Calculation;
use super::{push_calculation, sub_aggs, Aggregations, BucketAggregation, CalcKind};
use crate::error::Result;

/// Default number of returned buckets
const DEFAULT_SIZE: usize = 5;

/// Oversampling factor of the quality-assurance first pass
const OVERSAMPLE_FACTOR: usize = 3;

/// Extra per-shard headroom of the quality-assurance first pass
const SHARD_SIZE_PADDING: usize = 1000;

/// Sort direction of a bucket order
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Wire name of the direction
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Buckets documents per distinct value of a field
///
/// Distributed counting is approximate; [`ensure_quality`](Self::ensure_quality)
/// opts a terms aggregation into the two-phase protocol that makes the
/// top-N exact: the first pass oversamples, the orchestrator re-issues the
/// query restricted to the returned keys, and parsing trims back to the
/// requested size.
#[derive(Clone, Debug)]
pub struct TermsAggregation {
    name: String,
    field: String,
    size: usize,
    sort: Option<(String, SortDirection)>,
    quality_assured: bool,
    min_doc_count: Option<u64>,
    calculations: Vec<Calculation>,
    source_fields: Option<Vec<String>>,
    children: Aggregations,
}

impl TermsAggregation {
    /// Create a terms aggregation over a physical field
    pub fn new(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
            size: DEFAULT_SIZE,
            sort: None,
            quality_assured: false,
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

    /// Physical field being bucketed
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Set the number of returned buckets
    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Request exact top-N accuracy via the two-phase protocol
    pub fn ensure_quality(mut self) -> Self {
        self.quality_assured = true;
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

    /// Sort buckets by a calculation, adding it if absent
    pub fn order(mut self, kind: CalcKind, field: impl Into<String>, direction: SortDirection) -> Self {
        let calculation = Calculation {
            kind,
            field: field.into(),
        };
        let combo = calculation.combo_name();
        push_calculation(&mut self.calculations, calculation);
        self.sort = Some((combo, direction));
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

    /// Whether the two-phase protocol was requested
    pub fn quality_assured(&self) -> bool {
        self.quality_assured
    }

    /// The size the caller asked for (buckets after trimming)
    pub fn requested_size(&self) -> usize {
        self.size
    }

    /// The size actually sent on a quality-assured first pass
    pub fn oversampled_size(&self) -> usize {
        self.size * OVERSAMPLE_FACTOR
    }

    /// Compile to the engine aggregation object
    pub async fn to_elastic(&self) -> Result<Value> {
        let mut terms = Map::new();
        terms.insert("field".to_string(), json!(self.field));
        if self.quality_assured {
            // Oversample so the keys-restricted second pass can rank
            // exactly; parsing trims back to the requested size.
            terms.insert("size".to_string(), json!(self.oversampled_size()));
            terms.insert(
                "shard_size".to_string(),
                json!(self.oversampled_size() + SHARD_SIZE_PADDING),
            );
        } else {
            terms.insert("size".to_string(), json!(self.size));
        }
        if let Some(count) = self.min_doc_count {
            terms.insert("min_doc_count".to_string(), json!(count));
        }
        if let Some((combo, direction)) = &self.sort {
            terms.insert("order".to_string(), json!({ combo.as_str(): direction.as_str() }));
        }

        let mut agg = Map::new();
        agg.insert("terms".to_string(), Value::Object(terms));
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
    fn test_default_size() {
        let agg = TermsAggregation::new("genres", "genre");
        let compiled = block_on(agg.to_elastic()).unwrap();
        assert_eq!(
            compiled,
            json!({ "terms": { "field": "genre", "size": 5 } })
        );
    }

    #[test]
    fn test_quality_assurance_oversamples() {
        let agg = TermsAggregation::new("genres", "genre").size(1).ensure_quality();
        let compiled = block_on(agg.to_elastic()).unwrap();
        assert_eq!(
            compiled["terms"],
            json!({ "field": "genre", "size": 3, "shard_size": 1003 })
        );
        assert_eq!(agg.requested_size(), 1);
        assert_eq!(agg.oversampled_size(), 3);
    }

    #[test]
    fn test_calculations_are_keyed_and_unique() {
        let agg = TermsAggregation::new("titles", "title")
            .sum("rating")
            .avg("rating")
            .sum("rating");
        let compiled = block_on(agg.to_elastic()).unwrap();
        assert_eq!(
            compiled["aggs"],
            json!({
                "calc_sum_rating": { "sum": { "field": "rating" } },
                "calc_avg_rating": { "avg": { "field": "rating" } },
            })
        );
    }

    #[test]
    fn test_order_adds_calculation_if_absent() {
        let agg = TermsAggregation::new("genres", "genre").order(
            CalcKind::Avg,
            "rating",
            SortDirection::Desc,
        );
        let compiled = block_on(agg.to_elastic()).unwrap();
        assert_eq!(
            compiled["terms"]["order"],
            json!({ "calc_avg_rating": "desc" })
        );
        assert_eq!(
            compiled["aggs"]["calc_avg_rating"],
            json!({ "avg": { "field": "rating" } })
        );
    }

    #[test]
    fn test_source_fields_compile_to_top_hits() {
        let agg = TermsAggregation::new("genres", "genre")
            .with_source_fields(vec!["title".to_string()]);
        let compiled = block_on(agg.to_elastic()).unwrap();
        assert_eq!(
            compiled["aggs"]["source_fields"],
            json!({ "top_hits": { "size": 1, "_source": ["title"] } })
        );
    }

    #[test]
    fn test_min_doc_count() {
        let agg = TermsAggregation::new("genres", "genre").min_doc_count(2);
        let compiled = block_on(agg.to_elastic()).unwrap();
        assert_eq!(compiled["terms"]["min_doc_count"], json!(2));
    }
}
