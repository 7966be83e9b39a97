//! Aggregation engine
//!
//! Compiles recursive bucketing requests into the engine's `aggs` JSON and
//! parses the matching response back into a bucket tree:
//! - Bucket variants: terms, filter, nested, range, date_histogram
//! - Per-bucket calculations (sum, avg), keyed `calc_<kind>_<field>`
//! - Optional top-1 source-field enrichment per bucket
//! - Two-phase quality assurance for exact top-N terms buckets
//!
//! # Example
//!
//! ```json
//! {
//!   "genres": {
//!     "terms": { "field": "genre", "size": 5 },
//!     "aggs": {
//!       "calc_avg_rating": { "avg": { "field": "rating" } }
//!     }
//!   }
//! }
//! ```

mod calculation;
mod date_histogram;
mod filter;
mod nested;
mod range;
mod result;
mod terms;

pub use calculation::{CalcKind, Calculation};
pub use date_histogram::DateHistogramAggregation;
pub use filter::FilterAggregation;
pub use nested::NestedAggregation;
pub use range::{RangeAggregation, RangeBand};
pub use result::{check_shards, AggregationNode, AggregationResult, AggregationResults, Bucket};
pub use terms::{SortDirection, TermsAggregation};

use futures::future::BoxFuture;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::Result;

/// Ordered container of bucket aggregations and calculations for one level
#[derive(Clone, Debug, Default)]
pub struct Aggregations {
    buckets: Vec<BucketAggregation>,
    calculations: Vec<Calculation>,
}

impl Aggregations {
    /// Create an empty container
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bucket aggregation
    pub fn add(&mut self, aggregation: impl Into<BucketAggregation>) -> &mut Self {
        self.buckets.push(aggregation.into());
        self
    }

    /// Add a calculation at this level (no-op if the combination exists)
    pub fn add_calculation(&mut self, calculation: Calculation) -> &mut Self {
        if !self
            .calculations
            .iter()
            .any(|c| c.combo_name() == calculation.combo_name())
        {
            self.calculations.push(calculation);
        }
        self
    }

    /// Bucket aggregations of this level, in declaration order
    pub fn buckets(&self) -> &[BucketAggregation] {
        &self.buckets
    }

    /// Calculations of this level, in declaration order
    pub fn calculations(&self) -> &[Calculation] {
        &self.calculations
    }

    /// Look up a bucket aggregation by name
    pub fn bucket(&self, name: &str) -> Option<&BucketAggregation> {
        self.buckets.iter().find(|b| b.name() == name)
    }

    /// Whether this level requests nothing
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty() && self.calculations.is_empty()
    }

    /// Whether any terms aggregation in the tree requests quality assurance
    pub fn requires_quality_assurance(&self) -> bool {
        self.buckets.iter().any(|b| b.requires_quality_assurance())
    }

    /// Compile this level into the engine `aggs` object
    pub fn to_elastic(&self) -> BoxFuture<'_, Result<Value>> {
        Box::pin(async move {
            debug!(
                buckets = self.buckets.len(),
                calculations = self.calculations.len(),
                "compiling aggregations"
            );
            let mut aggs = Map::new();
            for calculation in &self.calculations {
                aggs.insert(calculation.combo_name(), calculation.to_elastic());
            }
            for bucket in &self.buckets {
                aggs.insert(bucket.name().to_string(), bucket.to_elastic().await?);
            }
            Ok(Value::Object(aggs))
        })
    }
}

/// One bucket aggregation of any variant
#[derive(Clone, Debug)]
pub enum BucketAggregation {
    Terms(TermsAggregation),
    Filter(FilterAggregation),
    Nested(NestedAggregation),
    Range(RangeAggregation),
    DateHistogram(DateHistogramAggregation),
}

impl BucketAggregation {
    /// Name of the aggregation (the response key)
    pub fn name(&self) -> &str {
        match self {
            BucketAggregation::Terms(a) => a.name(),
            BucketAggregation::Filter(a) => a.name(),
            BucketAggregation::Nested(a) => a.name(),
            BucketAggregation::Range(a) => a.name(),
            BucketAggregation::DateHistogram(a) => a.name(),
        }
    }

    /// Child aggregations of this bucket
    pub fn children(&self) -> &Aggregations {
        match self {
            BucketAggregation::Terms(a) => a.children(),
            BucketAggregation::Filter(a) => a.children(),
            BucketAggregation::Nested(a) => a.children(),
            BucketAggregation::Range(a) => a.children(),
            BucketAggregation::DateHistogram(a) => a.children(),
        }
    }

    /// Whether this aggregation (or any child) requests quality assurance
    pub fn requires_quality_assurance(&self) -> bool {
        let own = matches!(self, BucketAggregation::Terms(t) if t.quality_assured());
        own || self.children().requires_quality_assurance()
    }

    /// Compile this aggregation into its named object
    pub fn to_elastic(&self) -> BoxFuture<'_, Result<Value>> {
        Box::pin(async move {
            match self {
                BucketAggregation::Terms(a) => a.to_elastic().await,
                BucketAggregation::Filter(a) => a.to_elastic().await,
                BucketAggregation::Nested(a) => a.to_elastic().await,
                BucketAggregation::Range(a) => a.to_elastic().await,
                BucketAggregation::DateHistogram(a) => a.to_elastic().await,
            }
        })
    }

    /// Calculations of this aggregation's level
    pub fn calculations(&self) -> &[Calculation] {
        match self {
            BucketAggregation::Terms(a) => a.calculations(),
            BucketAggregation::Filter(a) => a.calculations(),
            BucketAggregation::Nested(a) => a.calculations(),
            BucketAggregation::Range(a) => a.calculations(),
            BucketAggregation::DateHistogram(a) => a.calculations(),
        }
    }
}

impl From<TermsAggregation> for BucketAggregation {
    fn from(a: TermsAggregation) -> Self {
        BucketAggregation::Terms(a)
    }
}

impl From<FilterAggregation> for BucketAggregation {
    fn from(a: FilterAggregation) -> Self {
        BucketAggregation::Filter(a)
    }
}

impl From<NestedAggregation> for BucketAggregation {
    fn from(a: NestedAggregation) -> Self {
        BucketAggregation::Nested(a)
    }
}

impl From<RangeAggregation> for BucketAggregation {
    fn from(a: RangeAggregation) -> Self {
        BucketAggregation::Range(a)
    }
}

impl From<DateHistogramAggregation> for BucketAggregation {
    fn from(a: DateHistogramAggregation) -> Self {
        BucketAggregation::DateHistogram(a)
    }
}

/// Key of the top-1 source-field enrichment sub-aggregation
pub(crate) const SOURCE_FIELDS_KEY: &str = "source_fields";

/// Merge calculations, source-field projection and children into one `aggs`
/// object; returns `None` when the level is empty
pub(crate) async fn sub_aggs(
    calculations: &[Calculation],
    source_fields: Option<&[String]>,
    children: &Aggregations,
) -> Result<Option<Value>> {
    let mut aggs = Map::new();
    for calculation in calculations {
        aggs.insert(calculation.combo_name(), calculation.to_elastic());
    }
    if let Some(fields) = source_fields {
        aggs.insert(
            SOURCE_FIELDS_KEY.to_string(),
            json!({ "top_hits": { "size": 1, "_source": fields } }),
        );
    }
    if !children.is_empty() {
        if let Value::Object(child_aggs) = children.to_elastic().await? {
            aggs.extend(child_aggs);
        }
    }
    Ok(if aggs.is_empty() {
        None
    } else {
        Some(Value::Object(aggs))
    })
}

/// Push a calculation into a level, keeping combinations unique
pub(crate) fn push_calculation(calculations: &mut Vec<Calculation>, calculation: Calculation) {
    if !calculations
        .iter()
        .any(|c| c.combo_name() == calculation.combo_name())
    {
        calculations.push(calculation);
    }
}
