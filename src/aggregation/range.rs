//! Range aggregation - buckets per declared value band

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::calculation::Calculation;
use super::{push_calculation, sub_aggs, Aggregations, BucketAggregation};
use crate::error::Result;

/// One value band of a range aggregation
///
/// Bands are half-open: `from` is inclusive, `to` exclusive. Either side may
/// be absent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeBand {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Value>,
}

impl RangeBand {
    pub fn new() -> Self {
        Self::default()
    }

    /// Explicit bucket key (defaults to the engine-generated one)
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Inclusive lower bound
    pub fn with_from(mut self, from: impl Into<Value>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Exclusive upper bound
    pub fn with_to(mut self, to: impl Into<Value>) -> Self {
        self.to = Some(to.into());
        self
    }
}

/// Buckets documents into declared value bands of a field
#[derive(Clone, Debug)]
pub struct RangeAggregation {
    name: String,
    field: String,
    bands: Vec<RangeBand>,
    calculations: Vec<Calculation>,
    source_fields: Option<Vec<String>>,
    children: Aggregations,
}

impl RangeAggregation {
    /// Create a range aggregation over a physical field
    pub fn new(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
            bands: Vec::new(),
            calculations: Vec::new(),
            source_fields: None,
            children: Aggregations::new(),
        }
    }

    /// Name of the aggregation
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a value band; bands keep declaration order
    pub fn band(mut self, band: RangeBand) -> Self {
        self.bands.push(band);
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
        let bands = self
            .bands
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let mut agg = Map::new();
        agg.insert(
            "range".to_string(),
            json!({ "field": self.field, "ranges": bands }),
        );
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
