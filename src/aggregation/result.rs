//! Response parsing - from engine aggregation JSON to the bucket tree
//!
//! The parser walks the response alongside the request tree it was compiled
//! from: `calc_*` keys unwrap to flattened calculation values, `doc_count`
//! becomes `count`, objects carrying `buckets` recurse as bucket lists
//! (trimmed back to the requested size for quality-assured terms) and other
//! objects recurse as single-bucket nodes.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use super::calculation::CALC_PREFIX;
use super::{Aggregations, BucketAggregation, SOURCE_FIELDS_KEY};
use crate::error::{CuttleError, Result};

/// Reject responses reporting shard failures
///
/// Any failed shard aborts the whole request; there is no partial-result
/// tolerance.
pub fn check_shards(response: &Value) -> Result<()> {
    if let Some(shards) = response.get("_shards") {
        let failed = shards.get("failed").and_then(Value::as_u64).unwrap_or(0);
        if failed > 0 {
            let total = shards.get("total").and_then(Value::as_u64).unwrap_or(0);
            return Err(CuttleError::ShardFailure { failed, total });
        }
    }
    Ok(())
}

/// Parsed aggregation section of one response
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AggregationResults {
    /// Top-level calculations, keyed `<kind>_<field>`
    pub calculations: Vec<(String, f64)>,
    entries: Vec<(String, AggregationResult)>,
}

impl AggregationResults {
    /// Look up an aggregation result by name
    pub fn get(&self, name: &str) -> Option<&AggregationResult> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, r)| r)
    }

    /// All parsed aggregations, in response order
    pub fn entries(&self) -> &[(String, AggregationResult)] {
        &self.entries
    }

    /// Number of parsed aggregations
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was parsed
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.calculations.is_empty()
    }
}

/// Result of one aggregation: a bucket list or a single-bucket node
#[derive(Clone, Debug, PartialEq)]
pub enum AggregationResult {
    /// terms/range/date_histogram style bucket lists
    Buckets(Vec<Bucket>),
    /// filter/nested style single-bucket nodes
    Node(AggregationNode),
}

impl AggregationResult {
    /// The bucket list, if this result is one
    pub fn as_buckets(&self) -> Option<&[Bucket]> {
        match self {
            AggregationResult::Buckets(buckets) => Some(buckets),
            AggregationResult::Node(_) => None,
        }
    }

    /// The single-bucket node, if this result is one
    pub fn as_node(&self) -> Option<&AggregationNode> {
        match self {
            AggregationResult::Buckets(_) => None,
            AggregationResult::Node(node) => Some(node),
        }
    }
}

/// Single-bucket result of a filter or nested aggregation
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AggregationNode {
    /// Documents that fell into this scope
    pub count: Option<u64>,
    /// Flattened calculations, keyed `<kind>_<field>`
    pub calculations: Vec<(String, f64)>,
    /// Top-document enrichment, when requested
    pub source_fields: Option<Value>,
    /// Nested aggregation results, in response order
    pub children: Vec<(String, AggregationResult)>,
}

impl AggregationNode {
    /// Look up a calculation value
    pub fn calculation(&self, name: &str) -> Option<f64> {
        self.calculations
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// Look up a child aggregation result
    pub fn child(&self, name: &str) -> Option<&AggregationResult> {
        self.children
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, r)| r)
    }
}

/// One grouped result of a bucketing aggregation
#[derive(Clone, Debug, PartialEq)]
pub struct Bucket {
    /// Bucket key, preferring the formatted string form when present
    pub key: Value,
    /// Documents in the bucket
    pub count: u64,
    /// Flattened calculations, keyed `<kind>_<field>`
    pub calculations: Vec<(String, f64)>,
    /// Top-document enrichment, when requested
    pub source_fields: Option<Value>,
    /// Nested aggregation results, in response order
    pub children: Vec<(String, AggregationResult)>,
}

impl Bucket {
    /// The key as a string, if it is one
    pub fn key_str(&self) -> Option<&str> {
        self.key.as_str()
    }

    /// Interpret the key as a UTC timestamp
    ///
    /// Works for epoch-millisecond keys (date histograms without a format)
    /// and RFC 3339 formatted keys.
    pub fn key_as_datetime(&self) -> Option<DateTime<Utc>> {
        match &self.key {
            Value::Number(n) => n
                .as_i64()
                .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            _ => None,
        }
    }

    /// Look up a calculation value
    pub fn calculation(&self, name: &str) -> Option<f64> {
        self.calculations
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// Look up a child aggregation result
    pub fn child(&self, name: &str) -> Option<&AggregationResult> {
        self.children
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, r)| r)
    }
}

impl Aggregations {
    /// Parse a full engine response
    ///
    /// Rejects shard failures, then parses the `aggregations` section
    /// against this request tree.
    pub fn parse_response(&self, response: &Value) -> Result<AggregationResults> {
        check_shards(response)?;
        match response.get("aggregations") {
            Some(aggregations) => self.parse_aggregations(aggregations),
            None if self.is_empty() => Ok(AggregationResults::default()),
            None => Err(CuttleError::InvalidResponse(
                "response carries no aggregations".to_string(),
            )),
        }
    }

    /// Parse the `aggregations` object of a response
    pub fn parse_aggregations(&self, aggregations: &Value) -> Result<AggregationResults> {
        let obj = aggregations.as_object().ok_or_else(|| {
            CuttleError::InvalidResponse("aggregations must be an object".to_string())
        })?;
        let body = parse_body(Some(self), obj)?;
        Ok(AggregationResults {
            calculations: body.calculations,
            entries: body.children,
        })
    }
}

#[derive(Default)]
struct ParsedBody {
    key: Option<Value>,
    key_as_string: Option<String>,
    count: Option<u64>,
    calculations: Vec<(String, f64)>,
    source_fields: Option<Value>,
    children: Vec<(String, AggregationResult)>,
}

fn parse_body(level: Option<&Aggregations>, obj: &Map<String, Value>) -> Result<ParsedBody> {
    let mut body = ParsedBody::default();
    for (key, value) in obj {
        match key.as_str() {
            "key" => body.key = Some(value.clone()),
            "key_as_string" => body.key_as_string = value.as_str().map(str::to_string),
            "doc_count" => body.count = value.as_u64(),
            SOURCE_FIELDS_KEY => {
                body.source_fields = value
                    .pointer("/hits/hits/0/_source")
                    .cloned();
            }
            name if name.starts_with(CALC_PREFIX) => {
                if let Some(v) = value.get("value").and_then(Value::as_f64) {
                    body.calculations
                        .push((name[CALC_PREFIX.len()..].to_string(), v));
                }
            }
            name => {
                if let Some(child_obj) = value.as_object() {
                    let request = level.and_then(|l| l.bucket(name));
                    body.children
                        .push((name.to_string(), parse_result(request, child_obj)?));
                }
            }
        }
    }
    Ok(body)
}

fn parse_result(
    request: Option<&BucketAggregation>,
    obj: &Map<String, Value>,
) -> Result<AggregationResult> {
    match obj.get("buckets") {
        Some(buckets) => {
            let list = buckets.as_array().ok_or_else(|| {
                CuttleError::InvalidResponse("buckets must be an array".to_string())
            })?;
            let mut parsed = list
                .iter()
                .map(|bucket| parse_bucket(request, bucket))
                .collect::<Result<Vec<_>>>()?;
            if let Some(BucketAggregation::Terms(terms)) = request {
                if terms.quality_assured() {
                    // Quality-assured responses are oversampled; only the
                    // requested prefix is surfaced.
                    parsed.truncate(terms.requested_size());
                }
            }
            Ok(AggregationResult::Buckets(parsed))
        }
        None => {
            let body = parse_body(request.map(|r| r.children()), obj)?;
            Ok(AggregationResult::Node(AggregationNode {
                count: body.count,
                calculations: body.calculations,
                source_fields: body.source_fields,
                children: body.children,
            }))
        }
    }
}

fn parse_bucket(request: Option<&BucketAggregation>, value: &Value) -> Result<Bucket> {
    let obj = value
        .as_object()
        .ok_or_else(|| CuttleError::InvalidResponse("bucket must be an object".to_string()))?;
    let body = parse_body(request.map(|r| r.children()), obj)?;
    let key = match (body.key_as_string, body.key) {
        (Some(formatted), _) => Value::String(formatted),
        (None, Some(raw)) => raw,
        (None, None) => Value::Null,
    };
    Ok(Bucket {
        key,
        count: body.count.unwrap_or(0),
        calculations: body.calculations,
        source_fields: body.source_fields,
        children: body.children,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::{FilterAggregation, NestedAggregation, TermsAggregation};
    use crate::condition::{ConditionSet, QueryMode};
    use crate::schema::{FieldKind, SchemaBuilder};
    use serde_json::json;

    fn aggs_with(bucket: impl Into<BucketAggregation>) -> Aggregations {
        let mut aggs = Aggregations::new();
        aggs.add(bucket);
        aggs
    }

    #[test]
    fn test_shard_failure_rejected() {
        let response = json!({ "_shards": { "total": 5, "failed": 2 }, "aggregations": {} });
        let err = Aggregations::new().parse_response(&response).unwrap_err();
        assert!(matches!(
            err,
            CuttleError::ShardFailure { failed: 2, total: 5 }
        ));
    }

    #[test]
    fn test_parse_terms_buckets_with_calculations() {
        let aggs = aggs_with(
            TermsAggregation::new("genres", "genre")
                .sum("rating")
                .avg("rating"),
        );
        let response = json!({ "aggregations": { "genres": { "buckets": [
            {
                "key": "drama",
                "doc_count": 12,
                "calc_sum_rating": { "value": 40.5 },
                "calc_avg_rating": { "value": 3.4 },
            },
        ] } } });
        let results = aggs.parse_response(&response).unwrap();
        let buckets = results.get("genres").unwrap().as_buckets().unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].key, json!("drama"));
        assert_eq!(buckets[0].count, 12);
        assert_eq!(buckets[0].calculation("sum_rating"), Some(40.5));
        assert_eq!(buckets[0].calculation("avg_rating"), Some(3.4));
    }

    #[test]
    fn test_formatted_key_preferred() {
        let aggs = aggs_with(TermsAggregation::new("months", "released_at"));
        let response = json!({ "aggregations": { "months": { "buckets": [
            { "key": 1704067200000i64, "key_as_string": "2024-01", "doc_count": 3 },
        ] } } });
        let results = aggs.parse_response(&response).unwrap();
        let buckets = results.get("months").unwrap().as_buckets().unwrap();
        assert_eq!(buckets[0].key, json!("2024-01"));
    }

    #[test]
    fn test_epoch_key_as_datetime() {
        let aggs = aggs_with(TermsAggregation::new("months", "released_at"));
        let response = json!({ "aggregations": { "months": { "buckets": [
            { "key": 1704067200000i64, "doc_count": 3 },
        ] } } });
        let results = aggs.parse_response(&response).unwrap();
        let buckets = results.get("months").unwrap().as_buckets().unwrap();
        let datetime = buckets[0].key_as_datetime().unwrap();
        assert_eq!(datetime.timestamp_millis(), 1704067200000);
    }

    #[test]
    fn test_quality_assured_buckets_trimmed() {
        let aggs = aggs_with(
            TermsAggregation::new("genres", "genre")
                .size(1)
                .ensure_quality(),
        );
        let response = json!({ "aggregations": { "genres": { "buckets": [
            { "key": "drama", "doc_count": 10 },
            { "key": "comedy", "doc_count": 8 },
            { "key": "horror", "doc_count": 5 },
        ] } } });
        let results = aggs.parse_response(&response).unwrap();
        let buckets = results.get("genres").unwrap().as_buckets().unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].key, json!("drama"));
    }

    #[test]
    fn test_nested_node_recursion() {
        let schema = SchemaBuilder::new("movies")
            .field("genre", FieldKind::Keyword)
            .build();
        let aggs = aggs_with(
            FilterAggregation::new(
                "dramas",
                ConditionSet::new(schema.context(QueryMode::Filter)),
            )
            .avg("rating")
            .child(TermsAggregation::new("years", "year")),
        );
        let response = json!({ "aggregations": { "dramas": {
            "doc_count": 42,
            "calc_avg_rating": { "value": 3.9 },
            "years": { "buckets": [
                { "key": 2021, "doc_count": 20 },
                { "key": 2022, "doc_count": 22 },
            ] },
        } } });
        let results = aggs.parse_response(&response).unwrap();
        let node = results.get("dramas").unwrap().as_node().unwrap();
        assert_eq!(node.count, Some(42));
        assert_eq!(node.calculation("avg_rating"), Some(3.9));
        let years = node.child("years").unwrap().as_buckets().unwrap();
        assert_eq!(years.len(), 2);
        assert_eq!(years[1].key, json!(2022));
    }

    #[test]
    fn test_source_fields_unwrapped() {
        let aggs = aggs_with(
            TermsAggregation::new("genres", "genre")
                .with_source_fields(vec!["title".to_string()]),
        );
        let response = json!({ "aggregations": { "genres": { "buckets": [
            {
                "key": "drama",
                "doc_count": 2,
                "source_fields": { "hits": { "hits": [
                    { "_source": { "title": "Dune" } },
                ] } },
            },
        ] } } });
        let results = aggs.parse_response(&response).unwrap();
        let buckets = results.get("genres").unwrap().as_buckets().unwrap();
        assert_eq!(buckets[0].source_fields, Some(json!({ "title": "Dune" })));
    }

    #[test]
    fn test_deep_nesting_through_nested_aggregation() {
        let aggs = aggs_with(
            NestedAggregation::new("variants", "variants")
                .child(TermsAggregation::new("colors", "variants.color")),
        );
        let response = json!({ "aggregations": { "variants": {
            "doc_count": 7,
            "colors": { "buckets": [
                { "key": "red", "doc_count": 4 },
            ] },
        } } });
        let results = aggs.parse_response(&response).unwrap();
        let node = results.get("variants").unwrap().as_node().unwrap();
        let colors = node.child("colors").unwrap().as_buckets().unwrap();
        assert_eq!(colors[0].key, json!("red"));
        assert_eq!(colors[0].count, 4);
    }

    #[test]
    fn test_missing_aggregations_section() {
        let aggs = aggs_with(TermsAggregation::new("genres", "genre"));
        let err = aggs.parse_response(&json!({})).unwrap_err();
        assert!(matches!(err, CuttleError::InvalidResponse(_)));
        assert!(Aggregations::new().parse_response(&json!({})).is_ok());
    }
}
