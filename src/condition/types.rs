//! Core types for the condition system

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Operator kind of a field condition
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// Exact equality (`term`); array values compile to an OR of equalities
    Equals,
    /// Prefix match (`prefix`)
    Prefix,
    /// Analyzed full-text match (`match`)
    Match,
    /// Analyzed phrase match (`match_phrase`)
    MatchPhrase,
    /// Full-text match over several fields (`multi_match`)
    MultiMatch,
    /// Range constraint (`range`); bounds accumulate independently
    Range,
    /// Field presence (`exists`)
    Exists,
}

/// Operator for combining terms of an analyzed match
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchOperator {
    /// All terms must match (AND)
    And,
    /// At least one term must match (OR)
    #[default]
    Or,
}

impl MatchOperator {
    /// Wire name of the operator
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchOperator::And => "and",
            MatchOperator::Or => "or",
        }
    }
}

/// Range bounds of a range condition
///
/// Each bound may be set once; bounds are independent of each other and of
/// the order they were set in.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeBounds {
    /// Greater than
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gt: Option<Value>,
    /// Greater than or equal to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<Value>,
    /// Less than
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lt: Option<Value>,
    /// Less than or equal to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<Value>,
}

impl RangeBounds {
    /// Whether no bound has been set yet
    pub fn is_empty(&self) -> bool {
        self.gt.is_none() && self.gte.is_none() && self.lt.is_none() && self.lte.is_none()
    }
}

/// Per-clause option bag
///
/// Options apply to the clause being built and are duplicated into chain
/// heads like the rest of the static configuration is not: a fresh head
/// starts with default options.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClauseOptions {
    /// Boost factor for scoring
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boost: Option<f64>,
    /// Case-insensitive matching for term/prefix clauses
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub case_insensitive: bool,
    /// Field list for multi-field full-text clauses
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub fields: Vec<String>,
    /// Term combinator for analyzed match clauses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operator: Option<MatchOperator>,
}

/// Compiled boolean fragment of one condition chain
///
/// The three lists mirror the engine's bool-query occurrences. A fragment is
/// an intermediate exchange value: condition sets and clause links merge
/// fragments into each other before the final payload is assembled.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoolFragment {
    /// Clauses that must all match
    pub must: Vec<Value>,
    /// Alternative clauses, at least one of which should match
    pub should: Vec<Value>,
    /// Clauses that must not match
    pub must_not: Vec<Value>,
}

impl BoolFragment {
    /// Whether the fragment carries no clauses at all
    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.should.is_empty() && self.must_not.is_empty()
    }

    /// Reduce the fragment to a flat list of must-style entries
    ///
    /// `must` entries are kept verbatim, `should` becomes one grouped
    /// alternative and `must_not` one negated group.
    pub fn into_entries(self) -> Vec<Value> {
        let mut entries = self.must;
        if !self.should.is_empty() {
            entries.push(serde_json::json!({ "bool": { "should": self.should } }));
        }
        if !self.must_not.is_empty() {
            entries.push(serde_json::json!({ "bool": { "must_not": self.must_not } }));
        }
        entries
    }

    /// Reduce the fragment to a single clause value
    pub fn into_clause(self) -> Value {
        let mut entries = self.into_entries();
        if entries.len() == 1 {
            entries.remove(0)
        } else {
            serde_json::json!({ "bool": { "must": entries } })
        }
    }
}

/// Extract the physical field path a compiled clause targets
///
/// Used by the within-field fold heuristic: `{"term": {"title": …}}` targets
/// `title`, `{"exists": {"field": "title"}}` targets `title`, grouped or
/// multi-field clauses target nothing.
pub fn clause_field(clause: &Value) -> Option<&str> {
    let obj = clause.as_object()?;
    let (kind, body) = obj.iter().next()?;
    match kind.as_str() {
        "bool" | "multi_match" | "nested" => None,
        "exists" => body.as_object()?.get("field")?.as_str(),
        _ => body.as_object()?.keys().next().map(|k| k.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_range_bounds_serialization_skips_unset() {
        let bounds = RangeBounds {
            gt: Some(json!(10)),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&bounds).unwrap(), json!({ "gt": 10 }));
    }

    #[test]
    fn test_fragment_into_entries() {
        let frag = BoolFragment {
            must: vec![json!({ "term": { "a": { "value": 1 } } })],
            should: vec![json!({ "term": { "b": { "value": 2 } } })],
            must_not: vec![],
        };
        let entries = frag.into_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[1],
            json!({ "bool": { "should": [{ "term": { "b": { "value": 2 } } }] } })
        );
    }

    #[test]
    fn test_fragment_into_clause_unwraps_single() {
        let frag = BoolFragment {
            should: vec![json!({ "term": { "b": { "value": 2 } } })],
            ..Default::default()
        };
        assert_eq!(
            frag.into_clause(),
            json!({ "bool": { "should": [{ "term": { "b": { "value": 2 } } }] } })
        );

        let frag = BoolFragment {
            must: vec![json!({ "term": { "a": { "value": 1 } } })],
            ..Default::default()
        };
        assert_eq!(frag.into_clause(), json!({ "term": { "a": { "value": 1 } } }));
    }

    #[test]
    fn test_clause_field_detection() {
        assert_eq!(
            clause_field(&json!({ "term": { "title": { "value": "x" } } })),
            Some("title")
        );
        assert_eq!(
            clause_field(&json!({ "exists": { "field": "title" } })),
            Some("title")
        );
        assert_eq!(clause_field(&json!({ "bool": { "should": [] } })), None);
        assert_eq!(
            clause_field(&json!({ "multi_match": { "query": "x", "fields": ["a"] } })),
            None
        );
    }
}
