//! Field conditions - one field's declarative constraint
//!
//! A [`FieldCondition`] holds the operator, value and options of a single
//! field constraint plus the And/Or/Not chains attached to it. Compilation
//! (`to_elastic`) turns the whole chain into a boolean fragment following the
//! cross-field and within-field precedence rules.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::{json, Map, Value};

use crate::condition::capabilities::{
    SupportsEquality, SupportsExistence, SupportsMatch, SupportsRange,
};
use crate::condition::clause::{AndClause, NotClause, OrClause};
use crate::condition::context::SearchContext;
use crate::condition::transform::ValueTransform;
use crate::condition::types::{clause_field, BoolFragment, ClauseOptions, MatchOperator, Operator, RangeBounds};
use crate::error::{CuttleError, Result};

/// One AND link of a condition chain
#[derive(Clone, Debug)]
pub(crate) struct AndLink {
    pub(crate) condition: FieldCondition,
    pub(crate) negated: bool,
}

/// Declarative constraint on one field
///
/// Created through a [`SearchContext`] (usually via
/// [`ConditionSet::field`](crate::condition::ConditionSet::field)), which
/// resolves the logical name to a physical path. A scalar value may be set
/// exactly once; range bounds accumulate independently.
#[derive(Clone)]
pub struct FieldCondition {
    name: String,
    path: String,
    context: SearchContext,
    transforms: Vec<Arc<dyn ValueTransform>>,
    op: Option<Operator>,
    value: Option<Value>,
    range: RangeBounds,
    options: ClauseOptions,
    pub(crate) and_links: Vec<AndLink>,
    pub(crate) or_links: Vec<FieldCondition>,
    pub(crate) not_links: Vec<FieldCondition>,
}

enum Bound {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl FieldCondition {
    pub(crate) fn new(
        name: String,
        path: String,
        context: SearchContext,
        transforms: Vec<Arc<dyn ValueTransform>>,
    ) -> Self {
        Self {
            name,
            path,
            context,
            transforms,
            op: None,
            value: None,
            range: RangeBounds::default(),
            options: ClauseOptions::default(),
            and_links: Vec::new(),
            or_links: Vec::new(),
            not_links: Vec::new(),
        }
    }

    /// Logical field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved physical path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The owning search context
    pub fn context(&self) -> &SearchContext {
        &self.context
    }

    /// Per-clause options
    pub fn options(&self) -> &ClauseOptions {
        &self.options
    }

    /// Whether a constraint has been set on this condition
    ///
    /// Presence is structural: `0`, `false` and empty collections are
    /// legitimate present values.
    pub fn has_clause(&self) -> bool {
        self.op.is_some()
    }

    /// Fresh condition for the same field, sharing only static configuration
    ///
    /// The duplicate starts without operator, value, options or chains, so
    /// clause combinators never mutate the original.
    pub(crate) fn duplicate(&self) -> FieldCondition {
        FieldCondition::new(
            self.name.clone(),
            self.path.clone(),
            self.context.clone(),
            self.transforms.clone(),
        )
    }

    /// Start an AND chain on this condition
    pub fn and(self) -> AndClause {
        AndClause::from_condition(self)
    }

    /// Start an OR chain on this condition
    pub fn or(self) -> OrClause {
        OrClause::from_condition(self)
    }

    /// Start a NOT chain on this condition
    pub fn not(self) -> NotClause {
        NotClause::from_condition(self)
    }

    /// Set the boost factor of this clause
    pub fn with_boost(mut self, boost: f64) -> Self {
        self.options.boost = Some(boost);
        self
    }

    /// Match case-insensitively (term/prefix clauses)
    pub fn case_insensitive(mut self) -> Self {
        self.options.case_insensitive = true;
        self
    }

    /// Set the field list of a multi-field full-text clause
    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.options.fields = fields;
        self
    }

    /// Set the term combinator of an analyzed match clause
    pub fn with_operator(mut self, operator: MatchOperator) -> Self {
        self.options.operator = Some(operator);
        self
    }

    fn set_scalar(mut self, op: Operator, value: Option<Value>) -> Result<Self> {
        if self.op.is_some() {
            return Err(CuttleError::ValueConflict(self.name.clone()));
        }
        self.op = Some(op);
        self.value = value;
        Ok(self)
    }

    fn set_bound(mut self, bound: Bound, value: Value) -> Result<Self> {
        match self.op {
            None => self.op = Some(Operator::Range),
            Some(Operator::Range) => {}
            Some(_) => return Err(CuttleError::ValueConflict(self.name.clone())),
        }
        let slot = match bound {
            Bound::Gt => &mut self.range.gt,
            Bound::Gte => &mut self.range.gte,
            Bound::Lt => &mut self.range.lt,
            Bound::Lte => &mut self.range.lte,
        };
        if slot.is_some() {
            return Err(CuttleError::ValueConflict(self.name.clone()));
        }
        *slot = Some(value);
        Ok(self)
    }

    /// Compile this condition and its chains into a boolean fragment
    ///
    /// Asynchronous because value transforms may perform I/O. Compiling
    /// never mutates the condition; compiling twice yields equal output.
    pub fn to_elastic(&self) -> BoxFuture<'_, Result<BoolFragment>> {
        Box::pin(async move {
            let mut frag = BoolFragment::default();
            let base = self.build_base().await?;

            if !self.and_links.is_empty() {
                if let Some(clause) = base {
                    frag.must.push(clause);
                }
                for link in &self.and_links {
                    let compiled = link.condition.to_elastic().await?;
                    if link.negated {
                        let entries = compiled.into_entries();
                        if !entries.is_empty() {
                            frag.must.push(json!({ "bool": { "must_not": entries } }));
                        }
                        continue;
                    }
                    frag.must.extend(compiled.must);
                    if !compiled.should.is_empty() {
                        if clause_field(&compiled.should[0]) == Some(self.path.as_str()) {
                            if compiled.should.len() == 1 {
                                // Same field, no alternatives: plain AND.
                                frag.must.extend(compiled.should);
                            } else {
                                // Within-field alternatives: parenthesize the
                                // accumulated AND with the first alternative
                                // and keep the rest as sibling alternatives.
                                let mut alternatives = compiled.should;
                                let first = alternatives.remove(0);
                                let mut group = std::mem::take(&mut frag.must);
                                group.push(first);
                                frag.should.push(json!({ "bool": { "must": group } }));
                                frag.should.append(&mut alternatives);
                            }
                        } else {
                            frag.must
                                .push(json!({ "bool": { "should": compiled.should } }));
                        }
                    }
                    if !compiled.must_not.is_empty() {
                        frag.must
                            .push(json!({ "bool": { "must_not": compiled.must_not } }));
                    }
                }
            } else if let Some(clause) = base {
                frag.should.push(clause);
            }

            for link in &self.or_links {
                let compiled = link.to_elastic().await?;
                if !compiled.must.is_empty() {
                    frag.should.push(json!({ "bool": { "must": compiled.must } }));
                }
                frag.should.extend(compiled.should);
                if !compiled.must_not.is_empty() {
                    frag.should
                        .push(json!({ "bool": { "must_not": compiled.must_not } }));
                }
            }

            for link in &self.not_links {
                let compiled = link.to_elastic().await?;
                let mut negated = compiled.should;
                if !compiled.must.is_empty() {
                    negated.push(json!({ "bool": { "must": compiled.must } }));
                }
                if negated.is_empty() {
                    continue;
                }
                if self.or_links.is_empty() {
                    frag.must_not.append(&mut negated);
                } else {
                    // "X OR NOT Y": the negation becomes one more alternative.
                    frag.should.push(json!({ "bool": { "must_not": negated } }));
                }
            }

            Ok(frag)
        })
    }

    async fn build_base(&self) -> Result<Option<Value>> {
        let op = match self.op {
            Some(op) => op,
            None => return Ok(None),
        };
        match op {
            Operator::Exists => Ok(Some(json!({ "exists": { "field": self.path } }))),
            Operator::Range => {
                let body = serde_json::to_value(&self.range)?;
                Ok(Some(keyed("range", &self.path, body)))
            }
            _ => {
                let inputs = match &self.value {
                    Some(Value::Array(items)) => items.clone(),
                    Some(v) => vec![v.clone()],
                    None => return Ok(None),
                };
                let was_array = matches!(self.value, Some(Value::Array(_)));
                let (outputs, options) = self.transformed(inputs).await?;
                let mut clauses: Vec<Value> = outputs
                    .into_iter()
                    .map(|v| self.simple_clause(op, v, &options))
                    .collect();
                Ok(Some(if clauses.len() == 1 && !was_array {
                    clauses.remove(0)
                } else {
                    // Arrays (and expanded values) compile to an OR of the
                    // per-element clause.
                    json!({ "bool": { "should": clauses } })
                }))
            }
        }
    }

    /// Run the transform pipeline over the input values
    ///
    /// Transforms see a duplicate of this condition and may adjust its
    /// options; the possibly-adjusted option bag is returned alongside the
    /// output values.
    async fn transformed(&self, inputs: Vec<Value>) -> Result<(Vec<Value>, ClauseOptions)> {
        if self.transforms.is_empty() {
            return Ok((inputs, self.options.clone()));
        }
        let mut duplicate = self.clone();
        let mut outputs = Vec::new();
        for input in inputs {
            let mut staged = vec![input];
            for transform in &self.transforms {
                let mut next = Vec::new();
                for value in staged {
                    next.extend(transform.apply(value, &mut duplicate).await?.into_values());
                }
                staged = next;
            }
            outputs.extend(staged);
        }
        Ok((outputs, duplicate.options))
    }

    fn simple_clause(&self, op: Operator, value: Value, options: &ClauseOptions) -> Value {
        match op {
            Operator::Equals => {
                let mut body = Map::new();
                body.insert("value".to_string(), value);
                if options.case_insensitive {
                    body.insert("case_insensitive".to_string(), json!(true));
                }
                if let Some(boost) = options.boost {
                    body.insert("boost".to_string(), json!(boost));
                }
                keyed("term", &self.path, Value::Object(body))
            }
            Operator::Prefix => {
                let mut body = Map::new();
                body.insert("value".to_string(), value);
                if options.case_insensitive {
                    body.insert("case_insensitive".to_string(), json!(true));
                }
                if let Some(boost) = options.boost {
                    body.insert("boost".to_string(), json!(boost));
                }
                keyed("prefix", &self.path, Value::Object(body))
            }
            Operator::Match => {
                let mut body = Map::new();
                body.insert("query".to_string(), value);
                if let Some(operator) = options.operator {
                    body.insert("operator".to_string(), json!(operator.as_str()));
                }
                if let Some(boost) = options.boost {
                    body.insert("boost".to_string(), json!(boost));
                }
                keyed("match", &self.path, Value::Object(body))
            }
            Operator::MatchPhrase => {
                let mut body = Map::new();
                body.insert("query".to_string(), value);
                if let Some(boost) = options.boost {
                    body.insert("boost".to_string(), json!(boost));
                }
                keyed("match_phrase", &self.path, Value::Object(body))
            }
            Operator::MultiMatch => {
                let fields: Vec<String> = if options.fields.is_empty() {
                    vec![self.path.clone()]
                } else {
                    options.fields.clone()
                };
                let mut body = Map::new();
                body.insert("query".to_string(), value);
                body.insert("fields".to_string(), json!(fields));
                if let Some(boost) = options.boost {
                    body.insert("boost".to_string(), json!(boost));
                }
                json!({ "multi_match": body })
            }
            // Handled in build_base.
            Operator::Range | Operator::Exists => Value::Null,
        }
    }
}

impl std::fmt::Debug for FieldCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldCondition")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("op", &self.op)
            .field("value", &self.value)
            .field("range", &self.range)
            .field("and_links", &self.and_links.len())
            .field("or_links", &self.or_links.len())
            .field("not_links", &self.not_links.len())
            .finish()
    }
}

/// Build `{kind: {key: body}}` with a runtime key
pub(crate) fn keyed(kind: &str, key: &str, body: Value) -> Value {
    let mut inner = Map::new();
    inner.insert(key.to_string(), body);
    let mut outer = Map::new();
    outer.insert(kind.to_string(), Value::Object(inner));
    Value::Object(outer)
}

impl SupportsEquality for FieldCondition {
    fn eq(self, value: impl Into<Value>) -> Result<Self> {
        self.set_scalar(Operator::Equals, Some(value.into()))
    }
}

impl SupportsMatch for FieldCondition {
    fn matches(self, value: impl Into<Value>) -> Result<Self> {
        self.set_scalar(Operator::Match, Some(value.into()))
    }

    fn match_phrase(self, value: impl Into<Value>) -> Result<Self> {
        self.set_scalar(Operator::MatchPhrase, Some(value.into()))
    }

    fn prefix(self, value: impl Into<Value>) -> Result<Self> {
        self.set_scalar(Operator::Prefix, Some(value.into()))
    }

    fn multi_match(self, value: impl Into<Value>) -> Result<Self> {
        self.set_scalar(Operator::MultiMatch, Some(value.into()))
    }
}

impl SupportsExistence for FieldCondition {
    fn exists(self) -> Result<Self> {
        self.set_scalar(Operator::Exists, None)
    }
}

impl SupportsRange for FieldCondition {
    fn gt(self, value: impl Into<Value>) -> Result<Self> {
        self.set_bound(Bound::Gt, value.into())
    }

    fn gte(self, value: impl Into<Value>) -> Result<Self> {
        self.set_bound(Bound::Gte, value.into())
    }

    fn lt(self, value: impl Into<Value>) -> Result<Self> {
        self.set_bound(Bound::Lt, value.into())
    }

    fn lte(self, value: impl Into<Value>) -> Result<Self> {
        self.set_bound(Bound::Lte, value.into())
    }
}
