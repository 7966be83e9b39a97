//! Condition sets - named collections of field constraints
//!
//! A [`ConditionSet`] is the boolean scope of one document level: an ordered
//! map of field conditions and nested sub-document scopes, plus lazily
//! materialized NOT and OR subtrees of the same type. `build_query` compiles
//! the whole scope into a single boolean fragment in the occurrence fixed by
//! the owning context.

use futures::future::BoxFuture;
use serde_json::{json, Map, Value};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::condition::clause::IntoCondition;
use crate::condition::context::SearchContext;
use crate::condition::field::{keyed, FieldCondition};
use crate::error::Result;

/// Scoring mode of a nested query
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreMode {
    #[default]
    Avg,
    Max,
    Min,
    Sum,
    None,
}

impl ScoreMode {
    /// Wire name of the mode
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreMode::Avg => "avg",
            ScoreMode::Max => "max",
            ScoreMode::Min => "min",
            ScoreMode::Sum => "sum",
            ScoreMode::None => "none",
        }
    }
}

/// Paging/sort metadata of a nested scope's inner hits
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InnerHits {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Value>,
}

impl InnerHits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of inner hits per outer document
    pub fn size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Inner-hit page offset
    pub fn from(mut self, from: u64) -> Self {
        self.from = Some(from);
        self
    }

    /// Inner-hit sort specification (engine-native)
    pub fn sort(mut self, sort: Value) -> Self {
        self.sort = Some(sort);
        self
    }
}

#[derive(Clone, Debug)]
struct NestedScope {
    name: String,
    path: String,
    score_mode: Option<ScoreMode>,
    inner_hits: Option<InnerHits>,
}

#[derive(Clone, Debug)]
enum Entry {
    Condition(FieldCondition),
    Scope(ConditionSet),
}

/// Named collection of field conditions for one document scope
#[derive(Clone, Debug)]
pub struct ConditionSet {
    context: SearchContext,
    entries: Vec<(String, Entry)>,
    not_set: Option<Box<ConditionSet>>,
    or_set: Option<Box<ConditionSet>>,
    nested: Option<NestedScope>,
    key_restrictions: Vec<(String, Vec<Value>)>,
}

impl ConditionSet {
    /// Create an empty set over the given context
    pub fn new(context: SearchContext) -> Self {
        Self {
            context,
            entries: Vec::new(),
            not_set: None,
            or_set: None,
            nested: None,
            key_restrictions: Vec::new(),
        }
    }

    /// Empty duplicated scope used by clause combinators
    pub(crate) fn scope_of(context: SearchContext) -> Self {
        Self::new(context)
    }

    /// The owning context of this scope
    pub fn context(&self) -> &SearchContext {
        &self.context
    }

    /// Create a fresh condition for a field of this scope
    pub fn field(&self, name: &str) -> Result<FieldCondition> {
        self.context.condition(name)
    }

    /// Insert a finished condition chain under its field name
    ///
    /// Re-inserting a name replaces the previous condition in place,
    /// preserving declaration order.
    pub fn insert(&mut self, condition: impl IntoCondition) {
        let condition = condition.into_condition();
        let name = condition.name().to_string();
        let entry = Entry::Condition(condition);
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = entry,
            None => self.entries.push((name, entry)),
        }
    }

    /// Create a sub-document scope declared in the schema
    ///
    /// The returned set resolves its fields with the nested path prefix and
    /// compiles to a `nested` query. Attach it back with
    /// [`attach`](Self::attach) once populated.
    pub fn nested_scope(&self, name: &str) -> Result<ConditionSet> {
        let context = self.context.enter_nested(name)?;
        let path = context.nested_path().unwrap_or(name).to_string();
        let mut scope = ConditionSet::new(context);
        scope.nested = Some(NestedScope {
            name: name.to_string(),
            path,
            score_mode: None,
            inner_hits: None,
        });
        Ok(scope)
    }

    /// Set the scoring mode of this nested scope
    pub fn with_score_mode(mut self, mode: ScoreMode) -> Self {
        if let Some(nested) = &mut self.nested {
            nested.score_mode = Some(mode);
        }
        self
    }

    /// Request inner hits for this nested scope
    pub fn with_inner_hits(mut self, inner_hits: InnerHits) -> Self {
        if let Some(nested) = &mut self.nested {
            nested.inner_hits = Some(inner_hits);
        }
        self
    }

    /// Attach a populated nested scope to this set
    pub fn attach(&mut self, scope: ConditionSet) {
        let name = scope
            .nested
            .as_ref()
            .map(|n| n.name.clone())
            .unwrap_or_else(|| scope.context.schema().name().to_string());
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = Entry::Scope(scope),
            None => self.entries.push((name, Entry::Scope(scope))),
        }
    }

    /// The lazily-materialized NOT subtree
    ///
    /// Conditions inserted into it compile into `must_not` of this scope.
    pub fn not_set(&mut self) -> &mut ConditionSet {
        let context = self.context.clone();
        self.not_set
            .get_or_insert_with(|| Box::new(ConditionSet::new(context)))
    }

    /// The lazily-materialized OR subtree
    ///
    /// Each condition inserted into it becomes one more alternative to this
    /// scope's own clauses.
    pub fn or_set(&mut self) -> &mut ConditionSet {
        let context = self.context.clone();
        self.or_set
            .get_or_insert_with(|| Box::new(ConditionSet::new(context)))
    }

    /// Restrict a field to an explicit key list
    ///
    /// Compiles to a `terms` clause; used by the orchestrator for the second
    /// quality-assurance pass.
    pub fn restrict_to_keys(&mut self, field: &str, keys: Vec<Value>) -> Result<()> {
        let path = self.context.resolve(field)?;
        self.key_restrictions.push((path, keys));
        Ok(())
    }

    /// Whether nothing in this scope would compile to a clause
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|(_, entry)| match entry {
            Entry::Condition(c) => !c.has_clause(),
            Entry::Scope(s) => s.is_empty(),
        }) && self.not_set.as_deref().map_or(true, |s| s.is_empty())
            && self.or_set.as_deref().map_or(true, |s| s.is_empty())
            && self.key_restrictions.is_empty()
    }

    /// Compile the scope into its boolean query fragment
    pub fn build_query(&self) -> BoxFuture<'_, Result<Value>> {
        Box::pin(async move {
            debug!(scope = self.context.schema().name(), "compiling condition set");
            let mut must: Vec<Value> = Vec::new();
            let mut nested_queries: Vec<Value> = Vec::new();
            for (_, entry) in &self.entries {
                match entry {
                    Entry::Condition(condition) if condition.has_clause() => {
                        let fragment = condition.to_elastic().await?;
                        must.extend(fragment.into_entries());
                    }
                    Entry::Condition(_) => {}
                    Entry::Scope(scope) if !scope.is_empty() => {
                        nested_queries.push(scope.build_nested().await?);
                    }
                    Entry::Scope(_) => {}
                }
            }
            must.append(&mut nested_queries);

            let mut should: Vec<Value> = Vec::new();
            let mut must_not: Vec<Value> = Vec::new();
            if !must.is_empty() {
                should.push(json!({ "bool": { "must": must } }));
            }
            // Quality-assurance keys restrictions are alternatives of their
            // own; the orchestrator composes them as a separate post-filter.
            for (path, keys) in &self.key_restrictions {
                should.push(keyed("terms", path, json!(keys)));
            }
            if let Some(or_set) = &self.or_set {
                should.extend(or_set.alternatives().await?);
            }
            if let Some(not_set) = &self.not_set {
                must_not.extend(not_set.alternatives().await?);
            }

            let mut body = Map::new();
            if !should.is_empty() {
                body.insert("should".to_string(), json!(should));
            }
            if !must_not.is_empty() {
                body.insert("must_not".to_string(), json!(must_not));
            }
            let mut occurrence = Map::new();
            occurrence.insert(
                self.context.mode().key().to_string(),
                json!({ "bool": body }),
            );
            Ok(json!({ "bool": occurrence }))
        })
    }

    /// Compile this nested scope into its `nested` query entry
    async fn build_nested(&self) -> Result<Value> {
        let query = self.build_query().await?;
        let mut body = Map::new();
        match &self.nested {
            Some(nested) => {
                body.insert("path".to_string(), json!(nested.path));
                body.insert("query".to_string(), query);
                // Unmapped paths are tolerated rather than failing the search.
                body.insert("ignore_unmapped".to_string(), json!(true));
                if let Some(mode) = nested.score_mode {
                    body.insert("score_mode".to_string(), json!(mode.as_str()));
                }
                if let Some(inner_hits) = &nested.inner_hits {
                    body.insert("inner_hits".to_string(), serde_json::to_value(inner_hits)?);
                }
                Ok(json!({ "nested": body }))
            }
            None => Ok(query),
        }
    }

    /// Compile each member into one alternative clause
    fn alternatives(&self) -> BoxFuture<'_, Result<Vec<Value>>> {
        Box::pin(async move {
            let mut out = Vec::new();
            for (_, entry) in &self.entries {
                match entry {
                    Entry::Condition(condition) if condition.has_clause() => {
                        let fragment = condition.to_elastic().await?;
                        out.push(fragment.into_clause());
                    }
                    Entry::Condition(_) => {}
                    Entry::Scope(scope) if !scope.is_empty() => {
                        out.push(scope.build_nested().await?);
                    }
                    Entry::Scope(_) => {}
                }
            }
            Ok(out)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::capabilities::{SupportsEquality, SupportsMatch, SupportsRange};
    use crate::condition::context::QueryMode;
    use crate::schema::{FieldKind, Schema, SchemaBuilder};
    use futures::executor::block_on;

    fn schema() -> Schema {
        let variants = SchemaBuilder::new("variants")
            .field("color", FieldKind::Keyword)
            .field("stock", FieldKind::Long)
            .build();
        SchemaBuilder::new("products")
            .field("title", FieldKind::Text)
            .field("genre", FieldKind::Keyword)
            .field("rating", FieldKind::Double)
            .nested("variants", variants)
            .build()
    }

    fn set(mode: QueryMode) -> ConditionSet {
        ConditionSet::new(schema().context(mode))
    }

    #[test]
    fn test_filter_mode_occurrence() {
        let mut conditions = set(QueryMode::Filter);
        let genre = conditions.field("genre").unwrap();
        conditions.insert(genre.eq("drama").unwrap());
        let query = block_on(conditions.build_query()).unwrap();
        assert_eq!(
            query,
            serde_json::json!({ "bool": { "filter": { "bool": { "should": [
                { "bool": { "must": [
                    { "term": { "genre": { "value": "drama" } } },
                ] } },
            ] } } } })
        );
    }

    #[test]
    fn test_query_mode_occurrence() {
        let mut conditions = set(QueryMode::Query);
        let title = conditions.field("title").unwrap();
        conditions.insert(title.matches("dune").unwrap());
        let query = block_on(conditions.build_query()).unwrap();
        let occurrence = query.get("bool").and_then(|b| b.get("must"));
        assert!(occurrence.is_some());
    }

    #[test]
    fn test_empty_set_compiles_to_empty_bool() {
        let conditions = set(QueryMode::Filter);
        assert!(conditions.is_empty());
        let query = block_on(conditions.build_query()).unwrap();
        assert_eq!(
            query,
            serde_json::json!({ "bool": { "filter": { "bool": {} } } })
        );
    }

    #[test]
    fn test_members_are_anded() {
        let mut conditions = set(QueryMode::Filter);
        let genre = conditions.field("genre").unwrap();
        conditions.insert(genre.eq("drama").unwrap());
        let rating = conditions.field("rating").unwrap();
        conditions.insert(rating.gte(4).unwrap());
        let query = block_on(conditions.build_query()).unwrap();
        let must = &query["bool"]["filter"]["bool"]["should"][0]["bool"]["must"];
        assert_eq!(
            *must,
            serde_json::json!([
                { "term": { "genre": { "value": "drama" } } },
                { "range": { "rating": { "gte": 4 } } },
            ])
        );
    }

    #[test]
    fn test_or_subtree_adds_alternatives() {
        let mut conditions = set(QueryMode::Filter);
        let genre = conditions.field("genre").unwrap();
        conditions.insert(genre.eq("drama").unwrap());
        let rating = conditions.or_set().field("rating").unwrap();
        conditions.or_set().insert(rating.gte(4).unwrap());
        let query = block_on(conditions.build_query()).unwrap();
        let should = &query["bool"]["filter"]["bool"]["should"];
        assert_eq!(should.as_array().unwrap().len(), 2);
        assert_eq!(
            should[1],
            serde_json::json!({ "range": { "rating": { "gte": 4 } } })
        );
    }

    #[test]
    fn test_not_subtree_compiles_to_must_not() {
        let mut conditions = set(QueryMode::Filter);
        let genre = conditions.not_set().field("genre").unwrap();
        conditions.not_set().insert(genre.eq("horror").unwrap());
        let query = block_on(conditions.build_query()).unwrap();
        assert_eq!(
            query["bool"]["filter"]["bool"]["must_not"],
            serde_json::json!([{ "term": { "genre": { "value": "horror" } } }])
        );
    }

    #[test]
    fn test_nested_scope_compiles_to_nested_query() {
        let mut conditions = set(QueryMode::Filter);
        let mut variants = conditions
            .nested_scope("variants")
            .unwrap()
            .with_score_mode(ScoreMode::Max)
            .with_inner_hits(InnerHits::new().size(3));
        let color = variants.field("color").unwrap();
        variants.insert(color.eq("red").unwrap());
        conditions.attach(variants);

        let query = block_on(conditions.build_query()).unwrap();
        let nested = &query["bool"]["filter"]["bool"]["should"][0]["bool"]["must"][0]["nested"];
        assert_eq!(nested["path"], "variants");
        assert_eq!(nested["ignore_unmapped"], true);
        assert_eq!(nested["score_mode"], "max");
        assert_eq!(nested["inner_hits"], serde_json::json!({ "size": 3 }));
        let inner_must =
            &nested["query"]["bool"]["filter"]["bool"]["should"][0]["bool"]["must"];
        assert_eq!(
            *inner_must,
            serde_json::json!([
                { "term": { "variants.color": { "value": "red" } } },
            ])
        );
    }

    #[test]
    fn test_restrict_to_keys_injects_terms() {
        let mut conditions = set(QueryMode::Filter);
        conditions
            .restrict_to_keys(
                "genre",
                vec![serde_json::json!("drama"), serde_json::json!("comedy")],
            )
            .unwrap();
        let query = block_on(conditions.build_query()).unwrap();
        assert_eq!(
            query["bool"]["filter"]["bool"]["should"],
            serde_json::json!([{ "terms": { "genre": ["drama", "comedy"] } }])
        );
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut conditions = set(QueryMode::Filter);
        let genre = conditions.field("genre").unwrap();
        conditions.insert(genre.eq("drama").unwrap());
        let title = conditions.field("title").unwrap();
        conditions.insert(title.matches("dune").unwrap());
        let genre = conditions.field("genre").unwrap();
        conditions.insert(genre.eq("comedy").unwrap());

        let query = block_on(conditions.build_query()).unwrap();
        let must = &query["bool"]["filter"]["bool"]["should"][0]["bool"]["must"];
        assert_eq!(
            *must,
            serde_json::json!([
                { "term": { "genre": { "value": "comedy" } } },
                { "match": { "title": { "query": "dune" } } },
            ])
        );
    }
}
