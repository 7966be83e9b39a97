//! cuttle - fluent Elasticsearch query and aggregation compiler
//!
//! cuttle turns field-oriented search declarations into the JSON request
//! format of an Elasticsearch-compatible engine and parses the engine's
//! aggregation responses back into a structured bucket tree. It owns the
//! boolean condition algebra and the aggregation engine; transport,
//! pagination and highlighting belong to the caller.
//!
//! # Example
//!
//! ```
//! use cuttle::aggregation::{Aggregations, TermsAggregation};
//! use cuttle::condition::{ConditionSet, QueryMode, SupportsMatch, SupportsRange};
//! use cuttle::schema::{FieldKind, SchemaBuilder};
//!
//! # async fn example() -> cuttle::Result<()> {
//! let schema = SchemaBuilder::new("movies")
//!     .field("title", FieldKind::Text)
//!     .field("rating", FieldKind::Double)
//!     .build();
//!
//! let mut conditions = ConditionSet::new(schema.context(QueryMode::Filter));
//! let title = conditions.field("title")?;
//! conditions.insert(title.matches("dune")?.and().field("rating")?.gte(4)?);
//! let query = conditions.build_query().await?;
//!
//! let mut aggs = Aggregations::new();
//! aggs.add(TermsAggregation::new("by_rating", "rating").avg("rating"));
//! let compiled = aggs.to_elastic().await?;
//! # let _ = (query, compiled);
//! # Ok(())
//! # }
//! ```

pub mod aggregation;
pub mod condition;
pub mod error;
pub mod schema;

pub use aggregation::{AggregationResult, AggregationResults, Aggregations, Bucket};
pub use condition::{ConditionSet, FieldCondition, QueryMode};
pub use error::{CuttleError, Result};
pub use schema::{FieldKind, Schema, SchemaBuilder};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
