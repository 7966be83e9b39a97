//! Condition DSL and boolean compiler
//!
//! This module provides the field-oriented condition surface of cuttle:
//! - Field conditions (equality, prefix, match, phrase, range, existence,
//!   multi-field full-text)
//! - Clause combinators (AND, OR, NOT) with duplicated chain heads
//! - Condition sets with nested sub-document scopes
//!
//! # Example
//!
//! ```json
//! {
//!   "bool": {
//!     "filter": {
//!       "bool": {
//!         "should": [
//!           { "bool": { "must": [
//!             { "term": { "genre": { "value": "drama" } } },
//!             { "range": { "rating": { "gte": 4 } } }
//!           ] } }
//!         ]
//!       }
//!     }
//!   }
//! }
//! ```

pub mod capabilities;
pub mod clause;
pub mod context;
pub mod field;
pub mod set;
pub mod transform;
pub mod types;

pub use capabilities::{SupportsEquality, SupportsExistence, SupportsMatch, SupportsRange};
pub use clause::{AndClause, IntoCondition, NotClause, OrClause};
pub use context::{QueryMode, SearchContext};
pub use field::FieldCondition;
pub use set::{ConditionSet, InnerHits, ScoreMode};
pub use transform::{MapValues, TransformedValue, ValueTransform};
pub use types::{BoolFragment, ClauseOptions, MatchOperator, Operator, RangeBounds};
