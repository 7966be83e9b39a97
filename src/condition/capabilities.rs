//! Capability traits of the condition surface
//!
//! Each condition family is an explicit trait implemented directly by the
//! concrete condition and clause types. Conditions and clause combinators
//! share the same surface, so a chain reads the same before and after an
//! `.and()`/`.or()`/`.not()`.

use serde_json::Value;

use crate::error::Result;

/// Exact-value conditions (`term`)
pub trait SupportsEquality: Sized {
    /// Constrain the field to equal the value
    ///
    /// Array values compile to an OR of equalities. Errors if a scalar
    /// value was already set on this clause.
    fn eq(self, value: impl Into<Value>) -> Result<Self>;
}

/// Analyzed full-text conditions (`match` family)
pub trait SupportsMatch: Sized {
    /// Analyzed match on the field
    fn matches(self, value: impl Into<Value>) -> Result<Self>;

    /// Analyzed phrase match on the field
    fn match_phrase(self, value: impl Into<Value>) -> Result<Self>;

    /// Prefix match on the field
    fn prefix(self, value: impl Into<Value>) -> Result<Self>;

    /// Full-text match over the clause's field list
    fn multi_match(self, value: impl Into<Value>) -> Result<Self>;
}

/// Field-presence conditions (`exists`)
pub trait SupportsExistence: Sized {
    /// Constrain the field to be present
    fn exists(self) -> Result<Self>;
}

/// Range conditions (`range`)
///
/// Bounds accumulate independently: each may be set once, in any order,
/// without conflicting with the others.
pub trait SupportsRange: Sized {
    /// Greater-than bound
    fn gt(self, value: impl Into<Value>) -> Result<Self>;

    /// Greater-than-or-equal bound
    fn gte(self, value: impl Into<Value>) -> Result<Self>;

    /// Less-than bound
    fn lt(self, value: impl Into<Value>) -> Result<Self>;

    /// Less-than-or-equal bound
    fn lte(self, value: impl Into<Value>) -> Result<Self>;
}
