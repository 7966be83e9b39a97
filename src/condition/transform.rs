//! Value transform collaborators
//!
//! A transform rewrites a condition value at compile time: normalizing,
//! resolving identifiers against an external service, or expanding one value
//! into several alternatives. Transforms run against a duplicate of the
//! condition and may adjust its options; they must be idempotent across
//! repeated equivalent invocations.

use futures::future::{ready, BoxFuture};
use serde_json::Value;

use crate::condition::field::FieldCondition;
use crate::error::Result;

/// Output of one transform application
#[derive(Clone, Debug, PartialEq)]
pub enum TransformedValue {
    /// Replace the value
    One(Value),
    /// Expand the value into several alternatives (OR-of-equalities)
    Many(Vec<Value>),
}

impl TransformedValue {
    /// Flatten into a list of values
    pub fn into_values(self) -> Vec<Value> {
        match self {
            TransformedValue::One(v) => vec![v],
            TransformedValue::Many(vs) => vs,
        }
    }
}

/// Async value transform applied during compilation
///
/// The second argument is the condition duplicate being compiled; a
/// transform may adjust its option bag as a side effect.
pub trait ValueTransform: Send + Sync {
    /// Apply the transform to one value
    fn apply<'a>(
        &'a self,
        value: Value,
        condition: &'a mut FieldCondition,
    ) -> BoxFuture<'a, Result<TransformedValue>>;
}

/// Synchronous value-mapping adapter
///
/// Wraps a plain function as a [`ValueTransform`] for the common case where
/// no I/O is involved.
pub struct MapValues<F>(pub F);

impl<F> ValueTransform for MapValues<F>
where
    F: Fn(Value) -> TransformedValue + Send + Sync,
{
    fn apply<'a>(
        &'a self,
        value: Value,
        _condition: &'a mut FieldCondition,
    ) -> BoxFuture<'a, Result<TransformedValue>> {
        Box::pin(ready(Ok((self.0)(value))))
    }
}
