//! Per-bucket calculations (sum, avg)

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Kind of a per-bucket calculation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalcKind {
    /// Sum of the field over the bucket's documents
    Sum,
    /// Average of the field over the bucket's documents
    Avg,
}

impl CalcKind {
    /// Wire name of the calculation
    pub fn as_str(&self) -> &'static str {
        match self {
            CalcKind::Sum => "sum",
            CalcKind::Avg => "avg",
        }
    }
}

/// Prefix of compiled calculation names
///
/// Calculations are keyed `calc_<kind>_<field>` in the request so the
/// response parser can tell them apart from child aggregations.
pub(crate) const CALC_PREFIX: &str = "calc_";

/// One calculation attached to an aggregation level
///
/// The combination of kind and field must be unique per level; re-adding an
/// existing combination is a no-op.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calculation {
    pub kind: CalcKind,
    pub field: String,
}

impl Calculation {
    /// Sum calculation over a field
    pub fn sum(field: impl Into<String>) -> Self {
        Self {
            kind: CalcKind::Sum,
            field: field.into(),
        }
    }

    /// Average calculation over a field
    pub fn avg(field: impl Into<String>) -> Self {
        Self {
            kind: CalcKind::Avg,
            field: field.into(),
        }
    }

    /// Request key of this calculation (`calc_<kind>_<field>`)
    pub fn combo_name(&self) -> String {
        format!("{}{}_{}", CALC_PREFIX, self.kind.as_str(), self.field)
    }

    /// Result key this calculation unwraps to (`<kind>_<field>`)
    pub fn result_name(&self) -> String {
        format!("{}_{}", self.kind.as_str(), self.field)
    }

    /// Compile to the engine aggregation object
    pub fn to_elastic(&self) -> Value {
        json!({ self.kind.as_str(): { "field": self.field } })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_combo_name() {
        assert_eq!(Calculation::sum("rating").combo_name(), "calc_sum_rating");
        assert_eq!(Calculation::avg("rating").result_name(), "avg_rating");
    }

    #[test]
    fn test_compiles_to_metric_object() {
        assert_eq!(
            Calculation::avg("rating").to_elastic(),
            json!({ "avg": { "field": "rating" } })
        );
    }
}
