//! Field kinds declared in a search schema

use serde::{Deserialize, Serialize};

/// Kind of a declared field
///
/// The kind records which condition family a field is meant for. It is
/// introspectable through the schema and carried into compiled payload
/// decisions (e.g. keyword fields compile equality to `term` clauses).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Exact-value field (term/terms/prefix)
    Keyword,
    /// Analyzed full-text field (match/match_phrase)
    Text,
    /// 64-bit integer field
    Long,
    /// 64-bit floating point field
    Double,
    /// Date field (range/date_histogram)
    Date,
    /// Boolean field
    Boolean,
}

impl FieldKind {
    /// Whether range conditions make sense for this kind
    pub fn is_rangeable(&self) -> bool {
        matches!(self, FieldKind::Long | FieldKind::Double | FieldKind::Date)
    }

    /// Whether the field holds analyzed text
    pub fn is_text(&self) -> bool {
        matches!(self, FieldKind::Text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rangeable_kinds() {
        assert!(FieldKind::Long.is_rangeable());
        assert!(FieldKind::Date.is_rangeable());
        assert!(!FieldKind::Keyword.is_rangeable());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&FieldKind::Keyword).unwrap();
        assert_eq!(json, "\"keyword\"");
    }
}
