use thiserror::Error;

/// Main error type for cuttle operations
#[derive(Error, Debug)]
pub enum CuttleError {
    #[error("Value already set for field: {0}")]
    ValueConflict(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Unknown nested scope: {0}")]
    UnknownScope(String),

    #[error("Invalid clause chain: {0}")]
    InvalidChain(String),

    #[error("Transform failed for field {field}: {message}")]
    Transform { field: String, message: String },

    #[error("Malformed engine response: {0}")]
    InvalidResponse(String),

    #[error("Search failed on {failed} of {total} shards")]
    ShardFailure { failed: u64, total: u64 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for cuttle operations
pub type Result<T> = std::result::Result<T, CuttleError>;

impl CuttleError {
    /// Check if this error indicates misuse of the builder API rather than
    /// a failure reported by the engine
    pub fn is_programmer_error(&self) -> bool {
        matches!(
            self,
            CuttleError::ValueConflict(_)
                | CuttleError::UnknownField(_)
                | CuttleError::UnknownScope(_)
                | CuttleError::InvalidChain(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CuttleError::ValueConflict("title".to_string());
        assert_eq!(err.to_string(), "Value already set for field: title");
    }

    #[test]
    fn test_programmer_errors() {
        assert!(CuttleError::ValueConflict("a".to_string()).is_programmer_error());
        assert!(CuttleError::UnknownField("b".to_string()).is_programmer_error());
        assert!(!CuttleError::ShardFailure { failed: 1, total: 5 }.is_programmer_error());
    }
}
