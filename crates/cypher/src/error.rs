//! Error types for the statement compiler.
//!
//! Rendering a statement never fails: incomplete builders are dropped from the
//! output instead of raising errors. The variants here cover the edges where
//! text produced elsewhere comes back in (column names, serialised output).

use thiserror::Error;

/// Unified error type for compiler operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CypherError {
    /// A string did not match either identifier format (`_<n>` or `$<id>`)
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// A relationship direction tag was not recognised
    #[error("Invalid direction: {0}")]
    InvalidDirection(String),

    /// Compiled statements could not be serialised
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CypherError {
    /// Create an invalid identifier error
    pub fn invalid_identifier(value: impl Into<String>) -> Self {
        Self::InvalidIdentifier(value.into())
    }

    /// Create an invalid direction error
    pub fn invalid_direction(value: impl Into<String>) -> Self {
        Self::InvalidDirection(value.into())
    }

    /// Create a serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }
}

impl From<serde_json::Error> for CypherError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_identifier_error() {
        let err = CypherError::invalid_identifier("n0");
        assert!(matches!(err, CypherError::InvalidIdentifier(_)));
        assert_eq!(err.to_string(), "Invalid identifier: n0");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").expect_err("truncated json");
        let err: CypherError = json_err.into();
        assert!(matches!(err, CypherError::Serialization(_)));
        assert!(err.to_string().starts_with("Serialization error:"));
    }
}
