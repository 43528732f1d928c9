//! Error types for the driver hand-off.

use ogm_cypher::CypherError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Neo4jError {
    /// A column expected in a result row was absent or not an integer id
    #[error("Missing column '{column}': {message}")]
    MissingColumn { column: String, message: String },

    #[error(transparent)]
    Cypher(#[from] CypherError),
}

impl Neo4jError {
    /// Create a missing column error
    pub fn missing_column(column: impl Into<String>, message: impl ToString) -> Self {
        Self::MissingColumn {
            column: column.into(),
            message: message.to_string(),
        }
    }
}
