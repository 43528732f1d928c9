//! Compiled output handed to the execution layer.

use serde::{Deserialize, Serialize};

use crate::error::CypherError;
use crate::value::Parameters;

/// One parameterised query.
///
/// Serialises to the transactional endpoint shape
/// `{"statement": "...", "parameters": {...}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub statement: String,
    pub parameters: Parameters,
}

impl Statement {
    pub fn new(statement: impl Into<String>, parameters: Parameters) -> Self {
        Self {
            statement: statement.into(),
            parameters,
        }
    }

    pub fn text(&self) -> &str {
        &self.statement
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// True when there is no query text to run.
    pub fn is_empty(&self) -> bool {
        self.statement.is_empty()
    }
}

/// Request body wrapping a batch of statements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statements {
    pub statements: Vec<Statement>,
}

impl Statements {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }

    pub fn to_json(&self) -> Result<String, CypherError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Statement> {
        self.statements.iter()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

impl From<Vec<Statement>> for Statements {
    fn from(statements: Vec<Statement>) -> Self {
        Self::new(statements)
    }
}

impl IntoIterator for Statements {
    type Item = Statement;
    type IntoIter = std::vec::IntoIter<Statement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{PropertyBag, PropertyValue};

    #[test]
    fn test_statements_serialize_to_endpoint_shape() {
        let mut parameters = Parameters::new();
        let props: PropertyBag = [("name", "Alice")].into_iter().collect();
        parameters.insert("_0_props".to_string(), props.into());

        let body = Statements::from(vec![Statement::new(
            "CREATE (_0:`Person`{_0_props}) RETURN id(_0) AS _0",
            parameters,
        )]);

        let json: serde_json::Value =
            serde_json::from_str(&body.to_json().expect("serialize")).expect("parse");
        assert_eq!(
            json,
            serde_json::json!({
                "statements": [{
                    "statement": "CREATE (_0:`Person`{_0_props}) RETURN id(_0) AS _0",
                    "parameters": {"_0_props": {"name": "Alice"}}
                }]
            })
        );
    }

    #[test]
    fn test_statement_round_trips_through_json() {
        let mut parameters = Parameters::new();
        parameters.insert("_1_props".to_string(), PropertyValue::Map(Default::default()));
        let statement = Statement::new("MATCH ()-[_1]->() WHERE id(_1)=3", parameters);

        let json = serde_json::to_string(&statement).expect("serialize");
        let back: Statement = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, statement);
    }

    #[test]
    fn test_empty_statement() {
        assert!(Statement::default().is_empty());
        assert!(!Statement::new("RETURN 1", Parameters::new()).is_empty());
    }
}
