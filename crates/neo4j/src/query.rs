//! Conversions between compiled statements and `neo4rs` driver types.

use std::collections::HashMap;

use neo4rs::{BoltType, Query, Row};
use ogm_cypher::{CypherContext, EntityKey, PropertyValue, Statement};

use crate::error::Neo4jError;

/// Converts a property value into its Bolt counterpart.
pub fn to_bolt(value: &PropertyValue) -> BoltType {
    match value {
        PropertyValue::Null => BoltType::Null(neo4rs::BoltNull),
        PropertyValue::Boolean(v) => BoltType::Boolean(neo4rs::BoltBoolean::new(*v)),
        PropertyValue::Integer(v) => BoltType::Integer(neo4rs::BoltInteger::new(*v)),
        PropertyValue::Float(v) => BoltType::Float(neo4rs::BoltFloat::new(*v)),
        PropertyValue::String(v) => BoltType::String(neo4rs::BoltString::new(v)),
        PropertyValue::List(values) => BoltType::List(neo4rs::BoltList {
            value: values.iter().map(to_bolt).collect(),
        }),
        PropertyValue::Map(entries) => BoltType::Map(neo4rs::BoltMap {
            value: entries
                .iter()
                .map(|(k, v)| (neo4rs::BoltString::new(k), to_bolt(v)))
                .collect(),
        }),
    }
}

/// Extension trait turning a compiled [`Statement`] into a driver query.
pub trait StatementExt {
    fn to_query(&self) -> Query;
}

impl StatementExt for Statement {
    fn to_query(&self) -> Query {
        tracing::trace!(statement = %self.statement, "building driver query");
        self.parameters
            .iter()
            .fold(neo4rs::query(&self.statement), |query, (name, value)| {
                query.param(name, to_bolt(value))
            })
    }
}

/// Reads the `id(x) AS x` projection of a result row.
pub fn generated_ids<S: AsRef<str>>(
    row: &Row,
    columns: &[S],
) -> Result<HashMap<String, i64>, Neo4jError> {
    columns
        .iter()
        .map(|column| {
            let column = column.as_ref();
            row.get::<i64>(column)
                .map(|id| (column.to_string(), id))
                .map_err(|e| Neo4jError::missing_column(column, e))
        })
        .collect()
}

/// Pairs every object the context registered as new with the id the
/// database generated for it.
///
/// Objects whose reference is not projected by the row are skipped: a
/// relationship registered before both its endpoints were known never makes
/// it into the `RETURN` clause.
pub fn resolve_generated(
    row: &Row,
    context: &CypherContext,
) -> Result<Vec<(EntityKey, i64)>, Neo4jError> {
    let mut ids = HashMap::new();
    for (reference, _) in context.created_objects() {
        let column = reference.as_str();
        match row.get::<i64>(column) {
            Ok(id) => {
                ids.insert(column.to_string(), id);
            }
            Err(e) => tracing::trace!(column, error = %e, "reference not in result row"),
        }
    }
    Ok(context.resolve_created_ids(&ids)?)
}
