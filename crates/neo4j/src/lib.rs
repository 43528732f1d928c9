//! # OGM Neo4j
//!
//! Hands statements compiled by `ogm-cypher` to the `neo4rs` driver types and
//! reads generated ids back out of result rows. Connections and transactions
//! are left to the caller.

pub mod error;
pub mod query;

pub use error::Neo4jError;
pub use query::{generated_ids, resolve_generated, to_bolt, StatementExt};
