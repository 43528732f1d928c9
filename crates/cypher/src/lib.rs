//! # OGM Cypher
//!
//! Turns a unit of work (nodes to create or update, relationships to create,
//! update or delete) into a single parameterised Cypher statement plus the
//! parameter map it binds.
//!
//! ## Architecture Role
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ mapping layer (external)     │  decides what to persist
//! └──────────────┬───────────────┘
//!                ▼
//! ┌──────────────────────────────┐
//! │ ogm-cypher (THIS CRATE)      │  builders → one Statement
//! └──────────────┬───────────────┘
//!                ▼
//! ┌──────────────────────────────┐
//! │ ogm-neo4j                    │  Statement → neo4rs::Query
//! └──────────────────────────────┘
//! ```
//!
//! ## Design Principles
//!
//! 1. **No I/O** - rendering is a bounded in-memory operation
//! 2. **No literals** - property values travel only as parameters
//! 3. **Deterministic** - equal input yields byte-identical text

pub mod compiler;
pub mod context;
pub mod emitter;
pub mod error;
pub mod identifiers;
pub mod metadata;
pub mod node;
pub mod relationship;
pub mod return_clause;
pub mod statement;
pub mod value;

pub use compiler::{CypherCompiler, SingleStatementCypherCompiler};
pub use context::{CypherContext, EntityKey, LogEntry, MappedRelationship, TransientRelationship};
pub use emitter::{Emitter, RenderState};
pub use error::CypherError;
pub use identifiers::{Identifier, IdentifierManager};
pub use metadata::{Direction, EntityAccessStrategy};
pub use node::{NodeBuilder, NodeState};
pub use relationship::{RelationshipBuilder, RelationshipState};
pub use return_clause::ReturnClauseBuilder;
pub use statement::{Statement, Statements};
pub use value::{Parameters, PropertyBag, PropertyValue};
