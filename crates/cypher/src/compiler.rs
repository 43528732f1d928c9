//! Collects pending mutations and renders them as one statement.
//!
//! Builders are registered in five groups and rendered group by group in a
//! fixed order:
//!
//! 1. new nodes, as a single `CREATE` clause
//! 2. updated nodes
//! 3. new relationships
//! 4. updated relationships
//! 5. deleted relationships
//!
//! followed by a `RETURN` of the ids of everything the statement created.
//! Inside a group builders are visited in textual order of their reference,
//! so an equivalent set of calls always yields byte-identical query text.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::context::CypherContext;
use crate::emitter::{Emitter, RenderState};
use crate::identifiers::{Identifier, IdentifierManager};
use crate::node::NodeBuilder;
use crate::relationship::RelationshipBuilder;
use crate::return_clause::ReturnClauseBuilder;
use crate::statement::Statement;

/// Builds the statements for one unit of work.
pub trait CypherCompiler {
    /// Registers a node to be created and returns it for population.
    fn new_node(&mut self) -> &mut NodeBuilder;

    /// Registers an update of the persisted node `id`. Asking twice for the
    /// same node returns the same builder.
    fn existing_node(&mut self, id: i64) -> &mut NodeBuilder;

    /// Registers a relationship to be created. It emits nothing until both
    /// endpoints are set with [`RelationshipBuilder::relate`].
    fn new_relationship(&mut self) -> &mut RelationshipBuilder;

    /// Registers an update of the persisted relationship `id`.
    fn existing_relationship(&mut self, id: i64) -> &mut RelationshipBuilder;

    /// Registers removal of `(start)-[:relationship_type]->(end)`.
    fn unrelate(
        &mut self,
        start: Identifier,
        relationship_type: &str,
        end: Identifier,
        relationship_id: Option<i64>,
    ) -> &RelationshipBuilder;

    /// Drops a new relationship that turned out to be unneeded and hands its
    /// identifier back. Returns `false` if the identifier could not be
    /// released.
    fn release(&mut self, reference: &Identifier) -> bool;

    /// Node builder registered under `reference`, in either node group.
    fn node(&mut self, reference: &Identifier) -> Option<&mut NodeBuilder>;

    /// Relationship builder registered under `reference`, in any relationship group.
    fn relationship(&mut self, reference: &Identifier) -> Option<&mut RelationshipBuilder>;

    /// Renders every registered builder. Builders are not consumed.
    fn statements(&self) -> Vec<Statement>;

    /// Renders and stores the result on the context.
    fn compile(&mut self) -> &CypherContext;

    fn context(&self) -> &CypherContext;

    fn context_mut(&mut self) -> &mut CypherContext;
}

/// A compiler that renders everything into exactly one statement.
#[derive(Debug)]
pub struct SingleStatementCypherCompiler {
    identifiers: Arc<IdentifierManager>,
    new_nodes: BTreeMap<Identifier, NodeBuilder>,
    updated_nodes: BTreeMap<Identifier, NodeBuilder>,
    new_relationships: BTreeMap<Identifier, RelationshipBuilder>,
    updated_relationships: BTreeMap<Identifier, RelationshipBuilder>,
    deleted_relationships: BTreeMap<Identifier, RelationshipBuilder>,
    context: CypherContext,
}

impl Default for SingleStatementCypherCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl SingleStatementCypherCompiler {
    pub fn new() -> Self {
        Self::with_identifiers(Arc::new(IdentifierManager::new()))
    }

    /// A compiler drawing its identifiers from a shared manager.
    pub fn with_identifiers(identifiers: Arc<IdentifierManager>) -> Self {
        Self {
            identifiers,
            new_nodes: BTreeMap::new(),
            updated_nodes: BTreeMap::new(),
            new_relationships: BTreeMap::new(),
            updated_relationships: BTreeMap::new(),
            deleted_relationships: BTreeMap::new(),
            context: CypherContext::new(),
        }
    }

    pub fn identifiers(&self) -> &Arc<IdentifierManager> {
        &self.identifiers
    }

    pub fn into_context(self) -> CypherContext {
        self.context
    }

    fn render(&self) -> Statement {
        let mut state = RenderState::new();
        let mut created = BTreeSet::new();

        if !self.new_nodes.is_empty() {
            state.begin_clause("CREATE ");
            let mut first = true;
            for node in self.new_nodes.values() {
                let mark = state.query.len();
                if !first {
                    state.query.push_str(", ");
                }
                if node.emit(&mut state) {
                    created.insert(node.reference().clone());
                    first = false;
                } else {
                    state.query.truncate(mark);
                }
            }
        }

        for node in self.updated_nodes.values() {
            node.emit(&mut state);
        }

        for relationship in self.new_relationships.values() {
            if relationship.emit(&mut state) {
                created.insert(relationship.reference().clone());
            }
        }

        for relationship in self
            .updated_relationships
            .values()
            .chain(self.deleted_relationships.values())
        {
            relationship.emit(&mut state);
        }

        ReturnClauseBuilder::new(&created).emit(&mut state);

        Statement::new(state.query.trim(), state.parameters)
    }
}

impl CypherCompiler for SingleStatementCypherCompiler {
    fn new_node(&mut self) -> &mut NodeBuilder {
        let reference = self.identifiers.next_identifier();
        self.new_nodes
            .entry(reference.clone())
            .or_insert_with(|| NodeBuilder::new(reference))
    }

    fn existing_node(&mut self, id: i64) -> &mut NodeBuilder {
        let reference = self.identifiers.identifier(id);
        self.updated_nodes
            .entry(reference.clone())
            .or_insert_with(|| NodeBuilder::existing(reference))
    }

    fn new_relationship(&mut self) -> &mut RelationshipBuilder {
        let reference = self.identifiers.next_identifier();
        self.new_relationships
            .entry(reference.clone())
            .or_insert_with(|| RelationshipBuilder::new(reference))
    }

    fn existing_relationship(&mut self, id: i64) -> &mut RelationshipBuilder {
        let reference = self.identifiers.next_identifier();
        self.updated_relationships
            .entry(reference.clone())
            .or_insert_with(|| RelationshipBuilder::existing(reference, id))
    }

    fn unrelate(
        &mut self,
        start: Identifier,
        relationship_type: &str,
        end: Identifier,
        relationship_id: Option<i64>,
    ) -> &RelationshipBuilder {
        let reference = self.identifiers.next_identifier();
        tracing::debug!(
            "unrelate: ({})-[{}:{}]->({})",
            start,
            reference,
            relationship_type,
            end
        );
        self.deleted_relationships
            .entry(reference.clone())
            .or_insert_with(|| {
                RelationshipBuilder::deleted(
                    start,
                    relationship_type,
                    end,
                    reference,
                    relationship_id,
                )
            })
    }

    fn release(&mut self, reference: &Identifier) -> bool {
        if self.new_relationships.remove(reference).is_none() {
            tracing::warn!(reference = %reference, "release of unknown relationship builder");
            return false;
        }
        self.identifiers.release(reference)
    }

    fn node(&mut self, reference: &Identifier) -> Option<&mut NodeBuilder> {
        if self.new_nodes.contains_key(reference) {
            return self.new_nodes.get_mut(reference);
        }
        self.updated_nodes.get_mut(reference)
    }

    fn relationship(&mut self, reference: &Identifier) -> Option<&mut RelationshipBuilder> {
        if self.new_relationships.contains_key(reference) {
            return self.new_relationships.get_mut(reference);
        }
        if self.updated_relationships.contains_key(reference) {
            return self.updated_relationships.get_mut(reference);
        }
        self.deleted_relationships.get_mut(reference)
    }

    fn statements(&self) -> Vec<Statement> {
        vec![self.render()]
    }

    fn compile(&mut self) -> &CypherContext {
        let statements = self.statements();
        for statement in &statements {
            tracing::debug!(
                statement = %statement.statement,
                parameters = statement.parameters.len(),
                "compiled statement"
            );
        }
        self.context.set_statements(statements);
        &self.context
    }

    fn context(&self) -> &CypherContext {
        &self.context
    }

    fn context_mut(&mut self) -> &mut CypherContext {
        &mut self.context
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statement(compiler: &SingleStatementCypherCompiler) -> String {
        compiler.statements()[0].statement.clone()
    }

    #[test]
    fn test_empty_compiler_renders_empty_statement() {
        let compiler = SingleStatementCypherCompiler::new();
        let statements = compiler.statements();
        assert_eq!(statements.len(), 1);
        assert!(statements[0].is_empty());
        assert!(statements[0].parameters.is_empty());
    }

    #[test]
    fn test_single_new_node() {
        let mut compiler = SingleStatementCypherCompiler::new();
        compiler
            .new_node()
            .add_labels(["Student", "DomainObject"])
            .add_property("name", "Gary");

        assert_eq!(
            statement(&compiler),
            "CREATE (_0:`Student`:`DomainObject`{_0_props}) RETURN id(_0) AS _0"
        );
    }

    #[test]
    fn test_unchanged_existing_node_renders_nothing() {
        let mut compiler = SingleStatementCypherCompiler::new();
        compiler.existing_node(0).add_labels(["Student", "DomainObject"]);
        assert_eq!(statement(&compiler), "");
    }

    #[test]
    fn test_existing_node_is_registered_once() {
        let mut compiler = SingleStatementCypherCompiler::new();
        compiler.existing_node(5).add_property("a", 1);
        compiler.existing_node(5).add_property("b", 2);

        let node = compiler.node(&Identifier::existing(5)).expect("registered");
        assert_eq!(node.properties().len(), 2);
    }

    #[test]
    fn test_existing_relationship_uses_fresh_variable() {
        let mut compiler = SingleStatementCypherCompiler::new();
        let reference = compiler
            .existing_relationship(2)
            .relate(Identifier::existing(0), Identifier::existing(1))
            .add_property("timestamp", 42i64)
            .reference()
            .clone();

        assert_eq!(reference, Identifier::new_entity(0));
        assert_eq!(
            statement(&compiler),
            "MATCH ()-[_0]->() WHERE id(_0)=2 SET _0+={_0_props}"
        );
    }

    #[test]
    fn test_release_drops_builder_and_reissues_identifier() {
        let mut compiler = SingleStatementCypherCompiler::new();
        let start = compiler.new_node().reference().clone();
        let end = compiler.new_node().reference().clone();
        let rel = compiler.new_relationship().reference().clone();

        assert!(compiler.release(&rel));
        assert!(compiler.relationship(&rel).is_none());

        compiler
            .new_relationship()
            .set_type("KNOWS")
            .relate(start, end);
        assert_eq!(
            statement(&compiler),
            "CREATE (_0), (_1) WITH _0,_1 MERGE (_0)-[_2:`KNOWS`]->(_1) \
             RETURN id(_0) AS _0, id(_1) AS _1, id(_2) AS _2"
        );
    }

    #[test]
    fn test_release_out_of_order_keeps_counter() {
        let mut compiler = SingleStatementCypherCompiler::new();
        let first = compiler.new_relationship().reference().clone();
        compiler.new_node();

        assert!(!compiler.release(&first));
        assert!(compiler.relationship(&first).is_none());
        assert_eq!(compiler.identifiers().issued(), 2);
        assert!(!compiler.release(&first));
    }

    #[test]
    fn test_compile_stores_statements_on_context() {
        let mut compiler = SingleStatementCypherCompiler::new();
        compiler.new_node().add_label("Topic");

        let stored = compiler.compile().statements().to_vec();
        assert_eq!(stored, compiler.statements());
        assert_eq!(stored[0].statement, "CREATE (_0:`Topic`) RETURN id(_0) AS _0");

        let context = compiler.into_context();
        assert_eq!(context.statements().len(), 1);
    }
}
