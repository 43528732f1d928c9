//! Pending state of one node and its rendering.
//!
//! A new node renders as a pattern inside the statement's single `CREATE`
//! clause. An existing node renders as `MATCH .. SET ..`, and only when it has
//! properties to write.

use crate::emitter::{quoted, Emitter, RenderState};
use crate::identifiers::Identifier;
use crate::metadata::EntityAccessStrategy;
use crate::value::{PropertyBag, PropertyValue};

/// Whether the node is created by the statement or already persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    New,
    Existing,
}

/// Labels and properties to write for one node.
#[derive(Debug, Clone)]
pub struct NodeBuilder {
    reference: Identifier,
    labels: Vec<String>,
    properties: PropertyBag,
    state: NodeState,
}

impl NodeBuilder {
    /// Builder for a node created by the statement, bound to a `_<n>` reference.
    pub fn new(reference: Identifier) -> Self {
        Self::with_state(reference, NodeState::New)
    }

    /// Builder for a persisted node, bound to its `$<id>` reference.
    pub fn existing(reference: Identifier) -> Self {
        Self::with_state(reference, NodeState::Existing)
    }

    fn with_state(reference: Identifier, state: NodeState) -> Self {
        Self {
            reference,
            labels: Vec::new(),
            properties: PropertyBag::new(),
            state,
        }
    }

    pub fn reference(&self) -> &Identifier {
        &self.reference
    }

    /// Labels in the order they were added; duplicates are kept.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn is_new(&self) -> bool {
        self.state == NodeState::New
    }

    /// The persisted id of an existing node.
    pub fn existing_id(&self) -> Option<i64> {
        match self.state {
            NodeState::New => None,
            NodeState::Existing => self.reference.persisted_id(),
        }
    }

    pub fn add_label(&mut self, label: impl Into<String>) -> &mut Self {
        self.labels.push(label.into());
        self
    }

    pub fn add_labels<I, S>(&mut self, labels: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels.extend(labels.into_iter().map(Into::into));
        self
    }

    pub fn add_property(
        &mut self,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> &mut Self {
        self.properties.insert(name, value);
        self
    }

    /// Copies every property `strategy` reports for `entity` into the bag.
    ///
    /// New nodes drop null values: a `CREATE` has nothing to clear. Existing
    /// nodes keep them, so `SET n += {..}` can null out a stored property.
    pub fn map_properties<A>(
        &mut self,
        entity: &A::Entity,
        class_info: &A::ClassInfo,
        strategy: &A,
    ) -> &mut Self
    where
        A: EntityAccessStrategy + ?Sized,
    {
        for (name, value) in strategy.property_values(class_info, entity) {
            if self.is_new() && value.is_null() {
                continue;
            }
            self.properties.insert(name, value);
        }
        self
    }

    fn render_labels(&self) -> String {
        self.labels
            .iter()
            .map(|label| format!(":{}", quoted(label)))
            .collect()
    }

    fn emit_new(&self, state: &mut RenderState) -> bool {
        let reference = &self.reference;
        state.query.push('(');
        state.query.push_str(reference.as_str());
        state.query.push_str(&self.render_labels());
        if !self.properties.is_empty() {
            let parameter = reference.props_parameter();
            state.query.push_str(&format!("{{{parameter}}}"));
            state
                .parameters
                .insert(parameter, self.properties.clone().into());
        }
        state.query.push(')');
        state.bind(reference);
        true
    }

    fn emit_existing(&self, state: &mut RenderState) -> bool {
        if self.properties.is_empty() {
            return false;
        }
        let reference = &self.reference;
        let parameter = reference.props_parameter();

        state.carry_live_variables();
        state.bind(reference);
        state.begin_clause("MATCH ");
        state.query.push_str(&format!(
            "({reference}) WHERE id({reference})={} SET ",
            reference.suffix()
        ));
        if !self.labels.is_empty() {
            state
                .query
                .push_str(&format!("{reference}{}, ", self.render_labels()));
        }
        state
            .query
            .push_str(&format!("{reference}+={{{parameter}}}"));
        state
            .parameters
            .insert(parameter, self.properties.clone().into());
        true
    }
}

impl Emitter for NodeBuilder {
    fn emit(&self, state: &mut RenderState) -> bool {
        match self.state {
            NodeState::New => self.emit_new(state),
            NodeState::Existing => self.emit_existing(state),
        }
    }
}
