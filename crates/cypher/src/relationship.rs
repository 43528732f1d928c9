//! Pending state of one relationship and its rendering.
//!
//! Three lifecycles share one builder type:
//!
//! - **New**: wired with [`RelationshipBuilder::relate`], rendered as `MERGE`.
//! - **Existing**: a persisted relationship whose properties are rewritten.
//! - **Deleted**: fully specified at construction, rendered as `MATCH .. DELETE`.
//!
//! New and existing builders that are still missing an endpoint render
//! nothing. The mapping layer may create a builder before it knows both ends;
//! such a builder simply drops out of the statement.

use crate::emitter::{quoted, symbolic_name, Emitter, RenderState};
use crate::identifiers::Identifier;
use crate::metadata::{Direction, EntityAccessStrategy};
use crate::value::{PropertyBag, PropertyValue};

/// Lifecycle of a relationship builder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipState {
    New,
    Existing { id: i64 },
    Deleted { id: Option<i64> },
}

/// Type, endpoints and properties to write for one relationship.
#[derive(Debug, Clone)]
pub struct RelationshipBuilder {
    reference: Identifier,
    relationship_type: Option<String>,
    direction: Option<Direction>,
    start: Option<Identifier>,
    end: Option<Identifier>,
    properties: PropertyBag,
    state: RelationshipState,
}

impl RelationshipBuilder {
    /// Builder for a relationship created by the statement.
    pub fn new(reference: Identifier) -> Self {
        Self::with_state(reference, RelationshipState::New)
    }

    /// Builder for the persisted relationship `id`, bound to `reference`.
    pub fn existing(reference: Identifier, id: i64) -> Self {
        Self::with_state(reference, RelationshipState::Existing { id })
    }

    /// Builder that removes `(start)-[reference:relationship_type]->(end)`.
    ///
    /// When the relationship's own id is known it is added to the match guard.
    pub fn deleted(
        start: Identifier,
        relationship_type: impl Into<String>,
        end: Identifier,
        reference: Identifier,
        id: Option<i64>,
    ) -> Self {
        let mut builder = Self::with_state(reference, RelationshipState::Deleted { id });
        builder.relationship_type = Some(relationship_type.into());
        builder.start = Some(start);
        builder.end = Some(end);
        builder
    }

    fn with_state(reference: Identifier, state: RelationshipState) -> Self {
        Self {
            reference,
            relationship_type: None,
            direction: None,
            start: None,
            end: None,
            properties: PropertyBag::new(),
            state,
        }
    }

    pub fn reference(&self) -> &Identifier {
        &self.reference
    }

    pub fn state(&self) -> RelationshipState {
        self.state
    }

    pub fn is_new(&self) -> bool {
        self.state == RelationshipState::New
    }

    /// The persisted relationship id, if known.
    pub fn existing_id(&self) -> Option<i64> {
        match self.state {
            RelationshipState::New => None,
            RelationshipState::Existing { id } => Some(id),
            RelationshipState::Deleted { id } => id,
        }
    }

    pub fn relationship_type(&self) -> Option<&str> {
        self.relationship_type.as_deref()
    }

    pub fn set_type(&mut self, relationship_type: impl Into<String>) -> &mut Self {
        self.relationship_type = Some(relationship_type.into());
        self
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Direction) -> &mut Self {
        self.direction = Some(direction);
        self
    }

    pub fn has_direction(&self, direction: Direction) -> bool {
        self.direction == Some(direction)
    }

    /// Wires both endpoints. Until this is called the builder emits nothing.
    pub fn relate(&mut self, start: Identifier, end: Identifier) -> &mut Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn start_node(&self) -> Option<&Identifier> {
        self.start.as_ref()
    }

    pub fn end_node(&self) -> Option<&Identifier> {
        self.end.as_ref()
    }

    pub fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    pub fn add_property(
        &mut self,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> &mut Self {
        self.properties.insert(name, value);
        self
    }

    /// Copies the properties of a relationship entity into the bag, nulls
    /// included. Null values are left out of the `MERGE` pattern at render time.
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
            self.properties.insert(name, value);
        }
        self
    }

    fn endpoints(&self) -> Option<(&Identifier, &Identifier)> {
        match (&self.start, &self.end) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }

    /// `MATCH (x) WHERE id(x)=..` for an endpoint not bound by an earlier clause.
    fn match_unbound(state: &mut RenderState, node: &Identifier) {
        if state.is_live(node) {
            return;
        }
        state.begin_clause("MATCH ");
        state
            .query
            .push_str(&format!("({node}) WHERE id({node})={}", node.suffix()));
        state.bind(node);
    }

    fn emit_new(&self, state: &mut RenderState) -> bool {
        let (Some((start, end)), Some(relationship_type)) =
            (self.endpoints(), self.relationship_type())
        else {
            tracing::trace!(reference = %self.reference, "skipping unwired relationship");
            return false;
        };
        let reference = &self.reference;

        state.carry_live_variables();
        Self::match_unbound(state, start);
        Self::match_unbound(state, end);

        let parameter = reference.props_parameter();
        let inline = self
            .properties
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(name, _)| {
                let key = symbolic_name(name);
                format!("{key}:{{{parameter}}}.{key}")
            })
            .collect::<Vec<_>>();

        state.begin_clause("MERGE ");
        state.query.push_str(&format!(
            "({start})-[{reference}:{}",
            quoted(relationship_type)
        ));
        if !inline.is_empty() {
            state.query.push_str(&format!("{{{}}}", inline.join(",")));
        }
        state.query.push_str(&format!("]->({end})"));

        if !self.properties.is_empty() {
            state
                .parameters
                .insert(parameter, self.properties.clone().into());
        }
        state.bind(reference);
        true
    }

    fn emit_existing(&self, state: &mut RenderState, id: i64) -> bool {
        if self.endpoints().is_none() {
            tracing::trace!(reference = %self.reference, "skipping unwired relationship");
            return false;
        }
        let reference = &self.reference;

        // Endpoints are not re-matched.
        state.carry_live_variables();
        state.begin_clause("MATCH ");
        state
            .query
            .push_str(&format!("()-[{reference}]->() WHERE id({reference})={id}"));

        if !self.properties.is_empty() {
            let parameter = reference.props_parameter();
            state
                .query
                .push_str(&format!(" SET {reference}+={{{parameter}}}"));
            state
                .parameters
                .insert(parameter, self.properties.clone().into());
            state.bind(reference);
        }
        true
    }

    fn emit_deleted(&self, state: &mut RenderState, id: Option<i64>) -> bool {
        let (Some((start, end)), Some(relationship_type)) =
            (self.endpoints(), self.relationship_type())
        else {
            return false;
        };
        let reference = &self.reference;

        state.carry_live_variables();
        state.begin_clause("MATCH ");
        state
            .query
            .push_str(&format!(
                "({start})-[{reference}:{}]->({end})",
                symbolic_name(relationship_type)
            ));

        let mut guards = Vec::new();
        for node in [start, end] {
            if !state.is_live(node) {
                guards.push(format!("id({node})={}", node.suffix()));
                state.bind(node);
            }
        }
        if let Some(id) = id {
            if !state.is_live(reference) {
                guards.push(format!("id({reference})={id}"));
                state.bind(reference);
            }
        }
        if !guards.is_empty() {
            state.query.push_str(" WHERE ");
            state.query.push_str(&guards.join(" AND "));
        }

        state.begin_clause("DELETE ");
        state.query.push_str(reference.as_str());
        true
    }
}

impl Emitter for RelationshipBuilder {
    fn emit(&self, state: &mut RenderState) -> bool {
        match self.state {
            RelationshipState::New => self.emit_new(state),
            RelationshipState::Existing { id } => self.emit_existing(state, id),
            RelationshipState::Deleted { id } => self.emit_deleted(state, id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_id(n: u64) -> Identifier {
        Identifier::new_entity(n)
    }

    fn existing_id(id: i64) -> Identifier {
        Identifier::existing(id)
    }

    fn state_with_live(live: &[Identifier]) -> RenderState {
        let mut state = RenderState::new();
        for identifier in live {
            state.bind(identifier);
        }
        state
    }

    #[test]
    fn test_new_relationship_without_endpoints_emits_nothing() {
        let mut rel = RelationshipBuilder::new(new_id(2));
        rel.set_type("KNOWS");

        let mut state = state_with_live(&[new_id(0)]);
        assert!(!rel.emit(&mut state));
        assert!(state.query.is_empty());
        assert!(!state.is_live(&new_id(2)));
    }

    #[test]
    fn test_new_relationship_between_live_nodes() {
        let mut rel = RelationshipBuilder::new(new_id(1));
        rel.set_type("TEACHERS").relate(new_id(0), new_id(2));

        let mut state = state_with_live(&[new_id(0), new_id(2)]);
        assert!(rel.emit(&mut state));
        assert_eq!(state.query, "WITH _0,_2 MERGE (_0)-[_1:`TEACHERS`]->(_2)");
        assert!(state.parameters.is_empty());
        assert!(state.is_live(&new_id(1)));
    }

    #[test]
    fn test_new_relationship_matches_unbound_endpoints() {
        let mut rel = RelationshipBuilder::new(new_id(2));
        rel.set_type("STUDENTS").relate(existing_id(2), existing_id(3));

        let mut state = RenderState::new();
        assert!(rel.emit(&mut state));
        assert_eq!(
            state.query,
            "MATCH ($2) WHERE id($2)=2 MATCH ($3) WHERE id($3)=3 MERGE ($2)-[_2:`STUDENTS`]->($3)"
        );
        assert!(state.is_live(&existing_id(2)));
        assert!(state.is_live(&existing_id(3)));
    }

    #[test]
    fn test_new_relationship_properties_are_inlined_per_key() {
        let mut rel = RelationshipBuilder::new(new_id(1));
        rel.set_type("HAS_TOPIC")
            .relate(new_id(0), new_id(2))
            .add_property("timestamp", 1647209i64)
            .add_property("note", PropertyValue::Null);

        let mut state = state_with_live(&[new_id(0), new_id(2)]);
        assert!(rel.emit(&mut state));
        assert_eq!(
            state.query,
            "WITH _0,_2 MERGE (_0)-[_1:`HAS_TOPIC`{timestamp:{_1_props}.timestamp}]->(_2)"
        );
        let PropertyValue::Map(props) = &state.parameters["_1_props"] else {
            panic!("expected a property map");
        };
        assert_eq!(props.len(), 2);
        assert_eq!(props["note"], PropertyValue::Null);
    }

    #[test]
    fn test_merge_quotes_property_keys_that_are_not_plain_names() {
        let mut rel = RelationshipBuilder::new(new_id(2));
        rel.set_type("NAMED")
            .relate(new_id(0), new_id(1))
            .add_property("first name", "Ada")
            .add_property("since", 1843i64);

        let mut state = state_with_live(&[new_id(0), new_id(1)]);
        assert!(rel.emit(&mut state));
        assert_eq!(
            state.query,
            "WITH _0,_1 MERGE (_0)-[_2:`NAMED`{`first name`:{_2_props}.`first name`,\
             since:{_2_props}.since}]->(_1)"
        );
        let PropertyValue::Map(props) = &state.parameters["_2_props"] else {
            panic!("expected a property map");
        };
        assert!(props.contains_key("first name"));
    }

    #[test]
    fn test_relationship_type_is_quoted() {
        let mut rel = RelationshipBuilder::new(new_id(3));
        rel.set_type("HAS-ALBUM").relate(new_id(0), new_id(2));

        let mut state = state_with_live(&[new_id(0), new_id(2)]);
        rel.emit(&mut state);
        assert!(state.query.ends_with("MERGE (_0)-[_3:`HAS-ALBUM`]->(_2)"));
    }

    #[test]
    fn test_existing_relationship_update() {
        let mut rel = RelationshipBuilder::existing(new_id(0), 2);
        rel.set_type("HAS_TOPIC")
            .relate(existing_id(0), existing_id(1))
            .add_property("timestamp", 327790i64);

        let mut state = RenderState::new();
        assert!(rel.emit(&mut state));
        assert_eq!(state.query, "MATCH ()-[_0]->() WHERE id(_0)=2 SET _0+={_0_props}");
        assert!(state.is_live(&new_id(0)));
        assert_eq!(rel.existing_id(), Some(2));
    }

    #[test]
    fn test_existing_relationship_without_properties_only_matches() {
        let mut rel = RelationshipBuilder::existing(new_id(4), 9);
        rel.relate(existing_id(0), existing_id(1));

        let mut state = RenderState::new();
        assert!(rel.emit(&mut state));
        assert_eq!(state.query, "MATCH ()-[_4]->() WHERE id(_4)=9");
        assert!(state.live.is_empty());
        assert!(state.parameters.is_empty());
    }

    #[test]
    fn test_existing_relationship_without_endpoints_emits_nothing() {
        let mut rel = RelationshipBuilder::existing(new_id(0), 2);
        rel.add_property("timestamp", 1i64);

        let mut state = RenderState::new();
        assert!(!rel.emit(&mut state));
        assert!(state.query.is_empty());
    }

    #[test]
    fn test_deleted_relationship_guards_every_unbound_variable() {
        let rel =
            RelationshipBuilder::deleted(new_id(0), "KNOWS", existing_id(42), new_id(5), Some(17));

        let mut state = RenderState::new();
        assert!(rel.emit(&mut state));
        assert_eq!(
            state.query,
            "MATCH (_0)-[_5:KNOWS]->($42) WHERE id(_0)=0 AND id($42)=42 AND id(_5)=17 DELETE _5"
        );
        assert!(state.is_live(&new_id(0)));
        assert!(state.is_live(&existing_id(42)));
        assert!(state.is_live(&new_id(5)));
    }

    #[test]
    fn test_deleted_relationship_quotes_types_that_are_not_plain_names() {
        let delete = |ty: &str, reference: u64| {
            let (start, end) = (existing_id(0), existing_id(1));
            RelationshipBuilder::deleted(start, ty, end, new_id(reference), None)
        };

        let rel = delete("HAS-ALBUM", 0);

        let mut state = RenderState::new();
        assert!(rel.emit(&mut state));
        assert_eq!(
            state.query,
            "MATCH ($0)-[_0:`HAS-ALBUM`]->($1) WHERE id($0)=0 AND id($1)=1 DELETE _0"
        );

        let rel = delete("X]->() DELETE n", 3);
        let mut state = RenderState::new();
        rel.emit(&mut state);
        assert!(state.query.starts_with("MATCH ($0)-[_3:`X]->() DELETE n`]->($1)"));
    }

    #[test]
    fn test_deleted_relationship_skips_guards_for_live_variables() {
        let rel = RelationshipBuilder::deleted(
            existing_id(0),
            "STUDENTS",
            existing_id(3),
            new_id(1),
            None,
        );

        let mut state = state_with_live(&[existing_id(0), existing_id(1)]);
        assert!(rel.emit(&mut state));
        assert_eq!(
            state.query,
            "WITH $0,$1 MATCH ($0)-[_1:STUDENTS]->($3) WHERE id($3)=3 DELETE _1"
        );
        assert!(!state.is_live(&new_id(1)));
    }

    #[test]
    fn test_deleted_relationship_with_all_endpoints_live_has_no_where() {
        let rel =
            RelationshipBuilder::deleted(existing_id(0), "R", existing_id(1), new_id(2), None);

        let mut state = state_with_live(&[existing_id(0), existing_id(1)]);
        rel.emit(&mut state);
        assert_eq!(state.query, "WITH $0,$1 MATCH ($0)-[_2:R]->($1) DELETE _2");
    }

    #[test]
    fn test_direction_tag() {
        let mut rel = RelationshipBuilder::new(new_id(0));
        assert_eq!(rel.direction(), None);
        rel.set_direction(Direction::Outgoing);
        assert!(rel.has_direction(Direction::Outgoing));
        assert!(!rel.has_direction(Direction::Incoming));
    }
}
