//! Bookkeeping shared between the mapping layer and one compiler.
//!
//! While an object graph is walked the mapper records here which objects it
//! has already visited, which persisted relationships it has seen, and which
//! new objects it has asked the compiler to create. After the statement has
//! run, the same context pairs the generated ids in the `RETURN` row with the
//! objects they belong to.

use std::collections::{HashMap, HashSet};

use crate::error::CypherError;
use crate::identifiers::Identifier;
use crate::statement::Statement;

// ============================================================================
// Keys and relationship records
// ============================================================================

/// Identity of a source domain object.
///
/// [`EntityKey::of`] keys an object by address, which is stable for as long as
/// the caller keeps the object borrowed or pinned in place. Callers that own
/// their own handles can use [`EntityKey::from_handle`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey(usize);

impl EntityKey {
    pub fn of<T: ?Sized>(entity: &T) -> Self {
        Self(entity as *const T as *const () as usize)
    }

    pub fn from_handle(handle: usize) -> Self {
        Self(handle)
    }

    pub fn as_usize(&self) -> usize {
        self.0
    }
}

/// A persisted relationship, keyed by the ids of its endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MappedRelationship {
    pub start_node_id: i64,
    pub relationship_type: String,
    pub end_node_id: i64,
}

impl MappedRelationship {
    pub fn new(start_node_id: i64, relationship_type: impl Into<String>, end_node_id: i64) -> Self {
        Self {
            start_node_id,
            relationship_type: relationship_type.into(),
            end_node_id,
        }
    }
}

/// A relationship created in the current statement, keyed by variable names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransientRelationship {
    pub src: Identifier,
    pub relationship_type: String,
    pub tgt: Identifier,
}

impl TransientRelationship {
    pub fn new(src: Identifier, relationship_type: impl Into<String>, tgt: Identifier) -> Self {
        Self {
            src,
            relationship_type: relationship_type.into(),
            tgt,
        }
    }

    /// Same type between the same two variables, in either direction.
    pub fn equals_ignore_direction(
        &self,
        src: &Identifier,
        relationship_type: &str,
        tgt: &Identifier,
    ) -> bool {
        self.relationship_type == relationship_type
            && ((&self.src == src && &self.tgt == tgt) || (&self.src == tgt && &self.tgt == src))
    }
}

/// Something the mapper has already written into the current statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogEntry {
    Entity(EntityKey),
    Relationship(TransientRelationship),
}

// ============================================================================
// CypherContext
// ============================================================================

/// Per-unit-of-work state shared by the mapper and its compiler.
///
/// Not meant for concurrent mutation: one context belongs to one save.
#[derive(Debug, Default)]
pub struct CypherContext {
    visited: HashMap<EntityKey, Identifier>,
    registered: HashSet<MappedRelationship>,
    created: HashMap<Identifier, EntityKey>,
    logged: HashSet<LogEntry>,
    /// `logged` in insertion order.
    log: Vec<LogEntry>,
    statements: Vec<Statement>,
}

impl CypherContext {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- visited objects ----

    /// Records that `entity` is rendered by the node builder at `reference`.
    pub fn visit(&mut self, entity: EntityKey, reference: Identifier) {
        self.visited.insert(entity, reference);
    }

    pub fn visited(&self, entity: EntityKey) -> bool {
        self.visited.contains_key(&entity)
    }

    /// Reference of the node builder already created for `entity`.
    pub fn node_builder_for(&self, entity: EntityKey) -> Option<&Identifier> {
        self.visited.get(&entity)
    }

    // ---- persisted relationships ----

    /// Returns `false` if the relationship was already registered.
    pub fn register_relationship(&mut self, relationship: MappedRelationship) -> bool {
        tracing::debug!(
            "context-new: (${})-[:{}]->(${})",
            relationship.start_node_id,
            relationship.relationship_type,
            relationship.end_node_id
        );
        self.registered.insert(relationship)
    }

    pub fn is_registered_relationship(&self, relationship: &MappedRelationship) -> bool {
        self.registered.contains(relationship)
    }

    /// Forgets every `(start_id)-[:relationship_type]->()` relationship.
    /// Returns how many were removed.
    pub fn deregister_outgoing_relationships(
        &mut self,
        start_id: i64,
        relationship_type: &str,
    ) -> usize {
        let before = self.registered.len();
        self.registered.retain(|r| {
            let matches = r.start_node_id == start_id && r.relationship_type == relationship_type;
            if matches {
                tracing::debug!("context-del: (${})-[:{}]->()", start_id, relationship_type);
            }
            !matches
        });
        before - self.registered.len()
    }

    /// Forgets every `()-[:relationship_type]->(end_id)` relationship.
    /// Returns how many were removed.
    pub fn deregister_incoming_relationships(
        &mut self,
        end_id: i64,
        relationship_type: &str,
    ) -> usize {
        let before = self.registered.len();
        self.registered.retain(|r| {
            let matches = r.end_node_id == end_id && r.relationship_type == relationship_type;
            if matches {
                tracing::debug!("context-del: ()-[:{}]->(${})", relationship_type, end_id);
            }
            !matches
        });
        before - self.registered.len()
    }

    pub fn registered_relationships(&self) -> impl Iterator<Item = &MappedRelationship> {
        self.registered.iter()
    }

    /// The members of `known` that are no longer registered, in input order.
    ///
    /// These are the relationships a save must delete.
    pub fn obsolete_relationships<'a, I>(&self, known: I) -> Vec<MappedRelationship>
    where
        I: IntoIterator<Item = &'a MappedRelationship>,
    {
        known
            .into_iter()
            .filter(|r| !self.registered.contains(*r))
            .cloned()
            .collect()
    }

    // ---- newly created objects ----

    /// Records that the entity created under `reference` is `entity`.
    pub fn register_new_object(&mut self, reference: Identifier, entity: EntityKey) {
        self.created.insert(reference, entity);
    }

    pub fn new_object(&self, reference: &Identifier) -> Option<EntityKey> {
        self.created.get(reference).copied()
    }

    pub fn created_objects(&self) -> impl Iterator<Item = (&Identifier, EntityKey)> {
        self.created.iter().map(|(reference, key)| (reference, *key))
    }

    /// Pairs every newly created object with the id the database generated
    /// for it, given the `RETURN` row as column name to id.
    ///
    /// Columns without a registered object are skipped. The result is ordered
    /// by column name.
    pub fn resolve_created_ids(
        &self,
        columns: &HashMap<String, i64>,
    ) -> Result<Vec<(EntityKey, i64)>, CypherError> {
        let mut resolved = Vec::new();
        for (column, id) in columns {
            let reference: Identifier = column.parse()?;
            match self.created.get(&reference) {
                Some(key) => resolved.push((reference, *key, *id)),
                None => tracing::trace!(column = %column, "no object registered for column"),
            }
        }
        resolved.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(resolved.into_iter().map(|(_, key, id)| (key, id)).collect())
    }

    // ---- log ----

    /// Returns `false` if the entry was already logged.
    pub fn log(&mut self, entry: LogEntry) -> bool {
        if !self.logged.insert(entry.clone()) {
            return false;
        }
        self.log.push(entry);
        true
    }

    pub fn is_logged(&self, entry: &LogEntry) -> bool {
        self.logged.contains(entry)
    }

    /// Entries in the order they were logged.
    pub fn log_entries(&self) -> &[LogEntry] {
        &self.log
    }

    /// Whether a relationship of this type between `src` and `tgt` has been
    /// logged in either direction.
    pub fn has_transient_relationship(
        &self,
        src: &Identifier,
        relationship_type: &str,
        tgt: &Identifier,
    ) -> bool {
        [(src, tgt), (tgt, src)].into_iter().any(|(from, to)| {
            let entry = LogEntry::Relationship(TransientRelationship::new(
                from.clone(),
                relationship_type,
                to.clone(),
            ));
            self.logged.contains(&entry)
        })
    }

    // ---- output ----

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn set_statements(&mut self, statements: Vec<Statement>) {
        self.statements = statements;
    }
}
