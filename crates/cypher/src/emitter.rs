//! The contract shared by every clause-producing builder.
//!
//! One [`RenderState`] is created per render and threaded through every
//! emitter in a fixed order. It holds the query text, the parameter map and the
//! set of variables that are bound ("live") at the current point of the
//! statement.

use std::collections::BTreeSet;

use crate::identifiers::Identifier;
use crate::value::Parameters;

/// Mutable state of one render pass.
#[derive(Debug, Default)]
pub struct RenderState {
    pub query: String,
    pub parameters: Parameters,
    /// Variables bound by earlier clauses, iterated in textual order.
    pub live: BTreeSet<Identifier>,
}

impl RenderState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new clause, separating it from any preceding text.
    pub fn begin_clause(&mut self, keyword: &str) {
        if !self.query.is_empty() {
            self.query.push(' ');
        }
        self.query.push_str(keyword);
    }

    /// Emits `WITH a,b,..` so variables bound so far stay in scope for the
    /// next `MATCH`/`MERGE`. Does nothing when no variable is bound yet.
    pub fn carry_live_variables(&mut self) {
        if self.live.is_empty() {
            return;
        }
        let vars = self
            .live
            .iter()
            .map(Identifier::as_str)
            .collect::<Vec<_>>()
            .join(",");
        self.begin_clause("WITH ");
        self.query.push_str(&vars);
    }

    pub fn is_live(&self, identifier: &Identifier) -> bool {
        self.live.contains(identifier)
    }

    pub fn bind(&mut self, identifier: &Identifier) {
        self.live.insert(identifier.clone());
    }
}

/// A unit that renders zero or more clauses into a [`RenderState`].
pub trait Emitter {
    /// Appends this unit's clauses and parameters.
    ///
    /// Returns `true` iff anything was emitted. The compiler uses the result to
    /// decide whether the unit takes part in the `RETURN` projection and
    /// whether a separator is needed before the next sibling.
    fn emit(&self, state: &mut RenderState) -> bool;
}

/// Renders a label or relationship type as a backtick-quoted name.
pub(crate) fn quoted(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Renders a relationship type or property key bare when it is a plain
/// `[A-Za-z_][A-Za-z0-9_]*` name, backtick-quoted otherwise.
pub(crate) fn symbolic_name(name: &str) -> String {
    let mut chars = name.chars();
    let plain = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        name.to_string()
    } else {
        quoted(name)
    }
}
