//! The `RETURN` projection that hands generated ids back to the caller.

use std::collections::BTreeSet;

use crate::emitter::{Emitter, RenderState};
use crate::identifiers::Identifier;

/// Projects `id(v) AS v` for every variable in a set.
#[derive(Debug, Clone, Copy)]
pub struct ReturnClauseBuilder<'a> {
    variables: &'a BTreeSet<Identifier>,
}

impl<'a> ReturnClauseBuilder<'a> {
    pub fn new(variables: &'a BTreeSet<Identifier>) -> Self {
        Self { variables }
    }
}

impl Emitter for ReturnClauseBuilder<'_> {
    fn emit(&self, state: &mut RenderState) -> bool {
        if self.variables.is_empty() {
            return false;
        }
        let projection = self
            .variables
            .iter()
            .map(|v| format!("id({v}) AS {v}"))
            .collect::<Vec<_>>()
            .join(", ");
        state.begin_clause("RETURN ");
        state.query.push_str(&projection);
        true
    }
}
