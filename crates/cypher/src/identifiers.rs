//! Query variable names.
//!
//! Every node and relationship touched by a statement is bound to a Cypher
//! variable. Two disjoint formats are used:
//!
//! - `_<n>` for entities created by this statement, numbered by an
//!   [`IdentifierManager`] scoped to one compiler.
//! - `$<id>` for entities that already exist, derived from their persisted id.
//!
//! The prefixes keep the two spaces apart, so the numeric part of an existing
//! reference can always be recovered by dropping the first character.

use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::CypherError;

const NEW_PREFIX: char = '_';
const EXISTING_PREFIX: char = '$';

// ============================================================================
// Identifier
// ============================================================================

/// A Cypher variable name in one of the two identifier formats.
///
/// Ordering is textual (`_10` sorts before `_2`); the compiler relies on it
/// to render builders in a reproducible order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    /// Identifier for the `n`th entity created in a statement.
    pub fn new_entity(n: u64) -> Self {
        Self(format!("{NEW_PREFIX}{n}"))
    }

    /// Identifier for an entity that already has a persisted id.
    pub fn existing(id: i64) -> Self {
        Self(format!("{EXISTING_PREFIX}{id}"))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_new(&self) -> bool {
        self.0.starts_with(NEW_PREFIX)
    }

    pub fn is_existing(&self) -> bool {
        self.0.starts_with(EXISTING_PREFIX)
    }

    /// The text after the prefix, as rendered in `WHERE id(x)=<suffix>` guards.
    pub fn suffix(&self) -> &str {
        // Both prefixes are single-byte ASCII.
        &self.0[1..]
    }

    /// The persisted id of an existing entity; `None` for new-entity identifiers.
    pub fn persisted_id(&self) -> Option<i64> {
        if self.is_existing() {
            self.suffix().parse().ok()
        } else {
            None
        }
    }

    /// Name of the parameter that carries this entity's property map.
    pub fn props_parameter(&self) -> String {
        format!("{}_props", self.0)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Identifier {
    type Err = CypherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let valid = match chars.next() {
            Some(NEW_PREFIX) => chars.as_str().parse::<u64>().is_ok(),
            Some(EXISTING_PREFIX) => chars.as_str().parse::<i64>().is_ok(),
            _ => false,
        };
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(CypherError::invalid_identifier(s))
        }
    }
}

impl TryFrom<String> for Identifier {
    type Error = CypherError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Identifier> for String {
    fn from(identifier: Identifier) -> String {
        identifier.0
    }
}

// ============================================================================
// IdentifierManager
// ============================================================================

/// Issues new-entity identifiers for one compiler.
///
/// The counter is guarded by a mutex so that several threads sharing one
/// manager never observe the same number.
#[derive(Debug, Default)]
pub struct IdentifierManager {
    counter: Mutex<u64>,
}

impl IdentifierManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `_<n>` and advances the counter.
    pub fn next_identifier(&self) -> Identifier {
        let mut counter = self.lock();
        let identifier = Identifier::new_entity(*counter);
        *counter += 1;
        identifier
    }

    /// Returns `$<existing_id>`. Does not touch the counter.
    pub fn identifier(&self, existing_id: i64) -> Identifier {
        Identifier::existing(existing_id)
    }

    /// Steps the counter back by one, saturating at zero.
    ///
    /// This only hands back the most recently issued identifier; prefer
    /// [`IdentifierManager::release`], which checks that.
    pub fn release_identifier(&self) {
        let mut counter = self.lock();
        *counter = counter.saturating_sub(1);
    }

    /// Releases `identifier` if it is the most recently issued one.
    ///
    /// Returns `false` and leaves the counter untouched otherwise, since
    /// stepping back past a still-used identifier would hand it out twice.
    pub fn release(&self, identifier: &Identifier) -> bool {
        let mut counter = self.lock();
        let latest = counter.checked_sub(1).map(Identifier::new_entity);
        if latest.as_ref() == Some(identifier) {
            *counter -= 1;
            true
        } else {
            tracing::warn!(
                identifier = %identifier,
                issued = *counter,
                "refusing to release identifier that is not the most recently issued"
            );
            false
        }
    }

    /// Number of new-entity identifiers currently issued.
    pub fn issued(&self) -> u64 {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, u64> {
        self.counter.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
