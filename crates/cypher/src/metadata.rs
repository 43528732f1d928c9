//! Contracts the compiler needs from the mapping layer.
//!
//! The compiler never inspects domain objects itself. Whatever knows how to
//! read them implements [`EntityAccessStrategy`]; the class descriptor it works
//! from is passed straight through and stays opaque here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CypherError;
use crate::value::PropertyValue;

/// Yields the persistable properties of a domain object.
pub trait EntityAccessStrategy {
    /// Descriptor of the object's type (labels, field mapping, ...).
    type ClassInfo: ?Sized;
    /// The domain object being read.
    type Entity: ?Sized;

    /// Every mapped property of `entity`, in declaration order.
    ///
    /// Unset properties are reported with [`PropertyValue::Null`]; builders
    /// decide whether to keep them.
    fn property_values(
        &self,
        class_info: &Self::ClassInfo,
        entity: &Self::Entity,
    ) -> Vec<(String, PropertyValue)>;
}

/// Direction tag of a relationship as declared by the mapping layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Outgoing,
    Incoming,
    Undirected,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Outgoing => write!(f, "OUTGOING"),
            Direction::Incoming => write!(f, "INCOMING"),
            Direction::Undirected => write!(f, "UNDIRECTED"),
        }
    }
}

impl FromStr for Direction {
    type Err = CypherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OUTGOING" => Ok(Direction::Outgoing),
            "INCOMING" => Ok(Direction::Incoming),
            "UNDIRECTED" => Ok(Direction::Undirected),
            other => Err(CypherError::invalid_direction(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_round_trips_through_display() {
        for direction in [Direction::Outgoing, Direction::Incoming, Direction::Undirected] {
            assert_eq!(direction.to_string().parse::<Direction>(), Ok(direction));
        }
    }

    #[test]
    fn test_direction_parse_is_case_insensitive() {
        assert_eq!(" incoming ".parse::<Direction>(), Ok(Direction::Incoming));
        assert!("sideways".parse::<Direction>().is_err());
    }
}
