//! Field type registry: the closed set of declarable field types and their
//! validators.

use crate::types::{Value, ValueKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type tag a schema field can declare.
///
/// Validation is strict: each tag accepts exactly one runtime kind and no
/// coercion is performed. A numeric string fails `Number`, an epoch number
/// fails `Timestamp`, a 0/1 fails `Boolean`. Validation exists to catch
/// caller bugs, not to be permissive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// A string value.
    Text,
    /// A numeric value (not boolean, not a numeric-looking string).
    Number,
    /// True boolean only.
    Boolean,
    /// An ordered sequence; element homogeneity is not enforced.
    List,
    /// A structural record; not a sequence, not a timestamp.
    Map,
    /// A date/time value; neither a string nor an epoch number.
    Timestamp,
}

impl FieldType {
    /// Whether `value` satisfies this type tag.
    pub fn validates(&self, value: &Value) -> bool {
        self.expected_kind() == value.kind()
    }

    /// The single runtime kind this tag accepts.
    pub fn expected_kind(&self) -> ValueKind {
        match self {
            FieldType::Text => ValueKind::Text,
            FieldType::Number => ValueKind::Number,
            FieldType::Boolean => ValueKind::Bool,
            FieldType::List => ValueKind::List,
            FieldType::Map => ValueKind::Map,
            FieldType::Timestamp => ValueKind::Timestamp,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expected_kind())
    }
}
