//! Core value types for the object layer.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Well-known collection holding the profile of each authenticated subject.
pub const PROFILE_COLLECTION: &str = "profiles";

/// Default result/subscription limit for collection reads.
pub const DEFAULT_LIMIT: usize = 20;

/// Bookkeeping field set on first persist.
pub const CREATED_FIELD: &str = "created";

/// Bookkeeping field set on every persist.
pub const UPDATED_FIELD: &str = "updated";

/// Bookkeeping field naming the profile that saved a document.
pub const OWNER_FIELD: &str = "ownerId";

/// Microseconds since Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current time.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp(duration.as_micros() as i64)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// A document field value.
///
/// A closed union of the six runtime kinds the field validators recognize.
/// No coercion happens anywhere in the crate: a numeric string is `Text`,
/// an epoch number is `Number`, never `Timestamp`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Text(String),
    Number(f64),
    Bool(bool),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Timestamp(Timestamp),
}

impl Value {
    /// The runtime kind of this value, for diagnostics and validation.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Text(_) => ValueKind::Text,
            Value::Number(_) => ValueKind::Number,
            Value::Bool(_) => ValueKind::Bool,
            Value::List(_) => ValueKind::List,
            Value::Map(_) => ValueKind::Map,
            Value::Timestamp(_) => ValueKind::Timestamp,
        }
    }

    /// Borrow the text content, if this is a `Text` value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the boolean content, if this is a `Bool` value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Timestamp(t) => write!(f, "{}", t.0),
            // Structured values only show up in logs and listener keys.
            other => {
                let json = serde_json::to_string(other).unwrap_or_else(|_| "?".to_string());
                write!(f, "{json}")
            }
        }
    }
}

/// Runtime kind of a [`Value`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Text,
    Number,
    Bool,
    List,
    Map,
    Timestamp,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Text => "text",
            ValueKind::Number => "number",
            ValueKind::Bool => "boolean",
            ValueKind::List => "list",
            ValueKind::Map => "map",
            ValueKind::Timestamp => "timestamp",
        };
        write!(f, "{name}")
    }
}

/// A document: field name to value.
pub type ValueMap = BTreeMap<String, Value>;

/// Options for persisting a document.
#[derive(Clone, Copy, Debug, Default)]
pub struct SaveOptions {
    /// Stamp the document with the current profile's id under `ownerId`.
    pub set_owner: bool,
}

/// The currently authenticated subject's profile document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Authentication subject id.
    pub id: String,
    /// Whether the subject carries the admin flag.
    pub admin: bool,
    /// Remaining profile fields as stored.
    pub data: ValueMap,
}

impl Profile {
    /// Build a profile from its stored document.
    pub fn from_document(id: impl Into<String>, data: ValueMap) -> Self {
        let admin = data
            .get("admin")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        Self {
            id: id.into(),
            admin,
            data,
        }
    }
}

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Mint a fresh document id.
///
/// Hashes the schema name, the current time and a process-wide counter, so
/// ids are unique within a process and collision-resistant across processes.
pub fn generate_id(scope: &str) -> String {
    let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut hasher = Sha256::new();
    hasher.update(scope.as_bytes());
    hasher.update(Timestamp::now().0.to_le_bytes());
    hasher.update(counter.to_le_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..10])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_kinds() {
        assert_eq!(Value::text("a").kind(), ValueKind::Text);
        assert_eq!(Value::Number(1.0).kind(), ValueKind::Number);
        assert_eq!(Value::Bool(true).kind(), ValueKind::Bool);
        assert_eq!(Value::List(vec![]).kind(), ValueKind::List);
        assert_eq!(Value::Map(BTreeMap::new()).kind(), ValueKind::Map);
        assert_eq!(
            Value::Timestamp(Timestamp::now()).kind(),
            ValueKind::Timestamp
        );
    }

    #[test]
    fn test_generate_id_unique() {
        let a = generate_id("books");
        let b = generate_id("books");
        assert_ne!(a, b);
        assert_eq!(a.len(), 20);
    }

    #[test]
    fn test_profile_from_document() {
        let mut data = ValueMap::new();
        data.insert("admin".into(), Value::Bool(true));
        data.insert("email".into(), Value::text("jo@example.com"));
        let profile = Profile::from_document("u1", data);
        assert!(profile.admin);
        assert_eq!(profile.id, "u1");
    }

    #[test]
    fn test_profile_admin_requires_bool() {
        let mut data = ValueMap::new();
        data.insert("admin".into(), Value::text("true"));
        let profile = Profile::from_document("u1", data);
        assert!(!profile.admin);
    }
}
