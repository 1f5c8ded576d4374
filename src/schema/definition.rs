//! Immutable schema definitions.

use crate::error::{FieldViolation, Result, StoreError, ValidationError, ViolationKind};
use crate::fields::FieldType;
use crate::types::ValueMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The declared shape of a record type.
///
/// Flat field model: every field has exactly one type tag, no nested schema
/// references. `id` is implicit in every schema and typed as text. Created
/// once per model type and never mutated afterwards; name collisions are
/// checked at registration, not here.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Schema {
    name: String,
    fields: BTreeMap<String, FieldType>,
}

impl Schema {
    /// Define a schema. Does not register it anywhere.
    pub fn new(name: impl Into<String>, fields: BTreeMap<String, FieldType>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Schema name; also the store collection name by default.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared fields (excluding the implicit `id`).
    pub fn fields(&self) -> &BTreeMap<String, FieldType> {
        &self.fields
    }

    /// The type tag for a field, accounting for the implicit `id`.
    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        if name == "id" {
            return Some(FieldType::Text);
        }
        self.fields.get(name).copied()
    }

    /// Whether the schema declares `name` (including the implicit `id`).
    pub fn declares(&self, name: &str) -> bool {
        name == "id" || self.fields.contains_key(name)
    }

    /// Check a candidate value map against the declared shape.
    ///
    /// Reports every offending field, not just the first: undeclared keys and
    /// declared fields whose value fails its type tag. Declared fields absent
    /// from the map are not reported.
    pub fn validate(&self, values: &ValueMap) -> Result<()> {
        let mut violations = Vec::new();

        for (name, value) in values {
            match self.field_type(name) {
                None => violations.push(FieldViolation {
                    field: name.clone(),
                    kind: ViolationKind::UndeclaredField,
                }),
                Some(tag) if !tag.validates(value) => violations.push(FieldViolation {
                    field: name.clone(),
                    kind: ViolationKind::WrongType {
                        expected: tag,
                        received: value.kind(),
                    },
                }),
                Some(_) => {}
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(StoreError::Validation(ValidationError {
                schema: self.name.clone(),
                violations,
            }))
        }
    }
}
