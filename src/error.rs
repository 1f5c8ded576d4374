//! Error types for the object layer.

use crate::fields::FieldType;
use crate::types::ValueKind;
use std::fmt;
use thiserror::Error;

/// Main error type for schema, model and store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Unknown field `{field}` for model `{model}`")]
    UnknownField { model: String, field: String },

    #[error("{0}")]
    Validation(ValidationError),

    #[error("Schema already registered: {0}")]
    DuplicateSchema(String),

    #[error("Schema not registered: {0}")]
    UnknownSchema(String),

    #[error("Store adapter error on {collection}{}: {message}", id_suffix(.id))]
    Adapter {
        collection: String,
        id: Option<String>,
        message: String,
    },
}

fn id_suffix(id: &Option<String>) -> String {
    match id {
        Some(id) => format!("/{id}"),
        None => String::new(),
    }
}

impl StoreError {
    /// Wrap an adapter failure with collection/id context.
    pub fn adapter(
        collection: impl Into<String>,
        id: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        StoreError::Adapter {
            collection: collection.into(),
            id: id.map(String::from),
            message: message.into(),
        }
    }
}

/// One or more fields failed validation against their schema.
///
/// Carries every offending field, not just the first.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub schema: String,
    pub violations: Vec<FieldViolation>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Validation failed for `{}` ({} field{}): ",
            self.schema,
            self.violations.len(),
            if self.violations.len() == 1 { "" } else { "s" }
        )?;
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

/// A single offending field within a [`ValidationError`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldViolation {
    pub field: String,
    pub kind: ViolationKind,
}

/// Why a field failed validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ViolationKind {
    /// The value map contains a field the schema does not declare.
    UndeclaredField,
    /// A declared field holds a value of the wrong kind.
    WrongType {
        expected: FieldType,
        received: ValueKind,
    },
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ViolationKind::UndeclaredField => {
                write!(f, "`{}` is not declared by the schema", self.field)
            }
            ViolationKind::WrongType { expected, received } => {
                write!(
                    f,
                    "`{}` expected {expected}, received {received}",
                    self.field
                )
            }
        }
    }
}

/// Result type for object layer operations.
pub type Result<T> = std::result::Result<T, StoreError>;
