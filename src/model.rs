//! Model instances: schema-bound records with a persistence lifecycle.

use crate::documents::DocumentStore;
use crate::error::{Result, StoreError};
use crate::schema::Schema;
use crate::types::{generate_id, SaveOptions, Value, ValueMap};
use std::sync::Arc;
use tracing::warn;

/// An in-memory record bound to a [`Schema`].
///
/// Field values are only restricted to the schema's *declared* fields;
/// their types are checked lazily at [`validate`]/[`save`], never at
/// construction or mutation, so an instance may hold a temporarily invalid
/// state while fields are being set.
///
/// [`validate`]: ModelInstance::validate
/// [`save`]: ModelInstance::save
#[derive(Debug)]
pub struct ModelInstance {
    schema: Arc<Schema>,
    documents: Arc<DocumentStore>,
    fields: ValueMap,
}

impl ModelInstance {
    /// Construct an instance from raw values.
    ///
    /// Fails fast with [`StoreError::UnknownField`] on any key the schema
    /// does not declare. A fresh id is minted when `initial` carries none.
    pub(crate) fn new(
        schema: Arc<Schema>,
        documents: Arc<DocumentStore>,
        initial: ValueMap,
    ) -> Result<Self> {
        for key in initial.keys() {
            if !schema.declares(key) {
                return Err(StoreError::UnknownField {
                    model: schema.name().to_string(),
                    field: key.clone(),
                });
            }
        }

        let mut fields = initial;
        if !fields.contains_key("id") {
            fields.insert("id".to_string(), Value::Text(generate_id(schema.name())));
        }

        Ok(Self {
            schema,
            documents,
            fields,
        })
    }

    /// The schema this instance is bound to.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The instance's id; empty when explicitly constructed without one.
    pub fn id(&self) -> &str {
        self.fields
            .get("id")
            .and_then(Value::as_text)
            .unwrap_or_default()
    }

    /// Current field values.
    pub fn fields(&self) -> &ValueMap {
        &self.fields
    }

    /// A single field value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Set a field value. The name must be declared; the type is unchecked
    /// until the next [`validate`]/[`save`].
    ///
    /// [`validate`]: ModelInstance::validate
    /// [`save`]: ModelInstance::save
    pub fn set(&mut self, name: impl Into<String>, value: Value) -> Result<()> {
        let name = name.into();
        if !self.schema.declares(&name) {
            return Err(StoreError::UnknownField {
                model: self.schema.name().to_string(),
                field: name,
            });
        }
        self.fields.insert(name, value);
        Ok(())
    }

    /// Check every field against its declared type tag.
    ///
    /// Idempotent and side-effect free; fails with a [`ValidationError`]
    /// enumerating every invalid field.
    ///
    /// [`ValidationError`]: crate::error::ValidationError
    pub fn validate(&self) -> Result<()> {
        self.schema.validate(&self.fields)
    }

    /// Validate, then upsert the full record through the document store.
    ///
    /// A validation failure aborts the save with the same error and no store
    /// mutation. An instance with an empty id logs a warning and returns
    /// `Ok(None)` without touching the store (deliberate silent skip). On
    /// success the exact persisted map is returned.
    pub fn save(&self, options: SaveOptions) -> Result<Option<ValueMap>> {
        self.validate()?;
        if self.id().is_empty() {
            warn!(
                model = self.schema.name(),
                "tried to save instance without id"
            );
            return Ok(None);
        }
        self.documents
            .save_document(self.schema.name(), &self.fields, options)
    }

    /// Merge `partial` into the in-memory fields, then issue a partial update
    /// against the store with exactly `partial`'s keys.
    ///
    /// Known inconsistency, kept deliberately: unlike [`save`], `update` does
    /// not re-validate the merged record.
    ///
    /// [`save`]: ModelInstance::save
    pub fn update(&mut self, partial: ValueMap) -> Result<()> {
        for key in partial.keys() {
            if !self.schema.declares(key) {
                return Err(StoreError::UnknownField {
                    model: self.schema.name().to_string(),
                    field: key.clone(),
                });
            }
        }
        for (key, value) in &partial {
            self.fields.insert(key.clone(), value.clone());
        }
        self.documents
            .update_document(self.schema.name(), self.id(), &partial)
    }

    /// Delete the backing document. The in-memory instance is untouched.
    pub fn delete(&self) -> Result<()> {
        self.documents
            .delete_document(self.schema.name(), self.id())
    }
}
