//! Process-wide schema registry.

use crate::documents::DocumentStore;
use crate::error::{Result, StoreError};
use crate::model::ModelInstance;
use crate::schema::Schema;
use crate::types::ValueMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps model-type names to their factories.
///
/// An explicit object rather than module-level state, so test suites can
/// isolate by constructing their own registry or calling [`reset`].
///
/// [`reset`]: SchemaRegistry::reset
pub struct SchemaRegistry {
    documents: Arc<DocumentStore>,
    factories: Mutex<HashMap<String, ModelFactory>>,
}

impl SchemaRegistry {
    /// Create a registry whose factories persist through `documents`.
    pub fn new(documents: Arc<DocumentStore>) -> Self {
        Self {
            documents,
            factories: Mutex::new(HashMap::new()),
        }
    }

    /// Register a schema under its name and return the bound factory.
    ///
    /// Re-registration under the same name is a programming error, not a
    /// runtime-recoverable one; it fails with [`StoreError::DuplicateSchema`]
    /// and leaves the first registration untouched.
    pub fn register(&self, schema: Schema) -> Result<ModelFactory> {
        let mut factories = self.factories.lock();
        if factories.contains_key(schema.name()) {
            return Err(StoreError::DuplicateSchema(schema.name().to_string()));
        }
        let factory = ModelFactory {
            schema: Arc::new(schema),
            documents: Arc::clone(&self.documents),
        };
        factories.insert(factory.schema.name().to_string(), factory.clone());
        Ok(factory)
    }

    /// Look up a registered factory by model-type name.
    pub fn lookup(&self, name: &str) -> Result<ModelFactory> {
        self.factories
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::UnknownSchema(name.to_string()))
    }

    /// Number of registered schemas.
    pub fn len(&self) -> usize {
        self.factories.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.lock().is_empty()
    }

    /// Drop every registration. Test isolation only.
    pub fn reset(&self) {
        self.factories.lock().clear();
    }
}

/// Constructs [`ModelInstance`]s for one registered schema.
///
/// Cheaply clonable; all clones share the same schema and document store.
#[derive(Clone, Debug)]
pub struct ModelFactory {
    schema: Arc<Schema>,
    documents: Arc<DocumentStore>,
}

impl ModelFactory {
    /// Construct a model instance from raw values.
    ///
    /// Fails fast with [`StoreError::UnknownField`] if any key is not
    /// declared by the schema. Values are not type-checked here; that happens
    /// at `validate()`/`save()`.
    pub fn create(&self, values: ValueMap) -> Result<ModelInstance> {
        ModelInstance::new(
            Arc::clone(&self.schema),
            Arc::clone(&self.documents),
            values,
        )
    }

    /// The schema this factory is bound to.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}
