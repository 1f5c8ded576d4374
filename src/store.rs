//! Main object store tying all components together.

use crate::adapter::StoreAdapter;
use crate::documents::DocumentStore;
use crate::error::Result;
use crate::schema::{ModelFactory, Schema, SchemaRegistry};
use crate::session::Session;
use crate::subscriptions::{ListenerHandle, ListenerTarget, Snapshot, SubscriptionManager};
use crate::types::Profile;
use std::sync::Arc;

/// The object layer over one remote document store.
///
/// Wires the schema registry, document operations, session state and the
/// subscription manager around a single [`StoreAdapter`], and exposes the
/// whole public operation set from one place:
///
/// ```ignore
/// let store = ObjectStore::new(Arc::new(MemoryAdapter::new()));
///
/// let books = store.register(Schema::new("books", fields))?;
/// let mut dune = books.create(values)?;
/// dune.save(SaveOptions::default())?;
///
/// let handle = store.add_listener(
///     ListenerTarget::collection("books"),
///     |snapshot| render(snapshot),
/// )?;
/// ```
pub struct ObjectStore {
    documents: Arc<DocumentStore>,
    registry: SchemaRegistry,
    session: Arc<Session>,
    subscriptions: SubscriptionManager,
}

impl ObjectStore {
    /// Build the object layer over a store adapter.
    pub fn new(adapter: Arc<dyn StoreAdapter>) -> Self {
        let session = Arc::new(Session::new());
        let documents = Arc::new(DocumentStore::new(
            Arc::clone(&adapter),
            Arc::clone(&session),
        ));
        let registry = SchemaRegistry::new(Arc::clone(&documents));
        let subscriptions = SubscriptionManager::new(adapter, Arc::clone(&session));

        Self {
            documents,
            registry,
            session,
            subscriptions,
        }
    }

    /// Register a schema and get back its model factory.
    pub fn register(&self, schema: Schema) -> Result<ModelFactory> {
        self.registry.register(schema)
    }

    /// Look up a registered model factory by name.
    pub fn lookup(&self, name: &str) -> Result<ModelFactory> {
        self.registry.lookup(name)
    }

    /// Open a live listener (see [`SubscriptionManager::add_listener`]).
    pub fn add_listener(
        &self,
        target: ListenerTarget,
        callback: impl Fn(Snapshot) + Send + Sync + 'static,
    ) -> Result<Option<ListenerHandle>> {
        self.subscriptions.add_listener(target, callback)
    }

    /// Feed an authentication-state transition into the profile listener.
    pub fn on_auth_state_changed(&self, subject: Option<&str>) -> Result<()> {
        self.subscriptions.on_auth_state_changed(subject)
    }

    /// Register a profile-change callback.
    pub fn on_profile_state_changed(
        &self,
        callback: impl Fn(Option<&Profile>) + Send + Sync + 'static,
    ) {
        self.session.on_profile_state_changed(callback);
    }

    /// The currently authenticated subject's profile, if any.
    pub fn current_profile(&self) -> Option<Profile> {
        self.session.current_profile()
    }

    /// Document-level operations.
    pub fn documents(&self) -> &Arc<DocumentStore> {
        &self.documents
    }

    /// The schema registry.
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Session state.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// The subscription manager.
    pub fn subscriptions(&self) -> &SubscriptionManager {
        &self.subscriptions
    }

    /// Clear registrations, listeners and session state. Test isolation only.
    pub fn reset(&self) {
        self.registry.reset();
        self.subscriptions.reset();
        self.session.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MemoryAdapter;
    use crate::fields::FieldType;
    use crate::types::{SaveOptions, Value, ValueMap};
    use std::collections::BTreeMap;

    fn store() -> ObjectStore {
        ObjectStore::new(Arc::new(MemoryAdapter::new()))
    }

    #[test]
    fn test_register_and_save_through_facade() {
        let store = store();
        let mut fields = BTreeMap::new();
        fields.insert("title".to_string(), FieldType::Text);
        let books = store.register(Schema::new("books", fields)).unwrap();

        let mut values = ValueMap::new();
        values.insert("id".into(), Value::text("b1"));
        values.insert("title".into(), Value::text("Dune"));
        let m = books.create(values).unwrap();
        m.save(SaveOptions::default()).unwrap();

        let stored = store.documents().get_document("books", "b1").unwrap();
        assert!(stored.is_some());
    }

    #[test]
    fn test_reset_isolates() {
        let store = store();
        store
            .register(Schema::new("books", BTreeMap::new()))
            .unwrap();
        store
            .add_listener(ListenerTarget::collection("books"), |_| {})
            .unwrap();
        store.reset();

        assert!(store.registry().is_empty());
        assert_eq!(store.subscriptions().active_listener_count(), 0);
        // Same names are usable again after the reset.
        store
            .register(Schema::new("books", BTreeMap::new()))
            .unwrap();
    }
}
