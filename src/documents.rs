//! Document-level store operations.

use crate::adapter::StoreAdapter;
use crate::error::Result;
use crate::session::Session;
use crate::types::{
    SaveOptions, Timestamp, Value, ValueMap, CREATED_FIELD, DEFAULT_LIMIT, OWNER_FIELD,
    UPDATED_FIELD,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Mediates every document read and write against the store adapter.
///
/// Adds the bookkeeping the wire format requires (`created` on first persist,
/// `updated` on every persist, `ownerId` on request), logs adapter failures
/// with collection/id context and re-raises them unchanged. No retries: retry
/// policy belongs to the adapter or the caller.
pub struct DocumentStore {
    adapter: Arc<dyn StoreAdapter>,
    session: Arc<Session>,
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore").finish_non_exhaustive()
    }
}

impl DocumentStore {
    pub fn new(adapter: Arc<dyn StoreAdapter>, session: Arc<Session>) -> Self {
        Self { adapter, session }
    }

    pub fn adapter(&self) -> &Arc<dyn StoreAdapter> {
        &self.adapter
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Read a single document, `None` if absent.
    pub fn get_document(&self, collection: &str, id: &str) -> Result<Option<ValueMap>> {
        self.adapter.get(collection, id).map_err(|e| {
            error!(collection, id, error = %e, "error getting document");
            e
        })
    }

    /// Read a collection as an id-to-document map.
    pub fn get_documents(&self, collection: &str) -> Result<BTreeMap<String, ValueMap>> {
        let batch = self
            .adapter
            .get_all(collection, None, DEFAULT_LIMIT)
            .map_err(|e| {
                error!(collection, error = %e, "error getting collection");
                e
            })?;
        Ok(batch.into_iter().collect())
    }

    /// Upsert a full document keyed by its `id` field.
    ///
    /// A document with a missing or empty `id` is silently skipped: the store
    /// is never touched, a warning is logged and `Ok(None)` is returned. On
    /// success the exact persisted map (with bookkeeping fields merged in)
    /// comes back as `Some`.
    pub fn save_document(
        &self,
        collection: &str,
        document: &ValueMap,
        options: SaveOptions,
    ) -> Result<Option<ValueMap>> {
        let id = match document.get("id").and_then(Value::as_text) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                warn!(collection, "tried to save document without id");
                return Ok(None);
            }
        };

        let mut persisted = document.clone();
        if options.set_owner {
            if let Some(profile) = self.session.current_profile() {
                persisted.insert(OWNER_FIELD.to_string(), Value::text(profile.id));
            }
        }

        let exists = self.get_document(collection, &id)?.is_some();
        let now = Value::Timestamp(Timestamp::now());
        persisted.insert(UPDATED_FIELD.to_string(), now.clone());

        if exists {
            debug!(collection, id = %id, "updating document");
            self.adapter.update(collection, &id, &persisted).map_err(|e| {
                error!(collection, id = %id, error = %e, "error updating document");
                e
            })?;
        } else {
            persisted.insert(CREATED_FIELD.to_string(), now);
            debug!(collection, id = %id, "creating document");
            self.adapter.set(collection, &id, &persisted).map_err(|e| {
                error!(collection, id = %id, error = %e, "error creating document");
                e
            })?;
        }
        Ok(Some(persisted))
    }

    /// Merge `partial`'s keys (plus a fresh `updated` stamp) into an existing
    /// document.
    pub fn update_document(
        &self,
        collection: &str,
        id: &str,
        partial: &ValueMap,
    ) -> Result<()> {
        let mut stamped = partial.clone();
        stamped.insert(
            UPDATED_FIELD.to_string(),
            Value::Timestamp(Timestamp::now()),
        );
        self.adapter.update(collection, id, &stamped).map_err(|e| {
            error!(collection, id, error = %e, "error updating document");
            e
        })
    }

    /// Delete a document.
    pub fn delete_document(&self, collection: &str, id: &str) -> Result<()> {
        self.adapter.delete(collection, id).map_err(|e| {
            error!(collection, id, error = %e, "error deleting document");
            e
        })
    }
}
