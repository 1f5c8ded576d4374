//! In-process store adapter with live change fan-out.

use super::{BatchCallback, DocumentCallback, Query, StoreAdapter, Unsubscribe};
use crate::error::{Result, StoreError};
use crate::types::{Timestamp, Value, ValueMap, UPDATED_FIELD};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// An in-memory [`StoreAdapter`].
///
/// Backs tests and local tooling with the same contract a network-backed
/// adapter provides: point reads/writes over per-collection maps, and
/// subscribers notified synchronously after every mutation with the same
/// snapshot shape a remote store would deliver.
#[derive(Clone)]
pub struct MemoryAdapter {
    inner: Arc<Inner>,
}

struct Inner {
    data: RwLock<HashMap<String, BTreeMap<String, ValueMap>>>,
    collection_subs: RwLock<HashMap<u64, Arc<CollectionSub>>>,
    document_subs: RwLock<HashMap<u64, Arc<DocumentSub>>>,
    next_sub_id: AtomicU64,
}

struct CollectionSub {
    collection: String,
    query: Option<Query>,
    limit: usize,
    callback: BatchCallback,
}

struct DocumentSub {
    collection: String,
    doc_id: String,
    callback: DocumentCallback,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                data: RwLock::new(HashMap::new()),
                collection_subs: RwLock::new(HashMap::new()),
                document_subs: RwLock::new(HashMap::new()),
                next_sub_id: AtomicU64::new(1),
            }),
        }
    }

    /// Number of live subscriptions (collection and document combined).
    pub fn subscription_count(&self) -> usize {
        self.inner.collection_subs.read().len() + self.inner.document_subs.read().len()
    }

    /// Notify every subscriber watching `collection` (and `id` for document
    /// subscribers). Snapshots are computed after the data lock is released
    /// so callbacks may re-enter the adapter.
    fn notify(&self, collection: &str, id: &str) {
        let batch_subs: Vec<Arc<CollectionSub>> = self
            .inner
            .collection_subs
            .read()
            .values()
            .filter(|s| s.collection == collection)
            .cloned()
            .collect();
        for sub in batch_subs {
            let batch = self.query_results(&sub.collection, sub.query.as_ref(), sub.limit);
            (sub.callback)(&batch);
        }

        let doc_subs: Vec<Arc<DocumentSub>> = self
            .inner
            .document_subs
            .read()
            .values()
            .filter(|s| s.collection == collection && s.doc_id == id)
            .cloned()
            .collect();
        for sub in doc_subs {
            let doc = self
                .inner
                .data
                .read()
                .get(collection)
                .and_then(|c| c.get(id))
                .cloned();
            (sub.callback)(doc.as_ref());
        }
    }

    /// Filtered, newest-first (by `updated`) slice of a collection.
    fn query_results(
        &self,
        collection: &str,
        query: Option<&Query>,
        limit: usize,
    ) -> Vec<(String, ValueMap)> {
        let data = self.inner.data.read();
        let Some(docs) = data.get(collection) else {
            return Vec::new();
        };
        let mut results: Vec<(String, ValueMap)> = docs
            .iter()
            .filter(|(_, doc)| query.map_or(true, |q| q.matches(doc)))
            .map(|(id, doc)| (id.clone(), doc.clone()))
            .collect();
        results.sort_by_key(|(_, doc)| {
            std::cmp::Reverse(match doc.get(UPDATED_FIELD) {
                Some(Value::Timestamp(Timestamp(micros))) => *micros,
                _ => i64::MIN,
            })
        });
        results.truncate(limit);
        results
    }
}

impl Default for MemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreAdapter for MemoryAdapter {
    fn get(&self, collection: &str, id: &str) -> Result<Option<ValueMap>> {
        Ok(self
            .inner
            .data
            .read()
            .get(collection)
            .and_then(|c| c.get(id))
            .cloned())
    }

    fn get_all(
        &self,
        collection: &str,
        query: Option<&Query>,
        limit: usize,
    ) -> Result<Vec<(String, ValueMap)>> {
        Ok(self.query_results(collection, query, limit))
    }

    fn set(&self, collection: &str, id: &str, doc: &ValueMap) -> Result<()> {
        self.inner
            .data
            .write()
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), doc.clone());
        self.notify(collection, id);
        Ok(())
    }

    fn update(&self, collection: &str, id: &str, partial: &ValueMap) -> Result<()> {
        {
            let mut data = self.inner.data.write();
            let doc = data
                .get_mut(collection)
                .and_then(|c| c.get_mut(id))
                .ok_or_else(|| {
                    StoreError::adapter(collection, Some(id), "document does not exist")
                })?;
            for (key, value) in partial {
                doc.insert(key.clone(), value.clone());
            }
        }
        self.notify(collection, id);
        Ok(())
    }

    fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let removed = self
            .inner
            .data
            .write()
            .get_mut(collection)
            .and_then(|c| c.remove(id));
        if removed.is_some() {
            self.notify(collection, id);
        }
        Ok(())
    }

    fn subscribe(
        &self,
        collection: &str,
        query: Option<&Query>,
        limit: usize,
        on_change: BatchCallback,
    ) -> Result<Unsubscribe> {
        let sub_id = self.inner.next_sub_id.fetch_add(1, Ordering::SeqCst);
        let sub = Arc::new(CollectionSub {
            collection: collection.to_string(),
            query: query.cloned(),
            limit,
            callback: on_change,
        });
        self.inner.collection_subs.write().insert(sub_id, sub);

        let inner = Arc::clone(&self.inner);
        Ok(Unsubscribe::new(move || {
            inner.collection_subs.write().remove(&sub_id);
        }))
    }

    fn subscribe_document(
        &self,
        collection: &str,
        id: &str,
        on_change: DocumentCallback,
    ) -> Result<Unsubscribe> {
        let sub_id = self.inner.next_sub_id.fetch_add(1, Ordering::SeqCst);
        let sub = Arc::new(DocumentSub {
            collection: collection.to_string(),
            doc_id: id.to_string(),
            callback: on_change,
        });
        self.inner.document_subs.write().insert(sub_id, sub);

        let inner = Arc::clone(&self.inner);
        Ok(Unsubscribe::new(move || {
            inner.document_subs.write().remove(&sub_id);
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::QueryOp;
    use parking_lot::Mutex;

    fn doc(pairs: &[(&str, Value)]) -> ValueMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_set_get_roundtrip() {
        let adapter = MemoryAdapter::new();
        let d = doc(&[("title", Value::text("Dune"))]);
        adapter.set("books", "b1", &d).unwrap();
        assert_eq!(adapter.get("books", "b1").unwrap(), Some(d));
        assert_eq!(adapter.get("books", "nope").unwrap(), None);
    }

    #[test]
    fn test_update_missing_document_fails() {
        let adapter = MemoryAdapter::new();
        let err = adapter
            .update("books", "b1", &doc(&[("title", Value::text("x"))]))
            .unwrap_err();
        assert!(matches!(err, StoreError::Adapter { .. }));
    }

    #[test]
    fn test_get_all_orders_newest_first_and_limits() {
        let adapter = MemoryAdapter::new();
        for (id, micros) in [("a", 10), ("b", 30), ("c", 20)] {
            adapter
                .set(
                    "books",
                    id,
                    &doc(&[(UPDATED_FIELD, Value::Timestamp(Timestamp(micros)))]),
                )
                .unwrap();
        }
        let all = adapter.get_all("books", None, 2).unwrap();
        let ids: Vec<&str> = all.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn test_query_filters_results() {
        let adapter = MemoryAdapter::new();
        adapter
            .set("books", "b1", &doc(&[("author", Value::text("Jo"))]))
            .unwrap();
        adapter
            .set("books", "b2", &doc(&[("author", Value::text("Bo"))]))
            .unwrap();

        let q = Query::new("author", QueryOp::Eq, Value::text("Jo"));
        let hits = adapter.get_all("books", Some(&q), 20).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, "b1");
    }

    #[test]
    fn test_subscribe_receives_mutations() {
        let adapter = MemoryAdapter::new();
        let seen: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let unsub = adapter
            .subscribe(
                "books",
                None,
                20,
                Box::new(move |batch| sink.lock().push(batch.len())),
            )
            .unwrap();

        adapter.set("books", "b1", &ValueMap::new()).unwrap();
        adapter.set("books", "b2", &ValueMap::new()).unwrap();
        assert_eq!(*seen.lock(), vec![1, 2]);

        unsub.cancel();
        adapter.set("books", "b3", &ValueMap::new()).unwrap();
        assert_eq!(*seen.lock(), vec![1, 2]);
        assert_eq!(adapter.subscription_count(), 0);
    }

    #[test]
    fn test_subscribe_document_sees_deletion() {
        let adapter = MemoryAdapter::new();
        let seen: Arc<Mutex<Vec<bool>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _unsub = adapter
            .subscribe_document(
                "books",
                "b1",
                Box::new(move |d| sink.lock().push(d.is_some())),
            )
            .unwrap();

        adapter.set("books", "b1", &ValueMap::new()).unwrap();
        adapter.delete("books", "b1").unwrap();
        assert_eq!(*seen.lock(), vec![true, false]);
    }
}
