//! Subscription manager: opens, keys, dedups and tears down live listeners.

use crate::adapter::{StoreAdapter, Unsubscribe};
use crate::error::Result;
use crate::session::Session;
use crate::types::{Profile, ValueMap, PROFILE_COLLECTION};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::types::{ListenerHandle, ListenerTarget, Snapshot};

/// Transform a store batch into an id-to-document snapshot, skipping entries
/// without an id.
fn collect_batch(batch: &[(String, ValueMap)]) -> BTreeMap<String, ValueMap> {
    batch
        .iter()
        .filter(|(id, _)| !id.is_empty())
        .map(|(id, doc)| (id.clone(), doc.clone()))
        .collect()
}

/// Manages live listeners against the remote store.
///
/// Collection and query listeners are cached by their [`ListenerTarget::key`]
/// so the same target never holds two store-level subscriptions. Incoming
/// change events are transformed into plain [`Snapshot`]s and pushed to the
/// registered callback until explicitly unsubscribed; delivery order is the
/// store's, never reordered or coalesced here.
pub struct SubscriptionManager {
    adapter: Arc<dyn StoreAdapter>,
    session: Arc<Session>,
    /// Unsubscribe handles for collection/query listeners, by listener key.
    /// Document listeners are not recorded: many independent subscribers may
    /// watch the same document.
    active: Arc<Mutex<HashMap<String, Unsubscribe>>>,
    /// The auth-driven profile listener, once started.
    profile_listener: Mutex<Option<ListenerHandle>>,
}

impl SubscriptionManager {
    pub fn new(adapter: Arc<dyn StoreAdapter>, session: Arc<Session>) -> Self {
        Self {
            adapter,
            session,
            active: Arc::new(Mutex::new(HashMap::new())),
            profile_listener: Mutex::new(None),
        }
    }

    /// Open a live listener on `target` and fan snapshots out to `callback`.
    ///
    /// The callback receives one eager snapshot of current state immediately,
    /// then one per store change event until the returned handle is
    /// unsubscribed.
    ///
    /// Returns `Ok(None)` without subscribing in two documented cases:
    /// - the target's id is expected but not yet known (empty), so the store
    ///   would reject the request;
    /// - a collection/query listener is already active under the same key.
    ///   The existing store-level subscription is reused and **the new
    ///   callback is dropped** - only the original subscriber keeps receiving
    ///   updates. Known limitation: there is no per-key fan-out list.
    ///
    /// Any failure while opening or performing the eager read unwinds the
    /// partial subscription, is logged with target context and re-raised.
    pub fn add_listener(
        &self,
        target: ListenerTarget,
        callback: impl Fn(Snapshot) + Send + Sync + 'static,
    ) -> Result<Option<ListenerHandle>> {
        debug!(listener = %target, "adding listener");

        match &target.id {
            // Id expected but not yet known: don't listen to the whole
            // collection by accident, and don't issue a request the store
            // would reject.
            Some(id) if id.is_empty() => {
                debug!(collection = %target.collection, "listener id not yet known, skipping");
                Ok(None)
            }
            Some(id) => self.listen_document(&target, id.clone(), callback),
            None => self.listen_collection(&target, callback),
        }
    }

    fn listen_document(
        &self,
        target: &ListenerTarget,
        id: String,
        callback: impl Fn(Snapshot) + Send + Sync + 'static,
    ) -> Result<Option<ListenerHandle>> {
        let callback = Arc::new(callback);
        let on_change = {
            let callback = Arc::clone(&callback);
            Box::new(move |doc: Option<&ValueMap>| {
                callback(Snapshot::Document(doc.cloned()));
            })
        };

        let unsubscribe = self
            .adapter
            .subscribe_document(&target.collection, &id, on_change)
            .map_err(|e| {
                error!(listener = %target, error = %e, "error opening document listener");
                e
            })?;

        // Eager read so the caller sees current state before the first
        // change event. A failure here must not leave the listener open.
        match self.adapter.get(&target.collection, &id) {
            Ok(doc) => callback(Snapshot::Document(doc)),
            Err(e) => {
                unsubscribe.cancel();
                error!(listener = %target, error = %e, "error reading initial document state");
                return Err(e);
            }
        }

        Ok(Some(ListenerHandle::new(move || unsubscribe.cancel())))
    }

    fn listen_collection(
        &self,
        target: &ListenerTarget,
        callback: impl Fn(Snapshot) + Send + Sync + 'static,
    ) -> Result<Option<ListenerHandle>> {
        let key = target.key();
        if self.active.lock().contains_key(&key) {
            debug!(
                key = %key,
                "already listening to collection, not adding another subscription"
            );
            return Ok(None);
        }

        let callback = Arc::new(callback);
        let on_change = {
            let callback = Arc::clone(&callback);
            Box::new(move |batch: &[(String, ValueMap)]| {
                callback(Snapshot::Collection(collect_batch(batch)));
            })
        };

        let unsubscribe = self
            .adapter
            .subscribe(
                &target.collection,
                target.query.as_ref(),
                target.limit(),
                on_change,
            )
            .map_err(|e| {
                error!(listener = %target, error = %e, "error opening collection listener");
                e
            })?;

        match self
            .adapter
            .get_all(&target.collection, target.query.as_ref(), target.limit())
        {
            Ok(batch) => callback(Snapshot::Collection(collect_batch(&batch))),
            Err(e) => {
                unsubscribe.cancel();
                error!(listener = %target, error = %e, "error reading initial collection state");
                return Err(e);
            }
        }

        self.active.lock().insert(key.clone(), unsubscribe);

        let active = Arc::clone(&self.active);
        Ok(Some(ListenerHandle::new(move || {
            if let Some(unsubscribe) = active.lock().remove(&key) {
                unsubscribe.cancel();
            }
        })))
    }

    /// Number of cached collection/query listeners.
    pub fn active_listener_count(&self) -> usize {
        self.active.lock().len()
    }

    /// React to an authentication-state transition.
    ///
    /// On sign-in, starts the single-document profile listener (once; a
    /// listener already active is kept, even for a different subject). Every
    /// resulting snapshot updates the [`Session`] and fans out to its
    /// profile-change callbacks. On sign-out the cached profile is cleared
    /// and callbacks receive `None`.
    pub fn on_auth_state_changed(&self, subject: Option<&str>) -> Result<()> {
        match subject {
            Some(uid) => {
                let mut listener = self.profile_listener.lock();
                if listener.is_some() {
                    return Ok(());
                }
                debug!(subject = uid, "starting profile listener");

                let session = Arc::clone(&self.session);
                let uid_owned = uid.to_string();
                let handle = self.add_listener(
                    ListenerTarget::document(PROFILE_COLLECTION, uid),
                    move |snapshot| {
                        if let Snapshot::Document(doc) = snapshot {
                            if doc.is_none() {
                                warn!(
                                    subject = %uid_owned,
                                    "no matching profile document for subject"
                                );
                            }
                            session.set_profile(
                                doc.map(|d| Profile::from_document(uid_owned.clone(), d)),
                            );
                        }
                    },
                )?;
                *listener = handle;
                Ok(())
            }
            None => {
                debug!("auth state changed: signed out");
                self.session.clear();
                Ok(())
            }
        }
    }

    /// Register a profile-change callback (see
    /// [`Session::on_profile_state_changed`]).
    pub fn on_profile_state_changed(
        &self,
        callback: impl Fn(Option<&Profile>) + Send + Sync + 'static,
    ) {
        self.session.on_profile_state_changed(callback);
    }

    /// Tear down every cached listener and the profile listener. Test
    /// isolation only.
    pub fn reset(&self) {
        for (_, unsubscribe) in self.active.lock().drain() {
            unsubscribe.cancel();
        }
        if let Some(handle) = self.profile_listener.lock().take() {
            handle.unsubscribe();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MemoryAdapter;
    use crate::types::Value;

    fn manager() -> (Arc<MemoryAdapter>, SubscriptionManager) {
        let adapter = Arc::new(MemoryAdapter::new());
        let session = Arc::new(Session::new());
        let manager = SubscriptionManager::new(adapter.clone(), session);
        (adapter, manager)
    }

    #[test]
    fn test_pending_id_skips_subscription() {
        let (adapter, manager) = manager();
        let handle = manager
            .add_listener(ListenerTarget::document("books", ""), |_| {})
            .unwrap();
        assert!(handle.is_none());
        assert_eq!(adapter.subscription_count(), 0);
    }

    #[test]
    fn test_collection_listener_is_deduplicated() {
        let (adapter, manager) = manager();
        let first = manager
            .add_listener(ListenerTarget::collection("books"), |_| {})
            .unwrap();
        assert!(first.is_some());
        assert_eq!(adapter.subscription_count(), 1);

        // Same key: reuses the existing store subscription, drops the new
        // callback.
        let second = manager
            .add_listener(ListenerTarget::collection("books"), |_| {})
            .unwrap();
        assert!(second.is_none());
        assert_eq!(adapter.subscription_count(), 1);
    }

    #[test]
    fn test_document_listeners_are_not_deduplicated() {
        let (adapter, manager) = manager();
        let a = manager
            .add_listener(ListenerTarget::document("books", "b1"), |_| {})
            .unwrap();
        let b = manager
            .add_listener(ListenerTarget::document("books", "b1"), |_| {})
            .unwrap();
        assert!(a.is_some() && b.is_some());
        assert_eq!(adapter.subscription_count(), 2);
    }

    #[test]
    fn test_unsubscribe_frees_the_key() {
        let (adapter, manager) = manager();
        let handle = manager
            .add_listener(ListenerTarget::collection("books"), |_| {})
            .unwrap()
            .unwrap();
        assert_eq!(manager.active_listener_count(), 1);

        handle.unsubscribe();
        assert_eq!(manager.active_listener_count(), 0);
        assert_eq!(adapter.subscription_count(), 0);

        // The key can be listened to again.
        let again = manager
            .add_listener(ListenerTarget::collection("books"), |_| {})
            .unwrap();
        assert!(again.is_some());
    }

    #[test]
    fn test_eager_snapshot_delivered_before_changes() {
        let (adapter, manager) = manager();
        let mut doc = ValueMap::new();
        doc.insert("title".into(), Value::text("Dune"));
        adapter.set("books", "b1", &doc).unwrap();

        let (tx, rx) = crossbeam_channel::unbounded();
        manager
            .add_listener(ListenerTarget::collection("books"), move |snap| {
                tx.send(snap).unwrap();
            })
            .unwrap();

        let first = rx.try_recv().unwrap();
        match first {
            Snapshot::Collection(docs) => assert!(docs.contains_key("b1")),
            other => panic!("expected collection snapshot, got {other:?}"),
        }
    }
}
