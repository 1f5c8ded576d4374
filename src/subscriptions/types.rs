//! Subscription targets, keys and handles.

use crate::adapter::Query;
use crate::types::{ValueMap, DEFAULT_LIMIT};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;

/// What remote state to watch: a whole collection, a single document, or a
/// filtered query.
#[derive(Clone, Debug)]
pub struct ListenerTarget {
    pub collection: String,
    /// Document id. `Some("")` means the id is expected but not yet known
    /// (e.g. still loading): the manager skips subscribing rather than
    /// issuing a request the store would reject.
    pub id: Option<String>,
    pub query: Option<Query>,
    pub limit: Option<usize>,
}

impl ListenerTarget {
    /// Watch a whole collection.
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: None,
            query: None,
            limit: None,
        }
    }

    /// Watch a single document.
    pub fn document(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: Some(id.into()),
            query: None,
            limit: None,
        }
    }

    /// Watch a filtered query over a collection.
    pub fn query(collection: impl Into<String>, query: Query) -> Self {
        Self {
            collection: collection.into(),
            id: None,
            query: Some(query),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Effective result limit.
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }

    /// Deterministic key used to dedupe active subscriptions.
    ///
    /// `collection` alone, `collection/id` for a document, or
    /// `collection?clause&limit=N` for a query.
    pub fn key(&self) -> String {
        match (&self.id, &self.query) {
            (Some(id), _) => format!("{}/{id}", self.collection),
            (None, Some(query)) => {
                format!("{}?{query}&limit={}", self.collection, self.limit())
            }
            (None, None) => self.collection.clone(),
        }
    }
}

impl fmt::Display for ListenerTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// In-memory snapshot delivered to a listener callback.
#[derive(Clone, Debug, PartialEq)]
pub enum Snapshot {
    /// Collection/query targets: document id to value. Entries without an id
    /// are skipped.
    Collection(BTreeMap<String, ValueMap>),
    /// Single-document targets: the value, or `None` when absent.
    Document(Option<ValueMap>),
}

/// Cancels a live listener.
///
/// Idempotent one-shot: the underlying store subscription is released and no
/// further callback invocations happen, but invocations already in flight are
/// not retracted. Dropping the handle without calling [`unsubscribe`] leaves
/// the listener running.
///
/// [`unsubscribe`]: ListenerHandle::unsubscribe
pub struct ListenerHandle {
    cancel: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl ListenerHandle {
    pub(crate) fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Mutex::new(Some(Box::new(cancel))),
        }
    }

    /// Stop the subscription.
    pub fn unsubscribe(&self) {
        if let Some(cancel) = self.cancel.lock().take() {
            cancel();
        }
    }
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cancelled = self.cancel.lock().is_none();
        f.debug_struct("ListenerHandle")
            .field("cancelled", &cancelled)
            .finish()
    }
}
