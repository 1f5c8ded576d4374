//! Remote document store adapter interface.
//!
//! The object layer treats the remote store as an external collaborator
//! behind the [`StoreAdapter`] trait: strongly-consistent point reads and
//! writes plus a change-event stream per watched target. Consistency is
//! assumed; availability is not, so every call can fail and the failure is
//! propagated unchanged. [`MemoryAdapter`] is the in-process reference
//! implementation used by tests and local tooling.

mod memory;

pub use memory::MemoryAdapter;

use crate::error::Result;
use crate::types::{Value, ValueMap};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Snapshot callback for collection/query subscriptions: the current batch of
/// (document id, document value) pairs, newest-first by `updated`.
pub type BatchCallback = Box<dyn Fn(&[(String, ValueMap)]) + Send + Sync>;

/// Snapshot callback for single-document subscriptions: the document's value,
/// or `None` when it does not exist.
pub type DocumentCallback = Box<dyn Fn(Option<&ValueMap>) + Send + Sync>;

/// A single filter clause: `field op value`.
///
/// This is deliberately not a query language; one clause plus a limit is the
/// whole filtering surface.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub field: String,
    pub op: QueryOp,
    pub value: Value,
}

impl Query {
    pub fn new(field: impl Into<String>, op: QueryOp, value: Value) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }

    /// Whether a document satisfies this clause.
    ///
    /// Ordered comparisons apply to text, numbers and timestamps; on any
    /// other kind (or a kind mismatch) the clause does not match.
    pub fn matches(&self, doc: &ValueMap) -> bool {
        let Some(actual) = doc.get(&self.field) else {
            return false;
        };
        match self.op {
            QueryOp::Eq => actual == &self.value,
            QueryOp::Ne => actual != &self.value,
            QueryOp::Lt | QueryOp::Le | QueryOp::Gt | QueryOp::Ge => {
                let Some(ord) = compare(actual, &self.value) else {
                    return false;
                };
                match self.op {
                    QueryOp::Lt => ord.is_lt(),
                    QueryOp::Le => ord.is_le(),
                    QueryOp::Gt => ord.is_gt(),
                    QueryOp::Ge => ord.is_ge(),
                    _ => unreachable!(),
                }
            }
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.field, self.op, self.value)
    }
}

fn compare(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Comparison operator for a [`Query`] clause.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for QueryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            QueryOp::Eq => "==",
            QueryOp::Ne => "!=",
            QueryOp::Lt => "<",
            QueryOp::Le => "<=",
            QueryOp::Gt => ">",
            QueryOp::Ge => ">=",
        };
        write!(f, "{op}")
    }
}

/// One-shot handle releasing an adapter-level subscription.
///
/// Cancelling is idempotent; callbacks already in flight are not retracted.
pub struct Unsubscribe {
    cancel: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Unsubscribe {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Mutex::new(Some(Box::new(cancel))),
        }
    }

    /// Release the underlying subscription.
    pub fn cancel(&self) {
        if let Some(cancel) = self.cancel.lock().take() {
            cancel();
        }
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cancelled = self.cancel.lock().is_none();
        f.debug_struct("Unsubscribe")
            .field("cancelled", &cancelled)
            .finish()
    }
}

/// Capabilities the object layer requires from the remote document store.
///
/// Point operations are strongly consistent; `subscribe`/`subscribe_document`
/// deliver change snapshots eventually, in whatever order the store emits
/// them. The layer above never retries: any failure propagates to the caller.
pub trait StoreAdapter: Send + Sync {
    /// Read a single document, `None` if absent.
    fn get(&self, collection: &str, id: &str) -> Result<Option<ValueMap>>;

    /// Read up to `limit` documents, optionally filtered, newest-first by
    /// the `updated` field.
    fn get_all(
        &self,
        collection: &str,
        query: Option<&Query>,
        limit: usize,
    ) -> Result<Vec<(String, ValueMap)>>;

    /// Write a full document.
    fn set(&self, collection: &str, id: &str, doc: &ValueMap) -> Result<()>;

    /// Merge `partial`'s keys into an existing document.
    fn update(&self, collection: &str, id: &str, partial: &ValueMap) -> Result<()>;

    /// Delete a document.
    fn delete(&self, collection: &str, id: &str) -> Result<()>;

    /// Watch a collection (optionally filtered); `on_change` receives the
    /// matching batch after every mutation.
    fn subscribe(
        &self,
        collection: &str,
        query: Option<&Query>,
        limit: usize,
        on_change: BatchCallback,
    ) -> Result<Unsubscribe>;

    /// Watch a single document; `on_change` receives its value (or `None`
    /// once deleted) after every mutation.
    fn subscribe_document(
        &self,
        collection: &str,
        id: &str,
        on_change: DocumentCallback,
    ) -> Result<Unsubscribe>;
}
