//! Live subscriptions against the remote store.
//!
//! The manager opens store-level listeners for collections, single documents
//! and filtered queries, dedups them by a derived listener key, and converts
//! asynchronous change events into plain [`Snapshot`]s delivered to the
//! registered callback:
//!
//! ```ignore
//! let handle = manager.add_listener(
//!     ListenerTarget::collection("books"),
//!     |snapshot| println!("current books: {snapshot:?}"),
//! )?;
//!
//! // ... later, around component unmount:
//! if let Some(handle) = handle {
//!     handle.unsubscribe();
//! }
//! ```

mod manager;
mod types;

pub use manager::SubscriptionManager;
pub use types::{ListenerHandle, ListenerTarget, Snapshot};
