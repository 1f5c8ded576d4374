//! # Stratus
//!
//! A lightweight typed object layer with live subscriptions over a remote,
//! real-time document store.
//!
//! ## Core Concepts
//!
//! - **Schemas**: declared record shapes with strict field-level validation
//! - **Models**: schema-bound instances with save/update/delete lifecycles
//! - **Subscriptions**: deduplicated live listeners on collections,
//!   documents and filtered queries, delivering plain snapshots to callbacks
//! - **Session**: the single current profile, driven by auth transitions
//!
//! The remote store itself sits behind the [`StoreAdapter`] trait; the crate
//! ships an in-process [`MemoryAdapter`] for tests and local tooling.
//!
//! ## Example
//!
//! ```ignore
//! use stratus::{FieldType, ListenerTarget, MemoryAdapter, ObjectStore, SaveOptions, Schema, Value};
//!
//! let store = ObjectStore::new(Arc::new(MemoryAdapter::new()));
//!
//! let mut fields = BTreeMap::new();
//! fields.insert("title".to_string(), FieldType::Text);
//! fields.insert("pages".to_string(), FieldType::Number);
//! let books = store.register(Schema::new("books", fields))?;
//!
//! let dune = books.create(BTreeMap::from([
//!     ("title".to_string(), Value::text("Dune")),
//! ]))?;
//! dune.save(SaveOptions::default())?;
//!
//! let handle = store.add_listener(
//!     ListenerTarget::collection("books"),
//!     |snapshot| println!("books changed: {snapshot:?}"),
//! )?;
//! ```

pub mod adapter;
pub mod documents;
pub mod error;
pub mod fields;
pub mod model;
pub mod schema;
pub mod session;
pub mod store;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use adapter::{MemoryAdapter, Query, QueryOp, StoreAdapter, Unsubscribe};
pub use documents::DocumentStore;
pub use error::{FieldViolation, Result, StoreError, ValidationError, ViolationKind};
pub use fields::FieldType;
pub use model::ModelInstance;
pub use schema::{ModelFactory, Schema, SchemaRegistry};
pub use session::Session;
pub use store::ObjectStore;
pub use subscriptions::{ListenerHandle, ListenerTarget, Snapshot, SubscriptionManager};
pub use types::*;
