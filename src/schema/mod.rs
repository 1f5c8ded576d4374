//! Schema definition and registration.
//!
//! A [`Schema`] declares a record type's name and its field-name to type-tag
//! mapping. Registering a schema in a [`SchemaRegistry`] yields a
//! [`ModelFactory`] for constructing model instances bound to that schema.

mod definition;
mod registry;

pub use definition::Schema;
pub use registry::{ModelFactory, SchemaRegistry};
