//! # tideway-schema
//!
//! Declarative parameter schema and binder for channel sessions.
//!
//! A channel type declares the connection parameters it expects as an
//! ordered tree of typed fields. When an upgrade request arrives, the
//! binder validates and converts the raw request data (route segments,
//! query string, optionally a JSON body) into a typed, nullable-aware
//! [`BoundParams`] tree, once per session, before the session opens.
//!
//! ## Binding rules
//!
//! - Fields are validated in declaration order; the first failure wins.
//! - Scalars bind from route params, then query params, then body keys.
//!   Objects and arrays bind from the body only.
//! - Absent nullable fields bind to [`Value::Null`]; absent required
//!   fields fail with the full dotted path.
//! - A nullable ("nilable") nested object binds to null only when all of
//!   its immediate keys are absent; partial presence validates the whole
//!   subtree.
//!
//! ## Example
//!
//! ```rust
//! use tideway_schema::{FieldKind, RawSource, Schema};
//!
//! let schema = Schema::builder()
//!     .field("id", FieldKind::Integer)
//!     .nullable("name", FieldKind::String)
//!     .build();
//!
//! let raw = RawSource::new().with_query_param("id", "42");
//! let params = schema.bind(&raw).unwrap();
//! assert_eq!(params.get_i64("id"), Some(42));
//! assert!(params.get("name").unwrap().is_null());
//! ```

#![deny(unsafe_code)]

pub mod binder;
pub mod errors;
pub mod schema;
pub mod source;
pub mod value;

pub use errors::ValidationError;
pub use schema::{Field, FieldKind, Schema, SchemaBuilder};
pub use source::RawSource;
pub use value::{BoundParams, Value};
