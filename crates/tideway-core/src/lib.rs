//! # tideway-core
//!
//! Foundation types for tideway channel sessions.
//!
//! This crate provides the shared vocabulary the other tideway crates
//! depend on:
//!
//! - **Branded IDs**: [`SessionId`](ids::SessionId) and
//!   [`RequestId`](ids::RequestId) newtypes for type safety
//! - **Lifecycle events**: [`ChannelEvent`](events::ChannelEvent) payloads
//!   and their [`EventKind`](events::EventKind) discriminant
//! - **Request context**: the immutable [`RequestContext`](request::RequestContext)
//!   captured from the upgrade request
//! - **Constants**: body-size and buffering defaults

#![deny(unsafe_code)]

pub mod constants;
pub mod events;
pub mod ids;
pub mod request;

pub use events::{ChannelEvent, EventKind};
pub use ids::{RequestId, SessionId};
pub use request::RequestContext;
