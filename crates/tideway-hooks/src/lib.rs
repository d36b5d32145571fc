//! # tideway-hooks
//!
//! Lifecycle hook composer for channel sessions.
//!
//! Cross-cutting behavior (authentication, logging, metrics) wraps channel
//! lifecycle events without the channel author touching dispatch code:
//! hooks are registered per [`EventKind`](tideway_core::EventKind) in a
//! [`HookRegistry`], then composed once per session into a [`HookChain`]
//! around the base event handler. The composed chain is fixed and reused
//! for every inbound event of that kind.
//!
//! Composition is around-style: a hook runs code before and after the
//! continuation it is handed, and hooks registered earlier wrap hooks
//! registered later. Not calling the continuation short-circuits the rest
//! of the chain, including the base handler. The mechanism is identical
//! for all six event kinds.

#![deny(unsafe_code)]

pub mod chain;
pub mod context;
pub mod errors;
pub mod handler;
pub mod registry;

pub use chain::HookChain;
pub use context::HookContext;
pub use errors::HookError;
pub use handler::{BaseHandler, ChannelHook, Next};
pub use registry::HookRegistry;
