//! Per-event hook registration.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use tideway_core::EventKind;

use crate::chain::HookChain;
use crate::handler::{BaseHandler, ChannelHook};

/// Registry of hooks keyed by lifecycle event kind.
///
/// Registration order is composition order: hooks registered earlier wrap
/// hooks registered later. The registry is filled at channel definition
/// time and read when a session composes its chains.
#[derive(Default)]
pub struct HookRegistry {
    hooks: HashMap<EventKind, Vec<Arc<dyn ChannelHook>>>,
}

impl HookRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            hooks: HashMap::new(),
        }
    }

    /// Register a hook for one event kind, after any already registered.
    pub fn register(&mut self, kind: EventKind, hook: Arc<dyn ChannelHook>) {
        debug!(name = hook.name(), event = %kind, "registering hook");
        self.hooks.entry(kind).or_default().push(hook);
    }

    /// Register the same hook for every event kind.
    pub fn register_all(&mut self, hook: Arc<dyn ChannelHook>) {
        for kind in EventKind::all() {
            self.register(*kind, hook.clone());
        }
    }

    /// Hooks registered for `kind`, in registration order.
    #[must_use]
    pub fn hooks_for(&self, kind: EventKind) -> &[Arc<dyn ChannelHook>] {
        self.hooks.get(&kind).map_or(&[], Vec::as_slice)
    }

    /// Total registered hooks across all kinds.
    #[must_use]
    pub fn count(&self) -> usize {
        self.hooks.values().map(Vec::len).sum()
    }

    /// Remove all registrations.
    pub fn clear(&mut self) {
        self.hooks.clear();
    }

    /// Compose the chain for `kind` around a base handler.
    ///
    /// The returned chain is fixed: later registrations do not affect it.
    #[must_use]
    pub fn compose(&self, kind: EventKind, base: BaseHandler) -> HookChain {
        HookChain::new(self.hooks_for(kind).to_vec(), base)
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("hook_count", &self.count())
            .finish()
    }
}
