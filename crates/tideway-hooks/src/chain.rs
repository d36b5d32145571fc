//! Composed hook chains.

use std::sync::Arc;

use crate::context::HookContext;
use crate::errors::HookError;
use crate::handler::{BaseHandler, ChannelHook, Next};

/// An ordered hook list composed around a base handler.
///
/// Composed once per session and reused for every inbound event of its
/// kind. Hooks registered earlier wrap hooks registered later, so for
/// hooks H1 then H2 the execution order is H1-pre, H2-pre, base, H2-post,
/// H1-post.
pub struct HookChain {
    hooks: Vec<Arc<dyn ChannelHook>>,
    base: BaseHandler,
}

impl HookChain {
    /// Compose a chain from hooks (in registration order) and a base
    /// handler.
    #[must_use]
    pub fn new(hooks: Vec<Arc<dyn ChannelHook>>, base: BaseHandler) -> Self {
        Self { hooks, base }
    }

    /// Dispatch one event through the chain.
    ///
    /// The base handler runs exactly once per call, unless a hook
    /// short-circuits or fails.
    pub async fn dispatch(&self, ctx: &HookContext) -> Result<(), HookError> {
        Next {
            hooks: &self.hooks,
            base: &self.base,
        }
        .run(ctx)
        .await
    }

    /// Number of hooks wrapped around the base handler.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Whether the chain is just the base handler.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl std::fmt::Debug for HookChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookChain")
            .field("hook_count", &self.hooks.len())
            .finish()
    }
}
