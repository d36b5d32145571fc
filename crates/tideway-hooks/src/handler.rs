//! Around-style hook trait and its continuation.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::context::HookContext;
use crate::errors::HookError;

/// The base event handler a chain wraps: the channel's own callback for
/// the event kind being dispatched.
pub type BaseHandler =
    Arc<dyn for<'a> Fn(&'a HookContext) -> BoxFuture<'a, Result<(), HookError>> + Send + Sync>;

/// A lifecycle hook wrapping one event kind.
///
/// Hooks run around the continuation they are handed: code before
/// `next.run(ctx).await` is the pre phase, code after it is the post
/// phase. Returning without calling `next` short-circuits the remaining
/// hooks and the base handler; returning an error does the same and
/// surfaces the failure to the driver.
#[async_trait]
pub trait ChannelHook: Send + Sync {
    /// Unique name, used in logs and error reports.
    fn name(&self) -> &str;

    /// Wrap the continuation.
    async fn call(&self, ctx: &HookContext, next: Next<'_>) -> Result<(), HookError>;
}

/// The rest of the chain after the current hook.
///
/// Consumed by value, so each hook can continue at most once and a
/// composed call invokes the base handler exactly once unless a hook
/// short-circuits.
pub struct Next<'a> {
    pub(crate) hooks: &'a [Arc<dyn ChannelHook>],
    pub(crate) base: &'a BaseHandler,
}

impl Next<'_> {
    /// Run the remaining hooks, then the base handler.
    pub async fn run(self, ctx: &HookContext) -> Result<(), HookError> {
        match self.hooks.split_first() {
            Some((head, rest)) => {
                head.call(
                    ctx,
                    Next {
                        hooks: rest,
                        base: self.base,
                    },
                )
                .await
            }
            None => (self.base)(ctx).await,
        }
    }

    /// Hooks still ahead of the base handler.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.hooks.len()
    }
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.hooks.len())
            .finish()
    }
}
