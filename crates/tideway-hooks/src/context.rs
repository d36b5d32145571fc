//! Per-event context handed to hooks.

use std::sync::Arc;

use tideway_core::{ChannelEvent, EventKind, RequestContext, SessionId};
use tideway_schema::BoundParams;

/// Everything a hook can inspect about the event it wraps.
///
/// One context is built per dispatched event. Every event kind shares the
/// same shape: the session identity, the parameters bound at upgrade
/// time, the originating request, and the triggering event payload.
#[derive(Debug, Clone)]
pub struct HookContext {
    /// The session the event belongs to.
    pub session_id: SessionId,
    /// The triggering lifecycle event.
    pub event: ChannelEvent,
    /// Parameters bound from the upgrade request.
    pub params: Arc<BoundParams>,
    /// The originating upgrade request.
    pub request: Arc<RequestContext>,
}

impl HookContext {
    /// Build a context for one event.
    #[must_use]
    pub fn new(
        session_id: SessionId,
        event: ChannelEvent,
        params: Arc<BoundParams>,
        request: Arc<RequestContext>,
    ) -> Self {
        Self {
            session_id,
            event,
            params,
            request,
        }
    }

    /// The kind of the triggering event.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.event.kind()
    }
}
