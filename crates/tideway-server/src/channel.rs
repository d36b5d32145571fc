//! Channel type declaration.

use async_trait::async_trait;
use bytes::Bytes;

use tideway_core::constants::DEFAULT_MAX_BODY_SIZE;
use tideway_hooks::{HookError, HookRegistry};
use tideway_schema::Schema;

use crate::session::SessionHandle;

/// Per-channel-type tunables.
///
/// Captured once into the endpoint at route-registration time and shared
/// by every session of the type; never mutated per-instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Cap on bytes read from the upgrade request body during binding.
    /// Bodies past the cap are truncated, not rejected.
    pub max_body_size: usize,
    /// Keep the raw body bytes on the session after binding. Off by
    /// default: the body is consumed during parameter extraction.
    pub preserve_body: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            preserve_body: false,
        }
    }
}

/// A channel type: lifecycle callbacks plus declarative configuration.
///
/// One instance serves every session of the type, so implementations hold
/// only shared state; per-session data lives on the [`SessionHandle`] and
/// in the bound parameters.
///
/// All callbacks have defaults, so a channel overrides only what it
/// needs. Callbacks for one session never run concurrently with each
/// other: the driver dispatches events strictly in arrival order.
#[async_trait]
pub trait Channel: Send + Sync + 'static {
    /// Parameter schema bound once per session, before
    /// [`on_open`](Self::on_open).
    ///
    /// Read once at route registration. Channels without parameters
    /// return `None` and their sessions carry an empty set.
    fn schema(&self) -> Option<Schema> {
        None
    }

    /// Tunables for sessions of this type. Read once at route
    /// registration.
    fn config(&self) -> ChannelConfig {
        ChannelConfig::default()
    }

    /// Register lifecycle hooks.
    ///
    /// Called when a session composes its chains; registration order is
    /// composition order (earlier hooks wrap later ones).
    fn hooks(&self, _registry: &mut HookRegistry) {}

    /// The session opened: parameters are bound and the connection is
    /// established. First event of every session.
    async fn on_open(&self, _session: &SessionHandle) -> Result<(), HookError> {
        Ok(())
    }

    /// Inbound text message.
    async fn on_message(&self, _session: &SessionHandle, _text: &str) -> Result<(), HookError> {
        Ok(())
    }

    /// Inbound binary message.
    async fn on_binary(&self, _session: &SessionHandle, _data: &Bytes) -> Result<(), HookError> {
        Ok(())
    }

    /// Heartbeat ping received. The default replies with a pong frame;
    /// overriding suppresses that reply.
    async fn on_ping(&self, session: &SessionHandle) -> Result<(), HookError> {
        let _ = session.pong();
        Ok(())
    }

    /// Heartbeat pong received.
    async fn on_pong(&self, _session: &SessionHandle) -> Result<(), HookError> {
        Ok(())
    }

    /// The session closed. Runs exactly once, last event of every
    /// session that opened.
    async fn on_close(&self, _session: &SessionHandle) -> Result<(), HookError> {
        Ok(())
    }
}
