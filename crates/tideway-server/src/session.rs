//! Channel session lifecycle state machine.
//!
//! A session is created `Pending`, opens once its parameters are bound
//! and the composed `on_open` chain completes, and closes exactly once.
//! It never transitions back to `Open` after `Closed`; reconnection is a
//! fresh session.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, AtomicUsize, Ordering};

use bytes::Bytes;
use tracing::debug;

use tideway_core::{ChannelEvent, EventKind, RequestContext, SessionId};
use tideway_hooks::{BaseHandler, HookChain, HookContext, HookError, HookRegistry};
use tideway_schema::BoundParams;

use crate::channel::Channel;
use crate::transport::{Frame, Transport};

const PENDING: u8 = 0;
const OPEN: u8 = 1;
const CLOSED: u8 = 2;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Constructed, `on_open` chain not yet completed.
    Pending,
    /// Receiving events.
    Open,
    /// Terminal.
    Closed,
}

impl LifecycleState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            OPEN => Self::Open,
            CLOSED => Self::Closed,
            _ => Self::Pending,
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Open => write!(f, "open"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// The per-session surface handed to callbacks and hooks.
///
/// All fields are set once at construction and never reassigned; the
/// transport handle is borrowed from the socket tasks that own it.
pub struct SessionHandle {
    id: SessionId,
    transport: Arc<dyn Transport>,
    request: Arc<RequestContext>,
    params: Arc<BoundParams>,
    raw_body: Option<Bytes>,
    state: AtomicU8,
}

impl SessionHandle {
    fn new(
        id: SessionId,
        transport: Arc<dyn Transport>,
        request: Arc<RequestContext>,
        params: Arc<BoundParams>,
        raw_body: Option<Bytes>,
    ) -> Self {
        Self {
            id,
            transport,
            request,
            params,
            raw_body,
            state: AtomicU8::new(PENDING),
        }
    }

    /// Session identifier.
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// The originating upgrade request.
    #[must_use]
    pub fn request(&self) -> &RequestContext {
        &self.request
    }

    /// Parameters bound from the upgrade request.
    #[must_use]
    pub fn params(&self) -> &BoundParams {
        &self.params
    }

    /// Raw request body, kept only when the channel sets
    /// [`preserve_body`](crate::channel::ChannelConfig::preserve_body).
    #[must_use]
    pub fn raw_body(&self) -> Option<&Bytes> {
        self.raw_body.as_ref()
    }

    /// Send a text frame. Returns `false` if the frame was dropped.
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.transport.send(Frame::Text(text.into()))
    }

    /// Send a binary frame.
    pub fn send_binary(&self, data: impl Into<Bytes>) -> bool {
        self.transport.send(Frame::Binary(data.into()))
    }

    /// Serialize a JSON value and send it as a text frame.
    pub fn send_json(&self, value: &serde_json::Value) -> bool {
        match serde_json::to_string(value) {
            Ok(json) => self.send_text(json),
            Err(_) => false,
        }
    }

    /// Send a pong acknowledgment frame.
    pub fn pong(&self) -> bool {
        self.transport.send(Frame::Pong(Bytes::new()))
    }

    /// Ask the transport to close.
    ///
    /// The only way application code ends a session: the socket teardown
    /// then drives the `Open → Closed` transition.
    pub fn close(&self) -> bool {
        self.transport.send(Frame::Close)
    }

    fn transition(&self, from: u8, to: u8) -> bool {
        self.state
            .compare_exchange(from, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

/// One session per upgraded connection.
///
/// Owns the bound parameters, the lifecycle state, and the six hook
/// chains composed at construction. The driver delivers events strictly
/// sequentially; the session assumes single-writer-at-a-time semantics.
pub struct ChannelSession {
    handle: Arc<SessionHandle>,
    chains: HashMap<EventKind, HookChain>,
}

impl ChannelSession {
    /// Construct a session from a channel type, a transport handle, and
    /// the already-bound request data.
    #[must_use]
    pub fn new(
        channel: Arc<dyn Channel>,
        transport: Arc<dyn Transport>,
        request: RequestContext,
        params: BoundParams,
    ) -> Self {
        Self::with_id(SessionId::new(), channel, transport, request, params, None)
    }

    pub(crate) fn with_id(
        id: SessionId,
        channel: Arc<dyn Channel>,
        transport: Arc<dyn Transport>,
        request: RequestContext,
        params: BoundParams,
        raw_body: Option<Bytes>,
    ) -> Self {
        let handle = Arc::new(SessionHandle::new(
            id,
            transport,
            Arc::new(request),
            Arc::new(params),
            raw_body,
        ));

        // Chains are composed here, once, and reused for every event of
        // their kind.
        let mut registry = HookRegistry::new();
        channel.hooks(&mut registry);
        let base = base_handler(channel, handle.clone());
        let chains = EventKind::all()
            .iter()
            .map(|kind| (*kind, registry.compose(*kind, base.clone())))
            .collect();

        Self { handle, chains }
    }

    /// The shared per-session surface.
    #[must_use]
    pub fn handle(&self) -> &Arc<SessionHandle> {
        &self.handle
    }

    /// Session identifier.
    #[must_use]
    pub fn id(&self) -> &SessionId {
        self.handle.id()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.handle.state()
    }

    /// `Pending → Open`: run the composed `on_open` chain.
    ///
    /// The session opens only if the chain completes; on failure it stays
    /// `Pending` and the driver tears the socket down without `on_close`.
    pub async fn open(&self) -> Result<(), HookError> {
        if self.handle.state() != LifecycleState::Pending {
            return Err(HookError::Internal(format!(
                "session {} cannot open from state {}",
                self.handle.id(),
                self.handle.state()
            )));
        }
        self.run_chain(ChannelEvent::Open).await?;
        let _ = self.handle.transition(PENDING, OPEN);
        Ok(())
    }

    /// Dispatch an inbound event through its composed chain.
    ///
    /// Only meaningful while `Open`; events arriving in any other state
    /// are dropped. A chain failure leaves the state unchanged.
    pub async fn dispatch(&self, event: ChannelEvent) -> Result<(), HookError> {
        if self.handle.state() != LifecycleState::Open {
            debug!(
                session_id = %self.handle.id(),
                state = %self.handle.state(),
                event = %event.kind(),
                "dropping event for non-open session"
            );
            return Ok(());
        }
        self.run_chain(event).await
    }

    /// `Open → Closed`, exactly once.
    ///
    /// The first close signal runs the composed `on_close` chain; any
    /// later signal is a no-op. A session torn down before it opened
    /// closes without running the chain.
    pub async fn close(&self) -> Result<(), HookError> {
        if self.handle.transition(OPEN, CLOSED) {
            return self.run_chain(ChannelEvent::Close).await;
        }
        let _ = self.handle.transition(PENDING, CLOSED);
        Ok(())
    }

    async fn run_chain(&self, event: ChannelEvent) -> Result<(), HookError> {
        let kind = event.kind();
        let ctx = HookContext::new(
            self.handle.id.clone(),
            event,
            self.handle.params.clone(),
            self.handle.request.clone(),
        );
        match self.chains.get(&kind) {
            Some(chain) => chain.dispatch(&ctx).await,
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for ChannelSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelSession")
            .field("id", &self.handle.id)
            .field("state", &self.handle.state())
            .finish()
    }
}

/// Base handler dispatching each event kind to its channel callback.
fn base_handler(channel: Arc<dyn Channel>, handle: Arc<SessionHandle>) -> BaseHandler {
    Arc::new(move |ctx: &HookContext| {
        let channel = channel.clone();
        let handle = handle.clone();
        let event = ctx.event.clone();
        Box::pin(async move {
            match event {
                ChannelEvent::Open => channel.on_open(&handle).await,
                ChannelEvent::Message(text) => channel.on_message(&handle, &text).await,
                ChannelEvent::Binary(data) => channel.on_binary(&handle, &data).await,
                ChannelEvent::Ping => channel.on_ping(&handle).await,
                ChannelEvent::Pong => channel.on_pong(&handle).await,
                ChannelEvent::Close => channel.on_close(&handle).await,
            }
        })
    })
}

/// Live session counters shared between the driver and the health
/// endpoint.
#[derive(Debug, Default)]
pub struct SessionCounters {
    active: AtomicUsize,
    opened: AtomicU64,
    closed: AtomicU64,
}

impl SessionCounters {
    /// Fresh counters, all zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn session_opened(&self) {
        let _ = self.active.fetch_add(1, Ordering::Relaxed);
        let _ = self.opened.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn session_closed(&self) {
        let _ = self.active.fetch_sub(1, Ordering::Relaxed);
        let _ = self.closed.fetch_add(1, Ordering::Relaxed);
    }

    /// Currently open sessions.
    #[must_use]
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Sessions opened since start.
    #[must_use]
    pub fn opened(&self) -> u64 {
        self.opened.load(Ordering::Relaxed)
    }

    /// Sessions closed since start.
    #[must_use]
    pub fn closed(&self) -> u64 {
        self.closed.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use tideway_core::EventKind;
    use tideway_hooks::{ChannelHook, Next};
    use tideway_schema::{FieldKind, RawSource, Schema};

    type Log = Arc<Mutex<Vec<String>>>;

    /// Transport that records every frame.
    #[derive(Default)]
    struct MockTransport {
        frames: Mutex<Vec<Frame>>,
    }

    impl MockTransport {
        fn frames(&self) -> Vec<Frame> {
            self.frames.lock().unwrap().clone()
        }
    }

    impl Transport for MockTransport {
        fn send(&self, frame: Frame) -> bool {
            self.frames.lock().unwrap().push(frame);
            true
        }
    }

    /// Channel that appends every callback invocation to a log.
    struct Recorder {
        log: Log,
    }

    #[async_trait]
    impl Channel for Recorder {
        async fn on_open(&self, _session: &SessionHandle) -> Result<(), HookError> {
            self.log.lock().unwrap().push("open".into());
            Ok(())
        }
        async fn on_message(&self, _session: &SessionHandle, text: &str) -> Result<(), HookError> {
            self.log.lock().unwrap().push(format!("message:{text}"));
            Ok(())
        }
        async fn on_close(&self, _session: &SessionHandle) -> Result<(), HookError> {
            self.log.lock().unwrap().push("close".into());
            Ok(())
        }
    }

    fn recorder_session(log: &Log) -> (ChannelSession, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::default());
        let session = ChannelSession::new(
            Arc::new(Recorder { log: log.clone() }),
            transport.clone(),
            RequestContext::new("/test"),
            BoundParams::empty(),
        );
        (session, transport)
    }

    #[test]
    fn new_session_is_pending() {
        let log = Log::default();
        let (session, _) = recorder_session(&log);
        assert_eq!(session.state(), LifecycleState::Pending);
    }

    #[tokio::test]
    async fn open_transitions_and_runs_chain_once() {
        let log = Log::default();
        let (session, _) = recorder_session(&log);
        session.open().await.unwrap();
        assert_eq!(session.state(), LifecycleState::Open);
        assert_eq!(*log.lock().unwrap(), ["open"]);
    }

    #[tokio::test]
    async fn open_twice_is_an_error() {
        let log = Log::default();
        let (session, _) = recorder_session(&log);
        session.open().await.unwrap();
        assert!(session.open().await.is_err());
        assert_eq!(*log.lock().unwrap(), ["open"]);
    }

    #[tokio::test]
    async fn full_lifecycle_order_exactly_once() {
        let log = Log::default();
        let (session, _) = recorder_session(&log);
        session.open().await.unwrap();
        session
            .dispatch(ChannelEvent::Message("A".into()))
            .await
            .unwrap();
        session
            .dispatch(ChannelEvent::Message("B".into()))
            .await
            .unwrap();
        session.close().await.unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            ["open", "message:A", "message:B", "close"]
        );
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let log = Log::default();
        let (session, _) = recorder_session(&log);
        session.open().await.unwrap();
        session.close().await.unwrap();
        session.close().await.unwrap();
        session.close().await.unwrap();
        assert_eq!(session.state(), LifecycleState::Closed);
        let closes = log
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.as_str() == "close")
            .count();
        assert_eq!(closes, 1);
    }

    #[tokio::test]
    async fn close_before_open_skips_chain() {
        let log = Log::default();
        let (session, _) = recorder_session(&log);
        session.close().await.unwrap();
        assert_eq!(session.state(), LifecycleState::Closed);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn events_outside_open_are_dropped() {
        let log = Log::default();
        let (session, _) = recorder_session(&log);
        session
            .dispatch(ChannelEvent::Message("early".into()))
            .await
            .unwrap();
        session.open().await.unwrap();
        session.close().await.unwrap();
        session
            .dispatch(ChannelEvent::Message("late".into()))
            .await
            .unwrap();
        assert_eq!(*log.lock().unwrap(), ["open", "close"]);
    }

    #[tokio::test]
    async fn failed_open_leaves_session_pending() {
        struct RefusingChannel;

        #[async_trait]
        impl Channel for RefusingChannel {
            async fn on_open(&self, _session: &SessionHandle) -> Result<(), HookError> {
                Err(HookError::rejected("not today"))
            }
        }

        let session = ChannelSession::new(
            Arc::new(RefusingChannel),
            Arc::new(MockTransport::default()),
            RequestContext::new("/test"),
            BoundParams::empty(),
        );
        assert!(session.open().await.is_err());
        assert_eq!(session.state(), LifecycleState::Pending);
    }

    #[tokio::test]
    async fn hook_failure_leaves_session_open() {
        struct Denier;

        #[async_trait]
        impl ChannelHook for Denier {
            fn name(&self) -> &str {
                "denier"
            }
            async fn call(
                &self,
                _ctx: &tideway_hooks::HookContext,
                _next: Next<'_>,
            ) -> Result<(), HookError> {
                Err(HookError::rejected("no messages"))
            }
        }

        struct Guarded {
            log: Log,
        }

        #[async_trait]
        impl Channel for Guarded {
            fn hooks(&self, registry: &mut HookRegistry) {
                registry.register(EventKind::Message, Arc::new(Denier));
            }
            async fn on_message(
                &self,
                _session: &SessionHandle,
                text: &str,
            ) -> Result<(), HookError> {
                self.log.lock().unwrap().push(format!("message:{text}"));
                Ok(())
            }
        }

        let log = Log::default();
        let session = ChannelSession::new(
            Arc::new(Guarded { log: log.clone() }),
            Arc::new(MockTransport::default()),
            RequestContext::new("/test"),
            BoundParams::empty(),
        );
        session.open().await.unwrap();
        let err = session
            .dispatch(ChannelEvent::Message("blocked".into()))
            .await
            .unwrap_err();
        assert_eq!(err, HookError::rejected("no messages"));
        // The failure neither closed the session nor reached the base.
        assert_eq!(session.state(), LifecycleState::Open);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn hooks_wrap_base_in_registration_order() {
        struct Wrapping {
            name: &'static str,
            log: Log,
        }

        #[async_trait]
        impl ChannelHook for Wrapping {
            fn name(&self) -> &str {
                self.name
            }
            async fn call(
                &self,
                ctx: &tideway_hooks::HookContext,
                next: Next<'_>,
            ) -> Result<(), HookError> {
                self.log.lock().unwrap().push(format!("{}:pre", self.name));
                let result = next.run(ctx).await;
                self.log.lock().unwrap().push(format!("{}:post", self.name));
                result
            }
        }

        struct Hooked {
            log: Log,
        }

        #[async_trait]
        impl Channel for Hooked {
            fn hooks(&self, registry: &mut HookRegistry) {
                registry.register(
                    EventKind::Message,
                    Arc::new(Wrapping {
                        name: "h1",
                        log: self.log.clone(),
                    }),
                );
                registry.register(
                    EventKind::Message,
                    Arc::new(Wrapping {
                        name: "h2",
                        log: self.log.clone(),
                    }),
                );
            }
            async fn on_message(
                &self,
                _session: &SessionHandle,
                _text: &str,
            ) -> Result<(), HookError> {
                self.log.lock().unwrap().push("base".into());
                Ok(())
            }
        }

        let log = Log::default();
        let session = ChannelSession::new(
            Arc::new(Hooked { log: log.clone() }),
            Arc::new(MockTransport::default()),
            RequestContext::new("/test"),
            BoundParams::empty(),
        );
        session.open().await.unwrap();
        session
            .dispatch(ChannelEvent::Message("x".into()))
            .await
            .unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            ["h1:pre", "h2:pre", "base", "h2:post", "h1:post"]
        );
    }

    #[tokio::test]
    async fn default_ping_replies_with_pong() {
        struct Silent;
        impl Channel for Silent {}

        let transport = Arc::new(MockTransport::default());
        let session = ChannelSession::new(
            Arc::new(Silent),
            transport.clone(),
            RequestContext::new("/test"),
            BoundParams::empty(),
        );
        session.open().await.unwrap();
        session.dispatch(ChannelEvent::Ping).await.unwrap();
        assert_eq!(transport.frames(), [Frame::Pong(Bytes::new())]);
    }

    #[tokio::test]
    async fn overridden_ping_suppresses_pong() {
        struct Mute;

        #[async_trait]
        impl Channel for Mute {
            async fn on_ping(&self, _session: &SessionHandle) -> Result<(), HookError> {
                Ok(())
            }
        }

        let transport = Arc::new(MockTransport::default());
        let session = ChannelSession::new(
            Arc::new(Mute),
            transport.clone(),
            RequestContext::new("/test"),
            BoundParams::empty(),
        );
        session.open().await.unwrap();
        session.dispatch(ChannelEvent::Ping).await.unwrap();
        assert!(transport.frames().is_empty());
    }

    #[tokio::test]
    async fn handle_exposes_bound_params_and_request() {
        let schema = Schema::builder()
            .field("room", FieldKind::String)
            .nullable("token", FieldKind::String)
            .build();
        let raw = RawSource::new().with_route_param("room", "lobby");
        let params = schema.bind(&raw).unwrap();

        let mut request = RequestContext::new("/rooms/lobby");
        let _ = request.route_params.insert("room".into(), "lobby".into());

        struct Silent;
        impl Channel for Silent {}

        let session = ChannelSession::new(
            Arc::new(Silent),
            Arc::new(MockTransport::default()),
            request,
            params,
        );
        let handle = session.handle();
        assert_eq!(handle.params().get_str("room"), Some("lobby"));
        assert!(handle.params().get("token").unwrap().is_null());
        assert_eq!(handle.request().route_param("room"), Some("lobby"));
        assert!(handle.raw_body().is_none());
    }

    #[tokio::test]
    async fn handle_close_enqueues_close_frame() {
        let log = Log::default();
        let (session, transport) = recorder_session(&log);
        session.open().await.unwrap();
        assert!(session.handle().close());
        assert_eq!(transport.frames(), [Frame::Close]);
    }

    #[test]
    fn counters_track_open_and_close() {
        let counters = SessionCounters::new();
        counters.session_opened();
        counters.session_opened();
        counters.session_closed();
        assert_eq!(counters.active(), 1);
        assert_eq!(counters.opened(), 2);
        assert_eq!(counters.closed(), 1);
    }
}
