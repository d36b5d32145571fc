//! Per-session driver: socket split, outbound writer, heartbeat, and
//! strictly sequential inbound dispatch.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use tideway_core::constants::SEND_BUFFER_FRAMES;
use tideway_core::{ChannelEvent, RequestContext, SessionId};
use tideway_schema::BoundParams;

use crate::heartbeat::{HeartbeatResult, run_heartbeat};
use crate::metrics::{
    EVENTS_DISPATCHED_TOTAL, HOOK_ERRORS_TOTAL, SESSION_DURATION_SECONDS, SESSIONS_ACTIVE,
    SESSIONS_CLOSED_TOTAL, SESSIONS_OPENED_TOTAL,
};
use crate::router::{ChannelEndpoint, RouterOptions};
use crate::session::{ChannelSession, SessionCounters};
use crate::transport::{ChannelConnection, Frame};

/// Everything the upgrade handler prepared before the handshake.
pub(crate) struct SessionStart {
    pub session_id: SessionId,
    pub request: RequestContext,
    pub params: BoundParams,
    pub raw_body: Option<Bytes>,
}

/// Drive one upgraded connection from open to teardown.
///
/// Events for the session are dispatched one at a time, in arrival
/// order; nothing about a session runs concurrently with anything else
/// about it. Other sessions are unaffected.
#[instrument(skip_all, fields(session_id = %start.session_id, path = %start.request.path))]
pub(crate) async fn run_channel_session(
    socket: WebSocket,
    endpoint: Arc<ChannelEndpoint>,
    start: SessionStart,
    options: RouterOptions,
    counters: Arc<SessionCounters>,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (send_tx, mut send_rx) = mpsc::channel::<Frame>(SEND_BUFFER_FRAMES);
    let connection = Arc::new(ChannelConnection::new(start.session_id.clone(), send_tx));

    let session = ChannelSession::with_id(
        start.session_id,
        endpoint.channel(),
        connection.clone(),
        start.request,
        start.params,
        start.raw_body,
    );

    // The session opens only if the on_open chain completes; otherwise
    // tear the socket down without ever running on_close.
    if let Err(err) = session.open().await {
        warn!(error = %err, "on_open hook chain failed, closing socket");
        counter!(HOOK_ERRORS_TOTAL, "event" => "open").increment(1);
        let _ = ws_tx.send(Message::Close(None)).await;
        return;
    }

    let opened_at = Instant::now();
    counters.session_opened();
    counter!(SESSIONS_OPENED_TOTAL).increment(1);
    gauge!(SESSIONS_ACTIVE).increment(1.0);
    info!("session opened");

    let cancel = CancellationToken::new();

    // Outbound writer: forwards enqueued frames and sends periodic pings.
    let writer_cancel = cancel.clone();
    let mut ping_interval = tokio::time::interval(options.ping_interval);
    let outbound = tokio::spawn(async move {
        // Skip the immediate first tick.
        let _ = ping_interval.tick().await;
        loop {
            tokio::select! {
                frame = send_rx.recv() => match frame {
                    Some(Frame::Text(text)) => {
                        if ws_tx.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Some(Frame::Binary(data)) => {
                        if ws_tx.send(Message::Binary(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Frame::Pong(data)) => {
                        if ws_tx.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Frame::Close) | None => {
                        let _ = ws_tx.send(Message::Close(None)).await;
                        break;
                    }
                },
                _ = ping_interval.tick() => {
                    if ws_tx.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
                () = writer_cancel.cancelled() => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    // Heartbeat: close the socket when the client stops answering pings.
    let heartbeat_connection = connection.clone();
    let heartbeat_cancel = cancel.clone();
    let heartbeat = tokio::spawn(async move {
        let result = run_heartbeat(
            heartbeat_connection,
            options.ping_interval,
            options.pong_timeout,
            heartbeat_cancel.child_token(),
        )
        .await;
        if result == HeartbeatResult::TimedOut {
            warn!("heartbeat timed out, closing session");
            heartbeat_cancel.cancel();
        }
    });

    // Inbound loop: one event at a time, in arrival order.
    loop {
        tokio::select! {
            inbound = ws_rx.next() => {
                let Some(Ok(message)) = inbound else { break };
                let event = match message {
                    Message::Text(text) => Some(ChannelEvent::Message(text.to_string())),
                    Message::Binary(data) => Some(ChannelEvent::Binary(data)),
                    Message::Ping(_) => {
                        connection.mark_alive();
                        Some(ChannelEvent::Ping)
                    }
                    Message::Pong(_) => {
                        connection.mark_alive();
                        Some(ChannelEvent::Pong)
                    }
                    Message::Close(_) => {
                        debug!("client sent close frame");
                        break;
                    }
                };
                if let Some(event) = event {
                    let kind = event.kind();
                    counter!(EVENTS_DISPATCHED_TOTAL, "event" => kind.to_string()).increment(1);
                    // A chain failure is surfaced and logged; it does not
                    // close the session.
                    if let Err(err) = session.dispatch(event).await {
                        counter!(HOOK_ERRORS_TOTAL, "event" => kind.to_string()).increment(1);
                        warn!(error = %err, event = %kind, "hook chain failed");
                    }
                }
            }
            () = cancel.cancelled() => break,
        }
    }

    // Teardown: the close chain runs exactly once, idempotently.
    cancel.cancel();
    if let Err(err) = session.close().await {
        counter!(HOOK_ERRORS_TOTAL, "event" => "close").increment(1);
        warn!(error = %err, "on_close hook chain failed");
    }
    counters.session_closed();
    counter!(SESSIONS_CLOSED_TOTAL).increment(1);
    gauge!(SESSIONS_ACTIVE).decrement(1.0);
    histogram!(SESSION_DURATION_SECONDS).record(opened_at.elapsed().as_secs_f64());
    info!(
        duration_secs = opened_at.elapsed().as_secs(),
        dropped_frames = connection.drop_count(),
        "session closed"
    );
    outbound.abort();
    heartbeat.abort();
}
