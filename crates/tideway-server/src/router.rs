//! Upgrade routing: mapping paths to channel types.
//!
//! Upgrade recognition belongs to the transport: axum's
//! `Option<WebSocketUpgrade>` extractor is the predicate. A matching
//! upgrade request is bound against the channel's schema before the
//! handshake completes; binding failures reject the upgrade with `400`
//! and no lifecycle hook fires. Non-upgrade requests to a channel path
//! get `426 Upgrade Required`; everything else belongs to the
//! application's surrounding router.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{FromRequestParts, Query, RawPathParams, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use metrics::counter;
use tracing::{debug, warn};

use tideway_core::{RequestContext, RequestId, SessionId};
use tideway_schema::{BoundParams, RawSource, Schema};

use crate::channel::{Channel, ChannelConfig};
use crate::config::ServerConfig;
use crate::metrics::BINDING_FAILURES_TOTAL;
use crate::runner::{SessionStart, run_channel_session};
use crate::session::SessionCounters;

/// A channel type captured at registration time.
///
/// The schema and tunables are read from the channel exactly once here
/// and shared by every session of the type.
pub(crate) struct ChannelEndpoint {
    channel: Arc<dyn Channel>,
    schema: Option<Schema>,
    config: ChannelConfig,
}

impl ChannelEndpoint {
    fn new<C: Channel>(channel: C) -> Self {
        let schema = channel.schema();
        let config = channel.config();
        Self {
            channel: Arc::new(channel),
            schema,
            config,
        }
    }

    pub(crate) fn channel(&self) -> Arc<dyn Channel> {
        self.channel.clone()
    }
}

/// Driver tunables shared by every endpoint of a router.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RouterOptions {
    pub ping_interval: Duration,
    pub pong_timeout: Duration,
    pub max_message_size: usize,
    pub max_connections: usize,
}

impl RouterOptions {
    fn from_config(config: &ServerConfig) -> Self {
        Self {
            ping_interval: Duration::from_secs(config.heartbeat_interval_secs),
            pong_timeout: Duration::from_secs(config.heartbeat_timeout_secs),
            max_message_size: config.max_message_size,
            max_connections: config.max_connections,
        }
    }
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self::from_config(&ServerConfig::default())
    }
}

/// Maps upgrade paths to channel types.
#[derive(Clone)]
pub struct ChannelRouter {
    router: Router,
    options: RouterOptions,
    counters: Arc<SessionCounters>,
}

impl ChannelRouter {
    /// Router with default driver tunables.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(RouterOptions::default())
    }

    /// Router with tunables taken from a server config.
    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::with_options(RouterOptions::from_config(config))
    }

    fn with_options(options: RouterOptions) -> Self {
        Self {
            router: Router::new(),
            options,
            counters: Arc::new(SessionCounters::new()),
        }
    }

    /// Register a channel type at a path pattern (axum syntax; `{param}`
    /// segments become route parameters visible to the binder).
    #[must_use]
    pub fn channel<C: Channel>(mut self, path: &str, channel: C) -> Self {
        let endpoint = Arc::new(ChannelEndpoint::new(channel));
        let options = self.options;
        let counters = self.counters.clone();
        debug!(path, "registering channel route");

        let handler = move |path_params: RawPathParams,
                            Query(query): Query<HashMap<String, String>>,
                            request: Request| {
            let endpoint = endpoint.clone();
            let counters = counters.clone();
            async move {
                // `Option<WebSocketUpgrade>` is not an extractor in axum 0.8
                // (it has no `OptionalFromRequestParts` impl), so reproduce the
                // optional predicate by running the extractor by hand: `Some`
                // for an upgrade request, `None` otherwise.
                let (mut parts, body) = request.into_parts();
                let ws = WebSocketUpgrade::from_request_parts(&mut parts, &())
                    .await
                    .ok();
                let request = Request::from_parts(parts, body);
                serve_upgrade(endpoint, options, counters, ws, path_params, query, request).await
            }
        };

        self.router = self.router.route(path, get(handler));
        self
    }

    /// Live session counters for this router's endpoints.
    #[must_use]
    pub fn counters(&self) -> Arc<SessionCounters> {
        self.counters.clone()
    }

    /// Finish registration and yield the axum router for nesting or
    /// merging into an application.
    #[must_use]
    pub fn into_router(self) -> Router {
        self.router
    }
}

impl Default for ChannelRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle one request to a channel path.
async fn serve_upgrade(
    endpoint: Arc<ChannelEndpoint>,
    options: RouterOptions,
    counters: Arc<SessionCounters>,
    ws: Option<WebSocketUpgrade>,
    path_params: RawPathParams,
    query: HashMap<String, String>,
    request: Request,
) -> Response {
    // Not an upgrade request: this path serves channels only.
    let Some(ws) = ws else {
        return (
            StatusCode::UPGRADE_REQUIRED,
            "this endpoint only accepts websocket upgrades",
        )
            .into_response();
    };

    if counters.active() >= options.max_connections {
        warn!(
            active = counters.active(),
            limit = options.max_connections,
            "connection limit reached, refusing upgrade"
        );
        return (StatusCode::SERVICE_UNAVAILABLE, "connection limit reached").into_response();
    }

    let route_params: HashMap<String, String> = path_params
        .iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();
    let context = RequestContext {
        id: RequestId::new(),
        path: request.uri().path().to_owned(),
        route_params,
        query_params: query,
    };

    // The body is read only when something needs it, bounded by the
    // channel's cap. Truncation is not an error: whatever was read is
    // what the binder sees.
    let config = endpoint.config;
    let body = if endpoint.schema.is_some() || config.preserve_body {
        read_body_bounded(request.into_body(), config.max_body_size).await
    } else {
        Bytes::new()
    };

    // Binding happens at most once per session, before the handshake
    // completes; failure rejects the upgrade and no hook fires.
    let params = match &endpoint.schema {
        Some(schema) => {
            let source = RawSource::from_parts(
                context.route_params.clone(),
                context.query_params.clone(),
                RawSource::parse_body(&body),
            );
            match schema.bind(&source) {
                Ok(params) => params,
                Err(err) => {
                    counter!(BINDING_FAILURES_TOTAL).increment(1);
                    warn!(error = %err, path = %context.path, "parameter binding failed, rejecting upgrade");
                    return (StatusCode::BAD_REQUEST, err.to_string()).into_response();
                }
            }
        }
        None => BoundParams::empty(),
    };
    let raw_body = config.preserve_body.then(|| body.clone());

    let start = SessionStart {
        session_id: SessionId::new(),
        request: context,
        params,
        raw_body,
    };
    debug!(session_id = %start.session_id, path = %start.request.path, "upgrade accepted");

    ws.max_message_size(options.max_message_size)
        .on_upgrade(move |socket| run_channel_session(socket, endpoint, start, options, counters))
}

/// Stream up to `cap` bytes from the request body.
///
/// A body larger than the cap is truncated, not rejected; whether the
/// truncated bytes still bind is the schema's concern.
pub(crate) async fn read_body_bounded(body: Body, cap: usize) -> Bytes {
    let mut stream = body.into_data_stream();
    let mut buf = BytesMut::new();
    while buf.len() < cap {
        match stream.next().await {
            Some(Ok(chunk)) => {
                let remaining = cap - buf.len();
                if chunk.len() > remaining {
                    buf.extend_from_slice(&chunk[..remaining]);
                } else {
                    buf.extend_from_slice(&chunk);
                }
            }
            Some(Err(err)) => {
                debug!(error = %err, "body read failed, binding with bytes read so far");
                break;
            }
            None => break,
        }
    }
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tideway_schema::FieldKind;
    use tower::ServiceExt;

    struct PlainChannel;
    impl Channel for PlainChannel {}

    #[tokio::test]
    async fn non_upgrade_request_gets_426() {
        let app = ChannelRouter::new()
            .channel("/chat", PlainChannel)
            .into_router();
        let req = Request::builder()
            .uri("/chat")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UPGRADE_REQUIRED);
    }

    #[tokio::test]
    async fn unknown_path_is_404() {
        let app = ChannelRouter::new()
            .channel("/chat", PlainChannel)
            .into_router();
        let req = Request::builder()
            .uri("/nowhere")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn route_with_params_still_registers() {
        let app = ChannelRouter::new()
            .channel("/rooms/{room}", PlainChannel)
            .into_router();
        let req = Request::builder()
            .uri("/rooms/lobby")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UPGRADE_REQUIRED);
    }

    #[test]
    fn counters_start_at_zero() {
        let router = ChannelRouter::new();
        assert_eq!(router.counters().active(), 0);
    }

    #[test]
    fn endpoint_captures_schema_and_config_once() {
        struct Configured;
        impl Channel for Configured {
            fn schema(&self) -> Option<Schema> {
                Some(Schema::builder().field("id", FieldKind::Integer).build())
            }
            fn config(&self) -> ChannelConfig {
                ChannelConfig {
                    max_body_size: 10,
                    preserve_body: true,
                }
            }
        }

        let endpoint = ChannelEndpoint::new(Configured);
        assert_eq!(endpoint.schema.as_ref().map(Schema::len), Some(1));
        assert_eq!(endpoint.config.max_body_size, 10);
        assert!(endpoint.config.preserve_body);
    }

    #[tokio::test]
    async fn body_read_is_bounded_by_cap() {
        let body = Body::from("01234567890123456789"); // 20 bytes
        let bytes = read_body_bounded(body, 10).await;
        assert_eq!(&bytes[..], b"0123456789");
    }

    #[tokio::test]
    async fn body_read_under_cap_is_complete() {
        let body = Body::from("short");
        let bytes = read_body_bounded(body, 1024).await;
        assert_eq!(&bytes[..], b"short");
    }

    #[tokio::test]
    async fn empty_body_reads_empty() {
        let bytes = read_body_bounded(Body::empty(), 1024).await;
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn truncated_body_binds_as_absent_not_as_error() {
        // A 10-byte cap cuts the JSON body mid-token; the remainder no
        // longer parses, so body-bound fields are simply absent and a
        // nullable schema still binds.
        let body = Body::from(r#"{"note": "a longer value than the cap allows"}"#);
        let bytes = read_body_bounded(body, 10).await;
        let schema = Schema::builder()
            .nullable("note", FieldKind::String)
            .build();
        let source = RawSource::from_parts(
            HashMap::new(),
            HashMap::new(),
            RawSource::parse_body(&bytes),
        );
        let params = schema.bind(&source).unwrap();
        assert!(params.get("note").unwrap().is_null());
    }
}
