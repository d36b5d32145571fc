//! `ChannelServer` — axum HTTP server hosting channel routes.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::channel::Channel;
use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::router::ChannelRouter;
use crate::session::SessionCounters;
use crate::shutdown::ShutdownCoordinator;

/// Shared state for the server's own endpoints.
#[derive(Clone)]
pub struct AppState {
    /// Live session counters.
    pub counters: Arc<SessionCounters>,
    /// When the server started.
    pub start_time: Instant,
}

/// HTTP server hosting channel routes plus a `/health` endpoint.
pub struct ChannelServer {
    config: ServerConfig,
    channels: ChannelRouter,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
}

impl ChannelServer {
    /// Create a server; heartbeat and size limits come from the config.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let channels = ChannelRouter::from_config(&config);
        Self {
            config,
            channels,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
        }
    }

    /// Register a channel type at a path pattern.
    #[must_use]
    pub fn channel<C: Channel>(mut self, path: &str, channel: C) -> Self {
        self.channels = self.channels.channel(path, channel);
        self
    }

    /// Build the axum router with all routes.
    #[must_use]
    pub fn router(&self) -> Router {
        let state = AppState {
            counters: self.channels.counters(),
            start_time: self.start_time,
        };
        Router::new()
            .route("/health", get(health_handler))
            .with_state(state)
            .merge(self.channels.clone().into_router())
            .layer(TraceLayer::new_for_http())
    }

    /// Bind and serve. Returns the bound address and the serve task;
    /// the task drains on [`shutdown`](Self::shutdown).
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let local = listener.local_addr()?;
        info!(addr = %local, "channel server listening");

        let app = self.router();
        let token = self.shutdown.token();
        let handle = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(err) = served {
                error!(error = %err, "server task failed");
            }
        });
        Ok((local, handle))
    }

    /// Server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Shutdown coordinator.
    #[must_use]
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Live session counters.
    #[must_use]
    pub fn counters(&self) -> Arc<SessionCounters> {
        self.channels.counters()
    }
}

/// GET `/health`
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(state.start_time, &state.counters))
}
