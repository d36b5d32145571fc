//! `/health` endpoint.

use std::time::Instant;

use serde::Serialize;

use crate::session::SessionCounters;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    /// RFC 3339 timestamp of the check.
    pub timestamp: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Currently open sessions.
    pub active_sessions: usize,
    /// Sessions opened since start.
    pub sessions_opened: u64,
    /// Sessions closed since start.
    pub sessions_closed: u64,
}

/// Build a health response from live counters.
#[must_use]
pub fn health_check(start_time: Instant, counters: &SessionCounters) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime_secs: start_time.elapsed().as_secs(),
        active_sessions: counters.active(),
        sessions_opened: counters.opened(),
        sessions_closed: counters.closed(),
    }
}
