//! Server configuration with environment overrides.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration for the channel server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Maximum concurrent sessions; upgrades past the limit get `503`.
    pub max_connections: usize,
    /// Interval between server-initiated ping frames, in seconds.
    pub heartbeat_interval_secs: u64,
    /// How long an unresponsive client survives before the socket is
    /// closed, in seconds.
    pub heartbeat_timeout_secs: u64,
    /// Maximum inbound WebSocket message size in bytes.
    pub max_message_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            max_connections: 50,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            max_message_size: 16 * 1024 * 1024, // 16 MB
        }
    }
}

impl ServerConfig {
    /// Defaults with `TIDEWAY_*` environment overrides applied.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply environment variable overrides.
    ///
    /// Parsing is strict: integers must be valid and within range, and
    /// invalid values are ignored (the existing value stands).
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = read_env_string("TIDEWAY_HOST") {
            self.host = v;
        }
        if let Some(v) = read_env_u16("TIDEWAY_PORT") {
            self.port = v;
        }
        if let Some(v) = read_env_usize("TIDEWAY_MAX_CONNECTIONS", 1, 100_000) {
            self.max_connections = v;
        }
        if let Some(v) = read_env_u64("TIDEWAY_HEARTBEAT_INTERVAL", 1, 3_600) {
            self.heartbeat_interval_secs = v;
        }
        if let Some(v) = read_env_u64("TIDEWAY_HEARTBEAT_TIMEOUT", 1, 86_400) {
            self.heartbeat_timeout_secs = v;
        }
        if let Some(v) = read_env_usize("TIDEWAY_MAX_MESSAGE_SIZE", 1_024, 1 << 30) {
            self.max_message_size = v;
        }
    }
}

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_u16(name: &str) -> Option<u16> {
    let raw = std::env::var(name).ok()?;
    let parsed = raw.parse::<u16>().ok();
    if parsed.is_none() {
        debug!(name, raw, "ignoring invalid environment override");
    }
    parsed
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    let parsed = parse_u64(&raw, min, max);
    if parsed.is_none() {
        debug!(name, raw, "ignoring invalid environment override");
    }
    parsed
}

fn read_env_usize(name: &str, min: usize, max: usize) -> Option<usize> {
    let raw = std::env::var(name).ok()?;
    let parsed = parse_usize(&raw, min, max);
    if parsed.is_none() {
        debug!(name, raw, "ignoring invalid environment override");
    }
    parsed
}

fn parse_u64(raw: &str, min: u64, max: u64) -> Option<u64> {
    raw.parse::<u64>().ok().filter(|v| (min..=max).contains(v))
}

fn parse_usize(raw: &str, min: usize, max: usize) -> Option<usize> {
    raw.parse::<usize>()
        .ok()
        .filter(|v| (min..=max).contains(v))
}
