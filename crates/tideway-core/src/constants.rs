//! Package-level constants.

/// Current version of tideway (sourced from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name.
pub const NAME: &str = "tideway";

/// Default cap on bytes read from an upgrade request body during
/// parameter binding (8 MiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 8 * 1024 * 1024;

/// Capacity of the per-session outbound frame queue.
pub const SEND_BUFFER_FRAMES: usize = 1024;
