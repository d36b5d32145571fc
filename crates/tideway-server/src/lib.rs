//! # tideway-server
//!
//! Channel sessions over axum `WebSocket` upgrades.
//!
//! - **Channel types**: declare lifecycle callbacks, a parameter schema,
//!   and hooks via the [`Channel`] trait
//! - **Upgrade routing**: map paths to channel types; binding failures
//!   reject the upgrade with `400`, non-upgrade requests get `426`
//! - **Session driver**: one tokio task per connection, strictly
//!   sequential event dispatch, heartbeat liveness
//! - **Server**: `/health` endpoint, `TIDEWAY_*` config overrides,
//!   graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod channel;
pub mod config;
pub mod health;
pub mod heartbeat;
pub mod metrics;
pub mod router;
mod runner;
pub mod server;
pub mod session;
pub mod shutdown;
pub mod transport;

pub use channel::{Channel, ChannelConfig};
pub use config::ServerConfig;
pub use router::ChannelRouter;
pub use server::ChannelServer;
pub use session::{ChannelSession, LifecycleState, SessionCounters, SessionHandle};
pub use shutdown::ShutdownCoordinator;
pub use transport::{ChannelConnection, Frame, Transport};
