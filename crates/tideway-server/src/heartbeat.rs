//! Heartbeat liveness monitoring.
//!
//! The driver sends protocol pings on an interval; this loop watches the
//! connection's alive flag and reports when the client stops answering.
//! A timeout closes the underlying socket, which drives the normal
//! `Open → Closed` transition; there is no separate teardown path.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::transport::ChannelConnection;

/// Outcome of the heartbeat loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatResult {
    /// The client stopped responding within the timeout window.
    TimedOut,
    /// The heartbeat was cancelled externally.
    Cancelled,
}

/// Watch a connection's liveness.
///
/// At each `interval` tick the alive flag is checked and reset. Misses
/// accumulate; once `timeout / interval` consecutive misses are reached
/// (at least one), the connection is considered dead and
/// [`HeartbeatResult::TimedOut`] is returned. Any inbound ping or pong
/// resets the count via [`ChannelConnection::mark_alive`].
pub async fn run_heartbeat(
    connection: Arc<ChannelConnection>,
    interval: Duration,
    timeout: Duration,
    cancel: CancellationToken,
) -> HeartbeatResult {
    let mut check_interval = time::interval(interval);
    let mut missed_pongs: u32 = 0;
    let interval_secs = interval.as_secs().max(1);
    #[allow(clippy::cast_possible_truncation)]
    let max_missed = (timeout.as_secs() / interval_secs).max(1) as u32;

    loop {
        tokio::select! {
            _ = check_interval.tick() => {
                if connection.check_alive() {
                    missed_pongs = 0;
                } else {
                    missed_pongs += 1;
                    if missed_pongs >= max_missed {
                        return HeartbeatResult::TimedOut;
                    }
                }
                // Not alive again until the next pong arrives.
                connection.is_alive.store(false, Ordering::Relaxed);
            }
            () = cancel.cancelled() => {
                return HeartbeatResult::Cancelled;
            }
        }
    }
}
