//! Outbound transport abstraction and the per-session connection.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;
use metrics::counter;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use tideway_core::SessionId;

use crate::metrics::FRAMES_DROPPED_TOTAL;

/// An outbound frame enqueued to the socket writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Text payload.
    Text(String),
    /// Binary payload.
    Binary(Bytes),
    /// Heartbeat acknowledgment.
    Pong(Bytes),
    /// Close the connection.
    Close,
}

/// Send half of a session's transport.
///
/// The session borrows this handle; the socket tasks own the underlying
/// stream and its lifecycle.
pub trait Transport: Send + Sync {
    /// Enqueue a frame without blocking.
    ///
    /// Returns `false` when the outbound queue is full or the socket
    /// writer has gone away; the frame is dropped and counted.
    fn send(&self, frame: Frame) -> bool;
}

/// Transport over an mpsc queue to the socket writer task.
///
/// Also tracks liveness for the heartbeat: [`mark_alive`](Self::mark_alive)
/// on inbound ping/pong, [`check_alive`](Self::check_alive) from the
/// heartbeat loop.
pub struct ChannelConnection {
    /// Session this connection belongs to.
    pub session_id: SessionId,
    tx: mpsc::Sender<Frame>,
    /// When this connection was established.
    pub connected_at: Instant,
    /// Whether the client has responded since the last liveness check.
    pub is_alive: AtomicBool,
    /// When the last pong was received.
    last_pong: Mutex<Instant>,
    /// Count of frames dropped due to a full or closed queue.
    pub dropped_frames: AtomicU64,
}

impl ChannelConnection {
    /// Create a connection feeding the given writer queue.
    #[must_use]
    pub fn new(session_id: SessionId, tx: mpsc::Sender<Frame>) -> Self {
        let now = Instant::now();
        Self {
            session_id,
            tx,
            connected_at: now,
            is_alive: AtomicBool::new(true),
            last_pong: Mutex::new(now),
            dropped_frames: AtomicU64::new(0),
        }
    }

    /// Total frames dropped for this connection.
    #[must_use]
    pub fn drop_count(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }

    /// Mark the connection as alive (pong or ping received).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_pong.lock() = Instant::now();
    }

    /// Duration since the last pong (or connection establishment).
    #[must_use]
    pub fn last_pong_elapsed(&self) -> Duration {
        self.last_pong.lock().elapsed()
    }

    /// Check and reset the alive flag for the heartbeat.
    ///
    /// Returns `true` if the connection was alive since the last check.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Connection age.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

impl Transport for ChannelConnection {
    fn send(&self, frame: Frame) -> bool {
        if self.tx.try_send(frame).is_ok() {
            true
        } else {
            let _ = self.dropped_frames.fetch_add(1, Ordering::Relaxed);
            counter!(FRAMES_DROPPED_TOTAL).increment(1);
            false
        }
    }
}

impl std::fmt::Debug for ChannelConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelConnection")
            .field("session_id", &self.session_id)
            .field("dropped_frames", &self.drop_count())
            .finish()
    }
}
