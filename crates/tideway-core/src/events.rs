//! Channel lifecycle events.
//!
//! A session receives a well-defined sequence of events between upgrade
//! and teardown: `Open`, any number of `Message` / `Binary` / `Ping` /
//! `Pong`, then `Close` exactly once. [`ChannelEvent`] carries the event
//! payload; [`EventKind`] is the payload-free discriminant used to key
//! hook registration.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Lifecycle event kind.
///
/// Hook chains are registered and composed per kind. No kind is
/// special-cased by the composition mechanism itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Session opened (parameters bound, connection established).
    Open,
    /// Inbound text message.
    Message,
    /// Inbound binary message.
    Binary,
    /// Heartbeat ping received.
    Ping,
    /// Heartbeat pong received.
    Pong,
    /// Session closed (terminal).
    Close,
}

impl EventKind {
    /// Returns all event kind variants.
    #[must_use]
    pub fn all() -> &'static [EventKind] {
        &[
            Self::Open,
            Self::Message,
            Self::Binary,
            Self::Ping,
            Self::Pong,
            Self::Close,
        ]
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Message => write!(f, "message"),
            Self::Binary => write!(f, "binary"),
            Self::Ping => write!(f, "ping"),
            Self::Pong => write!(f, "pong"),
            Self::Close => write!(f, "close"),
        }
    }
}

/// A lifecycle event with its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Session opened.
    Open,
    /// Inbound text message.
    Message(String),
    /// Inbound binary message.
    Binary(Bytes),
    /// Heartbeat ping.
    Ping,
    /// Heartbeat pong.
    Pong,
    /// Session closed.
    Close,
}

impl ChannelEvent {
    /// The payload-free discriminant for this event.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Open => EventKind::Open,
            Self::Message(_) => EventKind::Message,
            Self::Binary(_) => EventKind::Binary,
            Self::Ping => EventKind::Ping,
            Self::Pong => EventKind::Pong,
            Self::Close => EventKind::Close,
        }
    }

    /// Text payload, if this is a `Message` event.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Message(text) => Some(text),
            _ => None,
        }
    }

    /// Binary payload, if this is a `Binary` event.
    #[must_use]
    pub fn bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Binary(data) => Some(data),
            _ => None,
        }
    }
}
