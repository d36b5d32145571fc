//! Hook error types.

use thiserror::Error;

/// Errors raised inside a hook chain.
///
/// A failure short-circuits the remaining chain for that event and leaves
/// the session's lifecycle state unchanged; the driver logs it and moves
/// on rather than closing the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    /// A named hook failed.
    #[error("hook '{name}' failed: {message}")]
    Hook {
        /// Name of the failing hook.
        name: String,
        /// What went wrong.
        message: String,
    },

    /// A hook rejected the event (e.g. failed authentication).
    #[error("rejected: {reason}")]
    Rejected {
        /// Why the event was rejected.
        reason: String,
    },

    /// Generic internal error.
    #[error("{0}")]
    Internal(String),
}

impl HookError {
    /// A named hook failure.
    #[must_use]
    pub fn hook(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Hook {
            name: name.into(),
            message: message.into(),
        }
    }

    /// A rejection with a reason.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }
}
