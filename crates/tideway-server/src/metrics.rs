//! Metric name constants and descriptions.
//!
//! Only the `metrics` facade is used here; installing an exporter is the
//! embedding application's choice.

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};

/// Sessions opened (counter).
pub const SESSIONS_OPENED_TOTAL: &str = "channel_sessions_opened_total";
/// Sessions closed (counter).
pub const SESSIONS_CLOSED_TOTAL: &str = "channel_sessions_closed_total";
/// Currently open sessions (gauge).
pub const SESSIONS_ACTIVE: &str = "channel_sessions_active";
/// Events dispatched through hook chains (counter, labels: event).
pub const EVENTS_DISPATCHED_TOTAL: &str = "channel_events_dispatched_total";
/// Upgrade attempts rejected by parameter binding (counter).
pub const BINDING_FAILURES_TOTAL: &str = "channel_binding_failures_total";
/// Hook chain failures (counter, labels: event).
pub const HOOK_ERRORS_TOTAL: &str = "channel_hook_errors_total";
/// Session lifetime from open to close (histogram).
pub const SESSION_DURATION_SECONDS: &str = "channel_session_duration_seconds";
/// Outbound frames dropped on a full or closed queue (counter).
pub const FRAMES_DROPPED_TOTAL: &str = "channel_frames_dropped_total";

/// Register metric descriptions with the installed recorder.
pub fn describe() {
    describe_counter!(SESSIONS_OPENED_TOTAL, "Channel sessions opened");
    describe_counter!(SESSIONS_CLOSED_TOTAL, "Channel sessions closed");
    describe_gauge!(SESSIONS_ACTIVE, "Currently open channel sessions");
    describe_counter!(
        EVENTS_DISPATCHED_TOTAL,
        "Lifecycle events dispatched through hook chains"
    );
    describe_counter!(
        BINDING_FAILURES_TOTAL,
        "Upgrade attempts rejected by parameter binding"
    );
    describe_counter!(HOOK_ERRORS_TOTAL, "Hook chain failures");
    describe_histogram!(
        SESSION_DURATION_SECONDS,
        Unit::Seconds,
        "Session lifetime from open to close"
    );
    describe_counter!(
        FRAMES_DROPPED_TOTAL,
        "Outbound frames dropped on a full or closed queue"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_are_snake_case() {
        let names = [
            SESSIONS_OPENED_TOTAL,
            SESSIONS_CLOSED_TOTAL,
            SESSIONS_ACTIVE,
            EVENTS_DISPATCHED_TOTAL,
            BINDING_FAILURES_TOTAL,
            HOOK_ERRORS_TOTAL,
            SESSION_DURATION_SECONDS,
            FRAMES_DROPPED_TOTAL,
        ];
        for name in names {
            assert!(
                name.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "metric name '{name}' must be snake_case"
            );
        }
    }

    #[test]
    fn describe_does_not_panic_without_recorder() {
        describe();
    }
}
