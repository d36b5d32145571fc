//! Raw request data the binder reads from.

use std::collections::HashMap;

use tracing::debug;

/// Untyped request data assembled by the upgrade integration.
///
/// Route and query parameters are flat string maps; the body, when the
/// integration read one, is parsed JSON. Scalars bind from route params
/// first, then query params, then body keys; objects and arrays bind
/// from the body only.
#[derive(Debug, Clone, Default)]
pub struct RawSource {
    route: HashMap<String, String>,
    query: HashMap<String, String>,
    body: Option<serde_json::Value>,
}

/// One raw value as seen by the binder.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Raw<'a> {
    /// Flat string from route or query parameters.
    Str(&'a str),
    /// JSON value from the request body.
    Json(&'a serde_json::Value),
}

impl RawSource {
    /// An empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from already-extracted parts.
    #[must_use]
    pub fn from_parts(
        route: HashMap<String, String>,
        query: HashMap<String, String>,
        body: Option<serde_json::Value>,
    ) -> Self {
        Self { route, query, body }
    }

    /// Add a route parameter.
    #[must_use]
    pub fn with_route_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.route.insert(name.into(), value.into());
        self
    }

    /// Add a query parameter.
    #[must_use]
    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.query.insert(name.into(), value.into());
        self
    }

    /// Attach a parsed JSON body.
    #[must_use]
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Parse body bytes as JSON.
    ///
    /// Returns `None` when the bytes are empty or not valid JSON, for
    /// example a body cut short by the configured read cap. That is not a
    /// validation error; the fields simply bind as absent.
    #[must_use]
    pub fn parse_body(bytes: &[u8]) -> Option<serde_json::Value> {
        if bytes.is_empty() {
            return None;
        }
        match serde_json::from_slice(bytes) {
            Ok(value) => Some(value),
            Err(err) => {
                debug!(%err, len = bytes.len(), "request body is not valid JSON, binding as absent");
                None
            }
        }
    }

    /// Look up a top-level raw value: route, then query, then body key.
    pub(crate) fn lookup(&self, name: &str) -> Option<Raw<'_>> {
        if let Some(value) = self.route.get(name) {
            return Some(Raw::Str(value));
        }
        if let Some(value) = self.query.get(name) {
            return Some(Raw::Str(value));
        }
        self.body
            .as_ref()
            .and_then(serde_json::Value::as_object)
            .and_then(|map| map.get(name))
            .map(Raw::Json)
    }
}
