//! Originating request context.
//!
//! Captured once from the upgrade request when a session is constructed
//! and never reassigned afterwards. Hooks and channel callbacks read it
//! through shared references.

use std::collections::HashMap;

use crate::ids::RequestId;

/// Immutable snapshot of the HTTP request that initiated a session.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique ID for the upgrade request.
    pub id: RequestId,
    /// Request path as matched by the router.
    pub path: String,
    /// Route parameters extracted from matched path segments.
    pub route_params: HashMap<String, String>,
    /// Decoded query string parameters.
    pub query_params: HashMap<String, String>,
}

impl RequestContext {
    /// Create a context for the given path with no parameters.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            id: RequestId::new(),
            path: path.into(),
            route_params: HashMap::new(),
            query_params: HashMap::new(),
        }
    }

    /// Look up a route parameter by name.
    #[must_use]
    pub fn route_param(&self, name: &str) -> Option<&str> {
        self.route_params.get(name).map(String::as_str)
    }

    /// Look up a query parameter by name.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }
}
