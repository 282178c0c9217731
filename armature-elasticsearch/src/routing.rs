//! Shard routing: URL suffix rendering and routing-missing detection.

use url::form_urlencoded::byte_serialize;

use crate::config::DEFAULT_ROUTING_MISSING_MARKER;

/// Parent/routing keys used to route a document to its shard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingDefinition {
    /// Id of the parent document (parent-child relationships).
    pub parent_id: Option<String>,
    /// Explicit routing key.
    pub routing_id: Option<String>,
}

impl RoutingDefinition {
    /// Create an empty routing definition.
    pub fn new() -> Self {
        Self::default()
    }

    /// Route by parent document id.
    pub fn with_parent(mut self, parent_id: impl ToString) -> Self {
        self.parent_id = Some(parent_id.to_string());
        self
    }

    /// Route by explicit routing key.
    pub fn with_routing(mut self, routing_id: impl ToString) -> Self {
        self.routing_id = Some(routing_id.to_string());
        self
    }

    /// Check if neither key is set.
    pub fn is_empty(&self) -> bool {
        self.parent_id.is_none() && self.routing_id.is_none()
    }
}

/// Renders a routing definition as a URL suffix.
pub trait RoutingEncoder: Send + Sync {
    /// Render the suffix, or an empty string when there is nothing to route by.
    fn render(&self, routing: Option<&RoutingDefinition>) -> String;
}

/// Renders `?parent=<p>&routing=<r>` query strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryRoutingEncoder;

impl RoutingEncoder for QueryRoutingEncoder {
    fn render(&self, routing: Option<&RoutingDefinition>) -> String {
        let Some(routing) = routing else {
            return String::new();
        };

        let params: Vec<String> = [
            ("parent", routing.parent_id.as_deref()),
            ("routing", routing.routing_id.as_deref()),
        ]
        .into_iter()
        .filter_map(|(key, value)| {
            value.map(|v| format!("{}={}", key, byte_serialize(v.as_bytes()).collect::<String>()))
        })
        .collect();

        if params.is_empty() {
            String::new()
        } else {
            format!("?{}", params.join("&"))
        }
    }
}

/// Decides whether a `400 Bad Request` body means a routing key was missing.
pub trait RoutingMissingPredicate: Send + Sync {
    /// Inspect the raw error body.
    fn is_routing_missing(&self, error_body: &str) -> bool;
}

impl<F> RoutingMissingPredicate for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_routing_missing(&self, error_body: &str) -> bool {
        self(error_body)
    }
}

/// Substring match against the error body.
#[derive(Debug, Clone)]
pub struct MarkerPredicate {
    marker: String,
}

impl MarkerPredicate {
    /// Create a predicate matching `marker`.
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    /// The marker being matched.
    pub fn marker(&self) -> &str {
        &self.marker
    }
}

impl Default for MarkerPredicate {
    fn default() -> Self {
        Self::new(DEFAULT_ROUTING_MISSING_MARKER)
    }
}

impl RoutingMissingPredicate for MarkerPredicate {
    fn is_routing_missing(&self, error_body: &str) -> bool {
        error_body.contains(&self.marker)
    }
}
