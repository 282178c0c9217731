//! Error types for Elasticsearch operations.

use http::StatusCode;
use thiserror::Error;

/// Elasticsearch error type.
#[derive(Error, Debug)]
pub enum ElasticsearchError {
    /// A child document was requested without its routing key.
    #[error(
        "HttpStatusCode.BadRequest: routing key required for child document, add the parent id if this is a child item: {0}"
    )]
    RoutingMissing(String),

    /// Document not found (raised by the blocking API only).
    #[error("HttpStatusCode.NotFound: {url}")]
    NotFound {
        /// URL that was requested.
        url: String,
    },

    /// Bad request (raised by the blocking API only).
    #[error("HttpStatusCode.BadRequest: {description}")]
    BadRequest {
        /// URL that was requested.
        url: String,
        /// Error body returned by the server.
        description: String,
    },

    /// No mapping is registered for the requested entity type.
    #[error("No mapping registered for type {0}")]
    MappingNotFound(&'static str),

    /// The mapping could not turn a source fragment into the entity type.
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Underlying HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The blocking bridge failed to run the operation.
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl ElasticsearchError {
    /// Get the HTTP status code carried by this error, if any.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::RoutingMissing(_) | Self::BadRequest { .. } => Some(StatusCode::BAD_REQUEST),
            Self::NotFound { .. } => Some(StatusCode::NOT_FOUND),
            Self::Http(e) => e.status(),
            _ => None,
        }
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error was caused by a missing routing key.
    pub fn is_routing_missing(&self) -> bool {
        matches!(self, Self::RoutingMissing(_))
    }
}

/// Result type alias for Elasticsearch operations.
pub type Result<T> = std::result::Result<T, ElasticsearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let err = ElasticsearchError::NotFound {
            url: "http://localhost:9200/orders/order/1".to_string(),
        };
        assert_eq!(err.status_code(), Some(StatusCode::NOT_FOUND));
        assert!(err.is_not_found());

        let err = ElasticsearchError::BadRequest {
            url: "http://localhost:9200/orders/order/1".to_string(),
            description: "malformed".to_string(),
        };
        assert_eq!(err.status_code(), Some(StatusCode::BAD_REQUEST));

        let err = ElasticsearchError::MappingNotFound("Order");
        assert_eq!(err.status_code(), None);
    }

    #[test]
    fn test_display_includes_description() {
        let err = ElasticsearchError::BadRequest {
            url: "http://localhost:9200/x".to_string(),
            description: "query_parsing_exception".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("BadRequest"));
        assert!(display.contains("query_parsing_exception"));
    }

    #[test]
    fn test_routing_missing_message() {
        let err = ElasticsearchError::RoutingMissing("{}".to_string());
        assert!(err.is_routing_missing());
        assert!(err.to_string().contains("routing key required for child document"));
    }
}
