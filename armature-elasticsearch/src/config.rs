//! Elasticsearch client configuration.

use std::time::Duration;

use crate::error::{ElasticsearchError, Result};

/// Default substring identifying a routing-missing error body.
pub const DEFAULT_ROUTING_MISSING_MARKER: &str = "RoutingMissingException";

/// Elasticsearch client configuration.
#[derive(Debug, Clone)]
pub struct ElasticsearchConfig {
    /// Base URL of the cluster, e.g. `http://localhost:9200`.
    pub connection_string: String,
    /// Basic auth username.
    pub username: Option<String>,
    /// Basic auth password.
    pub password: Option<String>,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Request timeout.
    pub request_timeout: Duration,
    /// User agent string.
    pub user_agent: String,
    /// Substring of a 400 error body that signals a missing routing key.
    pub routing_missing_marker: String,
}

impl ElasticsearchConfig {
    /// Create a new configuration for a single base URL.
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            username: None,
            password: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            user_agent: format!("armature-elasticsearch/{}", env!("CARGO_PKG_VERSION")),
            routing_missing_marker: DEFAULT_ROUTING_MISSING_MARKER.to_string(),
        }
    }

    /// Set basic authentication credentials.
    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the error-body marker used to detect a missing routing key.
    pub fn with_routing_missing_marker(mut self, marker: impl Into<String>) -> Self {
        self.routing_missing_marker = marker.into();
        self
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.connection_string.trim_end_matches('/')
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.connection_string.trim().is_empty() {
            return Err(ElasticsearchError::Configuration(
                "No connection string provided".to_string(),
            ));
        }

        let url = url::Url::parse(self.base_url())?;
        if url.cannot_be_a_base() {
            return Err(ElasticsearchError::Configuration(format!(
                "Connection string is not a base URL: {}",
                self.connection_string
            )));
        }

        if self.routing_missing_marker.is_empty() {
            return Err(ElasticsearchError::Configuration(
                "Routing missing marker must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
