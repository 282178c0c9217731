//! Elasticsearch document retrieval client.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use http::StatusCode;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::{
    config::ElasticsearchConfig,
    error::{ElasticsearchError, Result},
    mapping::{EntityMapping, MappingResolver},
    model::GetResult,
    result::ResultDetails,
    routing::{
        MarkerPredicate, QueryRoutingEncoder, RoutingDefinition, RoutingEncoder,
        RoutingMissingPredicate,
    },
    sync_bridge::{SyncExecutor, shared_executor},
};

/// Client for typed document reads.
///
/// The async methods return a [`ResultDetails`] envelope and report
/// `404`/`400` responses as data. The `_blocking` methods run the same
/// pipeline through a [`SyncExecutor`] and raise those two statuses as
/// errors.
#[derive(Clone)]
pub struct ElasticsearchClient {
    http: reqwest::Client,
    config: Arc<ElasticsearchConfig>,
    resolver: Arc<dyn MappingResolver>,
    routing_encoder: Arc<dyn RoutingEncoder>,
    routing_missing: Arc<dyn RoutingMissingPredicate>,
    cancellation: CancellationToken,
    executor: Arc<SyncExecutor>,
}

impl ElasticsearchClient {
    /// Create a new client.
    pub fn new(
        config: ElasticsearchConfig,
        resolver: impl MappingResolver + 'static,
    ) -> Result<Self> {
        config.validate()?;
        debug!(url = %config.connection_string, "Initializing Elasticsearch client");

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| ElasticsearchError::Configuration(e.to_string()))?;

        let routing_missing = MarkerPredicate::new(config.routing_missing_marker.clone());

        Ok(Self {
            http,
            config: Arc::new(config),
            resolver: Arc::new(resolver),
            routing_encoder: Arc::new(QueryRoutingEncoder),
            routing_missing: Arc::new(routing_missing),
            cancellation: CancellationToken::new(),
            executor: shared_executor(),
        })
    }

    /// Replace the routing encoder.
    pub fn with_routing_encoder(mut self, encoder: impl RoutingEncoder + 'static) -> Self {
        self.routing_encoder = Arc::new(encoder);
        self
    }

    /// Replace the routing-missing detection.
    pub fn with_routing_missing_predicate(
        mut self,
        predicate: impl RoutingMissingPredicate + 'static,
    ) -> Self {
        self.routing_missing = Arc::new(predicate);
        self
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Use a specific executor for the blocking API.
    pub fn with_executor(mut self, executor: SyncExecutor) -> Self {
        self.executor = Arc::new(executor);
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &ElasticsearchConfig {
        &self.config
    }

    /// Get the cancellation token shared by all requests of this client.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Cancel in-flight and future requests of this client.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Build the URL of document `entity_id` of type `T`.
    pub fn document_url<T: 'static>(
        &self,
        entity_id: impl Display,
        routing: Option<&RoutingDefinition>,
    ) -> Result<String> {
        let mapping = self.resolver.resolve::<T>()?;
        self.url_for(&mapping, entity_id, routing)
    }

    // =========================================================================
    // Async API
    // =========================================================================

    /// Get a document by id.
    ///
    /// Only a `400` whose body signals a missing routing key is raised; every
    /// other status comes back in the envelope.
    pub async fn get_document<T>(
        &self,
        entity_id: impl Display,
        routing: Option<&RoutingDefinition>,
    ) -> Result<ResultDetails<T>>
    where
        T: Send + 'static,
    {
        let entity_type = std::any::type_name::<T>();
        debug!(id = %entity_id, entity_type, "Request for select document");

        let mapping = self.resolver.resolve::<T>()?;
        let url = self.url_for(&mapping, entity_id, routing)?;

        self.fetch(url, move |body| {
            let response: Value = serde_json::from_str(body)?;
            response
                .get("_source")
                .map(|source| mapping.parse_entity::<T>(source))
                .transpose()
        })
        .await
    }

    /// Get a search-style result from a caller-built URI.
    pub async fn get_uri(&self, uri: impl AsRef<str>) -> Result<ResultDetails<GetResult>> {
        debug!(result_type = "GetResult", "Request for search");

        self.fetch(uri.as_ref().to_string(), |body| {
            Ok(Some(serde_json::from_str::<GetResult>(body)?))
        })
        .await
    }

    // =========================================================================
    // Blocking API
    // =========================================================================

    /// Blocking form of [`get_document`](Self::get_document).
    ///
    /// `404` and `400` responses are raised as errors.
    pub fn get_document_blocking<T>(
        &self,
        entity_id: impl Display,
        routing: Option<RoutingDefinition>,
    ) -> Result<Option<T>>
    where
        T: Send + 'static,
    {
        let client = self.clone();
        let entity_id = entity_id.to_string();

        let details = self.executor.execute_result_details(move || async move {
            client.get_document::<T>(entity_id, routing.as_ref()).await
        })?;

        escalate(details).map(ResultDetails::into_payload)
    }

    /// Blocking form of [`get_uri`](Self::get_uri).
    ///
    /// `404` and `400` responses are raised as errors.
    pub fn get_uri_blocking(&self, uri: impl AsRef<str>) -> Result<Option<GetResult>> {
        let client = self.clone();
        let uri = uri.as_ref().to_string();

        let details = self
            .executor
            .execute_result_details(move || async move { client.get_uri(uri).await })?;

        escalate(details).map(ResultDetails::into_payload)
    }

    // =========================================================================
    // Pipeline
    // =========================================================================

    /// GET `url` and interpret the response.
    ///
    /// `parse` only sees the body of a `200 OK`.
    async fn fetch<T, P>(&self, url: String, parse: P) -> Result<ResultDetails<T>>
    where
        P: FnOnce(&str) -> Result<Option<T>>,
    {
        let mut details = ResultDetails::new(url);
        let request_url = Url::parse(&details.request_url)?;
        debug!(url = %request_url, "Request HTTP GET");

        let response = match self.until_cancelled(self.request(request_url).send()).await {
            Some(response) => response?,
            None => {
                debug!(url = %details.request_url, "Get request cancelled before response");
                return Ok(details.cancelled());
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            warn!(
                status = status.as_u16(),
                reason = status.canonical_reason().unwrap_or_default(),
                url = %details.request_url,
                "Get response status code"
            );
        }

        let body = match self.until_cancelled(response.text()).await {
            Some(body) => body?,
            None => {
                debug!(url = %details.request_url, "Get request cancelled while reading body");
                return Ok(details.cancelled());
            }
        };

        details.status = status;
        match status {
            StatusCode::OK => {
                debug!(body = %body, "Get request response");
                details.payload = parse(&body)?;
            }
            StatusCode::BAD_REQUEST if self.routing_missing.is_routing_missing(&body) => {
                return Err(ElasticsearchError::RoutingMissing(body));
            }
            _ => details.description = Some(body),
        }

        Ok(details)
    }


    /// `<base>/<index>/<docType>/<id><routingSuffix>`
    ///
    /// Each part is percent-encoded as a single path segment.
    fn url_for(
        &self,
        mapping: &EntityMapping,
        entity_id: impl Display,
        routing: Option<&RoutingDefinition>,
    ) -> Result<String> {
        let mut url = Url::parse(self.config.base_url())?;
        url.path_segments_mut()
            .map_err(|_| {
                ElasticsearchError::Configuration(format!(
                    "Connection string is not a base URL: {}",
                    self.config.connection_string
                ))
            })?
            .pop_if_empty()
            .extend([mapping.index(), mapping.doc_type(), &entity_id.to_string()]);

        Ok(format!("{}{}", url, self.routing_encoder.render(routing)))
    }

    fn request(&self, url: Url) -> reqwest::RequestBuilder {
        let request = self.http.get(url);
        match (&self.config.username, &self.config.password) {
            (Some(user), password) => request.basic_auth(user, password.as_ref()),
            _ => request,
        }
    }

    async fn until_cancelled<F: Future>(&self, future: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => None,
            output = future => Some(output),
        }
    }
}

/// Raise `404` and `400` envelopes as errors.
fn escalate<T>(details: ResultDetails<T>) -> Result<ResultDetails<T>> {
    match details.status {
        StatusCode::NOT_FOUND => {
            warn!(url = %details.request_url, "HttpStatusCode.NotFound");
            Err(ElasticsearchError::NotFound {
                url: details.request_url,
            })
        }
        StatusCode::BAD_REQUEST => {
            warn!(url = %details.request_url, "HttpStatusCode.BadRequest");
            Err(ElasticsearchError::BadRequest {
                url: details.request_url,
                description: details.description.unwrap_or_default(),
            })
        }
        _ => Ok(details),
    }
}

impl std::fmt::Debug for ElasticsearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticsearchClient")
            .field("url", &self.config.connection_string)
            .field("cancelled", &self.cancellation.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::MappingRegistry;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Order {
        #[allow(dead_code)]
        id: u64,
    }

    fn client() -> ElasticsearchClient {
        ElasticsearchClient::new(
            ElasticsearchConfig::new("https://es.local:9200/"),
            MappingRegistry::new().register_default::<Order>(),
        )
        .unwrap()
    }

    #[test]
    fn test_document_url() {
        let client = client();
        assert_eq!(
            client.document_url::<Order>(42, None).unwrap(),
            "https://es.local:9200/orders/order/42"
        );

        let routing = RoutingDefinition::new().with_parent(7);
        assert_eq!(
            client.document_url::<Order>("a1", Some(&routing)).unwrap(),
            "https://es.local:9200/orders/order/a1?parent=7"
        );
    }

    #[test]
    fn test_document_url_escapes_id() {
        let client = client();
        assert_eq!(
            client.document_url::<Order>("a#b", None).unwrap(),
            "https://es.local:9200/orders/order/a%23b"
        );
        assert_eq!(
            client.document_url::<Order>("x/y z?", None).unwrap(),
            "https://es.local:9200/orders/order/x%2Fy%20z%3F"
        );
    }

    #[test]
    fn test_document_url_keeps_base_path() {
        let client = ElasticsearchClient::new(
            ElasticsearchConfig::new("http://proxy.local/es/"),
            MappingRegistry::new().register_default::<Order>(),
        )
        .unwrap();
        assert_eq!(
            client.document_url::<Order>(1, None).unwrap(),
            "http://proxy.local/es/orders/order/1"
        );
    }

    #[test]
    fn test_document_url_unmapped_type() {
        let err = client().document_url::<String>(1, None).unwrap_err();
        assert!(matches!(err, ElasticsearchError::MappingNotFound(_)));
    }

    #[test]
    fn test_invalid_config() {
        let result = ElasticsearchClient::new(ElasticsearchConfig::new(""), MappingRegistry::new());
        assert!(matches!(result, Err(ElasticsearchError::Configuration(_))));
    }

    #[test]
    fn test_escalate() {
        let mut details: ResultDetails<u32> = ResultDetails::new("http://localhost:9200/x");
        details.status = StatusCode::NOT_FOUND;
        assert!(escalate(details).unwrap_err().is_not_found());

        let mut details: ResultDetails<u32> = ResultDetails::new("http://localhost:9200/x");
        details.status = StatusCode::BAD_REQUEST;
        details.description = Some("bad".to_string());
        match escalate(details).unwrap_err() {
            ElasticsearchError::BadRequest { description, .. } => assert_eq!(description, "bad"),
            other => panic!("unexpected error: {other}"),
        }

        let mut details: ResultDetails<u32> = ResultDetails::new("http://localhost:9200/x");
        details.status = StatusCode::SERVICE_UNAVAILABLE;
        assert_eq!(escalate(details).unwrap().status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_cancel() {
        let client = client();
        assert!(!client.cancellation_token().is_cancelled());
        client.clone().cancel();
        assert!(client.cancellation_token().is_cancelled());
    }
}
