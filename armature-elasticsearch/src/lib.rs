//! Elasticsearch document retrieval for the Armature framework.
//!
//! This crate reads typed documents from an Elasticsearch-style cluster:
//! - Get-by-id into a registered entity type, with optional shard routing
//! - Get from a caller-built URI into a generic search result
//! - A status-carrying result envelope instead of errors for HTTP statuses
//! - Blocking wrappers that are safe to call from inside a tokio runtime
//!
//! # Example
//!
//! ```rust,no_run
//! use armature_elasticsearch::{ElasticsearchClient, ElasticsearchConfig, MappingRegistry};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct Order {
//!     id: u64,
//!     total: f64,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mappings = MappingRegistry::new().register::<Order>("orders", "order");
//!     let client = ElasticsearchClient::new(
//!         ElasticsearchConfig::new("http://localhost:9200"),
//!         mappings,
//!     )?;
//!
//!     // Async: statuses come back as data
//!     let details = client.get_document::<Order>(42, None).await?;
//!     println!("{} -> {:?}", details.status, details.payload);
//!
//!     // Search-style result from a raw URI
//!     let result = client
//!         .get_uri("http://localhost:9200/orders/_search?q=total:>5")
//!         .await?;
//!     if let Some(result) = result.payload {
//!         println!("{} hits", result.total_hits());
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod client;
mod config;
mod error;
mod mapping;
mod model;
mod result;
mod routing;
mod sync_bridge;

pub use client::ElasticsearchClient;
pub use config::{DEFAULT_ROUTING_MISSING_MARKER, ElasticsearchConfig};
pub use error::{ElasticsearchError, Result};
pub use mapping::{Document, EntityMapping, MappingRegistry, MappingResolver};
pub use model::{EntityContextInfo, EntityType, GetResult, Hit, Hits, HitsTotal, Shards};
pub use result::{Completion, ResultDetails};
pub use routing::{
    MarkerPredicate, QueryRoutingEncoder, RoutingDefinition, RoutingEncoder,
    RoutingMissingPredicate,
};
pub use sync_bridge::SyncExecutor;

// Re-export common types
pub use http::StatusCode;
pub use tokio_util::sync::CancellationToken;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        Document, ElasticsearchClient, ElasticsearchConfig, ElasticsearchError, GetResult,
        MappingRegistry, Result, ResultDetails, RoutingDefinition,
    };
}
