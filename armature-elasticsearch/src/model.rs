//! Response shapes and entity context.

use std::any::TypeId;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::routing::RoutingDefinition;

/// Runtime identity of an entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityType {
    /// Type id used for mapping lookups.
    pub type_id: TypeId,
    /// Fully qualified type name.
    pub name: &'static str,
}

impl EntityType {
    /// Identity of `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }
}

/// A pending mutation: which document, of which type, routed how.
#[derive(Debug, Clone)]
pub struct EntityContextInfo {
    /// Document id.
    pub id: String,
    /// Entity type of the document.
    pub entity_type: EntityType,
    /// Entity type of the parent, for child documents.
    pub parent_entity_type: Option<EntityType>,
    /// Routing for the document.
    pub routing_definition: RoutingDefinition,
    /// Whether the document is to be deleted.
    pub delete_document: bool,
    /// Serialized document body.
    pub document: Option<Value>,
}

impl EntityContextInfo {
    /// Context for document `id` of type `T`.
    pub fn new<T: 'static>(id: impl ToString) -> Self {
        Self {
            id: id.to_string(),
            entity_type: EntityType::of::<T>(),
            parent_entity_type: None,
            routing_definition: RoutingDefinition::default(),
            delete_document: false,
            document: None,
        }
    }

    /// Mark as a child of a `P` document with id `parent_id`.
    pub fn with_parent<P: 'static>(mut self, parent_id: impl ToString) -> Self {
        self.parent_entity_type = Some(EntityType::of::<P>());
        self.routing_definition.parent_id = Some(parent_id.to_string());
        self
    }

    /// Set an explicit routing key.
    pub fn with_routing(mut self, routing_id: impl ToString) -> Self {
        self.routing_definition.routing_id = Some(routing_id.to_string());
        self
    }

    /// Attach the document body.
    pub fn with_document<T: Serialize>(mut self, document: &T) -> Result<Self> {
        self.document = Some(serde_json::to_value(document)?);
        Ok(self)
    }

    /// Mark for deletion.
    pub fn delete(mut self) -> Self {
        self.delete_document = true;
        self
    }

    /// Check if this describes a child document.
    pub fn is_child(&self) -> bool {
        self.parent_entity_type.is_some()
    }
}

/// Generic search-style response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GetResult {
    /// Milliseconds the request took on the server.
    pub took: Option<u64>,
    /// Whether the request timed out.
    pub timed_out: bool,
    /// Shard statistics.
    #[serde(rename = "_shards")]
    pub shards: Option<Shards>,
    /// Matching documents.
    pub hits: Hits,
    /// Scroll cursor, for scrolled searches.
    #[serde(rename = "_scroll_id", skip_serializing_if = "Option::is_none")]
    pub scroll_id: Option<String>,
    /// Raw aggregation results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregations: Option<Value>,
}

impl GetResult {
    /// Total number of matching documents.
    pub fn total_hits(&self) -> u64 {
        self.hits.total.value()
    }

    /// Deserialize the `_source` of every hit that has one.
    pub fn sources<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        self.hits
            .hits
            .iter()
            .filter_map(|hit| hit.source_as::<T>().transpose())
            .collect()
    }
}

/// Shard statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Shards {
    /// Shards queried.
    pub total: u32,
    /// Shards that answered.
    pub successful: u32,
    /// Shards skipped.
    pub skipped: u32,
    /// Shards that failed.
    pub failed: u32,
}

/// Hits section of a search response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Hits {
    /// Total count.
    pub total: HitsTotal,
    /// Best score.
    pub max_score: Option<f64>,
    /// Returned documents.
    pub hits: Vec<Hit>,
}

/// Total hit count: a bare number, or `{ "value", "relation" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HitsTotal {
    /// Legacy form.
    Count(u64),
    /// Object form.
    Detailed {
        /// Count.
        value: u64,
        /// `eq`, or `gte` when the count is a lower bound.
        relation: String,
    },
}

impl HitsTotal {
    /// The count.
    pub fn value(&self) -> u64 {
        match self {
            Self::Count(value) | Self::Detailed { value, .. } => *value,
        }
    }
}

impl Default for HitsTotal {
    fn default() -> Self {
        Self::Count(0)
    }
}

/// A single search hit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Hit {
    /// Index of the document.
    #[serde(rename = "_index")]
    pub index: String,
    /// Document type.
    #[serde(rename = "_type", skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    /// Document id.
    #[serde(rename = "_id")]
    pub id: String,
    /// Relevance score.
    #[serde(rename = "_score")]
    pub score: Option<f64>,
    /// Routing value.
    #[serde(rename = "_routing", skip_serializing_if = "Option::is_none")]
    pub routing: Option<String>,
    /// Stored document.
    #[serde(rename = "_source", skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
}

impl Hit {
    /// Deserialize `_source` into `T`.
    pub fn source_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        self.source
            .as_ref()
            .map(|source| serde_json::from_value(source.clone()))
            .transpose()
            .map_err(Into::into)
    }
}
