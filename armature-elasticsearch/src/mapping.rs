//! Type-to-index mapping.
//!
//! Every entity type that can be fetched has an [`EntityMapping`]: the index
//! it lives in, its document type and a parser turning a `_source` fragment
//! into the entity. Mappings are registered up front in a [`MappingRegistry`]
//! and looked up by [`TypeId`] at fetch time.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ElasticsearchError, Result};

type ErasedEntity = Box<dyn Any + Send>;
type EntityParser = Box<dyn Fn(&Value) -> Result<ErasedEntity> + Send + Sync>;

/// Trait for entities that know their own index.
///
/// # Example
///
/// ```rust
/// use armature_elasticsearch::{Document, MappingRegistry};
/// use serde::Deserialize;
///
/// #[derive(Debug, Deserialize)]
/// struct Product {
///     name: String,
///     price: f64,
/// }
///
/// impl Document for Product {
///     fn index_name() -> &'static str {
///         "products"
///     }
/// }
///
/// let registry = MappingRegistry::new().register_document::<Product>();
/// assert!(registry.contains::<Product>());
/// ```
pub trait Document: DeserializeOwned + Send + 'static {
    /// Returns the index name for this document type.
    fn index_name() -> &'static str;

    /// Returns the document type name.
    fn doc_type() -> &'static str {
        "_doc"
    }
}

/// Index, document type and parser for one entity type.
pub struct EntityMapping {
    type_name: &'static str,
    index: String,
    doc_type: String,
    parser: EntityParser,
}

impl EntityMapping {
    /// Mapping that parses with `serde`.
    pub fn new<T>(index: impl Into<String>, doc_type: impl Into<String>) -> Self
    where
        T: DeserializeOwned + Send + 'static,
    {
        Self::with_parser::<T, _>(index, doc_type, |source| {
            Ok(serde_json::from_value::<T>(source.clone())?)
        })
    }

    /// Mapping with a custom parse function.
    pub fn with_parser<T, F>(
        index: impl Into<String>,
        doc_type: impl Into<String>,
        parse: F,
    ) -> Self
    where
        T: Send + 'static,
        F: Fn(&Value) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            type_name: std::any::type_name::<T>(),
            index: index.into(),
            doc_type: doc_type.into(),
            parser: Box::new(move |source: &Value| {
                parse(source).map(|entity| Box::new(entity) as ErasedEntity)
            }),
        }
    }

    /// Name of the mapped Rust type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Index the entity lives in.
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Document type name.
    pub fn doc_type(&self) -> &str {
        &self.doc_type
    }

    /// Parse a source fragment into `T`.
    pub fn parse_entity<T: 'static>(&self, source: &Value) -> Result<T> {
        let entity = (self.parser)(source)?;
        entity.downcast::<T>().map(|boxed| *boxed).map_err(|_| {
            ElasticsearchError::Mapping(format!(
                "mapping for {} cannot produce {}",
                self.type_name,
                std::any::type_name::<T>()
            ))
        })
    }
}

impl fmt::Debug for EntityMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityMapping")
            .field("type_name", &self.type_name)
            .field("index", &self.index)
            .field("doc_type", &self.doc_type)
            .finish()
    }
}

/// Resolves the mapping for an entity type.
pub trait MappingResolver: Send + Sync {
    /// Look up the mapping registered for `type_id`.
    fn mapping_for(&self, type_id: TypeId) -> Option<Arc<EntityMapping>>;
}

impl dyn MappingResolver {
    /// Typed lookup that fails when nothing is registered.
    pub fn resolve<T: 'static>(&self) -> Result<Arc<EntityMapping>> {
        self.mapping_for(TypeId::of::<T>())
            .ok_or_else(|| ElasticsearchError::MappingNotFound(std::any::type_name::<T>()))
    }
}

/// Explicit registry of entity mappings, built at configuration time.
#[derive(Debug, Default, Clone)]
pub struct MappingRegistry {
    mappings: HashMap<TypeId, Arc<EntityMapping>>,
}

impl MappingRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` under an explicit index and document type.
    pub fn register<T>(self, index: impl Into<String>, doc_type: impl Into<String>) -> Self
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.insert::<T>(EntityMapping::new::<T>(index, doc_type))
    }

    /// Register `T` with a custom parse function.
    pub fn register_with<T, F>(
        self,
        index: impl Into<String>,
        doc_type: impl Into<String>,
        parse: F,
    ) -> Self
    where
        T: Send + 'static,
        F: Fn(&Value) -> Result<T> + Send + Sync + 'static,
    {
        self.insert::<T>(EntityMapping::with_parser(index, doc_type, parse))
    }

    /// Register `T` with names derived from its type name.
    ///
    /// `Order` maps to index `orders`, document type `order`.
    pub fn register_default<T>(self) -> Self
    where
        T: DeserializeOwned + Send + 'static,
    {
        let doc_type = short_type_name::<T>().to_lowercase();
        let index = format!("{}s", doc_type);
        self.register::<T>(index, doc_type)
    }

    /// Register a [`Document`] type.
    pub fn register_document<T: Document>(self) -> Self {
        self.register::<T>(T::index_name(), T::doc_type())
    }

    /// Check if `T` has a mapping.
    pub fn contains<T: 'static>(&self) -> bool {
        self.mappings.contains_key(&TypeId::of::<T>())
    }

    /// Number of registered mappings.
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    fn insert<T: 'static>(mut self, mapping: EntityMapping) -> Self {
        self.mappings.insert(TypeId::of::<T>(), Arc::new(mapping));
        self
    }
}

impl MappingResolver for MappingRegistry {
    fn mapping_for(&self, type_id: TypeId) -> Option<Arc<EntityMapping>> {
        self.mappings.get(&type_id).cloned()
    }
}

/// `my_crate::model::Order<u32>` -> `Order`
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics.rsplit("::").next().unwrap_or(without_generics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Order {
        id: u64,
        total: f64,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Article {
        title: String,
    }

    impl Document for Article {
        fn index_name() -> &'static str {
            "articles"
        }
    }

    fn resolve<T: 'static>(registry: &MappingRegistry) -> Result<Arc<EntityMapping>> {
        let resolver: &dyn MappingResolver = registry;
        resolver.resolve::<T>()
    }

    #[test]
    fn test_register_and_resolve() {
        let registry = MappingRegistry::new().register::<Order>("orders", "order");
        let mapping = resolve::<Order>(&registry).unwrap();

        assert_eq!(mapping.index(), "orders");
        assert_eq!(mapping.doc_type(), "order");
        assert!(mapping.type_name().ends_with("Order"));
    }

    #[test]
    fn test_resolve_unregistered_type() {
        let registry = MappingRegistry::new();
        let err = resolve::<Order>(&registry).unwrap_err();
        assert!(matches!(err, ElasticsearchError::MappingNotFound(name) if name.ends_with("Order")));
    }

    #[test]
    fn test_parse_entity() {
        let registry = MappingRegistry::new().register::<Order>("orders", "order");
        let mapping = resolve::<Order>(&registry).unwrap();

        let order: Order = mapping.parse_entity(&json!({"id": 42, "total": 9.5})).unwrap();
        assert_eq!(order, Order { id: 42, total: 9.5 });

        let err = mapping.parse_entity::<Order>(&json!({"id": "x"})).unwrap_err();
        assert!(matches!(err, ElasticsearchError::Serialization(_)));
    }

    #[test]
    fn test_parse_entity_wrong_type() {
        let mapping = EntityMapping::new::<Order>("orders", "order");
        let err = mapping
            .parse_entity::<Article>(&json!({"id": 1, "total": 1.0}))
            .unwrap_err();
        assert!(matches!(err, ElasticsearchError::Mapping(_)));
    }

    #[test]
    fn test_register_with_custom_parser() {
        let registry = MappingRegistry::new().register_with::<Order, _>("orders", "order", |source| {
            Ok(Order {
                id: source["order_id"].as_u64().unwrap_or_default(),
                total: source["amount"]["value"].as_f64().unwrap_or_default(),
            })
        });

        let order: Order = resolve::<Order>(&registry)
            .unwrap()
            .parse_entity(&json!({"order_id": 7, "amount": {"value": 12.25}}))
            .unwrap();
        assert_eq!(order, Order { id: 7, total: 12.25 });
    }

    #[test]
    fn test_register_default_names() {
        let registry = MappingRegistry::new().register_default::<Order>();
        let mapping = resolve::<Order>(&registry).unwrap();
        assert_eq!(mapping.index(), "orders");
        assert_eq!(mapping.doc_type(), "order");
    }

    #[test]
    fn test_register_document() {
        let registry = MappingRegistry::new()
            .register_document::<Article>()
            .register_default::<Order>();
        let mapping = resolve::<Article>(&registry).unwrap();
        assert_eq!(mapping.index(), "articles");
        assert_eq!(mapping.doc_type(), "_doc");
        assert_eq!(registry.len(), 2);
        assert!(registry.contains::<Order>());
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name::<Order>(), "Order");
        assert_eq!(short_type_name::<Vec<Order>>(), "Vec");
        assert_eq!(short_type_name::<u32>(), "u32");
    }
}
