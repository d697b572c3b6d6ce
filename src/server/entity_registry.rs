//! Registry of record types exposed over HTTP

use super::host::ServerHost;
use axum::Router;
use std::collections::BTreeMap;

/// Route source for one record type
pub trait EntityDescriptor: Send + Sync {
    /// Type tag, e.g. "client"
    fn entity_type(&self) -> &str;

    /// URL collection, e.g. "clients"
    fn plural(&self) -> &str;

    /// `/{plural}` and `/{plural}/{id}` routes
    fn build_routes(&self) -> Router<ServerHost>;
}

/// Descriptors keyed by type tag, kept in sorted order so route merging and
/// startup logs are deterministic.
#[derive(Default)]
pub struct EntityRegistry {
    descriptors: BTreeMap<String, Box<dyn EntityDescriptor>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a descriptor; a later registration for the same type wins
    pub fn register(&mut self, descriptor: Box<dyn EntityDescriptor>) {
        let entity_type = descriptor.entity_type().to_string();
        if self.descriptors.contains_key(&entity_type) {
            tracing::debug!(%entity_type, "replacing entity descriptor");
        }
        self.descriptors.insert(entity_type, descriptor);
    }

    pub fn build_routes(&self) -> Router<ServerHost> {
        self.descriptors
            .values()
            .fold(Router::new(), |router, d| router.merge(d.build_routes()))
    }

    pub fn entity_types(&self) -> Vec<&str> {
        self.descriptors.keys().map(String::as_str).collect()
    }

    /// `/{plural}` for every registered type
    pub fn collection_paths(&self) -> Vec<String> {
        self.descriptors
            .values()
            .map(|d| format!("/{}", d.plural()))
            .collect()
    }

    pub fn plural_of(&self, entity_type: &str) -> Option<&str> {
        self.descriptors.get(entity_type).map(|d| d.plural())
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
