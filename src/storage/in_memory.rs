//! In-memory implementation of DataService for development and tests

use crate::core::{Data, DataService};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// In-memory record store
///
/// Uses RwLock for thread-safe access. Clones share the same map.
#[derive(Clone)]
pub struct InMemoryDataService<T> {
    records: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T> InMemoryDataService<T> {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<T> Default for InMemoryDataService<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Data> DataService<T> for InMemoryDataService<T> {
    async fn create(&self, entity: T) -> Result<T> {
        let mut records = self
            .records
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        if records.contains_key(&entity.id()) {
            return Err(anyhow!("{} {} already exists", T::resource_name_singular(), entity.id()));
        }
        records.insert(entity.id(), entity.clone());

        Ok(entity)
    }

    async fn get(&self, id: &Uuid) -> Result<Option<T>> {
        let records = self
            .records
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(records.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<T>> {
        let records = self
            .records
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        let mut all: Vec<T> = records.values().cloned().collect();
        all.sort_by_key(|e| (e.created_at(), e.id()));
        Ok(all)
    }

    async fn update(&self, id: &Uuid, entity: T) -> Result<T> {
        let mut records = self
            .records
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        records
            .get_mut(id)
            .ok_or_else(|| anyhow!("{} {} not found", T::resource_name_singular(), id))?;

        records.insert(*id, entity.clone());

        Ok(entity)
    }

    async fn delete(&self, id: &Uuid) -> Result<()> {
        let mut records = self
            .records
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        records.remove(id);

        Ok(())
    }

    async fn search(&self, field: &str, value: &str) -> Result<Vec<T>> {
        let records = self
            .records
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        let mut found: Vec<T> = records
            .values()
            .filter(|e| e.field_matches(field, value))
            .cloned()
            .collect();
        found.sort_by_key(|e| (e.created_at(), e.id()));
        Ok(found)
    }
}
