//! Service trait for record storage

use crate::core::Data;
use crate::core::error::{AppResult, EntityError};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Service trait for managing data entities
///
/// Implementations provide CRUD operations for a specific entity type.
/// Domain services are agnostic to the underlying storage mechanism.
#[async_trait]
pub trait DataService<T: Data>: Send + Sync {
    async fn create(&self, entity: T) -> Result<T>;

    async fn get(&self, id: &Uuid) -> Result<Option<T>>;

    /// List all entities, soft-deleted ones included, oldest first
    async fn list(&self) -> Result<Vec<T>>;

    /// Update an existing entity
    async fn update(&self, id: &Uuid, entity: T) -> Result<T>;

    /// Write back a record under its own id
    async fn save(&self, entity: T) -> Result<T> {
        let id = entity.id();
        self.update(&id, entity).await
    }

    /// Delete an entity permanently
    async fn delete(&self, id: &Uuid) -> Result<()>;

    /// Search entities by field value
    async fn search(&self, field: &str, value: &str) -> Result<Vec<T>>;
}

/// The one lock every read-modify-write cycle runs under.
///
/// Clones share the same mutex, so domain services and the generic routes
/// serialise against each other. Work that calls into another service while
/// already holding the lock passes its [`WriteGuard`] along instead of
/// locking again.
#[derive(Clone, Default)]
pub struct WriteLock(Arc<Mutex<()>>);

/// Proof that the caller holds the [`WriteLock`]
pub struct WriteGuard<'a> {
    _held: MutexGuard<'a, ()>,
}

impl WriteLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self) -> WriteGuard<'_> {
        WriteGuard {
            _held: self.0.lock().await,
        }
    }

    /// Whether nobody holds the lock right now
    pub fn is_free(&self) -> bool {
        self.0.try_lock().is_ok()
    }
}

/// Fetch a live (not soft-deleted) record or fail with `EntityError::NotFound`
pub async fn fetch_required<T: Data>(service: &dyn DataService<T>, id: Uuid) -> AppResult<T> {
    match service.get(&id).await? {
        Some(entity) if !entity.is_deleted() => Ok(entity),
        _ => Err(EntityError::not_found(T::resource_name_singular(), id).into()),
    }
}

/// Search and drop soft-deleted records
pub async fn search_live<T: Data>(
    service: &dyn DataService<T>,
    field: &str,
    value: &str,
) -> AppResult<Vec<T>> {
    Ok(service
        .search(field, value)
        .await?
        .into_iter()
        .filter(|e| !e.is_deleted())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_clones_share_one_lock() {
        let lock = WriteLock::new();
        let other = lock.clone();

        let guard = lock.acquire().await;
        assert!(!other.is_free());
        let waiting = tokio::time::timeout(Duration::from_millis(20), other.acquire()).await;
        assert!(waiting.is_err());

        drop(guard);
        assert!(other.is_free());
        let _guard = other.acquire().await;
        assert!(!lock.is_free());
    }
}
