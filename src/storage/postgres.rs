//! PostgreSQL storage backend using sqlx.
//!
//! Every entity type shares one `entities` table. The common columns (id,
//! entity_type, name, status, timestamps) are stored as columns so they can
//! be filtered in SQL; the full record is kept in a JSONB `data` column.
//!
//! # Feature flag
//!
//! This module is gated behind the `postgres` feature flag.

use crate::core::{Data, DataService};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::PgPool;
use std::marker::PhantomData;
use uuid::Uuid;

/// Columns mirrored out of the JSON payload
const COLUMN_FIELDS: &[&str] = &["id", "name", "status"];

/// Create the shared table if it does not exist yet
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS entities (
            id UUID PRIMARY KEY,
            entity_type TEXT NOT NULL,
            name TEXT NOT NULL,
            status TEXT NOT NULL,
            data JSONB NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL,
            deleted_at TIMESTAMPTZ
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| anyhow!("Failed to create entities table: {}", e))?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_entities_type ON entities (entity_type, created_at)")
        .execute(pool)
        .await
        .map_err(|e| anyhow!("Failed to create entities index: {}", e))?;

    Ok(())
}

/// Generic data storage service backed by PostgreSQL.
#[derive(Clone, Debug)]
pub struct PostgresDataService<T> {
    pool: PgPool,
    _marker: PhantomData<T>,
}

impl<T> PostgresDataService<T> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _marker: PhantomData,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn decode<T: DeserializeOwned>(data: serde_json::Value) -> Result<T> {
    serde_json::from_value(data).map_err(|e| anyhow!("Failed to decode record: {}", e))
}

fn encode<T: Serialize>(entity: &T) -> Result<serde_json::Value> {
    serde_json::to_value(entity).map_err(|e| anyhow!("Failed to encode record: {}", e))
}

#[async_trait]
impl<T> DataService<T> for PostgresDataService<T>
where
    T: Data + Serialize + DeserializeOwned,
{
    async fn create(&self, entity: T) -> Result<T> {
        sqlx::query(
            r#"
            INSERT INTO entities (id, entity_type, name, status, data, created_at, updated_at, deleted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entity.id())
        .bind(T::resource_name_singular())
        .bind(entity.name())
        .bind(entity.status())
        .bind(encode(&entity)?)
        .bind(entity.created_at())
        .bind(entity.updated_at())
        .bind(entity.deleted_at())
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow!("Failed to insert {}: {}", T::resource_name_singular(), e))?;

        Ok(entity)
    }

    async fn get(&self, id: &Uuid) -> Result<Option<T>> {
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT data FROM entities WHERE id = $1 AND entity_type = $2")
                .bind(id)
                .bind(T::resource_name_singular())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| anyhow!("Failed to fetch {}: {}", T::resource_name_singular(), e))?;

        row.map(|(data,)| decode(data)).transpose()
    }

    async fn list(&self) -> Result<Vec<T>> {
        let rows: Vec<(serde_json::Value,)> = sqlx::query_as(
            "SELECT data FROM entities WHERE entity_type = $1 ORDER BY created_at, id",
        )
        .bind(T::resource_name_singular())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| anyhow!("Failed to list {}: {}", T::resource_name(), e))?;

        rows.into_iter().map(|(data,)| decode(data)).collect()
    }

    async fn update(&self, id: &Uuid, entity: T) -> Result<T> {
        let result = sqlx::query(
            r#"
            UPDATE entities
            SET name = $3, status = $4, data = $5, updated_at = $6, deleted_at = $7
            WHERE id = $1 AND entity_type = $2
            "#,
        )
        .bind(id)
        .bind(T::resource_name_singular())
        .bind(entity.name())
        .bind(entity.status())
        .bind(encode(&entity)?)
        .bind(entity.updated_at())
        .bind(entity.deleted_at())
        .execute(&self.pool)
        .await
        .map_err(|e| anyhow!("Failed to update {}: {}", T::resource_name_singular(), e))?;

        if result.rows_affected() == 0 {
            return Err(anyhow!("{} {} not found", T::resource_name_singular(), id));
        }
        Ok(entity)
    }

    async fn delete(&self, id: &Uuid) -> Result<()> {
        sqlx::query("DELETE FROM entities WHERE id = $1 AND entity_type = $2")
            .bind(id)
            .bind(T::resource_name_singular())
            .execute(&self.pool)
            .await
            .map_err(|e| anyhow!("Failed to delete {}: {}", T::resource_name_singular(), e))?;
        Ok(())
    }

    async fn search(&self, field: &str, value: &str) -> Result<Vec<T>> {
        // Column fields are compared directly, the rest through the JSON payload
        let column = COLUMN_FIELDS.contains(&field);
        let sql = if column {
            format!(
                "SELECT data FROM entities WHERE entity_type = $1 AND lower({}::text) = lower($2) ORDER BY created_at, id",
                field
            )
        } else {
            "SELECT data FROM entities WHERE entity_type = $1 AND lower(data->>$3) = lower($2) ORDER BY created_at, id"
                .to_string()
        };

        let mut query = sqlx::query_as::<_, (serde_json::Value,)>(&sql)
            .bind(T::resource_name_singular())
            .bind(value);
        if !column {
            query = query.bind(field);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| anyhow!("Failed to search {}: {}", T::resource_name(), e))?;

        rows.into_iter().map(|(data,)| decode(data)).collect()
    }
}
