//! Generic CRUD handlers for every [`Resource`]
//!
//! ```text
//! GET    /{plural}        list (QueryParams: page, limit, sort, status, client_id, q)
//! POST   /{plural}        create (or an entity-specific override)
//! GET    /{plural}/{id}   fetch one live record
//! PUT    /{plural}/{id}   apply an update body
//! DELETE /{plural}/{id}   soft delete
//! ```

use super::entity_registry::EntityDescriptor;
use super::host::ServerHost;
use crate::core::error::AppResult;
use crate::core::events::{DomainEvent, EntityEvent};
use crate::core::query::{PaginatedResponse, QueryParams};
use crate::core::service::fetch_required;
use crate::core::validation::{Path, Query};
use crate::core::{Resource, ValidatedJson};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{MethodRouter, get, post};
use axum::{Json, Router};
use std::marker::PhantomData;
use uuid::Uuid;

pub async fn list_entities<T: Resource>(
    State(host): State<ServerHost>,
    Query(params): Query<QueryParams>,
) -> AppResult<Json<PaginatedResponse<T>>> {
    let all = T::store(&host.stores).list().await?;
    Ok(Json(params.apply(all)))
}

pub async fn get_entity<T: Resource>(
    State(host): State<ServerHost>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<T>> {
    let store = T::store(&host.stores);
    Ok(Json(fetch_required(store.as_ref(), id).await?))
}

pub async fn create_entity<T: Resource>(
    State(host): State<ServerHost>,
    ValidatedJson(input): ValidatedJson<T::Create>,
) -> AppResult<(StatusCode, Json<T>)> {
    let _guard = host.stores.write_lock.acquire().await;
    let entity = T::from_create(input, &host.config)?;
    entity.check_references(&host.stores).await?;
    let entity = T::store(&host.stores).create(entity).await?;

    tracing::info!(entity_type = T::resource_name_singular(), id = %entity.id(), "created");
    host.event_bus.publish(DomainEvent::Entity(EntityEvent::Created {
        entity_type: T::resource_name_singular().to_string(),
        entity_id: entity.id(),
    }));

    Ok((StatusCode::CREATED, Json(entity)))
}

pub async fn update_entity<T: Resource>(
    State(host): State<ServerHost>,
    Path(id): Path<Uuid>,
    ValidatedJson(input): ValidatedJson<T::Update>,
) -> AppResult<Json<T>> {
    let store = T::store(&host.stores);
    let _guard = host.stores.write_lock.acquire().await;
    let mut entity = fetch_required(store.as_ref(), id).await?;
    entity.apply_update(input, &host.config)?;
    entity.check_references(&host.stores).await?;
    let entity = store.update(&id, entity).await?;

    host.event_bus.publish(DomainEvent::Entity(EntityEvent::Updated {
        entity_type: T::resource_name_singular().to_string(),
        entity_id: id,
    }));

    Ok(Json(entity))
}

pub async fn delete_entity<T: Resource>(
    State(host): State<ServerHost>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let store = T::store(&host.stores);
    let _guard = host.stores.write_lock.acquire().await;
    let mut entity = fetch_required(store.as_ref(), id).await?;
    entity.check_delete(&host.stores).await?;
    entity.mark_deleted();
    store.update(&id, entity).await?;

    tracing::info!(entity_type = T::resource_name_singular(), %id, "soft deleted");
    host.event_bus.publish(DomainEvent::Entity(EntityEvent::Deleted {
        entity_type: T::resource_name_singular().to_string(),
        entity_id: id,
    }));

    Ok(StatusCode::NO_CONTENT)
}

/// CRUD routes for one resource type
///
/// Records whose creation needs more than a body (appointments are booked,
/// invoices are assembled, payments are tendered) swap in their own
/// `POST /{plural}` handler.
pub struct CrudDescriptor<T> {
    create: Option<fn() -> MethodRouter<ServerHost>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Resource> CrudDescriptor<T> {
    pub fn new() -> Self {
        Self {
            create: None,
            _marker: PhantomData,
        }
    }

    pub fn with_create(mut self, create: fn() -> MethodRouter<ServerHost>) -> Self {
        self.create = Some(create);
        self
    }
}

impl<T: Resource> Default for CrudDescriptor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Resource> EntityDescriptor for CrudDescriptor<T> {
    fn entity_type(&self) -> &str {
        T::resource_name_singular()
    }

    fn plural(&self) -> &str {
        T::resource_name()
    }

    fn build_routes(&self) -> Router<ServerHost> {
        let create = match self.create {
            Some(build) => build(),
            None => post(create_entity::<T>),
        };

        Router::new()
            .route(
                &format!("/{}", T::resource_name()),
                get(list_entities::<T>).merge(create),
            )
            .route(
                &format!("/{}/{{id}}", T::resource_name()),
                get(get_entity::<T>)
                    .put(update_entity::<T>)
                    .delete(delete_entity::<T>),
            )
    }
}
