//! Binding between a record type, its store and its request bodies
//!
//! The generic CRUD handlers only know about `Resource`: how to find the
//! store for `T`, how to build a record from a create body and how to apply
//! an update body. Foreign keys are checked in `check_references` before
//! anything is written, and `check_delete` may look at other stores before a
//! record is soft deleted.

use crate::config::AppConfig;
use crate::core::Data;
use crate::core::error::AppResult;
use crate::core::service::DataService;
use crate::storage::Stores;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use validator::{Validate, ValidationErrors};

#[async_trait]
pub trait Resource: Data + Serialize + DeserializeOwned {
    /// Body accepted by `POST /{plural}`
    type Create: DeserializeOwned + Validate + Send + 'static;

    /// Body accepted by `PUT /{plural}/{id}`
    type Update: DeserializeOwned + Validate + Send + 'static;

    fn store(stores: &Stores) -> Arc<dyn DataService<Self>>;

    fn from_create(input: Self::Create, config: &AppConfig) -> AppResult<Self>;

    fn apply_update(&mut self, input: Self::Update, config: &AppConfig) -> AppResult<()>;

    /// Verify that every id this record points at exists
    async fn check_references(&self, _stores: &Stores) -> AppResult<()> {
        Ok(())
    }

    /// Refuse soft deletes that would orphan money or custody records
    async fn check_delete(&self, _stores: &Stores) -> AppResult<()> {
        Ok(())
    }
}

/// Input type for operations a resource does not accept through the
/// generic routes. It has no values, so such a body can never deserialize.
#[derive(Debug, serde::Deserialize)]
pub enum NoInput {}

impl Validate for NoInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        match *self {}
    }
}
