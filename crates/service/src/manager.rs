//! Managers bridge the HTTP dispatcher and a [`Store`].
//!
//! A concrete manager supplies the entity type (construction and decoding)
//! and embeds a [`DefaultManager`] that carries the collection name and the
//! store. The CRUD operations of [`ResourceManager`] default to forwarding to
//! that embedded base.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use models::Entity;

use crate::errors::ManagerError;
use crate::query::QueryParams;
use crate::storage::{Document, Filter, Store};

/// Everything the dispatcher needs from a collection.
#[async_trait]
pub trait ResourceManager: Send + Sync + 'static {
    type Entity: Entity;

    /// The embedded storage delegate.
    fn base(&self) -> &DefaultManager;

    /// Collection name: URL segment and store namespace.
    fn name(&self) -> &str {
        self.base().name()
    }

    /// An empty, id-less entity.
    fn new_entity(&self) -> Self::Entity;

    /// Decode a request body. Must not touch the store.
    fn decode(&self, body: &[u8]) -> Result<Self::Entity, ManagerError>;

    async fn get(&self, id: &str, query: &QueryParams) -> Result<Document, ManagerError> {
        self.base().get(id, query).await
    }

    async fn create(&self, entity: Self::Entity, query: &QueryParams) -> Result<Document, ManagerError> {
        self.base().create(&entity, query).await
    }

    async fn list(&self, query: &QueryParams) -> Result<Vec<Document>, ManagerError> {
        self.base().list(query).await
    }

    async fn update(
        &self,
        id: &str,
        entity: Self::Entity,
        query: &QueryParams,
    ) -> Result<Document, ManagerError> {
        self.base().update(id, &entity, query).await
    }

    async fn delete(&self, id: &str, query: &QueryParams) -> Result<(), ManagerError> {
        self.base().delete(id, query).await
    }
}

/// Collection name plus store. Forwards CRUD straight to the store and
/// passes store errors through untouched. Query parameters are accepted and
/// ignored.
///
/// It deliberately does not implement [`ResourceManager`]: without an entity
/// type there is nothing to construct or decode.
#[derive(Clone)]
pub struct DefaultManager {
    name: String,
    store: Arc<dyn Store>,
}

fn to_document<E: Serialize + ?Sized>(entity: &E) -> Result<Document, ManagerError> {
    serde_json::to_value(entity).map_err(|e| ManagerError::Encode(e.to_string()))
}

impl DefaultManager {
    pub fn new(name: impl Into<String>, store: Arc<dyn Store>) -> Self {
        Self { name: name.into(), store }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub async fn get(&self, id: &str, _query: &QueryParams) -> Result<Document, ManagerError> {
        Ok(self.store.get(&self.name, id).await?)
    }

    pub async fn create<E>(&self, entity: &E, _query: &QueryParams) -> Result<Document, ManagerError>
    where
        E: Serialize + Sync + ?Sized,
    {
        let data = to_document(entity)?;
        let created = self.store.create(&self.name, data).await?;
        debug!(collection = %self.name, id = ?created.get("id"), "created entity");
        Ok(created)
    }

    pub async fn list(&self, _query: &QueryParams) -> Result<Vec<Document>, ManagerError> {
        Ok(self.store.list(&self.name, None).await?)
    }

    /// List with a store-level filter, for managers that interpret their query.
    pub async fn list_matching(&self, filter: &Filter) -> Result<Vec<Document>, ManagerError> {
        Ok(self.store.list(&self.name, Some(filter)).await?)
    }

    pub async fn update<E>(&self, id: &str, entity: &E, _query: &QueryParams) -> Result<Document, ManagerError>
    where
        E: Serialize + Sync + ?Sized,
    {
        let data = to_document(entity)?;
        Ok(self.store.update(&self.name, id, data).await?)
    }

    pub async fn delete(&self, id: &str, _query: &QueryParams) -> Result<(), ManagerError> {
        Ok(self.store.delete(&self.name, id).await?)
    }
}
