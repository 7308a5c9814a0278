use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::json_map_store::JsonMapStore;
use super::object_id::{is_object_id, new_object_id};
use super::{into_body, matches, with_id, Document, Filter, Store};
use crate::errors::StoreError;

type Collection = BTreeMap<String, Map<String, Value>>;

/// Store persisted to a single JSON file: `{ collection: { id: body } }`.
///
/// Same id scheme and semantics as [`MemoryStore`](super::MemoryStore), but
/// survives restarts.
pub struct JsonFileStore {
    map: Arc<JsonMapStore<String, Collection>>,
    closed: AtomicBool,
}

impl JsonFileStore {
    pub async fn open<P: Into<PathBuf>>(path: P) -> Result<Self, StoreError> {
        let path = path.into();
        let map = JsonMapStore::new(path.clone()).await?;
        info!(path = %path.display(), "file store opened");
        Ok(Self { map, closed: AtomicBool::new(false) })
    }

    fn check(&self, id: Option<&str>) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        match id {
            Some(id) if !is_object_id(id) => Err(StoreError::InvalidId(id.to_string())),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Store for JsonFileStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Document, StoreError> {
        self.check(Some(id))?;
        self.map
            .view(|m| m.get(collection).and_then(|c| c.get(id)).map(|body| with_id(body, id)))
            .await
            .ok_or(StoreError::NotFound)
    }

    async fn create(&self, collection: &str, data: Document) -> Result<Document, StoreError> {
        self.check(None)?;
        let body = into_body(data)?;
        let id = new_object_id();
        self.map
            .update_map(|m| {
                m.entry(collection.to_string()).or_default().insert(id.clone(), body);
                Ok(())
            })
            .await?;
        debug!(%collection, %id, "file store created document");
        self.get(collection, &id).await
    }

    async fn list(&self, collection: &str, filter: Option<&Filter>) -> Result<Vec<Document>, StoreError> {
        self.check(None)?;
        Ok(self
            .map
            .view(|m| {
                m.get(collection)
                    .map(|c| {
                        c.iter()
                            .map(|(id, body)| with_id(body, id))
                            .filter(|doc| matches(doc, filter))
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default()
            })
            .await)
    }

    async fn update(&self, collection: &str, id: &str, data: Document) -> Result<Document, StoreError> {
        self.check(Some(id))?;
        let body = into_body(data)?;
        self.map
            .update_map(|m| {
                let slot = m
                    .get_mut(collection)
                    .and_then(|c| c.get_mut(id))
                    .ok_or(StoreError::NotFound)?;
                *slot = body;
                Ok(())
            })
            .await?;
        self.get(collection, id).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.check(Some(id))?;
        self.map
            .update_map(|m| {
                m.get_mut(collection)
                    .and_then(|c| c.remove(id))
                    .map(|_| ())
                    .ok_or(StoreError::NotFound)
            })
            .await
    }

    async fn close(&self) {
        // Every write is already flushed; just refuse further work.
        self.closed.store(true, Ordering::Release);
    }
}
