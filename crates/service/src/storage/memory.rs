use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};
use tracing::debug;

use super::object_id::{is_object_id, new_object_id};
use super::{into_body, matches, with_id, Document, Filter, Store};
use crate::errors::StoreError;

type Collection = BTreeMap<String, Map<String, Value>>;

/// Process-local store. Collections are created on first write and list in
/// insertion order.
#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<String, Collection>,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
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
impl Store for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Document, StoreError> {
        self.check(Some(id))?;
        self.collections
            .get(collection)
            .and_then(|c| c.get(id).map(|body| with_id(body, id)))
            .ok_or(StoreError::NotFound)
    }

    async fn create(&self, collection: &str, data: Document) -> Result<Document, StoreError> {
        self.check(None)?;
        let body = into_body(data)?;
        let id = new_object_id();
        let doc = with_id(&body, &id);
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), body);
        debug!(%collection, %id, "memory store created document");
        Ok(doc)
    }

    async fn list(&self, collection: &str, filter: Option<&Filter>) -> Result<Vec<Document>, StoreError> {
        self.check(None)?;
        let Some(c) = self.collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(c.iter()
            .map(|(id, body)| with_id(body, id))
            .filter(|doc| matches(doc, filter))
            .collect())
    }

    async fn update(&self, collection: &str, id: &str, data: Document) -> Result<Document, StoreError> {
        self.check(Some(id))?;
        let body = into_body(data)?;
        let mut c = self
            .collections
            .get_mut(collection)
            .ok_or(StoreError::NotFound)?;
        let slot = c.get_mut(id).ok_or(StoreError::NotFound)?;
        *slot = body;
        Ok(with_id(slot, id))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.check(Some(id))?;
        self.collections
            .get_mut(collection)
            .and_then(|mut c| c.remove(id))
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.collections.clear();
    }
}
