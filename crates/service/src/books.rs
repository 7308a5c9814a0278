//! The example `books` collection.

use std::sync::Arc;

use models::book::Book;

use crate::errors::ManagerError;
use crate::manager::{DefaultManager, ResourceManager};
use crate::storage::Store;

pub struct BookManager {
    base: DefaultManager,
}

impl BookManager {
    pub fn new(name: impl Into<String>, store: Arc<dyn Store>) -> Self {
        Self { base: DefaultManager::new(name, store) }
    }
}

impl ResourceManager for BookManager {
    type Entity = Book;

    fn base(&self) -> &DefaultManager {
        &self.base
    }

    fn new_entity(&self) -> Book {
        Book::default()
    }

    fn decode(&self, body: &[u8]) -> Result<Book, ManagerError> {
        serde_json::from_slice(body).map_err(ManagerError::decode)
    }
}
