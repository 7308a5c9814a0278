//! Storage abstractions for the resource layer
//!
//! `Store` is the narrow contract managers talk to. Documents are JSON
//! objects; every backend reports the assigned identity in the `"id"` member.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::errors::StoreError;

pub mod json_map_store;
pub mod object_id;
pub mod memory;
pub mod file;
pub mod seaorm;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use seaorm::SeaOrmStore;

/// A stored entity in its JSON form.
pub type Document = Value;

/// Top-level equality filter: a document matches when every member of the
/// filter equals the same member of the document.
pub type Filter = Map<String, Value>;

/// Persistence backend keyed by collection name and entity id.
///
/// Implementations must be safe for concurrent use. Malformed ids are
/// errors, create/update return the persisted document, and a list that
/// matches nothing is empty rather than an error.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Document, StoreError>;
    async fn create(&self, collection: &str, data: Document) -> Result<Document, StoreError>;
    async fn list(&self, collection: &str, filter: Option<&Filter>) -> Result<Vec<Document>, StoreError>;
    async fn update(&self, collection: &str, id: &str, data: Document) -> Result<Document, StoreError>;
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;
    /// Release backend resources. Later calls fail or are backend-defined.
    async fn close(&self);
}

/// Whether `doc` satisfies `filter`.
pub fn matches(doc: &Document, filter: Option<&Filter>) -> bool {
    let Some(filter) = filter else { return true };
    filter
        .iter()
        .all(|(key, want)| doc.get(key).is_some_and(|got| got == want))
}

/// Split an incoming document into the stored body. The body never carries
/// `"id"`; the backend owns identity.
pub(crate) fn into_body(data: Document) -> Result<Map<String, Value>, StoreError> {
    match data {
        Value::Object(mut body) => {
            body.remove("id");
            Ok(body)
        }
        other => Err(StoreError::InvalidDocument(format!(
            "expected a JSON object, got {}",
            kind_of(&other)
        ))),
    }
}

/// Re-attach `id` to a stored body.
pub(crate) fn with_id(body: &Map<String, Value>, id: &str) -> Document {
    let mut doc = Map::with_capacity(body.len() + 1);
    doc.insert("id".into(), Value::String(id.to_string()));
    doc.extend(body.iter().map(|(k, v)| (k.clone(), v.clone())));
    Value::Object(doc)
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
