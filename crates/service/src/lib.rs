//! Resource layer: stores, managers and the example collections.
//!
//! - `storage` holds the [`Store`](storage::Store) contract and its backends.
//! - `manager` holds [`ResourceManager`](manager::ResourceManager) and the
//!   store-forwarding [`DefaultManager`](manager::DefaultManager).
//! - `books` is the collection the server binary exposes.

pub mod errors;
pub mod query;
pub mod storage;
pub mod manager;
pub mod books;

pub use errors::{ManagerError, StoreError};
pub use manager::{DefaultManager, ResourceManager};
pub use query::QueryParams;
pub use storage::{Document, Filter, Store};
