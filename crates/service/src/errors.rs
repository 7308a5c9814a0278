use thiserror::Error;

/// Failures reported by a [`Store`](crate::storage::Store) backend.
///
/// The display text is what HTTP clients see on a 500, so backend messages
/// are carried verbatim.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("invalid object id {0}")]
    InvalidId(String),
    #[error("not found")]
    NotFound,
    #[error("invalid document: {0}")]
    InvalidDocument(String),
    #[error("{0}")]
    Backend(String),
    #[error("store is closed")]
    Closed,
}

impl From<sea_orm::DbErr> for StoreError {
    fn from(e: sea_orm::DbErr) -> Self {
        Self::Backend(e.to_string())
    }
}

impl From<models::errors::ModelError> for StoreError {
    fn from(e: models::errors::ModelError) -> Self {
        Self::Backend(e.to_string())
    }
}

/// Failures reported by a resource manager.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// The request body could not be turned into an entity.
    #[error("{0}")]
    Decode(String),
    /// The entity could not be turned into a store document.
    #[error("{0}")]
    Encode(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ManagerError {
    pub fn decode(e: impl std::fmt::Display) -> Self {
        Self::Decode(e.to_string())
    }
}
