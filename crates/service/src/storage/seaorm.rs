use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use configs::StoreConfig;
use models::document;

use super::{into_body, matches, Document, Filter, Store};
use crate::errors::StoreError;

/// Postgres-backed store. All collections share the `document` table; ids are UUIDs.
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

fn parse_id(id: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(id).map_err(|_| StoreError::InvalidId(id.to_string()))
}

impl SeaOrmStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Connect using the `[store]` section and run pending migrations.
    pub async fn connect(cfg: &StoreConfig) -> Result<Self, StoreError> {
        let db = models::db::connect_with_config(cfg).await?;
        Ok(Self::new(db))
    }

    async fn find(&self, collection: &str, id: Uuid) -> Result<document::Model, StoreError> {
        document::Entity::find_by_id(id)
            .filter(document::Column::Collection.eq(collection))
            .one(&self.db)
            .await?
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl Store for SeaOrmStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Document, StoreError> {
        let id = parse_id(id)?;
        Ok(self.find(collection, id).await?.into_document())
    }

    async fn create(&self, collection: &str, data: Document) -> Result<Document, StoreError> {
        let body = into_body(data)?;
        let id = Uuid::new_v4();
        let now = Utc::now().into();
        let am = document::ActiveModel {
            id: Set(id),
            collection: Set(collection.to_string()),
            data: Set(Value::Object(body)),
            created_at: Set(now),
            updated_at: Set(now),
        };
        am.insert(&self.db).await?;
        info!(%collection, %id, "document created");
        Ok(self.find(collection, id).await?.into_document())
    }

    async fn list(&self, collection: &str, filter: Option<&Filter>) -> Result<Vec<Document>, StoreError> {
        let rows = document::Entity::find()
            .filter(document::Column::Collection.eq(collection))
            .order_by_asc(document::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(document::Model::into_document)
            .filter(|doc| matches(doc, filter))
            .collect())
    }

    async fn update(&self, collection: &str, id: &str, data: Document) -> Result<Document, StoreError> {
        let id = parse_id(id)?;
        let body = into_body(data)?;
        let mut am: document::ActiveModel = self.find(collection, id).await?.into();
        am.data = Set(Value::Object(body));
        am.updated_at = Set(Utc::now().into());
        am.update(&self.db).await?;
        Ok(self.find(collection, id).await?.into_document())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let id = parse_id(id)?;
        let res = document::Entity::delete_many()
            .filter(document::Column::Id.eq(id))
            .filter(document::Column::Collection.eq(collection))
            .exec(&self.db)
            .await?;
        if res.rows_affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn close(&self) {
        if let Err(e) = self.db.clone().close().await {
            warn!(error = %e, "closing document store failed");
        }
    }
}
