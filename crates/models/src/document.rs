use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One stored entity of any collection. The entity body lives in `data`
/// without its id; the id column is the source of truth.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "document")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub collection: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub data: Json,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// The JSON document handed back to callers: `data` with `"id"` set to the row id.
    pub fn into_document(self) -> serde_json::Value {
        let mut data = self.data;
        match data.as_object_mut() {
            Some(obj) => {
                obj.insert("id".into(), serde_json::Value::String(self.id.to_string()));
                data
            }
            None => serde_json::json!({ "id": self.id.to_string(), "value": data }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(data: serde_json::Value) -> Model {
        let now = chrono::Utc::now().into();
        Model {
            id: Uuid::nil(),
            collection: "books".into(),
            data,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn document_carries_row_id() {
        let doc = row(json!({"isbn": "X", "name": "Y"})).into_document();
        assert_eq!(
            doc,
            json!({"id": "00000000-0000-0000-0000-000000000000", "isbn": "X", "name": "Y"})
        );
    }

    #[test]
    fn non_object_data_is_wrapped() {
        let doc = row(json!(42)).into_document();
        assert_eq!(doc["value"], json!(42));
    }
}
