use serde::{Deserialize, Serialize};

use crate::entity::Entity;

/// Example entity served under `/api/books`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub isbn: String,
    #[serde(default)]
    pub name: String,
}

impl Entity for Book {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}
