use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Product;
use crate::store_framework::{self, DocKey, Document, StoreError};

pub fn favorites_collection(user_id: &str) -> String {
    format!("favorites/{}/items", user_id)
}

pub fn favorite_key(user_id: &str, sku: &str) -> DocKey {
    DocKey::new(favorites_collection(user_id), sku)
}

/// A product a user marked as favorite. Keyed by SKU, so re-adding overwrites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Favorite {
    pub user_id: String,
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub image: String,
    pub price: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub added_at: DateTime<Utc>,
}

impl Favorite {
    pub fn new(user_id: impl Into<String>, product: &Product, added_at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            sku: product.sku.clone(),
            name: product.name.clone(),
            image: product.image.clone(),
            price: product.price,
            added_at,
        }
    }

    pub fn to_document(&self) -> Result<Document, StoreError> {
        store_framework::to_document(&favorite_key(&self.user_id, &self.sku), self)
    }

    pub fn from_document(key: &DocKey, document: Document) -> Result<Self, StoreError> {
        store_framework::from_document(key, document)
    }
}
