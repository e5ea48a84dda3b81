use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{check_amount, Product};
use crate::store_framework::{self, DocKey, Document, StoreError};

/// Collection holding one user's cart entries, keyed by SKU.
pub fn cart_collection(user_id: &str) -> String {
    format!("carts/{}/items", user_id)
}

pub fn cart_key(user_id: &str, sku: &str) -> DocKey {
    DocKey::new(cart_collection(user_id), sku)
}

/// One user's intended quantity of one product.
///
/// Name, image and prices are a snapshot taken when the product was last added;
/// they are not kept in sync with the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartEntry {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub image: String,
    pub price: f64,
    pub regular_price: f64,
    pub quantity: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub added_at: DateTime<Utc>,
}

/// Product fields copied into a cart entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemSnapshot {
    pub sku: String,
    pub name: String,
    pub image: String,
    pub price: f64,
    pub regular_price: f64,
}

impl ItemSnapshot {
    pub fn new(sku: impl Into<String>, name: impl Into<String>, price: f64) -> Self {
        Self {
            sku: sku.into(),
            name: name.into(),
            image: String::new(),
            price,
            regular_price: price,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.sku.is_empty() {
            return Err("sku must not be empty".to_string());
        }
        check_amount("price", self.price)?;
        check_amount("regular_price", self.regular_price)
    }
}

impl From<&Product> for ItemSnapshot {
    fn from(product: &Product) -> Self {
        Self {
            sku: product.sku.clone(),
            name: product.name.clone(),
            image: product.image.clone(),
            price: product.price,
            regular_price: product.regular_price,
        }
    }
}

impl CartEntry {
    pub fn from_snapshot(snapshot: &ItemSnapshot, quantity: u32, added_at: DateTime<Utc>) -> Self {
        Self {
            sku: snapshot.sku.clone(),
            name: snapshot.name.clone(),
            image: snapshot.image.clone(),
            price: snapshot.price,
            regular_price: snapshot.regular_price,
            quantity,
            added_at,
        }
    }

    pub fn subtotal(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }

    pub fn to_document(&self, key: &DocKey) -> Result<Document, StoreError> {
        store_framework::to_document(key, self)
    }

    /// Reads an entry back, rejecting documents that break the entry invariants.
    pub fn from_document(key: &DocKey, document: Document) -> Result<Self, StoreError> {
        let entry: Self = store_framework::from_document(key, document)?;
        if entry.quantity == 0 {
            return Err(StoreError::InvalidDocument {
                key: key.clone(),
                reason: "quantity must be at least 1".to_string(),
            });
        }
        if entry.sku != key.id {
            return Err(StoreError::InvalidDocument {
                key: key.clone(),
                reason: format!("sku {} does not match document id", entry.sku),
            });
        }
        Ok(entry)
    }
}
