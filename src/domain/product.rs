use serde::{Deserialize, Serialize};

use crate::store_framework::{self, DocKey, Document, StoreError};

pub const PRODUCTS_COLLECTION: &str = "products";

pub fn product_key(sku: &str) -> DocKey {
    DocKey::new(PRODUCTS_COLLECTION, sku)
}

/// Money and ratings must be finite and non-negative to survive a round trip
/// through a document.
pub fn check_amount(field: &str, value: f64) -> Result<(), String> {
    if !value.is_finite() || value < 0.0 {
        return Err(format!("{} must be a finite non-negative number, got {}", field, value));
    }
    Ok(())
}

fn default_low_stock_threshold() -> u32 {
    5
}

/// Represents a product in the inventory, keyed by SKU.
///
/// `is_available` is derived from `stock` and recomputed on every write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Sale price
    pub price: f64,
    pub regular_price: f64,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub category: String,
    pub stock: u32,
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: u32,
    #[serde(default)]
    pub is_available: bool,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub brand: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl Product {
    pub fn new(sku: impl Into<String>, name: impl Into<String>, price: f64, stock: u32) -> Self {
        Self {
            sku: sku.into(),
            name: name.into(),
            description: String::new(),
            price,
            regular_price: price,
            image: String::new(),
            category: String::new(),
            stock,
            low_stock_threshold: default_low_stock_threshold(),
            is_available: stock > 0,
            rating: 0.0,
            review_count: 0,
            brand: String::new(),
        }
    }

    pub fn set_stock(&mut self, stock: u32) {
        self.stock = stock;
        self.is_available = stock > 0;
    }

    pub fn stock_status(&self) -> StockStatus {
        if self.stock == 0 {
            StockStatus::OutOfStock
        } else if self.stock <= self.low_stock_threshold {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }

    /// Whole percent off the regular price, 0 when not discounted.
    pub fn discount_percentage(&self) -> u32 {
        if self.regular_price <= self.price || self.regular_price <= 0.0 {
            return 0;
        }
        ((1.0 - self.price / self.regular_price) * 100.0) as u32
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.sku.is_empty() {
            return Err("sku must not be empty".to_string());
        }
        check_amount("price", self.price)?;
        check_amount("regular_price", self.regular_price)?;
        check_amount("rating", self.rating)
    }

    pub fn to_document(&self) -> Result<Document, StoreError> {
        store_framework::to_document(&product_key(&self.sku), self)
    }

    pub fn from_document(key: &DocKey, document: Document) -> Result<Self, StoreError> {
        let mut product: Self = store_framework::from_document(key, document)?;
        if product.sku != key.id {
            return Err(StoreError::InvalidDocument {
                key: key.clone(),
                reason: format!("sku {} does not match document id", product.sku),
            });
        }
        product.is_available = product.stock > 0;
        Ok(product)
    }
}
