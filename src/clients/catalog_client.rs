use std::cmp::Ordering;

use tracing::{debug, info, instrument};

use crate::domain::{product_key, Product, PRODUCTS_COLLECTION};
use crate::error::InventoryError;
use crate::store_framework::StoreClient;

/// Ratings at or below this are never suggested.
const SUGGESTION_MIN_RATING: f64 = 3.5;

/// Read side of the catalog, plus the write performed by the external product sync.
#[derive(Clone, Debug)]
pub struct CatalogClient {
    store: StoreClient,
}

impl_store_client!(CatalogClient);

impl CatalogClient {
    /// Upserts a page of products in one all-or-nothing batch.
    ///
    /// This is the only path that can raise stock.
    #[instrument(skip(self, products), fields(product_count = products.len()))]
    pub async fn sync_products(&self, products: Vec<Product>) -> Result<usize, InventoryError> {
        debug!("Sending request");
        let entries = products
            .into_iter()
            .map(|mut product| {
                product
                    .validate()
                    .map_err(|reason| InventoryError::ValidationError(format!("{}: {}", product.sku, reason)))?;
                product.set_stock(product.stock);
                let document = product.to_document()?;
                Ok((product_key(&product.sku), document))
            })
            .collect::<Result<Vec<_>, InventoryError>>()?;
        let synced = entries.len();

        if synced > 0 {
            self.store.batch_put(entries).await?;
        }
        info!(synced, "Products synced");
        Ok(synced)
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, sku: &str) -> Result<Option<Product>, InventoryError> {
        debug!("Sending request");
        let key = product_key(sku);
        match self.store.get(key.clone()).await? {
            Some(document) => Ok(Some(Product::from_document(&key, document)?)),
            None => Ok(None),
        }
    }

    /// Every product, by name.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, InventoryError> {
        debug!("Sending request");
        let mut products = self.load_all().await?;
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    #[instrument(skip(self))]
    pub async fn list_by_category(&self, category: &str) -> Result<Vec<Product>, InventoryError> {
        debug!("Sending request");
        let mut products: Vec<Product> = self
            .load_all()
            .await?
            .into_iter()
            .filter(|p| p.category == category)
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    /// Best rated products, preferring in-stock ones on sale.
    ///
    /// Takes the `limit` best rated products above the rating floor, keeps those
    /// in stock and discounted, and falls back to all in-stock ones when none is
    /// discounted.
    #[instrument(skip(self))]
    pub async fn suggested_products(&self, limit: usize) -> Result<Vec<Product>, InventoryError> {
        debug!("Sending request");
        let mut rated: Vec<Product> = self
            .load_all()
            .await?
            .into_iter()
            .filter(|p| p.rating > SUGGESTION_MIN_RATING)
            .collect();
        rated.sort_by(|a, b| b.rating.partial_cmp(&a.rating).unwrap_or(Ordering::Equal));
        rated.truncate(limit);

        let discounted: Vec<Product> = rated
            .iter()
            .filter(|p| p.stock > 0 && p.discount_percentage() > 0)
            .cloned()
            .collect();
        if !discounted.is_empty() {
            return Ok(discounted);
        }

        debug!("No discounted products, suggesting everything in stock");
        Ok(rated.into_iter().filter(|p| p.stock > 0).collect())
    }

    async fn load_all(&self) -> Result<Vec<Product>, InventoryError> {
        let documents = self.store.list(PRODUCTS_COLLECTION).await?;
        Ok(decode_all!(Product, PRODUCTS_COLLECTION, documents)?)
    }
}
