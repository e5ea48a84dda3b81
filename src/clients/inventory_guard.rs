use tracing::{debug, info, instrument, warn};

use crate::domain::{product_key, Product};
use crate::error::InventoryError;
use crate::store_framework::StoreClient;

/// Authoritative stock counter per product.
///
/// Stock only ever goes down through this client; it is raised by catalog sync.
#[derive(Clone, Debug)]
pub struct InventoryGuard {
    store: StoreClient,
}

impl_store_client!(InventoryGuard);

impl InventoryGuard {
    /// Takes `quantity` units out of stock and returns what is left.
    ///
    /// Read and write happen in one transaction: if the stock changes under us
    /// the decrement is re-evaluated against the new value, and it aborts with
    /// `InsufficientStock` (leaving stock untouched) as soon as it cannot be met.
    #[instrument(skip(self))]
    pub async fn decrement(&self, sku: &str, quantity: u32) -> Result<u32, InventoryError> {
        debug!("Sending request");
        if quantity == 0 {
            return Err(InventoryError::ValidationError("quantity to decrement must be at least 1".to_string()));
        }

        let key = product_key(sku);
        let result = self
            .store
            .run_transaction(vec![key.clone()], |tx| {
                let document = tx
                    .get(&key)?
                    .cloned()
                    .ok_or_else(|| InventoryError::NotFound(sku.to_string()))?;
                let mut product = Product::from_document(&key, document)?;

                if product.stock < quantity {
                    return Err(InventoryError::InsufficientStock {
                        sku: sku.to_string(),
                        requested: quantity,
                        available: product.stock,
                    });
                }

                product.set_stock(product.stock - quantity);
                tx.set(key.clone(), product.to_document()?);
                Ok::<_, InventoryError>(product.stock)
            })
            .await;

        match &result {
            Ok(remaining) => info!(remaining, "Stock decremented"),
            Err(InventoryError::InsufficientStock { available, .. }) => {
                warn!(available, "Stock decrement rejected")
            }
            Err(e) => warn!(error = %e, "Stock decrement failed"),
        }
        result
    }

    /// Current stock of a product.
    #[instrument(skip(self))]
    pub async fn check_stock(&self, sku: &str) -> Result<u32, InventoryError> {
        debug!("Sending request");
        let key = product_key(sku);
        let document = self
            .store
            .get(key.clone())
            .await?
            .ok_or_else(|| InventoryError::NotFound(sku.to_string()))?;
        Ok(Product::from_document(&key, document)?.stock)
    }
}
