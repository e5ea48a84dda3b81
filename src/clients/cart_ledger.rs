use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::domain::{cart_collection, cart_key, CartEntry, ItemSnapshot};
use crate::error::CartError;
use crate::store_framework::StoreClient;

/// Per-user cart: one entry per (user, SKU), quantities merged on add.
#[derive(Clone, Debug)]
pub struct CartLedger {
    store: StoreClient,
}

impl_store_client!(CartLedger);

impl CartLedger {
    /// Adds `quantity_delta` units of `item` to the user's cart.
    ///
    /// The existing quantity is read and the merged entry written in one
    /// transaction, so concurrent adds for the same product all count and never
    /// create a second entry. The price snapshot and `added_at` are refreshed.
    #[instrument(skip(self, item), fields(sku = %item.sku))]
    pub async fn add_item(
        &self,
        user_id: &str,
        item: &ItemSnapshot,
        quantity_delta: u32,
    ) -> Result<CartEntry, CartError> {
        debug!("Sending request");
        if quantity_delta == 0 {
            return Err(CartError::ValidationError("quantity to add must be at least 1".to_string()));
        }
        item.validate().map_err(CartError::ValidationError)?;

        let key = cart_key(user_id, &item.sku);
        let entry = self
            .store
            .run_transaction(vec![key.clone()], |tx| {
                let existing = match tx.get(&key)? {
                    Some(document) => CartEntry::from_document(&key, document.clone())?.quantity,
                    None => 0,
                };
                let quantity = existing.checked_add(quantity_delta).ok_or_else(|| {
                    CartError::ValidationError(format!("quantity overflow for {}", item.sku))
                })?;

                let entry = CartEntry::from_snapshot(item, quantity, Utc::now());
                tx.set(key.clone(), entry.to_document(&key)?);
                Ok::<_, CartError>(entry)
            })
            .await?;

        info!(quantity = entry.quantity, "Cart entry written");
        Ok(entry)
    }

    /// Sets the quantity of an existing entry, clamped to at least 1.
    ///
    /// Removal is [`remove_item`](Self::remove_item); a missing entry is `NotFound`.
    #[instrument(skip(self))]
    pub async fn set_quantity(
        &self,
        user_id: &str,
        sku: &str,
        new_quantity: i64,
    ) -> Result<CartEntry, CartError> {
        debug!("Sending request");
        let quantity = u32::try_from(new_quantity.max(1))
            .map_err(|_| CartError::ValidationError(format!("quantity {} is too large", new_quantity)))?;

        let key = cart_key(user_id, sku);
        let entry = self
            .store
            .run_transaction(vec![key.clone()], |tx| {
                let document = tx
                    .get(&key)?
                    .cloned()
                    .ok_or_else(|| CartError::NotFound(key.to_string()))?;
                let mut entry = CartEntry::from_document(&key, document)?;
                entry.quantity = quantity;
                tx.set(key.clone(), entry.to_document(&key)?);
                Ok::<_, CartError>(entry)
            })
            .await?;

        info!(quantity, "Cart quantity updated");
        Ok(entry)
    }

    /// Removes an entry. Removing a missing entry succeeds.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, user_id: &str, sku: &str) -> Result<(), CartError> {
        debug!("Sending request");
        self.store.delete(cart_key(user_id, sku)).await?;
        info!("Cart entry removed");
        Ok(())
    }

    /// Snapshot of the user's cart, most recently added first.
    #[instrument(skip(self))]
    pub async fn list_items(&self, user_id: &str) -> Result<Vec<CartEntry>, CartError> {
        debug!("Sending request");
        let collection = cart_collection(user_id);
        let documents = self.store.list(collection.as_str()).await?;
        let mut items = decode_all!(CartEntry, &collection, documents)?;
        items.sort_by(|a, b| b.added_at.cmp(&a.added_at).then_with(|| a.sku.cmp(&b.sku)));

        debug!(item_count = items.len(), "Cart loaded");
        Ok(items)
    }

    /// Empties the user's cart in one all-or-nothing batch. Returns how many entries went.
    #[instrument(skip(self))]
    pub async fn clear(&self, user_id: &str) -> Result<usize, CartError> {
        debug!("Sending request");
        let keys: Vec<_> = self
            .store
            .list(cart_collection(user_id))
            .await?
            .into_iter()
            .map(|(sku, _)| cart_key(user_id, &sku))
            .collect();
        let removed = keys.len();

        if removed > 0 {
            self.store.batch_delete(keys).await?;
        }
        info!(removed, "Cart cleared");
        Ok(removed)
    }

    /// Takes the quantities of `ordered` out of the cart in one transaction.
    ///
    /// Only the keys of `ordered` are touched. An entry that grew since the
    /// snapshot keeps its surplus; entries added meanwhile are left alone.
    /// Returns how many entries were deleted.
    #[instrument(skip(self, ordered), fields(entry_count = ordered.len()))]
    pub async fn remove_ordered(&self, user_id: &str, ordered: &[CartEntry]) -> Result<usize, CartError> {
        debug!("Sending request");
        if ordered.is_empty() {
            return Ok(0);
        }

        let keys: Vec<_> = ordered.iter().map(|entry| cart_key(user_id, &entry.sku)).collect();
        let removed = self
            .store
            .run_transaction(keys.clone(), |tx| {
                let mut removed = 0;
                for (key, entry) in keys.iter().zip(ordered) {
                    let Some(document) = tx.get(key)?.cloned() else {
                        continue;
                    };
                    let mut current = CartEntry::from_document(key, document)?;
                    if current.quantity > entry.quantity {
                        current.quantity -= entry.quantity;
                        tx.set(key.clone(), current.to_document(key)?);
                    } else {
                        tx.delete(key.clone());
                        removed += 1;
                    }
                }
                Ok::<_, CartError>(removed)
            })
            .await?;

        info!(removed, "Ordered entries taken out of cart");
        Ok(removed)
    }

    /// Σ price × quantity at the snapshotted sale prices.
    pub fn compute_total(items: &[CartEntry]) -> f64 {
        items.iter().map(CartEntry::subtotal).sum()
    }

    /// Σ regular_price × quantity, before discounts.
    pub fn compute_regular_subtotal(items: &[CartEntry]) -> f64 {
        items
            .iter()
            .map(|item| item.regular_price * f64::from(item.quantity))
            .sum()
    }

    pub fn compute_savings(items: &[CartEntry]) -> f64 {
        Self::compute_regular_subtotal(items) - Self::compute_total(items)
    }

    pub fn item_count(items: &[CartEntry]) -> u32 {
        items.iter().map(|item| item.quantity).sum()
    }
}
