use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::domain::{favorite_key, favorites_collection, Favorite, Product};
use crate::error::FavoriteError;
use crate::store_framework::StoreClient;

/// Per-user favorites, one document per SKU.
#[derive(Clone, Debug)]
pub struct FavoritesClient {
    store: StoreClient,
}

impl_store_client!(FavoritesClient);

impl FavoritesClient {
    /// Adds or refreshes a favorite. Re-adding never creates a duplicate.
    #[instrument(skip(self, product), fields(sku = %product.sku))]
    pub async fn add(&self, user_id: &str, product: &Product) -> Result<Favorite, FavoriteError> {
        debug!("Sending request");
        let favorite = Favorite::new(user_id, product, Utc::now());
        self.store
            .put(favorite_key(user_id, &product.sku), favorite.to_document()?)
            .await?;
        info!("Favorite added");
        Ok(favorite)
    }

    #[instrument(skip(self))]
    pub async fn remove(&self, user_id: &str, sku: &str) -> Result<(), FavoriteError> {
        debug!("Sending request");
        self.store.delete(favorite_key(user_id, sku)).await?;
        info!("Favorite removed");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn is_favorite(&self, user_id: &str, sku: &str) -> Result<bool, FavoriteError> {
        debug!("Sending request");
        Ok(self.store.get(favorite_key(user_id, sku)).await?.is_some())
    }

    /// Newest first.
    #[instrument(skip(self))]
    pub async fn list(&self, user_id: &str) -> Result<Vec<Favorite>, FavoriteError> {
        debug!("Sending request");
        let collection = favorites_collection(user_id);
        let documents = self.store.list(collection.as_str()).await?;
        let mut favorites = decode_all!(Favorite, &collection, documents)?;
        favorites.sort_by(|a, b| b.added_at.cmp(&a.added_at).then_with(|| a.sku.cmp(&b.sku)));
        Ok(favorites)
    }

    /// Flips membership in one transaction and returns whether it is now a favorite.
    #[instrument(skip(self, product), fields(sku = %product.sku))]
    pub async fn toggle(&self, user_id: &str, product: &Product) -> Result<bool, FavoriteError> {
        debug!("Sending request");
        let key = favorite_key(user_id, &product.sku);
        let now_favorite = self
            .store
            .run_transaction(vec![key.clone()], |tx| {
                if tx.get(&key)?.is_some() {
                    tx.delete(key.clone());
                    Ok::<_, FavoriteError>(false)
                } else {
                    let favorite = Favorite::new(user_id, product, Utc::now());
                    tx.set(key.clone(), favorite.to_document()?);
                    Ok(true)
                }
            })
            .await?;

        info!(now_favorite, "Favorite toggled");
        Ok(now_favorite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_framework::start_store;

    #[tokio::test]
    async fn test_add_twice_keeps_one_favorite() {
        let favorites = FavoritesClient::new(start_store(8));
        let product = Product::new("SKU1", "Drone", 400.0, 2);

        favorites.add("u1", &product).await.unwrap();
        favorites.add("u1", &product).await.unwrap();

        assert_eq!(favorites.list("u1").await.unwrap().len(), 1);
        assert!(favorites.is_favorite("u1", "SKU1").await.unwrap());
        assert!(!favorites.is_favorite("u2", "SKU1").await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let favorites = FavoritesClient::new(start_store(8));
        favorites.add("u1", &Product::new("SKU1", "Drone", 400.0, 2)).await.unwrap();

        favorites.remove("u1", "SKU1").await.unwrap();
        favorites.remove("u1", "SKU1").await.unwrap();
        assert!(favorites.list("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_flips_membership() {
        let favorites = FavoritesClient::new(start_store(8));
        let product = Product::new("SKU1", "Drone", 400.0, 2);

        assert!(favorites.toggle("u1", &product).await.unwrap());
        assert!(favorites.is_favorite("u1", "SKU1").await.unwrap());
        assert!(!favorites.toggle("u1", &product).await.unwrap());
        assert!(!favorites.is_favorite("u1", "SKU1").await.unwrap());
    }
}
