use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info};

use crate::app_system::ShopConfig;
use crate::clients::{
    AddressBook, CartLedger, CatalogClient, FavoritesClient, InventoryGuard, OrderClient, PaymentMethods,
};
use crate::store_framework::DocumentStore;

/// The running system: one store task and the clients wired to it.
///
/// Every client holds a clone of the same store handle; nothing is global.
pub struct ShopSystem {
    pub cart: CartLedger,
    pub inventory: InventoryGuard,
    pub catalog: CatalogClient,
    pub orders: OrderClient,
    pub favorites: FavoritesClient,
    pub addresses: AddressBook,
    pub payments: PaymentMethods,
    handles: Vec<JoinHandle<()>>,
}

impl ShopSystem {
    /// Starts the store task. Must be called inside a Tokio runtime.
    pub fn new(config: &ShopConfig) -> Self {
        info!(
            buffer_size = config.store.buffer_size,
            max_attempts = config.retry.max_attempts,
            "Starting shop system"
        );

        let (store, store_client) = DocumentStore::new(config.store.buffer_size, config.retry_config());
        let store_handle = tokio::spawn(store.run());

        let order_id_counter = Arc::new(AtomicU64::new(1));
        let next_order_id = move || {
            let id = order_id_counter.fetch_add(1, Ordering::SeqCst);
            format!("order_{}", id)
        };

        let cart = CartLedger::new(store_client.clone());
        let inventory = InventoryGuard::new(store_client.clone());
        let catalog = CatalogClient::new(store_client.clone());
        let favorites = FavoritesClient::new(store_client.clone());
        let addresses = AddressBook::new(store_client.clone());
        let payments = PaymentMethods::new(store_client.clone());
        let orders = OrderClient::new(
            store_client,
            cart.clone(),
            inventory.clone(),
            config.checkout.clone(),
            next_order_id,
        );

        Self {
            cart,
            inventory,
            catalog,
            orders,
            favorites,
            addresses,
            payments,
            handles: vec![store_handle],
        }
    }

    /// Drops the clients and waits for the store task to drain.
    ///
    /// The store stops once every client clone is gone, so clones handed out
    /// elsewhere must be dropped before awaiting this.
    pub async fn shutdown(self) -> Result<(), JoinError> {
        info!("Shutting down shop system...");
        let Self {
            cart,
            inventory,
            catalog,
            orders,
            favorites,
            addresses,
            payments,
            handles,
        } = self;
        drop((cart, inventory, catalog, orders, favorites, addresses, payments));

        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Store task failed");
                return Err(e);
            }
        }

        info!("Shop system shutdown complete");
        Ok(())
    }
}
