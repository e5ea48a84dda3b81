use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, instrument};

use crate::app_system::CheckoutConfig;
use crate::clients::{CartLedger, InventoryGuard};
use crate::domain::{order_key, CartEntry, CheckoutDetails, Order, OrderStatus, OrderTotals, ORDERS_COLLECTION};
use crate::error::{InventoryError, OrderError};
use crate::store_framework::StoreClient;

/// Generates ids for new orders.
pub type OrderIdFn = Arc<dyn Fn() -> String + Send + Sync>;

/// Client for checkout and order history.
///
/// Checkout orchestrates the cart ledger and the inventory guard: it snapshots
/// the cart, takes stock one product at a time, and only then records the order
/// and takes the ordered entries out of the cart.
#[derive(Clone)]
pub struct OrderClient {
    store: StoreClient,
    cart: CartLedger,
    inventory: InventoryGuard,
    pricing: CheckoutConfig,
    next_order_id: OrderIdFn,
}

impl OrderClient {
    pub fn new(
        store: StoreClient,
        cart: CartLedger,
        inventory: InventoryGuard,
        pricing: CheckoutConfig,
        next_order_id: impl Fn() -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            store,
            cart,
            inventory,
            pricing,
            next_order_id: Arc::new(next_order_id),
        }
    }

    /// Subtotal, shipping, tax and total for a list of cart entries.
    ///
    /// An empty list ships for free.
    pub fn quote(&self, items: &[CartEntry]) -> OrderTotals {
        let subtotal = CartLedger::compute_total(items);
        let shipping_cost = if items.is_empty() { 0.0 } else { self.pricing.shipping_cost };
        let tax = subtotal * self.pricing.tax_rate;
        OrderTotals {
            subtotal,
            shipping_cost,
            tax,
            total: subtotal + shipping_cost + tax,
        }
    }

    /// Places an order for everything in the user's cart, with no address or payment attached.
    pub async fn checkout(&self, user_id: &str) -> Result<Order, OrderError> {
        self.checkout_with(user_id, CheckoutDetails::default()).await
    }

    /// Places an order for everything in the user's cart.
    ///
    /// Stock taken for earlier items is not returned if a later decrement fails.
    #[instrument(skip(self, details))]
    pub async fn checkout_with(&self, user_id: &str, details: CheckoutDetails) -> Result<Order, OrderError> {
        info!("Processing checkout");

        // Step 1: Snapshot the cart
        let items = self.cart.list_items(user_id).await?;
        if items.is_empty() {
            error!("Cart is empty");
            return Err(OrderError::EmptyCart(user_id.to_string()));
        }
        let totals = self.quote(&items);

        // Step 2: Check every product before touching any stock
        for item in &items {
            let available = self.inventory.check_stock(&item.sku).await?;
            if available < item.quantity {
                error!(sku = %item.sku, available, "Not enough stock");
                return Err(OrderError::Inventory(InventoryError::InsufficientStock {
                    sku: item.sku.clone(),
                    requested: item.quantity,
                    available,
                }));
            }
        }

        // Step 3: Take the stock, one product at a time
        for item in &items {
            match self.inventory.decrement(&item.sku, item.quantity).await {
                Ok(remaining) => debug!(sku = %item.sku, remaining, "Stock taken"),
                Err(e) => {
                    error!(sku = %item.sku, error = %e, "Stock decrement failed");
                    return Err(e.into());
                }
            }
        }

        // Step 4: Record the order
        let order = Order::new((self.next_order_id)(), user_id, items, totals, Utc::now()).with_details(details);
        self.store
            .put(order_key(&order.order_id), order.to_document()?)
            .await?;

        // Step 5: Take the ordered quantities out of the cart
        self.cart.remove_ordered(user_id, &order.items).await?;

        info!(order_id = %order.order_id, total = order.totals.total, "Order created");
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: &str) -> Result<Option<Order>, OrderError> {
        debug!("Sending request");
        let key = order_key(order_id);
        match self.store.get(key.clone()).await? {
            Some(document) => Ok(Some(Order::from_document(&key, document)?)),
            None => Ok(None),
        }
    }

    /// The user's orders, newest first.
    #[instrument(skip(self))]
    pub async fn list_user_orders(&self, user_id: &str) -> Result<Vec<Order>, OrderError> {
        debug!("Sending request");
        let documents = self.store.list(ORDERS_COLLECTION).await?;
        let mut orders: Vec<Order> = decode_all!(Order, ORDERS_COLLECTION, documents)?
            .into_iter()
            .filter(|order| order.user_id == user_id)
            .collect();
        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.order_id.cmp(&a.order_id))
        });
        Ok(orders)
    }

    #[instrument(skip(self))]
    pub async fn update_status(&self, order_id: &str, status: OrderStatus) -> Result<Order, OrderError> {
        debug!("Sending request");
        let key = order_key(order_id);
        let order = self
            .store
            .run_transaction(vec![key.clone()], |tx| {
                let document = tx
                    .get(&key)?
                    .cloned()
                    .ok_or_else(|| OrderError::NotFound(order_id.to_string()))?;
                let mut order = Order::from_document(&key, document)?;
                order.status = status;
                order.updated_at = Utc::now();
                tx.set(key.clone(), order.to_document()?);
                Ok::<_, OrderError>(order)
            })
            .await?;

        info!(status = ?order.status, "Order status updated");
        Ok(order)
    }
}
