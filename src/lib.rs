//! # Storefront
//!
//! The consistency core of a shopping backend: a per-user cart ledger and a
//! per-product inventory guard, both built on optimistic transactions against a
//! document store, plus the catalog, checkout, order and favorites clients that
//! sit on top of them.
//!
//! ## Layout
//!
//! - [`store_framework`] - the document store task, its client and transactions
//! - [`retry`] - backoff policy for conflicting commits
//! - [`domain`] - cart entries, products, orders, favorites, addresses and payment methods with their document mapping
//! - [`clients`] - [`CartLedger`], [`InventoryGuard`], [`CatalogClient`], [`OrderClient`], [`FavoritesClient`],
//!   [`AddressBook`], [`PaymentMethods`]
//! - [`app_system`] - configuration, logging and [`ShopSystem`] startup/shutdown
//!
//! ## Example Usage
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use storefront::{ItemSnapshot, ShopConfig, ShopSystem};
//!
//! let system = ShopSystem::new(&ShopConfig::default());
//! system.cart.add_item("user_1", &ItemSnapshot::new("SKU1", "Cable", 3.0), 2).await?;
//! let order = system.orders.checkout("user_1").await?;
//! println!("placed {}", order.order_id);
//! system.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod app_system;
pub mod clients;
pub mod domain;
pub mod error;
pub mod retry;
pub mod store_framework;

#[cfg(test)]
mod mock_framework;

pub use app_system::{setup_tracing, CheckoutConfig, ShopConfig, ShopSystem};
pub use clients::{
    AddressBook, CartLedger, CatalogClient, FavoritesClient, InventoryGuard, OrderClient, PaymentMethods,
};
pub use domain::{
    CartEntry, CheckoutDetails, Favorite, ItemSnapshot, Order, OrderStatus, OrderTotals, PaymentMethod, PaymentType,
    Product, ShippingAddress, StockStatus,
};
pub use error::{CartError, FavoriteError, InventoryError, OrderError, ProfileError};
pub use store_framework::{StoreClient, StoreError};
