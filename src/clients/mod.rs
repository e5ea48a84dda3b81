//! Typed clients over the document store. Each one owns a clone of the
//! [`StoreClient`](crate::store_framework::StoreClient) handed out at startup.

#[macro_use]
mod macros;

pub mod cart_ledger;
pub mod inventory_guard;
pub mod catalog_client;
pub mod order_client;
pub mod favorites_client;
pub mod profile_client;

pub use cart_ledger::CartLedger;
pub use inventory_guard::InventoryGuard;
pub use catalog_client::CatalogClient;
pub use order_client::OrderClient;
pub use favorites_client::FavoritesClient;
pub use profile_client::{AddressBook, PaymentMethods, ProfileClient};
