//! # Mock Framework
//!
//! Utilities for testing clients against the store.
//!
//! [`start_store`] runs a real store task with a fast retry policy.
//! [`create_mock_store`] instead hands back a client together with the receiving
//! end of its channel, so a test can play the store itself: answer snapshots with
//! chosen versions, reject commits with conflicts, or never answer at all.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::retry::RetryConfig;
use crate::store_framework::{
    DocKey, Document, DocumentStore, ReadEntry, Response, StoreClient, StoreRequest, Write,
};

pub fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(4),
        multiplier: 2.0,
    }
}

/// Spawns a real store task and returns its client.
pub fn start_store(max_attempts: u32) -> StoreClient {
    let (store, client) = DocumentStore::new(32, fast_retry(max_attempts));
    tokio::spawn(store.run());
    client
}

/// Creates a client whose requests land on the returned receiver.
pub fn create_mock_store(max_attempts: u32) -> (StoreClient, mpsc::Receiver<StoreRequest>) {
    let (sender, receiver) = mpsc::channel(16);
    (StoreClient::new(sender, fast_retry(max_attempts)), receiver)
}

/// Helper to verify that the next message is a List request
pub async fn expect_list(
    receiver: &mut mpsc::Receiver<StoreRequest>,
) -> Option<(String, Response<Vec<(String, Document)>>)> {
    match receiver.recv().await {
        Some(StoreRequest::List { collection, respond_to }) => Some((collection, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Get request
pub async fn expect_get(
    receiver: &mut mpsc::Receiver<StoreRequest>,
) -> Option<(DocKey, Response<Option<Document>>)> {
    match receiver.recv().await {
        Some(StoreRequest::Get { key, respond_to }) => Some((key, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Put request
pub async fn expect_put(
    receiver: &mut mpsc::Receiver<StoreRequest>,
) -> Option<(DocKey, Document, Response<()>)> {
    match receiver.recv().await {
        Some(StoreRequest::Put { key, document, respond_to }) => Some((key, document, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Snapshot request
pub async fn expect_snapshot(
    receiver: &mut mpsc::Receiver<StoreRequest>,
) -> Option<(Vec<DocKey>, Response<Vec<ReadEntry>>)> {
    match receiver.recv().await {
        Some(StoreRequest::Snapshot { keys, respond_to }) => Some((keys, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Commit request
pub async fn expect_commit(
    receiver: &mut mpsc::Receiver<StoreRequest>,
) -> Option<(Vec<(DocKey, u64)>, Vec<Write>, Response<u64>)> {
    match receiver.recv().await {
        Some(StoreRequest::Commit { reads, writes, respond_to }) => Some((reads, writes, respond_to)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_system::CheckoutConfig;
    use crate::clients::{CartLedger, InventoryGuard, OrderClient};
    use crate::domain::{cart_key, order_key, product_key, CartEntry, ItemSnapshot, Product};
    use crate::error::{CartError, InventoryError, OrderError};
    use crate::store_framework::StoreError;

    fn absent(key: DocKey) -> Vec<ReadEntry> {
        vec![ReadEntry { key, version: 0, document: None }]
    }

    fn quantity_written(writes: &[Write]) -> Option<u64> {
        match writes {
            [Write::Set { document, .. }] => document.get("quantity").and_then(|v| v.as_u64()),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_conflicting_commit_is_retried_against_fresh_snapshot() {
        let (client, mut receiver) = create_mock_store(5);
        let cart = CartLedger::new(client);

        let add_task = tokio::spawn(async move {
            cart.add_item("u1", &ItemSnapshot::new("SKU1", "Cable", 3.0), 2).await
        });
        let key = cart_key("u1", "SKU1");

        // First attempt: empty cart, but someone commits first
        let (keys, responder) = expect_snapshot(&mut receiver).await.expect("Expected Snapshot");
        assert_eq!(keys, vec![key.clone()]);
        responder.send(Ok(absent(key.clone()))).unwrap();

        let (reads, writes, responder) = expect_commit(&mut receiver).await.expect("Expected Commit");
        assert_eq!(reads, vec![(key.clone(), 0)]);
        assert_eq!(quantity_written(&writes), Some(2));
        responder.send(Err(StoreError::Conflict { key: key.clone() })).unwrap();

        // Second attempt sees the other writer's entry with quantity 4
        let (_, responder) = expect_snapshot(&mut receiver).await.expect("Expected Snapshot");
        let existing = CartEntry::from_snapshot(
            &ItemSnapshot::new("SKU1", "Cable", 3.0),
            4,
            chrono::Utc::now(),
        );
        responder
            .send(Ok(vec![ReadEntry {
                key: key.clone(),
                version: 7,
                document: Some(existing.to_document(&key).unwrap()),
            }]))
            .unwrap();

        let (reads, writes, responder) = expect_commit(&mut receiver).await.expect("Expected Commit");
        assert_eq!(reads, vec![(key.clone(), 7)]);
        assert_eq!(quantity_written(&writes), Some(6));
        responder.send(Ok(8)).unwrap();

        let entry = add_task.await.unwrap().unwrap();
        assert_eq!(entry.quantity, 6);
    }

    #[tokio::test]
    async fn test_endless_conflicts_surface_as_transient() {
        let (client, mut receiver) = create_mock_store(3);
        let cart = CartLedger::new(client);

        let add_task = tokio::spawn(async move {
            cart.add_item("u1", &ItemSnapshot::new("SKU1", "Cable", 3.0), 1).await
        });
        let key = cart_key("u1", "SKU1");

        for _ in 0..3 {
            let (_, responder) = expect_snapshot(&mut receiver).await.expect("Expected Snapshot");
            responder.send(Ok(absent(key.clone()))).unwrap();
            let (_, _, responder) = expect_commit(&mut receiver).await.expect("Expected Commit");
            responder.send(Err(StoreError::Conflict { key: key.clone() })).unwrap();
        }

        let result = add_task.await.unwrap();
        assert!(matches!(result, Err(CartError::TransientError(_))));
    }

    #[tokio::test]
    async fn test_insufficient_stock_aborts_without_commit() {
        let (client, mut receiver) = create_mock_store(5);
        let guard = InventoryGuard::new(client);

        let decrement_task = tokio::spawn(async move { guard.decrement("SKU1", 2).await });
        let key = product_key("SKU1");

        let (_, responder) = expect_snapshot(&mut receiver).await.expect("Expected Snapshot");
        let product = Product::new("SKU1", "Cable", 3.0, 1);
        responder
            .send(Ok(vec![ReadEntry {
                key: key.clone(),
                version: 3,
                document: Some(product.to_document().unwrap()),
            }]))
            .unwrap();

        let result = decrement_task.await.unwrap();
        assert_eq!(
            result,
            Err(InventoryError::InsufficientStock {
                sku: "SKU1".to_string(),
                requested: 2,
                available: 1,
            })
        );
        // The task is finished and sent nothing further
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_checkout_only_takes_ordered_quantities_out_of_cart() {
        let (client, mut receiver) = create_mock_store(5);
        let cart = CartLedger::new(client.clone());
        let orders = OrderClient::new(
            client.clone(),
            cart,
            InventoryGuard::new(client),
            CheckoutConfig::default(),
            || "order_1".to_string(),
        );

        let checkout_task = tokio::spawn(async move { orders.checkout("u1").await });
        let item = ItemSnapshot::new("A", "Cable", 3.0);
        let cart_a = cart_key("u1", "A");
        let product_a = product_key("A");
        let product_doc = Product::new("A", "Cable", 3.0, 10).to_document().unwrap();

        // The cart holds 2 x A when checkout looks at it
        let (collection, responder) = expect_list(&mut receiver).await.expect("Expected List");
        assert_eq!(collection, "carts/u1/items");
        let ordered = CartEntry::from_snapshot(&item, 2, chrono::Utc::now());
        responder
            .send(Ok(vec![("A".to_string(), ordered.to_document(&cart_a).unwrap())]))
            .unwrap();

        // Stock check, then the decrement
        let (key, responder) = expect_get(&mut receiver).await.expect("Expected Get");
        assert_eq!(key, product_a);
        responder.send(Ok(Some(product_doc.clone()))).unwrap();

        let (_, responder) = expect_snapshot(&mut receiver).await.expect("Expected Snapshot");
        responder
            .send(Ok(vec![ReadEntry { key: product_a.clone(), version: 1, document: Some(product_doc) }]))
            .unwrap();
        let (_, _, responder) = expect_commit(&mut receiver).await.expect("Expected Commit");
        responder.send(Ok(2)).unwrap();

        let (key, _, responder) = expect_put(&mut receiver).await.expect("Expected Put");
        assert_eq!(key, order_key("order_1"));
        responder.send(Ok(())).unwrap();

        // Meanwhile the user added 3 more A (and a B, which is never read)
        let (keys, responder) = expect_snapshot(&mut receiver).await.expect("Expected Snapshot");
        assert_eq!(keys, vec![cart_a.clone()]);
        let grown = CartEntry::from_snapshot(&item, 5, chrono::Utc::now());
        responder
            .send(Ok(vec![ReadEntry {
                key: cart_a.clone(),
                version: 9,
                document: Some(grown.to_document(&cart_a).unwrap()),
            }]))
            .unwrap();

        let (reads, writes, responder) = expect_commit(&mut receiver).await.expect("Expected Commit");
        assert_eq!(reads, vec![(cart_a.clone(), 9)]);
        assert_eq!(quantity_written(&writes), Some(3));
        responder.send(Ok(10)).unwrap();

        let order = checkout_task.await.unwrap().unwrap();
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity, 2);
        // No listing-based clear follows
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_lost_decrement_race_keeps_earlier_stock_taken_and_writes_no_order() {
        let (client, mut receiver) = create_mock_store(5);
        let orders = OrderClient::new(
            client.clone(),
            CartLedger::new(client.clone()),
            InventoryGuard::new(client),
            CheckoutConfig::default(),
            || "order_1".to_string(),
        );

        let checkout_task = tokio::spawn(async move { orders.checkout("u1").await });
        let added_at = chrono::Utc::now();
        let entry = |sku: &str| {
            CartEntry::from_snapshot(&ItemSnapshot::new(sku, "Cable", 3.0), 1, added_at)
                .to_document(&cart_key("u1", sku))
                .unwrap()
        };
        let product = |sku: &str, stock: u32| Product::new(sku, "Cable", 3.0, stock).to_document().unwrap();

        let (_, responder) = expect_list(&mut receiver).await.expect("Expected List");
        responder
            .send(Ok(vec![("A".to_string(), entry("A")), ("B".to_string(), entry("B"))]))
            .unwrap();

        // Both pass the stock check
        for sku in ["A", "B"] {
            let (key, responder) = expect_get(&mut receiver).await.expect("Expected Get");
            assert_eq!(key, product_key(sku));
            responder.send(Ok(Some(product(sku, 5)))).unwrap();
        }

        // A is taken
        let (_, responder) = expect_snapshot(&mut receiver).await.expect("Expected Snapshot");
        responder
            .send(Ok(vec![ReadEntry { key: product_key("A"), version: 1, document: Some(product("A", 5)) }]))
            .unwrap();
        let (_, _, responder) = expect_commit(&mut receiver).await.expect("Expected Commit");
        responder.send(Ok(2)).unwrap();

        // B sold out in the meantime
        let (_, responder) = expect_snapshot(&mut receiver).await.expect("Expected Snapshot");
        responder
            .send(Ok(vec![ReadEntry { key: product_key("B"), version: 3, document: Some(product("B", 0)) }]))
            .unwrap();

        let result = checkout_task.await.unwrap();
        assert!(matches!(
            result,
            Err(OrderError::Inventory(InventoryError::InsufficientStock { available: 0, .. }))
        ));
        // No restock of A, no order, no cart change
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_closed_store_is_transient() {
        let (client, receiver) = create_mock_store(5);
        drop(receiver);
        let guard = InventoryGuard::new(client);

        let result = guard.decrement("SKU1", 1).await;
        assert!(matches!(result, Err(InventoryError::TransientError(_))));
    }
}
