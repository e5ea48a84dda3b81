use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{CartEntry, PaymentMethod, ShippingAddress};
use crate::store_framework::{self, DocKey, Document, StoreError};

pub const ORDERS_COLLECTION: &str = "orders";

pub fn order_key(order_id: &str) -> DocKey {
    DocKey::new(ORDERS_COLLECTION, order_id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

/// Amounts charged for an order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: f64,
    pub shipping_cost: f64,
    pub tax: f64,
    pub total: f64,
}

/// Delivery and payment picked for a checkout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckoutDetails {
    pub shipping_address: Option<ShippingAddress>,
    pub payment_method: Option<PaymentMethod>,
}

/// Represents a placed order.
///
/// Items and amounts are a snapshot of the cart at checkout and never change;
/// only `status` and `updated_at` move afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub user_id: String,
    pub items: Vec<CartEntry>,
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(flatten)]
    pub totals: OrderTotals,
    pub status: OrderStatus,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        order_id: impl Into<String>,
        user_id: impl Into<String>,
        items: Vec<CartEntry>,
        totals: OrderTotals,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            user_id: user_id.into(),
            items,
            shipping_address: None,
            payment_method: None,
            totals,
            status: OrderStatus::Pending,
            created_at,
            updated_at: created_at,
        }
    }

    /// Attaches snapshots of the chosen address and payment method.
    pub fn with_details(mut self, details: CheckoutDetails) -> Self {
        self.shipping_address = details.shipping_address;
        self.payment_method = details.payment_method.as_ref().map(PaymentMethod::order_snapshot);
        self
    }

    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    pub fn to_document(&self) -> Result<Document, StoreError> {
        store_framework::to_document(&order_key(&self.order_id), self)
    }

    pub fn from_document(key: &DocKey, document: Document) -> Result<Self, StoreError> {
        store_framework::from_document(key, document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ItemSnapshot;

    #[test]
    fn test_order_document_is_flat() {
        let now = Utc::now();
        let items = vec![
            CartEntry::from_snapshot(&ItemSnapshot::new("SKU1", "Mouse", 10.0), 2, now),
            CartEntry::from_snapshot(&ItemSnapshot::new("SKU2", "Pad", 5.0), 1, now),
        ];
        let totals = OrderTotals { subtotal: 25.0, shipping_cost: 5.0, tax: 3.25, total: 33.25 };
        let order = Order::new("order_1", "u1", items, totals, now);

        assert_eq!(order.item_count(), 3);

        let document = order.to_document().unwrap();
        assert_eq!(document.get("status").and_then(|v| v.as_str()), Some("PENDING"));
        assert_eq!(document.get("total").and_then(|v| v.as_f64()), Some(33.25));

        let key = order_key("order_1");
        let back = Order::from_document(&key, document).unwrap();
        assert_eq!(back.totals, totals);
        assert_eq!(back.items.len(), 2);
        assert_eq!(back.shipping_address, None);
    }

    #[test]
    fn test_details_are_snapshotted() {
        use crate::domain::PaymentType;

        // Whole milliseconds survive the timestamp encoding unchanged
        let now = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        let totals = OrderTotals { subtotal: 10.0, shipping_cost: 5.0, tax: 1.3, total: 16.3 };
        let address = ShippingAddress::new("a1", "u1", "Ana", "Calle 1", "San Salvador", now);
        let mut card = PaymentMethod::new("p1", "u1", PaymentType::DebitCard, now);
        card.card_number = "5500000000004321".to_string();

        let order = Order::new("order_1", "u1", vec![], totals, now).with_details(CheckoutDetails {
            shipping_address: Some(address.clone()),
            payment_method: Some(card),
        });
        let back = Order::from_document(&order_key("order_1"), order.to_document().unwrap()).unwrap();

        assert_eq!(back.shipping_address, Some(address));
        assert_eq!(back.payment_method.unwrap().card_number, "4321");
    }
}
