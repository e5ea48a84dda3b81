use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ProfileRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    CreditCard,
    DebitCard,
    Paypal,
    CashOnDelivery,
}

/// A saved way to pay. Card security codes are never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub payment_id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    #[serde(default)]
    pub card_holder_name: String,
    #[serde(default)]
    pub card_number: String,
    #[serde(default)]
    pub expiry_month: String,
    #[serde(default)]
    pub expiry_year: String,
    #[serde(default)]
    pub paypal_email: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl PaymentMethod {
    pub fn new(
        payment_id: impl Into<String>,
        user_id: impl Into<String>,
        payment_type: PaymentType,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            payment_id: payment_id.into(),
            user_id: user_id.into(),
            payment_type,
            card_holder_name: String::new(),
            card_number: String::new(),
            expiry_month: String::new(),
            expiry_year: String::new(),
            paypal_email: String::new(),
            is_default: false,
            created_at,
        }
    }

    pub fn last_four_digits(&self) -> &str {
        let digits = self.card_number.len();
        self.card_number.get(digits.saturating_sub(4)..).unwrap_or(&self.card_number)
    }

    pub fn masked_card_number(&self) -> String {
        if self.card_number.len() >= 4 {
            format!("•••• •••• •••• {}", self.last_four_digits())
        } else {
            self.card_number.clone()
        }
    }

    pub fn display_name(&self) -> String {
        match self.payment_type {
            PaymentType::CreditCard => format!("Credit card •••• {}", self.last_four_digits()),
            PaymentType::DebitCard => format!("Debit card •••• {}", self.last_four_digits()),
            PaymentType::Paypal => format!("PayPal - {}", self.paypal_email),
            PaymentType::CashOnDelivery => "Cash on delivery".to_string(),
        }
    }

    /// Copy kept on an order: the card number is cut down to its last four digits.
    pub fn order_snapshot(&self) -> Self {
        let mut snapshot = self.clone();
        snapshot.card_number = self.last_four_digits().to_string();
        snapshot
    }
}

impl ProfileRecord for PaymentMethod {
    const KIND: &'static str = "payments";

    fn id(&self) -> &str {
        &self.payment_id
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn is_default(&self) -> bool {
        self.is_default
    }

    fn set_default(&mut self, is_default: bool) {
        self.is_default = is_default;
    }

    fn validate(&self) -> Result<(), String> {
        if self.payment_id.is_empty() {
            return Err("payment_id must not be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(number: &str) -> PaymentMethod {
        let mut payment = PaymentMethod::new("p1", "u1", PaymentType::CreditCard, Utc::now());
        payment.card_number = number.to_string();
        payment
    }

    #[test]
    fn test_card_masking() {
        let payment = card("4111111111111234");
        assert_eq!(payment.last_four_digits(), "1234");
        assert_eq!(payment.masked_card_number(), "•••• •••• •••• 1234");
        assert_eq!(payment.display_name(), "Credit card •••• 1234");
        assert_eq!(payment.order_snapshot().card_number, "1234");

        assert_eq!(card("12").last_four_digits(), "12");
        assert_eq!(card("12").masked_card_number(), "12");
    }

    #[test]
    fn test_type_is_stored_under_type_key() {
        let payment = PaymentMethod::new("p1", "u1", PaymentType::CashOnDelivery, Utc::now());
        let value = serde_json::to_value(&payment).unwrap();
        assert_eq!(value["type"], "CASH_ON_DELIVERY");
        assert_eq!(payment.display_name(), "Cash on delivery");
    }
}
