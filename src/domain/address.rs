use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ProfileRecord;

fn default_country() -> String {
    "El Salvador".to_string()
}

/// A saved delivery address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub address_id: String,
    pub user_id: String,
    pub full_name: String,
    #[serde(default)]
    pub phone_number: String,
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: String,
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip_code: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub is_default: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl ShippingAddress {
    pub fn new(
        address_id: impl Into<String>,
        user_id: impl Into<String>,
        full_name: impl Into<String>,
        address_line1: impl Into<String>,
        city: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            address_id: address_id.into(),
            user_id: user_id.into(),
            full_name: full_name.into(),
            phone_number: String::new(),
            address_line1: address_line1.into(),
            address_line2: String::new(),
            city: city.into(),
            state: String::new(),
            zip_code: String::new(),
            country: default_country(),
            latitude: 0.0,
            longitude: 0.0,
            is_default: false,
            created_at,
        }
    }

    /// The non-empty address parts joined with commas.
    pub fn full_address(&self) -> String {
        [
            &self.address_line1,
            &self.address_line2,
            &self.city,
            &self.state,
            &self.zip_code,
            &self.country,
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
    }
}

impl ProfileRecord for ShippingAddress {
    const KIND: &'static str = "addresses";

    fn id(&self) -> &str {
        &self.address_id
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
        if self.address_id.is_empty() {
            return Err("address_id must not be empty".to_string());
        }
        if !self.latitude.is_finite() || !self.longitude.is_finite() {
            return Err("coordinates must be finite".to_string());
        }
        Ok(())
    }
}
