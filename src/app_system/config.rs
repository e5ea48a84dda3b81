use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::retry::RetryConfig;

/// Settings for the whole system, layered from `storefront.toml` (optional)
/// and `STOREFRONT__<SECTION>__<KEY>` environment variables over defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ShopConfig {
    pub store: StoreConfig,
    pub retry: RetrySettings,
    pub checkout: CheckoutConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Capacity of the store's request channel
    pub buffer_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { buffer_size: 32 }
    }
}

/// Transaction retry policy, in plain numbers for config files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let defaults = RetryConfig::default();
        Self {
            max_attempts: defaults.max_attempts,
            initial_delay_ms: defaults.initial_delay.as_millis() as u64,
            max_delay_ms: defaults.max_delay.as_millis() as u64,
            multiplier: defaults.multiplier,
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            initial_delay: Duration::from_millis(settings.initial_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            multiplier: settings.multiplier,
        }
    }
}

/// Charges added on top of the cart subtotal at checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutConfig {
    /// Flat shipping charge for a non-empty order
    pub shipping_cost: f64,
    /// Fraction of the subtotal charged as tax (0.13 = 13%)
    pub tax_rate: f64,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            shipping_cost: 5.0,
            tax_rate: 0.13,
        }
    }
}

impl ShopConfig {
    /// Loads `storefront.toml` if present, then `STOREFRONT__*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::build(
            Config::builder()
                .add_source(File::with_name("storefront").required(false))
                .add_source(Environment::with_prefix("STOREFRONT").separator("__").try_parsing(true)),
        )
    }

    /// Parses settings from TOML text over the defaults.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        Self::build(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.buffer_size == 0 {
            return Err(ConfigError::Message("store.buffer_size must be at least 1".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Message("retry.max_attempts must be at least 1".to_string()));
        }
        if self.retry.multiplier < 1.0 {
            return Err(ConfigError::Message("retry.multiplier must be at least 1.0".to_string()));
        }
        if self.checkout.shipping_cost < 0.0 || self.checkout.tax_rate < 0.0 {
            return Err(ConfigError::Message("checkout charges cannot be negative".to_string()));
        }
        Ok(())
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::from(&self.retry)
    }
}
