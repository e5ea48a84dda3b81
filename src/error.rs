use thiserror::Error;
use crate::store_framework::StoreError;

/// Errors returned by the cart ledger.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CartError {
    #[error("Cart entry not found: {0}")]
    NotFound(String),
    #[error("Cart validation error: {0}")]
    ValidationError(String),
    #[error("Cart store unavailable: {0}")]
    TransientError(String),
    #[error("Invalid cart document: {0}")]
    InvalidDocument(String),
}

/// Errors returned by the inventory guard and the catalog.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InventoryError {
    #[error("Product not found: {0}")]
    NotFound(String),
    #[error("Insufficient stock for {sku}: requested {requested}, available {available}")]
    InsufficientStock { sku: String, requested: u32, available: u32 },
    #[error("Inventory validation error: {0}")]
    ValidationError(String),
    #[error("Inventory store unavailable: {0}")]
    TransientError(String),
    #[error("Invalid product document: {0}")]
    InvalidDocument(String),
}

/// Errors returned by checkout and order management.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(String),
    #[error("Cart is empty for user {0}")]
    EmptyCart(String),
    #[error(transparent)]
    Cart(#[from] CartError),
    #[error(transparent)]
    Inventory(#[from] InventoryError),
    #[error("Order store unavailable: {0}")]
    TransientError(String),
    #[error("Invalid order document: {0}")]
    InvalidDocument(String),
}

/// Errors returned by favorites.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FavoriteError {
    #[error("Favorites store unavailable: {0}")]
    TransientError(String),
    #[error("Invalid favorite document: {0}")]
    InvalidDocument(String),
}

/// Errors returned by saved addresses and payment methods.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProfileError {
    #[error("Profile record not found: {0}")]
    NotFound(String),
    #[error("Profile validation error: {0}")]
    ValidationError(String),
    #[error("Profile store unavailable: {0}")]
    TransientError(String),
    #[error("Invalid profile document: {0}")]
    InvalidDocument(String),
}

macro_rules! impl_from_store_error {
    ($error:ident) => {
        impl From<StoreError> for $error {
            fn from(e: StoreError) -> Self {
                match e {
                    StoreError::InvalidDocument { .. } => $error::InvalidDocument(e.to_string()),
                    StoreError::Conflict { .. }
                    | StoreError::RetriesExhausted { .. }
                    | StoreError::UndeclaredRead { .. }
                    | StoreError::Unavailable(_) => $error::TransientError(e.to_string()),
                }
            }
        }
    };
}

impl_from_store_error!(CartError);
impl_from_store_error!(InventoryError);
impl_from_store_error!(OrderError);
impl_from_store_error!(FavoriteError);
impl_from_store_error!(ProfileError);
