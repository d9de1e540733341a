//! Storefront services
//!
//! Each service owns one area of the shop and talks to storage through
//! `Arc<dyn Storage>`. Handlers stay thin and call into these.

mod accounts;
mod cart;
mod catalog;
mod checkout;

pub use accounts::{AccountService, Profile};
pub use cart::{CartLineView, CartService, CartView, ProductSummary};
pub use catalog::{
    CatalogService, CategoryDetail, GlobalCategoryDetail, NewCategory, NewGlobalCategory,
    ProductDetail, StorefrontIndex,
};
pub use checkout::{CheckoutService, OrderDetail};

use crate::config::AccountsConfig;
use crate::error::{ApiError, StorageError};
use crate::storage::Storage;
use std::sync::Arc;
use storefront_types::ValidationError;
use thiserror::Error;

/// Errors raised by services
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Entity does not exist or is not visible to the caller
    #[error("{0} not found")]
    NotFound(String),

    /// Session is missing, unknown or expired
    #[error("{0}")]
    Unauthorized(String),

    /// Input or domain rule rejected
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Storage failure
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Background work failed or the configuration is unusable
    #[error("{0}")]
    Internal(String),
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(what) => ApiError::NotFound(what),
            ServiceError::Unauthorized(msg) => ApiError::Unauthorized(msg),
            ServiceError::Validation(e) => ApiError::Validation(e),
            ServiceError::Storage(e) => ApiError::Storage(e),
            ServiceError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

/// All services sharing one storage backend
#[derive(Clone)]
pub struct Services {
    pub catalog: Arc<CatalogService>,
    pub accounts: Arc<AccountService>,
    pub cart: Arc<CartService>,
    pub checkout: Arc<CheckoutService>,
}

impl Services {
    pub fn new(storage: Arc<dyn Storage>, accounts: AccountsConfig) -> Self {
        let cart = Arc::new(CartService::new(storage.clone()));
        Self {
            catalog: Arc::new(CatalogService::new(storage.clone())),
            accounts: Arc::new(AccountService::new(storage.clone(), accounts)),
            checkout: Arc::new(CheckoutService::new(storage, cart.clone())),
            cart,
        }
    }
}
