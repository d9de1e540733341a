//! Storage layer for storefront-daemon
//!
//! Persists the catalog, accounts, carts and orders.

mod memory;
mod postgres;
mod traits;

pub use memory::InMemoryStorage;
pub use postgres::PostgresStorage;
pub use traits::{
    AccountStorage, CartStorage, CatalogStorage, OrderStorage, Storage, StorageResult,
};
