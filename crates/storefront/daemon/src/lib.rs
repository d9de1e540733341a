//! Storefront daemon library
//!
//! This module provides the core components for the storefront daemon:
//! - REST API handlers and bearer-token authentication
//! - Catalog, account, cart and checkout services
//! - Storage backends (in-memory and PostgreSQL)
//! - Server lifecycle management

pub mod api;
pub mod config;
pub mod error;
pub mod server;
pub mod services;
pub mod storage;

pub use api::{create_router, AppState};
pub use config::StorefrontConfig;
pub use error::{ApiError, DaemonError, StorageError};
pub use server::Server;
pub use services::{ServiceError, Services};
pub use storage::{InMemoryStorage, PostgresStorage, Storage};
