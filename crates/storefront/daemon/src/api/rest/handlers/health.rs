//! Health and status handlers

use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use axum::{extract::State, Json};
use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub version: String,
    pub uptime: String,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime: state.uptime(),
    })
}

/// Daemon status response
#[derive(Debug, Serialize)]
pub struct DaemonStatusResponse {
    pub status: String,
    pub version: String,
    pub uptime: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub storage: &'static str,
    pub stats: StoreStats,
}

/// Storefront statistics
#[derive(Debug, Serialize)]
pub struct StoreStats {
    pub total_products: usize,
    pub total_categories: usize,
    pub total_users: usize,
    pub total_orders: usize,
}

/// Daemon status endpoint
pub async fn daemon_status(State(state): State<AppState>) -> ApiResult<Json<DaemonStatusResponse>> {
    let products = state.storage.list_products().await?;
    let categories = state.storage.count_categories().await?;
    let users = state.storage.count_users().await?;
    let orders = state.storage.list_orders().await?;

    Ok(Json(DaemonStatusResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime: state.uptime(),
        started_at: state.started_at,
        storage: state.storage.backend_name(),
        stats: StoreStats {
            total_products: products.len(),
            total_categories: categories,
            total_users: users,
            total_orders: orders.len(),
        },
    }))
}
