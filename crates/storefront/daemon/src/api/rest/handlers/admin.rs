//! Staff-only catalog and order management handlers

use crate::api::rest::auth::StaffUser;
use crate::api::rest::extract::{ApiJson, ApiPath};
use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use crate::services::{NewCategory, NewGlobalCategory};
use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use storefront_types::{Category, GlobalCategory, NewProduct, Order, OrderId, OrderStatus, Product};
use uuid::Uuid;

/// Order status update request
#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: OrderStatus,
}

/// Create a global category
pub async fn create_global_category(
    State(state): State<AppState>,
    _staff: StaffUser,
    ApiJson(input): ApiJson<NewGlobalCategory>,
) -> ApiResult<(StatusCode, Json<GlobalCategory>)> {
    let global = state.services.catalog.create_global_category(input).await?;
    Ok((StatusCode::CREATED, Json(global)))
}

/// Delete a global category and everything under it
pub async fn delete_global_category(
    State(state): State<AppState>,
    _staff: StaffUser,
    ApiPath(slug): ApiPath<String>,
) -> ApiResult<StatusCode> {
    state.services.catalog.delete_global_category(&slug).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Create a category
pub async fn create_category(
    State(state): State<AppState>,
    _staff: StaffUser,
    ApiJson(input): ApiJson<NewCategory>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    let category = state.services.catalog.create_category(input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// Delete a category and its products
pub async fn delete_category(
    State(state): State<AppState>,
    _staff: StaffUser,
    ApiPath(slug): ApiPath<String>,
) -> ApiResult<StatusCode> {
    state.services.catalog.delete_category(&slug).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Create a product
pub async fn create_product(
    State(state): State<AppState>,
    _staff: StaffUser,
    ApiJson(input): ApiJson<NewProduct>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let product = state.services.catalog.create_product(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Delete a product
pub async fn delete_product(
    State(state): State<AppState>,
    _staff: StaffUser,
    ApiPath(slug): ApiPath<String>,
) -> ApiResult<StatusCode> {
    state.services.catalog.delete_product(&slug).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// All orders, newest first
pub async fn list_orders(
    State(state): State<AppState>,
    _staff: StaffUser,
) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(state.services.checkout.list_orders().await?))
}

/// Move an order forward
pub async fn set_order_status(
    State(state): State<AppState>,
    StaffUser(staff): StaffUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<StatusUpdateRequest>,
) -> ApiResult<Json<Order>> {
    let order_id = OrderId::from_uuid(id);
    let order = state
        .services
        .checkout
        .set_status(&order_id, request.status)
        .await?;
    tracing::debug!(staff = %staff.user.username, order_id = %order.id, "Status update applied");
    Ok(Json(order))
}
