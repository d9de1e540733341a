//! Cart and order handlers for customers

use crate::api::rest::auth::CurrentUser;
use crate::api::rest::extract::{ApiJson, ApiPath};
use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use crate::services::{CartView, OrderDetail};
use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use storefront_types::{CartProductId, Order, OrderForm, OrderId};
use uuid::Uuid;

/// Change amount request
#[derive(Debug, Deserialize)]
pub struct ChangeAmountRequest {
    pub amount: u32,
}

/// The current cart
pub async fn get_cart(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<Json<CartView>> {
    Ok(Json(state.services.cart.view(&current.customer).await?))
}

/// Add a product to the cart
pub async fn add_to_cart(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(slug): ApiPath<String>,
) -> ApiResult<Json<CartView>> {
    Ok(Json(
        state
            .services
            .cart
            .add_product(&current.customer, &slug)
            .await?,
    ))
}

/// Change the amount of a cart line
pub async fn change_amount(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<ChangeAmountRequest>,
) -> ApiResult<Json<CartView>> {
    let line_id = CartProductId::from_uuid(id);
    Ok(Json(
        state
            .services
            .cart
            .change_amount(&current.customer, &line_id, request.amount)
            .await?,
    ))
}

/// Remove a cart line
pub async fn remove_line(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<CartView>> {
    let line_id = CartProductId::from_uuid(id);
    Ok(Json(
        state
            .services
            .cart
            .remove_line(&current.customer, &line_id)
            .await?,
    ))
}

/// Check out the current cart
pub async fn checkout(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiJson(form): ApiJson<OrderForm>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    let order = state
        .services
        .checkout
        .checkout(&current.customer, form)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// An order with its cart
pub async fn get_order(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<OrderDetail>> {
    let order_id = OrderId::from_uuid(id);
    Ok(Json(
        state
            .services
            .checkout
            .order_detail(&current.user, &current.customer, &order_id)
            .await?,
    ))
}
