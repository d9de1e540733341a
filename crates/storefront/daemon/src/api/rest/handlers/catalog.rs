//! Catalog browsing handlers

use crate::api::rest::auth::CurrentUser;
use crate::api::rest::extract::ApiPath;
use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use crate::services::{CategoryDetail, GlobalCategoryDetail, ProductDetail, StorefrontIndex};
use axum::{extract::State, Json};
use storefront_types::{GlobalCategory, Product};

/// Landing page: products, global categories and the viewer's cart
pub async fn storefront_index(
    State(state): State<AppState>,
    viewer: Option<CurrentUser>,
) -> ApiResult<Json<StorefrontIndex>> {
    let customer = viewer.as_ref().map(|v| &v.customer);
    Ok(Json(state.services.catalog.index(customer).await?))
}

/// List all products
pub async fn list_products(State(state): State<AppState>) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.services.catalog.list_products().await?))
}

/// Get a product by slug
pub async fn get_product(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> ApiResult<Json<ProductDetail>> {
    Ok(Json(state.services.catalog.product_detail(&slug).await?))
}

/// List all global categories
pub async fn list_global_categories(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<GlobalCategory>>> {
    Ok(Json(state.services.catalog.list_global_categories().await?))
}

/// Get a global category with its categories and products
pub async fn get_global_category(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> ApiResult<Json<GlobalCategoryDetail>> {
    Ok(Json(
        state.services.catalog.global_category_detail(&slug).await?,
    ))
}

/// Get a category with its products
pub async fn get_category(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> ApiResult<Json<CategoryDetail>> {
    Ok(Json(state.services.catalog.category_detail(&slug).await?))
}
