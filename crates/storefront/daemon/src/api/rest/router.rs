//! API Router configuration

use super::handlers;
use super::state::AppState;
use crate::config::ServerConfig;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Create the main API router
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let api_routes = Router::new()
        // Health and status
        .route("/health", get(handlers::health_check))
        .route("/status", get(handlers::daemon_status))
        // Catalog
        .route("/storefront", get(handlers::storefront_index))
        .route("/products", get(handlers::list_products))
        .route("/products/:slug", get(handlers::get_product))
        .route("/global-categories", get(handlers::list_global_categories))
        .route("/global-categories/:slug", get(handlers::get_global_category))
        .route("/categories/:slug", get(handlers::get_category))
        // Accounts
        .route("/accounts/register", post(handlers::register))
        .route("/accounts/login", post(handlers::login))
        .route("/accounts/logout", post(handlers::logout))
        .route("/accounts/profile", get(handlers::profile))
        // Cart
        .route("/cart", get(handlers::get_cart))
        .route("/cart/products/:slug", post(handlers::add_to_cart))
        .route(
            "/cart/lines/:id",
            put(handlers::change_amount).delete(handlers::remove_line),
        )
        // Orders
        .route("/orders", post(handlers::checkout))
        .route("/orders/:id", get(handlers::get_order))
        // Staff
        .route("/admin/global-categories", post(handlers::create_global_category))
        .route(
            "/admin/global-categories/:slug",
            delete(handlers::delete_global_category),
        )
        .route("/admin/categories", post(handlers::create_category))
        .route("/admin/categories/:slug", delete(handlers::delete_category))
        .route("/admin/products", post(handlers::create_product))
        .route("/admin/products/:slug", delete(handlers::delete_product))
        .route("/admin/orders", get(handlers::list_orders))
        .route("/admin/orders/:id/status", put(handlers::set_order_status));

    // Build router with middleware
    let router = Router::new()
        .nest("/api/v1", api_routes)
        .layer(DefaultBodyLimit::max(config.max_body_size))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_secs,
        )))
        .layer(TraceLayer::new_for_http());

    let router = if config.enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    };

    router.with_state(state)
}
