pub mod cart;
pub mod health;
pub mod pricing;

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use std::sync::Arc;

use crate::app::AppState;

/// Build the API router with all routes
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Public routes
        .route("/health", get(health::health_check))
        // Pricing
        .route("/quotes", post(pricing::create_quote))
        // Carts
        .route("/carts/:cart_id", get(cart::get_cart))
        .route("/carts/:cart_id/items", post(cart::add_item))
        .route("/carts/:cart_id/items/batch", post(cart::add_items))
        .route("/carts/:cart_id/items/:key", patch(cart::update_quantity))
        .route("/carts/:cart_id/items/:key", delete(cart::remove_item))
        .route("/carts/:cart_id/lists/:list", delete(cart::clear_list))
        .route("/carts/:cart_id/move", post(cart::move_item))
        .route("/carts/:cart_id/active-list", put(cart::set_active_list))
}
