//! Cart routes
//!
//! Thin HTTP shims over `CartService`: deserialize, apply, return the new
//! state. Every mutation responds with the full updated cart so the client
//! never recomputes totals itself.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::api::response::DataResponse;
use crate::app::AppState;
use crate::cart::CartAction;
use crate::domain::cart::{
    AddItemRequest, AddItemsRequest, CartListName, CartState, CompositeKey, MoveItemRequest,
    RemoveItemRequest, SetActiveListRequest, UpdateQuantityRequest,
};
use crate::error::ApiError;

fn cart_response(state: CartState) -> Json<DataResponse<CartState>> {
    Json(DataResponse::new(state))
}

/// GET /carts/:cart_id
pub async fn get_cart(
    State(state): State<Arc<AppState>>,
    Path(cart_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let cart = state.carts.get(&cart_id).await;
    Ok(cart_response(cart))
}

/// POST /carts/:cart_id/items
pub async fn add_item(
    State(state): State<Arc<AppState>>,
    Path(cart_id): Path<String>,
    Json(req): Json<AddItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(cart_id = %cart_id, list = ?req.list, "adding cart item");

    let cart = state
        .carts
        .apply(
            &cart_id,
            CartAction::AddItem {
                item: req.item,
                list: req.list,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, cart_response(cart)))
}

/// POST /carts/:cart_id/items/batch
pub async fn add_items(
    State(state): State<Arc<AppState>>,
    Path(cart_id): Path<String>,
    Json(req): Json<AddItemsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.items.is_empty() {
        return Err(ApiError::bad_request("items must not be empty"));
    }
    tracing::info!(cart_id = %cart_id, count = req.items.len(), "adding cart items");

    let cart = state
        .carts
        .apply(
            &cart_id,
            CartAction::AddItems {
                items: req.items,
                list: req.list,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, cart_response(cart)))
}

/// PATCH /carts/:cart_id/items/:key
pub async fn update_quantity(
    State(state): State<Arc<AppState>>,
    Path((cart_id, key)): Path<(String, String)>,
    Json(req): Json<UpdateQuantityRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cart = state
        .carts
        .apply(
            &cart_id,
            CartAction::UpdateQuantity {
                key: CompositeKey(key),
                quantity: req.quantity,
                list: req.list,
            },
        )
        .await?;
    Ok(cart_response(cart))
}

/// DELETE /carts/:cart_id/items/:key
pub async fn remove_item(
    State(state): State<Arc<AppState>>,
    Path((cart_id, key)): Path<(String, String)>,
    Query(req): Query<RemoveItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cart = state
        .carts
        .apply(
            &cart_id,
            CartAction::RemoveItem {
                key: CompositeKey(key),
                list: req.list,
            },
        )
        .await?;
    Ok(cart_response(cart))
}

/// DELETE /carts/:cart_id/lists/:list
pub async fn clear_list(
    State(state): State<Arc<AppState>>,
    Path((cart_id, list)): Path<(String, CartListName)>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!(cart_id = %cart_id, list = %list, "clearing cart list");

    let cart = state
        .carts
        .apply(&cart_id, CartAction::ClearList { list })
        .await?;
    Ok(cart_response(cart))
}

/// POST /carts/:cart_id/move
pub async fn move_item(
    State(state): State<Arc<AppState>>,
    Path(cart_id): Path<String>,
    Json(req): Json<MoveItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cart = state
        .carts
        .apply(
            &cart_id,
            CartAction::MoveItem {
                key: CompositeKey(req.key),
                from: req.from,
                to: req.to,
            },
        )
        .await?;
    Ok(cart_response(cart))
}

/// PUT /carts/:cart_id/active-list
pub async fn set_active_list(
    State(state): State<Arc<AppState>>,
    Path(cart_id): Path<String>,
    Json(req): Json<SetActiveListRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cart = state
        .carts
        .apply(&cart_id, CartAction::SetActiveList { list: req.list })
        .await?;
    Ok(cart_response(cart))
}
