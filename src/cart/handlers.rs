use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    error::ApiError,
    response::{ok, ok_empty, DataEnvelope},
    state::AppState,
};

use super::dto::{AddItemRequest, CartTotalView, CartView, CheckoutResponse, UpdateItemRequest};
use super::repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cart", get(view_cart).post(add_item).delete(clear_cart))
        .route("/cart/total", get(cart_total))
        .route("/cart/checkout", post(checkout))
        .route("/cart/:item_id", put(update_item).delete(remove_item))
}

async fn load_view(state: &AppState, user_id: Uuid) -> Result<CartView, ApiError> {
    let cart = repo::get_or_create(&state.db, user_id).await?;
    let items = repo::list_items(&state.db, cart.id).await?;
    let totals = repo::total(&state.db, user_id).await?;
    Ok(CartView::assemble(cart.id, items, totals))
}

#[instrument(skip(state))]
pub async fn view_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<DataEnvelope<CartView>>, ApiError> {
    Ok(ok(load_view(&state, user.id).await?))
}

#[instrument(skip(state, payload))]
pub async fn add_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddItemRequest>,
) -> Result<Json<DataEnvelope<CartView>>, ApiError> {
    repo::add_item(&state.db, user.id, payload.course_id, payload.quantity).await?;
    Ok(ok(load_view(&state, user.id).await?))
}

#[instrument(skip(state, payload))]
pub async fn update_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<Json<DataEnvelope<CartView>>, ApiError> {
    if !repo::update_item(&state.db, user.id, item_id, payload.quantity).await? {
        return Err(ApiError::not_found("Cart item", item_id));
    }
    Ok(ok(load_view(&state, user.id).await?))
}

#[instrument(skip(state))]
pub async fn remove_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(item_id): Path<Uuid>,
) -> Result<Json<DataEnvelope<CartView>>, ApiError> {
    if !repo::remove_item(&state.db, user.id, item_id).await? {
        return Err(ApiError::not_found("Cart item", item_id));
    }
    Ok(ok(load_view(&state, user.id).await?))
}

#[instrument(skip(state))]
pub async fn clear_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<DataEnvelope<serde_json::Value>>, ApiError> {
    repo::clear(&state.db, user.id).await?;
    Ok(ok_empty())
}

#[instrument(skip(state))]
pub async fn cart_total(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<DataEnvelope<CartTotalView>>, ApiError> {
    let totals = repo::total(&state.db, user.id).await?;
    Ok(ok(CartTotalView {
        total: totals.total,
        item_count: totals.item_count,
    }))
}

#[instrument(skip(state))]
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<DataEnvelope<CheckoutResponse>>, ApiError> {
    let enrollment_ids = repo::checkout(&state.db, user.id).await?;
    info!(user_id = %user.id, created = enrollment_ids.len(), "cart checked out");
    Ok(ok(CheckoutResponse {
        enrollments_created: enrollment_ids.len(),
        enrollment_ids,
    }))
}
