//! Checkout and order history handlers. All require a logged-in user.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tower_sessions::Session;
use tracing::instrument;

use meridian_core::OrderId;
use meridian_core::cart::CartLine;
use meridian_core::checkout::{OrderPricing, OrderSubmission};

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::Order;
use crate::services::cart::load_cart;
use crate::state::AppState;

/// Cart contents with the price breakdown an order would be charged.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSummary {
    pub lines: Vec<CartLine>,
    pub total_items: u64,
    #[serde(flatten)]
    pub pricing: OrderPricing,
}

/// Price the current cart.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn summary(session: Session, RequireAuth(user): RequireAuth) -> Json<CheckoutSummary> {
    let cart = load_cart(session).await;

    Json(CheckoutSummary {
        lines: cart.lines().to_vec(),
        total_items: cart.total_items(),
        pricing: OrderPricing::for_cart(cart.state()),
    })
}

/// Submit an order. The cart is cleared once the order is stored.
///
/// The submission must match the session cart line for line, with the prices
/// [`OrderPricing::for_cart`] computes.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Json(submission): Json<OrderSubmission>,
) -> Result<Response> {
    let mut cart = load_cart(session).await;
    submission
        .validate_against_cart(cart.state())
        .inspect_err(|e| tracing::debug!(error = %e, "Order rejected"))?;

    let order = OrderRepository::new(state.pool())
        .create(&user.id, &submission)
        .await?;
    tracing::info!(order_id = %order.id, total = %order.total_price, "Order created");

    cart.clear_cart().await;

    Ok((StatusCode::CREATED, Json(order)).into_response())
}

/// The current user's orders, newest first.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(&user.id)
        .await?;
    Ok(Json(orders))
}

/// One of the current user's orders. Other users' orders are reported missing.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<Order>> {
    let order = OrderRepository::new(state.pool())
        .get_for_user(&OrderId::new(id), &user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;
    Ok(Json(order))
}
