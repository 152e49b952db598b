//! Cart route handlers.
//!
//! Every handler restores the visitor's cart from the session, applies at
//! most one operation, and lets the aggregator write it back. Unknown line
//! ids on update/remove are no-ops and still return the current cart.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use meridian_core::cart::{CartLine, DEFAULT_ADD_QUANTITY};
use meridian_core::checkout::OrderPricing;
use meridian_core::{CartLineId, CurrencyCode, ProductId, format_amount};

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::middleware::OptionalAuth;
use crate::services::cart::{SessionCart, load_cart};
use crate::state::AppState;

/// Cart as returned by the JSON API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub lines: Vec<CartLine>,
    pub total_items: u64,
    pub total_price: Decimal,
}

impl From<&SessionCart> for CartResponse {
    fn from(cart: &SessionCart) -> Self {
        Self {
            lines: cart.lines().to_vec(),
            total_items: cart.total_items(),
            total_price: cart.total_price(),
        }
    }
}

/// Add-to-cart request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: ProductId,
    pub quantity: Option<i64>,
    pub size: Option<String>,
    pub color: Option<String>,
}

/// Quantity update request body.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

/// Blank variant fields from forms mean "no variant".
fn variant(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Reject a variant value the product does not offer. Products without a
/// list of options accept any value.
fn check_variant(kind: &str, offered: &[String], chosen: Option<&str>) -> Result<()> {
    match chosen {
        Some(value) if !offered.is_empty() && !offered.iter().any(|o| o == value) => Err(
            AppError::BadRequest(format!("{kind} {value} is not available for this product")),
        ),
        _ => Ok(()),
    }
}

// =============================================================================
// Page
// =============================================================================

/// Cart line display data for templates.
pub struct CartLineView {
    pub id: String,
    pub name: String,
    pub variant: Option<String>,
    pub image: Option<String>,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        let variant = match (line.size.as_deref(), line.color.as_deref()) {
            (Some(size), Some(color)) => Some(format!("{size} / {color}")),
            (Some(one), None) | (None, Some(one)) => Some(one.to_string()),
            (None, None) => None,
        };

        Self {
            id: line.id.to_string(),
            name: line.name.clone(),
            variant,
            image: line.image.clone(),
            quantity: line.quantity,
            price: format_amount(line.price, CurrencyCode::default()),
            line_price: format_amount(line.line_total(), CurrencyCode::default()),
        }
    }
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub lines: Vec<CartLineView>,
    pub item_count: u64,
    pub subtotal: String,
    pub shipping: String,
    pub tax: String,
    pub total: String,
    pub user_email: Option<String>,
}

/// Display cart page.
#[instrument(skip(session, user))]
pub async fn show(session: Session, OptionalAuth(user): OptionalAuth) -> CartShowTemplate {
    let cart = load_cart(session).await;
    let pricing = OrderPricing::for_cart(cart.state());
    let currency = CurrencyCode::default();

    CartShowTemplate {
        lines: cart.lines().iter().map(CartLineView::from).collect(),
        item_count: cart.total_items(),
        subtotal: format_amount(pricing.items_price, currency),
        shipping: format_amount(pricing.shipping_price, currency),
        tax: format_amount(pricing.tax_price, currency),
        total: format_amount(pricing.total_price, currency),
        user_email: user.map(|u| u.email.to_string()),
    }
}

// =============================================================================
// JSON API
// =============================================================================

/// Current cart with totals.
#[instrument(skip(session))]
pub async fn api_show(session: Session) -> Json<CartResponse> {
    let cart = load_cart(session).await;
    Json(CartResponse::from(&cart))
}

/// Add a product variant to the cart.
///
/// The product is looked up so the line snapshots the current catalog name,
/// price and image. Quantities below one are clamped to one. A size or color
/// outside the product's options is a 400.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<CartResponse>> {
    let product = ProductRepository::new(state.pool())
        .get_by_id(&request.product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

    let size = variant(request.size);
    let color = variant(request.color);
    check_variant("Size", &product.sizes, size.as_deref())?;
    check_variant("Color", &product.colors, color.as_deref())?;

    let mut cart = load_cart(session).await;
    let line_id = cart
        .add_item(
            &product.snapshot(),
            request.quantity.unwrap_or(DEFAULT_ADD_QUANTITY),
            size,
            color,
        )
        .await;
    tracing::debug!(%line_id, product_id = %product.id, "Added to cart");

    Ok(Json(CartResponse::from(&cart)))
}

/// Set a line's quantity.
#[instrument(skip(session))]
pub async fn update(
    session: Session,
    Path(id): Path<String>,
    Json(request): Json<UpdateQuantityRequest>,
) -> Json<CartResponse> {
    let mut cart = load_cart(session).await;
    cart.update_quantity(&CartLineId::new(id), request.quantity)
        .await;
    Json(CartResponse::from(&cart))
}

/// Remove a line.
#[instrument(skip(session))]
pub async fn remove(session: Session, Path(id): Path<String>) -> Json<CartResponse> {
    let mut cart = load_cart(session).await;
    cart.remove_item(&CartLineId::new(id)).await;
    Json(CartResponse::from(&cart))
}

/// Empty the cart.
#[instrument(skip(session))]
pub async fn clear(session: Session) -> Json<CartResponse> {
    let mut cart = load_cart(session).await;
    cart.clear_cart().await;
    Json(CartResponse::from(&cart))
}
