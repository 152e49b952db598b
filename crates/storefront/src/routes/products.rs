//! Product route handlers: the listing page and the catalog API.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use meridian_core::{CurrencyCode, ProductId, format_amount};

use crate::db::{ProductFilter, ProductRepository, products::DEFAULT_LIMIT};
use crate::error::{AppError, Result};
use crate::middleware::OptionalAuth;
use crate::models::Product;
use crate::state::AppState;

/// Listing query parameters, shared by the page and the API.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub featured: Option<bool>,
    pub in_stock: Option<bool>,
    pub q: Option<String>,
    pub limit: Option<i64>,
}

impl From<ProductQuery> for ProductFilter {
    fn from(query: ProductQuery) -> Self {
        Self {
            category: query.category,
            featured: query.featured,
            in_stock: query.in_stock.unwrap_or(false),
            query: query.q,
            limit: query.limit.unwrap_or(DEFAULT_LIMIT),
        }
        .normalized()
    }
}

/// Product display data for templates.
pub struct ProductView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: String,
    pub image: Option<String>,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub in_stock: bool,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            description: product.description.clone(),
            category: product.category.clone(),
            price: format_amount(product.price, CurrencyCode::default()),
            image: product.images.first().cloned(),
            sizes: product.sizes.clone(),
            colors: product.colors.clone(),
            in_stock: product.in_stock(),
        }
    }
}

/// Category filter link for the listing page.
pub struct CategoryLink {
    pub name: String,
    pub selected: bool,
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub products: Vec<ProductView>,
    pub categories: Vec<CategoryLink>,
    pub search: String,
    pub user_email: Option<String>,
}

/// Display product listing page.
#[instrument(skip(state, user))]
pub async fn index(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<ProductQuery>,
) -> Result<ProductsIndexTemplate> {
    let filter = ProductFilter::from(query);
    let products = state.list_products(&filter).await?;
    let categories = ProductRepository::new(state.pool())
        .categories()
        .await?
        .into_iter()
        .map(|name| CategoryLink {
            selected: filter.category.as_deref() == Some(name.as_str()),
            name,
        })
        .collect();

    Ok(ProductsIndexTemplate {
        products: products.iter().map(ProductView::from).collect(),
        categories,
        search: filter.query.unwrap_or_default(),
        user_email: user.map(|u| u.email.to_string()),
    })
}

/// List products as JSON.
#[instrument(skip(state))]
pub async fn api_index(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<Product>>> {
    let filter = ProductFilter::from(query);
    let products = state.list_products(&filter).await?;
    Ok(Json(products.as_ref().clone()))
}

/// One product as JSON.
#[instrument(skip(state))]
pub async fn api_show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>> {
    let product = ProductRepository::new(state.pool())
        .get_by_id(&ProductId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

    Ok(Json(product))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults_and_cap() {
        let filter = ProductFilter::from(ProductQuery::default());
        assert_eq!(filter.limit, DEFAULT_LIMIT);
        assert!(!filter.in_stock);

        let filter = ProductFilter::from(ProductQuery {
            in_stock: Some(true),
            limit: Some(1_000),
            q: Some("   ".to_string()),
            ..ProductQuery::default()
        });
        assert!(filter.in_stock);
        assert_eq!(filter.limit, 100);
        assert_eq!(filter.query, None);
    }
}
