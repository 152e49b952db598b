//! Seed the product catalog from a YAML file.
//!
//! ```yaml
//! products:
//!   - id: linen-shirt
//!     name: Linen Shirt
//!     description: Breathable summer shirt.
//!     category: shirts
//!     price: 49.00
//!     images: [https://cdn.example.com/linen-shirt.jpg]
//!     sizes: [S, M, L]
//!     colors: [white, sand]
//!     stock: 12
//!     featured: true
//! ```
//!
//! Products are upserted by `id`, so the command can be re-run after editing
//! the file.

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;

use super::{CommandError, connect};

/// Errors from the seed command.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid catalog file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid product {id}: {reason}")]
    InvalidProduct { id: String, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Catalog file root.
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub products: Vec<SeedProduct>,
}

/// One product entry.
#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub price: Decimal,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub featured: bool,
}

impl SeedProduct {
    fn validate(&self) -> Result<(), SeedError> {
        let reason = if self.id.trim().is_empty() {
            Some("id is empty")
        } else if self.name.trim().is_empty() {
            Some("name is empty")
        } else if self.price < Decimal::ZERO {
            Some("price is negative")
        } else if self.stock < 0 {
            Some("stock is negative")
        } else {
            None
        };

        reason.map_or(Ok(()), |reason| {
            Err(SeedError::InvalidProduct {
                id: self.id.clone(),
                reason: reason.to_string(),
            })
        })
    }
}

/// Parse and validate a catalog file.
///
/// # Errors
///
/// Returns `SeedError` if the YAML is malformed or a product is invalid.
pub fn parse_catalog(content: &str) -> Result<CatalogFile, SeedError> {
    let catalog: CatalogFile = serde_yaml::from_str(content)?;
    for product in &catalog.products {
        product.validate()?;
    }
    Ok(catalog)
}

/// Upsert every product in `path`. Returns the number of products written.
///
/// # Errors
///
/// Returns `SeedError` if the file is unreadable or invalid, or a write fails.
pub async fn products(path: &Path) -> Result<usize, SeedError> {
    tracing::info!(path = %path.display(), "Loading catalog");

    // Validate before touching the database
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SeedError::Read {
            path: path.display().to_string(),
            source,
        })?;
    let catalog = parse_catalog(&content)?;

    let pool = connect().await?;
    let mut tx = pool.begin().await?;

    for product in &catalog.products {
        sqlx::query(
            r"
            INSERT INTO storefront.products
                (id, name, description, category, price, images, sizes, colors, stock, featured)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                category = EXCLUDED.category,
                price = EXCLUDED.price,
                images = EXCLUDED.images,
                sizes = EXCLUDED.sizes,
                colors = EXCLUDED.colors,
                stock = EXCLUDED.stock,
                featured = EXCLUDED.featured
            ",
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.price)
        .bind(&product.images)
        .bind(&product.sizes)
        .bind(&product.colors)
        .bind(product.stock)
        .bind(product.featured)
        .execute(&mut *tx)
        .await?;

        tracing::debug!(id = %product.id, "Product upserted");
    }

    tx.commit().await?;
    Ok(catalog.products.len())
}
