//! Product catalog queries.
//!
//! The storefront never writes products; the CLI seeds them.

use sqlx::PgPool;

use meridian_core::ProductId;

use super::RepositoryError;
use crate::models::Product;

/// Default number of products returned by a listing.
pub const DEFAULT_LIMIT: i64 = 20;

/// Upper bound on products returned by a listing.
pub const MAX_LIMIT: i64 = 100;

/// Listing filters. Also used as the catalog cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub featured: Option<bool>,
    pub in_stock: bool,
    /// Full-text query, matched with `websearch_to_tsquery`.
    pub query: Option<String>,
    pub limit: i64,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            category: None,
            featured: None,
            in_stock: false,
            query: None,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl ProductFilter {
    /// Clamp the limit to `1..=MAX_LIMIT` and drop blank text filters.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.limit = self.limit.clamp(1, MAX_LIMIT);
        self.category = self.category.filter(|c| !c.trim().is_empty());
        self.query = self
            .query
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty());
        self
    }
}

const PRODUCT_COLUMNS: &str =
    "id, name, description, category, price, images, sizes, colors, stock, featured, created_at";

/// Repository for catalog reads.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM storefront.products
            WHERE ($1::text IS NULL OR category = $1)
              AND ($2::bool IS NULL OR featured = $2)
              AND (NOT $3 OR stock > 0)
              AND ($4::text IS NULL OR search_vector @@ websearch_to_tsquery('english', $4))
            ORDER BY created_at DESC, id
            LIMIT $5
            "
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(filter.category.as_deref())
            .bind(filter.featured)
            .bind(filter.in_stock)
            .bind(filter.query.as_deref())
            .bind(filter.limit)
            .fetch_all(self.pool)
            .await?;

        Ok(products)
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM storefront.products WHERE id = $1");

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(product)
    }

    /// Distinct categories, alphabetically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn categories(&self) -> Result<Vec<String>, RepositoryError> {
        let categories = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT category FROM storefront.products ORDER BY category",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(categories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_normalization() {
        let filter = ProductFilter {
            category: Some("  ".to_string()),
            query: Some("  linen shirt ".to_string()),
            limit: 5_000,
            ..ProductFilter::default()
        }
        .normalized();

        assert_eq!(filter.category, None);
        assert_eq!(filter.query.as_deref(), Some("linen shirt"));
        assert_eq!(filter.limit, MAX_LIMIT);

        let filter = ProductFilter {
            limit: 0,
            ..ProductFilter::default()
        }
        .normalized();
        assert_eq!(filter.limit, 1);
    }
}
