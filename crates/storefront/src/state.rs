//! Application state shared across handlers.

use std::sync::Arc;

use moka::future::Cache;
use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::{ProductFilter, ProductRepository, RepositoryError};
use crate::models::Product;

/// Maximum number of distinct listings kept in the catalog cache.
const CATALOG_CACHE_CAPACITY: u64 = 1_000;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    catalog: Cache<ProductFilter, Arc<Vec<Product>>>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let catalog = Cache::builder()
            .max_capacity(CATALOG_CACHE_CAPACITY)
            .time_to_live(config.catalog_cache_ttl)
            .build();

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                catalog,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// List products, served from the catalog cache when possible.
    ///
    /// The filter should already be normalized so equivalent queries share
    /// one cache entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the listing has to be loaded and the query fails.
    pub async fn list_products(
        &self,
        filter: &ProductFilter,
    ) -> Result<Arc<Vec<Product>>, RepositoryError> {
        if let Some(products) = self.inner.catalog.get(filter).await {
            tracing::debug!(?filter, "Catalog cache hit");
            return Ok(products);
        }

        let products = Arc::new(ProductRepository::new(self.pool()).list(filter).await?);
        self.inner
            .catalog
            .insert(filter.clone(), Arc::clone(&products))
            .await;

        Ok(products)
    }
}
