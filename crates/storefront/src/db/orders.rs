//! Order repository.
//!
//! Items and the shipping address are stored as JSONB; prices are numeric
//! columns so they can be summed in reports.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;

use meridian_core::checkout::{OrderItem, OrderSubmission, ShippingAddress};
use meridian_core::{OrderId, OrderStatus, PaymentMethod, UserId};

use super::RepositoryError;
use crate::models::Order;

const ORDER_COLUMNS: &str = "id, user_id, items, shipping_address, payment_method, \
     items_price, shipping_price, tax_price, total_price, status, created_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    items: Json<Vec<OrderItem>>,
    shipping_address: Json<ShippingAddress>,
    payment_method: PaymentMethod,
    items_price: Decimal,
    shipping_price: Decimal,
    tax_price: Decimal,
    total_price: Decimal,
    status: OrderStatus,
    created_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            items: row.items.0,
            shipping_address: row.shipping_address.0,
            payment_method: row.payment_method,
            items_price: row.items_price,
            shipping_price: row.shipping_price,
            tax_price: row.tax_price,
            total_price: row.total_price,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Persist a validated submission as a pending order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        user_id: &UserId,
        submission: &OrderSubmission,
    ) -> Result<Order, RepositoryError> {
        let sql = format!(
            r"
            INSERT INTO storefront.orders
                (id, user_id, items, shipping_address, payment_method,
                 items_price, shipping_price, tax_price, total_price, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {ORDER_COLUMNS}
            "
        );

        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(OrderId::generate())
            .bind(user_id)
            .bind(Json(&submission.items))
            .bind(Json(&submission.shipping_address))
            .bind(submission.payment_method)
            .bind(submission.items_price)
            .bind(submission.shipping_price)
            .bind(submission.tax_price)
            .bind(submission.total_price)
            .bind(OrderStatus::Pending)
            .fetch_one(self.pool)
            .await?;

        Ok(row.into())
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.orders \
             WHERE user_id = $1 ORDER BY created_at DESC"
        );

        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(user_id)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Order::from).collect())
    }

    /// One order, only if it belongs to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_user(
        &self,
        id: &OrderId,
        user_id: &UserId,
    ) -> Result<Option<Order>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.orders WHERE id = $1 AND user_id = $2"
        );

        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Order::from))
    }
}
