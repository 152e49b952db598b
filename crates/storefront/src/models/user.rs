//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use meridian_core::{Email, UserId, UserRole};

/// A storefront account.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}
