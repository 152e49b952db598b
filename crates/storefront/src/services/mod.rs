//! Business logic services for storefront.
//!
//! - `auth` - Email and password accounts
//! - `cart` - Session-backed cart storage

pub mod auth;
pub mod cart;

pub use auth::{AuthError, AuthService};
pub use cart::{SessionCart, SessionCartStorage};
