//! Domain models for storefront.
//!
//! Row types live next to their repositories in `db`; the types here are what
//! handlers and templates work with.

pub mod order;
pub mod product;
pub mod session;
pub mod user;

pub use order::Order;
pub use product::Product;
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
