//! Cart storage backed by the visitor's session.
//!
//! Each request builds a [`SessionCart`] from its session: the saved cart is
//! restored once, the handler applies its operation, and the aggregator writes
//! the whole cart back under [`session_keys::CART`].

use std::future::Future;

use tower_sessions::Session;

use meridian_core::cart::{CartAggregator, CartStorage, StorageError};

use crate::models::session_keys;

/// [`CartStorage`] over a `tower_sessions::Session`.
///
/// Values are stored as JSON strings so the persisted envelope is the same
/// payload any other backend would hold.
#[derive(Debug, Clone)]
pub struct SessionCartStorage {
    session: Session,
}

impl SessionCartStorage {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }
}

impl CartStorage for SessionCartStorage {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StorageError>> + Send {
        let session = self.session.clone();
        let key = key.to_owned();
        async move {
            session
                .get::<String>(&key)
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))
        }
    }

    fn set(&self, key: &str, value: String) -> impl Future<Output = Result<(), StorageError>> + Send {
        let session = self.session.clone();
        let key = key.to_owned();
        async move {
            session
                .insert(&key, value)
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))
        }
    }
}

/// The cart aggregator used by request handlers.
pub type SessionCart = CartAggregator<SessionCartStorage>;

/// Restore the cart saved in `session`.
pub async fn load_cart(session: Session) -> SessionCart {
    CartAggregator::init_with_key(SessionCartStorage::new(session), session_keys::CART).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use meridian_core::ProductId;
    use meridian_core::cart::ProductSnapshot;
    use rust_decimal::Decimal;
    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn hoodie() -> ProductSnapshot {
        ProductSnapshot {
            id: ProductId::new("hoodie"),
            name: "Hoodie".to_string(),
            price: Decimal::new(4500, 2),
            images: vec!["/img/hoodie.jpg".to_string()],
        }
    }

    #[tokio::test]
    async fn test_cart_survives_across_requests() {
        let session = session();

        let mut cart = load_cart(session.clone()).await;
        cart.add_item(&hoodie(), 2, Some("L".to_string()), None).await;

        let cart = load_cart(session.clone()).await;
        assert_eq!(cart.total_items(), 2);
        assert_eq!(cart.total_price(), Decimal::new(9000, 2));

        let raw: Option<String> = session.get(session_keys::CART).await.unwrap();
        let raw = raw.unwrap();
        assert!(raw.contains("\"version\":1"));
        assert!(raw.contains("\"productId\":\"hoodie\""));
    }

    #[tokio::test]
    async fn test_garbage_in_session_starts_empty() {
        let session = session();
        session
            .insert(session_keys::CART, "{not json".to_string())
            .await
            .unwrap();

        let cart = load_cart(session).await;
        assert!(cart.state().is_empty());
    }
}
