//! Cart aggregator: a [`CartState`] kept in sync with a [`CartStorage`].

use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::{CartLine, CartOperation, CartState, CartStorage, ProductSnapshot};
use crate::types::CartLineId;

/// Fixed storage key for the serialized cart.
pub const CART_STORAGE_KEY: &str = "cart";

/// The authoritative cart for one client session.
///
/// Construct it with [`CartAggregator::init`], which restores the saved cart
/// exactly once. Every mutating method updates memory first and then writes
/// the whole cart back to storage. Storage failures are logged and swallowed:
/// mutations always succeed from the caller's point of view and the in-memory
/// state stays the source of truth.
///
/// # Example
///
/// ```rust
/// use meridian_core::cart::{CartAggregator, MemoryStorage, ProductSnapshot};
/// use meridian_core::ProductId;
/// use rust_decimal::Decimal;
///
/// # let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// # runtime.block_on(async {
/// let storage = MemoryStorage::new();
/// let mut cart = CartAggregator::init(storage.clone()).await;
///
/// let tee = ProductSnapshot {
///     id: ProductId::new("tee"),
///     name: "Tee".to_string(),
///     price: Decimal::from(20),
///     images: vec![],
/// };
/// cart.add_item(&tee, 2, Some("M".to_string()), None).await;
///
/// let restored = CartAggregator::init(storage).await;
/// assert_eq!(restored.total_items(), 2);
/// assert_eq!(restored.total_price(), Decimal::from(40));
/// # });
/// ```
#[derive(Debug)]
pub struct CartAggregator<S> {
    storage: S,
    key: String,
    state: CartState,
}

impl<S: CartStorage> CartAggregator<S> {
    /// Restore the cart stored under [`CART_STORAGE_KEY`].
    pub async fn init(storage: S) -> Self {
        Self::init_with_key(storage, CART_STORAGE_KEY).await
    }

    /// Restore the cart stored under `key`.
    ///
    /// A missing value starts an empty cart. An unreadable or malformed value
    /// also starts an empty cart, with a warning.
    pub async fn init_with_key(storage: S, key: &str) -> Self {
        let state = match storage.get(key).await {
            Ok(Some(payload)) => CartState::from_payload(&payload).unwrap_or_else(|e| {
                warn!(key, error = %e, "Discarding unreadable saved cart");
                CartState::new()
            }),
            Ok(None) => CartState::new(),
            Err(e) => {
                warn!(key, error = %e, "Failed to load saved cart, starting empty");
                CartState::new()
            }
        };

        debug!(key, lines = state.lines.len(), "Cart restored");

        Self {
            storage,
            key: key.to_owned(),
            state,
        }
    }

    /// Current cart contents.
    #[must_use]
    pub const fn state(&self) -> &CartState {
        &self.state
    }

    /// Cart lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.state.lines
    }

    /// Consume the aggregator, returning the in-memory cart.
    #[must_use]
    pub fn into_state(self) -> CartState {
        self.state
    }

    /// Add a product variant; see [`CartState::add_item`] for merge rules.
    pub async fn add_item(
        &mut self,
        product: &ProductSnapshot,
        quantity: i64,
        size: Option<String>,
        color: Option<String>,
    ) -> CartLineId {
        let id = self.state.add_item(product, quantity, size, color);
        self.persist().await;
        id
    }

    /// Remove a line. Unknown ids leave the cart unchanged.
    pub async fn remove_item(&mut self, id: &CartLineId) {
        self.state.remove_item(id);
        self.persist().await;
    }

    /// Set a line's quantity to `max(1, quantity)`. Unknown ids leave the cart unchanged.
    pub async fn update_quantity(&mut self, id: &CartLineId, quantity: i64) {
        self.state.update_quantity(id, quantity);
        self.persist().await;
    }

    /// Remove every line.
    pub async fn clear_cart(&mut self) {
        self.state.clear();
        self.persist().await;
    }

    /// Apply one operation and persist.
    pub async fn apply(&mut self, operation: CartOperation) -> Option<CartLineId> {
        let touched = self.state.apply(operation);
        self.persist().await;
        touched
    }

    /// Sum of quantities across all lines.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.state.total_items()
    }

    /// Sum of `price * quantity` across all lines.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.state.total_price()
    }

    async fn persist(&self) {
        let payload = match self.state.to_payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to serialize cart");
                return;
            }
        };

        if let Err(e) = self.storage.set(&self.key, payload).await {
            warn!(key = %self.key, error = %e, "Failed to persist cart");
        }
    }
}
