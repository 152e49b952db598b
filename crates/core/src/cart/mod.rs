//! Cart aggregation.
//!
//! A cart is an ordered list of [`CartLine`]s. Lines are merged by their
//! identity `(product_id, size, color)`, quantities never drop below one, and
//! name/price/image are snapshots taken when a line is first created.
//!
//! The module is split in two layers:
//!
//! - [`CartState`] holds the data and the pure state transitions. Nothing in
//!   it touches storage, so every rule can be exercised directly.
//! - [`CartAggregator`] wraps a `CartState` together with a [`CartStorage`]
//!   backend, restores once on [`CartAggregator::init`] and persists after
//!   every mutation.

mod aggregator;
pub mod storage;

pub use aggregator::{CART_STORAGE_KEY, CartAggregator};
pub use storage::{CartStorage, MemoryStorage, StorageError};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CartLineId, ProductId};

/// Quantity used when an add request does not name one.
pub const DEFAULT_ADD_QUANTITY: i64 = 1;

/// Version tag written into persisted cart payloads.
pub const PERSISTED_CART_VERSION: u32 = 1;

/// Catalog data copied into a cart line at add time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    /// Ordered product images; the first one becomes the line image.
    pub images: Vec<String>,
}

/// One distinct purchasable selection (product plus size/color variant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: CartLineId,
    pub product_id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl CartLine {
    /// Whether this line has the merge identity `(product_id, size, color)`.
    #[must_use]
    pub fn has_identity(
        &self,
        product_id: &ProductId,
        size: Option<&str>,
        color: Option<&str>,
    ) -> bool {
        self.product_id == *product_id
            && self.size.as_deref() == size
            && self.color.as_deref() == color
    }

    /// `price * quantity` for this line, saturating at [`Decimal::MAX`].
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price.saturating_mul(Decimal::from(self.quantity))
    }
}

/// A single mutation request against a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartOperation {
    Add {
        product: ProductSnapshot,
        quantity: i64,
        size: Option<String>,
        color: Option<String>,
    },
    Remove {
        id: CartLineId,
    },
    UpdateQuantity {
        id: CartLineId,
        quantity: i64,
    },
    Clear,
}

/// Errors raised while decoding a persisted cart payload.
///
/// The aggregator treats every variant as "no saved cart".
#[derive(Debug, thiserror::Error)]
pub enum RestoreError {
    #[error("malformed cart payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unsupported cart payload version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("cart payload breaks an invariant: {0}")]
    InvariantViolation(String),
}

#[derive(Serialize)]
struct PersistedCartRef<'a> {
    version: u32,
    state: &'a CartState,
}

#[derive(Deserialize)]
struct PersistedCart {
    version: u32,
    state: CartState,
}

/// The lines of one cart, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartState {
    pub lines: Vec<CartLine>,
}

/// Clamp a requested quantity to the `>= 1` floor.
fn clamp_quantity(quantity: i64) -> u32 {
    u32::try_from(quantity.max(1)).unwrap_or(u32::MAX)
}

impl CartState {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Look up a line by its id.
    #[must_use]
    pub fn line(&self, id: &CartLineId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.id == *id)
    }

    /// Look up a line by merge identity.
    #[must_use]
    pub fn find_line(
        &self,
        product_id: &ProductId,
        size: Option<&str>,
        color: Option<&str>,
    ) -> Option<&CartLine> {
        self.lines
            .iter()
            .find(|line| line.has_identity(product_id, size, color))
    }

    /// Add `quantity` of a product variant, merging into an existing line
    /// with the same identity.
    ///
    /// A merge behaves exactly like [`CartState::update_quantity`] with the
    /// summed quantity, so the result is clamped to at least one. A fresh line
    /// stores `max(1, quantity)`: adding zero or a negative amount to a new
    /// line yields a visible quantity of one.
    ///
    /// Returns the id of the line that was created or merged into.
    pub fn add_item(
        &mut self,
        product: &ProductSnapshot,
        quantity: i64,
        size: Option<String>,
        color: Option<String>,
    ) -> CartLineId {
        if let Some(existing) = self.find_line(&product.id, size.as_deref(), color.as_deref()) {
            let id = existing.id.clone();
            let merged = i64::from(existing.quantity).saturating_add(quantity);
            self.update_quantity(&id, merged);
            return id;
        }

        let id = self.fresh_line_id();
        self.lines.push(CartLine {
            id: id.clone(),
            product_id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            quantity: clamp_quantity(quantity),
            image: product.images.first().cloned(),
            size,
            color,
        });
        id
    }

    /// Remove a line. Unknown ids are a no-op.
    ///
    /// Returns `true` if a line was removed.
    pub fn remove_item(&mut self, id: &CartLineId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line.id != *id);
        self.lines.len() != before
    }

    /// Set a line's quantity to `max(1, quantity)`. Unknown ids are a no-op.
    ///
    /// Returns `true` if a line was found.
    pub fn update_quantity(&mut self, id: &CartLineId, quantity: i64) -> bool {
        match self.lines.iter_mut().find(|line| line.id == *id) {
            Some(line) => {
                line.quantity = clamp_quantity(quantity);
                true
            }
            None => false,
        }
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Apply one operation. Returns the line id touched by an `Add`.
    pub fn apply(&mut self, operation: CartOperation) -> Option<CartLineId> {
        match operation {
            CartOperation::Add {
                product,
                quantity,
                size,
                color,
            } => Some(self.add_item(&product, quantity, size, color)),
            CartOperation::Remove { id } => {
                self.remove_item(&id);
                None
            }
            CartOperation::UpdateQuantity { id, quantity } => {
                self.update_quantity(&id, quantity);
                None
            }
            CartOperation::Clear => {
                self.clear();
                None
            }
        }
    }

    /// Sum of quantities across all lines.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    /// Sum of `price * quantity` across all lines, using snapshot prices.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.lines
            .iter()
            .map(CartLine::line_total)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    /// Serialize into the versioned storage payload.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&PersistedCartRef {
            version: PERSISTED_CART_VERSION,
            state: self,
        })
    }

    /// Decode a storage payload written by [`CartState::to_payload`].
    ///
    /// # Errors
    ///
    /// Returns a [`RestoreError`] if the payload is not valid JSON, carries a
    /// different version, or contains duplicate line ids, zero quantities or
    /// negative prices.
    pub fn from_payload(payload: &str) -> Result<Self, RestoreError> {
        let persisted: PersistedCart = serde_json::from_str(payload)?;
        if persisted.version != PERSISTED_CART_VERSION {
            return Err(RestoreError::UnsupportedVersion {
                found: persisted.version,
                expected: PERSISTED_CART_VERSION,
            });
        }
        persisted.state.check_invariants()?;
        Ok(persisted.state)
    }

    fn check_invariants(&self) -> Result<(), RestoreError> {
        for (index, line) in self.lines.iter().enumerate() {
            if line.quantity == 0 {
                return Err(RestoreError::InvariantViolation(format!(
                    "line {} has zero quantity",
                    line.id
                )));
            }
            if line.price.is_sign_negative() && !line.price.is_zero() {
                return Err(RestoreError::InvariantViolation(format!(
                    "line {} has a negative price",
                    line.id
                )));
            }
            let rest = self.lines.iter().skip(index + 1);
            for other in rest {
                if other.id == line.id {
                    return Err(RestoreError::InvariantViolation(format!(
                        "duplicate line id {}",
                        line.id
                    )));
                }
                if other.has_identity(&line.product_id, line.size.as_deref(), line.color.as_deref())
                {
                    return Err(RestoreError::InvariantViolation(format!(
                        "duplicate lines for product {}",
                        line.product_id
                    )));
                }
            }
        }
        Ok(())
    }

    fn fresh_line_id(&self) -> CartLineId {
        loop {
            let id = CartLineId::generate();
            if self.line(&id).is_none() {
                return id;
            }
        }
    }
}
