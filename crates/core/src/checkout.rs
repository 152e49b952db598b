//! Order pricing and order submission validation.
//!
//! The cart's totals are the source of the price fields sent with an order.
//! [`OrderPricing::for_cart`] derives shipping and tax from the items total,
//! [`OrderSubmission::validate`] checks that a submitted order is internally
//! consistent, and [`OrderSubmission::validate_against_cart`] additionally
//! requires it to match the cart it was placed from.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::{CartLine, CartState};
use crate::types::{PaymentMethod, ProductId, round_money};

/// Orders with an items total above this amount ship free.
pub const FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// Shipping charged below the free-shipping threshold.
pub const FLAT_SHIPPING_PRICE: Decimal = Decimal::from_parts(10, 0, 0, false, 0);

/// Sales tax applied to the items total (15%).
pub const TAX_RATE: Decimal = Decimal::from_parts(15, 0, 0, false, 2);

/// Errors found while validating an [`OrderSubmission`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckoutError {
    #[error("order has no items")]
    EmptyOrder,

    #[error("item {product_id} must have a quantity of at least 1")]
    InvalidQuantity { product_id: ProductId },

    #[error("{field} cannot be negative")]
    NegativeAmount { field: &'static str },

    #[error("shipping address {field} is required")]
    MissingAddressField { field: &'static str },

    #[error("items price {submitted} does not match item lines ({expected})")]
    ItemsPriceMismatch {
        expected: Decimal,
        submitted: Decimal,
    },

    #[error("total price {submitted} does not match items + shipping + tax ({expected})")]
    TotalMismatch {
        expected: Decimal,
        submitted: Decimal,
    },

    #[error("order amounts are out of range")]
    AmountOutOfRange,

    #[error("order items do not match the cart")]
    CartMismatch,

    #[error("{field} {submitted} does not match the cart ({expected})")]
    PriceMismatch {
        field: &'static str,
        expected: Decimal,
        submitted: Decimal,
    },
}

/// Price breakdown of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPricing {
    pub items_price: Decimal,
    pub shipping_price: Decimal,
    pub tax_price: Decimal,
    pub total_price: Decimal,
}

impl OrderPricing {
    /// Price an items total.
    ///
    /// Empty orders cost nothing; otherwise shipping is free strictly above
    /// [`FREE_SHIPPING_THRESHOLD`] and tax is [`TAX_RATE`] of the items total,
    /// rounded to cents.
    #[must_use]
    pub fn for_items_price(items_price: Decimal) -> Self {
        let items_price = round_money(items_price);
        let shipping_price = if items_price.is_zero() || items_price > FREE_SHIPPING_THRESHOLD {
            Decimal::ZERO
        } else {
            FLAT_SHIPPING_PRICE
        };
        let tax_price = round_money(items_price.saturating_mul(TAX_RATE));

        Self {
            items_price,
            shipping_price,
            tax_price,
            total_price: items_price
                .saturating_add(shipping_price)
                .saturating_add(tax_price),
        }
    }

    /// Price the current contents of a cart.
    #[must_use]
    pub fn for_cart(cart: &CartState) -> Self {
        Self::for_items_price(cart.total_price())
    }
}

/// One ordered line, copied from a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub price: Decimal,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

impl From<&CartLine> for OrderItem {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id.clone(),
            name: line.name.clone(),
            quantity: line.quantity,
            price: line.price,
            image: line.image.clone(),
            size: line.size.clone(),
            color: line.color.clone(),
        }
    }
}

/// Where an order ships to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub full_name: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl ShippingAddress {
    fn first_blank_field(&self) -> Option<&'static str> {
        [
            ("fullName", &self.full_name),
            ("address", &self.address),
            ("city", &self.city),
            ("postalCode", &self.postal_code),
            ("country", &self.country),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
    }
}

/// An order as submitted by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSubmission {
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub items_price: Decimal,
    pub shipping_price: Decimal,
    pub tax_price: Decimal,
    pub total_price: Decimal,
}

impl OrderSubmission {
    /// Build a submission from a cart, priced with [`OrderPricing::for_cart`].
    #[must_use]
    pub fn from_cart(
        cart: &CartState,
        shipping_address: ShippingAddress,
        payment_method: PaymentMethod,
    ) -> Self {
        let pricing = OrderPricing::for_cart(cart);
        Self {
            items: cart.lines.iter().map(OrderItem::from).collect(),
            shipping_address,
            payment_method,
            items_price: pricing.items_price,
            shipping_price: pricing.shipping_price,
            tax_price: pricing.tax_price,
            total_price: pricing.total_price,
        }
    }

    /// Submitted price breakdown.
    #[must_use]
    pub const fn pricing(&self) -> OrderPricing {
        OrderPricing {
            items_price: self.items_price,
            shipping_price: self.shipping_price,
            tax_price: self.tax_price,
            total_price: self.total_price,
        }
    }

    /// Check that the submission is internally consistent.
    ///
    /// Shipping and tax are taken as submitted; only their sum is checked.
    ///
    /// # Errors
    ///
    /// Returns the first [`CheckoutError`] found.
    pub fn validate(&self) -> Result<(), CheckoutError> {
        if self.items.is_empty() {
            return Err(CheckoutError::EmptyOrder);
        }
        if let Some(item) = self.items.iter().find(|item| item.quantity == 0) {
            return Err(CheckoutError::InvalidQuantity {
                product_id: item.product_id.clone(),
            });
        }

        for (field, amount) in [
            ("itemsPrice", self.items_price),
            ("shippingPrice", self.shipping_price),
            ("taxPrice", self.tax_price),
            ("totalPrice", self.total_price),
        ] {
            if amount.is_sign_negative() && !amount.is_zero() {
                return Err(CheckoutError::NegativeAmount { field });
            }
        }
        if self.items.iter().any(|item| item.price.is_sign_negative() && !item.price.is_zero()) {
            return Err(CheckoutError::NegativeAmount { field: "price" });
        }

        if let Some(field) = self.shipping_address.first_blank_field() {
            return Err(CheckoutError::MissingAddressField { field });
        }

        let expected_items = self
            .items
            .iter()
            .try_fold(Decimal::ZERO, |sum, item| {
                item.price
                    .checked_mul(Decimal::from(item.quantity))
                    .and_then(|line| sum.checked_add(line))
            })
            .map(round_money)
            .ok_or(CheckoutError::AmountOutOfRange)?;
        if round_money(self.items_price) != expected_items {
            return Err(CheckoutError::ItemsPriceMismatch {
                expected: expected_items,
                submitted: self.items_price,
            });
        }

        let expected_total = self
            .items_price
            .checked_add(self.shipping_price)
            .and_then(|sum| sum.checked_add(self.tax_price))
            .map(round_money)
            .ok_or(CheckoutError::AmountOutOfRange)?;
        if round_money(self.total_price) != expected_total {
            return Err(CheckoutError::TotalMismatch {
                expected: expected_total,
                submitted: self.total_price,
            });
        }

        Ok(())
    }

    /// [`validate`](Self::validate), then require the items and every price
    /// field to be exactly what `cart` would produce.
    ///
    /// Items are compared line by line (product, variant, quantity, price,
    /// name and image) in cart order.
    ///
    /// # Errors
    ///
    /// Returns the first [`CheckoutError`] found.
    pub fn validate_against_cart(&self, cart: &CartState) -> Result<(), CheckoutError> {
        self.validate()?;

        let expected_items: Vec<OrderItem> = cart.lines.iter().map(OrderItem::from).collect();
        if self.items != expected_items {
            return Err(CheckoutError::CartMismatch);
        }

        let expected = OrderPricing::for_cart(cart);
        for (field, expected, submitted) in [
            ("itemsPrice", expected.items_price, self.items_price),
            ("shippingPrice", expected.shipping_price, self.shipping_price),
            ("taxPrice", expected.tax_price, self.tax_price),
            ("totalPrice", expected.total_price, self.total_price),
        ] {
            if round_money(submitted) != expected {
                return Err(CheckoutError::PriceMismatch {
                    field,
                    expected,
                    submitted,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::ProductSnapshot;

    fn cart_with(price: Decimal, quantity: i64) -> CartState {
        let mut cart = CartState::new();
        cart.add_item(
            &ProductSnapshot {
                id: ProductId::new("p1"),
                name: "Mug".to_string(),
                price,
                images: vec!["/img/mug.jpg".to_string()],
            },
            quantity,
            None,
            None,
        );
        cart
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Ada Lovelace".to_string(),
            address: "12 Analytical Row".to_string(),
            city: "London".to_string(),
            postal_code: "N1 9GU".to_string(),
            country: "GB".to_string(),
        }
    }

    #[test]
    fn test_pricing_below_threshold_charges_shipping() {
        let pricing = OrderPricing::for_cart(&cart_with(Decimal::from(10), 6));
        assert_eq!(pricing.items_price, Decimal::from(60));
        assert_eq!(pricing.shipping_price, Decimal::from(10));
        assert_eq!(pricing.tax_price, Decimal::from(9));
        assert_eq!(pricing.total_price, Decimal::from(79));
    }

    #[test]
    fn test_pricing_threshold_is_exclusive() {
        let at = OrderPricing::for_items_price(Decimal::from(100));
        assert_eq!(at.shipping_price, FLAT_SHIPPING_PRICE);

        let above = OrderPricing::for_items_price(Decimal::new(10_001, 2));
        assert_eq!(above.shipping_price, Decimal::ZERO);
    }

    #[test]
    fn test_pricing_empty_cart_is_free() {
        let pricing = OrderPricing::for_cart(&CartState::new());
        assert_eq!(pricing.total_price, Decimal::ZERO);
        assert_eq!(pricing.shipping_price, Decimal::ZERO);
    }

    #[test]
    fn test_tax_rounds_to_cents() {
        let pricing = OrderPricing::for_items_price(Decimal::new(3333, 2));
        assert_eq!(pricing.tax_price, Decimal::new(500, 2));
    }

    #[test]
    fn test_submission_from_cart_validates() {
        let submission = OrderSubmission::from_cart(
            &cart_with(Decimal::new(1999, 2), 3),
            address(),
            PaymentMethod::Card,
        );
        assert_eq!(submission.items.len(), 1);
        assert_eq!(submission.items_price, Decimal::new(5997, 2));
        assert_eq!(submission.validate(), Ok(()));
    }

    #[test]
    fn test_submission_rejects_empty_items() {
        let submission =
            OrderSubmission::from_cart(&CartState::new(), address(), PaymentMethod::Paypal);
        assert_eq!(submission.validate(), Err(CheckoutError::EmptyOrder));
    }

    #[test]
    fn test_submission_rejects_blank_address() {
        let mut addr = address();
        addr.city = "  ".to_string();
        let submission =
            OrderSubmission::from_cart(&cart_with(Decimal::ONE, 1), addr, PaymentMethod::Card);
        assert_eq!(
            submission.validate(),
            Err(CheckoutError::MissingAddressField { field: "city" })
        );
    }

    #[test]
    fn test_submission_rejects_tampered_prices() {
        let mut submission = OrderSubmission::from_cart(
            &cart_with(Decimal::from(10), 2),
            address(),
            PaymentMethod::Card,
        );
        submission.items_price = Decimal::from(1);
        assert!(matches!(
            submission.validate(),
            Err(CheckoutError::ItemsPriceMismatch { .. })
        ));

        let mut submission = OrderSubmission::from_cart(
            &cart_with(Decimal::from(10), 2),
            address(),
            PaymentMethod::Card,
        );
        submission.total_price += Decimal::ONE;
        assert!(matches!(
            submission.validate(),
            Err(CheckoutError::TotalMismatch { .. })
        ));

        submission.tax_price = Decimal::from(-3);
        assert_eq!(
            submission.validate(),
            Err(CheckoutError::NegativeAmount { field: "taxPrice" })
        );
    }

    #[test]
    fn test_submission_rejects_zero_quantity_items() {
        let mut submission = OrderSubmission::from_cart(
            &cart_with(Decimal::from(10), 2),
            address(),
            PaymentMethod::CashOnDelivery,
        );
        if let Some(item) = submission.items.first_mut() {
            item.quantity = 0;
        }
        assert_eq!(
            submission.validate(),
            Err(CheckoutError::InvalidQuantity {
                product_id: ProductId::new("p1")
            })
        );
    }

    #[test]
    fn test_submission_with_overflowing_amounts_is_rejected() {
        let json = r#"{
            "items": [{"productId": "p1", "name": "Mug", "quantity": 2,
                       "price": "79228162514264337593543950335"}],
            "shippingAddress": {
                "fullName": "Ada", "address": "1 Row", "city": "London",
                "postalCode": "N1", "country": "GB"
            },
            "paymentMethod": "card",
            "itemsPrice": "1", "shippingPrice": "0", "taxPrice": "0", "totalPrice": "1"
        }"#;
        let submission: OrderSubmission = serde_json::from_str(json).unwrap();
        assert_eq!(submission.validate(), Err(CheckoutError::AmountOutOfRange));

        let mut submission = OrderSubmission::from_cart(
            &cart_with(Decimal::ONE, 1),
            address(),
            PaymentMethod::Card,
        );
        submission.shipping_price = Decimal::MAX;
        submission.tax_price = Decimal::MAX;
        assert_eq!(submission.validate(), Err(CheckoutError::AmountOutOfRange));
    }

    #[test]
    fn test_submission_matching_cart_is_accepted() {
        let cart = cart_with(Decimal::new(1999, 2), 3);
        let submission = OrderSubmission::from_cart(&cart, address(), PaymentMethod::Card);
        assert_eq!(submission.validate_against_cart(&cart), Ok(()));
    }

    #[test]
    fn test_zero_priced_submission_does_not_match_cart() {
        let cart = cart_with(Decimal::from(10), 5);
        let mut submission = OrderSubmission::from_cart(&cart, address(), PaymentMethod::Card);
        for item in &mut submission.items {
            item.price = Decimal::ZERO;
        }
        submission.items_price = Decimal::ZERO;
        submission.shipping_price = Decimal::ZERO;
        submission.tax_price = Decimal::ZERO;
        submission.total_price = Decimal::ZERO;

        // Internally consistent, so only the cart comparison catches it
        assert_eq!(submission.validate(), Ok(()));
        assert_eq!(
            submission.validate_against_cart(&cart),
            Err(CheckoutError::CartMismatch)
        );
    }

    #[test]
    fn test_submission_with_discounted_shipping_does_not_match_cart() {
        let cart = cart_with(Decimal::from(10), 2);
        let mut submission = OrderSubmission::from_cart(&cart, address(), PaymentMethod::Card);
        submission.shipping_price = Decimal::ZERO;
        submission.total_price -= FLAT_SHIPPING_PRICE;

        assert_eq!(submission.validate(), Ok(()));
        assert_eq!(
            submission.validate_against_cart(&cart),
            Err(CheckoutError::PriceMismatch {
                field: "shippingPrice",
                expected: FLAT_SHIPPING_PRICE,
                submitted: Decimal::ZERO,
            })
        );
    }

    #[test]
    fn test_submission_for_a_different_cart_is_rejected() {
        let submission = OrderSubmission::from_cart(
            &cart_with(Decimal::from(10), 2),
            address(),
            PaymentMethod::Card,
        );
        assert_eq!(
            submission.validate_against_cart(&cart_with(Decimal::from(10), 3)),
            Err(CheckoutError::CartMismatch)
        );
        assert_eq!(
            submission.validate_against_cart(&CartState::new()),
            Err(CheckoutError::CartMismatch)
        );
    }

    #[test]
    fn test_submission_deserializes_camel_case() {
        let json = r#"{
            "items": [{"productId": "p1", "name": "Mug", "quantity": 2, "price": "10"}],
            "shippingAddress": {
                "fullName": "Ada", "address": "1 Row", "city": "London",
                "postalCode": "N1", "country": "GB"
            },
            "paymentMethod": "paypal",
            "itemsPrice": "20", "shippingPrice": "10", "taxPrice": "3", "totalPrice": "33"
        }"#;
        let submission: Result<OrderSubmission, _> = serde_json::from_str(json);
        assert_eq!(submission.map(|s| s.validate()).ok(), Some(Ok(())));
    }
}
