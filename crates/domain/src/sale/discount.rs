//! Quantity-tiered discount policy.
//!
//! | Quantity | Discount |
//! |----------|----------|
//! | 1–3      | 0%       |
//! | 4–9      | 10%      |
//! | 10–20    | 20%      |
//! | > 20     | rejected |

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Money, SaleError};

/// Smallest quantity that earns the 10% discount.
pub const MIN_QUANTITY_FOR_DISCOUNT: i32 = 4;

/// Smallest quantity that earns the 20% discount.
pub const MIN_QUANTITY_FOR_HIGHER_DISCOUNT: i32 = 10;

/// Maximum number of identical items allowed on one line.
pub const MAX_QUANTITY_PER_PRODUCT: i32 = 20;

/// Returns the discount percentage for `quantity` identical items.
///
/// Only the upper bound is enforced here; non-positive quantities are the
/// caller's concern.
pub fn calculate_discount_percent(quantity: i32) -> Result<Decimal, SaleError> {
    if quantity > MAX_QUANTITY_PER_PRODUCT {
        return Err(SaleError::QuantityLimitExceeded {
            quantity,
            max: MAX_QUANTITY_PER_PRODUCT,
        });
    }

    if quantity < MIN_QUANTITY_FOR_DISCOUNT {
        Ok(Decimal::ZERO)
    } else if quantity < MIN_QUANTITY_FOR_HIGHER_DISCOUNT {
        Ok(Decimal::TEN)
    } else {
        Ok(Decimal::from(20))
    }
}

/// `quantity * unit_price * (1 - discount_percent / 100)`.
pub fn line_total(quantity: i32, unit_price: Money, discount_percent: Decimal) -> Money {
    unit_price.multiply(quantity).discounted_by(discount_percent)
}

/// Discount and line total for one line at a given quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePricing {
    pub discount_percent: Decimal,
    pub line_total: Money,
}

/// Pricing rule applied to every sale line.
pub trait DiscountPolicy: Send + Sync {
    /// Returns the discount percentage for `quantity` identical items.
    fn discount_percent(&self, quantity: i32) -> Result<Decimal, SaleError>;

    /// Prices a line: discount for the quantity plus the resulting line total.
    fn price_line(&self, quantity: i32, unit_price: Money) -> Result<LinePricing, SaleError> {
        let discount_percent = self.discount_percent(quantity)?;
        Ok(LinePricing {
            discount_percent,
            line_total: line_total(quantity, unit_price, discount_percent),
        })
    }
}

/// The standard 0/10/20% tiers with a 20-item ceiling.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuantityDiscountPolicy;

impl DiscountPolicy for QuantityDiscountPolicy {
    fn discount_percent(&self, quantity: i32) -> Result<Decimal, SaleError> {
        calculate_discount_percent(quantity)
    }
}
