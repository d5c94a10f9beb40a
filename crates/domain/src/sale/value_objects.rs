//! Value objects for the sale domain.

use std::iter::Sum;

use common::{BranchId, CustomerId, ProductId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Monetary amount held as an exact decimal.
///
/// Line totals can carry more than two fractional digits (for example a 10%
/// discount on 0.05), so amounts are never rounded inside the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Creates a money amount from a decimal value.
    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Creates a money amount from a whole number of cents (e.g., 1000 = 10.00).
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Returns the underlying decimal amount.
    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Multiplies by a quantity.
    pub fn multiply(&self, quantity: i32) -> Money {
        Money(self.0 * Decimal::from(quantity))
    }

    /// Returns the amount left after taking `percent` off.
    pub fn discounted_by(&self, percent: Decimal) -> Money {
        Money(self.0 - self.0 * percent / Decimal::ONE_HUNDRED)
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

/// Customer identity with its denormalized name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerReference {
    pub id: CustomerId,
    pub name: String,
}

impl CustomerReference {
    pub fn new(id: CustomerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Branch identity with its denormalized name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchReference {
    pub id: BranchId,
    pub name: String,
}

impl BranchReference {
    pub fn new(id: BranchId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Product identity with its denormalized name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductReference {
    pub id: ProductId,
    pub name: String,
}

impl ProductReference {
    pub fn new(id: ProductId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_money_from_cents() {
        let money = Money::from_cents(1234);
        assert_eq!(money.amount(), Decimal::from_str("12.34").unwrap());
        assert_eq!(money.to_string(), "12.34");
    }

    #[test]
    fn test_money_multiply() {
        assert_eq!(Money::from_cents(1000).multiply(3), Money::from_cents(3000));
    }

    #[test]
    fn test_money_discount_keeps_fractional_cents() {
        let discounted = Money::from_cents(5).discounted_by(Decimal::TEN);
        assert_eq!(discounted.amount(), Decimal::from_str("0.045").unwrap());
    }

    #[test]
    fn test_money_sign() {
        assert!(Money::from_cents(-1).is_negative());
        assert!(!Money::zero().is_negative());
        assert!(Money::zero().is_zero());
    }

    #[test]
    fn test_money_sum() {
        let total: Money = [Money::from_cents(100), Money::from_cents(250)]
            .into_iter()
            .sum();
        assert_eq!(total, Money::from_cents(350));
    }

    #[test]
    fn test_money_serializes_as_decimal_string() {
        let json = serde_json::to_string(&Money::from_cents(2000)).unwrap();
        assert_eq!(json, "\"20.00\"");
    }
}
