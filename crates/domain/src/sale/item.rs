//! Sale line items.

use common::SaleItemId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{LinePricing, Money, ProductReference};

/// One product line within a sale.
///
/// Items are only mutated through their owning [`Sale`](super::Sale), which
/// keeps the sale total in step with every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleItem {
    id: SaleItemId,
    product: ProductReference,
    quantity: i32,
    unit_price: Money,
    discount_percent: Decimal,
    line_total: Money,
    is_cancelled: bool,
}

impl SaleItem {
    /// Creates an active item priced by the discount policy.
    pub fn new(
        id: SaleItemId,
        product: ProductReference,
        quantity: i32,
        unit_price: Money,
        pricing: LinePricing,
    ) -> Self {
        Self {
            id,
            product,
            quantity,
            unit_price,
            discount_percent: pricing.discount_percent,
            line_total: pricing.line_total,
            is_cancelled: false,
        }
    }

    /// Rebuilds an item from persisted state.
    pub fn restore(
        id: SaleItemId,
        product: ProductReference,
        quantity: i32,
        unit_price: Money,
        discount_percent: Decimal,
        line_total: Money,
        is_cancelled: bool,
    ) -> Self {
        Self {
            id,
            product,
            quantity,
            unit_price,
            discount_percent,
            line_total,
            is_cancelled,
        }
    }

    pub fn id(&self) -> SaleItemId {
        self.id
    }

    pub fn product(&self) -> &ProductReference {
        &self.product
    }

    pub fn quantity(&self) -> i32 {
        self.quantity
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn discount_percent(&self) -> Decimal {
        self.discount_percent
    }

    pub fn line_total(&self) -> Money {
        self.line_total
    }

    pub fn is_cancelled(&self) -> bool {
        self.is_cancelled
    }

    pub(super) fn cancel(&mut self) {
        self.is_cancelled = true;
    }

    pub(super) fn apply_quantity(&mut self, quantity: i32, pricing: LinePricing) {
        self.quantity = quantity;
        self.discount_percent = pricing.discount_percent;
        self.line_total = pricing.line_total;
    }

    pub(super) fn revise(
        &mut self,
        product: ProductReference,
        quantity: i32,
        unit_price: Money,
        pricing: LinePricing,
    ) {
        self.product = product;
        self.unit_price = unit_price;
        self.apply_quantity(quantity, pricing);
    }
}
