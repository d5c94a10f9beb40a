//! Sale aggregate and related types.

mod aggregate;
mod commands;
mod discount;
mod events;
mod item;
mod number;
mod service;
mod value_objects;
mod views;

pub use aggregate::{Sale, SaleRecord};
pub use commands::*;
pub use discount::{
    DiscountPolicy, LinePricing, MAX_QUANTITY_PER_PRODUCT, MIN_QUANTITY_FOR_DISCOUNT,
    MIN_QUANTITY_FOR_HIGHER_DISCOUNT, QuantityDiscountPolicy, calculate_discount_percent,
    line_total,
};
pub use events::{
    ItemCancelledData, SaleCancelledData, SaleCreatedData, SaleEvent, SaleModifiedData,
};
pub use item::SaleItem;
pub use number::{InvalidSaleNumber, SaleNumber};
pub use service::{SaleService, SaleServiceConfig};
pub use value_objects::{BranchReference, CustomerReference, Money, ProductReference};
pub use views::*;

use common::{SaleId, SaleItemId};
use thiserror::Error;

/// Errors raised by sale business rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaleError {
    /// The sale was cancelled and can no longer be modified.
    #[error("Sale {sale_id} is cancelled and cannot be modified")]
    SaleCancelled { sale_id: SaleId },

    /// The item was already cancelled.
    #[error("Sale item {item_id} is already cancelled")]
    ItemAlreadyCancelled { item_id: SaleItemId },

    /// Too many identical items on one line.
    #[error("Cannot sell more than {max} identical items per product (requested {quantity})")]
    QuantityLimitExceeded { quantity: i32, max: i32 },
}
