//! Shared identifier types for the sales system.

pub mod types;

pub use types::{BranchId, CustomerId, ProductId, SaleId, SaleItemId};
