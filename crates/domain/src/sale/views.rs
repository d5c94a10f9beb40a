//! Read projections and operation results.

use chrono::{DateTime, Utc};
use common::{BranchId, CustomerId, ProductId, SaleId, SaleItemId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Money, Sale, SaleItem, SaleNumber};

/// Full read model of a sale, items included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleView {
    pub id: SaleId,
    pub sale_number: SaleNumber,
    pub sale_date: DateTime<Utc>,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub branch_id: BranchId,
    pub branch_name: String,
    pub total_amount: Money,
    pub is_cancelled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub items: Vec<SaleItemView>,
}

/// Read model of a sale line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleItemView {
    pub id: SaleItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Money,
    pub discount_percent: Decimal,
    pub line_total: Money,
    pub is_cancelled: bool,
}

impl From<&SaleItem> for SaleItemView {
    fn from(item: &SaleItem) -> Self {
        Self {
            id: item.id(),
            product_id: item.product().id,
            product_name: item.product().name.clone(),
            quantity: item.quantity(),
            unit_price: item.unit_price(),
            discount_percent: item.discount_percent(),
            line_total: item.line_total(),
            is_cancelled: item.is_cancelled(),
        }
    }
}

impl From<&Sale> for SaleView {
    fn from(sale: &Sale) -> Self {
        Self {
            id: sale.id(),
            sale_number: sale.sale_number().clone(),
            sale_date: sale.sale_date(),
            customer_id: sale.customer().id,
            customer_name: sale.customer().name.clone(),
            branch_id: sale.branch().id,
            branch_name: sale.branch().name.clone(),
            total_amount: sale.total_amount(),
            is_cancelled: sale.is_cancelled(),
            created_at: sale.created_at(),
            updated_at: sale.updated_at(),
            cancelled_at: sale.cancelled_at(),
            items: sale.items().iter().map(SaleItemView::from).collect(),
        }
    }
}

/// Compact listing entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleSummary {
    pub id: SaleId,
    pub sale_number: SaleNumber,
    pub sale_date: DateTime<Utc>,
    pub customer_name: String,
    pub branch_name: String,
    pub total_amount: Money,
    pub is_cancelled: bool,
    pub item_count: usize,
}

impl From<&Sale> for SaleSummary {
    fn from(sale: &Sale) -> Self {
        Self {
            id: sale.id(),
            sale_number: sale.sale_number().clone(),
            sale_date: sale.sale_date(),
            customer_name: sale.customer().name.clone(),
            branch_name: sale.branch().name.clone(),
            total_amount: sale.total_amount(),
            is_cancelled: sale.is_cancelled(),
            item_count: sale.item_count(),
        }
    }
}

/// One page of sale summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalePage {
    pub items: Vec<SaleSummary>,
    pub total_count: u64,
    pub current_page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl SalePage {
    /// Builds a page, deriving `total_pages` as `ceil(total_count / page_size)`.
    pub fn new(items: Vec<SaleSummary>, total_count: u64, current_page: u32, page_size: u32) -> Self {
        let total_pages = if page_size == 0 {
            0
        } else {
            u32::try_from(total_count.div_ceil(u64::from(page_size))).unwrap_or(u32::MAX)
        };
        Self {
            items,
            total_count,
            current_page,
            page_size,
            total_pages,
        }
    }
}

/// Result of [`create_sale`](super::SaleService::create_sale).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSaleResult {
    pub id: SaleId,
    pub sale_number: SaleNumber,
}

/// Result of [`update_sale`](super::SaleService::update_sale).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateSaleResult {
    pub id: SaleId,
    pub sale_number: SaleNumber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelSaleResult {
    pub success: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelSaleItemResult {
    pub success: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteSaleResult {
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(SalePage::new(vec![], 0, 1, 10).total_pages, 0);
        assert_eq!(SalePage::new(vec![], 10, 1, 10).total_pages, 1);
        assert_eq!(SalePage::new(vec![], 11, 1, 10).total_pages, 2);
        assert_eq!(SalePage::new(vec![], 250, 3, 100).total_pages, 3);
    }
}
