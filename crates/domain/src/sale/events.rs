//! Sale domain events.

use chrono::{DateTime, Utc};
use common::SaleId;
use serde::{Deserialize, Serialize};

use crate::publisher::DomainEvent;

use super::{BranchReference, CustomerReference, Money, Sale, SaleItem, SaleNumber};

/// Notifications emitted after a sale mutation has been persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SaleEvent {
    /// Sale was created.
    SaleCreated(SaleCreatedData),

    /// Sale header or items were modified.
    SaleModified(SaleModifiedData),

    /// Sale was cancelled as a whole.
    SaleCancelled(SaleCancelledData),

    /// A single item was cancelled, fully or partially.
    ItemCancelled(ItemCancelledData),
}

impl DomainEvent for SaleEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SaleEvent::SaleCreated(_) => "SaleCreated",
            SaleEvent::SaleModified(_) => "SaleModified",
            SaleEvent::SaleCancelled(_) => "SaleCancelled",
            SaleEvent::ItemCancelled(_) => "ItemCancelled",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SaleEvent::SaleCreated(data) => data.created_at,
            SaleEvent::SaleModified(data) => data.modified_at,
            SaleEvent::SaleCancelled(data) => data.cancelled_at,
            SaleEvent::ItemCancelled(data) => data.cancelled_at,
        }
    }
}

/// Data for SaleCreated event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleCreatedData {
    pub sale_id: SaleId,
    pub sale_number: SaleNumber,
    pub sale_date: DateTime<Utc>,
    pub customer: CustomerReference,
    pub branch: BranchReference,
    pub total_amount: Money,
    pub item_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Data for SaleModified event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleModifiedData {
    pub sale_id: SaleId,
    pub sale_number: SaleNumber,
    pub total_amount: Money,
    pub item_count: usize,
    pub modified_at: DateTime<Utc>,
}

/// Data for SaleCancelled event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleCancelledData {
    pub sale_id: SaleId,
    pub sale_number: SaleNumber,
    pub cancelled_at: DateTime<Utc>,
}

/// Data for ItemCancelled event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemCancelledData {
    pub sale_id: SaleId,
    pub sale_number: SaleNumber,

    /// The item as it stands after the cancellation.
    pub item: SaleItem,

    /// Number of units taken off the line.
    pub cancelled_quantity: i32,

    /// True when units remain active on the line.
    pub partial: bool,

    /// Sale total after the cancellation.
    pub sale_total: Money,

    pub cancelled_at: DateTime<Utc>,
}

// Convenience constructors for events
impl SaleEvent {
    /// Creates a SaleCreated event from a freshly created sale.
    pub fn sale_created(sale: &Sale) -> Self {
        SaleEvent::SaleCreated(SaleCreatedData {
            sale_id: sale.id(),
            sale_number: sale.sale_number().clone(),
            sale_date: sale.sale_date(),
            customer: sale.customer().clone(),
            branch: sale.branch().clone(),
            total_amount: sale.total_amount(),
            item_count: sale.item_count(),
            created_at: sale.created_at(),
        })
    }

    /// Creates a SaleModified event.
    pub fn sale_modified(sale: &Sale) -> Self {
        SaleEvent::SaleModified(SaleModifiedData {
            sale_id: sale.id(),
            sale_number: sale.sale_number().clone(),
            total_amount: sale.total_amount(),
            item_count: sale.item_count(),
            modified_at: sale.updated_at().unwrap_or_else(Utc::now),
        })
    }

    /// Creates a SaleCancelled event.
    pub fn sale_cancelled(sale: &Sale) -> Self {
        SaleEvent::SaleCancelled(SaleCancelledData {
            sale_id: sale.id(),
            sale_number: sale.sale_number().clone(),
            cancelled_at: sale.cancelled_at().unwrap_or_else(Utc::now),
        })
    }

    /// Creates an ItemCancelled event carrying the updated item.
    pub fn item_cancelled(sale: &Sale, item: &SaleItem, cancelled_quantity: i32) -> Self {
        SaleEvent::ItemCancelled(ItemCancelledData {
            sale_id: sale.id(),
            sale_number: sale.sale_number().clone(),
            item: item.clone(),
            cancelled_quantity,
            partial: !item.is_cancelled(),
            sale_total: sale.total_amount(),
            cancelled_at: sale.updated_at().unwrap_or_else(Utc::now),
        })
    }

    /// Returns the ID of the sale the event refers to.
    pub fn sale_id(&self) -> SaleId {
        match self {
            SaleEvent::SaleCreated(data) => data.sale_id,
            SaleEvent::SaleModified(data) => data.sale_id,
            SaleEvent::SaleCancelled(data) => data.sale_id,
            SaleEvent::ItemCancelled(data) => data.sale_id,
        }
    }

    /// Returns the number of the sale the event refers to.
    pub fn sale_number(&self) -> &SaleNumber {
        match self {
            SaleEvent::SaleCreated(data) => &data.sale_number,
            SaleEvent::SaleModified(data) => &data.sale_number,
            SaleEvent::SaleCancelled(data) => &data.sale_number,
            SaleEvent::ItemCancelled(data) => &data.sale_number,
        }
    }
}

#[cfg(test)]
mod tests {
    use common::{BranchId, CustomerId, ProductId, SaleItemId};

    use super::*;
    use crate::sale::{DiscountPolicy, ProductReference, QuantityDiscountPolicy};

    fn sample_sale() -> Sale {
        let unit_price = Money::from_cents(1000);
        let pricing = QuantityDiscountPolicy.price_line(10, unit_price).unwrap();
        let item = SaleItem::new(
            SaleItemId::new(),
            ProductReference::new(ProductId::new(), "Beer"),
            10,
            unit_price,
            pricing,
        );
        Sale::new(
            SaleId::new(),
            SaleNumber::new(2025, 4),
            Utc::now(),
            CustomerReference::new(CustomerId::new(), "Jane Doe"),
            BranchReference::new(BranchId::new(), "Downtown"),
            vec![item],
        )
    }

    #[test]
    fn test_event_type() {
        let mut sale = sample_sale();

        assert_eq!(SaleEvent::sale_created(&sale).event_type(), "SaleCreated");
        assert_eq!(SaleEvent::sale_modified(&sale).event_type(), "SaleModified");

        let item = sale.items()[0].clone();
        assert_eq!(
            SaleEvent::item_cancelled(&sale, &item, 10).event_type(),
            "ItemCancelled"
        );

        sale.cancel();
        assert_eq!(
            SaleEvent::sale_cancelled(&sale).event_type(),
            "SaleCancelled"
        );
    }

    #[test]
    fn test_event_serialization() {
        let sale = sample_sale();
        let event = SaleEvent::sale_created(&sale);

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"SaleCreated\""));
        assert!(json.contains("SALE-20250004"));

        let deserialized: SaleEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.sale_id(), sale.id());

        if let SaleEvent::SaleCreated(data) = deserialized {
            assert_eq!(data.total_amount, Money::from_cents(8000));
            assert_eq!(data.item_count, 1);
        } else {
            panic!("Expected SaleCreated event");
        }
    }

    #[test]
    fn test_item_cancelled_flags_partial() {
        let mut sale = sample_sale();
        let item_id = sale.items()[0].id();
        let pricing = QuantityDiscountPolicy
            .price_line(5, Money::from_cents(1000))
            .unwrap();
        sale.reduce_item_quantity(item_id, 5, pricing.discount_percent, pricing.line_total);

        let item = sale.get_item(item_id).unwrap().clone();
        let event = SaleEvent::item_cancelled(&sale, &item, 5);

        if let SaleEvent::ItemCancelled(data) = event {
            assert!(data.partial);
            assert_eq!(data.cancelled_quantity, 5);
            assert_eq!(data.item.quantity(), 5);
            assert_eq!(data.sale_total, Money::from_cents(4500));
        } else {
            panic!("Expected ItemCancelled event");
        }
    }
}
