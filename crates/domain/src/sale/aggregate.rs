//! Sale aggregate implementation.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use common::{SaleId, SaleItemId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{
    BranchReference, CustomerReference, LinePricing, Money, ProductReference, SaleError,
    SaleItem, SaleNumber,
};

/// Sale aggregate root.
///
/// Owns its items exclusively and keeps `total_amount` equal to the sum of
/// the line totals of its active items after every mutation. Persistence and
/// pricing live outside the aggregate: callers price lines through the
/// discount policy and hand the results in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    id: SaleId,
    sale_number: SaleNumber,
    sale_date: DateTime<Utc>,
    customer: CustomerReference,
    branch: BranchReference,
    items: Vec<SaleItem>,
    total_amount: Money,
    is_cancelled: bool,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,

    /// Persistence version for optimistic concurrency; 0 until first stored.
    #[serde(default)]
    version: i64,
}

/// Persisted state of a sale, used by repositories to rebuild the aggregate.
#[derive(Debug, Clone)]
pub struct SaleRecord {
    pub id: SaleId,
    pub sale_number: SaleNumber,
    pub sale_date: DateTime<Utc>,
    pub customer: CustomerReference,
    pub branch: BranchReference,
    pub items: Vec<SaleItem>,
    pub total_amount: Money,
    pub is_cancelled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub version: i64,
}

impl Sale {
    /// Creates a new, active sale and computes its total.
    pub fn new(
        id: SaleId,
        sale_number: SaleNumber,
        sale_date: DateTime<Utc>,
        customer: CustomerReference,
        branch: BranchReference,
        items: Vec<SaleItem>,
    ) -> Self {
        let mut sale = Self {
            id,
            sale_number,
            sale_date,
            customer,
            branch,
            items,
            total_amount: Money::zero(),
            is_cancelled: false,
            created_at: Utc::now(),
            updated_at: None,
            cancelled_at: None,
            version: 0,
        };
        sale.recalculate_total();
        sale
    }

    /// Rebuilds a sale from persisted state without touching timestamps.
    pub fn restore(record: SaleRecord) -> Self {
        Self {
            id: record.id,
            sale_number: record.sale_number,
            sale_date: record.sale_date,
            customer: record.customer,
            branch: record.branch,
            items: record.items,
            total_amount: record.total_amount,
            is_cancelled: record.is_cancelled,
            created_at: record.created_at,
            updated_at: record.updated_at,
            cancelled_at: record.cancelled_at,
            version: record.version,
        }
    }
}

// Query methods
impl Sale {
    pub fn id(&self) -> SaleId {
        self.id
    }

    pub fn sale_number(&self) -> &SaleNumber {
        &self.sale_number
    }

    pub fn sale_date(&self) -> DateTime<Utc> {
        self.sale_date
    }

    pub fn customer(&self) -> &CustomerReference {
        &self.customer
    }

    pub fn branch(&self) -> &BranchReference {
        &self.branch
    }

    /// Returns all items, cancelled ones included, in insertion order.
    pub fn items(&self) -> &[SaleItem] {
        &self.items
    }

    /// Returns an item by ID.
    pub fn get_item(&self, item_id: SaleItemId) -> Option<&SaleItem> {
        self.items.iter().find(|item| item.id() == item_id)
    }

    /// Returns the items that still count towards the total.
    pub fn active_items(&self) -> impl Iterator<Item = &SaleItem> {
        self.items.iter().filter(|item| !item.is_cancelled())
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn is_cancelled(&self) -> bool {
        self.is_cancelled
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    /// Sets the persistence version. Called by repositories after a write.
    pub fn set_version(&mut self, version: i64) {
        self.version = version;
    }
}

// Cancellation
impl Sale {
    /// Cancels the sale and every item still active.
    ///
    /// Cancelling an already cancelled sale changes nothing. Discounts are not
    /// recomputed; cancelled items simply stop counting, so the total drops
    /// to zero.
    pub fn cancel(&mut self) {
        if self.is_cancelled {
            return;
        }

        let now = Utc::now();
        self.is_cancelled = true;
        self.cancelled_at = Some(now);
        self.updated_at = Some(now);

        for item in self.items.iter_mut().filter(|item| !item.is_cancelled()) {
            item.cancel();
        }

        self.recalculate_total();
    }

    /// Cancels a single item in full.
    ///
    /// Unknown item IDs are ignored; callers check existence beforehand.
    pub fn cancel_item(&mut self, item_id: SaleItemId) {
        let Some(item) = self.item_mut(item_id) else {
            return;
        };

        item.cancel();
        self.recalculate_total();
        self.touch();
    }

    /// Applies a reduced quantity priced by the caller.
    ///
    /// The item is cancelled when `new_quantity` drops to zero or below.
    /// Unknown item IDs are ignored.
    pub fn reduce_item_quantity(
        &mut self,
        item_id: SaleItemId,
        new_quantity: i32,
        new_discount_percent: Decimal,
        new_line_total: Money,
    ) {
        let Some(item) = self.item_mut(item_id) else {
            return;
        };

        item.apply_quantity(
            new_quantity,
            LinePricing {
                discount_percent: new_discount_percent,
                line_total: new_line_total,
            },
        );
        if new_quantity <= 0 {
            item.cancel();
        }

        self.recalculate_total();
        self.touch();
    }

    /// Recomputes the total from the active items.
    pub fn recalculate_total(&mut self) {
        self.total_amount = self
            .items
            .iter()
            .filter(|item| !item.is_cancelled())
            .map(SaleItem::line_total)
            .sum();
    }
}

// Modification (rejected once the sale is cancelled)
impl Sale {
    /// Replaces the sale date and the customer and branch references.
    pub fn update_header(
        &mut self,
        sale_date: DateTime<Utc>,
        customer: CustomerReference,
        branch: BranchReference,
    ) -> Result<(), SaleError> {
        self.ensure_modifiable()?;

        self.sale_date = sale_date;
        self.customer = customer;
        self.branch = branch;
        self.touch();
        Ok(())
    }

    /// Drops every item whose ID is not in `keep`, cancelled ones included.
    ///
    /// Returns the number of items removed.
    pub fn retain_items(&mut self, keep: &HashSet<SaleItemId>) -> Result<usize, SaleError> {
        self.ensure_modifiable()?;

        let before = self.items.len();
        self.items.retain(|item| keep.contains(&item.id()));
        let removed = before - self.items.len();

        if removed > 0 {
            self.recalculate_total();
            self.touch();
        }
        Ok(removed)
    }

    /// Replaces product, quantity, price and pricing of an active item.
    ///
    /// Cancelled and unknown items are left untouched; returns whether the
    /// item was revised.
    pub fn revise_item(
        &mut self,
        item_id: SaleItemId,
        product: ProductReference,
        quantity: i32,
        unit_price: Money,
        pricing: LinePricing,
    ) -> Result<bool, SaleError> {
        self.ensure_modifiable()?;

        let revised = match self.item_mut(item_id) {
            Some(item) if !item.is_cancelled() => {
                item.revise(product, quantity, unit_price, pricing);
                true
            }
            _ => false,
        };

        if revised {
            self.recalculate_total();
            self.touch();
        }
        Ok(revised)
    }

    /// Appends a new item.
    pub fn add_item(&mut self, item: SaleItem) -> Result<(), SaleError> {
        self.ensure_modifiable()?;

        self.items.push(item);
        self.recalculate_total();
        self.touch();
        Ok(())
    }

    fn ensure_modifiable(&self) -> Result<(), SaleError> {
        if self.is_cancelled {
            return Err(SaleError::SaleCancelled { sale_id: self.id });
        }
        Ok(())
    }
}

// Helpers
impl Sale {
    fn item_mut(&mut self, item_id: SaleItemId) -> Option<&mut SaleItem> {
        self.items.iter_mut().find(|item| item.id() == item_id)
    }

    fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}
