//! Sale commands.

use chrono::{DateTime, Utc};
use common::{BranchId, CustomerId, ProductId, SaleId, SaleItemId};

use crate::command::Command;
use crate::validation::{MAX_PAGE_SIZE, ValidationErrors};

use super::{MAX_QUANTITY_PER_PRODUCT, Money, SaleNumber};

/// One line of a new sale.
#[derive(Debug, Clone)]
pub struct SaleItemInput {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Money,
}

impl SaleItemInput {
    pub fn new(
        product_id: ProductId,
        product_name: impl Into<String>,
        quantity: i32,
        unit_price: Money,
    ) -> Self {
        Self {
            product_id,
            product_name: product_name.into(),
            quantity,
            unit_price,
        }
    }
}

/// Command to create a new sale.
#[derive(Debug, Clone)]
pub struct CreateSale {
    pub sale_date: DateTime<Utc>,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub branch_id: BranchId,
    pub branch_name: String,
    pub items: Vec<SaleItemInput>,
}

impl CreateSale {
    /// Creates a CreateSale command dated now.
    pub fn new(
        customer_id: CustomerId,
        customer_name: impl Into<String>,
        branch_id: BranchId,
        branch_name: impl Into<String>,
        items: Vec<SaleItemInput>,
    ) -> Self {
        Self {
            sale_date: Utc::now(),
            customer_id,
            customer_name: customer_name.into(),
            branch_id,
            branch_name: branch_name.into(),
            items,
        }
    }

    /// Overrides the sale date.
    pub fn dated(mut self, sale_date: DateTime<Utc>) -> Self {
        self.sale_date = sale_date;
        self
    }
}

impl Command for CreateSale {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        check_header(
            &mut errors,
            self.customer_id,
            &self.customer_name,
            self.branch_id,
            &self.branch_name,
        );

        errors.check(!self.items.is_empty(), "items", "must contain at least one item");
        for (index, item) in self.items.iter().enumerate() {
            check_line(
                &mut errors,
                index,
                item.product_id,
                &item.product_name,
                item.quantity,
                item.unit_price,
            );
        }

        errors.into_result()
    }
}

/// One line of an updated sale.
///
/// Lines with an `item_id` revise the matching existing item; lines without
/// one are added as new items.
#[derive(Debug, Clone)]
pub struct UpdateSaleItem {
    pub item_id: Option<SaleItemId>,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Money,
}

impl UpdateSaleItem {
    /// Creates a line that revises an existing item.
    pub fn existing(
        item_id: SaleItemId,
        product_id: ProductId,
        product_name: impl Into<String>,
        quantity: i32,
        unit_price: Money,
    ) -> Self {
        Self {
            item_id: Some(item_id),
            product_id,
            product_name: product_name.into(),
            quantity,
            unit_price,
        }
    }

    /// Creates a line for a new item.
    pub fn added(
        product_id: ProductId,
        product_name: impl Into<String>,
        quantity: i32,
        unit_price: Money,
    ) -> Self {
        Self {
            item_id: None,
            product_id,
            product_name: product_name.into(),
            quantity,
            unit_price,
        }
    }
}

/// Command to replace a sale's header and item set.
#[derive(Debug, Clone)]
pub struct UpdateSale {
    pub sale_id: SaleId,
    pub sale_date: DateTime<Utc>,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub branch_id: BranchId,
    pub branch_name: String,
    pub items: Vec<UpdateSaleItem>,
}

impl Command for UpdateSale {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(!self.sale_id.is_nil(), "sale_id", "must not be empty");
        check_header(
            &mut errors,
            self.customer_id,
            &self.customer_name,
            self.branch_id,
            &self.branch_name,
        );

        errors.check(!self.items.is_empty(), "items", "must contain at least one item");
        for (index, item) in self.items.iter().enumerate() {
            if let Some(item_id) = item.item_id {
                errors.check(
                    !item_id.is_nil(),
                    format!("items[{index}].item_id"),
                    "must not be empty",
                );
            }
            check_line(
                &mut errors,
                index,
                item.product_id,
                &item.product_name,
                item.quantity,
                item.unit_price,
            );
            errors.check(
                item.quantity <= MAX_QUANTITY_PER_PRODUCT,
                format!("items[{index}].quantity"),
                format!("must not exceed {MAX_QUANTITY_PER_PRODUCT}"),
            );
        }

        errors.into_result()
    }
}

/// Command to cancel a whole sale.
#[derive(Debug, Clone)]
pub struct CancelSale {
    pub sale_id: SaleId,
}

impl CancelSale {
    pub fn new(sale_id: SaleId) -> Self {
        Self { sale_id }
    }
}

impl Command for CancelSale {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(!self.sale_id.is_nil(), "sale_id", "must not be empty");
        errors.into_result()
    }
}

/// Command to cancel an item, in full or by a number of units.
#[derive(Debug, Clone)]
pub struct CancelSaleItem {
    pub sale_id: SaleId,
    pub item_id: SaleItemId,

    /// Units to cancel. `None`, zero, a negative count or the full line
    /// quantity cancel the whole line.
    pub quantity: Option<i32>,
}

impl CancelSaleItem {
    /// Cancels the whole line.
    pub fn full(sale_id: SaleId, item_id: SaleItemId) -> Self {
        Self {
            sale_id,
            item_id,
            quantity: None,
        }
    }

    /// Cancels `quantity` units of the line.
    pub fn partial(sale_id: SaleId, item_id: SaleItemId, quantity: i32) -> Self {
        Self {
            sale_id,
            item_id,
            quantity: Some(quantity),
        }
    }
}

impl Command for CancelSaleItem {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(!self.sale_id.is_nil(), "sale_id", "must not be empty");
        errors.check(!self.item_id.is_nil(), "item_id", "must not be empty");
        errors.into_result()
    }
}

/// Query for one sale by ID.
#[derive(Debug, Clone)]
pub struct GetSale {
    pub sale_id: SaleId,
}

impl GetSale {
    pub fn new(sale_id: SaleId) -> Self {
        Self { sale_id }
    }
}

impl Command for GetSale {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(!self.sale_id.is_nil(), "sale_id", "must not be empty");
        errors.into_result()
    }
}

/// Query for one sale by its sale number.
#[derive(Debug, Clone)]
pub struct GetSaleByNumber {
    pub sale_number: String,
}

impl GetSaleByNumber {
    pub fn new(sale_number: impl Into<String>) -> Self {
        Self {
            sale_number: sale_number.into(),
        }
    }
}

impl Command for GetSaleByNumber {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.sale_number.trim().is_empty() {
            errors.add("sale_number", "must not be empty");
        } else if SaleNumber::parse(&self.sale_number).is_err() {
            errors.add("sale_number", "must have the form SALE-<year><sequence>");
        }
        errors.into_result()
    }
}

/// Query for one page of sales, most recent first.
#[derive(Debug, Clone)]
pub struct ListSales {
    /// 1-based page index.
    pub page: u32,
    pub page_size: u32,
}

impl ListSales {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page, page_size }
    }
}

impl Default for ListSales {
    fn default() -> Self {
        Self::new(1, 10)
    }
}

impl Command for ListSales {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(self.page > 0, "page", "must be greater than 0");
        errors.check(self.page_size > 0, "page_size", "must be greater than 0");
        errors.check(
            self.page_size <= MAX_PAGE_SIZE,
            "page_size",
            format!("must not exceed {MAX_PAGE_SIZE}"),
        );
        errors.into_result()
    }
}

/// Command to remove a sale and its items permanently.
#[derive(Debug, Clone)]
pub struct DeleteSale {
    pub sale_id: SaleId,
}

impl DeleteSale {
    pub fn new(sale_id: SaleId) -> Self {
        Self { sale_id }
    }
}

impl Command for DeleteSale {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check(!self.sale_id.is_nil(), "sale_id", "must not be empty");
        errors.into_result()
    }
}

fn check_header(
    errors: &mut ValidationErrors,
    customer_id: CustomerId,
    customer_name: &str,
    branch_id: BranchId,
    branch_name: &str,
) {
    errors.check(!customer_id.is_nil(), "customer_id", "must not be empty");
    errors.check_name(customer_name, "customer_name");
    errors.check(!branch_id.is_nil(), "branch_id", "must not be empty");
    errors.check_name(branch_name, "branch_name");
}

// On create the 20-unit ceiling is left to the discount policy.
fn check_line(
    errors: &mut ValidationErrors,
    index: usize,
    product_id: ProductId,
    product_name: &str,
    quantity: i32,
    unit_price: Money,
) {
    errors.check(
        !product_id.is_nil(),
        format!("items[{index}].product_id"),
        "must not be empty",
    );
    errors.check_name(product_name, &format!("items[{index}].product_name"));
    errors.check(
        quantity > 0,
        format!("items[{index}].quantity"),
        "must be greater than 0",
    );
    errors.check(
        !unit_price.is_negative(),
        format!("items[{index}].unit_price"),
        "must not be negative",
    );
}
