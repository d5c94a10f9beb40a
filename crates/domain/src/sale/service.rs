//! Sale service orchestrating validation, pricing, persistence and events.

use std::collections::HashSet;

use common::{SaleId, SaleItemId};

use crate::command::Command;
use crate::error::DomainError;
use crate::publisher::{DomainEvent, EventPublisher};
use crate::repository::{SaleRepository, StoreError};

use super::{
    BranchReference, CancelSale, CancelSaleItem, CancelSaleItemResult, CancelSaleResult,
    CreateSale, CreateSaleResult, CustomerReference, DeleteSale, DeleteSaleResult,
    DiscountPolicy, GetSale, GetSaleByNumber, LinePricing, ListSales, ProductReference,
    QuantityDiscountPolicy, Sale, SaleError, SaleEvent, SaleItem, SaleNumber, SalePage,
    SaleSummary, SaleView, UpdateSale, UpdateSaleResult,
};

const SALE: &str = "Sale";
const SALE_ITEM: &str = "SaleItem";

/// Tuning knobs for [`SaleService`].
#[derive(Debug, Clone)]
pub struct SaleServiceConfig {
    /// How many sale numbers `create_sale` tries before giving up on
    /// duplicate-number conflicts.
    pub max_number_attempts: u32,
}

impl Default for SaleServiceConfig {
    fn default() -> Self {
        Self {
            max_number_attempts: 3,
        }
    }
}

/// Service for managing sales.
///
/// Every write follows the same path: validate the command, load or build
/// the aggregate, price lines through the discount policy, mutate, persist,
/// then publish. Pricing happens before any mutation so a rejected line
/// leaves nothing behind.
pub struct SaleService<R, P, D = QuantityDiscountPolicy> {
    repository: R,
    publisher: P,
    policy: D,
    config: SaleServiceConfig,
}

impl<R, P> SaleService<R, P>
where
    R: SaleRepository,
    P: EventPublisher,
{
    /// Creates a new sale service with the standard discount tiers.
    pub fn new(repository: R, publisher: P) -> Self {
        Self::with_policy(repository, publisher, QuantityDiscountPolicy)
    }
}

impl<R, P, D> SaleService<R, P, D>
where
    R: SaleRepository,
    P: EventPublisher,
    D: DiscountPolicy,
{
    /// Creates a sale service with a custom discount policy.
    pub fn with_policy(repository: R, publisher: P, policy: D) -> Self {
        Self {
            repository,
            publisher,
            policy,
            config: SaleServiceConfig::default(),
        }
    }

    /// Replaces the service configuration.
    pub fn with_config(mut self, config: SaleServiceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Creates a sale with a freshly allocated sale number.
    ///
    /// Retries with a new number when the store reports the number as taken.
    #[tracing::instrument(skip(self, cmd), fields(items = cmd.items.len()))]
    pub async fn create_sale(&self, cmd: CreateSale) -> Result<CreateSaleResult, DomainError> {
        let start = std::time::Instant::now();
        cmd.validate()?;

        let items = cmd
            .items
            .iter()
            .map(|line| {
                let pricing = self.policy.price_line(line.quantity, line.unit_price)?;
                Ok(SaleItem::new(
                    SaleItemId::new(),
                    ProductReference::new(line.product_id, line.product_name.clone()),
                    line.quantity,
                    line.unit_price,
                    pricing,
                ))
            })
            .collect::<Result<Vec<_>, SaleError>>()?;

        let sale_id = SaleId::new();
        let customer = CustomerReference::new(cmd.customer_id, cmd.customer_name);
        let branch = BranchReference::new(cmd.branch_id, cmd.branch_name);

        let mut attempt = 1;
        let sale = loop {
            let sale_number = self.repository.allocate_next_number().await?;
            let mut sale = Sale::new(
                sale_id,
                sale_number,
                cmd.sale_date,
                customer.clone(),
                branch.clone(),
                items.clone(),
            );

            match self.repository.insert(&mut sale).await {
                Ok(()) => break sale,
                Err(StoreError::DuplicateSaleNumber { sale_number })
                    if attempt < self.config.max_number_attempts =>
                {
                    metrics::counter!("sale_number_conflicts_total").increment(1);
                    tracing::warn!(%sale_number, attempt, "sale number already taken, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        };

        self.publish(SaleEvent::sale_created(&sale)).await;

        metrics::counter!("sales_created_total").increment(1);
        self.record_duration("create_sale", start);
        tracing::info!(
            sale_id = %sale.id(),
            sale_number = %sale.sale_number(),
            total_amount = %sale.total_amount(),
            "sale created"
        );

        Ok(CreateSaleResult {
            id: sale.id(),
            sale_number: sale.sale_number().clone(),
        })
    }

    /// Replaces the header and item set of an active sale.
    ///
    /// Lines carrying an item ID revise that item when it is still active;
    /// lines without one become new items; stored items missing from the
    /// command are removed.
    #[tracing::instrument(skip(self, cmd), fields(sale_id = %cmd.sale_id))]
    pub async fn update_sale(&self, cmd: UpdateSale) -> Result<UpdateSaleResult, DomainError> {
        let start = std::time::Instant::now();
        cmd.validate()?;

        let mut sale = self.load(cmd.sale_id).await?;
        if sale.is_cancelled() {
            tracing::debug!("update rejected, sale is cancelled");
            return Err(SaleError::SaleCancelled {
                sale_id: sale.id(),
            }
            .into());
        }

        let priced = cmd
            .items
            .iter()
            .map(|line| {
                self.policy
                    .price_line(line.quantity, line.unit_price)
                    .map(|pricing| (line, pricing))
            })
            .collect::<Result<Vec<_>, SaleError>>()?;

        sale.update_header(
            cmd.sale_date,
            CustomerReference::new(cmd.customer_id, cmd.customer_name.clone()),
            BranchReference::new(cmd.branch_id, cmd.branch_name.clone()),
        )?;

        let keep: HashSet<SaleItemId> = cmd.items.iter().filter_map(|line| line.item_id).collect();
        let removed = sale.retain_items(&keep)?;

        for (line, pricing) in priced {
            let product = ProductReference::new(line.product_id, line.product_name.clone());
            match line.item_id {
                Some(item_id) => {
                    let revised =
                        sale.revise_item(item_id, product, line.quantity, line.unit_price, pricing)?;
                    if !revised {
                        tracing::debug!(%item_id, "line skipped, item unknown or cancelled");
                    }
                }
                None => {
                    sale.add_item(SaleItem::new(
                        SaleItemId::new(),
                        product,
                        line.quantity,
                        line.unit_price,
                        pricing,
                    ))?;
                }
            }
        }

        self.repository.save(&mut sale).await?;
        self.publish(SaleEvent::sale_modified(&sale)).await;

        metrics::counter!("sales_modified_total").increment(1);
        self.record_duration("update_sale", start);
        tracing::info!(
            sale_number = %sale.sale_number(),
            removed,
            total_amount = %sale.total_amount(),
            "sale updated"
        );

        Ok(UpdateSaleResult {
            id: sale.id(),
            sale_number: sale.sale_number().clone(),
        })
    }

    /// Cancels a sale and all of its items.
    ///
    /// Cancelling an already cancelled sale leaves its state unchanged but is
    /// still stored and announced.
    #[tracing::instrument(skip(self), fields(sale_id = %cmd.sale_id))]
    pub async fn cancel_sale(&self, cmd: CancelSale) -> Result<CancelSaleResult, DomainError> {
        let start = std::time::Instant::now();
        cmd.validate()?;

        let mut sale = self.load(cmd.sale_id).await?;
        if sale.is_cancelled() {
            tracing::debug!("sale already cancelled");
        }

        sale.cancel();
        self.repository.save(&mut sale).await?;
        self.publish(SaleEvent::sale_cancelled(&sale)).await;

        metrics::counter!("sales_cancelled_total").increment(1);
        self.record_duration("cancel_sale", start);
        tracing::info!(sale_number = %sale.sale_number(), "sale cancelled");

        Ok(CancelSaleResult { success: true })
    }

    /// Cancels an item, or some of its units.
    ///
    /// Only a quantity strictly between zero and the item's quantity cancels
    /// part of the line, and the remaining units are repriced. Anything else
    /// cancels the whole line.
    #[tracing::instrument(skip(self), fields(sale_id = %cmd.sale_id, item_id = %cmd.item_id))]
    pub async fn cancel_sale_item(
        &self,
        cmd: CancelSaleItem,
    ) -> Result<CancelSaleItemResult, DomainError> {
        let start = std::time::Instant::now();
        cmd.validate()?;

        let mut sale = self.load(cmd.sale_id).await?;
        let item = sale
            .get_item(cmd.item_id)
            .ok_or_else(|| DomainError::not_found(SALE_ITEM, cmd.item_id))?;

        if item.is_cancelled() {
            tracing::debug!("item already cancelled");
            return Err(SaleError::ItemAlreadyCancelled {
                item_id: cmd.item_id,
            }
            .into());
        }

        let current_quantity = item.quantity();
        let unit_price = item.unit_price();
        let requested = cmd.quantity.unwrap_or(current_quantity);
        let partial = requested > 0 && requested < current_quantity;
        let to_cancel = if partial { requested } else { current_quantity };

        if partial {
            let remaining = current_quantity - to_cancel;
            let LinePricing {
                discount_percent,
                line_total,
            } = self.policy.price_line(remaining, unit_price)?;
            sale.reduce_item_quantity(cmd.item_id, remaining, discount_percent, line_total);
        } else {
            sale.cancel_item(cmd.item_id);
        }

        self.repository.save(&mut sale).await?;

        if let Some(updated) = sale.get_item(cmd.item_id) {
            self.publish(SaleEvent::item_cancelled(&sale, updated, to_cancel))
                .await;
        }

        let partial_label = if partial { "true" } else { "false" };
        metrics::counter!("sale_items_cancelled_total", "partial" => partial_label).increment(1);
        self.record_duration("cancel_sale_item", start);
        tracing::info!(
            sale_number = %sale.sale_number(),
            cancelled_quantity = to_cancel,
            partial,
            total_amount = %sale.total_amount(),
            "sale item cancelled"
        );

        Ok(CancelSaleItemResult { success: true })
    }

    /// Loads a sale by ID.
    #[tracing::instrument(skip(self), fields(sale_id = %query.sale_id))]
    pub async fn get_sale(&self, query: GetSale) -> Result<SaleView, DomainError> {
        query.validate()?;

        let sale = self.load(query.sale_id).await?;
        Ok(SaleView::from(&sale))
    }

    /// Loads a sale by its sale number.
    #[tracing::instrument(skip(self), fields(sale_number = %query.sale_number))]
    pub async fn get_sale_by_number(&self, query: GetSaleByNumber) -> Result<SaleView, DomainError> {
        query.validate()?;

        let sale_number = SaleNumber::parse(&query.sale_number)
            .map_err(|_| DomainError::not_found(SALE, &query.sale_number))?;
        let sale = self
            .repository
            .load_by_number(&sale_number)
            .await?
            .ok_or_else(|| DomainError::not_found(SALE, &sale_number))?;

        Ok(SaleView::from(&sale))
    }

    /// Returns one page of sales, most recent sale date first.
    #[tracing::instrument(skip(self))]
    pub async fn list_sales(&self, query: ListSales) -> Result<SalePage, DomainError> {
        let start = std::time::Instant::now();
        query.validate()?;

        let (sales, total_count) = self
            .repository
            .list_page(query.page, query.page_size)
            .await?;
        let items = sales.iter().map(SaleSummary::from).collect();

        self.record_duration("list_sales", start);
        Ok(SalePage::new(items, total_count, query.page, query.page_size))
    }

    /// Permanently removes a sale and its items.
    #[tracing::instrument(skip(self), fields(sale_id = %cmd.sale_id))]
    pub async fn delete_sale(&self, cmd: DeleteSale) -> Result<DeleteSaleResult, DomainError> {
        let start = std::time::Instant::now();
        cmd.validate()?;

        if !self.repository.delete(cmd.sale_id).await? {
            tracing::debug!("delete rejected, sale not found");
            return Err(DomainError::not_found(SALE, cmd.sale_id));
        }

        metrics::counter!("sales_deleted_total").increment(1);
        self.record_duration("delete_sale", start);
        tracing::info!("sale deleted");

        Ok(DeleteSaleResult { success: true })
    }

    async fn load(&self, sale_id: SaleId) -> Result<Sale, DomainError> {
        self.repository
            .load_by_id(sale_id)
            .await?
            .ok_or_else(|| DomainError::not_found(SALE, sale_id))
    }

    async fn publish(&self, event: SaleEvent) {
        let event_type = event.event_type();
        if let Err(e) = self.publisher.publish(event).await {
            tracing::warn!(event_type, error = %e, "failed to publish sale event");
        }
    }

    fn record_duration(&self, operation: &'static str, start: std::time::Instant) {
        metrics::histogram!("sale_operation_duration_seconds", "operation" => operation)
            .record(start.elapsed().as_secs_f64());
    }
}
