//! Domain layer for the sales system.
//!
//! This crate provides the core sale abstractions including:
//! - Sale aggregate with its cancellation and total invariants
//! - Quantity-tiered discount policy and year-scoped sale numbering
//! - Commands with field validation, read projections and results
//! - Persistence and event publication contracts
//! - SaleService orchestrating every sale operation

pub mod command;
pub mod error;
pub mod publisher;
pub mod repository;
pub mod sale;
pub mod validation;

pub use command::Command;
pub use error::{DomainError, ErrorKind};
pub use publisher::{
    DomainEvent, EventPublisher, LoggingEventPublisher, PublishError, RecordingEventPublisher,
};
pub use repository::{SaleRepository, StoreError, StoreResult};
pub use sale::{
    BranchReference, CancelSale, CancelSaleItem, CancelSaleItemResult, CancelSaleResult,
    CreateSale, CreateSaleResult, CustomerReference, DeleteSale, DeleteSaleResult, DiscountPolicy,
    GetSale, GetSaleByNumber, InvalidSaleNumber, LinePricing, ListSales, Money, ProductReference,
    QuantityDiscountPolicy, Sale, SaleError, SaleEvent, SaleItem, SaleItemInput, SaleItemView,
    SaleNumber, SalePage, SaleRecord, SaleService, SaleServiceConfig, SaleSummary, SaleView,
    UpdateSale, UpdateSaleItem, UpdateSaleResult,
};
pub use validation::{FieldError, ValidationErrors};
