//! Persistence contract for sales.

use async_trait::async_trait;
use common::SaleId;
use thiserror::Error;

use crate::sale::{Sale, SaleNumber};

/// Errors that can occur while storing or loading sales.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another sale already holds this number.
    #[error("Sale number already in use: {sale_number}")]
    DuplicateSaleNumber { sale_number: SaleNumber },

    /// The sale was changed since it was loaded.
    #[error("Concurrency conflict for sale {sale_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        sale_id: SaleId,
        expected: i64,
        actual: i64,
    },

    /// The sale to update does not exist in storage.
    #[error("Sale not stored: {sale_id}")]
    NotStored { sale_id: SaleId },

    /// Underlying database error.
    #[error("Database error: {0}")]
    Database(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Schema migration failed.
    #[error("Migration error: {0}")]
    Migration(String),

    /// Stored data could not be mapped back to a sale.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for repository operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage for sale aggregates.
///
/// Implementations must be safe to share across tasks. Writes use optimistic
/// concurrency: `insert` stores version 1 and `save` only succeeds when the
/// stored version still equals the sale's version, bumping it by one.
#[async_trait]
pub trait SaleRepository: Send + Sync {
    /// Loads a sale with all its items, cancelled ones included.
    async fn load_by_id(&self, id: SaleId) -> StoreResult<Option<Sale>>;

    /// Loads a sale by its sale number.
    async fn load_by_number(&self, sale_number: &SaleNumber) -> StoreResult<Option<Sale>>;

    /// Stores a new sale and sets its version to 1.
    ///
    /// Fails with [`StoreError::DuplicateSaleNumber`] if the number is taken.
    async fn insert(&self, sale: &mut Sale) -> StoreResult<()>;

    /// Replaces a stored sale, dropping persisted items absent from `sale`.
    async fn save(&self, sale: &mut Sale) -> StoreResult<()>;

    /// Removes a sale and its items. Returns false if nothing was deleted.
    async fn delete(&self, id: SaleId) -> StoreResult<bool>;

    /// Returns one page of sales ordered by sale date, most recent first,
    /// along with the total number of sales.
    async fn list_page(&self, page: u32, page_size: u32) -> StoreResult<(Vec<Sale>, u64)>;

    /// Reserves the next sale number for the current year.
    async fn allocate_next_number(&self) -> StoreResult<SaleNumber>;
}
