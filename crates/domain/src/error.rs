//! Domain error types.

use thiserror::Error;

use crate::repository::StoreError;
use crate::sale::SaleError;
use crate::validation::ValidationErrors;

/// Errors that can occur during sale operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The request failed field validation.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// The requested entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A sale business rule rejected the operation.
    #[error("Sale error: {0}")]
    Sale(#[from] SaleError),

    /// An error occurred in the sale store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Coarse classification of a [`DomainError`] for host layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    InvalidState,
    DomainRule,
    Infrastructure,
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Validation(_) => ErrorKind::Validation,
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::Sale(SaleError::QuantityLimitExceeded { .. }) => ErrorKind::DomainRule,
            DomainError::Sale(_) => ErrorKind::InvalidState,
            DomainError::Store(_) => ErrorKind::Infrastructure,
        }
    }
}
