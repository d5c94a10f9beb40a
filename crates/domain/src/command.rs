//! Command infrastructure.

use crate::validation::ValidationErrors;

/// A request to read or change sales.
///
/// Commands carry raw caller input. `validate` performs the shape checks
/// (required fields, lengths, ranges) before the service touches storage;
/// business rules are left to the aggregate and the discount policy.
pub trait Command: Send + Sync {
    /// Checks the command's fields, collecting every failure.
    fn validate(&self) -> Result<(), ValidationErrors>;
}
