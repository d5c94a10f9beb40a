//! Field-level validation of incoming commands.

use serde::{Deserialize, Serialize};

/// Maximum length of customer, branch and product names.
pub const MAX_NAME_LENGTH: usize = 200;

/// Maximum number of sales returned by one page.
pub const MAX_PAGE_SIZE: u32 = 100;

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// All field errors collected while validating a command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error for `field`.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Records an error for `field` unless `condition` holds.
    pub fn check(&mut self, condition: bool, field: impl Into<String>, message: impl Into<String>) {
        if !condition {
            self.add(field, message);
        }
    }

    /// Checks that a name is present and not longer than [`MAX_NAME_LENGTH`].
    pub fn check_name(&mut self, value: &str, field: &str) {
        if value.trim().is_empty() {
            self.add(field, "must not be empty");
        } else if value.chars().count() > MAX_NAME_LENGTH {
            self.add(
                field,
                format!("must not exceed {MAX_NAME_LENGTH} characters"),
            );
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Returns true if any error was recorded for `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// Turns the collected errors into a result.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut errors = ValidationErrors::new();
        errors.check(false, "quantity", "must be greater than 0");
        errors.check(true, "unit_price", "must not be negative");
        errors.check_name("", "customer_name");

        assert_eq!(errors.len(), 2);
        assert!(errors.has_field("quantity"));
        assert!(errors.has_field("customer_name"));
        assert!(!errors.has_field("unit_price"));
        assert_eq!(
            errors.to_string(),
            "quantity: must be greater than 0; customer_name: must not be empty"
        );
    }

    #[test]
    fn test_name_length_limit() {
        let mut errors = ValidationErrors::new();
        errors.check_name(&"a".repeat(MAX_NAME_LENGTH), "branch_name");
        assert!(errors.is_empty());

        errors.check_name(&"a".repeat(MAX_NAME_LENGTH + 1), "branch_name");
        assert!(errors.has_field("branch_name"));
    }
}
