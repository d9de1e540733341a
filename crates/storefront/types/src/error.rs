//! Validation errors raised while building domain values from user input

use crate::order::OrderStatus;
use thiserror::Error;

/// A rejected form field or domain rule
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field was missing or blank
    #[error("{field} is required")]
    Required { field: &'static str },

    /// A text field exceeded its maximum length
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    /// A field value could not be accepted
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// Registration passwords differ
    #[error("passwords do not match")]
    PasswordMismatch,

    /// Registration username already belongs to someone
    #[error("this username is taken")]
    UsernameTaken,

    /// Login username is unknown
    #[error("user with username '{0}' does not exist")]
    UnknownUser(String),

    /// Login password did not verify
    #[error("wrong password")]
    WrongPassword,

    /// Order status may only move forward
    #[error("cannot change order status from {from} to {to}")]
    StatusTransition { from: OrderStatus, to: OrderStatus },
}

impl ValidationError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Result type for validation
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trim a required text field and enforce its maximum length.
pub fn required_text(field: &'static str, value: &str, max: usize) -> ValidationResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required { field });
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text_trims() {
        assert_eq!(required_text("name", "  Shoes ", 10).unwrap(), "Shoes");
    }

    #[test]
    fn test_required_text_rejects_blank_and_long() {
        assert_eq!(
            required_text("name", "   ", 10),
            Err(ValidationError::Required { field: "name" })
        );
        assert_eq!(
            required_text("name", "abcdef", 5),
            Err(ValidationError::TooLong {
                field: "name",
                max: 5
            })
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            ValidationError::UnknownUser("bob".into()).to_string(),
            "user with username 'bob' does not exist"
        );
        assert_eq!(
            ValidationError::StatusTransition {
                from: OrderStatus::Delivered,
                to: OrderStatus::New
            }
            .to_string(),
            "cannot change order status from delivered to new"
        );
    }
}
