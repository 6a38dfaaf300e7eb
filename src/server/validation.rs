//! Request validation utilities.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::errors::InsuranceError;

/// Validation error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for InsuranceError {
    fn from(err: ValidationError) -> Self {
        InsuranceError::InvalidArgument(err.message)
    }
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Parse an ISO calendar date (`YYYY-MM-DD`).
///
/// # Example
/// ```
/// use car_insurance::server::validation::parse_date;
///
/// assert!(parse_date("2025-08-29", "date").is_ok());
/// assert!(parse_date("29/08/2025", "date").is_err());
/// ```
pub fn parse_date(value: &str, field_name: &str) -> ValidationResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        ValidationError::new(
            field_name,
            "invalid date format (expected: YYYY-MM-DD, e.g. '2025-12-31')",
        )
    })
}

/// A required query/body value must be present.
pub fn require<'a>(value: Option<&'a str>, field_name: &str) -> ValidationResult<&'a str> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ValidationError::new(field_name, "is required")),
    }
}

/// A claim cannot be dated after `today`.
pub fn validate_claim_date(claim_date: NaiveDate, today: NaiveDate) -> ValidationResult<()> {
    if claim_date > today {
        Err(ValidationError::new(
            "claimDate",
            "Claim date cannot be in the future",
        ))
    } else {
        Ok(())
    }
}

/// Claim amounts must be strictly positive.
pub fn validate_amount(amount: Decimal) -> ValidationResult<()> {
    if amount <= Decimal::ZERO {
        Err(ValidationError::new(
            "amount",
            "Amount cannot be 0 or negative",
        ))
    } else {
        Ok(())
    }
}
